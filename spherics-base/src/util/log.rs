//! Logging helpers shared by programs that install a logger.

/// Provides the recommended log filter for programs which want to exclude particularly noisy
/// details of spherics's dependencies.
///
/// The guiding principle for this filtering is that at [`log::Level::Debug`] or lower level,
/// there should be no messages produced every step unless something is wrong. Spherics
/// itself follows that rule at every level, but its dependencies make no such promise at
/// [`log::Level::Trace`], so their trace messages are excluded.
pub fn standard_filter(metadata: &log::Metadata<'_>) -> bool {
    metadata.level() < log::Level::Trace || is_own_target(metadata.target())
}

fn is_own_target(target: &str) -> bool {
    let crate_name = target.split("::").next().unwrap_or(target);
    crate_name == "spherics" || crate_name.starts_with("spherics_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn allowed(level: Level, target: &str) -> bool {
        standard_filter(&log::Metadata::builder().level(level).target(target).build())
    }

    #[test]
    fn filter() {
        assert!(!allowed(Level::Trace, "flume::signal"));
        assert!(!allowed(Level::Trace, "sphericsish"));
        assert!(allowed(Level::Debug, "flume::signal"));
        assert!(allowed(Level::Warn, "some_random_crate"));
        assert!(allowed(Level::Trace, "spherics::physics::world"));
        assert!(allowed(Level::Trace, "spherics_headless"));
    }
}
