use std::panic;

/// Guard object which collects multiple panics or other reports of failure,
/// then panics when it is dropped if any occurred.
///
/// This allows a sampled property test to report every failing sample before exiting,
/// instead of only the first.
#[derive(Debug, Default)]
pub struct MultiFailure {
    panics: Vec<Box<dyn core::any::Any + Send>>,
}

impl MultiFailure {
    /// Constructs an empty [`MultiFailure`].
    ///
    /// If nothing else is done to it, it will have no effect.
    #[must_use = "this is useless if never invoked to collect failures"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `f`, and if it unwinds, count that as a failure and defer it
    /// until this [`MultiFailure`] is dropped.
    pub fn catch<O, F>(&mut self, f: F) -> Option<O>
    where
        F: FnOnce() -> O + panic::UnwindSafe,
    {
        match panic::catch_unwind(f) {
            Ok(output) => Some(output),
            Err(panic_payload) => {
                // The panic hook has already printed a report.
                self.panics.push(panic_payload);
                None
            }
        }
    }
}

impl Drop for MultiFailure {
    fn drop(&mut self) {
        if std::thread::panicking() || self.panics.is_empty() {
            return;
        }

        let count = self.panics.len();
        let summary_message = format!(
            "{count} panic{s_were} found",
            s_were = if count == 1 { " was" } else { "s were" }
        );
        eprintln!("\n{summary_message}");
        panic::resume_unwind(Box::new(summary_message));
    }
}
