//! Runs a spherics demonstration scene with no display, then prints what happened.

use std::io;
use std::thread;

use anyhow::Context as _;
use clap::Parser as _;

use spherics::content;
use spherics::physics::World;
use spherics::time::{Duration, TimeStats};
use spherics::worker::SimulationThread;

mod config_args;
use config_args::ConfigArgs;
mod logging;
use logging::LoggingArgs;

/// Number of falling spheres in the `rain` scene.
const RAIN_COUNT: usize = 100;
/// Number of links in the `chain` scene.
const CHAIN_LINKS: usize = 5;

#[derive(Clone, Debug, clap::Parser)]
#[command(author, about, version)]
struct HeadlessArgs {
    /// Which scene to simulate.
    #[arg(long = "scene", default_value = "head-on")]
    scene: Scene,

    /// Length of simulated time, in seconds.
    #[arg(long = "duration", value_name = "SECONDS", default_value_t = 1.0)]
    duration: f64,

    /// Number of ticks per second of simulated time.
    ///
    /// Each tick feeds this fraction of a second to the world's fixed-step clock, which
    /// may run any number of sub-steps in response.
    #[arg(long = "tick-rate", value_name = "HZ", default_value_t = 60.0)]
    tick_rate: f64,

    /// Seed value for randomized scenes.
    #[arg(long = "seed", default_value_t = 0)]
    seed: u64,

    /// Run the simulation on its own thread against the real clock, rather than
    /// deterministically on the main thread.
    #[arg(long = "threaded")]
    threaded: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    logging: LoggingArgs,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
enum Scene {
    /// Two spheres meeting head-on.
    HeadOn,
    /// Many spheres of assorted sizes falling onto a large one.
    Rain,
    /// A chain of linked spheres struck at one end.
    Chain,
}

/// Totals gathered over a whole run.
#[derive(Clone, Copy, Debug, Default)]
struct RunReport {
    ticks: u64,
    steps: u64,
    /// Only reported for threaded runs, where it is not deterministic anyway.
    step_time: Option<TimeStats>,
}

fn main() -> Result<(), anyhow::Error> {
    let HeadlessArgs {
        scene,
        duration,
        tick_rate,
        seed,
        threaded,
        config,
        logging: logging_args,
    } = HeadlessArgs::parse();

    logging::install(&logging_args)?;

    let config = config.build_config()?;
    let tick_length = tick_length(tick_rate)?;
    if !(duration.is_finite() && duration >= 0.0) {
        anyhow::bail!("--duration must be a finite non-negative number, not {duration}");
    }

    let mut world = World::new(config).context("invalid physics configuration")?;
    match scene {
        Scene::HeadOn => {
            content::head_on_pair(&mut world);
        }
        Scene::Rain => {
            content::rain(&mut world, RAIN_COUNT, seed);
        }
        Scene::Chain => {
            content::chain(&mut world, CHAIN_LINKS);
        }
    }
    log::debug!(
        "simulating {} with {} entities for {duration} s",
        <&str>::from(scene),
        world.store().len()
    );

    let (world, report) = if threaded {
        run_threaded(world, duration, tick_length)?
    } else {
        let ticks = (duration * tick_rate).round() as u64;
        run_deterministic(world, ticks, tick_length)
    };

    print_summary(&mut io::stdout().lock(), scene, &world, &report)
        .context("failed to write summary")?;
    Ok(())
}

fn tick_length(tick_rate: f64) -> Result<Duration, anyhow::Error> {
    if !(tick_rate.is_finite() && tick_rate > 0.0) {
        anyhow::bail!("--tick-rate must be a finite positive number, not {tick_rate}");
    }
    Duration::try_from_secs_f64(tick_rate.recip())
        .with_context(|| format!("--tick-rate {tick_rate} is out of range"))
}

/// Feeds `ticks` ticks of `tick_length` each to the world, with no regard for the real
/// time taken.
fn run_deterministic(mut world: World, ticks: u64, tick_length: Duration) -> (World, RunReport) {
    let mut report = RunReport::default();
    for _ in 0..ticks {
        let outcome = world.tick(tick_length);
        report.ticks += 1;
        report.steps += u64::from(outcome.steps);
    }
    (world, report)
}

/// Runs the world on a [`SimulationThread`] for `duration` seconds of real time.
fn run_threaded(
    world: World,
    duration: f64,
    tick_length: Duration,
) -> Result<(World, RunReport), anyhow::Error> {
    let run_time = Duration::try_from_secs_f64(duration)
        .with_context(|| format!("--duration {duration} is out of range"))?;
    let steps_before = world.clock().steps_taken();
    let worker = SimulationThread::spawn(world, tick_length)
        .context("failed to start simulation thread")?;
    thread::sleep(run_time);
    let status = worker.status();
    let world = worker.join()?;
    let report = RunReport {
        ticks: status.ticks,
        steps: world.clock().steps_taken() - steps_before,
        step_time: Some(status.step_time),
    };
    Ok((world, report))
}

fn print_summary(
    out: &mut impl io::Write,
    scene: Scene,
    world: &World,
    report: &RunReport,
) -> io::Result<()> {
    let mut escaped = Vec::new();
    world.out_of_bounds(&mut escaped);

    writeln!(out, "scene: {}", <&str>::from(scene))?;
    writeln!(out, "entities: {}", world.store().len())?;
    writeln!(out, "ticks: {}", report.ticks)?;
    writeln!(out, "simulated steps: {}", report.steps)?;
    writeln!(out, "last step: {}", world.diagnostics())?;
    writeln!(out, "out of bounds: {}", escaped.len())?;
    if let Some(step_time) = report.step_time {
        writeln!(out, "tick time: {step_time}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use spherics::config::PhysicsConfig;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory as _;
        HeadlessArgs::command().debug_assert();
    }

    #[test]
    fn deterministic_run_counts_steps() {
        let mut world = World::new(PhysicsConfig::default()).unwrap();
        content::head_on_pair(&mut world);
        let (world, report) = run_deterministic(world, 30, tick_length(60.0).unwrap());
        assert_eq!((report.ticks, report.steps), (30, 30));
        assert_eq!(world.diagnostics().step_count, 30);
    }

    #[test]
    fn summary_format() {
        let world = World::new(PhysicsConfig::default()).unwrap();
        let mut out = Vec::new();
        print_summary(&mut out, Scene::Rain, &world, &RunReport::default()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "scene: rain\n\
            entities: 0\n\
            ticks: 0\n\
            simulated steps: 0\n\
            last step: step 0: 0 colliders, 0 indexed, 0 candidate pairs, 0 hits\n\
            out of bounds: 0\n"
        );
    }

    #[test]
    fn bad_tick_rate() {
        assert_eq!(
            tick_length(0.0).unwrap_err().to_string(),
            "--tick-rate must be a finite positive number, not 0"
        );
    }
}
