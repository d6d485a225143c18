//! Running a [`World`] on its own thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::physics::broadphase::{SpatialIndex, SphereTree};
use crate::physics::{Diagnostics, World};
use crate::time::{Duration, Instant, TickOutcome, TimeStats};

type Command<I> = Box<dyn FnOnce(&mut World<I>) + Send>;

/// Latest information published by a [`SimulationThread`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct WorkerStatus {
    /// Diagnostics of the most recent sub-step.
    pub diagnostics: Diagnostics,
    /// Real time spent in [`World::tick()`], over all ticks so far.
    pub step_time: TimeStats,
    /// Number of calls to [`World::tick()`] so far.
    pub ticks: u64,
    /// Outcome of the most recent tick.
    pub last_outcome: TickOutcome,
}

#[derive(Debug, Default)]
struct Shared {
    stop: AtomicBool,
    status: Mutex<WorkerStatus>,
}

/// Error returned when the simulation thread is no longer running.
#[derive(Clone, Copy, Debug, Eq, PartialEq, displaydoc::Display)]
#[displaydoc("the simulation thread has stopped")]
#[expect(clippy::exhaustive_structs)]
pub struct WorkerStopped;

impl std::error::Error for WorkerStopped {}

/// Error returned by [`SimulationThread::join()`] when the thread panicked.
#[derive(Clone, Copy, Debug, Eq, PartialEq, displaydoc::Display)]
#[displaydoc("the simulation thread panicked")]
#[expect(clippy::exhaustive_structs)]
pub struct WorkerPanicked;

impl std::error::Error for WorkerPanicked {}

/// Owns a thread which repeatedly calls [`World::tick()`] with the real time elapsed.
///
/// Dropping this without calling [`join()`](Self::join) stops the thread and discards the
/// world.
pub struct SimulationThread<I: SpatialIndex + Send + 'static = SphereTree> {
    handle: Option<thread::JoinHandle<World<I>>>,
    shared: Arc<Shared>,
    commands: flume::Sender<Command<I>>,
}

impl<I: SpatialIndex + Send + 'static> SimulationThread<I> {
    /// Moves `world` to a new thread and starts ticking it, aiming for one tick per
    /// `period`.
    ///
    /// Sub-steps are still of the world's configured fixed length; `period` only sets how
    /// often the thread wakes up to run the ones that are due.
    pub fn spawn(world: World<I>, period: Duration) -> io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let (commands, receiver) = flume::unbounded();
        let handle = thread::Builder::new().name("spherics-sim".into()).spawn({
            let shared = shared.clone();
            move || run(world, period, &shared, &receiver)
        })?;
        Ok(Self {
            handle: Some(handle),
            shared,
            commands,
        })
    }

    /// Arranges for `f` to be called with the world between two ticks.
    ///
    /// Use this to spawn and destroy entities. All edits sent before [`Self::stop()`] are
    /// applied before the thread exits.
    pub fn edit(
        &self,
        f: impl FnOnce(&mut World<I>) + Send + 'static,
    ) -> Result<(), WorkerStopped> {
        self.commands
            .send(Box::new(f))
            .map_err(|flume::SendError(_)| WorkerStopped)
    }

    /// Returns the most recently published status.
    pub fn status(&self) -> WorkerStatus {
        *self
            .shared
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Asks the thread to stop after its current tick.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Stops the thread, waits for it to exit, and returns the world.
    pub fn join(mut self) -> Result<World<I>, WorkerPanicked> {
        self.stop();
        let handle = self.handle.take().ok_or(WorkerPanicked)?;
        handle.join().map_err(|_| WorkerPanicked)
    }
}

impl<I: SpatialIndex + Send + 'static> Drop for SimulationThread<I> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[mutants::skip]
impl<I: SpatialIndex + Send + 'static> core::fmt::Debug for SimulationThread<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulationThread")
            .field("running", &self.handle.as_ref().is_some_and(|h| !h.is_finished()))
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

fn run<I: SpatialIndex>(
    mut world: World<I>,
    period: Duration,
    shared: &Shared,
    commands: &flume::Receiver<Command<I>>,
) -> World<I> {
    let mut last_tick = Instant::now();
    while !shared.stop.load(Ordering::Acquire) {
        for command in commands.try_iter() {
            command(&mut world);
        }

        let start = Instant::now();
        let elapsed = start.saturating_duration_since(last_tick);
        last_tick = start;
        let (outcome, time) = TimeStats::measure(|| world.tick(elapsed));

        {
            let mut status = shared.status.lock().unwrap_or_else(PoisonError::into_inner);
            status.diagnostics = world.diagnostics();
            status.step_time += time;
            status.ticks += 1;
            status.last_outcome = outcome;
        }

        if let Some(remaining) = period.checked_sub(start.elapsed()) {
            thread::sleep(remaining);
        }
    }
    for command in commands.try_iter() {
        command(&mut world);
    }
    log::debug!("simulation thread stopping after {:?}", world.diagnostics());
    world
}
