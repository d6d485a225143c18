//! Data types for simulated and real time, and the fixed-step scheduling policy.

use core::fmt;

use crate::config::{ConfigError, PhysicsConfig};
use crate::math::PositiveSign;

// -------------------------------------------------------------------------------------------------

#[doc(inline)]
pub use spherics_base::time::*;

/// Specifies an amount of time passing in the simulation: the length of one sub-step.
///
/// [`Tick`]s are produced by a [`FixedStepClock`] and passed to
/// [`World::step()`](crate::physics::World::step).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    /// Real time which this tick accounts for.
    step: Duration,
    /// Multiplier from real to simulated time.
    timescale: PositiveSign,
    /// How many ticks the originating clock produced before this one.
    sequence: u64,
}

impl Tick {
    /// Construct a [`Tick`] lasting `dt` seconds at timescale 1.
    ///
    /// This is intended for tests and tools which step a world directly; negative or
    /// non-finite `dt` becomes zero.
    pub fn from_seconds(dt: f64) -> Self {
        Self {
            step: Duration::try_from_secs_f64(dt).unwrap_or(Duration::ZERO),
            timescale: PositiveSign::ONE,
            sequence: 0,
        }
    }

    /// Returns the real time this tick accounts for, ignoring the timescale.
    pub fn real_duration(self) -> Duration {
        self.step
    }

    /// Returns the amount of simulated time passed, in seconds.
    pub fn delta_t_f64(self) -> f64 {
        self.step.as_secs_f64() * self.timescale.into_inner()
    }

    /// Returns whether no simulated time passes in this tick, because the timescale is zero.
    ///
    /// A paused sub-step still detects contacts, so diagnostics stay current, but moves
    /// nothing.
    pub fn paused(self) -> bool {
        self.timescale.is_zero()
    }

    /// Returns the number of ticks the originating clock produced before this one.
    pub fn sequence(self) -> u64 {
        self.sequence
    }
}

// -------------------------------------------------------------------------------------------------

/// What a [`FixedStepClock`] does when more time has accumulated than it is allowed to
/// catch up on.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum OverloadPolicy {
    /// Run as many sub-steps as the accumulated time calls for.
    #[default]
    Accumulate,
    /// Discard one sub-step's worth of time and run no sub-steps in this tick.
    Skip,
}

/// Summary of one call to [`FixedStepClock::tick()`] or
/// [`World::tick()`](crate::physics::World::tick).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct TickOutcome {
    /// Number of sub-steps that ran.
    pub steps: u32,
    /// Whether the accumulated time exceeded the configured maximum.
    pub overloaded: bool,
    /// Whether a sub-step's worth of time was discarded because of overload.
    pub skipped: bool,
    /// Whether this tick logged the overload warning.
    pub warned: bool,
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            steps,
            overloaded,
            skipped,
            warned: _,
        } = *self;
        write!(f, "{steps} steps")?;
        if skipped {
            write!(f, " (overloaded, skipped)")?;
        } else if overloaded {
            write!(f, " (overloaded)")?;
        }
        Ok(())
    }
}

/// Converts real elapsed time into a sequence of fixed-length [`Tick`]s.
///
/// Time is accumulated as an exact [`Duration`], so the time consumed by sub-steps plus
/// the time still accumulated always equals the time fed in, minus any time discarded by
/// [`OverloadPolicy::Skip`]. This operation is independent of the system clock.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FixedStepClock {
    fixed_step: Duration,
    max_accumulated: Duration,
    policy: OverloadPolicy,
    timescale: PositiveSign,

    accumulated_step_time: Duration,

    /// Total time passed to [`Self::advance_by()`].
    time_fed: Duration,
    /// Value of `time_fed` when the overload warning was last logged.
    last_overload_warning: Option<Duration>,

    steps_taken: u64,
}

impl FixedStepClock {
    /// Minimum amount of fed time between two overload warnings.
    const WARNING_INTERVAL: Duration = Duration::from_secs(1);

    /// Constructs a clock from the timing fields of `config`.
    ///
    /// Fails if the fixed step is not positive, the maximum is less than the fixed step,
    /// or the timescale is negative or not finite; such a clock could never make progress.
    pub fn new(config: &PhysicsConfig) -> Result<Self, ConfigError> {
        let fixed_step = config.fixed_step()?;
        Ok(Self {
            fixed_step,
            max_accumulated: config.max_step(fixed_step)?,
            policy: if config.accumulate_on_overload {
                OverloadPolicy::Accumulate
            } else {
                OverloadPolicy::Skip
            },
            timescale: config.timescale()?,
            accumulated_step_time: Duration::ZERO,
            time_fed: Duration::ZERO,
            last_overload_warning: None,
            steps_taken: 0,
        })
    }

    /// Returns the length of one sub-step in real time.
    pub fn fixed_step(&self) -> Duration {
        self.fixed_step
    }

    /// Returns the time accumulated and not yet consumed by a sub-step.
    pub fn accumulated(&self) -> Duration {
        self.accumulated_step_time
    }

    /// Returns the number of [`Tick`]s this clock has produced.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Returns the overload policy in effect.
    pub fn policy(&self) -> OverloadPolicy {
        self.policy
    }

    /// Informs the clock that `delta` of real time has passed, and applies the overload
    /// policy.
    ///
    /// The returned outcome has `steps == 0`; the caller should then call
    /// [`Self::next_step()`] until it returns [`None`], unless the outcome says the time
    /// was skipped.
    pub fn advance_by(&mut self, delta: Duration) -> TickOutcome {
        self.accumulated_step_time = self.accumulated_step_time.saturating_add(delta);
        self.time_fed = self.time_fed.saturating_add(delta);

        let mut outcome = TickOutcome::default();
        if self.accumulated_step_time > self.max_accumulated {
            outcome.overloaded = true;
            if self
                .last_overload_warning
                .is_none_or(|last| self.time_fed - last >= Self::WARNING_INTERVAL)
            {
                self.last_overload_warning = Some(self.time_fed);
                outcome.warned = true;
                log::warn!(
                    "physics overloaded: {:?} of time accumulated, maximum {:?}; policy {:?}",
                    self.accumulated_step_time,
                    self.max_accumulated,
                    self.policy,
                );
            }
            if self.policy == OverloadPolicy::Skip {
                self.accumulated_step_time =
                    self.accumulated_step_time.saturating_sub(self.fixed_step);
                outcome.skipped = true;
            }
        }
        outcome
    }

    /// If at least one fixed step of time is accumulated, consumes it and returns the
    /// corresponding [`Tick`].
    pub fn next_step(&mut self) -> Option<Tick> {
        if self.accumulated_step_time < self.fixed_step {
            return None;
        }
        self.accumulated_step_time -= self.fixed_step;
        let tick = Tick {
            step: self.fixed_step,
            timescale: self.timescale,
            sequence: self.steps_taken,
        };
        self.steps_taken += 1;
        Some(tick)
    }

    /// Advances the clock by `delta` and calls `step` once for every sub-step that is due.
    pub fn tick(&mut self, delta: Duration, mut step: impl FnMut(Tick)) -> TickOutcome {
        let mut outcome = self.advance_by(delta);
        if outcome.skipped {
            return outcome;
        }
        while let Some(tick) = self.next_step() {
            step(tick);
            outcome.steps = outcome.steps.saturating_add(1);
        }
        outcome
    }
}

// -------------------------------------------------------------------------------------------------
