//! Tunable parameters of a [`World`](crate::physics::World).

use crate::math::PositiveSign;
use crate::physics::Gravity;
use crate::physics::resolve::ContactResponse;
use crate::time::Duration;

/// Parameters of the simulation, fixed for the lifetime of a world.
///
/// With the `serde` feature, this may be deserialized from a partial description; missing
/// fields take their [`Default`] values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[non_exhaustive]
pub struct PhysicsConfig {
    /// Length of one sub-step, in seconds. Must be positive.
    pub fixed_timestep: f64,

    /// Accumulated time, in seconds, beyond which the clock is considered overloaded.
    /// Must be at least [`fixed_timestep`](Self::fixed_timestep).
    pub max_timestep: f64,

    /// What to do when overloaded: if true, run as many catch-up sub-steps as the
    /// accumulated time calls for; if false, discard one sub-step's worth of time and
    /// run none this tick.
    pub accumulate_on_overload: bool,

    /// Multiplier from real time to simulated time. Zero pauses the simulation while
    /// still running sub-steps.
    pub timescale: f64,

    /// Half the edge length of the cube, centered on the origin, which is considered
    /// in bounds. Also the extent of the root node of the default spatial index.
    pub world_half_extent: f64,

    /// How bodies fall.
    pub gravity: Gravity,

    /// How colliding bodies' velocities change.
    pub contact_response: ContactResponse,

    /// Maximum depth of the default spatial index's tree.
    pub tree_max_depth: u8,
}

impl PhysicsConfig {
    /// Checks every field for values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fixed = self.fixed_step()?;
        self.max_step(fixed)?;
        self.timescale()?;
        if !(self.world_half_extent.is_finite() && self.world_half_extent > 0.0) {
            return Err(ConfigError::InvalidExtent(self.world_half_extent));
        }
        Ok(())
    }

    /// Returns [`Self::fixed_timestep`] as a [`Duration`].
    pub fn fixed_step(&self) -> Result<Duration, ConfigError> {
        let seconds = self.fixed_timestep;
        match Duration::try_from_secs_f64(seconds) {
            Ok(d) if !d.is_zero() && seconds.is_finite() => Ok(d),
            _ => Err(ConfigError::NonPositiveTimestep(seconds)),
        }
    }

    /// Returns [`Self::max_timestep`] as a [`Duration`], given the already validated fixed
    /// step.
    pub(crate) fn max_step(&self, fixed: Duration) -> Result<Duration, ConfigError> {
        let error = ConfigError::MaxBelowFixed {
            max: self.max_timestep,
            fixed: self.fixed_timestep,
        };
        match Duration::try_from_secs_f64(self.max_timestep) {
            Ok(max) if max >= fixed && self.max_timestep.is_finite() => Ok(max),
            _ => Err(error),
        }
    }

    pub(crate) fn timescale(&self) -> Result<PositiveSign, ConfigError> {
        PositiveSign::try_from(self.timescale)
            .ok()
            .filter(|t| t.is_finite())
            .ok_or(ConfigError::InvalidTimescale(self.timescale))
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_timestep: 0.25,
            accumulate_on_overload: true,
            timescale: 1.0,
            world_half_extent: 1000.0,
            gravity: Gravity::default(),
            contact_response: ContactResponse::default(),
            tree_max_depth: 5,
        }
    }
}

/// Error from [`PhysicsConfig::validate()`] or anything that validates a configuration.
#[derive(Clone, Debug, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum ConfigError {
    /// fixed timestep must be a positive number of seconds, not {0}
    NonPositiveTimestep(f64),

    /// max timestep ({max} s) must be a number at least as large as the fixed timestep ({fixed} s)
    MaxBelowFixed {
        /// Configured maximum.
        max: f64,
        /// Configured fixed step.
        fixed: f64,
    },

    /// timescale must be finite and non-negative, not {0}
    InvalidTimescale(f64),

    /// world half extent must be finite and positive, not {0}
    InvalidExtent(f64),
}

impl std::error::Error for ConfigError {}
