//! Moving spheres and their collisions.
//!
//! [`World`] owns the simulation state and runs sub-steps; the other modules hold the
//! individual stages of a sub-step, each usable on its own.

mod body;
pub use body::*;
pub mod broadphase;
pub mod hierarchy;
mod integrate;
pub use integrate::*;
pub mod narrowphase;
pub mod pairing;
pub mod resolve;
mod world;
pub use world::*;

/// Unit-of-measure type for vectors that are velocity in world units per second.
///
/// Acceleration and impulse share this unit: the integrator adds all three to the
/// velocity when moving a body.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug, Eq, PartialEq)]
pub enum Velocity {}
