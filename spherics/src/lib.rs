//! spherics is a fixed-timestep physics core for worlds of spheres.
//!
//! Each sub-step rebuilds a spatial index from the colliders' start-of-step positions,
//! finds candidate pairs (broadphase), confirms them with an exact sphere test
//! (narrowphase), resolves confirmed contacts with a mass-weighted impulse and position
//! correction, and finally integrates every active body.
//!
//! ## Data model
//!
//! * The [`EntityStore`](store::EntityStore) holds typed tables of components, keyed by
//!   [`EntityId`](store::EntityId): [`Body`](physics::Body) (velocity and mass),
//!   [`Transform`](physics::Transform) (position and parent link), and
//!   [`Collider`](physics::Collider) (sphere radius and skin).
//! * Bodies linked by [`Transform::parent`](physics::Transform::parent) form compounds.
//!   During contact resolution a compound responds with its combined mass and velocity,
//!   and parts of the same compound never collide with each other.
//! * Which entities take part in a step is decided by lists of active ids that may be
//!   replaced from any thread via an [`ActiveSetSender`](active::ActiveSetSender).
//!
//! ## Time
//!
//! [`World::tick()`](physics::World::tick) accepts real elapsed time and runs as many
//! fixed-length sub-steps as it covers, following the overload policy chosen in
//! [`PhysicsConfig`](config::PhysicsConfig). [`worker::SimulationThread`] runs that loop on a
//! dedicated thread.
//!
//! ## Coordinate system
//!
//! World space is right-handed with +Y up; gravity pulls towards −Y.
//!
//! ## Crate features
//!
//! * `serde`: Enable [`serde`] serialization of [`PhysicsConfig`](config::PhysicsConfig).
//! * `arbitrary`: Adds implementations of the [`arbitrary::Arbitrary`] trait for
//!   fuzzing.

pub mod active;
pub mod config;
pub mod content;
pub mod math;
pub mod physics;
pub mod store;
pub mod time;
pub mod util;
pub mod worker;

/// Re-export of the version of the [`euclid`] vector math library we use.
pub use euclid;
