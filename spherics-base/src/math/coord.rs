//! Numeric types used for coordinates and related quantities.

use euclid::{Point3D, Vector3D};

/// Unit-of-measure type for positions and displacements in the simulation's world space.
#[derive(Debug)]
#[expect(clippy::exhaustive_enums)]
pub enum Sim {}

/// Scalar type of all simulated quantities.
pub type FreeCoordinate = f64;

/// Positions in world space.
pub type FreePoint = Point3D<FreeCoordinate, Sim>;

/// Displacements in world space.
pub type FreeVector = Vector3D<FreeCoordinate, Sim>;

/// The direction which gravity pulls away from.
pub const UP: FreeVector = FreeVector::new(0., 1., 0.);

/// Returns whether every component of the vector is finite.
#[inline]
pub fn is_finite_vector<U>(v: Vector3D<FreeCoordinate, U>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// Returns whether every component of the point is finite.
#[inline]
pub fn is_finite_point<U>(p: Point3D<FreeCoordinate, U>) -> bool {
    is_finite_vector(p.to_vector())
}
