//! Mathematical utilities and decisions.

pub use ordered_float::{FloatIsNan, NotNan};

mod coord;
pub use coord::*;
mod restricted_number;
pub use restricted_number::*;
#[cfg(feature = "serde")]
mod serde_impls;

/// Sort two values so that the lesser one comes first.
#[inline]
pub fn sort_two<T: Ord>(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Returns whether `point` lies within the axis-aligned cube centered on the origin whose
/// faces are at distance `half_extent` from the origin. Points exactly on a face are inside.
///
/// NaN coordinates are never inside.
#[inline]
pub fn within_cube(point: FreePoint, half_extent: FreeCoordinate) -> bool {
    point.x.abs() <= half_extent && point.y.abs() <= half_extent && point.z.abs() <= half_extent
}
