//! Exact intersection test for pairs of spheres.

use crate::math::{FreeCoordinate, FreePoint, FreeVector, UP, is_finite_vector};

/// Result of [`test_sphere_sphere()`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct SphereContact {
    /// Whether the spheres touch or overlap.
    pub hit: bool,
    /// Unit vector pointing from the second sphere's center towards the first's.
    /// If the centers coincide, this is [`UP`].
    pub normal: FreeVector,
    /// How far the spheres are from just touching, measured in squared distance:
    /// `|distance² − (radius_a + radius_b)²|`.
    pub penetration: FreeCoordinate,
}

/// Tests whether sphere A (`pos_a`, `radius_a`) and sphere B (`pos_b`, `radius_b`)
/// intersect. Touching counts as intersecting.
///
/// The normal is always finite, even for coincident or non-finite centers.
pub fn test_sphere_sphere(
    pos_a: FreePoint,
    radius_a: FreeCoordinate,
    pos_b: FreePoint,
    radius_b: FreeCoordinate,
) -> SphereContact {
    let offset = pos_a - pos_b;
    let squared_distance = offset.square_length();
    let reach = radius_a + radius_b;
    let reach_squared = reach * reach;

    let length = squared_distance.sqrt();
    let normal = if length > 0.0 && length.is_finite() {
        let n = offset / length;
        if is_finite_vector(n) { n } else { UP }
    } else {
        UP
    };

    SphereContact {
        hit: squared_distance <= reach_squared,
        normal,
        penetration: (squared_distance - reach_squared).abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::MultiFailure;
    use pretty_assertions::assert_eq;
    use rand::{Rng as _, SeedableRng as _};
    use rand_xoshiro::Xoshiro256PlusPlus;
    use rstest::rstest;

    #[rstest]
    #[case::apart(3.0, 1.0, 1.0, false)]
    #[case::touching(2.0, 1.0, 1.0, true)]
    #[case::overlapping(1.9, 1.0, 1.0, true)]
    #[case::nested(0.1, 5.0, 0.5, true)]
    #[case::points(0.0, 0.0, 0.0, true)]
    fn hit_cases(
        #[case] distance: f64,
        #[case] ra: f64,
        #[case] rb: f64,
        #[case] expected: bool,
    ) {
        let contact = test_sphere_sphere(
            FreePoint::new(distance, 0., 0.),
            ra,
            FreePoint::origin(),
            rb,
        );
        assert_eq!(contact.hit, expected);
    }

    #[test]
    fn normal_points_from_b_to_a() {
        let contact = test_sphere_sphere(
            FreePoint::new(0., 0., -1.5),
            1.0,
            FreePoint::new(0., 0., 0.),
            1.0,
        );
        assert_eq!(contact.normal, FreeVector::new(0., 0., -1.));
        assert_eq!(contact.penetration, (2.25f64 - 4.0).abs());
    }

    #[test]
    fn coincident_centers_use_fallback_normal() {
        let p = FreePoint::new(3., 4., 5.);
        let contact = test_sphere_sphere(p, 1.0, p, 1.0);
        assert!(contact.hit);
        assert_eq!(contact.normal, UP);
        assert_eq!(contact.penetration, 4.0);
    }

    #[test]
    fn non_finite_input_has_finite_normal() {
        let contact = test_sphere_sphere(
            FreePoint::new(f64::INFINITY, 0., 0.),
            1.0,
            FreePoint::origin(),
            1.0,
        );
        assert!(!contact.hit);
        assert_eq!(contact.normal, UP);
    }

    /// `hit` agrees with comparing the (unsquared) distance to the sum of radii, except
    /// within rounding of the boundary.
    #[test]
    fn hit_matches_distance() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut failures = MultiFailure::new();
        for _ in 0..2000 {
            let a = FreePoint::new(
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
            );
            let b = FreePoint::new(
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
            );
            let ra = rng.random_range(0.0..4.0);
            let rb = rng.random_range(0.0..4.0);
            let d = (a - b).length();
            if (d - (ra + rb)).abs() < 1e-9 {
                continue;
            }
            failures.catch(|| {
                let contact = test_sphere_sphere(a, ra, b, rb);
                assert_eq!(contact.hit, d <= ra + rb, "{a:?} {ra} {b:?} {rb}");
                assert!((contact.normal.length() - 1.0).abs() < 1e-12);
            });
        }
    }
}
