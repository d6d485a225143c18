use core::fmt;

use euclid::Vector3D;
use manyfmt::Refmt as _;

use crate::math::{FreeCoordinate, FreeVector, PositiveSign, UP, is_finite_vector};
use crate::physics::{Body, Velocity};
use crate::time::Tick;
use crate::util::ConciseDebug;

/// Acceleration of gravity near Earth's surface, in world units per second squared.
pub const STANDARD_GRAVITY: FreeCoordinate = 9.8;

/// How gravity affects bodies.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub enum GravityMode {
    /// Each sub-step moves the body down by `dt × g`, without changing its velocity.
    /// Bodies therefore fall at a constant speed.
    #[default]
    PositionDelta,
    /// Each sub-step adds `dt × g` to the downward velocity, so bodies accelerate.
    Velocity,
    /// No gravity.
    Disabled,
}

/// Gravity settings of a world.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub struct Gravity {
    /// How gravity is applied.
    pub mode: GravityMode,
    /// Magnitude of gravity, pulling towards −Y.
    pub strength: PositiveSign,
}

impl Gravity {
    /// Gravity of the given mode and strength.
    pub const fn new(mode: GravityMode, strength: PositiveSign) -> Self {
        Self { mode, strength }
    }

    /// No gravity at all.
    pub const DISABLED: Self = Self::new(GravityMode::Disabled, PositiveSign::ZERO);
}

impl Default for Gravity {
    fn default() -> Self {
        Self::new(
            GravityMode::PositionDelta,
            PositiveSign::new_strict(STANDARD_GRAVITY),
        )
    }
}

/// Diagnostic record of what [`integrate_body()`] did to one body.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct BodyStepDetails {
    /// Displacement to apply to the body's position.
    pub displacement: FreeVector,
    /// Whether the velocity was small enough to be set to zero.
    pub came_to_rest: bool,
    /// Whether some part of the body's state was non-finite and was reset.
    pub reset_non_finite: bool,
}

impl manyfmt::Fmt<ConciseDebug> for BodyStepDetails {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, fopt: &ConciseDebug) -> fmt::Result {
        let &Self {
            displacement,
            came_to_rest,
            reset_non_finite,
        } = self;
        fmt.debug_struct("BodyStepDetails")
            .field("displacement", &displacement.refmt(fopt))
            .field("came_to_rest", &came_to_rest)
            .field("reset_non_finite", &reset_non_finite)
            .finish()
    }
}

fn reset_if_non_finite(
    v: &mut Vector3D<FreeCoordinate, Velocity>,
    what: &str,
    reset: &mut bool,
) {
    if !is_finite_vector(*v) {
        log::warn!("resetting non-finite {what} {:?}", v.refmt(&ConciseDebug));
        *v = Vector3D::zero();
        *reset = true;
    }
}

/// Advances one body by one tick, and returns the displacement its position should undergo.
///
/// In order:
///
/// 1. velocity is reduced by `drag × dt`;
/// 2. impulse decays by `dt`;
/// 3. velocity is zeroed if its magnitude is at most `dt`;
/// 4. with [`GravityMode::Velocity`], gravity is added to the velocity;
/// 5. the displacement is `dt × (velocity + acceleration + impulse)`;
/// 6. with [`GravityMode::PositionDelta`], gravity is added to the displacement.
///
/// Gravity is scaled by `1 − resistance`. Non-finite state is reset to zero with a
/// warning rather than propagated.
pub fn integrate_body(body: &mut Body, tick: Tick, gravity: Gravity) -> BodyStepDetails {
    let dt = tick.delta_t_f64();
    let mut reset_non_finite = false;

    body.velocity *= 1.0 - body.drag.into_inner() * dt;
    body.impulse *= 1.0 - dt;

    let came_to_rest = body.velocity.length() <= dt;
    if came_to_rest {
        body.velocity = Vector3D::zero();
    }

    let fall = dt * -gravity.strength.into_inner() * body.resistance.complement().into_inner();
    if gravity.mode == GravityMode::Velocity {
        body.velocity += UP.cast_unit() * fall;
    }

    reset_if_non_finite(&mut body.velocity, "velocity", &mut reset_non_finite);
    reset_if_non_finite(&mut body.acceleration, "acceleration", &mut reset_non_finite);
    reset_if_non_finite(&mut body.impulse, "impulse", &mut reset_non_finite);

    let mut displacement: FreeVector =
        ((body.velocity + body.acceleration + body.impulse) * dt).cast_unit();
    if gravity.mode == GravityMode::PositionDelta {
        displacement += UP * fall;
    }
    if !is_finite_vector(displacement) {
        log::warn!(
            "discarding non-finite displacement {:?}",
            displacement.refmt(&ConciseDebug)
        );
        displacement = FreeVector::zero();
        reset_non_finite = true;
    }

    BodyStepDetails {
        displacement,
        came_to_rest,
        reset_non_finite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{ps64, zo64};
    use euclid::vec3;
    use pretty_assertions::assert_eq;

    const DT: f64 = 0.5;

    fn tick() -> Tick {
        Tick::from_seconds(DT)
    }

    #[test]
    fn moves_by_velocity() {
        let mut body = Body::new(ps64(1.0)).with_velocity(vec3(2.0, 0.0, 0.0));
        let details = integrate_body(&mut body, tick(), Gravity::DISABLED);
        assert_eq!(details.displacement, FreeVector::new(1.0, 0.0, 0.0));
        assert!(!details.came_to_rest);
        assert_eq!(body.velocity, vec3(2.0, 0.0, 0.0));
    }

    #[test]
    fn drag_and_impulse_decay() {
        let mut body = Body::new(ps64(1.0))
            .with_velocity(vec3(4.0, 0.0, 0.0))
            .with_drag(ps64(1.0));
        body.impulse = vec3(0.0, 2.0, 0.0);
        let details = integrate_body(&mut body, tick(), Gravity::DISABLED);
        assert_eq!(body.velocity, vec3(2.0, 0.0, 0.0));
        assert_eq!(body.impulse, vec3(0.0, 1.0, 0.0));
        assert_eq!(details.displacement, FreeVector::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn slow_body_comes_to_rest() {
        let mut body = Body::new(ps64(1.0)).with_velocity(vec3(0.3, 0.0, 0.0));
        let details = integrate_body(&mut body, tick(), Gravity::DISABLED);
        assert!(details.came_to_rest);
        assert_eq!(body.velocity, Vector3D::zero());
        assert_eq!(details.displacement, FreeVector::zero());
    }

    #[test]
    fn position_delta_gravity() {
        let gravity = Gravity::new(GravityMode::PositionDelta, ps64(10.0));
        let mut body = Body::new(ps64(1.0)).with_resistance(zo64(0.25));
        let details = integrate_body(&mut body, tick(), gravity);
        assert_eq!(details.displacement, FreeVector::new(0.0, -3.75, 0.0));
        assert_eq!(body.velocity, Vector3D::zero(), "velocity must be unchanged");
    }

    #[test]
    fn velocity_gravity_accumulates() {
        let gravity = Gravity::new(GravityMode::Velocity, ps64(10.0));
        let mut body = Body::new(ps64(1.0));
        let first = integrate_body(&mut body, tick(), gravity);
        assert_eq!(body.velocity, vec3(0.0, -5.0, 0.0));
        assert_eq!(first.displacement, FreeVector::new(0.0, -2.5, 0.0));
        let second = integrate_body(&mut body, tick(), gravity);
        assert_eq!(body.velocity, vec3(0.0, -10.0, 0.0));
        assert_eq!(second.displacement, FreeVector::new(0.0, -5.0, 0.0));
    }

    #[test]
    fn non_finite_is_reset() {
        let mut body = Body::new(ps64(1.0)).with_velocity(vec3(f64::NAN, 0.0, 0.0));
        body.acceleration = vec3(0.0, f64::INFINITY, 0.0);
        let details = integrate_body(&mut body, tick(), Gravity::DISABLED);
        assert!(details.reset_non_finite);
        assert_eq!(body.velocity, Vector3D::zero());
        assert_eq!(body.acceleration, Vector3D::zero());
        assert_eq!(details.displacement, FreeVector::zero());
    }

    #[test]
    fn concise_details() {
        let details = BodyStepDetails {
            displacement: FreeVector::new(1.0, 0.0, -0.5),
            came_to_rest: false,
            reset_non_finite: false,
        };
        assert_eq!(
            format!("{:?}", details.refmt(&ConciseDebug)),
            "BodyStepDetails { displacement: (+1.000, +0.000, -0.500), came_to_rest: false, \
            reset_non_finite: false }"
        );
    }
}
