//! Contact resolution: a mass-weighted velocity impulse plus a positional push-out.
//!
//! Resolution is split into computing [`Correction`]s, which only reads the store, and
//! applying them afterwards, so that every contact in a sub-step sees the same
//! start-of-step state regardless of the order contacts are processed in.

use euclid::Vector3D;

use crate::math::{FreeCoordinate, FreeVector, is_finite_point, is_finite_vector};
use crate::physics::hierarchy::{self, HierarchyError};
use crate::physics::pairing::Contact;
use crate::physics::{Body, Transform, Velocity};
use crate::store::{EntityId, EntityStore};

/// Scale of the positional push-out, relative to the contact's penetration depth.
pub const SOLVER_MODIFIER: FreeCoordinate = 0.5;

/// Masses below this are treated as this, so that a massless compound does not produce an
/// infinite response.
const MIN_MASS: FreeCoordinate = 1e-6;

/// Lower bound of the impulse divisor.
const DIVISOR_EPSILON: FreeCoordinate = 1e-12;

/// How [`resolve_contact()`] computes the velocity response of a contact.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub enum ContactResponse {
    /// The relative velocity is projected on the contact normal, and only approaching
    /// compounds respond. Each side receives `(1 + restitution) × energy` divided by its
    /// mass, which with unit restitution is an elastic exchange.
    #[default]
    ProjectedClosing,
    /// The energy is the difference of the two speeds,
    /// `(|v_target| − |v_other|) × |n| / (|n|² × (1/m_target + 1/m_other))`, and each side
    /// receives `restitution × energy` divided by its mass, whether or not the compounds
    /// are approaching.
    ///
    /// Two compounds meeting head-on at equal speeds get no velocity response, so they
    /// keep moving into each other and only the positional push separates them.
    SpeedDifference,
}

/// Change to one compound computed by [`resolve_contact()`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Correction {
    /// Root of the compound, whose transform moves.
    pub root: EntityId,
    /// Entity whose [`Body`] receives the velocity change: the root if it has a body,
    /// otherwise the entity that was in contact.
    pub body: EntityId,
    /// Velocity to add.
    pub delta_velocity: Vector3D<FreeCoordinate, Velocity>,
    /// Displacement to add to the root's local position.
    pub delta_position: FreeVector,
}

/// Reason [`resolve_contact()`] produced no correction for a contact.
#[derive(Clone, Copy, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum ResolveSkip {
    /// both sides belong to the compound rooted at {root}
    SameCompound {
        /// The shared root.
        root: EntityId,
    },
    /// could not walk the hierarchy
    Hierarchy(HierarchyError),
    /// {entity} has no body to take restitution and mass from
    MissingComponent {
        /// Entity whose compound lacks a body.
        entity: EntityId,
    },
}

impl std::error::Error for ResolveSkip {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveSkip::Hierarchy(e) => Some(e),
            ResolveSkip::SameCompound { .. } | ResolveSkip::MissingComponent { .. } => None,
        }
    }
}

impl From<HierarchyError> for ResolveSkip {
    fn from(value: HierarchyError) -> Self {
        ResolveSkip::Hierarchy(value)
    }
}

impl ResolveSkip {
    /// Entity that a repeat of this problem would be reported against, if it is a fault
    /// rather than an expected outcome.
    pub fn fault_entity(&self) -> Option<EntityId> {
        match *self {
            ResolveSkip::SameCompound { .. } => None,
            ResolveSkip::Hierarchy(
                HierarchyError::Cycle { entity } | HierarchyError::Missing { entity },
            ) => Some(entity),
            ResolveSkip::MissingComponent { entity } => Some(entity),
        }
    }
}

/// One side of a contact, after aggregation.
struct Side {
    root: EntityId,
    body: EntityId,
    inverse_mass: FreeCoordinate,
    velocity: Vector3D<FreeCoordinate, Velocity>,
    restitution: FreeCoordinate,
}

fn side(store: &EntityStore, entity: EntityId) -> Result<Side, ResolveSkip> {
    let aggregate = hierarchy::aggregate(store, entity)?;
    let root_body = store.get::<Body>(aggregate.root);
    let (body, restitution) = match (store.get::<Body>(entity), root_body) {
        (Some(own), _) => (
            if root_body.is_some() {
                aggregate.root
            } else {
                entity
            },
            own.restitution,
        ),
        (None, Some(root)) => (aggregate.root, root.restitution),
        (None, None) => return Err(ResolveSkip::MissingComponent { entity }),
    };
    Ok(Side {
        root: aggregate.root,
        body,
        inverse_mass: aggregate.mass.into_inner().max(MIN_MASS).recip(),
        velocity: aggregate.velocity,
        restitution: restitution.into_inner(),
    })
}

/// Computes the corrections for one contact, without changing anything.
///
/// The first correction is for the side of [`CollisionPair::a()`], towards which the
/// contact normal points; the second for [`CollisionPair::b()`].
///
/// * The velocity response is computed as `response` describes, from aggregate masses and
///   velocities.
/// * The positional response moves each side apart along the normal by
///   `penetration_depth × SOLVER_MODIFIER × restitution`.
///
/// [`CollisionPair::a()`]: crate::physics::pairing::CollisionPair::a
/// [`CollisionPair::b()`]: crate::physics::pairing::CollisionPair::b
pub fn resolve_contact(
    store: &EntityStore,
    contact: &Contact,
    response: ContactResponse,
) -> Result<[Correction; 2], ResolveSkip> {
    let target = side(store, contact.pair.a())?;
    let other = side(store, contact.pair.b())?;
    if target.root == other.root {
        return Err(ResolveSkip::SameCompound { root: target.root });
    }

    let n = contact.normal;
    let n_length = n.length();
    let n_hat: Vector3D<FreeCoordinate, Velocity> = if n_length > 0.0 {
        (n / n_length).cast_unit()
    } else {
        Vector3D::new(0.0, 1.0, 0.0)
    };

    let divisor =
        (n_length * n_length * (target.inverse_mass + other.inverse_mass)).max(DIVISOR_EPSILON);
    let (dv_target, dv_other) = match response {
        ContactResponse::ProjectedClosing => {
            let closing_speed = (other.velocity - target.velocity).dot(n_hat);
            let energy = closing_speed * n_length / divisor;
            if energy > 0.0 {
                (
                    n_hat * ((1.0 + target.restitution) * energy * target.inverse_mass),
                    -n_hat * ((1.0 + other.restitution) * energy * other.inverse_mass),
                )
            } else {
                (Vector3D::zero(), Vector3D::zero())
            }
        }
        ContactResponse::SpeedDifference => {
            let speed_difference = target.velocity.length() - other.velocity.length();
            let energy = speed_difference * n_length / divisor;
            (
                n_hat * (target.restitution * energy * target.inverse_mass),
                -n_hat * (other.restitution * energy * other.inverse_mass),
            )
        }
    };

    let push = contact.penetration_depth * SOLVER_MODIFIER;
    let n_hat_position: FreeVector = n_hat.cast_unit();
    Ok([
        Correction {
            root: target.root,
            body: target.body,
            delta_velocity: dv_target,
            delta_position: n_hat_position * (push * target.restitution),
        },
        Correction {
            root: other.root,
            body: other.body,
            delta_velocity: dv_other,
            delta_position: -n_hat_position * (push * other.restitution),
        },
    ])
}

/// Applies corrections to the store.
///
/// Non-finite corrections are discarded with a warning, and a position change is skipped
/// if it would make the position non-finite. Returns the number applied.
pub fn apply_corrections(store: &mut EntityStore, corrections: &[Correction]) -> usize {
    let mut applied = 0;
    for correction in corrections {
        if !(is_finite_vector(correction.delta_velocity)
            && is_finite_vector(correction.delta_position))
        {
            log::warn!("discarding non-finite contact correction {correction:?}");
            continue;
        }
        store.mutate(correction.body, |body: &mut Body| {
            body.velocity += correction.delta_velocity;
        });
        store.mutate(correction.root, |transform: &mut Transform| {
            let moved = transform.local_position + correction.delta_position;
            if is_finite_point(moved) {
                transform.local_position = moved;
            }
        });
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{FreePoint, ps64};
    use crate::physics::pairing::CollisionPair;
    use euclid::vec3;
    use pretty_assertions::assert_eq;

    fn spawn_body(store: &mut EntityStore, x: f64, vx: f64) -> EntityId {
        let id = store.spawn();
        store.insert(id, Transform::at(FreePoint::new(x, 0., 0.))).unwrap();
        store
            .insert(id, Body::new(ps64(1.0)).with_velocity(vec3(vx, 0., 0.)))
            .unwrap();
        id
    }

    fn contact(a: EntityId, b: EntityId, normal: FreeVector, depth: f64) -> Contact {
        Contact::new(CollisionPair::new(a, b).unwrap(), normal, depth)
    }

    #[test]
    fn head_on_reverses_velocities() {
        let mut store = EntityStore::new();
        let a = spawn_body(&mut store, -0.95, 2.0);
        let b = spawn_body(&mut store, 0.95, -2.0);
        let contact = contact(a, b, FreeVector::new(-1., 0., 0.), 0.39);

        let corrections = resolve_contact(&store, &contact, CLOSING).unwrap();
        assert_eq!(corrections[0].delta_velocity, vec3(-4.0, 0., 0.));
        assert_eq!(corrections[1].delta_velocity, vec3(4.0, 0., 0.));

        apply_corrections(&mut store, &corrections);
        assert_eq!(store.get::<Body>(a).unwrap().velocity, vec3(-2.0, 0., 0.));
        assert_eq!(store.get::<Body>(b).unwrap().velocity, vec3(2.0, 0., 0.));
        assert!(store.get::<Transform>(a).unwrap().local_position.x < -0.95);
        assert!(store.get::<Transform>(b).unwrap().local_position.x > 0.95);
    }

    #[test]
    fn separating_bodies_get_no_impulse() {
        let mut store = EntityStore::new();
        let a = spawn_body(&mut store, -0.95, -2.0);
        let b = spawn_body(&mut store, 0.95, 2.0);
        let corrections = resolve_contact(
            &store,
            &contact(a, b, FreeVector::new(-1., 0., 0.), 0.1),
            CLOSING,
        )
        .unwrap();
        assert_eq!(corrections[0].delta_velocity, Vector3D::zero());
        assert_eq!(corrections[1].delta_velocity, Vector3D::zero());
        // Position push-out still happens.
        assert_eq!(corrections[0].delta_position, FreeVector::new(-0.05, 0., 0.));
        assert_eq!(corrections[1].delta_position, FreeVector::new(0.05, 0., 0.));
    }

    #[test]
    fn heavier_side_moves_less() {
        let mut store = EntityStore::new();
        let a = spawn_body(&mut store, 0.0, 1.0);
        let b = spawn_body(&mut store, 1.0, 0.0);
        store.mutate(b, |body: &mut Body| body.mass = ps64(3.0));
        let [ca, cb] = resolve_contact(
            &store,
            &contact(a, b, FreeVector::new(-1., 0., 0.), 0.0),
            CLOSING,
        )
        .unwrap();
        // Momentum is conserved when restitutions are equal.
        let momentum = ca.delta_velocity.x * 1.0 + cb.delta_velocity.x * 3.0;
        assert!(momentum.abs() < 1e-12, "{momentum}");
        assert!(ca.delta_velocity.x.abs() > cb.delta_velocity.x.abs());
    }

    #[test]
    fn zero_restitution_does_not_push() {
        let mut store = EntityStore::new();
        let a = spawn_body(&mut store, 0.0, 0.0);
        let b = spawn_body(&mut store, 1.0, 0.0);
        store.mutate(a, |body: &mut Body| body.restitution = ps64(0.0));
        let [ca, cb] = resolve_contact(
            &store,
            &contact(a, b, FreeVector::new(-1., 0., 0.), 1.0),
            CLOSING,
        )
        .unwrap();
        assert_eq!(ca.delta_position, FreeVector::zero());
        assert_eq!(cb.delta_position, FreeVector::new(0.5, 0., 0.));
    }

    #[test]
    fn same_compound_is_skipped() {
        let mut store = EntityStore::new();
        let root = spawn_body(&mut store, 0.0, 0.0);
        let child = spawn_body(&mut store, 0.5, 0.0);
        store.mutate(child, |t: &mut Transform| t.parent = Some(root));
        assert_eq!(
            resolve_contact(&store, &contact(root, child, UP_NORMAL, 1.0), CLOSING),
            Err(ResolveSkip::SameCompound { root })
        );
    }

    #[test]
    fn compound_correction_targets_root() {
        let mut store = EntityStore::new();
        let root = spawn_body(&mut store, 0.0, 0.0);
        let child = spawn_body(&mut store, 0.5, 0.0);
        store.mutate(child, |t: &mut Transform| t.parent = Some(root));
        let other = spawn_body(&mut store, 3.0, -1.0);
        let [c_child, c_other] = resolve_contact(
            &store,
            &contact(child, other, FreeVector::new(-1., 0., 0.), 0.2),
            CLOSING,
        )
        .unwrap();
        assert_eq!((c_child.root, c_child.body), (root, root));
        assert_eq!(c_other.root, other);
    }

    #[test]
    fn missing_body_is_skipped() {
        let mut store = EntityStore::new();
        let a = spawn_body(&mut store, 0.0, 0.0);
        let b = spawn_body(&mut store, 1.0, 0.0);
        store.remove::<Body>(b);
        let skip = resolve_contact(&store, &contact(a, b, UP_NORMAL, 1.0), CLOSING).unwrap_err();
        assert_eq!(skip, ResolveSkip::MissingComponent { entity: b });
        assert_eq!(skip.fault_entity(), Some(b));
    }

    #[test]
    fn speed_difference_equal_speeds_get_no_impulse() {
        let mut store = EntityStore::new();
        let a = spawn_body(&mut store, -0.95, 2.0);
        let b = spawn_body(&mut store, 0.95, -2.0);
        let [ca, cb] = resolve_contact(
            &store,
            &contact(a, b, FreeVector::new(-1., 0., 0.), 0.4),
            ContactResponse::SpeedDifference,
        )
        .unwrap();
        assert_eq!(ca.delta_velocity, Vector3D::zero());
        assert_eq!(cb.delta_velocity, Vector3D::zero());
        assert_eq!(ca.delta_position, FreeVector::new(-0.2, 0., 0.));
        assert_eq!(cb.delta_position, FreeVector::new(0.2, 0., 0.));
    }

    #[test]
    fn speed_difference_pushes_along_normal() {
        let mut store = EntityStore::new();
        let a = spawn_body(&mut store, 0.0, 3.0);
        let b = spawn_body(&mut store, 1.0, 1.0);
        store.mutate(b, |body: &mut Body| body.restitution = ps64(0.5));
        // energy = (3 - 1) * 1 / (1 * (1 + 1)) = 1
        let [ca, cb] = resolve_contact(
            &store,
            &contact(a, b, FreeVector::new(-1., 0., 0.), 0.0),
            ContactResponse::SpeedDifference,
        )
        .unwrap();
        assert_eq!(ca.delta_velocity, vec3(-1.0, 0., 0.));
        assert_eq!(cb.delta_velocity, vec3(0.5, 0., 0.));
    }

    #[test]
    fn speed_difference_ignores_direction() {
        let mut store = EntityStore::new();
        // Moving apart, but the faster side still gets pushed along the normal.
        let a = spawn_body(&mut store, 0.0, -3.0);
        let b = spawn_body(&mut store, 1.0, 1.0);
        let [ca, cb] = resolve_contact(
            &store,
            &contact(a, b, FreeVector::new(-1., 0., 0.), 0.0),
            ContactResponse::SpeedDifference,
        )
        .unwrap();
        assert_eq!(ca.delta_velocity, vec3(-1.0, 0., 0.));
        assert_eq!(cb.delta_velocity, vec3(1.0, 0., 0.));
    }

    const CLOSING: ContactResponse = ContactResponse::ProjectedClosing;
    const UP_NORMAL: FreeVector = FreeVector::new(0., 1., 0.);
}
