//! Parent-child relationships between entities: world positions, and the combined mass and
//! velocity of compounds.

use euclid::Vector3D;

use crate::math::{FreeCoordinate, FreePoint, PositiveSign};
use crate::physics::{Body, Transform, Velocity};
use crate::store::{EntityId, EntityStore};

/// Error from walking an entity's chain of [`Transform::parent`]s.
#[derive(Clone, Copy, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum HierarchyError {
    /// the parent chain of {entity} contains a cycle
    Cycle {
        /// Entity the walk started from.
        entity: EntityId,
    },
    /// {entity} or one of its ancestors has no transform, or a parent that does not exist
    Missing {
        /// Entity the walk started from.
        entity: EntityId,
    },
}

impl std::error::Error for HierarchyError {}

/// Combined properties of an entity and all of its ancestors.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Aggregate {
    /// Sum of the masses of every [`Body`] on the chain.
    pub mass: PositiveSign,
    /// Sum of the velocities of every [`Body`] on the chain.
    pub velocity: Vector3D<FreeCoordinate, Velocity>,
    /// The last entity of the chain, which has no parent.
    pub root: EntityId,
}

/// Calls `visit` with each entity from `start` up to and including its root, together with
/// its transform.
///
/// A chain longer than the number of entities must revisit one, so that is reported as a
/// cycle; this needs no memory proportional to the chain length.
fn walk_chain(
    store: &EntityStore,
    start: EntityId,
    mut visit: impl FnMut(EntityId, &Transform),
) -> Result<EntityId, HierarchyError> {
    let mut current = start;
    let limit = store.len();
    for _ in 0..=limit {
        let transform = store
            .get::<Transform>(current)
            .ok_or(HierarchyError::Missing { entity: start })?;
        visit(current, transform);
        match transform.parent {
            None => return Ok(current),
            Some(parent) => current = parent,
        }
    }
    Err(HierarchyError::Cycle { entity: start })
}

/// Sums mass and velocity of `id` and its ancestors, and finds its root.
///
/// Entities on the chain without a [`Body`] contribute nothing but are still walked through.
pub fn aggregate(store: &EntityStore, id: EntityId) -> Result<Aggregate, HierarchyError> {
    let mut mass = PositiveSign::ZERO;
    let mut velocity = Vector3D::zero();
    let root = walk_chain(store, id, |entity, _| {
        if let Some(body) = store.get::<Body>(entity) {
            mass = mass + body.mass;
            velocity += body.velocity;
        }
    })?;
    Ok(Aggregate {
        mass,
        velocity,
        root,
    })
}

/// Computes the world position of `id` by summing the local positions along its chain.
pub fn world_position(store: &EntityStore, id: EntityId) -> Result<FreePoint, HierarchyError> {
    let mut position = FreePoint::origin();
    walk_chain(store, id, |_, transform| {
        position += transform.local_position.to_vector();
    })?;
    Ok(position)
}

/// Returns the root of `id`'s chain.
pub fn root_of(store: &EntityStore, id: EntityId) -> Result<EntityId, HierarchyError> {
    walk_chain(store, id, |_, _| {})
}
