//! Ready-made scenes, for demonstrations, benchmarks, and tests.

use euclid::vec3;
use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::active::ActiveKind;
use crate::math::{FreePoint, PositiveSign, ZeroOne, ps64};
use crate::physics::broadphase::SpatialIndex;
use crate::physics::{Body, Collider, Transform, World};
use crate::store::{EntityId, EntityStore};

/// Spawns an entity with a [`Transform`] at `position`, a [`Collider`] of the given radius,
/// and `body`.
///
/// The entity is not made active; see [`activate_all()`].
pub fn spawn_body<I: SpatialIndex>(
    world: &mut World<I>,
    position: FreePoint,
    radius: PositiveSign,
    body: Body,
) -> EntityId {
    let store: &mut EntityStore = world.store_mut();
    let id = store.spawn();
    // The entity was just spawned, so it exists.
    let _ = store.insert(id, Transform::at(position));
    let _ = store.insert(id, Collider::sphere(radius));
    let _ = store.insert(id, body);
    id
}

/// Spawns a resting sphere of unit mass. The entity is not made active.
pub fn spawn_sphere<I: SpatialIndex>(
    world: &mut World<I>,
    position: FreePoint,
    radius: PositiveSign,
) -> EntityId {
    spawn_body(world, position, radius, Body::default())
}

/// Makes every entity with a [`Body`] or [`Collider`] active.
pub fn activate_all<I: SpatialIndex>(world: &mut World<I>) {
    let store = world.store();
    let bodies: Vec<EntityId> = store
        .ids()
        .filter(|&id| store.get::<Body>(id).is_some())
        .collect();
    let colliders: Vec<EntityId> = store
        .ids()
        .filter(|&id| store.get::<Collider>(id).is_some())
        .collect();
    world.push_active(ActiveKind::Bodies, bodies);
    world.push_active(ActiveKind::Colliders, colliders);
}

/// Two unit spheres of unit mass, 1.9 apart along X and approaching each other at speed 2.
///
/// Returns `[left, right]`. All entities in the world are made active.
pub fn head_on_pair<I: SpatialIndex>(world: &mut World<I>) -> [EntityId; 2] {
    let left = spawn_body(
        world,
        FreePoint::new(-0.95, 0.0, 0.0),
        ps64(1.0),
        Body::default().with_velocity(vec3(2.0, 0.0, 0.0)),
    );
    let right = spawn_body(
        world,
        FreePoint::new(0.95, 0.0, 0.0),
        ps64(1.0),
        Body::default().with_velocity(vec3(-2.0, 0.0, 0.0)),
    );
    activate_all(world);
    [left, right]
}

/// `count` spheres of assorted sizes and masses scattered through a box above a large
/// resting "floor" sphere, from a deterministic seed.
///
/// Returns the falling spheres. All entities in the world are made active.
pub fn rain<I: SpatialIndex>(world: &mut World<I>, count: usize, seed: u64) -> Vec<EntityId> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let floor_radius = 50.0;
    spawn_body(
        world,
        FreePoint::new(0.0, -floor_radius, 0.0),
        ps64(floor_radius),
        Body::new(ps64(1e6)).with_resistance(ZeroOne::ONE),
    );
    let drops = (0..count)
        .map(|_| {
            let position = FreePoint::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(1.0..20.0),
                rng.random_range(-10.0..10.0),
            );
            let radius = ps64(rng.random_range(0.2..1.0));
            let body = Body::new(ps64(rng.random_range(0.5..4.0)))
                .with_velocity(vec3(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                ))
                .with_restitution(ps64(rng.random_range(0.2..1.0)));
            spawn_body(world, position, radius, body)
        })
        .collect();
    activate_all(world);
    drops
}

/// A compound of `links` spheres, each attached to the next, and a free sphere flying
/// into its first link.
///
/// Returns the links (first link first, root last) followed by the projectile. All
/// entities in the world are made active.
pub fn chain<I: SpatialIndex>(world: &mut World<I>, links: usize) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = (0..links)
        .map(|_| spawn_sphere(world, FreePoint::origin(), ps64(0.5)))
        .collect();
    for pair in ids.windows(2) {
        let (child, parent) = (pair[0], pair[1]);
        world.store_mut().mutate(child, |t: &mut Transform| {
            *t = Transform::at(FreePoint::new(-1.0, 0.0, 0.0)).with_parent(parent);
        });
    }
    if let Some(&root) = ids.last() {
        let x = links as f64 - 1.0;
        world
            .store_mut()
            .mutate(root, |t: &mut Transform| t.local_position = FreePoint::new(x, 0.0, 0.0));
    }
    let projectile = spawn_body(
        world,
        FreePoint::new(-1.9, 0.0, 0.0),
        ps64(0.5),
        Body::default().with_velocity(vec3(3.0, 0.0, 0.0)),
    );
    ids.push(projectile);
    activate_all(world);
    ids
}
