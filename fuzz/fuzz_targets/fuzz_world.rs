#![no_main]

use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

use spherics::active::ActiveKind;
use spherics::config::PhysicsConfig;
use spherics::content;
use spherics::euclid::vec3;
use spherics::math::{PositiveSign, ZeroOne, is_finite_point};
use spherics::physics::resolve::ContactResponse;
use spherics::physics::{Body, Gravity, Transform, World};
use spherics::store::EntityId;
use spherics::time::{Duration, Tick};

#[derive(Arbitrary, Debug)]
struct FuzzWorld {
    gravity: Gravity,
    contact_response: ContactResponse,
    timescale: ZeroOne,
    accumulate_on_overload: bool,
    spheres: Vec<FuzzSphere>,
    operations: Vec<Operation>,
}

#[derive(Arbitrary, Debug)]
struct FuzzSphere {
    position: [f64; 3],
    velocity: [f64; 3],
    radius: PositiveSign,
    mass: PositiveSign,
    restitution: PositiveSign,
    drag: PositiveSign,
    /// Index of another sphere to attach to.
    parent: Option<u8>,
}

#[derive(Arbitrary, Debug)]
enum Operation {
    Step,
    /// Feed this many milliseconds of real time.
    Tick(u8),
    Destroy(u8),
    SetActive(ActiveKind, Vec<u8>),
}

fuzz_target!(|input: FuzzWorld| {
    let mut config = PhysicsConfig::default();
    config.gravity = input.gravity;
    config.contact_response = input.contact_response;
    config.timescale = input.timescale.into_inner();
    config.accumulate_on_overload = input.accumulate_on_overload;
    let mut world = World::new(config).unwrap();

    let ids: Vec<EntityId> = input
        .spheres
        .iter()
        .map(|sphere| {
            let body = Body::new(sphere.mass)
                .with_velocity(vec3(sphere.velocity[0], sphere.velocity[1], sphere.velocity[2]))
                .with_restitution(sphere.restitution)
                .with_drag(sphere.drag);
            content::spawn_body(&mut world, sphere.position.into(), sphere.radius, body)
        })
        .collect();
    for (sphere, &id) in input.spheres.iter().zip(&ids) {
        if let Some(&parent) = sphere.parent.and_then(|i| ids.get(usize::from(i))) {
            world
                .store_mut()
                .mutate(id, |t: &mut Transform| t.parent = Some(parent));
        }
    }
    content::activate_all(&mut world);
    let started_finite: Vec<EntityId> = ids
        .iter()
        .copied()
        .filter(|&id| {
            world
                .store()
                .get::<Transform>(id)
                .is_some_and(|t| is_finite_point(t.local_position))
        })
        .collect();

    let pick = |index: u8| ids.get(usize::from(index)).copied();
    for operation in input.operations {
        match operation {
            Operation::Step => world.step(Tick::from_seconds(1.0 / 60.0)),
            Operation::Tick(ms) => {
                world.tick(Duration::from_millis(u64::from(ms)));
            }
            Operation::Destroy(index) => {
                if let Some(id) = pick(index) {
                    world.store_mut().destroy_entity(id);
                }
            }
            Operation::SetActive(kind, indices) => {
                let active: Vec<EntityId> = indices.into_iter().filter_map(pick).collect();
                world.push_active(kind, active);
            }
        }
        check(&world, &started_finite);
    }
});

fn check(world: &World, started_finite: &[EntityId]) {
    let diagnostics = world.diagnostics();
    assert!(diagnostics.narrowphase_hit_count <= diagnostics.broadphase_pair_count);
    assert!(diagnostics.world_size <= diagnostics.collider_count);
    for contact in world.hit_entities() {
        assert!(world.broad_hits().iter().any(|&pair| pair == contact.pair));
        assert!(contact.normal.x.is_finite() && contact.normal.y.is_finite());
    }
    // Positions may start out non-finite, but never become so.
    for &id in started_finite {
        if let Some(transform) = world.store().get::<Transform>(id) {
            assert!(
                is_finite_point(transform.local_position),
                "{id} reached {:?}",
                transform.local_position
            );
        }
    }
}
