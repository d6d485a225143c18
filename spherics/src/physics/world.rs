use core::fmt;

use hashbrown::HashSet;

use crate::active::{ActiveKind, ActiveSetSender, ActiveSets, ActiveSnapshot, IdList};
use crate::config::{ConfigError, PhysicsConfig};
use crate::math::{FreePoint, is_finite_point, within_cube};
use crate::physics::broadphase::{SpatialIndex, SphereTree};
use crate::physics::hierarchy;
use crate::physics::pairing::{
    self, ColliderSample, ColliderSamples, CollisionPair, Contact, PairSet,
};
use crate::physics::resolve::{self, Correction};
use crate::physics::{Body, Collider, Transform, integrate_body};
use crate::store::{EntityId, EntityStore};
use crate::time::{FixedStepClock, Tick, TickOutcome};
use crate::util::ErrorChain;

/// Counters describing the most recent sub-step.
///
/// Every value is recomputed by each sub-step; none accumulate across sub-steps except
/// [`step_count`](Self::step_count).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Diagnostics {
    /// Number of entries in the spatial index after it was rebuilt.
    pub world_size: usize,
    /// Number of active colliders that took part.
    pub collider_count: usize,
    /// Number of distinct candidate pairs the broadphase found.
    pub broadphase_pair_count: usize,
    /// Number of candidate pairs the narrowphase confirmed.
    pub narrowphase_hit_count: usize,
    /// Number of sub-steps run so far.
    pub step_count: u64,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            world_size,
            collider_count,
            broadphase_pair_count,
            narrowphase_hit_count,
            step_count,
        } = *self;
        write!(
            f,
            "step {step_count}: {collider_count} colliders, {world_size} indexed, \
            {broadphase_pair_count} candidate pairs, {narrowphase_hit_count} hits"
        )
    }
}

/// Buffers reused by every sub-step.
#[derive(Debug, Default)]
struct Scratch {
    samples: ColliderSamples,
    query_buffer: Vec<EntityId>,
    pairs: PairSet,
    hits: Vec<Contact>,
    corrections: Vec<Correction>,
    resolved: Vec<CollisionPair>,
    /// Bodies already integrated in this sub-step.
    integrated: HashSet<EntityId>,
    /// Colliders whose flags the last sub-step set.
    flagged: Vec<EntityId>,
}

/// Owner of all simulation state, and the entry point for running the simulation.
///
/// `I` is the spatial index used for the broadphase.
#[derive(Debug)]
pub struct World<I = SphereTree> {
    store: EntityStore,
    active: ActiveSets,
    clock: FixedStepClock,
    index: I,
    config: PhysicsConfig,

    scratch: Scratch,
    /// Entities whose problems have already been logged.
    faults: HashSet<EntityId>,
    diagnostics: Diagnostics,
    last_snapshot: ActiveSnapshot,
}

impl World<SphereTree> {
    /// Constructs an empty world using the default spatial index, sized from `config`.
    pub fn new(config: PhysicsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let index = SphereTree::new(config.world_half_extent, config.tree_max_depth);
        Self::with_index(config, index)
    }
}

impl<I: SpatialIndex> World<I> {
    /// Constructs an empty world using the given spatial index.
    pub fn with_index(config: PhysicsConfig, mut index: I) -> Result<Self, ConfigError> {
        config.validate()?;
        index.clear();
        Ok(Self {
            store: EntityStore::new(),
            active: ActiveSets::new(),
            clock: FixedStepClock::new(&config)?,
            index,
            config,
            scratch: Scratch::default(),
            faults: HashSet::new(),
            diagnostics: Diagnostics::default(),
            last_snapshot: ActiveSnapshot::default(),
        })
    }

    /// Returns the entity store.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Returns the entity store for modification, such as spawning and destroying entities.
    ///
    /// Destroyed entities are ignored by the simulation, even if still listed as active.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// Returns the configuration this world was created with.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Returns the clock which [`Self::tick()`] uses.
    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    /// Returns the spatial index, as rebuilt by the last sub-step.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Returns a sender which can replace the active lists from any thread.
    pub fn active_set_sender(&self) -> ActiveSetSender {
        self.active.sender()
    }

    /// Replaces an active list. Unlike pushing through an [`ActiveSetSender`], the change is
    /// visible immediately through [`Self::active()`].
    pub fn push_active(&mut self, kind: ActiveKind, ids: impl Into<IdList>) {
        self.active.replace(kind, ids.into());
        self.last_snapshot = self.active.snapshot();
    }

    /// Returns the active lists used by the last sub-step, or set by
    /// [`Self::push_active()`] since.
    pub fn active(&self) -> &ActiveSnapshot {
        &self.last_snapshot
    }

    /// Returns the counters from the most recent sub-step.
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Returns every distinct candidate pair found by the last sub-step's broadphase.
    pub fn broad_hits(&self) -> &PairSet {
        &self.scratch.pairs
    }

    /// Returns the contacts the last sub-step's narrowphase confirmed.
    pub fn hit_entities(&self) -> &[Contact] {
        &self.scratch.hits
    }

    /// Returns whether `position` lies within the world cube.
    pub fn in_bounds(&self, position: FreePoint) -> bool {
        within_cube(position, self.config.world_half_extent)
    }

    /// Appends to `output` every active collider whose world position is out of bounds.
    ///
    /// The simulation never destroys anything; this is for whatever manages entity
    /// lifetimes.
    pub fn out_of_bounds(&self, output: &mut Vec<EntityId>) {
        for &id in self.last_snapshot.colliders.iter() {
            if let Ok(position) = hierarchy::world_position(&self.store, id) {
                if !self.in_bounds(position) {
                    output.push(id);
                }
            }
        }
    }

    /// Feeds `delta` of real time to the clock and runs every sub-step that is due.
    pub fn tick(&mut self, delta: crate::time::Duration) -> TickOutcome {
        let mut outcome = self.clock.advance_by(delta);
        if outcome.skipped {
            return outcome;
        }
        while let Some(tick) = self.clock.next_step() {
            self.step(tick);
            outcome.steps = outcome.steps.saturating_add(1);
        }
        outcome
    }

    /// Runs one sub-step.
    ///
    /// Contacts are detected and resolved against the state at the start of the sub-step,
    /// then bodies are integrated. A paused tick still detects contacts, so the
    /// diagnostics stay current, but moves nothing.
    pub fn step(&mut self, tick: Tick) {
        let Self {
            store,
            active,
            clock: _,
            index,
            config,
            scratch,
            faults,
            diagnostics,
            last_snapshot,
        } = self;
        let Scratch {
            samples,
            query_buffer,
            pairs,
            hits,
            corrections,
            resolved,
            integrated,
            flagged,
        } = scratch;

        // Stage 1: snapshot the active lists, and forget faults of destroyed entities.
        *last_snapshot = active.snapshot();
        let snapshot = &*last_snapshot;
        faults.retain(|&id| store.contains(id));

        // Clear flags left by the last sub-step, including on colliders no longer active.
        for id in flagged.drain(..) {
            store.mutate(id, |collider: &mut Collider| {
                collider.colliding = false;
                collider.broad_hit = false;
            });
        }

        // Stage 2: sample colliders at their start-of-step positions and rebuild the index.
        samples.clear();
        for &id in snapshot.colliders.iter() {
            let Some(collider) = store.mutate(id, |collider: &mut Collider| {
                collider.colliding = false;
                collider.broad_hit = false;
                *collider
            }) else {
                continue;
            };
            match hierarchy::world_position(store, id) {
                Ok(position) if is_finite_point(position) => samples.push(ColliderSample::new(
                    id,
                    position,
                    collider.size.into_inner(),
                    collider.skin.into_inner(),
                )),
                Ok(position) => {
                    if faults.insert(id) {
                        log::warn!("collider {id} has non-finite position {position:?}");
                    }
                }
                Err(error) => report_fault(faults, id, &error),
            }
        }
        index.clear();
        for sample in samples.as_slice() {
            index.insert(sample.id, sample.position, sample.radius);
        }

        // Stages 3 and 4: broadphase queries, deduplicated into pairs.
        pairs.clear();
        pairing::build_pairs(samples, &*index, query_buffer, pairs);

        // Stage 5: narrowphase.
        hits.clear();
        pairing::narrowphase(pairs, samples, hits);

        // Stage 6: resolve every hit against start-of-step state, then apply.
        corrections.clear();
        resolved.clear();
        for contact in hits.iter() {
            match resolve::resolve_contact(store, contact, config.contact_response) {
                Ok(pair_corrections) => {
                    corrections.extend(pair_corrections);
                    resolved.push(contact.pair);
                }
                Err(skip) => {
                    if let Some(entity) = skip.fault_entity() {
                        report_fault(faults, entity, &skip);
                    }
                }
            }
        }
        if !tick.paused() {
            resolve::apply_corrections(store, corrections);
        }

        // Stage 7: integrate bodies.
        if !tick.paused() {
            integrated.clear();
            for &id in snapshot.bodies.iter() {
                if !integrated.insert(id) {
                    continue;
                }
                let Some(details) =
                    store.mutate(id, |body: &mut Body| integrate_body(body, tick, config.gravity))
                else {
                    continue;
                };
                store.mutate(id, |transform: &mut Transform| {
                    let new_position = transform.local_position + details.displacement;
                    if is_finite_point(new_position) {
                        transform.local_position = new_position;
                    }
                });
            }
        }

        // Stage 8: flags and counters.
        for pair in pairs.iter() {
            for id in [pair.a(), pair.b()] {
                store.mutate(id, |collider: &mut Collider| collider.broad_hit = true);
                flagged.push(id);
            }
        }
        for pair in resolved.iter() {
            for id in [pair.a(), pair.b()] {
                store.mutate(id, |collider: &mut Collider| collider.colliding = true);
            }
        }
        *diagnostics = Diagnostics {
            world_size: index.len(),
            collider_count: samples.len(),
            broadphase_pair_count: pairs.len(),
            narrowphase_hit_count: hits.len(),
            step_count: diagnostics.step_count.saturating_add(1),
        };
    }
}

/// Logs a problem with an entity, unless one was already logged for it.
fn report_fault(faults: &mut HashSet<EntityId>, entity: EntityId, error: &dyn std::error::Error) {
    if faults.insert(entity) {
        log::warn!("skipping {entity} in physics: {}", ErrorChain(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content;
    use crate::math::ps64;
    use crate::physics::broadphase::BruteForceIndex;
    use crate::physics::resolve::ContactResponse;
    use crate::physics::{Gravity, Velocity};
    use euclid::{Vector3D, vec3};
    use pretty_assertions::assert_eq;

    fn config() -> PhysicsConfig {
        let mut config = PhysicsConfig::default();
        config.gravity = Gravity::DISABLED;
        config
    }

    fn velocity_of(world: &World<impl SpatialIndex>, id: EntityId) -> Vector3D<f64, Velocity> {
        world.store().get::<Body>(id).unwrap().velocity
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config();
        config.fixed_timestep = 0.0;
        assert_eq!(
            World::new(config).unwrap_err(),
            ConfigError::NonPositiveTimestep(0.0)
        );
    }

    #[test]
    fn head_on_separates() {
        let mut world = World::new(config()).unwrap();
        let [a, b] = content::head_on_pair(&mut world);
        world.step(Tick::from_seconds(1.0 / 60.0));

        let d = world.diagnostics();
        assert_eq!(d.narrowphase_hit_count, 1);
        assert_eq!(d.broadphase_pair_count, 1);
        assert_eq!(d.collider_count, 2);
        assert_eq!(d.world_size, 2);
        assert!(velocity_of(&world, a).x < 0.0);
        assert!(velocity_of(&world, b).x > 0.0);

        let collider = world.store().get::<Collider>(a).unwrap();
        assert!(collider.colliding && collider.broad_hit);
        assert_eq!(
            world.hit_entities().iter().map(|c| c.pair).collect::<Vec<_>>(),
            vec![CollisionPair::new(a, b).unwrap()]
        );
    }

    #[test]
    fn flags_reset_each_step() {
        let mut world = World::new(config()).unwrap();
        let [a, b] = content::head_on_pair(&mut world);
        world.step(Tick::from_seconds(1.0 / 60.0));
        // Move them far apart.
        world
            .store_mut()
            .mutate(b, |t: &mut Transform| t.local_position.x = 100.0);
        world.step(Tick::from_seconds(1.0 / 60.0));
        let collider = world.store().get::<Collider>(a).unwrap();
        assert!(!collider.colliding && !collider.broad_hit);
        assert_eq!(world.diagnostics().narrowphase_hit_count, 0);
        assert_eq!(world.diagnostics().step_count, 2);
    }

    #[test]
    fn paused_tick_detects_but_does_not_move() {
        let mut world = World::new(config()).unwrap();
        let [a, _] = content::head_on_pair(&mut world);
        let before = world.store().get::<Transform>(a).copied();
        let mut paused_config = config();
        paused_config.timescale = 0.0;
        let mut clock = FixedStepClock::new(&paused_config).unwrap();
        clock.advance_by(clock.fixed_step());
        let tick = clock.next_step().unwrap();
        assert!(tick.paused());

        world.step(tick);
        assert_eq!(world.diagnostics().narrowphase_hit_count, 1);
        assert_eq!(world.store().get::<Transform>(a).copied(), before);
        assert_eq!(velocity_of(&world, a), vec3(2.0, 0.0, 0.0));
    }

    #[test]
    fn destroyed_active_entity_is_ignored() {
        let mut world = World::with_index(config(), BruteForceIndex::new()).unwrap();
        let [a, b] = content::head_on_pair(&mut world);
        world.store_mut().destroy_entity(b);
        world.step(Tick::from_seconds(1.0 / 60.0));
        assert_eq!(world.diagnostics().collider_count, 1);
        assert_eq!(world.diagnostics().narrowphase_hit_count, 0);
        assert!(world.store().contains(a));
    }

    #[test]
    fn repeated_active_body_integrates_once() {
        let mut world = World::new(config()).unwrap();
        let id = content::spawn_sphere(&mut world, FreePoint::origin(), ps64(1.0));
        world
            .store_mut()
            .mutate(id, |body: &mut Body| body.velocity = vec3(4.0, 0.0, 0.0));
        world.push_active(ActiveKind::Bodies, vec![id, id]);
        world.step(Tick::from_seconds(0.25));
        assert_eq!(
            world.store().get::<Transform>(id).unwrap().local_position,
            FreePoint::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn deactivated_collider_flags_are_cleared() {
        let mut world = World::new(config()).unwrap();
        let [a, b] = content::head_on_pair(&mut world);
        world.step(Tick::from_seconds(1.0 / 60.0));
        assert!(world.store().get::<Collider>(a).unwrap().colliding);

        world.push_active(ActiveKind::Colliders, Vec::<EntityId>::new());
        world.step(Tick::from_seconds(1.0 / 60.0));
        for id in [a, b] {
            let collider = world.store().get::<Collider>(id).unwrap();
            assert!(!collider.colliding && !collider.broad_hit, "{id}");
        }
    }

    #[test]
    fn faults_of_destroyed_entities_are_forgotten() {
        let mut world = World::new(config()).unwrap();
        let gone = content::spawn_sphere(&mut world, FreePoint::origin(), ps64(1.0));
        let orphan = content::spawn_sphere(&mut world, FreePoint::origin(), ps64(1.0));
        world
            .store_mut()
            .mutate(orphan, |t: &mut Transform| t.parent = Some(gone));
        world.store_mut().destroy_entity(gone);
        world.push_active(ActiveKind::Colliders, vec![orphan]);
        world.step(Tick::from_seconds(1.0 / 60.0));
        assert!(world.faults.contains(&orphan));

        world.store_mut().destroy_entity(orphan);
        world.step(Tick::from_seconds(1.0 / 60.0));
        assert!(world.faults.is_empty());
    }

    #[test]
    fn speed_difference_head_on_keeps_velocities() {
        let mut config = config();
        config.contact_response = ContactResponse::SpeedDifference;
        let mut world = World::new(config).unwrap();
        let [a, b] = content::head_on_pair(&mut world);
        world.step(Tick::from_seconds(1.0 / 60.0));
        assert_eq!(world.diagnostics().narrowphase_hit_count, 1);
        assert_eq!(velocity_of(&world, a), vec3(2.0, 0.0, 0.0));
        assert_eq!(velocity_of(&world, b), vec3(-2.0, 0.0, 0.0));
    }

    #[test]
    fn out_of_bounds_lists_escaped_colliders() {
        let mut config = config();
        config.world_half_extent = 10.0;
        let mut world = World::new(config).unwrap();
        let inside = content::spawn_sphere(&mut world, FreePoint::new(1., 1., 1.), ps64(0.5));
        let outside = content::spawn_sphere(&mut world, FreePoint::new(0., -11., 0.), ps64(0.5));
        let ids: IdList = vec![inside, outside].into();
        world.push_active(ActiveKind::Colliders, ids.clone());
        world.push_active(ActiveKind::Bodies, ids);
        world.step(Tick::from_seconds(0.01));

        let mut out = Vec::new();
        world.out_of_bounds(&mut out);
        assert_eq!(out, vec![outside]);
        assert!(world.in_bounds(FreePoint::new(10., -10., 10.)));
        assert!(!world.in_bounds(FreePoint::new(f64::NAN, 0., 0.)));
    }

    #[test]
    fn tick_runs_due_steps() {
        let mut world = World::new(config()).unwrap();
        let outcome = world.tick(world.clock().fixed_step() * 3);
        assert_eq!(outcome.steps, 3);
        assert_eq!(world.diagnostics().step_count, 3);
    }

    #[test]
    fn diagnostics_display() {
        let d = Diagnostics {
            world_size: 4,
            collider_count: 4,
            broadphase_pair_count: 2,
            narrowphase_hit_count: 1,
            step_count: 10,
        };
        assert_eq!(
            d.to_string(),
            "step 10: 4 colliders, 4 indexed, 2 candidate pairs, 1 hits"
        );
    }
}
