//! Forming candidate pairs from the broadphase, and confirming them with the narrowphase.

use core::fmt;

use hashbrown::{HashMap, HashSet};
use manyfmt::Refmt as _;

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::physics::broadphase::SpatialIndex;
use crate::physics::narrowphase::test_sphere_sphere;
use crate::store::EntityId;
use crate::util::ConciseDebug;

/// An unordered pair of distinct entities.
///
/// The pair is stored with the lesser id first, so `(a, b)` and `(b, a)` are equal and
/// hash identically.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CollisionPair {
    a: EntityId,
    b: EntityId,
}

impl CollisionPair {
    /// Returns the pair of `a` and `b`, or [`None`] if they are the same entity.
    pub fn new(a: EntityId, b: EntityId) -> Option<Self> {
        (a != b).then(|| {
            let (a, b) = crate::math::sort_two(a, b);
            Self { a, b }
        })
    }

    /// The lesser id.
    pub fn a(self) -> EntityId {
        self.a
    }

    /// The greater id.
    pub fn b(self) -> EntityId {
        self.b
    }

    /// Whether `id` is either member of the pair.
    pub fn contains(self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }
}

/// Set of [`CollisionPair`]s which remembers insertion order, so iterating it does not
/// depend on hashing.
#[derive(Clone, Debug, Default)]
pub struct PairSet {
    order: Vec<CollisionPair>,
    members: HashSet<CollisionPair>,
}

impl PairSet {
    /// Constructs an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair, returning whether it was not already present.
    pub fn insert(&mut self, pair: CollisionPair) -> bool {
        let new = self.members.insert(pair);
        if new {
            self.order.push(pair);
        }
        new
    }

    /// Removes all pairs, keeping allocations.
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over the pairs in the order they were first inserted.
    pub fn iter(&self) -> core::slice::Iter<'_, CollisionPair> {
        self.order.iter()
    }
}

impl<'a> IntoIterator for &'a PairSet {
    type Item = &'a CollisionPair;
    type IntoIter = core::slice::Iter<'a, CollisionPair>;
    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

// -------------------------------------------------------------------------------------------------

/// Start-of-step state of one collider, as used by pairing and narrowphase.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct ColliderSample {
    /// The collider's entity.
    pub id: EntityId,
    /// World position of the entity.
    pub position: FreePoint,
    /// Radius of the collider.
    pub radius: FreeCoordinate,
    /// Skin of the collider.
    pub skin: FreeCoordinate,
}

impl ColliderSample {
    /// Constructs a sample.
    pub fn new(
        id: EntityId,
        position: FreePoint,
        radius: FreeCoordinate,
        skin: FreeCoordinate,
    ) -> Self {
        Self {
            id,
            position,
            radius,
            skin,
        }
    }
}

/// Collection of [`ColliderSample`]s, in snapshot order, with lookup by id.
#[derive(Clone, Debug, Default)]
pub struct ColliderSamples {
    samples: Vec<ColliderSample>,
    by_id: HashMap<EntityId, usize>,
}

impl ColliderSamples {
    /// Constructs an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample. If the id is already present, the earlier sample is kept.
    pub fn push(&mut self, sample: ColliderSample) {
        if let hashbrown::hash_map::Entry::Vacant(e) = self.by_id.entry(sample.id) {
            e.insert(self.samples.len());
            self.samples.push(sample);
        }
    }

    /// Removes all samples, keeping allocations.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.by_id.clear();
    }

    /// Returns the sample for `id`.
    pub fn get(&self, id: EntityId) -> Option<&ColliderSample> {
        self.samples.get(*self.by_id.get(&id)?)
    }

    /// Returns all samples in insertion order.
    pub fn as_slice(&self) -> &[ColliderSample] {
        &self.samples
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A confirmed contact between the colliders of a pair.
#[derive(Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Contact {
    /// The entities in contact.
    pub pair: CollisionPair,
    /// Unit vector pointing from [`CollisionPair::b()`] towards [`CollisionPair::a()`].
    pub normal: FreeVector,
    /// Narrowphase penetration plus the skins of both colliders.
    pub penetration_depth: FreeCoordinate,
}

impl Contact {
    /// Constructs a contact.
    pub fn new(pair: CollisionPair, normal: FreeVector, penetration_depth: FreeCoordinate) -> Self {
        Self {
            pair,
            normal,
            penetration_depth,
        }
    }
}

impl fmt::Debug for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Contact({} & {}, normal {:?}, depth {:.3})",
            self.pair.a,
            self.pair.b,
            self.normal.refmt(&ConciseDebug),
            self.penetration_depth,
        )
    }
}

// -------------------------------------------------------------------------------------------------

/// Queries `index` for each sample and collects every distinct candidate pair into `pairs`.
///
/// Candidates whose other member has no sample (it is in the index but not in `samples`)
/// are skipped. `query_buffer` is scratch space.
pub fn build_pairs<I: SpatialIndex + ?Sized>(
    samples: &ColliderSamples,
    index: &I,
    query_buffer: &mut Vec<EntityId>,
    pairs: &mut PairSet,
) {
    for sample in samples.as_slice() {
        query_buffer.clear();
        index.query_overlapping(sample.position, sample.radius, query_buffer);
        for &other in query_buffer.iter() {
            if samples.get(other).is_none() {
                continue;
            }
            if let Some(pair) = CollisionPair::new(sample.id, other) {
                pairs.insert(pair);
            }
        }
    }
}

/// Runs the exact sphere test on every pair and appends a [`Contact`] to `hits` for each
/// that intersects.
pub fn narrowphase(pairs: &PairSet, samples: &ColliderSamples, hits: &mut Vec<Contact>) {
    for &pair in pairs {
        let (Some(a), Some(b)) = (samples.get(pair.a), samples.get(pair.b)) else {
            continue;
        };
        let contact = test_sphere_sphere(a.position, a.radius, b.position, b.radius);
        if contact.hit {
            hits.push(Contact {
                pair,
                normal: contact.normal,
                penetration_depth: contact.penetration + a.skin + b.skin,
            });
        }
    }
}
