//! Spatial indexes used to find candidate collision pairs quickly.
//!
//! An index may return false positives (the narrowphase rejects them), but must never
//! omit an entry whose sphere overlaps the query sphere.

use core::fmt;

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::store::EntityId;

/// A collection of spheres which can be queried for overlap.
///
/// The world rebuilds its index from scratch at the start of every sub-step, so
/// implementations should make [`clear()`](Self::clear) keep their allocations.
pub trait SpatialIndex: fmt::Debug {
    /// Removes all entries.
    fn clear(&mut self);

    /// Adds a sphere.
    fn insert(&mut self, id: EntityId, center: FreePoint, radius: FreeCoordinate);

    /// Appends to `output` the ids of all entries whose sphere may overlap the given
    /// sphere. Touching spheres count as overlapping.
    fn query_overlapping(
        &self,
        center: FreePoint,
        radius: FreeCoordinate,
        output: &mut Vec<EntityId>,
    );

    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Returns whether there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Entry {
    id: EntityId,
    center: FreePoint,
    radius: FreeCoordinate,
}

impl Entry {
    #[inline]
    fn overlaps(&self, center: FreePoint, radius: FreeCoordinate) -> bool {
        let reach = self.radius + radius;
        (self.center - center).square_length() <= reach * reach
    }
}

// -------------------------------------------------------------------------------------------------

/// [`SpatialIndex`] that tests every entry on every query.
///
/// Exact, and faster than a tree for a handful of entries.
#[derive(Clone, Debug, Default)]
pub struct BruteForceIndex {
    entries: Vec<Entry>,
}

impl BruteForceIndex {
    /// Constructs an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialIndex for BruteForceIndex {
    fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, id: EntityId, center: FreePoint, radius: FreeCoordinate) {
        self.entries.push(Entry { id, center, radius });
    }

    fn query_overlapping(
        &self,
        center: FreePoint,
        radius: FreeCoordinate,
        output: &mut Vec<EntityId>,
    ) {
        output.extend(
            self.entries
                .iter()
                .filter(|entry| entry.overlaps(center, radius))
                .map(|entry| entry.id),
        );
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// -------------------------------------------------------------------------------------------------

/// Index of a node in the arena of a [`SphereTree`]. The root is always node 0.
type NodeIndex = u32;

#[derive(Clone, Debug)]
struct Node {
    center: FreePoint,
    half_size: FreeCoordinate,
    /// The 8 children, if created, occupy consecutive indices starting here.
    first_child: Option<NodeIndex>,
    entries: Vec<Entry>,
}

impl Node {
    fn new(center: FreePoint, half_size: FreeCoordinate) -> Self {
        Self {
            center,
            half_size,
            first_child: None,
            entries: Vec::new(),
        }
    }

    /// Whether the cube of this node contains the bounding cube of the sphere.
    fn contains(&self, center: FreePoint, radius: FreeCoordinate) -> bool {
        let limit = self.half_size - radius;
        let d = (center - self.center).abs();
        d.x <= limit && d.y <= limit && d.z <= limit
    }

    /// Whether the sphere touches this node's cube. Entries of this node and all its
    /// descendants lie entirely within the cube, so if not, none of them can overlap it.
    fn may_hold_overlap(&self, center: FreePoint, radius: FreeCoordinate) -> bool {
        let d = (center - self.center).abs() - FreeVector::splat(self.half_size);
        let outside = d.max(FreeVector::zero());
        outside.square_length() <= radius * radius
    }

    /// Octant of `point` relative to this node's center, as a child offset 0..8.
    fn octant(&self, point: FreePoint) -> u32 {
        u32::from(point.x >= self.center.x)
            | (u32::from(point.y >= self.center.y) << 1)
            | (u32::from(point.z >= self.center.z) << 2)
    }
}

/// Default [`SpatialIndex`]: an octree over a cube centered on the origin.
///
/// Each sphere is stored in the deepest node whose cube fully contains the sphere's
/// bounding cube, so queries need only visit nodes whose cube touches the query sphere.
/// Spheres not contained in the root cube are kept in an overflow list that every query
/// scans.
///
/// Nodes are stored in an arena and never freed by [`clear()`](SpatialIndex::clear), so
/// rebuilding the tree with a similar set of spheres does not allocate.
#[derive(Clone)]
pub struct SphereTree {
    nodes: Vec<Node>,
    overflow: Vec<Entry>,
    max_depth: u8,
    len: usize,
}

impl SphereTree {
    /// Constructs an empty tree covering the cube from `-half_extent` to `+half_extent` on
    /// each axis, which will subdivide at most `max_depth` times.
    pub fn new(half_extent: FreeCoordinate, max_depth: u8) -> Self {
        Self {
            nodes: vec![Node::new(FreePoint::origin(), half_extent)],
            overflow: Vec::new(),
            max_depth,
            len: 0,
        }
    }

    fn children_of(&mut self, node: NodeIndex) -> NodeIndex {
        if let Some(first) = self.nodes[node as usize].first_child {
            return first;
        }
        let parent = &self.nodes[node as usize];
        let quarter = parent.half_size / 2.0;
        let center = parent.center;
        let first = self.nodes.len() as NodeIndex;
        for octant in 0..8u32 {
            let sign = |bit: u32| {
                if octant & bit != 0 {
                    quarter
                } else {
                    -quarter
                }
            };
            self.nodes.push(Node::new(
                center + FreeVector::new(sign(1), sign(2), sign(4)),
                quarter,
            ));
        }
        self.nodes[node as usize].first_child = Some(first);
        first
    }

    fn query_node(
        &self,
        node: NodeIndex,
        center: FreePoint,
        radius: FreeCoordinate,
        output: &mut Vec<EntityId>,
    ) {
        let node = &self.nodes[node as usize];
        if !node.may_hold_overlap(center, radius) {
            return;
        }
        output.extend(
            node.entries
                .iter()
                .filter(|entry| entry.overlaps(center, radius))
                .map(|entry| entry.id),
        );
        if let Some(first) = node.first_child {
            for child in first..first + 8 {
                self.query_node(child, center, radius, output);
            }
        }
    }
}

impl SpatialIndex for SphereTree {
    fn clear(&mut self) {
        for node in &mut self.nodes {
            node.entries.clear();
        }
        self.overflow.clear();
        self.len = 0;
    }

    fn insert(&mut self, id: EntityId, center: FreePoint, radius: FreeCoordinate) {
        let entry = Entry { id, center, radius };
        self.len += 1;
        if !self.nodes[0].contains(center, radius) {
            // Also catches NaN coordinates, which no node contains.
            self.overflow.push(entry);
            return;
        }
        let mut node: NodeIndex = 0;
        for _ in 0..self.max_depth {
            let current = &self.nodes[node as usize];
            // A child has half the size, so the entry can only fit if it is small enough.
            if radius > current.half_size / 2.0 {
                break;
            }
            let octant = current.octant(center);
            let child = self.children_of(node) + octant;
            if !self.nodes[child as usize].contains(center, radius) {
                break;
            }
            node = child;
        }
        self.nodes[node as usize].entries.push(entry);
    }

    fn query_overlapping(
        &self,
        center: FreePoint,
        radius: FreeCoordinate,
        output: &mut Vec<EntityId>,
    ) {
        output.extend(
            self.overflow
                .iter()
                .filter(|entry| entry.overlaps(center, radius))
                .map(|entry| entry.id),
        );
        self.query_node(0, center, radius, output);
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[mutants::skip]
impl fmt::Debug for SphereTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SphereTree")
            .field("half_extent", &self.nodes[0].half_size)
            .field("max_depth", &self.max_depth)
            .field("len", &self.len)
            .field("nodes", &self.nodes.len())
            .field("overflow", &self.overflow.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityStore;
    use crate::util::MultiFailure;
    use pretty_assertions::assert_eq;
    use rand::{Rng as _, SeedableRng as _};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn ids(n: usize) -> Vec<EntityId> {
        let mut store = EntityStore::new();
        (0..n).map(|_| store.spawn()).collect()
    }

    fn sorted_query(
        index: &dyn SpatialIndex,
        center: FreePoint,
        radius: FreeCoordinate,
    ) -> Vec<EntityId> {
        let mut out = Vec::new();
        index.query_overlapping(center, radius, &mut out);
        out.sort();
        out
    }

    #[test]
    fn brute_force_touching_counts() {
        let [a, b] = ids(2).try_into().unwrap();
        let mut index = BruteForceIndex::new();
        index.insert(a, FreePoint::new(0., 0., 0.), 1.0);
        index.insert(b, FreePoint::new(5., 0., 0.), 1.0);
        assert_eq!(sorted_query(&index, FreePoint::new(2., 0., 0.), 1.0), vec![a]);
        assert_eq!(sorted_query(&index, FreePoint::new(2.5, 0., 0.), 1.5), vec![a, b]);
        assert_eq!(index.len(), 2);
        index.clear();
        assert!(index.is_empty());
    }

    #[test]
    fn tree_overflow_and_len() {
        let [inside, outside] = ids(2).try_into().unwrap();
        let mut tree = SphereTree::new(10.0, 4);
        tree.insert(inside, FreePoint::new(1., 1., 1.), 0.5);
        tree.insert(outside, FreePoint::new(50., 0., 0.), 0.5);
        assert_eq!(tree.len(), 2);
        assert_eq!(
            sorted_query(&tree, FreePoint::new(50.5, 0., 0.), 0.1),
            vec![outside]
        );
        assert_eq!(sorted_query(&tree, FreePoint::new(1., 1., 1.5), 0.1), vec![inside]);
    }

    #[test]
    fn tree_clear_keeps_nodes() {
        let id = ids(1)[0];
        let mut tree = SphereTree::new(10.0, 4);
        tree.insert(id, FreePoint::new(1., 1., 1.), 0.1);
        let node_count = tree.nodes.len();
        assert!(node_count > 1);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.nodes.len(), node_count);
        tree.insert(id, FreePoint::new(1., 1., 1.), 0.1);
        assert_eq!(tree.nodes.len(), node_count);
    }

    /// The tree must find at least every exact overlap.
    #[test]
    fn tree_agrees_with_brute_force() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5eed);
        let entity_ids = ids(300);
        let mut tree = SphereTree::new(20.0, 5);
        let mut brute = BruteForceIndex::new();
        for &id in &entity_ids {
            // Some entries extend past the root cube.
            let center = FreePoint::new(
                rng.random_range(-22.0..22.0),
                rng.random_range(-22.0..22.0),
                rng.random_range(-22.0..22.0),
            );
            let radius = rng.random_range(0.0..3.0);
            tree.insert(id, center, radius);
            brute.insert(id, center, radius);
        }

        let mut failures = MultiFailure::new();
        for _ in 0..200 {
            let center = FreePoint::new(
                rng.random_range(-25.0..25.0),
                rng.random_range(-25.0..25.0),
                rng.random_range(-25.0..25.0),
            );
            let radius = rng.random_range(0.0..4.0);
            failures.catch(|| {
                let expected = sorted_query(&brute, center, radius);
                let mut actual = sorted_query(&tree, center, radius);
                actual.dedup();
                assert_eq!(actual, expected, "query at {center:?} radius {radius}");
            });
        }
    }
}
