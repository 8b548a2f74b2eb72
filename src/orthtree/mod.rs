use ahash::AHashMap;
use crate::{
    config::OrthtreeConfig,
    error::{ OrthtreeError, OrthtreeResult },
    geometry::{ OrthantIndex, Point, Region, Shape },
};

mod item;
pub use item::*;

mod nearest;
pub use nearest::*;

mod node;
pub(crate) use node::*;

mod query;
pub use query::*;

/// Shape of an orthtree at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrthtreeStats {
    pub node_count: usize,
    pub leaf_count: usize,
    /// Depth of the deepest node.
    pub depth: usize,
    pub item_count: usize,
}

/// An n-dimensional orthtree (quadtree for D = 2, octree for D = 3).
///
/// Leaves split into 2^D equal children once they hold more than
/// `capacity` items, down to `max_depth`. Subtrees whose item count falls
/// back to `capacity` or below are merged into their root again. Items
/// that straddle a split plane stay at the node above it.
#[derive(Debug)]
pub struct OrthtreeIndex<T> {
    nodes: NodeArena,
    items: AHashMap<ItemHandle, ItemEntry<T>>,
    dimensions: usize,
    capacity: usize,
    max_depth: usize,
    next_sequence: u64,
}

impl<T> OrthtreeIndex<T> {
    pub fn new(bounds: Region, dimensions: usize, capacity: usize, max_depth: usize) -> OrthtreeResult<Self> {
        Self::with_config(OrthtreeConfig {
            bounds,
            dimensions,
            capacity,
            max_depth,
        })
    }

    pub fn with_config(config: OrthtreeConfig) -> OrthtreeResult<Self> {
        config.validate()?;
        log::debug!(
            "Creating {}-dimensional orthtree: capacity {}, max depth {}",
            config.dimensions,
            config.capacity,
            config.max_depth
        );

        Ok(Self {
            nodes: NodeArena::with_root(config.bounds),
            items: AHashMap::new(),
            dimensions: config.dimensions,
            capacity: config.capacity,
            max_depth: config.max_depth,
            next_sequence: 0,
        })
    }

    #[inline(always)]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn bounds(&self) -> &Region {
        &self.nodes[NodeId::ROOT].bounds
    }

    pub fn config(&self) -> OrthtreeConfig {
        OrthtreeConfig {
            bounds: self.bounds().clone(),
            dimensions: self.dimensions,
            capacity: self.capacity,
            max_depth: self.max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, handle: ItemHandle) -> bool {
        self.items.contains_key(&handle)
    }

    pub fn get(&self, handle: ItemHandle) -> Option<ItemRef<'_, T>> {
        self.items.get(&handle).map(|entry| ItemRef::new(handle, entry))
    }

    pub fn get_mut(&mut self, handle: ItemHandle) -> Option<&mut T> {
        self.items.get_mut(&handle).map(|entry| &mut entry.value)
    }

    /// Stores `value` under `shape` in the deepest node that fully contains
    /// the shape.
    ///
    /// Fails with [`OrthtreeError::OutOfBounds`] if the shape does not touch
    /// the index bounds at all. Shapes that only partially overlap the
    /// bounds are kept at the root.
    pub fn insert(&mut self, shape: impl Into<Shape>, value: T) -> OrthtreeResult<ItemHandle> {
        let shape = shape.into();
        if shape.dimensions() != self.dimensions {
            return Err(OrthtreeError::DimensionMismatch {
                expected: self.dimensions,
                found: shape.dimensions(),
            });
        }
        if let Shape::Region(region) = &shape {
            region.validate()?;
        }
        if !self.bounds().intersects_shape(&shape) {
            return Err(OrthtreeError::OutOfBounds);
        }

        let handle = ItemHandle::new(self.next_sequence);
        self.next_sequence += 1;

        let mut id = NodeId::ROOT;
        loop {
            let node = &mut self.nodes[id];
            node.len += 1;
            if node.is_leaf() {
                break;
            }
            match node.bounds.orthant_containing(&shape) {
                Some(orthant) => id = node.children[orthant.index()],
                None => break,
            }
        }

        self.nodes[id].items.push(handle);
        self.items.insert(handle, ItemEntry { shape, value, node: id });
        self.split_if_overflowing(id);

        Ok(handle)
    }

    /// Removes an item, returning `false` if the handle is stale.
    pub fn remove(&mut self, handle: ItemHandle) -> bool {
        self.take(handle).is_ok()
    }

    /// Removes an item and hands back its value.
    ///
    /// The owning node's item list keeps insertion order, which query order
    /// and merges depend on, so removal shifts the remaining handles down.
    /// That costs time linear in the node's own item count, which only
    /// exceeds `capacity` for leaves at `max_depth` and for nodes holding
    /// many items that straddle their split planes.
    pub fn take(&mut self, handle: ItemHandle) -> OrthtreeResult<T> {
        let entry = self.items.remove(&handle).ok_or(OrthtreeError::StaleHandle)?;

        let owner = &mut self.nodes[entry.node];
        let position = owner.items.iter()
            .position(|held| *held == handle)
            .expect("Item missing from its node");
        owner.items.remove(position);

        let mut current = Some(entry.node);
        while let Some(id) = current {
            let node = &mut self.nodes[id];
            node.len -= 1;
            current = node.parent;
        }

        self.merge_upward(entry.node);
        Ok(entry.value)
    }

    /// Drops every item and node. Handles issued before the clear stay stale.
    pub fn clear(&mut self) {
        log::debug!("Clearing orthtree of {} items", self.items.len());
        let bounds = self.bounds().clone();
        self.nodes = NodeArena::with_root(bounds);
        self.items.clear();
    }

    /// Items whose shape intersects `region`.
    pub fn query_region(&self, region: &Region) -> Query<'_, T> {
        if !self.accepts_query(region.dimensions()) {
            return Query::empty(self);
        }
        // Deserialized regions have not been through Region::new
        if let Err(err) = region.validate() {
            log::warn!("Ignoring query with malformed region: {}", err);
            return Query::empty(self);
        }
        Query::new(self, Some(region.clone()))
    }

    /// Items whose shape contains `point`.
    pub fn query_point(&self, point: &Point) -> Query<'_, T> {
        if !self.accepts_query(point.dimensions()) {
            return Query::empty(self);
        }
        Query::new(self, Some(Region::from_point(point.clone())))
    }

    /// Every item, in the same order a query over the whole index yields them.
    pub fn iter(&self) -> Query<'_, T> {
        Query::new(self, None)
    }

    pub fn stats(&self) -> OrthtreeStats {
        self.nodes.iter().fold(
            OrthtreeStats { item_count: self.items.len(), ..Default::default() },
            |mut stats, (_, node)| {
                stats.node_count += 1;
                stats.depth = stats.depth.max(node.depth);
                if node.is_leaf() {
                    stats.leaf_count += 1;
                }
                stats
            },
        )
    }

    pub(crate) fn entry(&self, handle: ItemHandle) -> &ItemEntry<T> {
        self.items.get(&handle).expect("Node lists an unknown item")
    }

    pub(crate) fn accepts_query(&self, dimensions: usize) -> bool {
        if dimensions != self.dimensions {
            log::warn!(
                "Ignoring {}-dimensional query on a {}-dimensional orthtree",
                dimensions,
                self.dimensions
            );
            return false;
        }
        true
    }

    /// Subdivides a leaf that holds more than `capacity` items. Children
    /// that inherit too many items split on their next insert.
    fn split_if_overflowing(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        if node.is_leaf() && node.items.len() > self.capacity && node.depth < self.max_depth {
            self.subdivide(id);
        }
    }

    fn subdivide(&mut self, id: NodeId) {
        let bounds = self.nodes[id].bounds.clone();
        let depth = self.nodes[id].depth + 1;

        let children: Vec<NodeId> = OrthantIndex::all(self.dimensions)
            .map(|orthant| self.nodes.insert(Node::new(bounds.orthant(orthant), depth, Some(id))))
            .collect();

        let held = std::mem::take(&mut self.nodes[id].items);
        let mut retained = Vec::new();
        for handle in held {
            let entry = self.items.get_mut(&handle).expect("Node lists an unknown item");
            match bounds.orthant_containing(&entry.shape) {
                Some(orthant) => {
                    let child = children[orthant.index()];
                    entry.node = child;
                    let child_node = &mut self.nodes[child];
                    child_node.items.push(handle);
                    child_node.len += 1;
                }
                None => retained.push(handle),
            }
        }

        log::trace!(
            "Subdivided node at depth {} into {} children ({} items retained)",
            depth - 1,
            children.len(),
            retained.len()
        );

        let node = &mut self.nodes[id];
        node.items = retained;
        node.children = children;
    }

    /// Walks from `start` to the root, collapsing every internal node whose
    /// subtree no longer exceeds capacity.
    fn merge_upward(&mut self, start: NodeId) {
        let mut current = Some(start);
        while let Some(id) = current {
            let node = &self.nodes[id];
            let parent = node.parent;
            if !node.is_leaf() {
                // Ancestors hold at least as many items, none of them can merge either
                if node.len > self.capacity {
                    break;
                }
                self.collapse(id);
            }
            current = parent;
        }
    }

    /// Moves all descendant items into `id`, then frees the descendants.
    fn collapse(&mut self, id: NodeId) {
        let mut descendants = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(child) = stack.pop() {
            descendants.push(child);
            stack.extend(self.nodes[child].children.iter().rev().copied());
        }

        for &descendant in descendants.iter() {
            let absorbed = std::mem::take(&mut self.nodes[descendant].items);
            for &handle in absorbed.iter() {
                self.items.get_mut(&handle).expect("Node lists an unknown item").node = id;
            }
            self.nodes[id].items.extend(absorbed);
        }

        self.nodes[id].children.clear();
        for descendant in descendants.iter() {
            self.nodes.remove(*descendant);
        }

        log::trace!(
            "Merged {} nodes into node at depth {}",
            descendants.len(),
            self.nodes[id].depth
        );
    }
}

#[cfg(feature = "multi-thread")]
impl<T: Sync> OrthtreeIndex<T> {
    /// Runs one region query per entry of `regions` in parallel.
    pub fn par_query_regions(&self, regions: &[Region]) -> Vec<Vec<ItemRef<'_, T>>> {
        use rayon::prelude::*;

        regions.par_iter()
            .map(|region| self.query_region(region).collect())
            .collect()
    }
}

#[cfg(test)]
impl<T> OrthtreeIndex<T> {
    /// Panics if any structural invariant of the tree is broken.
    pub(crate) fn check_invariants(&self) {
        let children_per_node = OrthantIndex::count(self.dimensions);
        let mut seen_items = 0;
        let mut stack = vec![NodeId::ROOT];
        let mut reachable = 0;

        while let Some(id) = stack.pop() {
            reachable += 1;
            let node = &self.nodes[id];
            assert!(node.depth <= self.max_depth, "node deeper than max_depth");
            assert!(
                node.children.is_empty() || node.children.len() == children_per_node,
                "internal node with {} children",
                node.children.len()
            );

            let child_len: usize = node.children.iter().map(|&child| self.nodes[child].len).sum();
            assert_eq!(node.len, node.items.len() + child_len, "stale subtree count");
            if !node.is_leaf() {
                assert!(node.len > self.capacity, "internal node should have merged");
            }

            for &handle in node.items.iter() {
                let entry = self.entry(handle);
                assert_eq!(entry.node, id, "item points at the wrong node");
                if id != NodeId::ROOT {
                    assert!(node.bounds.contains_shape(&entry.shape), "item outside its node");
                }
            }
            seen_items += node.items.len();

            for &child in node.children.iter() {
                let child_node = &self.nodes[child];
                assert_eq!(child_node.parent, Some(id));
                assert_eq!(child_node.depth, node.depth + 1);
                stack.push(child);
            }
        }

        assert_eq!(seen_items, self.items.len(), "items missing from the tree");
        assert_eq!(reachable, self.nodes.len(), "unreachable nodes in the arena");
    }
}

#[cfg(test)]
fn square_tree(capacity: usize, max_depth: usize) -> OrthtreeIndex<usize> {
    use glam::dvec2;
    let bounds = Region::new(dvec2(0.0, 0.0).into(), dvec2(100.0, 100.0).into()).unwrap();
    OrthtreeIndex::new(bounds, 2, capacity, max_depth).unwrap()
}

#[test]
fn construct_rejects_bad_parameters() {
    use glam::dvec2;

    let bounds = Region::new(dvec2(0.0, 0.0).into(), dvec2(1.0, 1.0).into()).unwrap();
    let err = |result: OrthtreeResult<OrthtreeIndex<()>>| result.err();

    assert!(matches!(
        err(OrthtreeIndex::new(bounds.clone(), 0, 4, 5)),
        Some(OrthtreeError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        err(OrthtreeIndex::new(bounds.clone(), 2, 0, 5)),
        Some(OrthtreeError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        err(OrthtreeIndex::new(bounds.clone(), 3, 4, 5)),
        Some(OrthtreeError::InvalidConfiguration(_))
    ));
    assert!(OrthtreeIndex::<()>::new(bounds, 2, 4, 0).is_ok());
}

#[test]
fn subdivide_on_overflow() {
    use glam::dvec2;

    let mut tree = square_tree(4, 5);
    for i in 1..=4 {
        tree.insert(Point::from(dvec2(i as f64, i as f64)), i).unwrap();
    }
    assert_eq!(tree.stats().node_count, 1);

    tree.insert(Point::from(dvec2(5.0, 5.0)), 5).unwrap();
    tree.check_invariants();
    let stats = tree.stats();
    assert_eq!(stats.node_count, 5);
    assert_eq!(stats.leaf_count, 4);
    assert_eq!(stats.depth, 1);
    assert_eq!(tree.nodes[tree.nodes[NodeId::ROOT].children[0]].items.len(), 5);

    // The crowded child splits once something else lands in it
    tree.insert(Point::from(dvec2(6.0, 6.0)), 6).unwrap();
    tree.check_invariants();
    assert_eq!(tree.stats().depth, 2);
}

#[test]
fn spanning_region_stays_at_parent() {
    use glam::dvec2;

    let mut tree = square_tree(1, 5);
    let spanning = Region::new(dvec2(40.0, 40.0).into(), dvec2(60.0, 60.0).into()).unwrap();
    let big = tree.insert(spanning, 0).unwrap();
    tree.insert(Point::from(dvec2(10.0, 10.0)), 1).unwrap();
    tree.insert(Point::from(dvec2(90.0, 90.0)), 2).unwrap();
    tree.check_invariants();

    assert_eq!(tree.entry(big).node, NodeId::ROOT);
    assert!(!tree.nodes[NodeId::ROOT].is_leaf());
    assert_eq!(tree.query_point(&dvec2(50.0, 50.0).into()).count(), 1);
}

#[test]
fn partially_outside_item_lives_at_root() {
    use glam::dvec2;

    let mut tree = square_tree(1, 5);
    let poking = Region::new(dvec2(90.0, 90.0).into(), dvec2(120.0, 95.0).into()).unwrap();
    let handle = tree.insert(poking, 0).unwrap();
    tree.insert(Point::from(dvec2(1.0, 1.0)), 1).unwrap();
    tree.insert(Point::from(dvec2(2.0, 2.0)), 2).unwrap();
    tree.check_invariants();
    assert_eq!(tree.entry(handle).node, NodeId::ROOT);

    // The query misses the root bounds but still finds the overhanging part
    let outside = Region::new(dvec2(110.0, 91.0).into(), dvec2(115.0, 92.0).into()).unwrap();
    let found: Vec<_> = tree.query_region(&outside).map(|item| item.handle).collect();
    assert_eq!(found, vec![handle]);
}

#[test]
fn max_depth_bounds_clustered_points() {
    use glam::dvec2;

    let mut tree = square_tree(2, 3);
    for i in 0..20 {
        tree.insert(Point::from(dvec2(7.0, 7.0)), i).unwrap();
    }
    tree.check_invariants();
    assert_eq!(tree.stats().depth, 3);
    assert_eq!(tree.query_point(&dvec2(7.0, 7.0).into()).count(), 20);
}

#[test]
fn malformed_query_region_is_empty() {
    use glam::dvec2;

    let mut tree = square_tree(4, 5);
    tree.insert(Point::from(dvec2(5.0, 5.0)), 0).unwrap();

    let short_max = Region::unchecked(dvec2(0.0, 0.0).into(), Point::new(&[10.0]).unwrap());
    assert_eq!(tree.query_region(&short_max).count(), 0);
    let inverted = Region::unchecked(dvec2(10.0, 10.0).into(), dvec2(0.0, 0.0).into());
    assert_eq!(tree.query_region(&inverted).count(), 0);
}

#[test]
fn removal_keeps_node_order() {
    use glam::dvec2;

    // max_depth 0 keeps everything in one node past capacity
    let mut tree = square_tree(2, 0);
    let handles: Vec<ItemHandle> = (0..6)
        .map(|i| tree.insert(Point::from(dvec2(7.0, 7.0)), i).unwrap())
        .collect();
    assert_eq!(tree.nodes[NodeId::ROOT].items.len(), 6);

    assert!(tree.remove(handles[1]));
    assert!(tree.remove(handles[4]));
    tree.check_invariants();
    let order: Vec<usize> = tree.iter().map(|item| *item.value).collect();
    assert_eq!(order, vec![0, 2, 3, 5]);
}

#[test]
fn merge_restores_leaf() {
    use glam::dvec2;

    let mut tree = square_tree(4, 5);
    let handles: Vec<_> = (1..=5)
        .map(|i| tree.insert(Point::from(dvec2(i as f64, i as f64)), i).unwrap())
        .collect();
    assert!(!tree.nodes[NodeId::ROOT].is_leaf());

    assert!(tree.remove(handles[0]));
    tree.check_invariants();
    // Four items fit in one node again
    assert_eq!(tree.stats().node_count, 1);
    assert_eq!(tree.nodes[NodeId::ROOT].items.len(), 4);

    for &handle in handles[1..].iter() {
        assert!(tree.remove(handle));
        tree.check_invariants();
    }
    assert!(tree.is_empty());
    assert_eq!(tree.stats().node_count, 1);
}

#[test]
fn random_operations_keep_invariants() {
    use rand::{ rngs::SmallRng, Rng, SeedableRng };
    use glam::dvec3;

    let bounds = Region::new(dvec3(-50.0, -50.0, -50.0).into(), dvec3(50.0, 50.0, 50.0).into()).unwrap();
    let mut tree = OrthtreeIndex::new(bounds, 3, 3, 6).unwrap();
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mut live = Vec::new();

    for step in 0..2000 {
        if live.is_empty() || rng.gen_bool(0.6) {
            let center = dvec3(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            );
            let handle = if rng.gen_bool(0.2) {
                let region = Region::from_center(&center.into(), rng.gen_range(0.0..5.0)).unwrap();
                tree.insert(region, step).unwrap()
            } else {
                tree.insert(Point::from(center), step).unwrap()
            };
            live.push(handle);
        } else {
            let handle = live.swap_remove(rng.gen_range(0..live.len()));
            assert!(tree.remove(handle));
            assert!(!tree.remove(handle));
        }

        if step % 50 == 0 {
            tree.check_invariants();
        }
    }
    tree.check_invariants();
    assert_eq!(tree.iter().count(), live.len());
}

#[test]
#[ignore]
fn insert_query_timing() {
    use crate::utils::time_test;
    use rand::{ rngs::SmallRng, Rng, SeedableRng };
    use glam::dvec2;

    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = square_tree(16, 12);
    let mut rng = SmallRng::seed_from_u64(42);
    let points: Vec<Point> = (0..100_000)
        .map(|_| dvec2(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)).into())
        .collect();

    time_test!(
        points.iter().enumerate().for_each(|(i, point)| { tree.insert(point.clone(), i).unwrap(); }),
        "Orthtree Insert 100k"
    );
    let window = Region::new(dvec2(25.0, 25.0).into(), dvec2(35.0, 35.0).into()).unwrap();
    let hits = time_test!(tree.query_region(&window).count(), "Orthtree Query Window");
    assert!(hits > 0);
    time_test!(tree.nearest(&dvec2(50.0, 50.0).into(), 10), "Orthtree Nearest 10");
}
