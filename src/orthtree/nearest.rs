use ordered_float::OrderedFloat;
use std::{
    cmp::Reverse,
    collections::BinaryHeap,
};
use crate::geometry::Point;
use super::{ ItemHandle, ItemRef, NodeId, OrthtreeIndex };

/// An item returned by a nearest-neighbour search.
#[derive(Debug)]
pub struct Neighbor<'a, T> {
    pub item: ItemRef<'a, T>,
    /// Euclidean distance from the query point to the item's shape.
    pub distance: f64,
}

// At equal distance a node sorts before an item, so every item at that
// distance is discovered before any is reported, and items then come out
// in insertion order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Candidate {
    Node(NodeId),
    Item(ItemHandle),
}

type Frontier = BinaryHeap<Reverse<(OrderedFloat<f64>, Candidate)>>;

impl<T> OrthtreeIndex<T> {
    /// Up to `k` items closest to `point`, nearest first.
    pub fn nearest(&self, point: &Point, k: usize) -> Vec<Neighbor<'_, T>> {
        self.nearest_within(point, k, f64::INFINITY)
    }

    /// Like [`nearest`](Self::nearest), ignoring anything farther than
    /// `max_distance`.
    pub fn nearest_within(&self, point: &Point, k: usize, max_distance: f64) -> Vec<Neighbor<'_, T>> {
        let mut found = Vec::new();
        if k == 0 || self.is_empty() || !(max_distance >= 0.0) || !self.accepts_query(point.dimensions()) {
            return found;
        }
        let limit = max_distance * max_distance;

        let mut frontier = Frontier::new();
        frontier.push(Reverse((OrderedFloat(0.0), Candidate::Node(NodeId::ROOT))));

        // Popping in distance order means everything still queued is at
        // least as far as the k-th result once it is reached, so those
        // nodes are never expanded.
        while let Some(Reverse((OrderedFloat(distance_sq), candidate))) = frontier.pop() {
            if distance_sq > limit {
                break;
            }
            match candidate {
                Candidate::Item(handle) => {
                    found.push(Neighbor {
                        item: ItemRef::new(handle, self.entry(handle)),
                        distance: distance_sq.sqrt(),
                    });
                    if found.len() == k {
                        break;
                    }
                }
                Candidate::Node(id) => {
                    let node = &self.nodes[id];
                    for &handle in node.items.iter() {
                        let distance_sq = self.entry(handle).shape.distance_squared(point);
                        if distance_sq <= limit {
                            frontier.push(Reverse((OrderedFloat(distance_sq), Candidate::Item(handle))));
                        }
                    }
                    for &child in node.children.iter() {
                        let child_node = &self.nodes[child];
                        if child_node.len == 0 {
                            continue;
                        }
                        let distance_sq = child_node.bounds.distance_squared(point);
                        if distance_sq <= limit {
                            frontier.push(Reverse((OrderedFloat(distance_sq), Candidate::Node(child))));
                        }
                    }
                }
            }
        }

        found
    }
}
