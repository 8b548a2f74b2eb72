use std::slice;
use crate::geometry::Region;
use super::{ ItemHandle, ItemRef, NodeId, OrthtreeIndex };

/// Lazy depth-first walk over the items of an orthtree.
///
/// Items held directly by a node come before those of its children, and
/// children are visited in orthant index order. Each query owns its own
/// cursor, so any number of them may run over the same tree.
pub struct Query<'a, T> {
    tree: &'a OrthtreeIndex<T>,
    /// `None` visits every item.
    filter: Option<Region>,
    stack: Vec<NodeId>,
    held: slice::Iter<'a, ItemHandle>,
}

impl<'a, T> Query<'a, T> {
    pub(crate) fn new(tree: &'a OrthtreeIndex<T>, filter: Option<Region>) -> Self {
        Self {
            tree,
            filter,
            // The root is never pruned, it may hold items that poke
            // out of its bounds.
            stack: vec![NodeId::ROOT],
            held: [].iter(),
        }
    }

    pub(crate) fn empty(tree: &'a OrthtreeIndex<T>) -> Self {
        Self {
            tree,
            filter: None,
            stack: Vec::new(),
            held: [].iter(),
        }
    }
}

impl<'a, T> Iterator for Query<'a, T> {
    type Item = ItemRef<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            for &handle in self.held.by_ref() {
                let entry = tree.entry(handle);
                let matches = self.filter
                    .as_ref()
                    .map_or(true, |region| region.intersects_shape(&entry.shape));
                if matches {
                    return Some(ItemRef::new(handle, entry));
                }
            }

            let node = &tree.nodes[self.stack.pop()?];
            // Reversed so the lowest orthant is popped first
            for &child in node.children.iter().rev() {
                let visit = self.filter
                    .as_ref()
                    .map_or(true, |region| region.intersects(&tree.nodes[child].bounds));
                if visit {
                    self.stack.push(child);
                }
            }
            self.held = node.items.iter();
        }
    }
}
