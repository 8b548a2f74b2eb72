use std::ops::{ Index, IndexMut };
use crate::geometry::Region;
use super::ItemHandle;

/// Arena slot of a node. Slots are recycled after a merge, so an id is
/// only meaningful while the node it was issued for is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);
}

#[derive(Debug)]
pub(crate) struct Node {
    pub bounds: Region,
    pub depth: usize,
    pub parent: Option<NodeId>,
    /// Empty for a leaf, 2^D entries in orthant order otherwise.
    pub children: Vec<NodeId>,
    pub items: Vec<ItemHandle>,
    /// Items held by this node and all of its descendants.
    pub len: usize,
}

impl Node {
    pub fn new(bounds: Region, depth: usize, parent: Option<NodeId>) -> Self {
        Self {
            bounds,
            depth,
            parent,
            children: Vec::new(),
            items: Vec::new(),
            len: 0,
        }
    }

    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
}

impl NodeArena {
    /// Arena holding only a root node covering `bounds`.
    pub fn with_root(bounds: Region) -> Self {
        Self {
            slots: vec![Some(Node::new(bounds, 0, None))],
            free: Vec::new(),
        }
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots.iter()
            .enumerate()
            .filter_map(|(slot, node)| node.as_ref().map(|node| (NodeId(slot), node)))
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.get(id).expect("Non-existant node id")
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots.get_mut(id.0)
            .and_then(Option::as_mut)
            .expect("Non-existant node id")
    }
}

#[test]
fn arena_recycles_slots() {
    use glam::dvec2;

    let bounds = Region::new(dvec2(0.0, 0.0).into(), dvec2(1.0, 1.0).into()).unwrap();
    let mut arena = NodeArena::with_root(bounds.clone());
    assert_eq!(arena.len(), 1);

    let a = arena.insert(Node::new(bounds.clone(), 1, Some(NodeId::ROOT)));
    let b = arena.insert(Node::new(bounds.clone(), 1, Some(NodeId::ROOT)));
    assert_eq!(arena.len(), 3);

    assert!(arena.remove(a).is_some());
    assert!(arena.remove(a).is_none());
    assert!(arena.get(a).is_none());
    assert_eq!(arena.len(), 2);

    let c = arena.insert(Node::new(bounds, 2, Some(b)));
    assert_eq!(c, a);
    assert_eq!(arena[c].depth, 2);
    assert_eq!(arena.iter().count(), 3);
}
