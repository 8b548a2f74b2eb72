use crate::geometry::Shape;
use super::NodeId;

/// Opaque reference to a stored item. Handles are issued in insertion
/// order and never reused, so a removed handle stays stale forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemHandle(u64);

impl ItemHandle {
    pub(crate) fn new(sequence: u64) -> Self {
        Self(sequence)
    }
}

#[derive(Debug)]
pub(crate) struct ItemEntry<T> {
    pub shape: Shape,
    pub value: T,
    /// Node currently listing this item. Updated whenever the item moves
    /// during subdivision or merge.
    pub node: NodeId,
}

/// A stored item as seen by queries.
#[derive(Debug)]
pub struct ItemRef<'a, T> {
    pub handle: ItemHandle,
    pub shape: &'a Shape,
    pub value: &'a T,
}

impl<'a, T> Clone for ItemRef<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for ItemRef<'a, T> {}

impl<'a, T> ItemRef<'a, T> {
    pub(crate) fn new(handle: ItemHandle, entry: &'a ItemEntry<T>) -> Self {
        Self {
            handle,
            shape: &entry.shape,
            value: &entry.value,
        }
    }
}

#[test]
fn handles_order_by_insertion() {
    assert!(ItemHandle::new(1) < ItemHandle::new(2));
    assert_eq!(ItemHandle::new(7), ItemHandle::new(7));
}
