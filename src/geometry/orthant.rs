use bitvec::prelude::*;
use super::MAX_DIMENSIONS;

/// Selects one of the 2^D children of a node.
///
/// ```text
/// Bit layout (D = 3)
/// 0000 ... 0 1 0 1
///            | | |
///            | | -- axis 0 (x)
///            | ---- axis 1 (y)
///            ------ axis 2 (z)
///
/// Bit a set:   upper half [mid, max] on axis a
/// Bit a clear: lower half [min, mid] on axis a
/// All bits at or above D MUST be 0.
/// ```
///
/// Children are always stored and visited in ascending index order, so
/// for D = 2 the order is (low, low), (high, low), (low, high), (high, high).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrthantIndex(u32);

impl OrthantIndex {
    /// Number of orthants a node of this dimensionality splits into.
    #[inline(always)]
    pub fn count(dimensions: usize) -> usize {
        debug_assert!(dimensions <= MAX_DIMENSIONS);
        1 << dimensions
    }

    /// All orthants of a node in storage order.
    pub fn all(dimensions: usize) -> impl Iterator<Item = OrthantIndex> {
        (0..Self::count(dimensions) as u32).map(OrthantIndex)
    }

    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn is_upper(&self, axis: usize) -> bool {
        assert!(axis < MAX_DIMENSIONS);
        self.0.view_bits::<Lsb0>()[axis]
    }

    pub fn set_upper(&mut self, axis: usize, upper: bool) {
        assert!(axis < MAX_DIMENSIONS);
        self.0.view_bits_mut::<Lsb0>().set(axis, upper);
    }

    fn _sanity_check(&self, dimensions: usize) {
        // No bits past the dimensionality
        assert!(self.0.view_bits::<Lsb0>()[dimensions..].not_any());
    }
}

#[test]
fn orthant_index_bits() {
    let mut orthant = OrthantIndex::default();
    orthant.set_upper(0, true);
    orthant.set_upper(2, true);
    orthant._sanity_check(3);
    assert_eq!(orthant.index(), 0b101);
    assert!(orthant.is_upper(0));
    assert!(!orthant.is_upper(1));
    assert!(orthant.is_upper(2));

    orthant.set_upper(0, false);
    assert_eq!(orthant.index(), 0b100);
}

#[test]
fn orthant_enumeration() {
    assert_eq!(OrthantIndex::count(1), 2);
    assert_eq!(OrthantIndex::count(3), 8);

    let all: Vec<usize> = OrthantIndex::all(2).map(|o| o.index()).collect();
    assert_eq!(all, vec![0, 1, 2, 3]);
    OrthantIndex::all(4).for_each(|o| o._sanity_check(4));
}
