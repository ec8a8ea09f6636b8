//! Board layer identity and layer sets
//!
//! Copper layers are numbered 0 (front) through 31 (back); anything above is
//! a non-copper layer (silk, mask, ...) and never participates in
//! connectivity.

use serde::Serialize;

/// Number of copper layer slots
pub const MAX_COPPER_LAYERS: u8 = 32;

/// One board layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LayerId(pub u8);

impl LayerId {
    pub const F_CU: LayerId = LayerId(0);
    pub const B_CU: LayerId = LayerId(31);

    pub fn is_copper(&self) -> bool {
        self.0 < MAX_COPPER_LAYERS
    }
}

/// Bitset of layers an entity occupies
///
/// Holds layers 0..=63; higher-numbered layers are never copper and are
/// never stored, so membership tests on them report false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerSet(u64);

impl LayerSet {
    pub const EMPTY: LayerSet = LayerSet(0);

    pub fn single(layer: LayerId) -> Self {
        let mut set = LayerSet::EMPTY;
        set.insert(layer);
        set
    }

    pub fn from_layers(layers: &[LayerId]) -> Self {
        let mut set = LayerSet::EMPTY;
        for layer in layers {
            set.insert(*layer);
        }
        set
    }

    /// Every copper layer
    pub fn all_copper() -> Self {
        LayerSet((1u64 << MAX_COPPER_LAYERS) - 1)
    }

    pub fn insert(&mut self, layer: LayerId) {
        if (layer.0 as u32) < u64::BITS {
            self.0 |= 1u64 << layer.0;
        }
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        (layer.0 as u32) < u64::BITS && self.0 & (1u64 << layer.0) != 0
    }

    pub fn intersection(&self, other: LayerSet) -> LayerSet {
        LayerSet(self.0 & other.0)
    }

    pub fn union(&self, other: LayerSet) -> LayerSet {
        LayerSet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Copper layers only
    pub fn copper(&self) -> LayerSet {
        self.intersection(LayerSet::all_copper())
    }

    /// Lowest-numbered layer in the set
    pub fn first(&self) -> Option<LayerId> {
        if self.0 == 0 {
            None
        } else {
            Some(LayerId(self.0.trailing_zeros() as u8))
        }
    }

    /// Iterate layers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = LayerId> + '_ {
        let bits = self.0;
        (0..64u8).filter(move |i| bits & (1u64 << i) != 0).map(LayerId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_set_membership() {
        let mut set = LayerSet::single(LayerId::F_CU);
        set.insert(LayerId::B_CU);

        assert!(set.contains(LayerId::F_CU));
        assert!(set.contains(LayerId::B_CU));
        assert!(!set.contains(LayerId(3)));
    }

    #[test]
    fn test_layer_set_intersection() {
        let a = LayerSet::from_layers(&[LayerId(0), LayerId(1)]);
        let b = LayerSet::from_layers(&[LayerId(1), LayerId(2)]);
        let common = a.intersection(b);

        assert!(common.contains(LayerId(1)));
        assert!(!common.contains(LayerId(0)));
    }

    #[test]
    fn test_high_layer_is_never_stored() {
        let set = LayerSet::single(LayerId(70));
        assert!(set.is_empty());
        assert!(!set.contains(LayerId(70)));

        let mut copper = LayerSet::all_copper();
        copper.insert(LayerId(200));
        assert!(!copper.contains(LayerId(200)));
        assert_eq!(copper, LayerSet::all_copper());
    }

    #[test]
    fn test_layer_set_iter_ascending() {
        let set = LayerSet::from_layers(&[LayerId(5), LayerId(0), LayerId(31)]);
        let layers: Vec<LayerId> = set.iter().collect();

        assert_eq!(layers, vec![LayerId(0), LayerId(5), LayerId(31)]);
        assert_eq!(set.first(), Some(LayerId(0)));
    }

    #[test]
    fn test_copper_predicate() {
        assert!(LayerId::F_CU.is_copper());
        assert!(LayerId::B_CU.is_copper());
        assert!(!LayerId(40).is_copper());
    }
}
