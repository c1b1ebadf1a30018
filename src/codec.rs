//! The declarative, per-category codec model: an ordered mapping from FSPEC
//! bit index to UAP item, built once at startup and shared read-only by the
//! decoder thereafter.

use std::collections::BTreeMap;

use crate::item::ItemDescriptor;

/// One entry in a category's User Application Profile.
#[derive(Debug, Clone)]
pub struct UapSlot {
    item: ItemDescriptor,
    mandatory: bool,
}

impl UapSlot {
    /// The item descriptor for this FSPEC bit.
    #[must_use]
    pub fn item(&self) -> &ItemDescriptor {
        &self.item
    }

    /// Whether the category specification marks this item mandatory.
    #[must_use]
    pub fn mandatory(&self) -> bool {
        self.mandatory
    }
}

/// An ordered mapping from FSPEC bit index to `(item, mandatory)` for one
/// ASTERIX category-and-version.
///
/// Constructed once (normally by an external XML-driven generator, here by
/// [`CategoryCodecBuilder`]) and shared by shared reference thereafter: no
/// interior mutation, so concurrent decodes against the same codec need no
/// synchronization.
#[derive(Debug, Clone)]
pub struct CategoryCodec {
    category: u8,
    uap: BTreeMap<u8, UapSlot>,
}

impl CategoryCodec {
    /// Begin building a codec for the given category (1-255).
    #[must_use]
    pub fn builder(category: u8) -> CategoryCodecBuilder {
        CategoryCodecBuilder::new(category)
    }

    /// The ASTERIX category this codec decodes.
    #[must_use]
    pub fn category(&self) -> u8 {
        self.category
    }

    /// The FSPEC-bit-index → slot mapping. Keys are dense but may have
    /// gaps; FX bit positions never appear as keys.
    #[must_use]
    pub fn uap_items(&self) -> &BTreeMap<u8, UapSlot> {
        &self.uap
    }
}

/// Builder for [`CategoryCodec`]; the in-process stand-in for the XML
/// ingestion pipeline, which is out of scope for this crate.
pub struct CategoryCodecBuilder {
    category: u8,
    uap: BTreeMap<u8, UapSlot>,
}

impl CategoryCodecBuilder {
    fn new(category: u8) -> Self {
        Self {
            category,
            uap: BTreeMap::new(),
        }
    }

    /// Declare the UAP item at the given 0-based FSPEC bit index.
    ///
    /// # Panics
    /// Panics if `bit_index` lands on an FX position (`7, 15, 23, ...`),
    /// since those are reserved for chaining and never carry an item.
    #[must_use]
    pub fn slot(mut self, bit_index: u8, item: ItemDescriptor, mandatory: bool) -> Self {
        assert!(
            bit_index % 8 != 7,
            "bit index {bit_index} is an FX position and cannot carry a UAP item"
        );
        self.uap.insert(bit_index, UapSlot { item, mandatory });
        self
    }

    /// Finalize the codec.
    #[must_use]
    pub fn build(self) -> CategoryCodec {
        CategoryCodec {
            category: self.category,
            uap: self.uap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitfield::{BitField, Position};
    use crate::item::Slab;

    #[test]
    fn builder_rejects_fx_bit_index() {
        let result = std::panic::catch_unwind(|| {
            CategoryCodec::builder(48).slot(
                7,
                ItemDescriptor::Fixed(Slab::opaque(1)),
                false,
            )
        });
        assert!(result.is_err());
    }

    #[test]
    fn builder_round_trips_category_and_slots() {
        let sac = BitField::builder("sac", Position::Range { from: 16, to: 9 })
            .build()
            .unwrap();
        let sic = BitField::builder("sic", Position::Range { from: 8, to: 1 })
            .build()
            .unwrap();
        let codec = CategoryCodec::builder(48)
            .slot(
                0,
                ItemDescriptor::Fixed(Slab::new(2, vec![sac, sic])),
                true,
            )
            .build();
        assert_eq!(codec.category(), 48);
        assert_eq!(codec.uap_items().len(), 1);
        assert!(codec.uap_items().get(&0).unwrap().mandatory());
    }
}
