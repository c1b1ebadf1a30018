//! Item descriptors: the five recursive shapes a UAP slot can take.

use std::sync::Arc;

use crate::bitfield::{BitField, Position};

/// A byte-aligned, fixed-length tile of bitfields.
///
/// Invariant: the union of its fields' bit positions covers exactly `length
/// * 8` bits without overlap (spare/FX bits are discarded by the sink, not
/// by the slab itself, they still occupy their declared bits).
#[derive(Debug, Clone)]
pub struct Slab {
    length: u8,
    fields: Arc<[BitField]>,
}

impl Slab {
    /// Build a slab from its byte length and ordered fields.
    ///
    /// `length` must be in `1..=24`, matching the 192-bit extraction window,
    /// and the fields' bit positions must tile `length * 8` bits exactly:
    /// no two fields may overlap, and no bit may go uncovered.
    ///
    /// # Panics
    /// Panics if `length` is out of range, or if `fields` overlap or leave a
    /// gap. Spare/FX bits must still be declared as fields (named `spare` or
    /// `fx`) to satisfy full coverage; the sink, not the slab, is what
    /// discards them.
    #[must_use]
    pub fn new(length: u8, fields: Vec<BitField>) -> Self {
        assert!(
            (1..=24).contains(&length),
            "slab length {length} out of range 1..=24"
        );
        let total_bits = usize::from(length) * 8;
        let mut covered = vec![false; total_bits];
        for field in &fields {
            let low = field.position().low_bit();
            let width = usize::from(field.effective_width());
            assert!(
                low + width <= total_bits,
                "field `{}` extends past the end of a {length}-byte slab",
                field.name()
            );
            for bit in covered.iter_mut().skip(low).take(width) {
                assert!(!*bit, "field `{}` overlaps a previously declared field", field.name());
                *bit = true;
            }
        }
        assert!(
            covered.iter().all(|&bit| bit),
            "slab fields leave {} of {total_bits} bits uncovered",
            covered.iter().filter(|&&bit| !bit).count()
        );
        Self {
            length,
            fields: fields.into(),
        }
    }

    /// Build a length-only slab whose bits are not individually modeled,
    /// bypassing the full-coverage check `new` enforces.
    ///
    /// Used for Compound's primary presence map, which the decoder scans
    /// directly with `bits::fx_scan` rather than through `decode_slab_fields`
    /// (it is never materialised as data, so it has no fields to cover it).
    #[must_use]
    pub fn opaque(length: u8) -> Self {
        assert!(
            (1..=24).contains(&length),
            "slab length {length} out of range 1..=24"
        );
        Self {
            length,
            fields: Arc::from([]),
        }
    }

    /// Byte length of this slab.
    #[must_use]
    pub fn length(&self) -> u8 {
        self.length
    }

    /// Ordered bitfields making up this slab.
    #[must_use]
    pub fn fields(&self) -> &[BitField] {
        &self.fields
    }
}

/// One UAP item in one of the five ASTERIX item formats.
#[derive(Debug, Clone)]
pub enum ItemDescriptor {
    /// Exactly `slab.length()` bytes.
    Fixed(Slab),
    /// FX-chained sequence of slabs, cycled if more bytes follow than there
    /// are distinct slabs declared.
    Variable(Arc<[Slab]>),
    /// One leading count byte, then that many concatenated copies of the
    /// slab sequence.
    Repetitive(Arc<[Slab]>),
    /// One leading length byte (total size including itself), payload
    /// interpreted as repeated copies of the slab sequence.
    Explicit(Arc<[Slab]>),
    /// A Variable-shaped presence bitmap selecting among `subitems[1..]`;
    /// `subitems[0]` is never materialised as data.
    Compound(Arc<[ItemDescriptor]>),
}

impl ItemDescriptor {
    /// Construct a `Variable` item from a nonempty slab sequence.
    ///
    /// Every slab's low bit is reserved for FX chaining in this context
    /// (`decode_variable` reads it as the continuation flag), so a
    /// single-bit field declared there must be marked `fx`; the same field
    /// is ordinary data in a `Fixed` item, where no such reservation exists,
    /// which is why this check lives here rather than on `BitField` itself.
    ///
    /// # Panics
    /// Panics if `slabs` is empty, or if a slab declares a non-`fx`
    /// single-bit field over its own low bit.
    #[must_use]
    pub fn variable(slabs: Vec<Slab>) -> Self {
        assert!(!slabs.is_empty(), "Variable item needs at least one slab");
        for slab in &slabs {
            for field in slab.fields() {
                let is_unflagged_low_bit = matches!(field.position(), Position::Bit { .. })
                    && field.position().low_bit() == 0
                    && !field.position().is_fx();
                assert!(
                    !is_unflagged_low_bit,
                    "field `{}` occupies a Variable slab's FX bit without being marked fx",
                    field.name()
                );
            }
        }
        Self::Variable(slabs.into())
    }

    /// Construct a `Repetitive` item from a nonempty slab sequence.
    ///
    /// # Panics
    /// Panics if `slabs` is empty.
    #[must_use]
    pub fn repetitive(slabs: Vec<Slab>) -> Self {
        assert!(!slabs.is_empty(), "Repetitive item needs at least one slab");
        Self::Repetitive(slabs.into())
    }

    /// Construct an `Explicit` item from a nonempty slab sequence.
    ///
    /// # Panics
    /// Panics if `slabs` is empty.
    #[must_use]
    pub fn explicit(slabs: Vec<Slab>) -> Self {
        assert!(!slabs.is_empty(), "Explicit item needs at least one slab");
        Self::Explicit(slabs.into())
    }

    /// Construct a `Compound` item. `subitems[0]` is the primary presence
    /// map and is never dispatched to directly; `subitems[1..]` must each be
    /// `Fixed`, `Variable`, or `Repetitive` (checked by the decoder, not
    /// here, since the check is cheapest to make once per decode rather
    /// than paid for at every construction of a shared, static descriptor).
    ///
    /// # Panics
    /// Panics if `subitems` has fewer than 2 elements.
    #[must_use]
    pub fn compound(subitems: Vec<ItemDescriptor>) -> Self {
        assert!(
            subitems.len() >= 2,
            "Compound item needs a primary map plus at least one subitem"
        );
        Self::Compound(subitems.into())
    }

    /// Human-readable tag for logging and error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            ItemDescriptor::Fixed(_) => "Fixed",
            ItemDescriptor::Variable(_) => "Variable",
            ItemDescriptor::Repetitive(_) => "Repetitive",
            ItemDescriptor::Explicit(_) => "Explicit",
            ItemDescriptor::Compound(_) => "Compound",
        }
    }
}
