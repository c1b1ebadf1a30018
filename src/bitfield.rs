//! Declarative description of one named bitfield inside a [`Slab`](crate::item::Slab).

use std::collections::BTreeMap;
use std::{error, fmt};

/// How the raw bits of a field are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Plain unsigned binary.
    Unsigned,
    /// Two's-complement signed binary.
    Signed,
    /// Unsigned binary, conventionally rendered in octal by the caller.
    Octal,
    /// One 8-bit ASCII character per byte of the field.
    Ascii,
    /// One 6-bit ASTERIX character per 6 bits of the field.
    SixBitsChar,
    /// Unsigned binary, conventionally rendered in hexadecimal by the caller.
    Hex,
    /// Unsigned binary, conventionally rendered as octal digit groups.
    OctalDigits,
    /// Opaque bits; the caller is responsible for interpretation.
    Raw,
}

/// Physical unit a scaled numeric field is expressed in, after `scale` has
/// been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    /// Metres.
    M,
    /// Nautical miles.
    Nm,
    /// Flight level.
    Fl,
    /// Feet.
    Ft,
    /// No unit (dimensionless, or caller-interpreted).
    None,
}

/// Position of a bitfield inside its slab, 1-based from the top of the slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// A single-bit flag. `fx` marks it as structural (an FX continuation
    /// bit) rather than data.
    Bit { bit: u8, fx: bool },
    /// An inclusive bit range, `from >= to`, both 1-based within the slab.
    Range { from: u8, to: u8 },
}

impl Position {
    /// Number of bits this position covers, always in `1..=64`.
    #[must_use]
    pub fn effective_width(&self) -> u8 {
        match *self {
            Position::Bit { .. } => 1,
            Position::Range { from, to } => from - to + 1,
        }
    }

    /// 0-based offset of the field's lowest bit, counting from the LSB of
    /// the slab's first word.
    pub(crate) fn low_bit(&self) -> usize {
        match *self {
            Position::Bit { bit, .. } => usize::from(bit - 1),
            Position::Range { to, .. } => usize::from(to - 1),
        }
    }

    /// True if this is a single bit marked as an FX continuation marker.
    #[must_use]
    pub fn is_fx(&self) -> bool {
        matches!(self, Position::Bit { fx: true, .. })
    }
}

/// Failures raised while building a [`BitField`] or a category codec, as
/// opposed to failures raised while decoding wire bytes (see
/// [`crate::decoder::Error`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `to < from` was passed to a range position (the caller should swap
    /// them instead of relying on the decoder to do so).
    InvertedRange { from: u8, to: u8 },
    /// A range or bit position's width exceeds the 64-bit single-field
    /// limit.
    WidthTooWide { width: u16 },
    /// A unit string outside the recognised set, and the codec's
    /// `fail_on_unknown_unit` policy rejected it at build time.
    UnknownUnit(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvertedRange { from, to } => {
                write!(f, "inverted bit range: from={from} < to={to}")
            }
            Self::WidthTooWide { width } => write!(f, "field width {width} exceeds 64 bits"),
            Self::UnknownUnit(unit) => write!(f, "unknown unit `{unit}`"),
        }
    }
}

impl error::Error for BuildError {}

/// Immutable description of one named bitfield within a slab.
#[derive(Debug, Clone)]
pub struct BitField {
    name: String,
    position: Position,
    encoding: Encoding,
    scale: f64,
    min: Option<f64>,
    max: Option<f64>,
    units: Units,
    enumeration: BTreeMap<i64, String>,
    repeat: bool,
    code: u16,
}

impl BitField {
    /// Begin building a field at the given bit position.
    #[must_use]
    pub fn builder(name: impl Into<String>, position: Position) -> BitFieldBuilder {
        BitFieldBuilder::new(name, position)
    }

    /// Canonical lowercase dotted identifier, e.g. `sac` or `track.quality`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of this field within its slab.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Wire-level encoding of this field.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Scale factor applied to produce a real value; `1.0` means "no
    /// scaling" (the field is integral).
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Declared minimum value, if any.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Declared maximum value, if any.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Physical unit of a scaled value.
    #[must_use]
    pub fn units(&self) -> Units {
        self.units
    }

    /// Ordered code → label map for enumerated fields.
    #[must_use]
    pub fn enumeration(&self) -> &BTreeMap<i64, String> {
        &self.enumeration
    }

    /// True iff this field appears inside a Repetitive/Explicit item (the
    /// caller will observe an array of it).
    #[must_use]
    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Dense small integer identifier assigned at dictionary time, used for
    /// array preallocation in the sink.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Number of bits this field occupies, in `1..=64`.
    #[must_use]
    pub fn effective_width(&self) -> u8 {
        self.position.effective_width()
    }

    /// Bitmask covering `effective_width` low bits.
    #[must_use]
    pub fn bit_mask(&self) -> u64 {
        crate::bits::mask_for_width(self.effective_width())
    }

    /// True if this field's canonical name marks it as non-data (`fx`,
    /// `spare`, `unused`) per the dictionary builder's own filter.
    #[must_use]
    pub fn is_reserved_name(&self) -> bool {
        matches!(self.name.as_str(), "fx" | "spare" | "unused")
    }
}

/// Builder for [`BitField`], mirroring the defaults the XML pipeline applies
/// (scale `1.0`, no enumeration, not repeated) before generating a symbol.
pub struct BitFieldBuilder {
    name: String,
    position: Position,
    encoding: Encoding,
    scale: f64,
    min: Option<f64>,
    max: Option<f64>,
    units: Units,
    enumeration: BTreeMap<i64, String>,
    repeat: bool,
    code: u16,
}

impl BitFieldBuilder {
    fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            encoding: Encoding::Unsigned,
            scale: 1.0,
            min: None,
            max: None,
            units: Units::None,
            enumeration: BTreeMap::new(),
            repeat: false,
            code: 0,
        }
    }

    /// Set the wire-level encoding (default `Unsigned`).
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the scale factor (default `1.0`).
    #[must_use]
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the declared range.
    #[must_use]
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Set the physical unit (default `None`).
    #[must_use]
    pub fn units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Add one enumerated code/label pair.
    #[must_use]
    pub fn enumerated(mut self, value: i64, label: impl Into<String>) -> Self {
        self.enumeration.insert(value, label.into());
        self
    }

    /// Mark this field as appearing inside a Repetitive/Explicit item.
    #[must_use]
    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set the dictionary-assigned dense code (default `0`).
    #[must_use]
    pub fn code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Validate and finalize the field.
    pub fn build(self) -> Result<BitField, BuildError> {
        if let Position::Range { from, to } = self.position {
            if from < to {
                return Err(BuildError::InvertedRange { from, to });
            }
        }
        let width = u16::from(self.position.effective_width());
        if width == 0 || width > 64 {
            return Err(BuildError::WidthTooWide { width });
        }
        Ok(BitField {
            name: self.name,
            position: self.position,
            encoding: self.encoding,
            scale: self.scale,
            min: self.min,
            max: self.max,
            units: self.units,
            enumeration: self.enumeration,
            repeat: self.repeat,
            code: self.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_width_for_range_and_bit() {
        assert_eq!(Position::Range { from: 16, to: 9 }.effective_width(), 8);
        assert_eq!(Position::Bit { bit: 3, fx: false }.effective_width(), 1);
    }

    #[test]
    fn inverted_range_rejected() {
        let err = BitField::builder("bad", Position::Range { from: 4, to: 9 })
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::InvertedRange { from: 4, to: 9 });
    }

    #[test]
    fn low_bit_field_builds_fine_outside_a_variable_slab() {
        // A BitField has no notion of the item containing it; the FX
        // reservation on a slab's low bit is only meaningful for Variable
        // items and is enforced there, not here.
        let field = BitField::builder("g", Position::Bit { bit: 1, fx: false })
            .build()
            .unwrap();
        assert!(!field.position().is_fx());
    }

    #[test]
    fn fx_bit_itself_is_allowed() {
        let field = BitField::builder("fx", Position::Bit { bit: 1, fx: true })
            .build()
            .unwrap();
        assert!(field.position().is_fx());
    }

    #[test]
    fn reserved_names_are_flagged() {
        let spare = BitField::builder("spare", Position::Bit { bit: 3, fx: false })
            .build()
            .unwrap();
        assert!(spare.is_reserved_name());
    }
}
