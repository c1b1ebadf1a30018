//! The value sink (visitor) contract, and a reference `CollectingSink`
//! implementation in the style of the teacher crate's `CollectingVisitor`.

use crate::bitfield::{BitField, Encoding};
use crate::bits::{decode_six_bit_char, sign_extend};
use crate::item::ItemDescriptor;
use crate::policy::CodecPolicy;

/// Everything a sink needs to interpret one extracted bitfield without
/// re-walking the descriptor tree itself.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    /// The UAP item currently being decoded.
    pub item: &'a ItemDescriptor,
    /// The specific bitfield this `decode` call carries a value for.
    pub bitfield: &'a BitField,
    /// Recursion depth (Compound/Repetitive nesting), capped at 8.
    pub depth: u8,
    /// The policy in effect for this decode call.
    pub policy: CodecPolicy,
}

/// One extracted value, classified by the typed-convenience layer described
/// in the decoder's component design.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// A single-bit field (not FX, not spare).
    Boolean(bool),
    /// A `Signed`-encoded field.
    Signed(i64),
    /// An `Unsigned`/`Octal`/`Hex`/`OctalDigits`/`Raw`-encoded field.
    Unsigned(u64),
    /// A field whose `scale != 1.0`.
    Real(f64),
    /// An `Ascii`/`SixBitsChar`-encoded field.
    Text(String),
}

/// Classify a raw extracted value per the field's encoding and scale,
/// returning `None` if the field is structural (`fx`, `spare`, `unused`)
/// and carries no value for the caller.
///
/// This is the typed-convenience layer: a `decode` implementation calls it
/// instead of re-deriving the same routing from `ctx.bitfield` itself.
#[must_use]
pub fn classify(ctx: &Context<'_>, raw: u64) -> Option<TypedValue> {
    let field = ctx.bitfield;
    if field.is_reserved_name() || field.position().is_fx() {
        return None;
    }
    let width = field.effective_width();
    if width == 1 {
        return Some(TypedValue::Boolean(raw & 1 != 0));
    }
    if field.scale() != 1.0 {
        let signed = sign_extend(raw, width);
        return Some(TypedValue::Real(signed as f64 * field.scale()));
    }
    Some(match field.encoding() {
        Encoding::Signed => TypedValue::Signed(sign_extend(raw, width)),
        Encoding::Unsigned | Encoding::Octal | Encoding::Hex | Encoding::OctalDigits | Encoding::Raw => {
            TypedValue::Unsigned(raw)
        }
        Encoding::Ascii => TypedValue::Text(decode_ascii(raw, width)),
        Encoding::SixBitsChar => TypedValue::Text(decode_six_bit_string(raw, width)),
    })
}

fn decode_ascii(raw: u64, width: u8) -> String {
    let bytes = (width / 8) as usize;
    (0..bytes)
        .rev()
        .map(|i| ((raw >> (i * 8)) & 0xFF) as u8 as char)
        .collect()
}

fn decode_six_bit_string(raw: u64, width: u8) -> String {
    let chars = (width / 6) as usize;
    (0..chars)
        .rev()
        .map(|i| decode_six_bit_char(((raw >> (i * 6)) & 0x3F) as u8))
        .collect()
}

/// The decoder drives a sink with these operations; all are infallible from
/// the decoder's perspective (a sink may record errors out-of-band, e.g. in
/// a field the caller inspects afterward).
///
/// Every bracketing method has a no-op default; only [`ValueSink::decode`]
/// must be implemented, and even it has a default that routes through
/// [`classify`] into the `on_*` typed callbacks, also all defaulted to
/// no-ops, so a minimal sink need only override the typed callbacks it
/// cares about.
pub trait ValueSink {
    /// Bracket the start of one record.
    fn begin(&mut self, _category: u8) {}
    /// Bracket the end of one record.
    fn end(&mut self) {}
    /// Fires when a present UAP slot starts decoding.
    fn begin_item(&mut self, _item: &ItemDescriptor) {}
    /// Bracket a Repetitive/Explicit expansion.
    fn begin_repetitive(&mut self, _count: u32) {}
    /// Fires once per element of a Repetitive/Explicit expansion.
    fn repetitive_item(&mut self, _index: u32) {}
    /// Closes a Repetitive/Explicit expansion.
    fn end_repetitive(&mut self) {}
    /// Fires exactly once, when `index == 0` of a repetitive expansion
    /// enters a field with `repeat = true`, so a sink may preallocate.
    fn begin_array(&mut self, _code: u16, _size: u32) {}

    /// Delivers one extracted bitfield; `index = -1` for scalar context,
    /// else the array index. The default classifies the raw value and
    /// dispatches to the typed `on_*` methods.
    fn decode(&mut self, ctx: &Context<'_>, raw: u64, index: i32) {
        match classify(ctx, raw) {
            Some(TypedValue::Boolean(v)) => self.on_boolean(ctx, v, index),
            Some(TypedValue::Signed(v)) => self.on_signed(ctx, v, index),
            Some(TypedValue::Unsigned(v)) => self.on_unsigned(ctx, v, index),
            Some(TypedValue::Real(v)) => self.on_real(ctx, v, index),
            Some(TypedValue::Text(v)) => self.on_string(ctx, v, index),
            None => {}
        }
    }

    /// Typed callback for a boolean (single-bit, non-FX) field.
    fn on_boolean(&mut self, _ctx: &Context<'_>, _value: bool, _index: i32) {}
    /// Typed callback for a `Signed`-encoded field.
    fn on_signed(&mut self, _ctx: &Context<'_>, _value: i64, _index: i32) {}
    /// Typed callback for an `Unsigned`/`Octal`/`Hex`/`OctalDigits`/`Raw` field.
    fn on_unsigned(&mut self, _ctx: &Context<'_>, _value: u64, _index: i32) {}
    /// Typed callback for a scaled (`scale != 1.0`) field.
    fn on_real(&mut self, _ctx: &Context<'_>, _value: f64, _index: i32) {}
    /// Typed callback for an `Ascii`/`SixBitsChar` field.
    fn on_string(&mut self, _ctx: &Context<'_>, _value: String, _index: i32) {}
}

/// One decoded record, as collected by [`CollectingSink`].
#[derive(Debug, Clone, Default)]
pub struct CollectedRecord {
    /// ASTERIX category this record belongs to.
    pub category: u8,
    /// Scalar fields, in decode order.
    pub fields: Vec<(String, TypedValue)>,
    /// Array-shaped (repeated) fields, in decode order.
    pub arrays: Vec<(String, Vec<TypedValue>)>,
}

#[derive(Debug, Default)]
struct PendingArray {
    name: Option<String>,
    values: Vec<TypedValue>,
}

/// A basic sink that collects every record's fields and arrays in decode
/// order, named by their canonical field name.
///
/// Modeled directly on the teacher crate's `CollectingVisitor`: a simple,
/// allocation-happy reference implementation meant for tests and the
/// `demos/` binary, not for the hot path.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Vec<CollectedRecord>,
    current: Option<CollectedRecord>,
    pending_array: Option<PendingArray>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the sink, returning every record collected so far.
    #[must_use]
    pub fn into_records(self) -> Vec<CollectedRecord> {
        self.records
    }
}

impl ValueSink for CollectingSink {
    fn begin(&mut self, category: u8) {
        self.current = Some(CollectedRecord {
            category,
            ..Default::default()
        });
    }

    fn end(&mut self) {
        if let Some(record) = self.current.take() {
            self.records.push(record);
        }
    }

    fn begin_array(&mut self, _code: u16, size: u32) {
        self.pending_array = Some(PendingArray {
            name: None,
            values: Vec::with_capacity(size as usize),
        });
    }

    fn end_repetitive(&mut self) {
        if let Some(pending) = self.pending_array.take() {
            if let Some(record) = &mut self.current {
                record
                    .arrays
                    .push((pending.name.unwrap_or_default(), pending.values));
            }
        }
    }

    fn decode(&mut self, ctx: &Context<'_>, raw: u64, index: i32) {
        let Some(value) = classify(ctx, raw) else {
            return;
        };
        if index >= 0 {
            if let Some(pending) = &mut self.pending_array {
                if pending.name.is_none() {
                    pending.name = Some(ctx.bitfield.name().to_string());
                }
                pending.values.push(value);
                return;
            }
        }
        if let Some(record) = &mut self.current {
            record.fields.push((ctx.bitfield.name().to_string(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitfield::{BitField, Position, Units};
    use crate::item::Slab;

    fn ctx_for<'a>(item: &'a ItemDescriptor, field: &'a BitField) -> Context<'a> {
        Context {
            item,
            bitfield: field,
            depth: 0,
            policy: CodecPolicy::default(),
        }
    }

    #[test]
    fn classify_suppresses_reserved_names() {
        let spare = BitField::builder("spare", Position::Bit { bit: 3, fx: false })
            .build()
            .unwrap();
        let item = ItemDescriptor::Fixed(Slab::opaque(1));
        let ctx = ctx_for(&item, &spare);
        assert_eq!(classify(&ctx, 1), None);
    }

    #[test]
    fn classify_boolean_for_single_bit() {
        let field = BitField::builder("valid", Position::Bit { bit: 3, fx: false })
            .build()
            .unwrap();
        let item = ItemDescriptor::Fixed(Slab::opaque(1));
        let ctx = ctx_for(&item, &field);
        assert_eq!(classify(&ctx, 1), Some(TypedValue::Boolean(true)));
        assert_eq!(classify(&ctx, 0), Some(TypedValue::Boolean(false)));
    }

    #[test]
    fn classify_real_applies_scale_and_sign_extension() {
        let field = BitField::builder("altitude", Position::Range { from: 16, to: 1 })
            .scale(0.25)
            .units(Units::Ft)
            .build()
            .unwrap();
        let item = ItemDescriptor::Fixed(Slab::opaque(2));
        let ctx = ctx_for(&item, &field);
        assert_eq!(classify(&ctx, 4), Some(TypedValue::Real(1.0)));
    }

    #[test]
    fn classify_six_bit_string() {
        let field = BitField::builder("callsign", Position::Range { from: 12, to: 1 })
            .encoding(Encoding::SixBitsChar)
            .build()
            .unwrap();
        let item = ItemDescriptor::Fixed(Slab::opaque(2));
        let ctx = ctx_for(&item, &field);
        // 'A' = 1, 'B' = 2 packed as two 6-bit groups: 0b000001_000010
        let raw = (1u64 << 6) | 2;
        assert_eq!(classify(&ctx, raw), Some(TypedValue::Text("AB".to_string())));
    }

    #[test]
    fn collecting_sink_brackets_a_record() {
        let field = BitField::builder("sic", Position::Range { from: 8, to: 1 })
            .build()
            .unwrap();
        let item = ItemDescriptor::Fixed(Slab::opaque(1));
        let ctx = ctx_for(&item, &field);

        let mut sink = CollectingSink::new();
        sink.begin(48);
        sink.decode(&ctx, 11, -1);
        sink.end();

        let records = sink.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, 48);
        assert_eq!(
            records[0].fields,
            vec![("sic".to_string(), TypedValue::Unsigned(11))]
        );
    }
}
