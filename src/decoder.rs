//! Drives a [`CategoryCodec`] over raw wire bytes, delivering every
//! extracted bitfield to a [`ValueSink`].

use std::{error, fmt};

use crate::bits;
use crate::codec::CategoryCodec;
use crate::item::{ItemDescriptor, Slab};
use crate::policy::CodecPolicy;
use crate::sink::{Context, ValueSink};

/// Maximum Compound/Repetitive nesting depth a single item may reach before
/// decoding is aborted. No real category nests this deep; it exists to
/// bound recursion against a hostile or malformed buffer.
const MAX_DEPTH: u8 = 8;

/// Largest datablock [`decode`] will accept, matching the 16-bit length
/// field's own ceiling.
pub const MAX_PACKET_SIZE: usize = u16::MAX as usize;

/// Failures raised while decoding wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Fewer bytes remained than the smallest valid datablock or record, or
    /// a slab ran past the end of the available buffer mid-item.
    TooShort,
    /// The declared datablock length is internally inconsistent with the
    /// buffer it came from.
    BadLength,
    /// The datablock's category byte did not match the codec it was handed
    /// to.
    CategoryMismatch {
        /// Category the codec was built for.
        expected: u8,
        /// Category byte actually found in the buffer.
        found: u8,
    },
    /// The FSPEC or a Compound primary map failed to scan.
    BadFspec(bits::Error),
    /// An FSPEC bit was set for a UAP slot the codec never declared.
    UndefinedUapBit {
        /// 0-based FSPEC bit index, skipping FX positions.
        bit: u8,
    },
    /// An item reported zero (or, were it possible, negative) bytes
    /// consumed.
    Underflow,
    /// Cumulative record consumption exceeded the datablock's declared
    /// length.
    Overflow,
    /// A Compound subitem was itself `Explicit` or `Compound`, which the
    /// format does not allow.
    BadCompoundChild,
    /// An Explicit item's declared length was zero, exceeded the buffer, or
    /// did not divide evenly into whole copies of its slab sequence.
    BadExplicitLength,
    /// A mandatory UAP slot's FSPEC bit was clear and
    /// [`CodecPolicy::fail_on_missing_mandatory`] is set.
    MissingMandatory {
        /// 0-based FSPEC bit index of the missing slot.
        bit: u8,
    },
    /// An internal dispatch reached an item format with no handler (defends
    /// against future `ItemDescriptor` variants, not reachable today).
    UnknownItemFormat,
    /// Compound/Repetitive nesting exceeded [`MAX_DEPTH`].
    DepthExceeded,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "buffer shorter than the smallest valid record"),
            Self::BadLength => write!(f, "declared datablock length is inconsistent with the buffer"),
            Self::CategoryMismatch { expected, found } => {
                write!(f, "expected category {expected}, found {found}")
            }
            Self::BadFspec(err) => write!(f, "malformed presence bitmap: {err}"),
            Self::UndefinedUapBit { bit } => write!(f, "FSPEC bit {bit} has no declared UAP slot"),
            Self::Underflow => write!(f, "item consumed zero bytes"),
            Self::Overflow => write!(f, "record consumption exceeded the declared datablock length"),
            Self::BadCompoundChild => write!(f, "Compound subitem must be Fixed, Variable, or Repetitive"),
            Self::BadExplicitLength => write!(f, "Explicit item length is zero, truncated, or misaligned"),
            Self::MissingMandatory { bit } => write!(f, "mandatory UAP slot at bit {bit} was absent"),
            Self::UnknownItemFormat => write!(f, "unrecognised item format"),
            Self::DepthExceeded => write!(f, "item nesting exceeded {MAX_DEPTH} levels"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::BadFspec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<bits::Error> for Error {
    fn from(err: bits::Error) -> Self {
        Self::BadFspec(err)
    }
}

/// Decode one full ASTERIX datablock: a 1-byte category, a 2-byte
/// big-endian total length (including this header), and one or more
/// concatenated records filling exactly that length.
///
/// Returns the number of bytes consumed, which on success always equals
/// the declared length.
pub fn decode(
    codec: &CategoryCodec,
    buf: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
) -> Result<usize, Error> {
    if buf.len() < 6 {
        return Err(Error::TooShort);
    }
    let category = buf[0];
    if category != codec.category() {
        return Err(Error::CategoryMismatch {
            expected: codec.category(),
            found: category,
        });
    }
    let declared_len = usize::from(u16::from_be_bytes([buf[1], buf[2]]));
    if declared_len < 4 || declared_len > MAX_PACKET_SIZE || declared_len > buf.len() {
        return Err(Error::BadLength);
    }
    if policy.verbose {
        log::trace!("datablock category={category} length={declared_len}");
    }
    let mut offset = 3;
    while offset < declared_len {
        // Hand the record the true remainder of the buffer, not the slice
        // clamped to `declared_len`: a record's own bounds checks run
        // against the bytes actually present, and over-consumption relative
        // to the announced length is caught below as `Overflow`, rather
        // than being masked as a truncation error.
        let consumed = decode_record(codec, &buf[offset..], sink, policy)?;
        if consumed == 0 {
            return Err(Error::Underflow);
        }
        offset += consumed;
        if offset > declared_len {
            return Err(Error::Overflow);
        }
    }
    Ok(offset)
}

/// Decode exactly one record: an FX-chained FSPEC followed by the items it
/// selects, with no datablock header. Returns the number of bytes the
/// record consumed.
pub fn decode_record(
    codec: &CategoryCodec,
    buf: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
) -> Result<usize, Error> {
    let fspec_len = bits::fx_scan(buf)?;
    let fspec = &buf[..fspec_len];
    if fspec[0] == 0 {
        return Err(Error::BadFspec(bits::Error::ZeroBitmap));
    }
    let mut offset = fspec_len;

    sink.begin(codec.category());
    for (byte_pos, &byte) in fspec.iter().enumerate() {
        for shift in (1..=7u8).rev() {
            let local = 7 - shift;
            let bit_index = (byte_pos as u8) * 8 + local;
            if byte & (1 << shift) == 0 {
                continue;
            }
            let slot = codec
                .uap_items()
                .get(&bit_index)
                .ok_or(Error::UndefinedUapBit { bit: bit_index })?;
            sink.begin_item(slot.item());
            if policy.verbose {
                log::trace!("record bit={bit_index} kind={}", slot.item().kind_name());
            }
            let consumed = decode_item(slot.item(), &buf[offset..], sink, policy, 0)?;
            offset += consumed;
        }
    }
    if policy.fail_on_missing_mandatory {
        for (&bit, slot) in codec.uap_items() {
            if slot.mandatory() && !fspec_bit_set(fspec, bit) {
                return Err(Error::MissingMandatory { bit });
            }
        }
    }
    sink.end();
    Ok(offset)
}

fn fspec_bit_set(fspec: &[u8], bit_index: u8) -> bool {
    let byte_index = usize::from(bit_index / 8);
    let Some(&byte) = fspec.get(byte_index) else {
        return false;
    };
    let shift = 7 - (bit_index % 8);
    byte & (1 << shift) != 0
}

fn decode_item(
    item: &ItemDescriptor,
    buf: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
    depth: u8,
) -> Result<usize, Error> {
    if depth >= MAX_DEPTH {
        return Err(Error::DepthExceeded);
    }
    match item {
        ItemDescriptor::Fixed(slab) => decode_fixed(item, slab, buf, sink, policy, depth),
        ItemDescriptor::Variable(slabs) => decode_variable(item, slabs, buf, sink, policy, depth),
        ItemDescriptor::Repetitive(slabs) => decode_repetitive(item, slabs, buf, sink, policy, depth),
        ItemDescriptor::Explicit(slabs) => decode_explicit(item, slabs, buf, sink, policy, depth),
        ItemDescriptor::Compound(subitems) => decode_compound(item, subitems, buf, sink, policy, depth),
    }
}

fn decode_slab_fields(
    item: &ItemDescriptor,
    slab: &Slab,
    window: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
    depth: u8,
    index: i32,
) -> Result<(), Error> {
    if window.len() < usize::from(slab.length()) {
        return Err(Error::TooShort);
    }
    let (d0, d1, d2) = bits::compose_words(&window[..usize::from(slab.length())]);
    for field in slab.fields() {
        let raw = bits::extract_bits(d0, d1, d2, field.position().low_bit(), field.effective_width());
        let ctx = Context {
            item,
            bitfield: field,
            depth,
            policy,
        };
        sink.decode(&ctx, raw, index);
    }
    Ok(())
}

fn decode_fixed(
    item: &ItemDescriptor,
    slab: &Slab,
    buf: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
    depth: u8,
) -> Result<usize, Error> {
    decode_slab_fields(item, slab, buf, sink, policy, depth, -1)?;
    Ok(usize::from(slab.length()))
}

fn decode_variable(
    item: &ItemDescriptor,
    slabs: &[Slab],
    buf: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
    depth: u8,
) -> Result<usize, Error> {
    let mut offset = 0;
    let mut slab_index = 0;
    loop {
        let slab = &slabs[slab_index % slabs.len()];
        let len = usize::from(slab.length());
        if buf.len() < offset + len {
            return Err(Error::TooShort);
        }
        decode_slab_fields(item, slab, &buf[offset..], sink, policy, depth, -1)?;
        let continues = buf[offset + len - 1] & 0x01 != 0;
        offset += len;
        slab_index += 1;
        if !continues {
            break;
        }
    }
    Ok(offset)
}

fn decode_repetitive(
    item: &ItemDescriptor,
    slabs: &[Slab],
    buf: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
    depth: u8,
) -> Result<usize, Error> {
    let &count = buf.first().ok_or(Error::TooShort)?;
    let mut offset = 1;
    sink.begin_repetitive(u32::from(count));
    for rep in 0..count {
        sink.repetitive_item(u32::from(rep));
        for slab in slabs {
            let len = usize::from(slab.length());
            if buf.len() < offset + len {
                return Err(Error::TooShort);
            }
            if rep == 0 {
                for field in slab.fields().iter().filter(|f| f.repeat()) {
                    sink.begin_array(field.code(), u32::from(count));
                }
            }
            decode_slab_fields(item, slab, &buf[offset..], sink, policy, depth, i32::from(rep))?;
            offset += len;
        }
    }
    sink.end_repetitive();
    Ok(offset)
}

fn decode_explicit(
    item: &ItemDescriptor,
    slabs: &[Slab],
    buf: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
    depth: u8,
) -> Result<usize, Error> {
    let &total_len = buf.first().ok_or(Error::TooShort)?;
    let total_len = usize::from(total_len);
    if total_len < 1 || buf.len() < total_len {
        return Err(Error::BadExplicitLength);
    }
    let payload = &buf[1..total_len];
    let slab_total: usize = slabs.iter().map(|s| usize::from(s.length())).sum();
    if slab_total == 0 || payload.len() % slab_total != 0 {
        return Err(Error::BadExplicitLength);
    }
    let count = payload.len() / slab_total;
    sink.begin_repetitive(count as u32);
    let mut offset = 0;
    for rep in 0..count {
        sink.repetitive_item(rep as u32);
        for slab in slabs {
            let len = usize::from(slab.length());
            if rep == 0 {
                for field in slab.fields().iter().filter(|f| f.repeat()) {
                    sink.begin_array(field.code(), count as u32);
                }
            }
            decode_slab_fields(item, slab, &payload[offset..], sink, policy, depth, rep as i32)?;
            offset += len;
        }
    }
    sink.end_repetitive();
    Ok(total_len)
}

fn decode_compound(
    item: &ItemDescriptor,
    subitems: &[ItemDescriptor],
    buf: &[u8],
    sink: &mut dyn ValueSink,
    policy: CodecPolicy,
    depth: u8,
) -> Result<usize, Error> {
    let map_len = bits::fx_scan(buf)?;
    let primary = &buf[..map_len];
    let mut offset = map_len;
    for (global_index, subitem) in subitems[1..].iter().enumerate() {
        let byte_index = global_index / 7;
        let Some(&byte) = primary.get(byte_index) else {
            continue;
        };
        let shift = 7 - (global_index % 7) as u8;
        if byte & (1 << shift) == 0 {
            continue;
        }
        let consumed = match subitem {
            ItemDescriptor::Fixed(slab) => decode_fixed(item, slab, &buf[offset..], sink, policy, depth + 1)?,
            ItemDescriptor::Variable(slabs) => {
                decode_variable(item, slabs, &buf[offset..], sink, policy, depth + 1)?
            }
            ItemDescriptor::Repetitive(slabs) => {
                decode_repetitive(item, slabs, &buf[offset..], sink, policy, depth + 1)?
            }
            ItemDescriptor::Explicit(_) | ItemDescriptor::Compound(_) => {
                return Err(Error::BadCompoundChild);
            }
        };
        offset += consumed;
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitfield::{BitField, Position};
    use crate::codec::CategoryCodec;
    use crate::sink::CollectingSink;

    fn sac_sic_item() -> ItemDescriptor {
        let sac = BitField::builder("sac", Position::Range { from: 16, to: 9 })
            .build()
            .unwrap();
        let sic = BitField::builder("sic", Position::Range { from: 8, to: 1 })
            .build()
            .unwrap();
        ItemDescriptor::Fixed(Slab::new(2, vec![sac, sic]))
    }

    #[test]
    fn decode_record_dispatches_one_fixed_item() {
        let codec = CategoryCodec::builder(48).slot(0, sac_sic_item(), true).build();
        let mut sink = CollectingSink::new();
        // FSPEC: one byte, bit 0 set (item present), FX clear.
        let buf = [0b1000_0000, 0x0A, 0x0B];
        let consumed = decode_record(&codec, &buf, &mut sink, CodecPolicy::default()).unwrap();
        assert_eq!(consumed, 3);
        let records = sink.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields.len(), 2);
    }

    #[test]
    fn decode_record_rejects_undefined_uap_bit() {
        let codec = CategoryCodec::builder(48).slot(0, sac_sic_item(), true).build();
        let mut sink = CollectingSink::new();
        // bit 1 set, but only bit 0 is declared.
        let buf = [0b0100_0000, 0x0A, 0x0B];
        let err = decode_record(&codec, &buf, &mut sink, CodecPolicy::default()).unwrap_err();
        assert_eq!(err, Error::UndefinedUapBit { bit: 1 });
    }

    #[test]
    fn decode_full_datablock_consumes_declared_length() {
        let codec = CategoryCodec::builder(48).slot(0, sac_sic_item(), true).build();
        let mut sink = CollectingSink::new();
        let buf = [48, 0x00, 0x06, 0b1000_0000, 0x0A, 0x0B];
        let consumed = decode(&codec, &buf, &mut sink, CodecPolicy::default()).unwrap();
        assert_eq!(consumed, 6);
        assert_eq!(sink.into_records().len(), 1);
    }

    #[test]
    fn decode_rejects_category_mismatch() {
        let codec = CategoryCodec::builder(48).slot(0, sac_sic_item(), true).build();
        let mut sink = CollectingSink::new();
        let buf = [1, 0x00, 0x06, 0b1000_0000, 0x0A, 0x0B];
        let err = decode(&codec, &buf, &mut sink, CodecPolicy::default()).unwrap_err();
        assert_eq!(
            err,
            Error::CategoryMismatch {
                expected: 48,
                found: 1
            }
        );
    }

    #[test]
    fn decode_record_enforces_missing_mandatory_when_policy_opts_in() {
        let codec = CategoryCodec::builder(48).slot(0, sac_sic_item(), true).build();
        let mut sink = CollectingSink::new();
        // FX continues once, no presence bits set anywhere: slot 0 is absent.
        let buf = [0x01, 0x00];
        let policy = crate::policy::policy_with(|p| p.fail_on_missing_mandatory = true);
        let err = decode_record(&codec, &buf, &mut sink, policy).unwrap_err();
        assert_eq!(err, Error::MissingMandatory { bit: 0 });
    }

    #[test]
    fn decode_record_rejects_all_zero_fspec() {
        let codec = CategoryCodec::builder(48).slot(0, sac_sic_item(), true).build();
        let mut sink = CollectingSink::new();
        let buf = [0x00, 0x0A, 0x0B];
        let err = decode_record(&codec, &buf, &mut sink, CodecPolicy::default()).unwrap_err();
        assert_eq!(err, Error::BadFspec(bits::Error::ZeroBitmap));
    }

    #[test]
    fn decode_rejects_overflow_when_a_record_over_consumes_the_declared_length() {
        let codec = CategoryCodec::builder(48).slot(0, sac_sic_item(), true).build();
        let mut sink = CollectingSink::new();
        // Declares only 5 bytes but the buffer actually holds a full
        // 3-byte record (1-byte FSPEC + 2-byte Fixed item): the record
        // decodes to completion against the real bytes, and only then is
        // its consumption checked against the declared length.
        let buf = [48, 0x00, 0x05, 0b1000_0000, 0x0A, 0x0B];
        let err = decode(&codec, &buf, &mut sink, CodecPolicy::default()).unwrap_err();
        assert_eq!(err, Error::Overflow);
    }
}
