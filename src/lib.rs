//! Decoder for EUROCONTROL ASTERIX binary surveillance messages.
//!
//! An ASTERIX datablock is a category byte, a 16-bit total length, and one
//! or more records; each record opens with an FX-chained presence bitmap
//! (FSPEC) selecting items out of that category's User Application Profile
//! (UAP). Items come in five shapes (`Fixed`, `Variable`, `Repetitive`,
//! `Explicit`, `Compound`), each built from one or more byte-aligned
//! [`item::Slab`]s of named [`bitfield::BitField`]s.
//!
//! A [`codec::CategoryCodec`] is the declarative, read-only description of
//! one category's UAP; [`decoder::decode`] drives it over raw bytes and
//! delivers every extracted value to a [`sink::ValueSink`] the caller
//! supplies.
//!
//! ```
//! use asterix_codec::bitfield::{BitField, Position};
//! use asterix_codec::codec::CategoryCodec;
//! use asterix_codec::item::{ItemDescriptor, Slab};
//! use asterix_codec::policy::CodecPolicy;
//! use asterix_codec::sink::CollectingSink;
//!
//! let sac = BitField::builder("sac", Position::Range { from: 16, to: 9 }).build().unwrap();
//! let sic = BitField::builder("sic", Position::Range { from: 8, to: 1 }).build().unwrap();
//! let item010 = ItemDescriptor::Fixed(Slab::new(2, vec![sac, sic]));
//!
//! let codec = CategoryCodec::builder(48).slot(0, item010, true).build();
//!
//! // FSPEC byte with bit 0 set, then the two-byte SAC/SIC slab.
//! let record = [0b1000_0000u8, 0x0A, 0x0B];
//! let mut sink = CollectingSink::new();
//! asterix_codec::decoder::decode_record(&codec, &record, &mut sink, CodecPolicy::default()).unwrap();
//! assert_eq!(sink.into_records().len(), 1);
//! ```

/// Leaf-level bit and byte arithmetic: FX scanning, the 192-bit extraction
/// window, sign extension, and the six-bit character alphabet.
pub mod bits;

/// Declarative description of one named bitfield inside a slab.
pub mod bitfield;

/// The five recursive item-descriptor shapes a UAP slot can take.
pub mod item;

/// The per-category codec model: UAP slots keyed by FSPEC bit index.
pub mod codec;

/// Decoder configuration.
pub mod policy;

/// The value-sink contract a caller implements to consume decoded fields.
pub mod sink;

/// Drives a codec over raw bytes and reports decode failures.
pub mod decoder;

pub use self::bitfield::BitField;
pub use self::codec::CategoryCodec;
pub use self::decoder::{decode, decode_record, Error};
pub use self::item::ItemDescriptor;
pub use self::policy::CodecPolicy;
pub use self::sink::{CollectingSink, Context, ValueSink};
