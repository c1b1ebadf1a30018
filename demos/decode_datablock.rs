//! Decodes a hand-built category 48 datablock and prints what the sink saw.

use asterix_codec::bitfield::{BitField, Position};
use asterix_codec::codec::CategoryCodec;
use asterix_codec::item::{ItemDescriptor, Slab};
use asterix_codec::policy::CodecPolicy;
use asterix_codec::{decode, CollectingSink};

fn sample_codec() -> CategoryCodec {
    let sac = BitField::builder("sac", Position::Range { from: 16, to: 9 })
        .build()
        .expect("sac");
    let sic = BitField::builder("sic", Position::Range { from: 8, to: 1 })
        .build()
        .expect("sic");
    let i010 = ItemDescriptor::Fixed(Slab::new(2, vec![sac, sic]));
    CategoryCodec::builder(48).slot(0, i010, true).build()
}

fn main() {
    let codec = sample_codec();
    let datablock = [48u8, 0x00, 0x06, 0b1000_0000, 0x0A, 0x0B];

    let mut sink = CollectingSink::new();
    let policy = CodecPolicy {
        verbose: true,
        ..CodecPolicy::default()
    };
    match decode(&codec, &datablock, &mut sink, policy) {
        Ok(consumed) => {
            println!("decoded {consumed} bytes");
            for record in sink.into_records() {
                println!("category {}:", record.category);
                for (name, value) in record.fields {
                    println!("  {name} = {value:?}");
                }
            }
        }
        Err(err) => eprintln!("decode failed: {err}"),
    }
}
