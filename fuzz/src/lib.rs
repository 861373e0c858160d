use std::sync::OnceLock;

use bytes::Bytes;
use dc_packer::{
    ArrayParameter, ArraySize, ClassParameter, Field, FieldRef, PackData, SimpleParameter,
    SubatomicType, SwitchCase, SwitchParameter,
};

fn simple(name: &str, kind: SubatomicType) -> FieldRef {
    Field::new(name, SimpleParameter::new(kind)).into_ref()
}

fn schema() -> &'static Field {
    static SCHEMA: OnceLock<Field> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Field::new(
            "record",
            ClassParameter::new(vec![
                simple("id", SubatomicType::UInt32),
                simple("name", SubatomicType::String),
                Field::new(
                    "scores",
                    ArrayParameter::new(simple("", SubatomicType::Int16), ArraySize::any()),
                )
                .into_ref(),
                Field::new(
                    "tag",
                    ArrayParameter::new(simple("", SubatomicType::UInt8), ArraySize::fixed(3)),
                )
                .into_ref(),
                Field::new(
                    "body",
                    SwitchParameter::new(simple("kind", SubatomicType::UInt8))
                        .with_case(SwitchCase::new(vec![1], vec![simple(
                            "a",
                            SubatomicType::UInt64,
                        )]))
                        .with_case(
                            SwitchCase::new(vec![2], vec![simple("b", SubatomicType::Blob)])
                                .with_value(vec![3]),
                        ),
                )
                .into_ref(),
            ]),
        )
    })
}

/// Live catalog offsets must stay inside the buffer.
pub fn test_live_catalog(data: &[u8]) {
    let root = schema();
    if let Ok(live) = root.get_catalog().get_live_catalog(data) {
        for entry in live.live_entries() {
            assert!(entry.begin <= entry.end);
            assert!(entry.end <= data.len());
        }
    }
}

/// A record that decodes cleanly must pack back to the same bytes.
pub fn test_round_trip(data: &[u8]) {
    let root = schema();
    let mut p = 0;
    let unpacked = root.unpack_value(data, &mut p);
    if unpacked.flags.pack_error {
        assert_eq!(p, 0);
        return;
    }
    let mut packed = PackData::new();
    let flags = root.pack_value(&mut packed, &unpacked.value);
    if unpacked.flags.is_ok() {
        assert!(flags.is_ok());
        let packed: Bytes = packed.freeze();
        assert_eq!(&packed[..], &data[..p]);
    }
}

pub fn test(data: &[u8]) {
    test_live_catalog(data);
    test_round_trip(data);
}
