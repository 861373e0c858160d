//! Tests for packing whole value trees

use dc_packer::*;

fn simple(name: &str, kind: SubatomicType) -> FieldRef {
    Field::new(name, SimpleParameter::new(kind)).into_ref()
}

fn round_trip(field: &Field, value: &PackValue) -> (Vec<u8>, PackValue) {
    let mut data = PackData::new();
    let flags = field.pack_value(&mut data, value);
    assert!(flags.is_ok(), "pack flags: {flags:?}");
    let bytes = data.into_vec();

    let mut p = 0;
    let unpacked = field.unpack_value(&bytes, &mut p);
    assert!(unpacked.flags.is_ok(), "unpack flags: {:?}", unpacked.flags);
    assert_eq!(p, bytes.len());
    (bytes, unpacked.value)
}

fn avatar() -> Field {
    Field::new(
        "avatar",
        ClassParameter::new(vec![
            simple("id", SubatomicType::UInt32),
            simple("name", SubatomicType::String),
            Field::new(
                "pos",
                ClassParameter::new(vec![
                    simple("x", SubatomicType::Int16),
                    simple("y", SubatomicType::Int16),
                ]),
            )
            .into_ref(),
            Field::new(
                "inventory",
                ArrayParameter::new(simple("", SubatomicType::UInt16), ArraySize::any()),
            )
            .into_ref(),
        ]),
    )
}

fn shape() -> Field {
    let kind = simple("kind", SubatomicType::UInt8);
    Field::new(
        "shape",
        SwitchParameter::new(kind)
            .with_case(SwitchCase::new(vec![1], vec![simple("radius", SubatomicType::UInt16)]))
            .with_case(
                SwitchCase::new(vec![2], vec![
                    simple("w", SubatomicType::UInt8),
                    simple("h", SubatomicType::UInt8),
                ])
                .with_value(vec![3]),
            )
            .with_default_case(vec![simple("label", SubatomicType::String)]),
    )
}

#[test]
fn test_class_round_trip() {
    let value = PackValue::List(vec![
        7u32.into(),
        "ann".into(),
        PackValue::List(vec![(-3i16).into(), 4i16.into()]),
        PackValue::List(vec![10u16.into(), 20u16.into()]),
    ]);
    let (bytes, unpacked) = round_trip(&avatar(), &value);
    assert_eq!(
        bytes,
        [7, 0, 0, 0, 3, 0, b'a', b'n', b'n', 0xFD, 0xFF, 4, 0, 4, 0, 10, 0, 20, 0]
    );
    assert_eq!(
        unpacked,
        PackValue::List(vec![
            PackValue::UInt(7),
            PackValue::String("ann".to_owned()),
            PackValue::List(vec![PackValue::Int(-3), PackValue::Int(4)]),
            PackValue::List(vec![PackValue::UInt(10), PackValue::UInt(20)]),
        ])
    );
}

#[test]
fn test_member_count_mismatch() {
    let mut data = PackData::new();
    let flags = avatar().pack_value(&mut data, &PackValue::List(vec![1u32.into()]));
    assert!(flags.pack_error);
    assert!(data.is_empty());

    let flags = avatar().pack_value(&mut data, &PackValue::Int(1));
    assert!(flags.pack_error);
}

#[test]
fn test_array_count_out_of_range() {
    let field = Field::new(
        "pair",
        ArrayParameter::new(simple("", SubatomicType::UInt8), ArraySize::range(2, 2)),
    );
    // A fixed count of fixed-size elements has no length tag.
    let mut data = PackData::new();
    let flags = field.pack_value(&mut data, &PackValue::List(vec![1u8.into()]));
    assert!(flags.pack_error);
    assert!(data.is_empty());

    let field = Field::new(
        "few",
        ArrayParameter::new(simple("", SubatomicType::UInt8), ArraySize::range(0, 2)),
    );
    let mut data = PackData::new();
    let three = PackValue::List(vec![1u8.into(), 2u8.into(), 3u8.into()]);
    let flags = field.pack_value(&mut data, &three);
    assert!(flags.range_error);
    assert!(!flags.pack_error);
    assert_eq!(data.as_slice(), [3, 0, 1, 2, 3]);

    let mut p = 0;
    let unpacked = field.unpack_value(data.as_slice(), &mut p);
    assert!(unpacked.flags.range_error);
    assert_eq!(
        unpacked.value,
        PackValue::List(vec![PackValue::UInt(1), PackValue::UInt(2), PackValue::UInt(3)])
    );
}

#[test]
fn test_nested_arrays() {
    let field = Field::new(
        "grid",
        ArrayParameter::new(
            Field::new(
                "row",
                ArrayParameter::new(simple("", SubatomicType::Int8), ArraySize::any()),
            )
            .into_ref(),
            ArraySize::any(),
        ),
    );
    let value = PackValue::List(vec![
        PackValue::List(vec![1i8.into()]),
        PackValue::List(vec![]),
        PackValue::List(vec![2i8.into(), 3i8.into()]),
    ]);
    let (bytes, unpacked) = round_trip(&field, &value);
    assert_eq!(bytes, [9, 0, 1, 0, 1, 0, 0, 2, 0, 2, 3]);
    assert_eq!(unpacked.as_list().map(<[PackValue]>::len), Some(3));
}

#[test]
fn test_switch_cases() {
    let field = shape();

    let circle = PackValue::List(vec![1u8.into(), 500u16.into()]);
    let (bytes, unpacked) = round_trip(&field, &circle);
    assert_eq!(bytes, [1, 0xF4, 0x01]);
    assert_eq!(unpacked, PackValue::List(vec![PackValue::UInt(1), PackValue::UInt(500)]));

    // Key 3 falls through to the rectangle case.
    let square = PackValue::List(vec![3u8.into(), 5u8.into(), 5u8.into()]);
    let (bytes, _) = round_trip(&field, &square);
    assert_eq!(bytes, [3, 5, 5]);

    let other = PackValue::List(vec![9u8.into(), "blob".into()]);
    let (bytes, unpacked) = round_trip(&field, &other);
    assert_eq!(bytes, [9, 4, 0, b'b', b'l', b'o', b'b']);
    assert_eq!(unpacked.as_list().and_then(|l| l[1].as_str()), Some("blob"));
}

#[test]
fn test_switch_wrong_case_arity() {
    let mut data = PackData::new();
    let flags = shape().pack_value(&mut data, &PackValue::List(vec![1u8.into()]));
    assert!(flags.pack_error);
    assert!(data.is_empty());
}

#[test]
fn test_switch_case_from_value() {
    let key = simple("op", SubatomicType::UInt16);
    let case = SwitchCase::from_value(&key, &PackValue::UInt(0x0102), vec![]).unwrap();
    assert_eq!(case.values(), [vec![0x02, 0x01].into_boxed_slice()]);
    assert!(case.matches(&[0x02, 0x01]));

    match SwitchCase::from_value(&key, &"x".into(), vec![]) {
        Err(Error::PackError) => {}
        _ => panic!("expected pack error"),
    }
}

#[test]
fn test_unpack_value_failure_restores_cursor() {
    let field = avatar();
    let bytes = [7, 0, 0, 0, 9, 0, b'a'];
    let mut p = 0;
    let unpacked = field.unpack_value(&bytes, &mut p);
    assert!(unpacked.flags.pack_error);
    assert_eq!(p, 0);

    // No case for key 4 and no default.
    let key = simple("k", SubatomicType::UInt8);
    let field = Field::new(
        "s",
        SwitchParameter::new(key).with_case(SwitchCase::new(vec![1], vec![])),
    );
    let mut p = 0;
    assert!(field.unpack_value(&[4], &mut p).flags.pack_error);
    assert_eq!(p, 0);
}

#[test]
fn test_byte_array_as_string() {
    let field = Field::new(
        "text",
        ArrayParameter::new(simple("", SubatomicType::Char), ArraySize::any()),
    );
    let mut data = PackData::new();
    assert!(field.pack_value(&mut data, &"hey".into()).is_ok());
    assert_eq!(data.as_slice(), [3, 0, b'h', b'e', b'y']);

    let mut p = 0;
    assert_eq!(field.unpack_string(data.as_slice(), &mut p).value, "hey");
}

#[test]
fn test_value_display() {
    let value = PackValue::List(vec![
        PackValue::Int(-1),
        PackValue::String("a".to_owned()),
        PackValue::Blob(vec![0xAB, 1]),
    ]);
    assert_eq!(value.to_string(), r#"[-1, "a", <ab01>]"#);
}

#[test]
fn test_value_accessors() {
    assert_eq!(PackValue::UInt(5).as_i64(), Some(5));
    assert_eq!(PackValue::Int(-5).as_u64(), None);
    assert_eq!(PackValue::Int(2).as_f64(), Some(2.0));
    assert_eq!(PackValue::from("s").as_bytes(), Some(&b"s"[..]));
    assert!(PackValue::default().as_list().is_some_and(<[PackValue]>::is_empty));
}

#[test]
fn test_non_utf8_text_decodes_as_blob() {
    let cases: [(SubatomicType, &[u8], &[u8]); 2] = [
        (SubatomicType::String, &[0xFF, 0xFE], &[2, 0, 0xFF, 0xFE]),
        (SubatomicType::Char, &[0xE9], &[0xE9]),
    ];
    for (kind, raw, wire) in cases {
        let field = simple("t", kind);
        let mut data = PackData::new();
        assert!(field.pack_blob(&mut data, raw).is_ok());
        assert_eq!(data.as_slice(), wire);

        let mut p = 0;
        let unpacked = field.unpack_value(data.as_slice(), &mut p);
        assert!(unpacked.flags.is_ok(), "{kind:?}: {:?}", unpacked.flags);
        assert_eq!(p, wire.len());
        assert_eq!(unpacked.value, PackValue::Blob(raw.to_vec()));

        let (bytes, again) = round_trip(&field, &unpacked.value);
        assert_eq!(bytes, wire);
        assert_eq!(again, unpacked.value);
    }
}

#[test]
fn test_nested_pack_error_rolls_back() {
    let field = Field::new(
        "outer",
        ClassParameter::new(vec![
            simple("a", SubatomicType::UInt8),
            Field::new("b", ClassParameter::new(vec![simple("c", SubatomicType::UInt8)]))
                .into_ref(),
        ]),
    );
    let value = PackValue::List(vec![1u8.into(), PackValue::List(vec![2u8.into(), 3u8.into()])]);

    let mut data = PackData::new();
    assert!(field.pack_value(&mut data, &value).pack_error);
    assert!(data.is_empty());

    data.append_data(&[9, 9]);
    assert!(field.pack_value(&mut data, &value).pack_error);
    assert_eq!(data.as_slice(), [9, 9]);

    // A failing tagged array element drops the reserved tag too.
    let field = Field::new("rows", ArrayParameter::new(field.into_ref(), ArraySize::any()));
    let mut data = PackData::new();
    assert!(field.pack_value(&mut data, &PackValue::List(vec![value])).pack_error);
    assert!(data.is_empty());

    let (bytes, _) = round_trip(&shape(), &PackValue::List(vec![1u8.into(), 2u16.into()]));
    let mut data = PackData::new();
    data.append_data(&bytes);
    let bad_case = PackValue::List(vec![2u8.into(), 1u8.into()]);
    assert!(shape().pack_value(&mut data, &bad_case).pack_error);
    assert_eq!(data.as_slice(), bytes);
}
