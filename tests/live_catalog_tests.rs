//! Tests for per-buffer live catalogs

use std::thread;

use dc_packer::*;

fn simple(name: &str, kind: SubatomicType) -> FieldRef {
    Field::new(name, SimpleParameter::new(kind)).into_ref()
}

fn class(name: &str, fields: Vec<FieldRef>) -> FieldRef {
    Field::new(name, ClassParameter::new(fields)).into_ref()
}

fn avatar() -> FieldRef {
    class("avatar", vec![
        simple("id", SubatomicType::UInt32),
        simple("name", SubatomicType::String),
        class("pos", vec![
            simple("x", SubatomicType::Int16),
            simple("y", SubatomicType::Int16),
        ]),
        Field::new(
            "inventory",
            ArrayParameter::new(simple("", SubatomicType::UInt16), ArraySize::any()),
        )
        .into_ref(),
        Field::new(
            "tags",
            ArrayParameter::new(simple("", SubatomicType::UInt8), ArraySize::fixed(2)),
        )
        .into_ref(),
    ])
}

fn avatar_bytes(root: &Field) -> Vec<u8> {
    let value = PackValue::List(vec![
        7u32.into(),
        "ann".into(),
        PackValue::List(vec![1i16.into(), 2i16.into()]),
        PackValue::List(vec![10u16.into(), 20u16.into()]),
        PackValue::List(vec![5u8.into(), 6u8.into()]),
    ]);
    let mut data = PackData::new();
    assert!(root.pack_value(&mut data, &value).is_ok());
    data.into_vec()
}

fn message() -> FieldRef {
    let kind = simple("kind", SubatomicType::UInt8);
    class("msg", vec![
        simple("hdr", SubatomicType::UInt8),
        Field::new(
            "shape",
            SwitchParameter::new(kind)
                .with_case(SwitchCase::new(vec![1], vec![simple("radius", SubatomicType::UInt16)]))
                .with_case(SwitchCase::new(vec![2], vec![
                    simple("w", SubatomicType::UInt8),
                    simple("h", SubatomicType::UInt8),
                ])),
        )
        .into_ref(),
        simple("crc", SubatomicType::UInt8),
    ])
}

#[test]
fn test_live_offsets() {
    let root = avatar();
    let bytes = avatar_bytes(&root);
    assert_eq!(bytes.len(), 21);

    let catalog = root.get_catalog();
    let live = catalog.get_live_catalog(&bytes).unwrap();
    assert_eq!(live.get_num_entries(), catalog.get_num_entries());

    let span = |name: &str| live.get_span(live.find_entry_by_name(name).unwrap()).unwrap();
    assert_eq!(span("id"), 0..4);
    assert_eq!(span("name"), 4..9);
    assert_eq!(span("pos"), 9..13);
    assert_eq!(span("pos.x"), 9..11);
    assert_eq!(span("pos.y"), 11..13);
    assert_eq!(span("inventory"), 13..19);
    assert_eq!(span("tags"), 19..21);
    assert_eq!(span("tags[1]"), 20..21);

    assert_eq!(live.get_field_bytes(&bytes, "name").unwrap(), [3, 0, b'a', b'n', b'n']);
    match live.get_field_bytes(&bytes, "nope") {
        Err(Error::NotFound(name)) => assert_eq!(name, "nope"),
        _ => panic!("expected not found"),
    }
}

#[test]
fn test_top_level_spans_cover_buffer() {
    let root = avatar();
    let bytes = avatar_bytes(&root);
    let catalog = root.get_catalog();
    let live = catalog.get_live_catalog(&bytes).unwrap();

    let mut offset = 0;
    for (n, entry) in catalog.entries().iter().enumerate() {
        if entry.path().len() == 1 {
            assert_eq!(live.get_begin(n), Some(offset), "{}", entry.name());
            offset = live.get_end(n).unwrap();
        }
    }
    assert_eq!(offset, bytes.len());

    for (n, entry) in live.live_entries().iter().enumerate() {
        assert!(entry.begin <= entry.end, "entry {n}");
        assert!(entry.end <= bytes.len(), "entry {n}");
    }
}

#[test]
fn test_live_errors() {
    let root = avatar();
    let bytes = avatar_bytes(&root);
    let catalog = root.get_catalog();

    match catalog.get_live_catalog(&bytes[..bytes.len() - 1]) {
        Err(Error::EndOfFile) => {}
        _ => panic!("expected end of file"),
    }

    let mut longer = bytes.clone();
    longer.push(0);
    match catalog.get_live_catalog(&longer) {
        Err(Error::TrailingData(1)) => {}
        _ => panic!("expected trailing data"),
    }

    // Length tag claims more than the buffer holds.
    let mut lying = bytes.clone();
    lying[4] = 200;
    match catalog.get_live_catalog(&lying) {
        Err(Error::EndOfFile) => {}
        _ => panic!("expected end of file"),
    }
}

#[test]
fn test_fixed_structure_shares_offsets() {
    let root = class("pos", vec![
        simple("x", SubatomicType::Int16),
        simple("y", SubatomicType::Int16),
    ]);
    assert!(root.has_fixed_structure());
    let catalog = root.get_catalog();

    let first = catalog.get_live_catalog(&[1, 0, 2, 0]).unwrap();
    let second = catalog.get_live_catalog(&[9, 9, 9, 9]).unwrap();
    assert_eq!(first.live_entries(), second.live_entries());
    assert_eq!(first.live_entries().as_ptr(), second.live_entries().as_ptr());
    assert_eq!(second.get_span(1), Some(2..4));

    match catalog.get_live_catalog(&[1, 0, 2]) {
        Err(Error::EndOfFile) => {}
        _ => panic!("expected end of file"),
    }
    match catalog.get_live_catalog(&[1, 0, 2, 0, 0]) {
        Err(Error::TrailingData(1)) => {}
        _ => panic!("expected trailing data"),
    }
}

#[test]
fn test_switch_live_catalog_shows_active_case_only() {
    let root = message();
    let catalog = root.get_catalog();

    let circle = [0xAA, 1, 0x10, 0x00, 0xCC];
    let live = catalog.get_live_catalog(&circle).unwrap();
    let radius = live.find_entry_by_name("shape.radius").unwrap();
    assert_eq!(live.get_span(radius), Some(2..4));
    assert_eq!(live.find_entry_by_name("shape.w"), None);
    let crc = live.find_entry_by_name("crc").unwrap();
    assert_eq!(live.get_span(crc), Some(4..5));
    let shape = live.find_entry_by_name("shape").unwrap();
    assert_eq!(live.get_span(shape), Some(1..4));
    assert_eq!(live.get_entry(radius).map(CatalogEntry::name), Some("shape.radius"));

    let rect = [0xAA, 2, 3, 4, 0xCC];
    let live = catalog.get_live_catalog(&rect).unwrap();
    assert_eq!(live.find_entry_by_name("shape.radius"), None);
    let h = live.find_entry_by_name("shape.h").unwrap();
    assert_eq!(live.get_span(h), Some(3..4));

    assert_eq!(catalog.get_num_entries(), 4);
}

#[test]
fn test_unknown_switch_case() {
    let root = message();
    match root.get_catalog().get_live_catalog(&[0, 7, 0]) {
        Err(Error::UnknownSwitchCase(name)) => assert_eq!(name, "shape"),
        _ => panic!("expected unknown switch case"),
    }
}

#[test]
fn test_release_and_reuse() {
    let root = message();
    let catalog = root.get_catalog();
    for key in [1u8, 2, 1] {
        let bytes = match key {
            1 => vec![0, 1, 0, 0, 0],
            _ => vec![0, 2, 0, 0, 0],
        };
        let live = catalog.get_live_catalog(&bytes).unwrap();
        assert!(live.find_entry_by_name("shape.kind").is_some());
        catalog.release_live_catalog(live);
    }
}

#[test]
fn test_live_catalogs_across_threads() {
    let root = message();
    let catalog = root.get_catalog();
    thread::scope(|scope| {
        for i in 0..8u8 {
            scope.spawn(move || {
                let bytes = match i % 2 {
                    0 => vec![i, 1, i, 0, 0],
                    _ => vec![i, 2, i, i, 0],
                };
                let live = catalog.get_live_catalog(&bytes).unwrap();
                let name = if i % 2 == 0 { "shape.radius" } else { "shape.w" };
                let n = live.find_entry_by_name(name).unwrap();
                assert_eq!(live.get_begin(n), Some(2));
            });
        }
    });
}
