//! Tests for the Error type

use dc_packer::{Error, PackFlags};

#[test]
fn test_error_display_end_of_file() {
    let error = Error::EndOfFile;
    assert_eq!(format!("{}", error), "unexpected end of input");
}

#[test]
fn test_error_display_trailing_data() {
    let error = Error::TrailingData(42);
    assert_eq!(
        format!("{}", error),
        "trailing data after end of record: 42 bytes remaining"
    );
}

#[test]
fn test_error_display_unknown_switch_case() {
    let error = Error::UnknownSwitchCase("shape".to_owned());
    assert_eq!(format!("{}", error), "switch \"shape\" has no case for the decoded key");
}

#[test]
fn test_error_display_schema_mismatch() {
    let error = Error::SchemaMismatch {
        expected: "class a".to_owned(),
        found: "array a".to_owned(),
    };
    assert_eq!(
        format!("{}", error),
        "field mismatch: expected \"class a\", found \"array a\""
    );
}

#[test]
fn test_error_debug() {
    let error = Error::EndOfFile;
    let debug_str = format!("{:?}", error);
    assert!(debug_str.contains("EndOfFile"));
}

#[test]
fn test_error_is_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync>() {}
    assert_error::<Error>();
}

#[test]
fn test_result_type() {
    let ok_result: dc_packer::Result<i32> = Ok(42);
    assert_eq!(ok_result.unwrap(), 42);

    let err_result: dc_packer::Result<i32> = Err(Error::EndOfFile);
    assert!(err_result.is_err());
}

#[test]
fn test_flags_into_result() {
    assert_eq!(PackFlags::OK.into_result(), Ok(()));
    assert_eq!(PackFlags::RANGE_ERROR.into_result(), Err(Error::RangeError));
    assert_eq!(
        (PackFlags::RANGE_ERROR | PackFlags::PACK_ERROR).into_result(),
        Err(Error::PackError)
    );
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_custom_error() {
    use serde::de::Error as _;
    let error = Error::custom("bad value");
    assert_eq!(error, Error::Message("bad value".to_owned()));
    assert_eq!(format!("{}", error), "bad value");
}
