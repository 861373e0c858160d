//! Error types for packing, unpacking and catalog operations.
//!
//! Field-level operations report problems through [`PackFlags`](crate::PackFlags)
//! so a caller walking a whole record can keep going after a bad field. The
//! [`Error`] type is what those flags turn into once a caller decides a record
//! has failed, and what the checked entry points (live catalogs, schema
//! matching) return directly.
//!
//! # Example
//!
//! ```
//! use dc_packer::{Error, Field, PackData, SimpleParameter, SubatomicType};
//!
//! let x = Field::new("x", SimpleParameter::new(SubatomicType::Int8));
//! let mut data = PackData::new();
//!
//! match x.pack_int(&mut data, 200).into_result() {
//!     Err(Error::RangeError) => println!("written, but out of range"),
//!     Err(e) => println!("failed: {e}"),
//!     Ok(()) => println!("packed"),
//! }
//! ```

use std::fmt::{self, Display};

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// This type represents all possible errors that can occur when packing,
/// unpacking or cataloging field data.
///
/// # Variants
///
/// - [`PackError`](Error::PackError) - The value cannot be represented by the field
/// - [`RangeError`](Error::RangeError) - The value was encoded but violates a declared bound
/// - [`EndOfFile`](Error::EndOfFile) - The input ended unexpectedly
/// - [`TrailingData`](Error::TrailingData) - Extra bytes remain after a record
/// - [`NotFound`](Error::NotFound) - A catalog lookup missed
/// - [`SchemaMismatch`](Error::SchemaMismatch) - Two field trees disagree
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Message(String),

    /// The field kind cannot represent the value at all, e.g. a string
    /// packed into an integer field.
    PackError,

    /// The value is representable but falls outside a declared numeric,
    /// length or bit-width bound. The value has still been written.
    RangeError,

    /// The input ended unexpectedly.
    ///
    /// This error occurs when a record is truncated, or a length tag claims
    /// more bytes than the buffer holds.
    EndOfFile,

    /// Extra bytes remain after decoding a record.
    ///
    /// Records are consumed completely. The payload is the number of bytes
    /// left over after the root field ends.
    TrailingData(usize),

    /// A catalog name lookup found nothing.
    NotFound(String),

    /// `check_match` found two field trees that disagree.
    SchemaMismatch { expected: String, found: String },

    /// A switch key decoded to a value with no matching case and the switch
    /// declares no default case.
    UnknownSwitchCase(String),
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

#[cfg(feature = "serde")]
impl serde::de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Message(message) => formatter.write_str(message),
            Error::PackError => formatter.write_str("value cannot be packed into this field"),
            Error::RangeError => formatter.write_str("value out of declared range"),
            Error::EndOfFile => formatter.write_str("unexpected end of input"),
            Error::TrailingData(remaining_bytes) => formatter.write_str(&format!(
                "trailing data after end of record: {remaining_bytes} bytes remaining"
            )),
            Error::NotFound(name) => {
                formatter.write_str(&format!("no catalog entry named {name:?}"))
            }
            Error::SchemaMismatch { expected, found } => formatter.write_str(&format!(
                "field mismatch: expected {expected:?}, found {found:?}"
            )),
            Error::UnknownSwitchCase(switch) => formatter.write_str(&format!(
                "switch {switch:?} has no case for the decoded key"
            )),
        }
    }
}

impl std::error::Error for Error {}
