//! Schema-driven binary packing of structured fields.
//!
//! A tree of [`Field`]s describes how a record is laid out on the wire. Each
//! field packs and unpacks its own values, and the [`PackerCatalog`] of a
//! root field names every nested field so that individual fields can be
//! located inside a packed buffer through a [`LiveCatalog`].

pub use zerocopy::LittleEndian;

mod catalog;
pub mod codec;
mod error;
mod field;
mod flags;
mod pack_data;
mod pack_type;
mod value;

pub use catalog::*;
pub use error::*;
pub use field::*;
pub use flags::*;
pub use pack_data::*;
pub use pack_type::*;
pub use value::*;
