use crate::codec::{BLOB32_TAG_BYTES, LENGTH_TAG_BYTES};

/// The best choice for a subsequent pack or unpack call on a field.
///
/// Scalar kinds are packed directly with the matching `pack_*` call. The
/// container kinds are all a list of nested fields; the variant only adds
/// semantic context.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PackType {
    Invalid = 0,

    Double = 1,
    Int = 2,
    UInt = 3,
    Int64 = 4,
    UInt64 = 5,
    String = 6,
    /// Same as `String`, but the bytes are binary data.
    Blob = 7,

    Array = 8,
    Field = 9,
    Class = 10,
    Switch = 11,
}

impl PackType {
    /// Returns `true` for kinds packed by a single `pack_*` call.
    ///
    /// # Example
    ///
    /// ```
    /// use dc_packer::PackType;
    ///
    /// assert!(PackType::Int.is_scalar());
    /// assert!(PackType::Blob.is_scalar());
    /// assert!(!PackType::Class.is_scalar());
    /// ```
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Double
                | Self::Int
                | Self::UInt
                | Self::Int64
                | Self::UInt64
                | Self::String
                | Self::Blob
        )
    }

    /// Returns `true` for kinds that hold nested fields.
    ///
    /// # Example
    ///
    /// ```
    /// use dc_packer::PackType;
    ///
    /// assert!(PackType::Switch.is_container());
    /// assert!(!PackType::Double.is_container());
    /// ```
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Array | Self::Field | Self::Class | Self::Switch)
    }
}

/// The wire representation of a simple parameter.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubatomicType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float64,
    /// A single byte, packed as a one-character string.
    Char,
    String,
    Blob,
    /// A blob with a 4-byte length tag.
    Blob32,
}

impl SubatomicType {
    /// Width in bytes of a fixed-width type, `None` for length-prefixed ones.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Int8 | Self::UInt8 | Self::Char => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::String | Self::Blob | Self::Blob32 => None,
        }
    }

    /// Width in bytes of the length tag in front of a length-prefixed type.
    pub const fn length_tag_width(self) -> usize {
        match self {
            Self::String | Self::Blob => LENGTH_TAG_BYTES,
            Self::Blob32 => BLOB32_TAG_BYTES,
            _ => 0,
        }
    }

    /// Number of value bits of an integer type.
    pub const fn num_bits(self) -> u32 {
        match self {
            Self::Int8 | Self::UInt8 | Self::Char => 8,
            Self::Int16 | Self::UInt16 => 16,
            Self::Int32 | Self::UInt32 => 32,
            _ => 64,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Returns `true` for the string-like types, including `Char`.
    pub const fn is_bytes(self) -> bool {
        matches!(self, Self::Char | Self::String | Self::Blob | Self::Blob32)
    }

    /// The natural pack type, before any divisor is applied.
    pub const fn pack_type(self) -> PackType {
        match self {
            Self::Int8 | Self::Int16 | Self::Int32 => PackType::Int,
            Self::UInt8 | Self::UInt16 | Self::UInt32 => PackType::UInt,
            Self::Int64 => PackType::Int64,
            Self::UInt64 => PackType::UInt64,
            Self::Float64 => PackType::Double,
            Self::Char | Self::String => PackType::String,
            Self::Blob | Self::Blob32 => PackType::Blob,
        }
    }
}
