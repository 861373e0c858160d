use std::fmt;

use crate::{
    ArrayParameter, Field, FieldKind, FieldRef, Flagged, PackData, PackFlags, PackType,
    SwitchParameter,
    codec::{LENGTH_TAG_BYTES, LengthTag},
    field::read_length_tag,
};

/// A dynamically typed value matching the shape of a field.
///
/// Scalars map to the numeric variants, strings and blobs to
/// [`String`](PackValue::String) and [`Blob`](PackValue::Blob), and every
/// container to a [`List`](PackValue::List) of its nested values. A switch is
/// the list of its key followed by the fields of the selected case.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PackValue {
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
    List(Vec<PackValue>),
}

impl Default for PackValue {
    #[inline]
    fn default() -> Self {
        PackValue::List(Vec::new())
    }
}

impl PackValue {
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            PackValue::Int(value) => Some(value),
            PackValue::UInt(value) => i64::try_from(value).ok(),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            PackValue::Int(value) => u64::try_from(value).ok(),
            PackValue::UInt(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            PackValue::Int(value) => Some(value as f64),
            PackValue::UInt(value) => Some(value as f64),
            PackValue::Double(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PackValue::String(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PackValue::String(value) => Some(value.as_bytes()),
            PackValue::Blob(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[PackValue]> {
        match self {
            PackValue::List(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for PackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackValue::Int(value) => write!(f, "{value}"),
            PackValue::UInt(value) => write!(f, "{value}"),
            PackValue::Double(value) => write!(f, "{value}"),
            PackValue::String(value) => write!(f, "{value:?}"),
            PackValue::Blob(value) => {
                f.write_str("<")?;
                for byte in value {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str(">")
            }
            PackValue::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident as $as:ty),* $(,)?) => {
        $(
            impl From<$ty> for PackValue {
                #[inline]
                fn from(value: $ty) -> Self {
                    PackValue::$variant(value as $as)
                }
            }
        )*
    };
}

impl_from_value!(
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f64 => Double as f64,
);

impl From<&str> for PackValue {
    #[inline]
    fn from(value: &str) -> Self {
        PackValue::String(value.to_owned())
    }
}

impl From<String> for PackValue {
    #[inline]
    fn from(value: String) -> Self {
        PackValue::String(value)
    }
}

impl From<Vec<u8>> for PackValue {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        PackValue::Blob(value)
    }
}

impl From<Vec<PackValue>> for PackValue {
    #[inline]
    fn from(value: Vec<PackValue>) -> Self {
        PackValue::List(value)
    }
}

impl Field {
    /// Packs a whole value tree shaped like this field.
    ///
    /// A list with the wrong number of members for a record-like field, or a
    /// switch key that selects no case, is a pack error. On a pack error the
    /// sink is rolled back to its length on entry.
    pub fn pack_value(&self, data: &mut PackData, value: &PackValue) -> PackFlags {
        let start = data.get_length();
        let flags = self.pack_value_unchecked(data, value);
        if flags.pack_error {
            data.truncate(start);
        }
        flags
    }

    fn pack_value_unchecked(&self, data: &mut PackData, value: &PackValue) -> PackFlags {
        match (self.kind(), value) {
            (FieldKind::Simple(_), PackValue::Int(value)) => self.pack_int64(data, *value),
            (FieldKind::Simple(_), PackValue::UInt(value)) => self.pack_uint64(data, *value),
            (FieldKind::Simple(_), PackValue::Double(value)) => self.pack_double(data, *value),
            (FieldKind::Simple(_) | FieldKind::Array(_), PackValue::String(value)) => {
                self.pack_string(data, value)
            }
            (FieldKind::Simple(_) | FieldKind::Array(_), PackValue::Blob(value)) => {
                self.pack_blob(data, value)
            }
            (FieldKind::Array(array), PackValue::List(values)) => pack_array(array, data, values),
            (FieldKind::Switch(switch), PackValue::List(values)) => {
                pack_switch(switch, data, values)
            }
            (kind, PackValue::List(values)) => match kind.members() {
                Some(members) => pack_members(members, data, values),
                None => PackFlags::PACK_ERROR,
            },
            _ => PackFlags::PACK_ERROR,
        }
    }

    /// Decodes a whole value tree shaped like this field.
    ///
    /// String and char fields decode to [`PackValue::String`] when their
    /// bytes are UTF-8 and to [`PackValue::Blob`] otherwise. On a pack error
    /// `p` is left where it started.
    pub fn unpack_value(&self, data: &[u8], p: &mut usize) -> Flagged<PackValue> {
        let start = *p;
        let unpacked = match self.kind() {
            FieldKind::Simple(_) => match self.get_pack_type() {
                PackType::Double => self.unpack_double(data, p).map(PackValue::Double),
                PackType::Int | PackType::Int64 => self.unpack_int64(data, p).map(PackValue::Int),
                PackType::UInt | PackType::UInt64 => {
                    self.unpack_uint64(data, p).map(PackValue::UInt)
                }
                PackType::String => self.unpack_blob(data, p).map(|bytes| {
                    String::from_utf8(bytes).map_or_else(
                        |error| PackValue::Blob(error.into_bytes()),
                        PackValue::String,
                    )
                }),
                _ => self.unpack_blob(data, p).map(PackValue::Blob),
            },
            FieldKind::Array(array) => unpack_array(array, data, p),
            FieldKind::Switch(switch) => unpack_switch(switch, data, p),
            kind => unpack_members(kind.members().unwrap_or_default(), data, p),
        };
        if unpacked.flags.pack_error {
            *p = start;
            return Flagged::pack_error();
        }
        unpacked
    }
}

fn pack_members(members: &[FieldRef], data: &mut PackData, values: &[PackValue]) -> PackFlags {
    if members.len() != values.len() {
        return PackFlags::PACK_ERROR;
    }
    let mut flags = PackFlags::OK;
    for (member, value) in members.iter().zip(values) {
        flags |= member.pack_value(data, value);
    }
    flags
}

fn pack_array(array: &ArrayParameter, data: &mut PackData, values: &[PackValue]) -> PackFlags {
    let mut flags = PackFlags::OK;
    if !array.size().contains(values.len()) {
        // An untagged array cannot say how many elements it holds.
        if !array.has_length_tag() {
            return PackFlags::PACK_ERROR;
        }
        flags.set_range_error();
    }

    if !array.has_length_tag() {
        for value in values {
            flags |= array.element().pack_value(data, value);
        }
        return flags;
    }

    let tag_offset = data.get_length();
    data.append_length_tag(0);
    let body_start = data.get_length();
    for value in values {
        flags |= array.element().pack_value(data, value);
    }
    match LengthTag::try_from(data.get_length() - body_start) {
        Ok(length) => {
            data.patch_length_tag(tag_offset, length);
        }
        Err(_) => flags.set_pack_error(),
    }
    flags
}

fn pack_switch(switch: &SwitchParameter, data: &mut PackData, values: &[PackValue]) -> PackFlags {
    let Some((key, case_values)) = values.split_first() else {
        return PackFlags::PACK_ERROR;
    };
    let mut key_data = PackData::new();
    let mut flags = switch.key().pack_value(&mut key_data, key);
    if flags.pack_error {
        return flags;
    }
    let Some(case) = switch.find_case(key_data.as_slice()) else {
        return PackFlags::PACK_ERROR;
    };
    if case.fields().len() != case_values.len() {
        return PackFlags::PACK_ERROR;
    }
    data.append_data(key_data.as_slice());
    for (field, value) in case.fields().iter().zip(case_values) {
        flags |= field.pack_value(data, value);
    }
    flags
}

fn unpack_members(members: &[FieldRef], data: &[u8], p: &mut usize) -> Flagged<PackValue> {
    let mut flags = PackFlags::OK;
    let mut values = Vec::with_capacity(members.len());
    for member in members {
        let Flagged { value, flags: member_flags } = member.unpack_value(data, p);
        flags |= member_flags;
        if flags.pack_error {
            return Flagged::pack_error();
        }
        values.push(value);
    }
    Flagged::new(PackValue::List(values), flags)
}

fn unpack_array(array: &ArrayParameter, data: &[u8], p: &mut usize) -> Flagged<PackValue> {
    let element = array.element();
    let mut flags = PackFlags::OK;
    let mut values = Vec::new();

    match array.size().fixed_count().filter(|_| !array.has_length_tag()) {
        Some(count) => {
            for _ in 0..count {
                let unpacked = element.unpack_value(data, p);
                flags |= unpacked.flags;
                if flags.pack_error {
                    return Flagged::pack_error();
                }
                values.push(unpacked.value);
            }
        }
        None => {
            let Some(end) = read_length_tag(data, p, LENGTH_TAG_BYTES)
                .and_then(|length| p.checked_add(length))
                .filter(|&end| end <= data.len())
            else {
                return Flagged::pack_error();
            };
            let body = &data[..end];
            while *p < end {
                let before = *p;
                let unpacked = element.unpack_value(body, p);
                flags |= unpacked.flags;
                if flags.pack_error || *p == before {
                    return Flagged::pack_error();
                }
                values.push(unpacked.value);
            }
        }
    }

    if !array.size().contains(values.len()) {
        flags.set_range_error();
    }
    Flagged::new(PackValue::List(values), flags)
}

fn unpack_switch(switch: &SwitchParameter, data: &[u8], p: &mut usize) -> Flagged<PackValue> {
    let key_start = *p;
    let Flagged { value: key, mut flags } = switch.key().unpack_value(data, p);
    if flags.pack_error {
        return Flagged::pack_error();
    }
    let Some(case) = switch.find_case(&data[key_start..*p]) else {
        return Flagged::pack_error();
    };

    let mut values = Vec::with_capacity(case.fields().len() + 1);
    values.push(key);
    for field in case.fields() {
        let unpacked = field.unpack_value(data, p);
        flags |= unpacked.flags;
        if flags.pack_error {
            return Flagged::pack_error();
        }
        values.push(unpacked.value);
    }
    Flagged::new(PackValue::List(values), flags)
}
