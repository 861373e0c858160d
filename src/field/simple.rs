use crate::{Flagged, PackData, PackFlags, PackType, SubatomicType, codec};

use super::{Layout, read_length_tag, skip_bytes, take, write_length_tag};

/// A decoded or to-be-encoded number before it is narrowed to a wire type.
#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) enum Scalar {
    Int(i64),
    UInt(u64),
    Double(f64),
}

impl Default for Scalar {
    #[inline]
    fn default() -> Self {
        Scalar::Int(0)
    }
}

impl Scalar {
    #[inline]
    pub(crate) fn to_f64(self) -> f64 {
        match self {
            Scalar::Int(v) => v as f64,
            Scalar::UInt(v) => v as f64,
            Scalar::Double(v) => v,
        }
    }

    /// The value as an `i64` and whether it fit without truncation.
    pub(crate) fn to_i64(self) -> (i64, bool) {
        match self {
            Scalar::Int(v) => (v, true),
            Scalar::UInt(v) => (v as i64, v <= i64::MAX as u64),
            Scalar::Double(v) => {
                let t = v.trunc();
                (t as i64, t >= -9.223_372_036_854_775_808e18 && t < 9.223_372_036_854_775_808e18)
            }
        }
    }

    /// The value as a `u64` and whether it fit without truncation.
    pub(crate) fn to_u64(self) -> (u64, bool) {
        match self {
            Scalar::Int(v) => (v as u64, v >= 0),
            Scalar::UInt(v) => (v, true),
            Scalar::Double(v) => {
                let t = v.trunc();
                (t as u64, t >= 0.0 && t < 1.844_674_407_370_955_161_6e19)
            }
        }
    }
}

/// A declared bound on a simple parameter.
///
/// Numeric types bound the value itself, in user units (before the divisor is
/// applied). String types bound the byte length.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueRange {
    Int { min: i64, max: i64 },
    UInt { min: u64, max: u64 },
    Double { min: f64, max: f64 },
}

impl ValueRange {
    #[inline]
    pub const fn int(min: i64, max: i64) -> Self {
        ValueRange::Int { min, max }
    }

    #[inline]
    pub const fn uint(min: u64, max: u64) -> Self {
        ValueRange::UInt { min, max }
    }

    #[inline]
    pub const fn double(min: f64, max: f64) -> Self {
        ValueRange::Double { min, max }
    }

    /// A length range admitting exactly `length` bytes.
    #[inline]
    pub const fn length(length: u64) -> Self {
        ValueRange::UInt {
            min: length,
            max: length,
        }
    }

    pub(crate) fn contains(&self, value: Scalar) -> bool {
        match (*self, value) {
            (ValueRange::Int { min, max }, Scalar::Int(v)) => min <= v && v <= max,
            (ValueRange::Int { min, max }, Scalar::UInt(v)) => {
                i64::try_from(v).is_ok_and(|v| min <= v && v <= max)
            }
            (ValueRange::UInt { min, max }, Scalar::Int(v)) => {
                u64::try_from(v).is_ok_and(|v| min <= v && v <= max)
            }
            (ValueRange::UInt { min, max }, Scalar::UInt(v)) => min <= v && v <= max,
            (range, value) => {
                let (min, max) = range.bounds_f64();
                let value = value.to_f64();
                min <= value && value <= max
            }
        }
    }

    #[inline]
    pub fn contains_length(&self, length: usize) -> bool {
        self.contains(Scalar::UInt(length as u64))
    }

    fn bounds_f64(&self) -> (f64, f64) {
        match *self {
            ValueRange::Int { min, max } => (min as f64, max as f64),
            ValueRange::UInt { min, max } => (min as f64, max as f64),
            ValueRange::Double { min, max } => (min, max),
        }
    }

    pub(crate) fn minimum(&self) -> Scalar {
        match *self {
            ValueRange::Int { min, .. } => Scalar::Int(min),
            ValueRange::UInt { min, .. } => Scalar::UInt(min),
            ValueRange::Double { min, .. } => Scalar::Double(min),
        }
    }

    fn single_length(&self) -> Option<usize> {
        match *self {
            ValueRange::Int { min, max } if min == max => usize::try_from(min).ok(),
            ValueRange::UInt { min, max } if min == max => usize::try_from(min).ok(),
            _ => None,
        }
    }
}

/// A scalar, string or blob parameter.
#[derive(Clone, PartialEq, Debug)]
pub struct SimpleParameter {
    kind: SubatomicType,
    divisor: u32,
    range: Option<ValueRange>,
}

impl SimpleParameter {
    #[inline]
    pub const fn new(kind: SubatomicType) -> Self {
        Self {
            kind,
            divisor: 1,
            range: None,
        }
    }

    /// Stores numbers as fixed point: the wire holds `value * divisor`.
    /// A divisor of zero is treated as one.
    #[inline]
    pub const fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = if divisor == 0 { 1 } else { divisor };
        self
    }

    #[inline]
    pub const fn with_range(mut self, range: ValueRange) -> Self {
        self.range = Some(range);
        self
    }

    #[inline]
    pub const fn get_type(&self) -> SubatomicType {
        self.kind
    }

    #[inline]
    pub const fn get_divisor(&self) -> u32 {
        self.divisor
    }

    #[inline]
    pub const fn get_range(&self) -> Option<&ValueRange> {
        self.range.as_ref()
    }

    /// Byte length of a string type whose length range is a single value.
    fn fixed_length(&self) -> Option<usize> {
        match self.kind {
            SubatomicType::String | SubatomicType::Blob | SubatomicType::Blob32 => {
                self.range.as_ref().and_then(ValueRange::single_length)
            }
            _ => None,
        }
    }

    fn fixed_byte_size(&self) -> Option<usize> {
        self.kind.fixed_width().or_else(|| self.fixed_length())
    }

    pub(crate) fn layout(&self) -> Layout {
        let fixed_byte_size = self.fixed_byte_size();
        let pack_type = if self.divisor > 1 && self.kind.is_integer() {
            PackType::Double
        } else {
            self.kind.pack_type()
        };
        Layout {
            fixed_byte_size,
            has_fixed_structure: fixed_byte_size.is_some(),
            has_range_limits: self.range.is_some(),
            num_length_bytes: match fixed_byte_size {
                Some(_) => 0,
                None => self.kind.length_tag_width(),
            },
            has_nested_fields: false,
            num_nested_fields: Some(0),
            pack_type,
        }
    }

    pub(crate) fn pack_scalar(&self, data: &mut PackData, value: Scalar) -> PackFlags {
        if self.kind.is_bytes() {
            return PackFlags::PACK_ERROR;
        }

        let mut flags = PackFlags::OK;
        if let Some(range) = &self.range {
            if !range.contains(value) {
                flags.set_range_error();
            }
        }

        let divisor = self.divisor;
        match self.kind {
            SubatomicType::Float64 => {
                let stored = value.to_f64() * divisor as f64;
                let slot = data.write_slot(8);
                // SAFETY: the slot is 8 bytes.
                unsafe { codec::do_pack_float64(slot.as_mut_ptr(), stored) };
            }
            kind if kind.is_signed() => {
                let (stored, fits) = scale_signed(value, divisor);
                if !fits {
                    flags.set_range_error();
                }
                flags |= codec::validate_int64_limits(stored, kind.num_bits());
                write_signed(data, kind, stored);
            }
            kind => {
                let (stored, fits) = scale_unsigned(value, divisor);
                if !fits {
                    flags.set_range_error();
                }
                flags |= codec::validate_uint64_limits(stored, kind.num_bits());
                write_unsigned(data, kind, stored);
            }
        }
        flags
    }

    fn unpack_stored(&self, data: &[u8], p: &mut usize) -> Option<Scalar> {
        if self.kind.is_bytes() {
            return None;
        }
        let width = self.kind.fixed_width()?;
        let buffer = take(data, p, width)?.as_ptr();
        // SAFETY: `take` returned exactly `width` bytes for this type.
        Some(unsafe {
            match self.kind {
                SubatomicType::Int8 => Scalar::Int(codec::do_unpack_int8(buffer) as i64),
                SubatomicType::Int16 => Scalar::Int(codec::do_unpack_int16(buffer) as i64),
                SubatomicType::Int32 => Scalar::Int(codec::do_unpack_int32(buffer) as i64),
                SubatomicType::Int64 => Scalar::Int(codec::do_unpack_int64(buffer)),
                SubatomicType::UInt8 => Scalar::UInt(codec::do_unpack_uint8(buffer) as u64),
                SubatomicType::UInt16 => Scalar::UInt(codec::do_unpack_uint16(buffer) as u64),
                SubatomicType::UInt32 => Scalar::UInt(codec::do_unpack_uint32(buffer) as u64),
                SubatomicType::UInt64 => Scalar::UInt(codec::do_unpack_uint64(buffer)),
                _ => Scalar::Double(codec::do_unpack_float64(buffer)),
            }
        })
    }

    /// Decodes a number in user units, checking the declared range.
    pub(crate) fn unpack_scalar(&self, data: &[u8], p: &mut usize) -> Flagged<Scalar> {
        let Some(stored) = self.unpack_stored(data, p) else {
            return Flagged::pack_error();
        };
        let value = match self.divisor {
            1 => stored,
            divisor => Scalar::Double(stored.to_f64() / divisor as f64),
        };
        let mut flags = PackFlags::OK;
        if let Some(range) = &self.range {
            if !range.contains(value) {
                flags.set_range_error();
            }
        }
        Flagged::new(value, flags)
    }

    pub(crate) fn unpack_double(&self, data: &[u8], p: &mut usize) -> Flagged<f64> {
        self.unpack_scalar(data, p).map(Scalar::to_f64)
    }

    pub(crate) fn unpack_int64(&self, data: &[u8], p: &mut usize) -> Flagged<i64> {
        let Flagged { value, mut flags } = self.unpack_scalar(data, p);
        let (value, fits) = value.to_i64();
        if !fits {
            flags.set_range_error();
        }
        Flagged::new(value, flags)
    }

    pub(crate) fn unpack_uint64(&self, data: &[u8], p: &mut usize) -> Flagged<u64> {
        let Flagged { value, mut flags } = self.unpack_scalar(data, p);
        let (value, fits) = value.to_u64();
        if !fits {
            flags.set_range_error();
        }
        Flagged::new(value, flags)
    }

    pub(crate) fn pack_bytes(&self, data: &mut PackData, value: &[u8]) -> PackFlags {
        match self.kind {
            SubatomicType::Char => {
                if value.len() != 1 {
                    return PackFlags::PACK_ERROR;
                }
                data.append_data(value);
                PackFlags::OK
            }
            SubatomicType::String | SubatomicType::Blob | SubatomicType::Blob32 => {
                let mut flags = PackFlags::OK;
                if let Some(range) = &self.range {
                    if !range.contains_length(value.len()) {
                        flags.set_range_error();
                    }
                }
                match self.fixed_length() {
                    Some(length) => {
                        // The layout is fixed, so the value is padded or cut to fit.
                        let slot = data.write_slot(length);
                        let n = length.min(value.len());
                        slot[..n].copy_from_slice(&value[..n]);
                    }
                    None => {
                        flags |= write_length_tag(data, self.kind.length_tag_width(), value.len());
                        if flags.pack_error {
                            return flags;
                        }
                        data.append_data(value);
                    }
                }
                flags
            }
            _ => PackFlags::PACK_ERROR,
        }
    }

    pub(crate) fn unpack_bytes<'a>(&self, data: &'a [u8], p: &mut usize) -> Flagged<&'a [u8]> {
        let start = *p;
        let bytes = match self.kind {
            SubatomicType::Char => take(data, p, 1),
            SubatomicType::String | SubatomicType::Blob | SubatomicType::Blob32 => {
                match self.fixed_length() {
                    Some(length) => take(data, p, length),
                    None => read_length_tag(data, p, self.kind.length_tag_width())
                        .and_then(|length| take(data, p, length)),
                }
            }
            _ => None,
        };
        let Some(bytes) = bytes else {
            *p = start;
            return Flagged::pack_error();
        };
        let mut flags = PackFlags::OK;
        if let Some(range) = &self.range {
            if self.kind != SubatomicType::Char && !range.contains_length(bytes.len()) {
                flags.set_range_error();
            }
        }
        Flagged::new(bytes, flags)
    }

    pub(crate) fn unpack_validate(&self, data: &[u8], p: &mut usize) -> PackFlags {
        if self.kind.is_bytes() {
            self.unpack_bytes(data, p).flags
        } else {
            self.unpack_scalar(data, p).flags
        }
    }

    pub(crate) fn unpack_skip(&self, data: &[u8], p: &mut usize) -> PackFlags {
        match self.fixed_byte_size() {
            Some(size) => skip_bytes(data, p, size),
            None => {
                let start = *p;
                match read_length_tag(data, p, self.kind.length_tag_width())
                    .and_then(|length| take(data, p, length))
                {
                    Some(_) => PackFlags::OK,
                    None => {
                        *p = start;
                        PackFlags::PACK_ERROR
                    }
                }
            }
        }
    }

    /// Writes zero, or the range minimum when zero is out of range; strings
    /// get the shortest allowed run of zero bytes.
    pub(crate) fn pack_default_value(&self, data: &mut PackData) -> PackFlags {
        if self.kind.is_bytes() {
            let length = match (self.kind, &self.range) {
                (SubatomicType::Char, _) => 1,
                (_, Some(range)) => range.minimum().to_u64().0 as usize,
                (_, None) => 0,
            };
            self.pack_bytes(data, &vec![0; length])
        } else {
            let value = match &self.range {
                Some(range) if !range.contains(Scalar::Int(0)) => range.minimum(),
                _ => Scalar::Int(0),
            };
            self.pack_scalar(data, value)
        }
    }

    pub(crate) fn do_check_match_simple_parameter(&self, other: &SimpleParameter) -> bool {
        self == other
    }
}

fn scale_signed(value: Scalar, divisor: u32) -> (i64, bool) {
    match value {
        Scalar::Double(v) => Scalar::Double((v * divisor as f64).round()).to_i64(),
        value => {
            let (v, fits) = value.to_i64();
            match v.checked_mul(divisor as i64) {
                Some(stored) => (stored, fits),
                None => (v.wrapping_mul(divisor as i64), false),
            }
        }
    }
}

fn scale_unsigned(value: Scalar, divisor: u32) -> (u64, bool) {
    match value {
        Scalar::Double(v) => Scalar::Double((v * divisor as f64).round()).to_u64(),
        value => {
            let (v, fits) = value.to_u64();
            match v.checked_mul(divisor as u64) {
                Some(stored) => (stored, fits),
                None => (v.wrapping_mul(divisor as u64), false),
            }
        }
    }
}

fn write_signed(data: &mut PackData, kind: SubatomicType, value: i64) {
    let slot = data.write_slot(kind.fixed_width().unwrap_or(8));
    let buffer = slot.as_mut_ptr();
    // SAFETY: the slot is exactly as wide as `kind`.
    unsafe {
        match kind {
            SubatomicType::Int8 => codec::do_pack_int8(buffer, value as i8),
            SubatomicType::Int16 => codec::do_pack_int16(buffer, value as i16),
            SubatomicType::Int32 => codec::do_pack_int32(buffer, value as i32),
            _ => codec::do_pack_int64(buffer, value),
        }
    }
}

fn write_unsigned(data: &mut PackData, kind: SubatomicType, value: u64) {
    let slot = data.write_slot(kind.fixed_width().unwrap_or(8));
    let buffer = slot.as_mut_ptr();
    // SAFETY: the slot is exactly as wide as `kind`.
    unsafe {
        match kind {
            SubatomicType::UInt8 => codec::do_pack_uint8(buffer, value as u8),
            SubatomicType::UInt16 => codec::do_pack_uint16(buffer, value as u16),
            SubatomicType::UInt32 => codec::do_pack_uint32(buffer, value as u32),
            _ => codec::do_pack_uint64(buffer, value),
        }
    }
}
