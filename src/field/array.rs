use crate::{
    Flagged, PackData, PackFlags, PackType, SubatomicType,
    codec::{LENGTH_TAG_BYTES, LengthTag},
};

use super::{FieldKind, FieldRef, Layout, read_length_tag, skip_bytes, take, write_length_tag};

/// The number of elements an array may hold.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ArraySize {
    min: usize,
    max: Option<usize>,
}

impl Default for ArraySize {
    #[inline]
    fn default() -> Self {
        Self::any()
    }
}

impl ArraySize {
    #[inline]
    pub const fn any() -> Self {
        Self { min: 0, max: None }
    }

    #[inline]
    pub const fn fixed(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    #[inline]
    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    #[inline]
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    #[inline]
    pub const fn min(&self) -> usize {
        self.min
    }

    #[inline]
    pub const fn max(&self) -> Option<usize> {
        self.max
    }

    /// The element count if every array of this size holds the same number.
    #[inline]
    pub const fn fixed_count(&self) -> Option<usize> {
        match self.max {
            Some(max) if max == self.min => Some(max),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    #[inline]
    const fn is_unbounded(&self) -> bool {
        self.min == 0 && self.max.is_none()
    }
}

/// A homogeneous list of elements of one field type.
///
/// An array with a fixed count of fixed-size elements has a fixed byte size
/// and no wire marker. Every other array is preceded by a length tag holding
/// the byte length of its elements.
#[derive(Clone, Debug)]
pub struct ArrayParameter {
    element: FieldRef,
    size: ArraySize,
}

impl ArrayParameter {
    #[inline]
    pub fn new(element: FieldRef, size: ArraySize) -> Self {
        Self { element, size }
    }

    #[inline]
    pub fn element(&self) -> &FieldRef {
        &self.element
    }

    #[inline]
    pub fn size(&self) -> ArraySize {
        self.size
    }

    fn fixed_byte_size(&self) -> Option<usize> {
        Some(self.size.fixed_count()? * self.element.get_fixed_byte_size()?)
    }

    #[inline]
    pub(crate) fn has_length_tag(&self) -> bool {
        self.fixed_byte_size().is_none()
    }

    pub(crate) fn layout(&self) -> Layout {
        let fixed_byte_size = self.fixed_byte_size();
        Layout {
            fixed_byte_size,
            has_fixed_structure: self.element.has_fixed_structure()
                && self.size.fixed_count().is_some(),
            has_range_limits: self.element.has_range_limits() || !self.size.is_unbounded(),
            num_length_bytes: match fixed_byte_size {
                Some(_) => 0,
                None => LENGTH_TAG_BYTES,
            },
            has_nested_fields: true,
            num_nested_fields: self.size.fixed_count(),
            pack_type: PackType::Array,
        }
    }

    pub(crate) fn calc_num_nested_fields(&self, length_bytes: usize) -> Option<usize> {
        match self.element.get_fixed_byte_size() {
            Some(0) | None => None,
            Some(size) => Some(length_bytes / size),
        }
    }

    pub(crate) fn nested_field(&self, n: usize) -> Option<&FieldRef> {
        match self.size.fixed_count() {
            Some(count) if n >= count => None,
            _ => Some(&self.element),
        }
    }

    /// Arrays of one-byte integers or chars can also be packed as a blob.
    pub(crate) fn is_byte_array(&self) -> bool {
        match self.element.kind() {
            FieldKind::Simple(simple) => {
                simple.get_divisor() == 1
                    && matches!(
                        simple.get_type(),
                        SubatomicType::Int8 | SubatomicType::UInt8 | SubatomicType::Char
                    )
            }
            _ => false,
        }
    }

    pub(crate) fn pack_bytes(&self, data: &mut PackData, value: &[u8]) -> PackFlags {
        if !self.is_byte_array() {
            return PackFlags::PACK_ERROR;
        }
        let mut flags = PackFlags::OK;
        if !self.size.contains(value.len()) {
            flags.set_range_error();
        }
        match self.fixed_byte_size() {
            Some(length) => {
                let slot = data.write_slot(length);
                let n = length.min(value.len());
                slot[..n].copy_from_slice(&value[..n]);
            }
            None => {
                flags |= write_length_tag(data, LENGTH_TAG_BYTES, value.len());
                if flags.pack_error {
                    return flags;
                }
                data.append_data(value);
            }
        }
        flags
    }

    pub(crate) fn unpack_bytes<'a>(&self, data: &'a [u8], p: &mut usize) -> Flagged<&'a [u8]> {
        if !self.is_byte_array() {
            return Flagged::pack_error();
        }
        let start = *p;
        let bytes = match self.fixed_byte_size() {
            Some(length) => take(data, p, length),
            None => read_length_tag(data, p, LENGTH_TAG_BYTES)
                .and_then(|length| take(data, p, length)),
        };
        let Some(bytes) = bytes else {
            *p = start;
            return Flagged::pack_error();
        };
        let mut flags = PackFlags::OK;
        if !self.size.contains(bytes.len()) {
            flags.set_range_error();
        }
        Flagged::new(bytes, flags)
    }

    pub(crate) fn unpack_skip(&self, data: &[u8], p: &mut usize) -> PackFlags {
        if let Some(size) = self.fixed_byte_size() {
            return skip_bytes(data, p, size);
        }
        let start = *p;
        match read_length_tag(data, p, LENGTH_TAG_BYTES).and_then(|length| take(data, p, length)) {
            Some(_) => PackFlags::OK,
            None => {
                *p = start;
                PackFlags::PACK_ERROR
            }
        }
    }

    pub(crate) fn unpack_validate(&self, data: &[u8], p: &mut usize) -> PackFlags {
        let start = *p;
        let mut flags = PackFlags::OK;
        let mut count = 0;

        match self.size.fixed_count().filter(|_| !self.has_length_tag()) {
            Some(fixed) => {
                for _ in 0..fixed {
                    flags |= self.element.unpack_validate(data, p);
                    if flags.pack_error {
                        *p = start;
                        return flags;
                    }
                }
                count = fixed;
            }
            None => {
                let Some(end) = read_length_tag(data, p, LENGTH_TAG_BYTES)
                    .and_then(|length| p.checked_add(length))
                    .filter(|&end| end <= data.len())
                else {
                    *p = start;
                    return PackFlags::PACK_ERROR;
                };
                // Elements may not read past the end of the array.
                let body = &data[..end];
                while *p < end {
                    let before = *p;
                    flags |= self.element.unpack_validate(body, p);
                    if flags.pack_error || *p == before {
                        *p = start;
                        return PackFlags::PACK_ERROR;
                    }
                    count += 1;
                }
            }
        }

        if !self.size.contains(count) {
            flags.set_range_error();
        }
        flags
    }

    /// Writes the minimum number of element defaults.
    pub(crate) fn pack_default_value(&self, data: &mut PackData) -> Option<PackFlags> {
        let mut flags = PackFlags::OK;
        if !self.has_length_tag() {
            for _ in 0..self.size.min() {
                flags |= self.element.pack_default_value(data)?;
            }
            return Some(flags);
        }

        let tag_offset = data.get_length();
        data.append_length_tag(0);
        let body_start = data.get_length();
        for _ in 0..self.size.min() {
            flags |= self.element.pack_default_value(data)?;
        }
        match LengthTag::try_from(data.get_length() - body_start) {
            Ok(length) => {
                data.patch_length_tag(tag_offset, length);
            }
            Err(_) => flags.set_pack_error(),
        }
        Some(flags)
    }

    pub(crate) fn do_check_match_array_parameter(&self, other: &ArrayParameter) -> bool {
        self.size == other.size && self.element.check_match(&other.element)
    }
}
