use crate::codec::{self, LengthTag};

/// Append-only output buffer for packing.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct PackData {
    buffer: Vec<u8>,
}

impl PackData {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Grows the buffer by `size` zeroed bytes and returns them.
    ///
    /// The returned slot is exactly `size` bytes long, so it is always a
    /// valid target for the unchecked `do_pack_*` functions of that width.
    #[inline]
    pub fn write_slot(&mut self, size: usize) -> &mut [u8] {
        let start = self.buffer.len();
        self.buffer.resize(start + size, 0);
        &mut self.buffer[start..]
    }

    #[inline]
    pub fn append_data(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Appends a [`LengthTag`].
    #[inline]
    pub fn append_length_tag(&mut self, value: LengthTag) {
        let slot = self.write_slot(codec::LENGTH_TAG_BYTES);
        unsafe { codec::do_pack_length_tag(slot.as_mut_ptr(), value) };
    }

    /// Overwrites a previously reserved length tag at `offset`.
    ///
    /// Returns `false` if `offset` does not name a full tag inside the buffer.
    pub fn patch_length_tag(&mut self, offset: usize, value: LengthTag) -> bool {
        match self.buffer.get_mut(offset..offset + codec::LENGTH_TAG_BYTES) {
            Some(slot) => {
                unsafe { codec::do_pack_length_tag(slot.as_mut_ptr(), value) };
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn get_length(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Drops everything written after the first `length` bytes.
    #[inline]
    pub fn truncate(&mut self, length: usize) {
        self.buffer.truncate(length);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    /// Converts the packed bytes into a shared, reference-counted buffer.
    #[cfg(feature = "shared")]
    #[inline]
    pub fn freeze(self) -> bytes::Bytes {
        bytes::Bytes::from(self.buffer)
    }
}

impl AsRef<[u8]> for PackData {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.buffer
    }
}

impl From<PackData> for Vec<u8> {
    #[inline]
    fn from(value: PackData) -> Self {
        value.buffer
    }
}
