//! Low-level fixed-width codec.
//!
//! Every `do_pack_*` / `do_unpack_*` function reads or writes through a raw
//! pointer with no bounds checking. The caller is responsible for making sure
//! the buffer has room for the value and for advancing its own cursor. The
//! checked methods of [`Field`](crate::Field) validate capacity before every call.
//!
//! All values use [`WireOrder`] (little endian).

use std::ptr;

use zerocopy::byteorder;

use crate::PackFlags;

/// Byte order of every multi-byte value on the wire.
pub type WireOrder = zerocopy::LittleEndian;

/// Type of the length prefix in front of strings, blobs and variable arrays.
pub type LengthTag = u16;

/// Width in bytes of a [`LengthTag`].
pub const LENGTH_TAG_BYTES: usize = size_of::<LengthTag>();

/// Width in bytes of the length prefix of a `blob32`.
pub const BLOB32_TAG_BYTES: usize = size_of::<u32>();

macro_rules! pack_fn {
    ($name:ident, $ty:ty, $wrapper:ident) => {
        /// # Safety
        ///
        #[doc = concat!(
            "`buffer` must be valid for writes of `size_of::<",
            stringify!($ty),
            ">()` bytes."
        )]
        #[inline(always)]
        pub unsafe fn $name(buffer: *mut u8, value: $ty) {
            unsafe {
                ptr::write(
                    buffer.cast(),
                    byteorder::$wrapper::<WireOrder>::new(value).to_bytes(),
                )
            }
        }
    };
}

macro_rules! unpack_fn {
    ($name:ident, $ty:ty, $wrapper:ident) => {
        /// # Safety
        ///
        #[doc = concat!(
            "`buffer` must be valid for reads of `size_of::<",
            stringify!($ty),
            ">()` bytes."
        )]
        #[inline(always)]
        pub unsafe fn $name(buffer: *const u8) -> $ty {
            unsafe { byteorder::$wrapper::<WireOrder>::from_bytes(*buffer.cast()).get() }
        }
    };
}

/// # Safety
///
/// `buffer` must be valid for a write of one byte.
#[inline(always)]
pub unsafe fn do_pack_int8(buffer: *mut u8, value: i8) {
    unsafe { ptr::write(buffer, value as u8) }
}

/// # Safety
///
/// `buffer` must be valid for a write of one byte.
#[inline(always)]
pub unsafe fn do_pack_uint8(buffer: *mut u8, value: u8) {
    unsafe { ptr::write(buffer, value) }
}

pack_fn!(do_pack_int16, i16, I16);
pack_fn!(do_pack_int32, i32, I32);
pack_fn!(do_pack_int64, i64, I64);
pack_fn!(do_pack_uint16, u16, U16);
pack_fn!(do_pack_uint32, u32, U32);
pack_fn!(do_pack_uint64, u64, U64);
pack_fn!(do_pack_float64, f64, F64);
pack_fn!(do_pack_length_tag, LengthTag, U16);

/// # Safety
///
/// `buffer` must be valid for a read of one byte.
#[inline(always)]
pub unsafe fn do_unpack_int8(buffer: *const u8) -> i8 {
    unsafe { *buffer as i8 }
}

/// # Safety
///
/// `buffer` must be valid for a read of one byte.
#[inline(always)]
pub unsafe fn do_unpack_uint8(buffer: *const u8) -> u8 {
    unsafe { *buffer }
}

unpack_fn!(do_unpack_int16, i16, I16);
unpack_fn!(do_unpack_int32, i32, I32);
unpack_fn!(do_unpack_int64, i64, I64);
unpack_fn!(do_unpack_uint16, u16, U16);
unpack_fn!(do_unpack_uint32, u32, U32);
unpack_fn!(do_unpack_uint64, u64, U64);
unpack_fn!(do_unpack_float64, f64, F64);
unpack_fn!(do_unpack_length_tag, LengthTag, U16);

/// Flags a range error unless `value` fits in a two's-complement integer of
/// `num_bits` bits.
#[inline]
pub fn validate_int_limits(value: i32, num_bits: u32) -> PackFlags {
    validate_int64_limits(value as i64, num_bits)
}

/// Flags a range error unless `value` fits in a two's-complement integer of
/// `num_bits` bits.
#[inline]
pub fn validate_int64_limits(value: i64, num_bits: u32) -> PackFlags {
    match num_bits {
        0 if value == 0 => return PackFlags::OK,
        0 => return PackFlags::RANGE_ERROR,
        64.. => return PackFlags::OK,
        _ => {}
    }
    // All bits above the low (num_bits - 1) must match the sign bit.
    let mask = (1i64 << (num_bits - 1)) - 1;
    let high = value | mask;
    if high != mask && high != -1 {
        PackFlags::RANGE_ERROR
    } else {
        PackFlags::OK
    }
}

/// Flags a range error unless `value` fits in an unsigned integer of
/// `num_bits` bits.
#[inline]
pub fn validate_uint_limits(value: u32, num_bits: u32) -> PackFlags {
    validate_uint64_limits(value as u64, num_bits)
}

/// Flags a range error unless `value` fits in an unsigned integer of
/// `num_bits` bits.
#[inline]
pub fn validate_uint64_limits(value: u64, num_bits: u32) -> PackFlags {
    if num_bits >= 64 {
        return PackFlags::OK;
    }
    let mask = (1u64 << num_bits) - 1;
    if value & !mask != 0 {
        PackFlags::RANGE_ERROR
    } else {
        PackFlags::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_limits() {
        assert!(validate_int_limits(127, 8).is_ok());
        assert!(validate_int_limits(-128, 8).is_ok());
        assert!(validate_int_limits(128, 8).range_error);
        assert!(validate_int_limits(-129, 8).range_error);
        assert!(validate_int_limits(i32::MIN, 32).is_ok());
        assert!(validate_int64_limits(i64::MAX, 64).is_ok());
        assert!(validate_int64_limits(1 << 31, 32).range_error);
        assert!(validate_int64_limits(0, 0).is_ok());
        assert!(validate_int64_limits(-1, 0).range_error);
        assert!(validate_int_limits(1, 0).range_error);
    }

    #[test]
    fn uint_limits() {
        assert!(validate_uint_limits(255, 8).is_ok());
        assert!(validate_uint_limits(256, 8).range_error);
        assert!(validate_uint_limits(u32::MAX, 32).is_ok());
        assert!(validate_uint64_limits(u64::MAX, 64).is_ok());
        assert!(validate_uint64_limits(1 << 16, 16).range_error);
        assert!(validate_uint64_limits(0, 0).is_ok());
        assert!(validate_uint64_limits(1, 0).range_error);
    }

    #[test]
    fn little_endian_layout() {
        let mut buf = [0u8; 8];
        unsafe {
            do_pack_int16(buf.as_mut_ptr(), -2);
            assert_eq!(&buf[..2], &[0xFE, 0xFF]);
            do_pack_uint32(buf.as_mut_ptr(), 0x0102_0304);
            assert_eq!(&buf[..4], &[4, 3, 2, 1]);
            do_pack_float64(buf.as_mut_ptr(), 1.5);
            assert_eq!(do_unpack_float64(buf.as_ptr()), 1.5);
            do_pack_length_tag(buf.as_mut_ptr(), 300);
            assert_eq!(do_unpack_length_tag(buf.as_ptr()), 300);
        }
    }
}
