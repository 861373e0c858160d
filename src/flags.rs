use std::ops::{BitOr, BitOrAssign};

use crate::{Error, Result};

/// The two independent error signals every pack and unpack call reports.
///
/// `pack_error` means the field kind cannot represent the value at all (or the
/// buffer is too short to hold it). `range_error` means the value was encoded
/// but violates a declared bound. Flags from several calls combine with `|`,
/// so a record can be walked to the end and judged once.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct PackFlags {
    pub pack_error: bool,
    pub range_error: bool,
}

impl PackFlags {
    pub const OK: Self = Self {
        pack_error: false,
        range_error: false,
    };

    pub const PACK_ERROR: Self = Self {
        pack_error: true,
        range_error: false,
    };

    pub const RANGE_ERROR: Self = Self {
        pack_error: false,
        range_error: true,
    };

    #[inline]
    pub const fn is_ok(self) -> bool {
        !self.pack_error && !self.range_error
    }

    #[inline]
    pub fn set_pack_error(&mut self) {
        self.pack_error = true;
    }

    #[inline]
    pub fn set_range_error(&mut self) {
        self.range_error = true;
    }

    /// Converts the flags into a `Result`, with a pack error taking priority
    /// over a range error.
    pub fn into_result(self) -> Result<()> {
        if self.pack_error {
            Err(Error::PackError)
        } else if self.range_error {
            Err(Error::RangeError)
        } else {
            Ok(())
        }
    }
}

impl BitOr for PackFlags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self {
            pack_error: self.pack_error | rhs.pack_error,
            range_error: self.range_error | rhs.range_error,
        }
    }
}

impl BitOrAssign for PackFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// A decoded value together with the flags raised while producing it.
///
/// When `flags.pack_error` is set, `value` holds the type's default and should
/// not be trusted.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Flagged<T> {
    pub value: T,
    pub flags: PackFlags,
}

impl<T> Flagged<T> {
    #[inline]
    pub const fn new(value: T, flags: PackFlags) -> Self {
        Self { value, flags }
    }

    #[inline]
    pub fn ok(value: T) -> Self {
        Self::new(value, PackFlags::OK)
    }

    pub fn into_result(self) -> Result<T> {
        self.flags.into_result().map(|()| self.value)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Flagged<U> {
        Flagged::new(f(self.value), self.flags)
    }
}

impl<T: Default> Flagged<T> {
    #[inline]
    pub fn pack_error() -> Self {
        Self::new(T::default(), PackFlags::PACK_ERROR)
    }
}
