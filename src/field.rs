use std::{
    fmt,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU32, Ordering},
    },
};

use crate::{
    Error, Flagged, PackData, PackFlags, PackType, PackerCatalog, Result,
    codec::{self, BLOB32_TAG_BYTES, LENGTH_TAG_BYTES},
};

mod array;
mod atomic;
mod class;
mod simple;
mod switch;

pub use array::*;
pub use atomic::*;
pub use class::*;
pub use simple::*;
pub use switch::*;

use simple::Scalar;

/// Shared handle to an immutable field.
pub type FieldRef = Arc<Field>;

static NEXT_FIELD_ID: AtomicU32 = AtomicU32::new(1);

/// Stable identity of a field or switch case, assigned at construction.
///
/// Catalogs key their lookups by `FieldId` instead of by address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldId(u32);

impl FieldId {
    pub(crate) fn next() -> Self {
        Self(NEXT_FIELD_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Layout metadata computed once when a field is constructed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Layout {
    pub(crate) fixed_byte_size: Option<usize>,
    pub(crate) has_fixed_structure: bool,
    pub(crate) has_range_limits: bool,
    pub(crate) num_length_bytes: usize,
    pub(crate) has_nested_fields: bool,
    /// `None` when the count depends on the data (variable arrays).
    pub(crate) num_nested_fields: Option<usize>,
    pub(crate) pack_type: PackType,
}

impl Layout {
    /// Layout of a list of fields packed back to back with no marker.
    pub(crate) fn sequence(fields: &[FieldRef], pack_type: PackType) -> Self {
        let fixed_byte_size = fields
            .iter()
            .try_fold(0usize, |total, field| Some(total + field.get_fixed_byte_size()?));
        Self {
            fixed_byte_size,
            has_fixed_structure: fields.iter().all(|field| field.has_fixed_structure()),
            has_range_limits: fields.iter().any(|field| field.has_range_limits()),
            num_length_bytes: 0,
            has_nested_fields: true,
            num_nested_fields: Some(fields.len()),
            pack_type,
        }
    }
}

/// The closed set of field kinds.
#[derive(Clone, Debug)]
pub enum FieldKind {
    Simple(SimpleParameter),
    Array(ArrayParameter),
    Class(ClassParameter),
    Switch(SwitchParameter),
    Atomic(AtomicField),
    Molecular(MolecularField),
}

impl FieldKind {
    fn layout(&self) -> Layout {
        match self {
            FieldKind::Simple(simple) => simple.layout(),
            FieldKind::Array(array) => array.layout(),
            FieldKind::Class(class) => Layout::sequence(class.fields(), PackType::Class),
            FieldKind::Switch(switch) => switch.layout(),
            FieldKind::Atomic(atomic) => Layout::sequence(atomic.parameters(), PackType::Field),
            FieldKind::Molecular(molecular) => {
                Layout::sequence(molecular.parameters(), PackType::Field)
            }
        }
    }

    /// The fields packed back to back for the record-like kinds.
    pub(crate) fn members(&self) -> Option<&[FieldRef]> {
        match self {
            FieldKind::Class(class) => Some(class.fields()),
            FieldKind::Atomic(atomic) => Some(atomic.parameters()),
            FieldKind::Molecular(molecular) => Some(molecular.parameters()),
            _ => None,
        }
    }

    const fn kind_name(&self) -> &'static str {
        match self {
            FieldKind::Simple(_) => "simple",
            FieldKind::Array(_) => "array",
            FieldKind::Class(_) => "class",
            FieldKind::Switch(_) => "switch",
            FieldKind::Atomic(_) => "atomic",
            FieldKind::Molecular(_) => "molecular",
        }
    }
}

macro_rules! impl_from_kind {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for FieldKind {
                #[inline]
                fn from(value: $ty) -> Self {
                    FieldKind::$variant(value)
                }
            }
        )*
    };
}

impl_from_kind!(
    Simple(SimpleParameter),
    Array(ArrayParameter),
    Class(ClassParameter),
    Switch(SwitchParameter),
    Atomic(AtomicField),
    Molecular(MolecularField),
);

/// A node in a schema tree describing one unit of packable data.
///
/// Fields are immutable once built. The first call to
/// [`get_catalog`](Field::get_catalog) builds the field's catalog, which the
/// field then owns for the rest of its life.
pub struct Field {
    id: FieldId,
    name: String,
    kind: FieldKind,
    layout: Layout,
    default_value: Option<Box<[u8]>>,
    catalog: OnceLock<Box<PackerCatalog>>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default_value", &self.default_value)
            .finish()
    }
}

impl Field {
    pub fn new(name: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
        let kind = kind.into();
        Self {
            id: FieldId::next(),
            name: name.into(),
            layout: kind.layout(),
            kind,
            default_value: None,
            catalog: OnceLock::new(),
        }
    }

    /// Declares explicit default bytes, returned verbatim by
    /// [`pack_default_value`](Field::pack_default_value).
    pub fn with_default_value(mut self, bytes: impl Into<Box<[u8]>>) -> Self {
        self.default_value = Some(bytes.into());
        self
    }

    #[inline]
    pub fn into_ref(self) -> FieldRef {
        Arc::new(self)
    }

    /// A copy sharing identity and children but not the catalog.
    pub(crate) fn detached(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind.clone(),
            layout: self.layout,
            default_value: self.default_value.clone(),
            catalog: OnceLock::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> FieldId {
        self.id
    }

    #[inline]
    pub fn get_name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    #[inline]
    pub fn has_default_value(&self) -> bool {
        self.default_value.is_some()
    }

    #[inline]
    pub fn get_default_value(&self) -> Option<&[u8]> {
        self.default_value.as_deref()
    }

    #[inline]
    pub fn as_switch_parameter(&self) -> Option<&SwitchParameter> {
        match &self.kind {
            FieldKind::Switch(switch) => Some(switch),
            _ => None,
        }
    }

    #[inline]
    pub fn as_class_parameter(&self) -> Option<&ClassParameter> {
        match &self.kind {
            FieldKind::Class(class) => Some(class),
            _ => None,
        }
    }

    #[inline]
    pub fn get_pack_type(&self) -> PackType {
        self.layout.pack_type
    }

    #[inline]
    pub fn has_fixed_byte_size(&self) -> bool {
        self.layout.fixed_byte_size.is_some()
    }

    #[inline]
    pub fn get_fixed_byte_size(&self) -> Option<usize> {
        self.layout.fixed_byte_size
    }

    /// Returns `true` if the nested layout, and so every byte offset inside
    /// a record, is the same for every record.
    #[inline]
    pub fn has_fixed_structure(&self) -> bool {
        self.layout.has_fixed_structure
    }

    #[inline]
    pub fn has_range_limits(&self) -> bool {
        self.layout.has_range_limits
    }

    #[inline]
    pub fn get_num_length_bytes(&self) -> usize {
        self.layout.num_length_bytes
    }

    #[inline]
    pub fn has_nested_fields(&self) -> bool {
        self.layout.has_nested_fields
    }

    /// Number of immediate children, or `None` if it depends on the data.
    #[inline]
    pub fn get_num_nested_fields(&self) -> Option<usize> {
        self.layout.num_nested_fields
    }

    /// Number of nested fields that follow a length tag announcing
    /// `length_bytes` bytes, if that can be known without decoding them.
    pub fn calc_num_nested_fields(&self, length_bytes: usize) -> Option<usize> {
        match &self.kind {
            FieldKind::Array(array) => array.calc_num_nested_fields(length_bytes),
            _ => self.layout.num_nested_fields,
        }
    }

    pub fn get_nested_field(&self, n: usize) -> Option<&FieldRef> {
        match &self.kind {
            FieldKind::Simple(_) => None,
            FieldKind::Array(array) => array.nested_field(n),
            FieldKind::Switch(switch) => (n == 0).then(|| switch.key()),
            kind => kind.members().and_then(|members| members.get(n)),
        }
    }

    /// Returns `false` if `num_nested_fields` violates a declared count.
    pub fn validate_num_nested_fields(&self, num_nested_fields: usize) -> bool {
        match &self.kind {
            FieldKind::Array(array) => array.size().contains(num_nested_fields),
            _ => true,
        }
    }

    /// Index of the catalog entry called `name`, if any.
    #[inline]
    pub fn find_seek_index(&self, name: &str) -> Option<usize> {
        self.get_catalog().find_entry_by_name(name)
    }

    /// Returns the catalog of every field nested under this one.
    ///
    /// The catalog is built on first request and cached for the lifetime of
    /// the field. Concurrent first requests build it once.
    pub fn get_catalog(&self) -> &PackerCatalog {
        self.catalog.get_or_init(|| Box::new(PackerCatalog::build(self)))
    }

    pub fn pack_double(&self, data: &mut PackData, value: f64) -> PackFlags {
        match &self.kind {
            FieldKind::Simple(simple) => simple.pack_scalar(data, Scalar::Double(value)),
            _ => PackFlags::PACK_ERROR,
        }
    }

    pub fn pack_int(&self, data: &mut PackData, value: i32) -> PackFlags {
        self.pack_int64(data, value as i64)
    }

    pub fn pack_uint(&self, data: &mut PackData, value: u32) -> PackFlags {
        self.pack_uint64(data, value as u64)
    }

    pub fn pack_int64(&self, data: &mut PackData, value: i64) -> PackFlags {
        match &self.kind {
            FieldKind::Simple(simple) => simple.pack_scalar(data, Scalar::Int(value)),
            _ => PackFlags::PACK_ERROR,
        }
    }

    pub fn pack_uint64(&self, data: &mut PackData, value: u64) -> PackFlags {
        match &self.kind {
            FieldKind::Simple(simple) => simple.pack_scalar(data, Scalar::UInt(value)),
            _ => PackFlags::PACK_ERROR,
        }
    }

    pub fn pack_string(&self, data: &mut PackData, value: &str) -> PackFlags {
        self.pack_blob(data, value.as_bytes())
    }

    pub fn pack_blob(&self, data: &mut PackData, value: &[u8]) -> PackFlags {
        match &self.kind {
            FieldKind::Simple(simple) => simple.pack_bytes(data, value),
            FieldKind::Array(array) => array.pack_bytes(data, value),
            _ => PackFlags::PACK_ERROR,
        }
    }

    /// Writes the field's default value.
    ///
    /// Returns `None` if no default can be produced, which only happens for a
    /// switch whose default key selects no case. The sink is then rolled back
    /// to its length on entry.
    pub fn pack_default_value(&self, data: &mut PackData) -> Option<PackFlags> {
        let start = data.get_length();
        let flags = self.write_default_value(data);
        if flags.is_none() {
            data.truncate(start);
        }
        flags
    }

    fn write_default_value(&self, data: &mut PackData) -> Option<PackFlags> {
        if let Some(bytes) = &self.default_value {
            data.append_data(bytes);
            return Some(PackFlags::OK);
        }
        match &self.kind {
            FieldKind::Simple(simple) => Some(simple.pack_default_value(data)),
            FieldKind::Array(array) => array.pack_default_value(data),
            FieldKind::Switch(switch) => switch.pack_default_value(data),
            kind => {
                let mut flags = PackFlags::OK;
                for member in kind.members().unwrap_or_default() {
                    flags |= member.pack_default_value(data)?;
                }
                Some(flags)
            }
        }
    }

    pub fn unpack_double(&self, data: &[u8], p: &mut usize) -> Flagged<f64> {
        match &self.kind {
            FieldKind::Simple(simple) => simple.unpack_double(data, p),
            _ => Flagged::pack_error(),
        }
    }

    pub fn unpack_int(&self, data: &[u8], p: &mut usize) -> Flagged<i32> {
        let Flagged { value, mut flags } = self.unpack_int64(data, p);
        let narrowed = i32::try_from(value).unwrap_or_else(|_| {
            flags.set_range_error();
            value as i32
        });
        Flagged::new(narrowed, flags)
    }

    pub fn unpack_uint(&self, data: &[u8], p: &mut usize) -> Flagged<u32> {
        let Flagged { value, mut flags } = self.unpack_uint64(data, p);
        let narrowed = u32::try_from(value).unwrap_or_else(|_| {
            flags.set_range_error();
            value as u32
        });
        Flagged::new(narrowed, flags)
    }

    pub fn unpack_int64(&self, data: &[u8], p: &mut usize) -> Flagged<i64> {
        match &self.kind {
            FieldKind::Simple(simple) => simple.unpack_int64(data, p),
            _ => Flagged::pack_error(),
        }
    }

    pub fn unpack_uint64(&self, data: &[u8], p: &mut usize) -> Flagged<u64> {
        match &self.kind {
            FieldKind::Simple(simple) => simple.unpack_uint64(data, p),
            _ => Flagged::pack_error(),
        }
    }

    /// Decodes a string, flagging a pack error if the bytes are not UTF-8.
    pub fn unpack_string(&self, data: &[u8], p: &mut usize) -> Flagged<String> {
        let start = *p;
        let Flagged { value, flags } = self.unpack_blob(data, p);
        match String::from_utf8(value) {
            Ok(value) => Flagged::new(value, flags),
            Err(_) => {
                *p = start;
                Flagged::pack_error()
            }
        }
    }

    pub fn unpack_blob(&self, data: &[u8], p: &mut usize) -> Flagged<Vec<u8>> {
        let bytes = match &self.kind {
            FieldKind::Simple(simple) => simple.unpack_bytes(data, p),
            FieldKind::Array(array) => array.unpack_bytes(data, p),
            _ => Flagged::pack_error(),
        };
        bytes.map(<[u8]>::to_vec)
    }

    /// Advances `p` past this field's bytes, checking that they decode and
    /// respect every declared range.
    pub fn unpack_validate(&self, data: &[u8], p: &mut usize) -> PackFlags {
        match &self.kind {
            FieldKind::Simple(simple) => simple.unpack_validate(data, p),
            FieldKind::Array(array) => array.unpack_validate(data, p),
            FieldKind::Switch(switch) => switch.unpack_walk(data, p, Field::unpack_validate),
            kind => {
                let mut flags = PackFlags::OK;
                for member in kind.members().unwrap_or_default() {
                    flags |= member.unpack_validate(data, p);
                    if flags.pack_error {
                        break;
                    }
                }
                flags
            }
        }
    }

    /// Advances `p` past this field's bytes without validating them.
    pub fn unpack_skip(&self, data: &[u8], p: &mut usize) -> PackFlags {
        if let Some(size) = self.layout.fixed_byte_size {
            return skip_bytes(data, p, size);
        }
        match &self.kind {
            FieldKind::Simple(simple) => simple.unpack_skip(data, p),
            FieldKind::Array(array) => array.unpack_skip(data, p),
            FieldKind::Switch(switch) => switch.unpack_walk(data, p, Field::unpack_skip),
            kind => {
                for member in kind.members().unwrap_or_default() {
                    if member.unpack_skip(data, p).pack_error {
                        return PackFlags::PACK_ERROR;
                    }
                }
                PackFlags::OK
            }
        }
    }

    /// Structural equality with a field built independently, e.g. from a
    /// second copy of the same schema.
    pub fn check_match(&self, other: &Field) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.kind, &other.kind) {
            (FieldKind::Simple(a), FieldKind::Simple(b)) => a.do_check_match_simple_parameter(b),
            (FieldKind::Class(a), FieldKind::Class(b)) => a.do_check_match_class_parameter(b),
            (FieldKind::Switch(a), FieldKind::Switch(b)) => a.do_check_match_switch_parameter(b),
            (FieldKind::Array(a), FieldKind::Array(b)) => a.do_check_match_array_parameter(b),
            (FieldKind::Atomic(a), FieldKind::Atomic(b)) => a.do_check_match_atomic_field(b),
            (FieldKind::Molecular(a), FieldKind::Molecular(b)) => {
                a.do_check_match_molecular_field(b)
            }
            _ => false,
        }
    }

    /// Like [`check_match`](Field::check_match), but reports the mismatch.
    pub fn ensure_match(&self, other: &Field) -> Result<()> {
        if self.check_match(other) {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                expected: format!("{} {}", self.kind.kind_name(), self.name),
                found: format!("{} {}", other.kind.kind_name(), other.name),
            })
        }
    }
}

pub(crate) fn check_match_all(a: &[FieldRef], b: &[FieldRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.check_match(b))
}

/// Advances `p` by `size`, flagging a pack error if that leaves the buffer.
#[inline]
pub(crate) fn skip_bytes(data: &[u8], p: &mut usize, size: usize) -> PackFlags {
    match take(data, p, size) {
        Some(_) => PackFlags::OK,
        None => PackFlags::PACK_ERROR,
    }
}

/// Returns the next `size` bytes and advances `p`, or `None` if the buffer
/// is too short.
#[inline]
pub(crate) fn take<'a>(data: &'a [u8], p: &mut usize, size: usize) -> Option<&'a [u8]> {
    let end = p.checked_add(size)?;
    let bytes = data.get(*p..end)?;
    *p = end;
    Some(bytes)
}

/// Reads a length tag of `width` bytes (2 or 4) and advances `p` past it.
#[inline]
pub(crate) fn read_length_tag(data: &[u8], p: &mut usize, width: usize) -> Option<usize> {
    let bytes = take(data, p, width)?;
    // SAFETY: `take` returned exactly `width` bytes.
    Some(unsafe {
        match width {
            BLOB32_TAG_BYTES => codec::do_unpack_uint32(bytes.as_ptr()) as usize,
            _ => codec::do_unpack_length_tag(bytes.as_ptr()) as usize,
        }
    })
}

/// Writes a length tag of `width` bytes, flagging a pack error if `length`
/// does not fit.
#[inline]
pub(crate) fn write_length_tag(data: &mut PackData, width: usize, length: usize) -> PackFlags {
    match width {
        BLOB32_TAG_BYTES => {
            let Ok(length) = u32::try_from(length) else {
                return PackFlags::PACK_ERROR;
            };
            let slot = data.write_slot(BLOB32_TAG_BYTES);
            unsafe { codec::do_pack_uint32(slot.as_mut_ptr(), length) };
        }
        _ => {
            let Ok(length) = codec::LengthTag::try_from(length) else {
                return PackFlags::PACK_ERROR;
            };
            let slot = data.write_slot(LENGTH_TAG_BYTES);
            unsafe { codec::do_pack_length_tag(slot.as_mut_ptr(), length) };
        }
    }
    PackFlags::OK
}
