use crate::{FieldId, PackData, PackFlags, PackType, PackValue, Result};

use super::{Field, FieldRef, Layout, check_match_all};

/// One case of a switch: the key values selecting it and the fields that
/// follow the key when it is active.
#[derive(Clone, Debug)]
pub struct SwitchCase {
    id: FieldId,
    values: Vec<Box<[u8]>>,
    fields: Vec<FieldRef>,
}

impl SwitchCase {
    /// A case selected by a key whose packed bytes equal `value`.
    pub fn new(value: impl Into<Box<[u8]>>, fields: Vec<FieldRef>) -> Self {
        Self {
            id: FieldId::next(),
            values: vec![value.into()],
            fields,
        }
    }

    /// The case used when no other case matches.
    pub fn default_case(fields: Vec<FieldRef>) -> Self {
        Self {
            id: FieldId::next(),
            values: Vec::new(),
            fields,
        }
    }

    /// A case selected by `value`, packed with the switch's `key` field.
    pub fn from_value(key: &Field, value: &PackValue, fields: Vec<FieldRef>) -> Result<Self> {
        let mut data = PackData::new();
        key.pack_value(&mut data, value).into_result()?;
        Ok(Self::new(data.into_vec(), fields))
    }

    /// Adds another key value that falls through to this case.
    pub fn with_value(mut self, value: impl Into<Box<[u8]>>) -> Self {
        self.values.push(value.into());
        self
    }

    #[inline]
    pub fn id(&self) -> FieldId {
        self.id
    }

    #[inline]
    pub fn values(&self) -> &[Box<[u8]>] {
        &self.values
    }

    #[inline]
    pub fn fields(&self) -> &[FieldRef] {
        &self.fields
    }

    /// Nested fields of a case are the key followed by the case fields.
    #[inline]
    pub fn get_num_nested_fields(&self) -> usize {
        self.fields.len() + 1
    }

    /// The `n`th nested field, counting the key as field 0.
    pub fn get_nested_field<'a>(&'a self, key: &'a FieldRef, n: usize) -> Option<&'a FieldRef> {
        match n {
            0 => Some(key),
            n => self.fields.get(n - 1),
        }
    }

    #[inline]
    pub fn matches(&self, key_bytes: &[u8]) -> bool {
        self.values.iter().any(|value| **value == *key_bytes)
    }

    fn fixed_byte_size(&self) -> Option<usize> {
        self.fields
            .iter()
            .try_fold(0usize, |total, field| Some(total + field.get_fixed_byte_size()?))
    }

    fn check_match(&self, other: &SwitchCase) -> bool {
        self.values == other.values && check_match_all(&self.fields, &other.fields)
    }
}

/// A discriminated union: a key field followed by the fields of the case the
/// key selects.
#[derive(Clone, Debug)]
pub struct SwitchParameter {
    key: FieldRef,
    cases: Vec<SwitchCase>,
    default_case: Option<SwitchCase>,
}

impl SwitchParameter {
    #[inline]
    pub fn new(key: FieldRef) -> Self {
        Self {
            key,
            cases: Vec::new(),
            default_case: None,
        }
    }

    pub fn with_case(mut self, case: SwitchCase) -> Self {
        self.cases.push(case);
        self
    }

    pub fn with_default_case(mut self, fields: Vec<FieldRef>) -> Self {
        self.default_case = Some(SwitchCase::default_case(fields));
        self
    }

    #[inline]
    pub fn key(&self) -> &FieldRef {
        &self.key
    }

    #[inline]
    pub fn cases(&self) -> &[SwitchCase] {
        &self.cases
    }

    #[inline]
    pub fn default_case(&self) -> Option<&SwitchCase> {
        self.default_case.as_ref()
    }

    /// Every case, the default case last.
    pub fn all_cases(&self) -> impl Iterator<Item = &SwitchCase> {
        self.cases.iter().chain(self.default_case.as_ref())
    }

    /// The case selected by a key whose packed bytes are `key_bytes`.
    pub fn find_case(&self, key_bytes: &[u8]) -> Option<&SwitchCase> {
        self.cases
            .iter()
            .find(|case| case.matches(key_bytes))
            .or(self.default_case.as_ref())
    }

    pub(crate) fn layout(&self) -> Layout {
        let mut case_sizes = self.all_cases().map(SwitchCase::fixed_byte_size);
        let first = case_sizes.next().flatten();
        let case_size = first.filter(|&size| case_sizes.all(|other| other == Some(size)));
        Layout {
            fixed_byte_size: self
                .key
                .get_fixed_byte_size()
                .zip(case_size)
                .map(|(key, case)| key + case),
            has_fixed_structure: false,
            has_range_limits: self.key.has_range_limits()
                || self
                    .all_cases()
                    .any(|case| case.fields.iter().any(|field| field.has_range_limits())),
            num_length_bytes: 0,
            has_nested_fields: true,
            num_nested_fields: Some(1),
            pack_type: PackType::Switch,
        }
    }

    /// Walks the key, resolves the case from its bytes and walks the case
    /// fields, calling `step` on each. On a pack error `p` is restored.
    pub(crate) fn unpack_walk(
        &self,
        data: &[u8],
        p: &mut usize,
        step: impl Fn(&Field, &[u8], &mut usize) -> PackFlags,
    ) -> PackFlags {
        let start = *p;
        let mut flags = step(&self.key, data, p);
        if flags.pack_error {
            *p = start;
            return flags;
        }
        let Some(case) = self.find_case(&data[start..*p]) else {
            *p = start;
            return PackFlags::PACK_ERROR;
        };
        for field in &case.fields {
            flags |= step(field, data, p);
            if flags.pack_error {
                *p = start;
                return flags;
            }
        }
        flags
    }

    /// Writes the key default followed by the defaults of the case it selects.
    pub(crate) fn pack_default_value(&self, data: &mut PackData) -> Option<PackFlags> {
        let mut key_data = PackData::new();
        let mut flags = self.key.pack_default_value(&mut key_data)?;
        let case = self.find_case(key_data.as_slice())?;
        data.append_data(key_data.as_slice());
        for field in &case.fields {
            flags |= field.pack_default_value(data)?;
        }
        Some(flags)
    }

    pub(crate) fn do_check_match_switch_parameter(&self, other: &SwitchParameter) -> bool {
        self.key.check_match(&other.key)
            && self.cases.len() == other.cases.len()
            && self
                .cases
                .iter()
                .zip(&other.cases)
                .all(|(a, b)| a.check_match(b))
            && match (&self.default_case, &other.default_case) {
                (Some(a), Some(b)) => a.check_match(b),
                (None, None) => true,
                _ => false,
            }
    }
}
