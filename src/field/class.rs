use super::{FieldRef, check_match_all};

/// A struct-like list of fields packed back to back.
#[derive(Clone, Debug, Default)]
pub struct ClassParameter {
    fields: Vec<FieldRef>,
}

impl ClassParameter {
    #[inline]
    pub fn new(fields: Vec<FieldRef>) -> Self {
        Self { fields }
    }

    #[inline]
    pub fn fields(&self) -> &[FieldRef] {
        &self.fields
    }

    /// The first field called `name`.
    pub fn get_field_by_name(&self, name: &str) -> Option<&FieldRef> {
        self.fields.iter().find(|field| field.get_name() == name)
    }

    pub(crate) fn do_check_match_class_parameter(&self, other: &ClassParameter) -> bool {
        check_match_all(&self.fields, &other.fields)
    }
}
