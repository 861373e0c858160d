use super::{FieldKind, FieldRef, check_match_all};

/// A method-like field: a named list of parameters plus keywords such as
/// `broadcast` or `ram`.
#[derive(Clone, Debug, Default)]
pub struct AtomicField {
    parameters: Vec<FieldRef>,
    keywords: Vec<String>,
}

impl AtomicField {
    #[inline]
    pub fn new(parameters: Vec<FieldRef>) -> Self {
        Self {
            parameters,
            keywords: Vec::new(),
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        if !self.has_keyword(&keyword) {
            self.keywords.push(keyword);
        }
        self
    }

    #[inline]
    pub fn parameters(&self) -> &[FieldRef] {
        &self.parameters
    }

    #[inline]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[inline]
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    pub(crate) fn do_check_match_atomic_field(&self, other: &AtomicField) -> bool {
        self.keywords == other.keywords && check_match_all(&self.parameters, &other.parameters)
    }
}

/// A field composed of several atomic fields, packed one after another.
///
/// Its nested fields are the parameters of every atomic field, flattened in
/// order. A non-atomic component contributes itself as a single parameter.
#[derive(Clone, Debug, Default)]
pub struct MolecularField {
    atomics: Vec<FieldRef>,
    parameters: Vec<FieldRef>,
}

impl MolecularField {
    pub fn new(atomics: Vec<FieldRef>) -> Self {
        let parameters = atomics
            .iter()
            .flat_map(|field| match field.kind() {
                FieldKind::Atomic(atomic) => atomic.parameters().to_vec(),
                _ => vec![field.clone()],
            })
            .collect();
        Self {
            atomics,
            parameters,
        }
    }

    #[inline]
    pub fn atomics(&self) -> &[FieldRef] {
        &self.atomics
    }

    #[inline]
    pub fn parameters(&self) -> &[FieldRef] {
        &self.parameters
    }

    pub(crate) fn do_check_match_molecular_field(&self, other: &MolecularField) -> bool {
        check_match_all(&self.atomics, &other.atomics)
    }
}
