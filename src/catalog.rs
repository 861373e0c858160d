use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use crate::{Field, FieldId, FieldKind, FieldRef, SwitchCase};

mod live;

pub use live::*;

/// The static catalog data for one nested field: its dotted name and its
/// place in the tree.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    name: String,
    field: FieldRef,
    parent: FieldId,
    field_index: usize,
    path: Box<[usize]>,
}

impl CatalogEntry {
    /// Dotted path from the catalog root, e.g. `pos.x` or `points[2]`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    /// Identity of the containing field, or of the switch case for fields
    /// revealed by a switch.
    #[inline]
    pub fn parent(&self) -> FieldId {
        self.parent
    }

    /// Position among the parent's nested fields.
    #[inline]
    pub fn field_index(&self) -> usize {
        self.field_index
    }

    /// Nested-field indices leading from the catalog root to this field.
    #[inline]
    pub fn path(&self) -> &[usize] {
        &self.path
    }
}

/// A switch met while building a catalog. Case catalogs are materialized on
/// first use, once per case.
#[derive(Debug)]
struct SwitchScope {
    prefix: String,
    case_catalogs: HashMap<FieldId, OnceLock<Box<PackerCatalog>>>,
}

impl SwitchScope {
    fn new<'a>(prefix: &str, cases: impl Iterator<Item = &'a SwitchCase>) -> Self {
        Self {
            prefix: prefix.to_owned(),
            case_catalogs: cases.map(|case| (case.id(), OnceLock::new())).collect(),
        }
    }

    fn fresh(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            case_catalogs: self
                .case_catalogs
                .keys()
                .map(|&id| (id, OnceLock::new()))
                .collect(),
        }
    }
}

/// The names of every field nested within a root field.
///
/// A catalog is created on demand the first time it is requested from a
/// field, and the field keeps it for the rest of its life. Entry order is the
/// depth-first order of the field tree, and indices never change once the
/// catalog is built.
///
/// Fields behind a switch depend on the key in each record, so they are not
/// part of the catalog itself. Each case instead gets its own catalog, a copy
/// of this one extended with the case fields, built the first time a live
/// catalog selects it.
#[derive(Debug)]
pub struct PackerCatalog {
    root: Arc<Field>,
    entries: Vec<CatalogEntry>,
    entries_by_name: HashMap<String, usize>,
    entries_by_field: HashMap<FieldId, usize>,
    entries_by_path: HashMap<Box<[usize]>, usize>,
    switch_scopes: HashMap<Box<[usize]>, SwitchScope>,
    switch_positions: HashMap<FieldId, Box<[usize]>>,
    fixed_live_entries: OnceLock<Box<[LiveCatalogEntry]>>,
}

impl PackerCatalog {
    pub(crate) fn build(root: &Field) -> Self {
        let mut catalog = Self {
            root: Arc::new(root.detached()),
            entries: Vec::new(),
            entries_by_name: HashMap::new(),
            entries_by_field: HashMap::new(),
            entries_by_path: HashMap::new(),
            switch_scopes: HashMap::new(),
            switch_positions: HashMap::new(),
            fixed_live_entries: OnceLock::new(),
        };
        let mut path = Vec::new();
        catalog.r_fill_children("", root, &mut path);

        tracing::debug!(
            root = root.get_name(),
            entries = catalog.entries.len(),
            switches = catalog.switch_scopes.len(),
            "built packer catalog"
        );
        catalog
    }

    #[inline]
    pub fn get_num_entries(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn get_entry(&self, n: usize) -> Option<&CatalogEntry> {
        self.entries.get(n)
    }

    #[inline]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// The field this catalog describes.
    #[inline]
    pub fn root(&self) -> &Field {
        &self.root
    }

    /// Looks up an entry by its dotted name, or by the field's own name when
    /// that is not shadowed by a dotted name.
    #[inline]
    pub fn find_entry_by_name(&self, name: &str) -> Option<usize> {
        self.entries_by_name.get(name).copied()
    }

    /// Looks up the first entry recorded for `field`.
    #[inline]
    pub fn find_entry_by_field(&self, field: &Field) -> Option<usize> {
        self.find_entry_by_field_id(field.id())
    }

    #[inline]
    pub fn find_entry_by_field_id(&self, id: FieldId) -> Option<usize> {
        self.entries_by_field.get(&id).copied()
    }

    #[inline]
    pub(crate) fn find_entry_by_path(&self, path: &[usize]) -> Option<usize> {
        self.entries_by_path.get(path).copied()
    }

    /// The catalog extending this one with the fields of `case`, for the
    /// first place `switch` occurs under the root. Returns `self` if the
    /// switch or the case is unknown here.
    pub fn update_switch_fields(&self, switch: &Field, case: &SwitchCase) -> &PackerCatalog {
        match self.switch_positions.get(&switch.id()) {
            Some(path) => self.switch_case_catalog(path, case),
            None => self,
        }
    }

    pub(crate) fn switch_case_catalog(
        &self,
        switch_path: &[usize],
        case: &SwitchCase,
    ) -> &PackerCatalog {
        let Some(scope) = self.switch_scopes.get(switch_path) else {
            return self;
        };
        let Some(slot) = scope.case_catalogs.get(&case.id()) else {
            return self;
        };
        slot.get_or_init(|| Box::new(self.with_switch_case(switch_path, &scope.prefix, case)))
    }

    fn with_switch_case(&self, switch_path: &[usize], prefix: &str, case: &SwitchCase) -> Self {
        let mut catalog = Self {
            root: self.root.clone(),
            entries: self.entries.clone(),
            entries_by_name: self.entries_by_name.clone(),
            entries_by_field: self.entries_by_field.clone(),
            entries_by_path: self.entries_by_path.clone(),
            switch_scopes: self
                .switch_scopes
                .iter()
                .map(|(path, scope)| (path.clone(), scope.fresh()))
                .collect(),
            switch_positions: self.switch_positions.clone(),
            fixed_live_entries: OnceLock::new(),
        };

        // Field 0 of a case is the key, which is already recorded.
        let mut path = switch_path.to_vec();
        for (i, field) in case.fields().iter().enumerate() {
            path.push(i + 1);
            catalog.r_fill_catalog(prefix, field, case.id(), false, i + 1, &mut path);
            path.pop();
        }

        tracing::trace!(
            case = case.id().get(),
            new_entries = catalog.entries.len() - self.entries.len(),
            "materialized switch case catalog"
        );
        catalog
    }

    fn add_entry(
        &mut self,
        name: String,
        field: &FieldRef,
        parent: FieldId,
        field_index: usize,
        path: &[usize],
    ) {
        let index = self.entries.len();
        self.entries_by_field.entry(field.id()).or_insert(index);
        self.entries_by_path.insert(path.into(), index);

        // The dotted name is unique, so a later one replaces an earlier one
        // and also replaces a local name registered under the same string.
        let local_name = field.get_name();
        if !local_name.is_empty() && local_name != name {
            self.entries_by_name
                .entry(local_name.to_owned())
                .or_insert(index);
        }
        self.entries_by_name.insert(name.clone(), index);

        self.entries.push(CatalogEntry {
            name,
            field: field.clone(),
            parent,
            field_index,
            path: path.into(),
        });
    }

    fn r_fill_catalog(
        &mut self,
        parent_name: &str,
        field: &FieldRef,
        parent: FieldId,
        parent_is_array: bool,
        field_index: usize,
        path: &mut Vec<usize>,
    ) {
        let name = if parent_is_array {
            format!("{parent_name}[{field_index}]")
        } else {
            let segment = match field.get_name() {
                "" => field_index.to_string(),
                name => name.to_owned(),
            };
            if parent_name.is_empty() {
                segment
            } else {
                format!("{parent_name}.{segment}")
            }
        };
        self.add_entry(name.clone(), field, parent, field_index, path);
        self.r_fill_children(&name, field, path);
    }

    fn r_fill_children(&mut self, name: &str, field: &Field, path: &mut Vec<usize>) {
        if let FieldKind::Switch(switch) = field.kind() {
            self.switch_scopes
                .insert(path.as_slice().into(), SwitchScope::new(name, switch.all_cases()));
            self.switch_positions
                .entry(field.id())
                .or_insert_with(|| path.as_slice().into());
        }

        // Variable-count arrays have no per-element entries.
        let Some(num_nested) = field
            .get_num_nested_fields()
            .filter(|_| field.has_nested_fields())
        else {
            return;
        };
        let parent_is_array = matches!(field.kind(), FieldKind::Array(_));
        for i in 0..num_nested {
            if let Some(nested) = field.get_nested_field(i) {
                path.push(i);
                self.r_fill_catalog(name, nested, field.id(), parent_is_array, i, path);
                path.pop();
            }
        }
    }
}
