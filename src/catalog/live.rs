use std::{borrow::Cow, ops::Range};

use crate::{
    CatalogEntry, Error, Field, FieldKind, PackerCatalog, Result, SwitchParameter,
    codec::LENGTH_TAG_BYTES,
    field::read_length_tag,
};

/// Byte offsets of one catalog entry within a particular buffer.
///
/// Entries never reached by the walk, such as the fields of an inactive
/// switch case, keep `begin == end == 0`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LiveCatalogEntry {
    pub begin: usize,
    pub end: usize,
}

impl LiveCatalogEntry {
    #[inline]
    pub fn span(&self) -> Range<usize> {
        self.begin..self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// The catalog of one buffer: every entry of the static catalog that applies
/// to it, with its byte offsets.
///
/// For a buffer holding a switch, the static catalog is the one extended with
/// the active case, so only the active case's fields can be found here.
///
/// Dropping the handle releases it.
#[derive(Clone, Debug)]
pub struct LiveCatalog<'a> {
    catalog: &'a PackerCatalog,
    live_entries: Cow<'a, [LiveCatalogEntry]>,
}

impl<'a> LiveCatalog<'a> {
    /// The static catalog describing this buffer.
    #[inline]
    pub fn catalog(&self) -> &'a PackerCatalog {
        self.catalog
    }

    #[inline]
    pub fn get_num_entries(&self) -> usize {
        self.live_entries.len()
    }

    #[inline]
    pub fn get_entry(&self, n: usize) -> Option<&'a CatalogEntry> {
        self.catalog.get_entry(n)
    }

    #[inline]
    pub fn get_live_entry(&self, n: usize) -> Option<LiveCatalogEntry> {
        self.live_entries.get(n).copied()
    }

    #[inline]
    pub fn live_entries(&self) -> &[LiveCatalogEntry] {
        &self.live_entries
    }

    #[inline]
    pub fn get_begin(&self, n: usize) -> Option<usize> {
        self.live_entries.get(n).map(|entry| entry.begin)
    }

    #[inline]
    pub fn get_end(&self, n: usize) -> Option<usize> {
        self.live_entries.get(n).map(|entry| entry.end)
    }

    #[inline]
    pub fn get_span(&self, n: usize) -> Option<Range<usize>> {
        self.live_entries.get(n).map(LiveCatalogEntry::span)
    }

    #[inline]
    pub fn find_entry_by_name(&self, name: &str) -> Option<usize> {
        self.catalog.find_entry_by_name(name)
    }

    #[inline]
    pub fn find_entry_by_field(&self, field: &Field) -> Option<usize> {
        self.catalog.find_entry_by_field(field)
    }

    /// The bytes of the field called `name` within `data`, the buffer this
    /// live catalog was built from.
    pub fn get_field_bytes<'d>(&self, data: &'d [u8], name: &str) -> Result<&'d [u8]> {
        let span = self
            .find_entry_by_name(name)
            .and_then(|n| self.get_span(n))
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;
        data.get(span).ok_or(Error::EndOfFile)
    }
}

impl PackerCatalog {
    /// Walks `data` as one record of the root field and records where every
    /// nested field begins and ends.
    ///
    /// Records of a fixed-structure root all share the same offsets, so
    /// those are computed once and borrowed by every later live catalog.
    ///
    /// # Errors
    ///
    /// - [`Error::EndOfFile`] if `data` ends inside a field.
    /// - [`Error::TrailingData`] if bytes remain after the record.
    /// - [`Error::UnknownSwitchCase`] if a switch key selects no case.
    pub fn get_live_catalog(&self, data: &[u8]) -> Result<LiveCatalog<'_>> {
        if let Some(cached) = self.fixed_live_entries.get() {
            check_fixed_length(self.root(), data.len())?;
            return Ok(LiveCatalog {
                catalog: self,
                live_entries: Cow::Borrowed(cached),
            });
        }

        let mut fill = LiveFill {
            data,
            p: 0,
            catalog: self,
            live_entries: vec![LiveCatalogEntry::default(); self.get_num_entries()],
            path: Vec::new(),
        };
        let root = self.root();
        let walked = fill.fill_field(root).and_then(|()| match data.len() - fill.p {
            0 => Ok(()),
            remaining => Err(Error::TrailingData(remaining)),
        });
        if let Err(error) = walked {
            tracing::debug!(
                root = root.get_name(),
                offset = fill.p,
                %error,
                "live catalog walk failed"
            );
            return Err(error);
        }

        let LiveFill {
            catalog,
            live_entries,
            ..
        } = fill;
        if root.has_fixed_structure() {
            let cached = self
                .fixed_live_entries
                .get_or_init(|| live_entries.into_boxed_slice());
            return Ok(LiveCatalog {
                catalog,
                live_entries: Cow::Borrowed(cached),
            });
        }
        Ok(LiveCatalog {
            catalog,
            live_entries: Cow::Owned(live_entries),
        })
    }

    /// Releases a live catalog obtained from this catalog.
    #[inline]
    pub fn release_live_catalog(&self, live: LiveCatalog<'_>) {
        drop(live);
    }
}

fn check_fixed_length(root: &Field, len: usize) -> Result<()> {
    match root.get_fixed_byte_size() {
        Some(size) if len < size => Err(Error::EndOfFile),
        Some(size) if len > size => Err(Error::TrailingData(len - size)),
        _ => Ok(()),
    }
}

/// State of one walk over a buffer.
struct LiveFill<'c, 'd> {
    data: &'d [u8],
    p: usize,
    catalog: &'c PackerCatalog,
    live_entries: Vec<LiveCatalogEntry>,
    path: Vec<usize>,
}

impl<'c, 'd> LiveFill<'c, 'd> {
    fn fill_field(&mut self, field: &Field) -> Result<()> {
        let entry = self.catalog.find_entry_by_path(&self.path);
        let begin = self.p;
        match field.kind() {
            FieldKind::Simple(_) => self.skip(field)?,
            FieldKind::Array(array) => {
                let element = array.element();
                match array.size().fixed_count().filter(|_| !array.has_length_tag()) {
                    Some(count) => {
                        for i in 0..count {
                            self.fill_nested(i, element)?;
                        }
                    }
                    None => self.fill_tagged_array(element)?,
                }
            }
            FieldKind::Switch(switch) => self.fill_switch(field, switch)?,
            kind => {
                for (i, member) in kind.members().unwrap_or_default().iter().enumerate() {
                    self.fill_nested(i, member)?;
                }
            }
        }
        if let Some(index) = entry {
            self.live_entries[index] = LiveCatalogEntry {
                begin,
                end: self.p,
            };
        }
        Ok(())
    }

    fn fill_nested(&mut self, index: usize, field: &Field) -> Result<()> {
        self.path.push(index);
        let filled = self.fill_field(field);
        self.path.pop();
        filled
    }

    fn skip(&mut self, field: &Field) -> Result<()> {
        if field.unpack_skip(self.data, &mut self.p).pack_error {
            return Err(Error::EndOfFile);
        }
        Ok(())
    }

    fn fill_tagged_array(&mut self, element: &Field) -> Result<()> {
        let end = read_length_tag(self.data, &mut self.p, LENGTH_TAG_BYTES)
            .and_then(|length| self.p.checked_add(length))
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::EndOfFile)?;

        // Elements may not read past the end of the array.
        let outer = self.data;
        self.data = &outer[..end];
        let mut i = 0;
        while self.p < end {
            let before = self.p;
            self.fill_nested(i, element)?;
            if self.p == before {
                return Err(Error::PackError);
            }
            i += 1;
        }
        self.data = outer;
        Ok(())
    }

    fn fill_switch(&mut self, field: &Field, switch: &SwitchParameter) -> Result<()> {
        let key_start = self.p;
        self.fill_nested(0, switch.key())?;
        let Some(case) = switch.find_case(&self.data[key_start..self.p]) else {
            return Err(Error::UnknownSwitchCase(field.get_name().to_owned()));
        };

        let catalog: &'c PackerCatalog = self.catalog;
        let case_catalog = catalog.switch_case_catalog(&self.path, case);
        if case_catalog.get_num_entries() > self.live_entries.len() {
            self.live_entries
                .resize(case_catalog.get_num_entries(), LiveCatalogEntry::default());
        }
        self.catalog = case_catalog;

        for (i, nested) in case.fields().iter().enumerate() {
            self.fill_nested(i + 1, nested)?;
        }
        Ok(())
    }
}
