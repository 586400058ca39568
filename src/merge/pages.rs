//! Page copying into the output document.
//!
//! [`PageAssembler`] owns the output document under construction. Each
//! append moves a source's objects into it under fresh object numbers and
//! hangs the selected pages off the output page tree, in selection order.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::{PdfSpliceError, Result};
use crate::io::SourceDocument;
use crate::utils::page::{INHERITABLE_ATTRIBUTES, inherited_attribute, page_dictionary};
use crate::utils::parse_version;

/// Version of a freshly created output document.
pub const INITIAL_VERSION: &str = "1.4";

/// Builder for the merged document's page sequence.
#[derive(Debug)]
pub struct PageAssembler {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PageAssembler {
    /// Start an empty output document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut document = Document::with_version(INITIAL_VERSION);

        let pages_id = document.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Output page object ids in page order.
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    /// The output document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The output document, for the finishing passes.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Give up ownership of the output document.
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Append the pages of `source` at 0-based `selection` indices, in the
    /// order given, consuming the source.
    ///
    /// `None` appends every page in source order. A page selected more than
    /// once is copied as a distinct page object sharing the same content.
    /// Inheritable attributes are copied onto each page, since the page no
    /// longer hangs below the source's page tree.
    ///
    /// Returns the number of pages appended.
    ///
    /// # Errors
    ///
    /// Returns an error if an index is out of range or a page object is
    /// missing from the source.
    pub fn append(&mut self, source: SourceDocument, selection: Option<&[usize]>) -> Result<usize> {
        let SourceDocument {
            mut document,
            page_ids: source_pages,
            path,
            ..
        } = source;

        let all: Vec<usize>;
        let selection = match selection {
            Some(selection) => selection,
            None => {
                all = (0..source_pages.len()).collect();
                &all
            }
        };

        let mut targets = Vec::with_capacity(selection.len());
        let mut seen = HashSet::new();
        let mut last_id = document.objects.keys().map(|id| id.0).max().unwrap_or(0);

        for &index in selection {
            let page_id = *source_pages.get(index).ok_or_else(|| {
                PdfSpliceError::merge_failed(format!(
                    "Page {} is out of range for {} ({} pages)",
                    index + 1,
                    path.display(),
                    source_pages.len()
                ))
            })?;

            let page = flattened_page(&document, page_id)?;
            if seen.insert(page_id) {
                document.objects.insert(page_id, Object::Dictionary(page));
                targets.push(page_id);
            } else {
                last_id += 1;
                document.objects.insert((last_id, 0), Object::Dictionary(page));
                targets.push((last_id, 0));
            }
        }

        let offset = self.document.max_id;
        let objects = relocate(std::mem::take(&mut document.objects), offset);

        self.document.objects.extend(objects);
        self.document.max_id = offset + last_id;

        for target in &targets {
            let id = (target.0 + offset, target.1);
            self.document
                .get_dictionary_mut(id)?
                .set("Parent", Object::Reference(self.pages_id));
            self.page_ids.push(id);
        }

        self.sync_page_tree()?;

        debug!(
            path = %path.display(),
            appended = targets.len(),
            total = self.page_ids.len(),
            "appended pages"
        );

        Ok(targets.len())
    }

    /// Raise the output version to `version` if it is higher. Never lowers it.
    ///
    /// Returns whether the version changed.
    pub fn upgrade_version(&mut self, version: &str) -> bool {
        match (parse_version(version), parse_version(&self.document.version)) {
            (Some(candidate), Some(current)) if candidate > current => {
                self.document.version = version.trim().to_string();
                true
            }
            (Some(_), None) => {
                self.document.version = version.trim().to_string();
                true
            }
            _ => false,
        }
    }

    /// Drop every object no longer reachable from the trailer.
    ///
    /// Returns the number of objects removed.
    pub fn reclaim(&mut self) -> usize {
        let removed = self.document.prune_objects().len();
        debug!(removed, pages = self.page_ids.len(), "reclaimed unreachable objects");
        removed
    }

    fn sync_page_tree(&mut self) -> Result<()> {
        let kids: Vec<Object> = self.page_ids.iter().copied().map(Object::Reference).collect();
        let count = kids.len() as i64;

        let pages = self
            .document
            .get_dictionary_mut(self.pages_id)
            .map_err(|e| PdfSpliceError::merge_failed(format!("Failed to get pages object: {e}")))?;
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(count));
        Ok(())
    }
}

impl Default for PageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// The page dictionary with inherited attributes made explicit.
fn flattened_page(document: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = page_dictionary(document, page_id)?.clone();

    for key in INHERITABLE_ATTRIBUTES {
        if !page.has(key)
            && let Some(value) = inherited_attribute(document, page_id, key)
        {
            page.set(key.to_vec(), value);
        }
    }

    Ok(page)
}

/// Shift every object number (and every reference) by `offset`.
fn relocate(objects: BTreeMap<ObjectId, Object>, offset: u32) -> BTreeMap<ObjectId, Object> {
    objects
        .into_iter()
        .map(|((number, generation), mut object)| {
            shift_references(&mut object, offset);
            ((number + offset, generation), object)
        })
        .collect()
}

fn shift_references(object: &mut Object, offset: u32) {
    match object {
        Object::Reference(id) => id.0 += offset,
        Object::Array(items) => {
            for item in items {
                shift_references(item, offset);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                shift_references(value, offset);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                shift_references(value, offset);
            }
        }
        _ => {}
    }
}
