//! Import of a source document's own outline into the merged bookmark tree.
//!
//! Each source outline item is re-anchored onto the output: its
//! destination is resolved to a source page, the page is translated to
//! its position among the pages actually appended, and the item is added
//! to the [`BookmarkTree`] at the requested depth.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use tracing::debug;

use super::bookmarks::BookmarkTree;
use crate::error::{PdfSpliceError, Result};
use crate::io::SourceDocument;
use crate::utils::{decode_text_string, resolve};

/// Deepest outline nesting accepted before the outline is treated as malformed.
pub const MAX_OUTLINE_DEPTH: usize = 64;

/// Deepest name tree accepted during named destination lookup.
const MAX_NAME_TREE_DEPTH: usize = 32;

/// How an outline item encodes its destination.
#[derive(Debug, Clone, Copy)]
pub enum Destination<'a> {
    /// `/Dest [page /XYZ ...]` on the item itself.
    Explicit(&'a [Object]),
    /// `/A << /S /GoTo /D [page ...] >>`.
    Action(&'a [Object]),
    /// A name or string looked up in the catalog's destination tables.
    Named(&'a [u8]),
}

impl<'a> Destination<'a> {
    /// Classify the destination of an outline item.
    ///
    /// `/Dest` takes precedence over `/A`. Returns `None` for blind
    /// bookmarks (no destination, or one of an unsupported kind).
    pub fn classify(doc: &'a Document, item: &'a Dictionary) -> Option<Self> {
        if let Ok(dest) = item.get(b"Dest") {
            return match resolve(doc, dest)? {
                Object::Array(array) => Some(Destination::Explicit(array)),
                Object::String(name, _) | Object::Name(name) => Some(Destination::Named(name)),
                _ => None,
            };
        }

        let action = resolve(doc, item.get(b"A").ok()?)?.as_dict().ok()?;
        match resolve(doc, action.get(b"D").ok()?)? {
            Object::Array(array) => Some(Destination::Action(array)),
            Object::String(name, _) | Object::Name(name) => Some(Destination::Named(name)),
            _ => None,
        }
    }

    /// The page object this destination points at.
    ///
    /// Returns `None` when the destination cannot be resolved: unknown
    /// name, dangling reference, or a page given by number.
    pub fn resolve(&self, doc: &'a Document) -> Option<ObjectId> {
        let array = match *self {
            Destination::Explicit(array) | Destination::Action(array) => array,
            Destination::Named(name) => lookup_named_destination(doc, name)?,
        };
        match array.first()? {
            Object::Reference(page_id) => Some(*page_id),
            _ => None,
        }
    }
}

/// Find `name` in the catalog's `/Names /Dests` tree, then in the legacy
/// `/Dests` dictionary.
fn lookup_named_destination<'a>(doc: &'a Document, name: &[u8]) -> Option<&'a [Object]> {
    let catalog = doc.catalog().ok()?;

    let from_tree = catalog
        .get(b"Names")
        .ok()
        .and_then(|names| resolve(doc, names)?.as_dict().ok())
        .and_then(|names| resolve(doc, names.get(b"Dests").ok()?)?.as_dict().ok())
        .and_then(|tree| lookup_name_tree(doc, tree, name, 0));
    if from_tree.is_some() {
        return from_tree;
    }

    let dests = resolve(doc, catalog.get(b"Dests").ok()?)?.as_dict().ok()?;
    destination_array(doc, dests.get(name).ok()?)
}

/// Search a name tree node: its `/Names` pairs first, then each of its `/Kids`.
fn lookup_name_tree<'a>(
    doc: &'a Document,
    node: &'a Dictionary,
    name: &[u8],
    depth: usize,
) -> Option<&'a [Object]> {
    if depth > MAX_NAME_TREE_DEPTH {
        return None;
    }

    if let Some(Object::Array(pairs)) = node.get(b"Names").ok().and_then(|n| resolve(doc, n)) {
        for pair in pairs.chunks_exact(2) {
            let key = match resolve(doc, &pair[0]) {
                Some(Object::String(key, _)) | Some(Object::Name(key)) => key,
                _ => continue,
            };
            if key.as_slice() == name {
                return destination_array(doc, &pair[1]);
            }
        }
    }

    if let Some(Object::Array(kids)) = node.get(b"Kids").ok().and_then(|k| resolve(doc, k)) {
        for kid in kids {
            let Some(Object::Dictionary(kid)) = resolve(doc, kid) else {
                continue;
            };
            if let Some(found) = lookup_name_tree(doc, kid, name, depth + 1) {
                return Some(found);
            }
        }
    }

    None
}

/// A destination table value: an array, or a dictionary holding one under `/D`.
fn destination_array<'a>(doc: &'a Document, value: &'a Object) -> Option<&'a [Object]> {
    match resolve(doc, value)? {
        Object::Array(array) => Some(array),
        Object::Dictionary(dict) => match resolve(doc, dict.get(b"D").ok()?)? {
            Object::Array(array) => Some(array),
            _ => None,
        },
        _ => None,
    }
}

/// Walks one source's outline into a [`BookmarkTree`].
#[derive(Debug)]
pub struct OutlineImporter<'a> {
    source: &'a SourceDocument,
    included: Option<&'a [usize]>,
    page_base: usize,
    visited: HashSet<ObjectId>,
}

impl<'a> OutlineImporter<'a> {
    /// Importer for `source`, whose first contributed page lands at
    /// 0-based output index `page_base`.
    pub fn new(source: &'a SourceDocument, page_base: usize) -> Self {
        Self {
            source,
            included: None,
            page_base,
            visited: HashSet::new(),
        }
    }

    /// Restrict import to bookmarks targeting the given source pages.
    ///
    /// `included` lists the 0-based source indices appended, in output
    /// order. `None` means every page was appended in source order.
    pub fn with_included(mut self, included: Option<&'a [usize]>) -> Self {
        self.included = included;
        self
    }

    /// Import into `tree`.
    ///
    /// With a `root_title`, one bookmark at `level` points at the first
    /// contributed page and the source outline (when `recurse` is set)
    /// nests below it. Without one, the source outline starts at `level`.
    ///
    /// Returns the number of bookmarks added.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkHierarchy` when `level` is too deep for the tree,
    /// `OutlineCycle` for a looping outline and `MalformedOutline` for an
    /// outline that is too deep or not made of dictionaries. Bookmarks
    /// added before the error stay in `tree`.
    pub fn import(
        &mut self,
        tree: &mut BookmarkTree,
        root_title: Option<&str>,
        level: usize,
        recurse: bool,
    ) -> Result<usize> {
        let mut count = 0;
        let mut level = level;

        if let Some(title) = root_title {
            tree.add(title, self.page_base, level)?;
            count += 1;
            level += 1;
        }

        if recurse {
            count += self.import_source_outline(tree, level)?;
        }

        Ok(count)
    }

    fn import_source_outline(&mut self, tree: &mut BookmarkTree, level: usize) -> Result<usize> {
        let source = self.source;
        let doc = &source.document;
        let Ok(catalog) = doc.catalog() else {
            return Ok(0);
        };
        let Some(outlines) = catalog
            .get(b"Outlines")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            return Ok(0);
        };
        let Some(first) = link(outlines, b"First") else {
            return Ok(0);
        };

        self.walk(tree, first, level, 0)
    }

    /// Import `first` and its following siblings, depth first.
    fn walk(
        &mut self,
        tree: &mut BookmarkTree,
        first: ObjectId,
        level: usize,
        depth: usize,
    ) -> Result<usize> {
        if depth >= MAX_OUTLINE_DEPTH {
            return Err(PdfSpliceError::malformed_outline(format!(
                "{} nests bookmarks deeper than {MAX_OUTLINE_DEPTH} levels",
                self.source.path.display()
            )));
        }

        let source = self.source;
        let doc = &source.document;
        let mut count = 0;
        let mut current = Some(first);

        while let Some(item_id) = current {
            if !self.visited.insert(item_id) {
                return Err(PdfSpliceError::OutlineCycle {
                    path: source.path.clone(),
                });
            }

            let item = doc.get_dictionary(item_id).map_err(|e| {
                PdfSpliceError::malformed_outline(format!(
                    "outline item {} {} R in {}: {e}",
                    item_id.0,
                    item_id.1,
                    source.path.display()
                ))
            })?;

            // An untitled item ends this sibling list.
            let Some(title) = item_title(doc, item) else {
                break;
            };

            let mut level_offset = 0;
            let target = Destination::classify(doc, item)
                .and_then(|dest| dest.resolve(doc))
                .and_then(|page_id| self.output_index(page_id));
            match target {
                Some(target) => {
                    tree.add(&title, target, level)?;
                    count += 1;
                    level_offset = 1;
                }
                None => debug!(title = %title, "skipped bookmark without an included target"),
            }

            if let Some(child) = link(item, b"First") {
                count += self.walk(tree, child, level + level_offset, depth + 1)?;
            }

            current = link(item, b"Next");
        }

        Ok(count)
    }

    /// Output page index for a source page object, if that page was appended.
    fn output_index(&self, page_id: ObjectId) -> Option<usize> {
        let offset = self.source.page_index(page_id)?;
        match self.included {
            None => Some(self.page_base + offset),
            Some(included) => included
                .iter()
                .position(|&index| index == offset)
                .map(|position| self.page_base + position),
        }
    }
}

fn item_title(doc: &Document, item: &Dictionary) -> Option<String> {
    match resolve(doc, item.get(b"Title").ok()?)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn link(dict: &Dictionary, key: &[u8]) -> Option<ObjectId> {
    match dict.get(key).ok()? {
        Object::Reference(id) => Some(*id),
        _ => None,
    }
}
