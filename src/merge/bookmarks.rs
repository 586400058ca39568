//! Bookmark (outline) tree for the merged document.
//!
//! The tree is a plain ownership tree: every node owns its children in
//! display order. Sibling and parent links only exist in the PDF objects
//! written by [`BookmarkTree::write_to`].

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{PdfSpliceError, Result};
use crate::utils::encode_text_string;

/// A single bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    /// Sanitized title.
    pub title: String,
    /// 0-based index of the target page in the output document.
    pub target_page_index: usize,
    /// Nesting depth, 0 = top level.
    pub level: usize,
    /// Child bookmarks in display order.
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::count).sum::<usize>()
    }
}

/// The merged document's bookmark hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkTree {
    roots: Vec<OutlineNode>,
}

/// Strip the characters the legacy outline writer could not escape.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '>' | '(' | ')'))
        .collect()
}

impl BookmarkTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bookmark at `level`.
    ///
    /// A level-0 bookmark becomes a new top-level entry. A deeper
    /// bookmark is appended to the children of the last node on the
    /// level above, following the most recently added branch. Skipping
    /// a level is an error.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkHierarchy` if there is no node at `level - 1` on
    /// the most recent branch.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfsplice::merge::BookmarkTree;
    ///
    /// let mut tree = BookmarkTree::new();
    /// tree.add("Part I", 0, 0).unwrap();
    /// tree.add("Chapter 1", 0, 1).unwrap();
    /// assert!(tree.add("Too deep", 0, 3).is_err());
    /// assert_eq!(tree.len(), 2);
    /// ```
    pub fn add(&mut self, title: &str, target_page_index: usize, level: usize) -> Result<()> {
        let title = sanitize_title(title);

        let mut siblings = &mut self.roots;
        for _ in 0..level {
            siblings = match siblings.last_mut() {
                Some(parent) => &mut parent.children,
                None => return Err(PdfSpliceError::BookmarkHierarchy { title, level }),
            };
        }

        siblings.push(OutlineNode {
            title,
            target_page_index,
            level,
            children: Vec::new(),
        });
        Ok(())
    }

    /// Top-level bookmarks.
    pub fn roots(&self) -> &[OutlineNode] {
        &self.roots
    }

    /// Total number of bookmarks at every depth.
    pub fn len(&self) -> usize {
        self.roots.iter().map(OutlineNode::count).sum()
    }

    /// Whether the tree has no bookmarks.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Remove every bookmark.
    pub fn clear(&mut self) {
        self.roots.clear();
    }

    /// Write the tree as the document's outline dictionary.
    ///
    /// `page_ids` are the output pages in order; node targets index into
    /// it. Nodes with children are written closed. Does nothing for an
    /// empty tree.
    ///
    /// Returns the outline root id, if one was written.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkTarget` if a node points past the last page, or an
    /// error if the catalog is missing.
    pub fn write_to(&self, doc: &mut Document, page_ids: &[ObjectId]) -> Result<Option<ObjectId>> {
        if self.roots.is_empty() {
            return Ok(None);
        }

        let outline_id = doc.new_object_id();
        let (first, last) = write_siblings(doc, &self.roots, outline_id, page_ids)?;

        let mut outline_dict = Dictionary::new();
        outline_dict.set("Type", Object::Name(b"Outlines".to_vec()));
        outline_dict.set("First", Object::Reference(first));
        outline_dict.set("Last", Object::Reference(last));
        outline_dict.set("Count", Object::Integer(self.roots.len() as i64));
        doc.objects
            .insert(outline_id, Object::Dictionary(outline_dict));

        let catalog = doc
            .catalog_mut()
            .map_err(|e| PdfSpliceError::merge_failed(format!("Failed to get catalog: {e}")))?;
        catalog.set("Outlines", Object::Reference(outline_id));
        catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

        debug!(bookmarks = self.len(), "wrote outline");
        Ok(Some(outline_id))
    }
}

/// Write one sibling list under `parent`, returning its first and last ids.
fn write_siblings(
    doc: &mut Document,
    nodes: &[OutlineNode],
    parent: ObjectId,
    page_ids: &[ObjectId],
) -> Result<(ObjectId, ObjectId)> {
    let item_ids: Vec<ObjectId> = nodes.iter().map(|_| doc.new_object_id()).collect();

    for (index, (node, &item_id)) in nodes.iter().zip(&item_ids).enumerate() {
        let page_id = *page_ids.get(node.target_page_index).ok_or_else(|| {
            PdfSpliceError::BookmarkTarget {
                title: node.title.clone(),
                page: node.target_page_index + 1,
                page_count: page_ids.len(),
            }
        })?;

        // Destination array [page /XYZ null null null]
        let dest = vec![
            Object::Reference(page_id),
            Object::Name(b"XYZ".to_vec()),
            Object::Null,
            Object::Null,
            Object::Null,
        ];

        let mut item_dict = Dictionary::new();
        item_dict.set("Title", encode_text_string(&node.title));
        item_dict.set("Parent", Object::Reference(parent));
        item_dict.set("Dest", Object::Array(dest));

        if index > 0 {
            item_dict.set("Prev", Object::Reference(item_ids[index - 1]));
        }
        if let Some(next) = item_ids.get(index + 1) {
            item_dict.set("Next", Object::Reference(*next));
        }

        if !node.children.is_empty() {
            let (first, last) = write_siblings(doc, &node.children, item_id, page_ids)?;
            item_dict.set("First", Object::Reference(first));
            item_dict.set("Last", Object::Reference(last));
            // Negative count: closed, with this many visible descendants when opened.
            item_dict.set("Count", Object::Integer(-(node.children.len() as i64)));
        }

        doc.objects.insert(item_id, Object::Dictionary(item_dict));
    }

    match (item_ids.first(), item_ids.last()) {
        (Some(first), Some(last)) => Ok((*first, *last)),
        _ => Err(PdfSpliceError::merge_failed("Empty bookmark sibling list")),
    }
}
