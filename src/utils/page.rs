//! Page dictionary helpers shared by page copying, form flattening and
//! the numbering pass.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::resolve;
use crate::error::{PdfSpliceError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter, used when a page has no usable media box.
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

const MAX_TREE_DEPTH: usize = 64;

/// Read a numeric object as `f32`.
pub fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }

    None
}

/// The page's media box as `[llx, lly, urx, ury]`, normalized so that
/// `llx <= urx` and `lly <= ury`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Some(object) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };
    let Some(Object::Array(values)) = resolve(doc, &object) else {
        return DEFAULT_MEDIA_BOX;
    };

    let numbers: Vec<f32> = values
        .iter()
        .filter_map(|v| resolve(doc, v).and_then(as_number))
        .collect();
    let [x1, y1, x2, y2] = numbers[..] else {
        return DEFAULT_MEDIA_BOX;
    };

    [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]
}

/// The page's content streams, in drawing order, as references where
/// the source used references.
pub fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;

    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };

    let items = match contents {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(items) => items.clone(),
            _ => vec![contents.clone()],
        },
        other => vec![other.clone()],
    };

    Ok(items)
}

/// Surround the page's existing content with `prefix` and `suffix` streams.
pub fn wrap_page_contents(
    doc: &mut Document,
    page_id: ObjectId,
    prefix: Option<ObjectId>,
    suffix: ObjectId,
) -> Result<()> {
    let mut contents = Vec::new();
    if let Some(prefix) = prefix {
        contents.push(Object::Reference(prefix));
    }
    contents.extend(page_contents(doc, page_id)?);
    contents.push(Object::Reference(suffix));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Register `value` as `/category /name` in the page's own resources.
///
/// Shared or inherited resource dictionaries are copied onto the page
/// first, so other pages are left untouched.
pub fn add_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    value: Object,
) -> Result<()> {
    let mut resources = owned_dictionary(doc, inherited_attribute(doc, page_id, b"Resources"));

    let mut entries = owned_dictionary(doc, resources.get(category.as_bytes()).ok().cloned());
    entries.set(name, value);
    resources.set(category, Object::Dictionary(entries));

    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Clone a possibly indirect dictionary, or start a new one.
fn owned_dictionary(doc: &Document, object: Option<Object>) -> Dictionary {
    object
        .as_ref()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

/// Add a content stream built from raw operator bytes.
pub fn add_content_stream(doc: &mut Document, content: Vec<u8>) -> ObjectId {
    doc.add_object(Stream::new(Dictionary::new(), content))
}

/// Fetch a page dictionary, reporting a merge failure when it is missing.
pub fn page_dictionary(doc: &Document, page_id: ObjectId) -> Result<&Dictionary> {
    doc.get_dictionary(page_id).map_err(|_| {
        PdfSpliceError::merge_failed(format!(
            "Page object {} {} R is missing or not a dictionary",
            page_id.0, page_id.1
        ))
    })
}
