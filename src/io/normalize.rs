//! Fallback normalization for sources lopdf cannot parse.
//!
//! The raw bytes are re-read by qpdf, which tolerates far more damage,
//! and rewritten as a plain PDF 1.4 file without object streams. After
//! lopdf has parsed that buffer, interactive form fields are flattened
//! into the page content so nothing depends on the form dictionary.

use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use crate::error::{PdfSpliceError, Result};
use crate::utils::page::{add_content_stream, add_page_resource, as_number, wrap_page_contents};
use crate::utils::resolve;

/// PDF version the normalized buffer is written as.
pub const NORMALIZED_VERSION: &str = "1.4";

/// Annotation flag bit marking an annotation as hidden.
const HIDDEN_FLAG: i64 = 1 << 1;

/// Rewrite `bytes` through qpdf into a lopdf-friendly PDF 1.4 buffer.
///
/// # Errors
///
/// Returns an error when qpdf cannot read or write the document either.
#[cfg(feature = "qpdf")]
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>> {
    use qpdf::{ObjectStreamMode, QPdf};

    let qpdf = QPdf::read_from_memory(bytes)
        .map_err(|e| PdfSpliceError::other(format!("qpdf could not read the file: {e}")))?;

    let mut writer = qpdf.writer();
    writer
        .object_stream_mode(ObjectStreamMode::Disable)
        .preserve_encryption(false)
        .preserve_unreferenced_objects(false)
        .force_pdf_version(NORMALIZED_VERSION);

    writer
        .write_to_memory()
        .map_err(|e| PdfSpliceError::other(format!("qpdf could not rewrite the file: {e}")))
}

/// Without the `qpdf` feature there is no fallback engine.
#[cfg(not(feature = "qpdf"))]
pub fn normalize(_bytes: &[u8]) -> Result<Vec<u8>> {
    Err(PdfSpliceError::other(
        "no fallback parser available (built without the `qpdf` feature)",
    ))
}

/// Paint every visible widget's normal appearance into its page and drop
/// the form.
///
/// Returns the number of widgets painted.
///
/// # Errors
///
/// Returns an error if a page dictionary cannot be updated.
pub fn flatten_form_fields(doc: &mut Document) -> Result<usize> {
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut painted_total = 0;

    for page_id in pages {
        let Some(annotations) = page_annotations(doc, page_id) else {
            continue;
        };

        let mut kept = Vec::new();
        let mut painted = Vec::new();

        for annotation in &annotations {
            let Some(dict) = resolve(doc, annotation).and_then(|o| o.as_dict().ok()) else {
                kept.push(annotation.clone());
                continue;
            };
            if !matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Widget")) {
                kept.push(annotation.clone());
                continue;
            }

            let hidden = dict
                .get(b"F")
                .and_then(Object::as_i64)
                .is_ok_and(|flags| flags & HIDDEN_FLAG != 0);
            if hidden {
                continue;
            }

            if let Some(placement) = widget_placement(doc, dict) {
                painted.push(placement);
            }
        }

        if kept.len() == annotations.len() {
            continue;
        }

        let mut content = String::new();
        for (index, (appearance, offset_x, offset_y)) in painted.iter().enumerate() {
            let name = format!("FlatForm{index}");
            add_page_resource(doc, page_id, "XObject", &name, Object::Reference(*appearance))?;
            content.push_str(&format!(
                "q 1 0 0 1 {offset_x:.3} {offset_y:.3} cm /{name} Do Q\n"
            ));
        }

        if !content.is_empty() {
            let before = add_content_stream(doc, b"q\n".to_vec());
            let after = add_content_stream(doc, format!("Q\n{content}").into_bytes());
            wrap_page_contents(doc, page_id, Some(before), after)?;
        }

        let page = doc.get_dictionary_mut(page_id)?;
        if kept.is_empty() {
            page.remove(b"Annots");
        } else {
            page.set("Annots", Object::Array(kept));
        }

        painted_total += painted.len();
    }

    if let Ok(catalog) = doc.catalog_mut() {
        catalog.remove(b"AcroForm");
    }

    debug!(widgets = painted_total, "flattened form fields");
    Ok(painted_total)
}

fn page_annotations(doc: &Document, page_id: ObjectId) -> Option<Vec<Object>> {
    let page = doc.get_dictionary(page_id).ok()?;
    let annots = page.get(b"Annots").ok()?;
    match resolve(doc, annots)? {
        Object::Array(items) => Some(items.clone()),
        _ => None,
    }
}

/// The widget's normal appearance stream and the translation that maps
/// its bounding box onto the annotation rectangle.
fn widget_placement(doc: &Document, widget: &lopdf::Dictionary) -> Option<(ObjectId, f32, f32)> {
    let appearance = resolve(doc, widget.get(b"AP").ok()?)?.as_dict().ok()?;
    let normal = appearance.get(b"N").ok()?;

    // A dictionary of appearance states is keyed by the widget's /AS.
    let stream_ref = match resolve(doc, normal)? {
        Object::Stream(_) => normal.as_reference().ok()?,
        Object::Dictionary(states) => {
            let state = widget.get(b"AS").and_then(Object::as_name).ok()?;
            states.get(state).ok()?.as_reference().ok()?
        }
        _ => return None,
    };

    let Object::Stream(stream) = doc.get_object(stream_ref).ok()? else {
        return None;
    };

    let rect = numbers(doc, widget.get(b"Rect").ok()?)?;
    let bbox = stream
        .dict
        .get(b"BBox")
        .ok()
        .and_then(|b| numbers(doc, b))
        .unwrap_or([0.0; 4]);

    Some((
        stream_ref,
        rect[0].min(rect[2]) - bbox[0].min(bbox[2]),
        rect[1].min(rect[3]) - bbox[1].min(bbox[3]),
    ))
}

fn numbers(doc: &Document, object: &Object) -> Option<[f32; 4]> {
    let Object::Array(items) = resolve(doc, object)? else {
        return None;
    };
    let values: Vec<f32> = items
        .iter()
        .filter_map(|item| resolve(doc, item).and_then(as_number))
        .collect();
    values.try_into().ok()
}
