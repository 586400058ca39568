//! Page number and footer overlay.
//!
//! Every output page gets one extra content stream drawing its label at
//! the bottom right and the footer text at the bottom left, in 9 pt
//! Helvetica-Bold. The page's own content is wrapped in `q`/`Q` first so
//! whatever graphics state it leaves behind cannot move the overlay.

use lopdf::{Document, Object, ObjectId, dictionary};
use tracing::debug;

use crate::config::PaginationSpec;
use crate::error::Result;
use crate::utils::page::{add_content_stream, add_page_resource, media_box, wrap_page_contents};
use crate::utils::to_win_ansi;

/// Label font size in points.
pub const FONT_SIZE: f32 = 9.0;

/// Distance from the left and right media box edges.
pub const HORIZONTAL_INSET: f32 = 30.0;

/// Distance from the bottom media box edge to the lowest descender.
pub const VERTICAL_INSET: f32 = 20.0;

/// Resource name of the overlay font on each page.
const FONT_RESOURCE: &str = "FPgNum";

const HELVETICA_BOLD_DESCENT: f32 = 207.0;

/// Helvetica-Bold advance widths for codes 32..=126, per 1000 em.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a..m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n..z
    389, 280, 389, 584, // {..~
];

/// Width used for codes outside the table.
const DEFAULT_WIDTH: u16 = 556;

/// Width of WinAnsi-encoded `text` at `size` points.
pub fn text_width(text: &[u8], size: f32) -> f32 {
    let units: u32 = text
        .iter()
        .map(|&code| {
            let width = match code {
                32..=126 => HELVETICA_BOLD_WIDTHS[usize::from(code - 32)],
                _ => DEFAULT_WIDTH,
            };
            u32::from(width)
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Draws page labels and footer text onto assembled output pages.
#[derive(Debug, Clone, Copy)]
pub struct PageStamper<'a> {
    spec: &'a PaginationSpec,
}

impl<'a> PageStamper<'a> {
    /// Stamper for `spec`.
    pub fn new(spec: &'a PaginationSpec) -> Self {
        Self { spec }
    }

    /// Overlay every page in `page_ids`, which must be the full output
    /// page sequence in order (the total in "of Y" labels is its length).
    ///
    /// Returns the number of pages stamped; zero when the spec draws
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a page object is missing.
    pub fn stamp(&self, doc: &mut Document, page_ids: &[ObjectId]) -> Result<usize> {
        if self.spec.is_noop() || page_ids.is_empty() {
            return Ok(0);
        }

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let save_id = add_content_stream(doc, b"q\n".to_vec());

        let total = page_ids.len();
        let footer = self.spec.footer().map(to_win_ansi);

        for (index, &page_id) in page_ids.iter().enumerate() {
            let label = self
                .spec
                .number_pages
                .then(|| to_win_ansi(&self.spec.label(index, total)));

            let overlay = overlay_content(media_box(doc, page_id), label.as_deref(), footer.as_deref());
            let overlay_id = add_content_stream(doc, overlay);

            add_page_resource(doc, page_id, "Font", FONT_RESOURCE, Object::Reference(font_id))?;
            wrap_page_contents(doc, page_id, Some(save_id), overlay_id)?;
        }

        debug!(pages = total, numbered = self.spec.number_pages, "stamped page overlay");
        Ok(total)
    }
}

/// Overlay operators for one page. Closes the `q` opened before the
/// page's own content.
fn overlay_content(media_box: [f32; 4], label: Option<&[u8]>, footer: Option<&[u8]>) -> Vec<u8> {
    let [llx, lly, urx, _] = media_box;
    let baseline = lly + VERTICAL_INSET + HELVETICA_BOLD_DESCENT * FONT_SIZE / 1000.0;

    let mut content = b"Q\nq\n0 g\n".to_vec();
    if let Some(footer) = footer {
        show_text(&mut content, footer, llx + HORIZONTAL_INSET, baseline);
    }
    if let Some(label) = label {
        let x = urx - HORIZONTAL_INSET - text_width(label, FONT_SIZE);
        show_text(&mut content, label, x, baseline);
    }
    content.extend_from_slice(b"Q\n");
    content
}

fn show_text(content: &mut Vec<u8>, text: &[u8], x: f32, y: f32) {
    content.extend_from_slice(
        format!("BT\n/{FONT_RESOURCE} {FONT_SIZE} Tf\n1 0 0 1 {x:.2} {y:.2} Tm\n(").as_bytes(),
    );
    for &byte in text {
        if matches!(byte, b'(' | b')' | b'\\') {
            content.push(b'\\');
        }
        content.push(byte);
    }
    content.extend_from_slice(b") Tj\nET\n");
}
