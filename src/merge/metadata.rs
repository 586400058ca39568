//! Output document metadata (Info dictionary).
//!
//! Sets Title, Subject and Author from the job, plus Creator, Producer
//! and CreationDate.

use lopdf::{Dictionary, Document, Object};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::DocumentInfo;
use crate::error::{PdfSpliceError, Result};
use crate::utils::{decode_text_string, encode_text_string};

/// Name recorded as Creator and Producer.
pub const PRODUCER: &str = concat!("pdfsplice ", env!("CARGO_PKG_VERSION"));

/// Writer for the output Info dictionary.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataWriter;

impl MetadataWriter {
    /// Create a new metadata writer.
    pub fn new() -> Self {
        Self
    }

    /// Write `info` into the document's Info dictionary.
    ///
    /// Blank fields are left out. The author falls back to the current
    /// user name.
    ///
    /// # Errors
    ///
    /// Returns an error if the trailer points at an Info object that is
    /// not a dictionary.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfsplice::merge::metadata::MetadataWriter;
    /// # use pdfsplice::config::DocumentInfo;
    /// # use lopdf::Document;
    /// # fn example(mut doc: Document) -> Result<(), Box<dyn std::error::Error>> {
    /// let info = DocumentInfo {
    ///     title: Some("Annual report".to_string()),
    ///     ..Default::default()
    /// };
    /// MetadataWriter::new().apply(&mut doc, &info)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn apply(&self, doc: &mut Document, info: &DocumentInfo) -> Result<()> {
        let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => id,
            Err(_) => {
                let id = doc.add_object(Dictionary::new());
                doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };

        let dict = doc.get_dictionary_mut(info_id).map_err(|e| {
            PdfSpliceError::merge_failed(format!("Info dictionary is unusable: {e}"))
        })?;

        let fields = [
            ("Title", info.title.clone()),
            ("Subject", info.subject.clone()),
            ("Author", info.resolved_author()),
        ];
        for (key, value) in fields {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                dict.set(key, encode_text_string(&value));
            }
        }

        dict.set("Creator", encode_text_string(PRODUCER));
        dict.set("Producer", encode_text_string(PRODUCER));
        dict.set(
            "CreationDate",
            encode_text_string(&format_pdf_date(SystemTime::now())),
        );

        Ok(())
    }

    /// Read Title, Subject and Author back from a document.
    pub fn read(&self, doc: &Document) -> DocumentInfo {
        let Some(dict) = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok()
        else {
            return DocumentInfo::default();
        };

        DocumentInfo {
            title: string_field(dict, b"Title"),
            subject: string_field(dict, b"Subject"),
            author: string_field(dict, b"Author"),
        }
    }
}

fn string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// Format a `SystemTime` as a PDF date string, `D:YYYYMMDDHHmmSSZ` (UTC).
pub fn format_pdf_date(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let days = (secs / 86_400) as i64;
    let (year, month, day) = civil_from_days(days);
    let seconds_of_day = secs % 86_400;

    format!(
        "D:{year:04}{month:02}{day:02}{:02}{:02}{:02}Z",
        seconds_of_day / 3_600,
        (seconds_of_day % 3_600) / 60,
        seconds_of_day % 60
    )
}

/// Gregorian date for a count of days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
