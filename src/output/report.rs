//! Diagnostic sidecar for automated verification.
//!
//! After a successful run the merger can write `<output>.info`: sorted
//! `key=value` lines with CRLF endings giving the instruction count, the
//! output page count and the bookmark count.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{PdfSpliceError, Result};
use crate::merge::MergeReport;

/// Key/value pairs written to the sidecar, in file order.
pub fn sidecar_entries(report: &MergeReport) -> BTreeMap<&'static str, usize> {
    BTreeMap::from([
        ("BookMarkCount", report.bookmark_count),
        ("MergeListFileArrayCount", report.instructions_processed),
        ("PageCount", report.page_count),
    ])
}

/// Render the sidecar text.
pub fn render_sidecar(report: &MergeReport) -> String {
    sidecar_entries(report)
        .into_iter()
        .map(|(key, value)| format!("{key}={value}\r\n"))
        .collect()
}

/// Write the sidecar for `report` to `path`.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns `FailedToWrite` if the file cannot be written.
pub fn write_info_sidecar(path: &Path, report: &MergeReport) -> Result<PathBuf> {
    std::fs::write(path, render_sidecar(report)).map_err(|e| PdfSpliceError::FailedToWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(path.to_path_buf())
}

/// Parse sidecar text back into key/value pairs; malformed lines are skipped.
pub fn parse_sidecar(text: &str) -> BTreeMap<String, usize> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.trim().split_once('=')?;
            Some((key.to_string(), value.parse().ok()?))
        })
        .collect()
}
