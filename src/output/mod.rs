//! Output formatting and reporting for pdfsplice.
//!
//! This module handles everything produced besides the merged PDF:
//! - Formatted status messages for the console
//! - The merge summary
//! - The `<output>.info` diagnostic sidecar

pub mod formatter;
pub mod report;

pub use formatter::{MessageLevel, OutputFormatter};
pub use report::write_info_sidecar;

use crate::io::writer::format_file_size;
use crate::merge::MergeReport;

/// Display the summary of a successful merge.
///
/// # Arguments
///
/// * `formatter` - Output formatter to use
/// * `report` - Report of the finished run
pub fn display_merge_report(formatter: &OutputFormatter, report: &MergeReport) {
    formatter.success(&format!(
        "Merged {} instruction(s) into {} page(s) with {} bookmark(s)",
        report.instructions_processed, report.page_count, report.bookmark_count
    ));
    formatter.detail("PDF version", &report.version);
    formatter.detail("Output size", &format_file_size(report.output_size));
    formatter.detail("Elapsed", &format!("{:.2?}", report.elapsed));
    if let Some(sidecar) = &report.sidecar {
        formatter.detail("Report", &sidecar.display().to_string());
    }
}
