//! Merge orchestration.
//!
//! [`Merger::run`] drives one merge: each instruction's source is opened,
//! its outline imported and its pages appended, then the numbering pass,
//! the outline, the Info dictionary and finally the output file are
//! written. Nothing is written to the output path until every
//! instruction has succeeded.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::bookmarks::BookmarkTree;
use super::metadata::MetadataWriter;
use super::outline::OutlineImporter;
use super::pages::PageAssembler;
use super::pagination::PageStamper;
use crate::config::{MergeInstruction, MergeJob, MergeOptions};
use crate::error::{MergeFailure, PdfSpliceError, Result};
use crate::io::{PdfReader, PdfWriter, SourceDocument, WriteOptions};
use crate::output::report::write_info_sidecar;

/// Receives each instruction's descriptor as it starts.
pub trait ProgressSink {
    /// Called before instruction `index` (0-based) is processed.
    fn instruction_started(&mut self, index: usize, descriptor: &str);
}

impl ProgressSink for Vec<String> {
    fn instruction_started(&mut self, _index: usize, descriptor: &str) {
        self.push(descriptor.to_string());
    }
}

impl ProgressSink for UnboundedSender<String> {
    fn instruction_started(&mut self, _index: usize, descriptor: &str) {
        // A closed receiver only means nobody is watching.
        let _ = self.send(descriptor.to_string());
    }
}

/// How a bookmark import failure is framed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkSeverity {
    /// The message starts with "Warning".
    Warning,
    /// Anything else.
    Error,
}

/// A failed outline import, offered to the caller for a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkFailure {
    /// Warning or error framing.
    pub severity: BookmarkSeverity,
    /// The import error's message.
    pub message: String,
    /// Descriptor of the instruction whose bookmarks failed.
    pub descriptor: String,
}

impl BookmarkFailure {
    fn new(error: &PdfSpliceError, descriptor: &str) -> Self {
        Self {
            severity: if error.is_warning() {
                BookmarkSeverity::Warning
            } else {
                BookmarkSeverity::Error
            },
            message: error.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}

impl fmt::Display for BookmarkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\nOn: {}", self.message, self.descriptor)
    }
}

/// The caller's answer to a [`BookmarkFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkDecision {
    /// Merge without this source's bookmarks.
    Continue,
    /// Abort the whole merge.
    Cancel,
}

/// Decides whether a merge survives a bookmark import failure.
pub trait BookmarkFailureHandler {
    /// Decide for one failure.
    fn decide(&mut self, failure: &BookmarkFailure) -> BookmarkDecision;
}

/// A fixed answer for every failure, for unattended runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkPolicy {
    /// Always continue.
    Continue,
    /// Always cancel.
    Cancel,
}

impl BookmarkFailureHandler for BookmarkPolicy {
    fn decide(&mut self, _failure: &BookmarkFailure) -> BookmarkDecision {
        match self {
            BookmarkPolicy::Continue => BookmarkDecision::Continue,
            BookmarkPolicy::Cancel => BookmarkDecision::Cancel,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Number of instructions processed.
    pub instructions_processed: usize,
    /// Pages in the output.
    pub page_count: usize,
    /// Bookmarks in the output outline.
    pub bookmark_count: usize,
    /// PDF version of the output.
    pub version: String,
    /// Descriptor of every instruction, in processing order.
    pub trace: Vec<String>,
    /// Size of the written output in bytes.
    pub output_size: u64,
    /// Where the diagnostic sidecar was written, if requested.
    pub sidecar: Option<PathBuf>,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

/// Outcome of [`do_merge`]: an empty `error_message` means success.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// The first fatal error, annotated with the instruction in flight.
    pub error_message: String,
    /// The requested output path.
    pub output_path: PathBuf,
    /// Details of a successful run.
    pub report: Option<MergeReport>,
}

impl MergeResult {
    /// Whether the run succeeded and the output exists.
    pub fn is_success(&self) -> bool {
        self.error_message.is_empty()
    }
}

/// Run `job` and flatten the outcome into a [`MergeResult`].
///
/// Safe to call again with the same job after a failure; no state
/// survives between calls.
pub fn do_merge(
    job: &MergeJob,
    options: &MergeOptions,
    progress: Option<&mut dyn ProgressSink>,
    handler: &mut dyn BookmarkFailureHandler,
) -> MergeResult {
    let merger = Merger::new(options.clone());
    match merger.run(job, progress, handler) {
        Ok(report) => MergeResult {
            error_message: String::new(),
            output_path: job.output.clone(),
            report: Some(report),
        },
        Err(failure) => {
            warn!(error = %failure.error, "merge failed");
            MergeResult {
                error_message: failure.to_string(),
                output_path: job.output.clone(),
                report: None,
            }
        }
    }
}

/// PDF merger driving one run per [`Merger::run`] call.
#[derive(Debug, Clone)]
pub struct Merger {
    /// Reader for source documents.
    reader: PdfReader,

    /// Writer for the output.
    writer: PdfWriter,

    /// Tuning knobs.
    options: MergeOptions,
}

impl Merger {
    /// Create a merger with the given options.
    pub fn new(options: MergeOptions) -> Self {
        let writer = PdfWriter::with_options(WriteOptions {
            compress: options.compress,
            ..Default::default()
        });
        Self {
            reader: PdfReader::with_fallback(options.fallback),
            writer,
            options,
        }
    }

    /// Merge `job` and write its output.
    ///
    /// `progress` receives each instruction's descriptor as it starts.
    /// `handler` decides whether a failed outline import cancels the run.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, carrying the descriptor of the
    /// instruction in flight. The output path is untouched on error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pdfsplice::config::{MergeInstruction, MergeJob, MergeOptions};
    /// use pdfsplice::merge::{BookmarkPolicy, Merger};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let job = MergeJob::new(
    ///     vec![
    ///         MergeInstruction::new("a.pdf"),
    ///         MergeInstruction::new("b.pdf").pages("2-4").titled("Appendix", 0),
    ///     ],
    ///     "merged.pdf",
    /// );
    /// let report = Merger::new(MergeOptions::default())
    ///     .run(&job, None, &mut BookmarkPolicy::Continue)?;
    /// println!("{} pages, {} bookmarks", report.page_count, report.bookmark_count);
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(
        &self,
        job: &MergeJob,
        mut progress: Option<&mut dyn ProgressSink>,
        handler: &mut dyn BookmarkFailureHandler,
    ) -> std::result::Result<MergeReport, MergeFailure> {
        let started = Instant::now();
        job.validate()?;

        let mut assembler = PageAssembler::new();
        let mut tree = BookmarkTree::new();
        let mut trace = Vec::with_capacity(job.instructions.len());
        let mut bookmark_count = 0;

        for (index, instruction) in job.instructions.iter().enumerate() {
            let descriptor = instruction.descriptor();
            if let Some(sink) = progress.as_mut() {
                sink.instruction_started(index, &descriptor);
            }
            info!(
                instruction = index + 1,
                of = job.instructions.len(),
                descriptor = %descriptor,
                "processing instruction"
            );

            bookmark_count += self
                .process(&mut assembler, &mut tree, instruction, &descriptor, handler)
                .map_err(|e| MergeFailure::during(e, descriptor.as_str()))?;
            trace.push(descriptor);
        }

        let page_ids = assembler.page_ids().to_vec();
        if page_ids.is_empty() {
            warn!(output = %job.output.display(), "merge produced no pages");
        }
        let mut document = assembler.into_document();

        if let Some(spec) = &job.pagination {
            PageStamper::new(spec).stamp(&mut document, &page_ids)?;
        }
        tree.write_to(&mut document, &page_ids)?;
        MetadataWriter::new().apply(&mut document, &job.info)?;

        let version = document.version.clone();
        let stats = self.writer.save(&mut document, &job.output)?;
        drop(document);

        let mut report = MergeReport {
            instructions_processed: job.instructions.len(),
            page_count: page_ids.len(),
            bookmark_count,
            version,
            trace,
            output_size: stats.file_size,
            sidecar: None,
            elapsed: started.elapsed(),
        };

        if job.write_report {
            match write_info_sidecar(&job.report_path(), &report) {
                Ok(path) => report.sidecar = Some(path),
                // The merged file is already committed, so this is not a merge failure.
                Err(e) => warn!(error = %e, "failed to write diagnostic sidecar"),
            }
        }

        info!(
            pages = report.page_count,
            bookmarks = report.bookmark_count,
            elapsed = ?report.elapsed,
            "merge complete"
        );
        Ok(report)
    }

    /// Open one source, import its bookmarks and append its pages.
    ///
    /// Returns the number of bookmarks imported.
    fn process(
        &self,
        assembler: &mut PageAssembler,
        tree: &mut BookmarkTree,
        instruction: &MergeInstruction,
        descriptor: &str,
        handler: &mut dyn BookmarkFailureHandler,
    ) -> Result<usize> {
        let source = self.reader.open(&instruction.path)?;
        let selection = selected_pages(instruction, &source);
        let added = selection.as_ref().map_or(source.page_count(), Vec::len);
        let page_base = assembler.page_count();

        let mut imported = 0;
        if instruction.wants_bookmarks() {
            if added == 0 {
                warn!(
                    path = %instruction.path.display(),
                    "no pages contributed, bookmarks skipped"
                );
            } else {
                imported = self.import_bookmarks(
                    tree,
                    &source,
                    selection.as_deref(),
                    page_base,
                    instruction,
                    descriptor,
                    handler,
                )?;
            }
        }

        let version = source.version().to_string();
        let appended = assembler.append(source, selection.as_deref())?;
        if assembler.upgrade_version(&version) {
            debug!(version = %version, "raised output version");
        }

        if assembler.page_count() > self.options.release_threshold {
            assembler.reclaim();
        }

        debug!(appended, imported, total = assembler.page_count(), "instruction done");
        Ok(imported)
    }

    /// Import bookmarks, restoring the tree and asking `handler` on failure.
    #[allow(clippy::too_many_arguments)]
    fn import_bookmarks(
        &self,
        tree: &mut BookmarkTree,
        source: &SourceDocument,
        selection: Option<&[usize]>,
        page_base: usize,
        instruction: &MergeInstruction,
        descriptor: &str,
        handler: &mut dyn BookmarkFailureHandler,
    ) -> Result<usize> {
        let snapshot = tree.clone();

        let result = OutlineImporter::new(source, page_base)
            .with_included(selection)
            .import(
                tree,
                instruction.title(),
                instruction.bookmark_level,
                instruction.include_bookmarks,
            );

        match result {
            Ok(count) => Ok(count),
            Err(error) if error.is_fatal() => Err(error),
            Err(error) => {
                *tree = snapshot;
                let failure = BookmarkFailure::new(&error, descriptor);
                warn!(
                    severity = ?failure.severity,
                    error = %error,
                    descriptor = %descriptor,
                    "bookmark import failed"
                );

                match handler.decide(&failure) {
                    BookmarkDecision::Continue => Ok(0),
                    BookmarkDecision::Cancel => Err(PdfSpliceError::BookmarkCancelled {
                        reason: error.to_string(),
                    }),
                }
            }
        }
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(MergeOptions::default())
    }
}

/// The 0-based pages to append, or `None` for the whole document.
///
/// Indices past the end of the source are dropped with a warning.
fn selected_pages(instruction: &MergeInstruction, source: &SourceDocument) -> Option<Vec<usize>> {
    let selector = &instruction.pages;
    if selector.selects_all() {
        return None;
    }

    let page_count = source.page_count();
    let kept = selector.indices(page_count);
    let skipped = selector.requested_count().saturating_sub(kept.len());
    if skipped > 0 {
        warn!(
            path = %instruction.path.display(),
            skipped,
            pages = page_count,
            "selected pages past the end of the source were skipped"
        );
    }
    Some(kept)
}
