//! CLI argument parsing for pdfsplice.
//!
//! This module defines the command-line interface using `clap`, turns the
//! arguments into a [`MergeJob`] and provides the interactive answer to
//! bookmark import failures.

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use pdfsplice::config::{
    DocumentInfo, MergeInstruction, MergeJob, MergeOptions, PaginationFormat, PaginationSpec,
};
use pdfsplice::merge::{
    BookmarkDecision, BookmarkFailure, BookmarkFailureHandler, BookmarkPolicy, BookmarkSeverity,
};
use pdfsplice::utils::collect_paths_for_patterns;

/// Assemble a PDF from page ranges of other PDFs.
///
/// Each ITEM is either a PDF path (glob patterns allowed), taking every
/// page without bookmarks, or a descriptor
/// `path;pages;include|exclude[;title[;level]]`.
#[derive(Parser, Debug)]
#[command(name = "pdfsplice")]
#[command(version)]
#[command(about = "Assemble a PDF from page ranges of other PDFs", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Sources to merge, in output order
    ///
    /// Examples:
    ///   pdfsplice a.pdf "b.pdf;2-4;include;Appendix" -o out.pdf
    ///   pdfsplice chapter*.pdf -o book.pdf
    #[arg(value_name = "ITEM", required_unless_present = "job")]
    pub items: Vec<String>,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE", required_unless_present = "job")]
    pub output: Option<PathBuf>,

    /// Read the whole job from a JSON file
    ///
    /// Items on the command line are appended to the job's instructions;
    /// the other flags override the job's settings when given.
    #[arg(long, value_name = "FILE")]
    pub job: Option<PathBuf>,

    /// Draw a page number label on every page
    #[arg(long)]
    pub number_pages: bool,

    /// Page number label format: page-x-of-y, x/y, page-x or x
    #[arg(long, value_name = "FORMAT", default_value = "page-x-of-y")]
    pub format: String,

    /// Number printed on the first output page
    #[arg(long, value_name = "N", default_value_t = 1, allow_negative_numbers = true)]
    pub start_page: i64,

    /// Footer text drawn bottom-left on every page
    #[arg(long, value_name = "TEXT")]
    pub footer: Option<String>,

    /// Set title metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set subject metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set author metadata for output PDF (defaults to the current user)
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// What to do when a source's bookmarks cannot be imported
    #[arg(long, value_enum, value_name = "MODE", default_value_t = BookmarkErrorMode::Prompt)]
    pub on_bookmark_error: BookmarkErrorMode,

    /// Write <output>.info with page, bookmark and instruction counts
    #[arg(long)]
    pub report: bool,

    /// Write streams uncompressed
    #[arg(long)]
    pub no_compress: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Answer to a failed bookmark import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BookmarkErrorMode {
    /// Ask on the terminal
    Prompt,
    /// Drop that source's bookmarks and keep merging
    Continue,
    /// Cancel the merge
    Abort,
}

impl BookmarkErrorMode {
    /// Build the handler for this mode.
    pub fn handler(self) -> Box<dyn BookmarkFailureHandler> {
        match self {
            Self::Prompt => Box::new(InteractivePrompt::stdio()),
            Self::Continue => Box::new(BookmarkPolicy::Continue),
            Self::Abort => Box::new(BookmarkPolicy::Cancel),
        }
    }
}

impl Cli {
    /// Build the merge job described by the arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the job file cannot be read, a descriptor or
    /// the pagination format does not parse, or the job is empty.
    pub fn to_job(&self) -> anyhow::Result<MergeJob> {
        let mut job = match &self.job {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read job file {}", path.display()))?;
                MergeJob::from_json(&text)
                    .with_context(|| format!("Failed to parse job file {}", path.display()))?
            }
            None => MergeJob::new(Vec::new(), PathBuf::new()),
        };

        job.instructions.extend(self.instructions()?);
        if let Some(output) = &self.output {
            job.output = output.clone();
        }

        if let Some(pagination) = self.pagination()? {
            job.pagination = Some(pagination);
        }

        let info = DocumentInfo {
            title: self.title.clone().or(job.info.title),
            subject: self.subject.clone().or(job.info.subject),
            author: self.author.clone().or(job.info.author),
        };
        job.info = info;
        job.write_report |= self.report;

        if job.instructions.is_empty() {
            bail!("No PDF files to merge");
        }
        job.validate()?;
        Ok(job)
    }

    /// Tuning knobs for the run.
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            compress: !self.no_compress,
            ..Default::default()
        }
    }

    /// Instructions from the positional items.
    fn instructions(&self) -> anyhow::Result<Vec<MergeInstruction>> {
        let mut instructions = Vec::new();
        for item in &self.items {
            if item.contains(';') {
                let instruction = item
                    .parse::<MergeInstruction>()
                    .with_context(|| format!("Invalid instruction '{item}'"))?;
                instructions.push(instruction);
            } else {
                let paths = collect_paths_for_patterns([item.as_str()])
                    .with_context(|| format!("Invalid pattern '{item}'"))?;
                if paths.is_empty() {
                    bail!("No files match '{item}'");
                }
                instructions.extend(paths.into_iter().map(MergeInstruction::new));
            }
        }
        Ok(instructions)
    }

    /// The numbering pass, when any numbering flag is set.
    fn pagination(&self) -> anyhow::Result<Option<PaginationSpec>> {
        if !self.number_pages && self.footer.is_none() {
            return Ok(None);
        }
        let format: PaginationFormat = self.format.parse()?;
        Ok(Some(PaginationSpec {
            number_pages: self.number_pages,
            format,
            start_page_number: self.start_page,
            footer_text: self.footer.clone(),
        }))
    }
}

/// Asks on the terminal whether to continue after a bookmark failure.
///
/// An empty answer or `y` continues; anything else, including end of
/// input, cancels the merge.
pub struct InteractivePrompt<R, W> {
    input: R,
    output: W,
}

impl InteractivePrompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, read from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> InteractivePrompt<R, W> {
    /// Prompt on `output`, reading answers from `input`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, failure: &BookmarkFailure) -> io::Result<String> {
        let heading = match failure.severity {
            BookmarkSeverity::Warning => "Bookmark warning",
            BookmarkSeverity::Error => "Bookmark error",
        };
        write!(
            self.output,
            "{heading}: {failure}\n\nContinue without these bookmarks? [Y/n]: "
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(answer.trim().to_ascii_lowercase())
    }
}

impl<R: BufRead, W: Write> BookmarkFailureHandler for InteractivePrompt<R, W> {
    fn decide(&mut self, failure: &BookmarkFailure) -> BookmarkDecision {
        match self.ask(failure).as_deref() {
            Ok("" | "y" | "yes") => BookmarkDecision::Continue,
            _ => BookmarkDecision::Cancel,
        }
    }
}
