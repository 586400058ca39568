//! Merge job configuration.
//!
//! This module holds the data model a merge run consumes:
//! - [`MergeInstruction`]: one source file contribution
//! - [`PageSelector`]: the lenient 1-based page list grammar
//! - [`PaginationSpec`] / [`PaginationFormat`]: the numbering pass settings
//! - [`DocumentInfo`]: Info dictionary values for the output
//! - [`MergeJob`] / [`MergeOptions`]: a whole run and its tuning knobs
//!
//! Every type is serde-serializable so a job can be stored as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PdfSpliceError, Result};

/// Output page count past which consumed sources are released and the
/// output is pruned after every instruction.
pub const DEFAULT_RELEASE_THRESHOLD: usize = 1000;

/// A 1-based page list such as `"1-3,7;9"` or `"all"`.
///
/// Parsing never fails. Tokens that do not parse contribute nothing,
/// and a selector without a single usable token selects the whole
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSelector(String);

impl PageSelector {
    /// Create a selector from its textual form.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The selector that picks every page.
    pub fn all() -> Self {
        Self("all".to_string())
    }

    /// The selector text as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expand the selector into 0-based page indices, in the order given,
    /// for a source of `page_count` pages.
    ///
    /// Tokens are separated by `,` or `;`. Each token is either a single
    /// page `N` or an inclusive range `N-M`. A range with `N > M`, page 0
    /// and any token that is not numeric contribute no indices. A range
    /// starting at 0 begins at page 1. Pages past `page_count` are left
    /// out. Duplicates and descending token order are kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfsplice::config::PageSelector;
    ///
    /// assert_eq!(PageSelector::new("2-4").indices(10), vec![1, 2, 3]);
    /// assert_eq!(PageSelector::new("5,1;1").indices(10), vec![4, 0, 0]);
    /// assert_eq!(PageSelector::new("3-900").indices(4), vec![2, 3]);
    /// assert!(PageSelector::new("all").indices(10).is_empty());
    /// ```
    pub fn indices(&self, page_count: usize) -> Vec<usize> {
        let mut indices = Vec::new();
        for (start, end) in self.ranges() {
            indices.extend((start..=end.min(page_count)).map(|page| page - 1));
        }
        indices
    }

    /// Number of pages the selector asks for, before any are dropped for
    /// lying past the end of a source.
    pub fn requested_count(&self) -> usize {
        self.ranges()
            .into_iter()
            .fold(0, |total, (start, end)| total.saturating_add(end - start + 1))
    }

    /// Whether the selector falls back to the whole document.
    pub fn selects_all(&self) -> bool {
        self.ranges().is_empty()
    }

    /// The usable tokens as 1-based inclusive ranges, `1 <= start <= end`.
    fn ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();

        for token in self.0.split([',', ';']) {
            let parts: Vec<&str> = token
                .split('-')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect();

            let Some(first) = parts.first() else {
                continue;
            };
            let Ok(start) = first.parse::<usize>() else {
                continue;
            };
            let end = match parts.get(1) {
                Some(last) => match last.parse::<usize>() {
                    Ok(end) => end,
                    Err(_) => continue,
                },
                None => start,
            };

            let start = start.max(1);
            if start <= end {
                ranges.push((start, end));
            }
        }

        ranges
    }
}

impl Default for PageSelector {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for PageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One source file contribution to a merge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeInstruction {
    /// Path of the source PDF.
    pub path: PathBuf,

    /// Which pages to take from the source.
    #[serde(default)]
    pub pages: PageSelector,

    /// Import the source's own outline.
    #[serde(default)]
    pub include_bookmarks: bool,

    /// Title of a bookmark pointing at the first contributed page.
    #[serde(default)]
    pub bookmark_title: Option<String>,

    /// Nesting depth for this instruction's bookmarks, 0 = top level.
    #[serde(default)]
    pub bookmark_level: usize,
}

impl MergeInstruction {
    /// Take every page of `path`, without bookmarks.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pages: PageSelector::all(),
            include_bookmarks: false,
            bookmark_title: None,
            bookmark_level: 0,
        }
    }

    /// Restrict the instruction to a page selector.
    pub fn pages(mut self, selector: impl Into<String>) -> Self {
        self.pages = PageSelector::new(selector);
        self
    }

    /// Import the source outline.
    pub fn with_bookmarks(mut self) -> Self {
        self.include_bookmarks = true;
        self
    }

    /// Add a titled bookmark at `level` for the first contributed page.
    pub fn titled(mut self, title: impl Into<String>, level: usize) -> Self {
        self.bookmark_title = Some(title.into());
        self.bookmark_level = level;
        self
    }

    /// The bookmark title, if one was given and is not blank.
    pub fn title(&self) -> Option<&str> {
        self.bookmark_title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
    }

    /// Whether the outline importer has anything to do for this instruction.
    pub fn wants_bookmarks(&self) -> bool {
        self.include_bookmarks || self.title().is_some()
    }

    /// One-line description: `path;pages;include|exclude[;title[;level]]`.
    ///
    /// The level is written only when non-zero. `;` inside the page
    /// selector is written as `,` so the line splits unambiguously.
    pub fn descriptor(&self) -> String {
        let mut line = format!(
            "{};{};{}",
            self.path.display(),
            self.pages.as_str().replace(';', ","),
            if self.include_bookmarks {
                "include"
            } else {
                "exclude"
            }
        );

        if let Some(title) = self.title() {
            line.push(';');
            line.push_str(title);
            if self.bookmark_level > 0 {
                line.push_str(&format!(";{}", self.bookmark_level));
            }
        }

        line
    }
}

impl FromStr for MergeInstruction {
    type Err = PdfSpliceError;

    /// Parse a descriptor line as produced by [`MergeInstruction::descriptor`].
    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.split(';');

        let path = fields.next().map(str::trim).unwrap_or_default();
        if path.is_empty() {
            return Err(PdfSpliceError::invalid_config(format!(
                "Instruction '{s}' has no source path"
            )));
        }

        let pages = match fields.next().map(str::trim) {
            Some(pages) if !pages.is_empty() => PageSelector::new(pages),
            _ => PageSelector::all(),
        };

        let include_bookmarks = match fields.next().map(|f| f.trim().to_ascii_lowercase()) {
            None => false,
            Some(flag) if flag.is_empty() || flag == "exclude" => false,
            Some(flag) if flag == "include" => true,
            Some(flag) => {
                return Err(PdfSpliceError::invalid_config(format!(
                    "Bookmark flag must be 'include' or 'exclude', got '{flag}'"
                )));
            }
        };

        let bookmark_title = fields
            .next()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string);

        let bookmark_level = match fields.next().map(str::trim) {
            None | Some("") => 0,
            Some(level) => level.parse().map_err(|_| {
                PdfSpliceError::invalid_config(format!("Invalid bookmark level: {level}"))
            })?,
        };

        Ok(Self {
            path: PathBuf::from(path),
            pages,
            include_bookmarks,
            bookmark_title,
            bookmark_level,
        })
    }
}

/// Template for the page number label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaginationFormat {
    /// "Page {n} of {total}"
    #[default]
    PageXOfY,
    /// "{n} / {total}"
    XOfY,
    /// "Page {n}"
    PageX,
    /// "{n}"
    X,
}

impl PaginationFormat {
    /// Canonical name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::PageXOfY => "page-x-of-y",
            Self::XOfY => "x/y",
            Self::PageX => "page-x",
            Self::X => "x",
        }
    }

    /// Render the label for page `number` of `total`.
    ///
    /// When numbering does not start at 1 the total is meaningless, so the
    /// "of total" forms drop it.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfsplice::config::PaginationFormat;
    ///
    /// assert_eq!(PaginationFormat::PageXOfY.label(4, 5, 1), "Page 4 of 5");
    /// assert_eq!(PaginationFormat::PageXOfY.label(10, 3, 10), "Page 10");
    /// ```
    pub fn label(&self, number: i64, total: usize, start: i64) -> String {
        match (self, start == 1) {
            (Self::PageXOfY, true) => format!("Page {number} of {total}"),
            (Self::XOfY, true) => format!("{number} / {total}"),
            (Self::PageXOfY | Self::PageX, _) => format!("Page {number}"),
            (Self::XOfY | Self::X, _) => number.to_string(),
        }
    }
}

impl FromStr for PaginationFormat {
    type Err = PdfSpliceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page-x-of-y" | "pagexofy" | "0" => Ok(Self::PageXOfY),
            "x/y" | "x-of-y" | "xofy" | "1" => Ok(Self::XOfY),
            "page-x" | "pagex" | "2" => Ok(Self::PageX),
            "x" | "3" => Ok(Self::X),
            _ => Err(PdfSpliceError::invalid_config(format!(
                "Unknown pagination format: {s}. Must be one of: page-x-of-y, x/y, page-x, x"
            ))),
        }
    }
}

impl TryFrom<String> for PaginationFormat {
    type Error = PdfSpliceError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl TryFrom<i64> for PaginationFormat {
    type Error = PdfSpliceError;

    /// Legacy numeric codes 0 to 3.
    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::PageXOfY),
            1 => Ok(Self::XOfY),
            2 => Ok(Self::PageX),
            3 => Ok(Self::X),
            _ => Err(PdfSpliceError::invalid_config(format!(
                "Unknown pagination format code: {code}"
            ))),
        }
    }
}

impl From<PaginationFormat> for String {
    fn from(format: PaginationFormat) -> Self {
        format.name().to_string()
    }
}

impl fmt::Display for PaginationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings for the page numbering / footer pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSpec {
    /// Draw a page number label on every page.
    pub number_pages: bool,
    /// Label template.
    pub format: PaginationFormat,
    /// Number printed on the first output page.
    pub start_page_number: i64,
    /// Text drawn bottom-left on every page, numbered or not.
    pub footer_text: Option<String>,
}

impl PaginationSpec {
    /// Number pages with `format`, starting at 1.
    pub fn numbered(format: PaginationFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Only draw a footer.
    pub fn footer_only(text: impl Into<String>) -> Self {
        Self {
            number_pages: false,
            footer_text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Set the first page number.
    pub fn starting_at(mut self, start: i64) -> Self {
        self.start_page_number = start;
        self
    }

    /// Set the footer text.
    pub fn with_footer(mut self, text: impl Into<String>) -> Self {
        self.footer_text = Some(text.into());
        self
    }

    /// Footer text, ignoring blank strings.
    pub fn footer(&self) -> Option<&str> {
        self.footer_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Whether the pass would draw nothing.
    pub fn is_noop(&self) -> bool {
        !self.number_pages && self.footer().is_none()
    }

    /// Label for the page at 0-based `index` of `total` pages.
    pub fn label(&self, index: usize, total: usize) -> String {
        let number = self.start_page_number.saturating_add(index as i64);
        self.format.label(number, total, self.start_page_number)
    }
}

impl Default for PaginationSpec {
    fn default() -> Self {
        Self {
            number_pages: true,
            format: PaginationFormat::default(),
            start_page_number: 1,
            footer_text: None,
        }
    }
}

/// Info dictionary values for the output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    /// Document title.
    pub title: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document author. Falls back to the current user name.
    pub author: Option<String>,
}

impl DocumentInfo {
    /// The author to record, defaulting to `$USER` / `%USERNAME%`.
    pub fn resolved_author(&self) -> Option<String> {
        self.author
            .clone()
            .filter(|author| !author.trim().is_empty())
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .filter(|author| !author.trim().is_empty())
    }
}

/// Everything one merge run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeJob {
    /// Ordered source contributions; order is output page order.
    pub instructions: Vec<MergeInstruction>,
    /// Where the merged PDF is written.
    pub output: PathBuf,
    /// Optional numbering / footer pass.
    #[serde(default)]
    pub pagination: Option<PaginationSpec>,
    /// Info dictionary values.
    #[serde(default)]
    pub info: DocumentInfo,
    /// Write the `<output>.info` diagnostic sidecar after a successful run.
    #[serde(default)]
    pub write_report: bool,
}

impl MergeJob {
    /// A job writing `instructions` to `output`, with no pagination.
    pub fn new(instructions: Vec<MergeInstruction>, output: impl Into<PathBuf>) -> Self {
        Self {
            instructions,
            output: output.into(),
            pagination: None,
            info: DocumentInfo::default(),
            write_report: false,
        }
    }

    /// Attach a pagination pass.
    pub fn with_pagination(mut self, pagination: PaginationSpec) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Attach Info dictionary values.
    pub fn with_info(mut self, info: DocumentInfo) -> Self {
        self.info = info;
        self
    }

    /// Request the diagnostic sidecar.
    pub fn with_report(mut self) -> Self {
        self.write_report = true;
        self
    }

    /// Parse a job from JSON.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the JSON does not describe a job,
    /// including unknown pagination formats.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PdfSpliceError::invalid_config(format!("Invalid job file: {e}")))
    }

    /// Check the job can be run at all.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty instruction list or output path.
    pub fn validate(&self) -> Result<()> {
        if self.instructions.is_empty() {
            return Err(PdfSpliceError::invalid_config("No merge instructions given"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(PdfSpliceError::invalid_config("No output path given"));
        }
        if self.instructions.iter().any(|i| i.path == self.output) {
            return Err(PdfSpliceError::invalid_config(format!(
                "Output file is also a source: {}",
                self.output.display()
            )));
        }
        Ok(())
    }

    /// Path of the diagnostic sidecar for this job.
    pub fn report_path(&self) -> PathBuf {
        report_path_for(&self.output)
    }
}

/// `<output>.info`, keeping the output's full file name.
pub fn report_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".info");
    PathBuf::from(name)
}

/// Tuning knobs that do not change what a merge produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Output page count past which sources are released eagerly.
    pub release_threshold: usize,
    /// Compress streams when saving.
    pub compress: bool,
    /// Normalize unparseable sources through the fallback engine.
    pub fallback: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            release_threshold: DEFAULT_RELEASE_THRESHOLD,
            compress: true,
            fallback: true,
        }
    }
}
