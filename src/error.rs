//! Error types for pdfsplice.
//!
//! Every fallible operation in the library returns [`PdfSpliceError`].
//! A failed merge run surfaces exactly one of these, wrapped in a
//! [`MergeFailure`] that remembers which instruction was being processed.
//!
//! # Error Categories
//!
//! - **I/O Errors**: source not found, output not writable
//! - **PDF Errors**: unparseable or encrypted sources
//! - **Bookmark Errors**: outline structures that cannot be imported
//! - **Configuration Errors**: bad pagination formats, bad descriptors

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for pdfsplice operations.
pub type Result<T> = std::result::Result<T, PdfSpliceError>;

/// Main error type for pdfsplice operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfSpliceError {
    /// Source file was not found.
    #[error("Could not find file: {}", path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Source path exists but is not a regular file.
    #[error("Not a file: {}", path.display())]
    NotAFile {
        /// Offending path.
        path: PathBuf,
    },

    /// Source file could not be read.
    #[error("Cannot access file: {}\n  Reason: {source}", path.display())]
    FileNotAccessible {
        /// Path to the inaccessible file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Neither the primary parser nor the fallback could load the PDF.
    #[error("Failed to load PDF: {}\n  Reason: {reason}", path.display())]
    FailedToLoadPdf {
        /// Path (or label) of the source.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Source is encrypted.
    #[error(
        "PDF is encrypted and cannot be processed: {}\n  \
         Hint: Decrypt the PDF first using 'qpdf --decrypt' or similar tools",
        path.display()
    )]
    EncryptedPdf {
        /// Path to the encrypted PDF.
        path: PathBuf,
    },

    /// Failed to create the output file.
    #[error("Failed to create output file: {}\n  Reason: {source}", path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to write the output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A bookmark was added more than one level below the current leaf.
    #[error("Bookmark hierarchy is invalid: '{title}' cannot be placed at level {level}")]
    BookmarkHierarchy {
        /// Sanitized title of the rejected bookmark.
        title: String,
        /// Requested nesting level.
        level: usize,
    },

    /// The source outline could not be walked.
    #[error("Malformed outline: {reason}")]
    MalformedOutline {
        /// What was wrong with the outline.
        reason: String,
    },

    /// The source outline links back to an item already visited.
    #[error("Warning: outline of {} contains a cycle, its bookmarks were truncated", path.display())]
    OutlineCycle {
        /// Source whose outline loops.
        path: PathBuf,
    },

    /// A bookmark targets a page past the end of the output.
    #[error("Bookmark '{title}' targets page {page} but the output has {page_count} page(s)")]
    BookmarkTarget {
        /// Bookmark title.
        title: String,
        /// 1-based target page.
        page: usize,
        /// Number of pages in the output.
        page_count: usize,
    },

    /// The caller chose to abort after a bookmark import failure.
    #[error("Merge cancelled due to bookmark issue: {reason}")]
    BookmarkCancelled {
        /// Message of the import failure that prompted the cancel.
        reason: String,
    },

    /// Merge operation failed.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Error raised by the PDF object layer.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl PdfSpliceError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: impl Into<PathBuf>) -> Self {
        Self::NotAFile { path: path.into() }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an EncryptedPdf error.
    pub fn encrypted_pdf(path: impl Into<PathBuf>) -> Self {
        Self::EncryptedPdf { path: path.into() }
    }

    /// Create a MalformedOutline error.
    pub fn malformed_outline(reason: impl Into<String>) -> Self {
        Self::MalformedOutline {
            reason: reason.into(),
        }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether this error is framed as a warning when offered to the caller.
    ///
    /// Warnings are the errors whose message starts with `"Warning"`.
    pub fn is_warning(&self) -> bool {
        self.to_string()
            .get(..7)
            .is_some_and(|head| head.eq_ignore_ascii_case("warning"))
    }

    /// Whether this error arose while importing a source's outline.
    ///
    /// These are the errors the orchestrator offers to the caller as a
    /// continue-or-cancel decision instead of aborting.
    pub fn is_bookmark_import_error(&self) -> bool {
        matches!(
            self,
            Self::BookmarkHierarchy { .. }
                | Self::MalformedOutline { .. }
                | Self::OutlineCycle { .. }
        )
    }

    /// Check if this error should stop all processing immediately.
    pub fn is_fatal(&self) -> bool {
        !self.is_bookmark_import_error()
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::NotAFile { .. } | Self::FileNotAccessible { .. } => 2,
            Self::FailedToLoadPdf { .. } | Self::EncryptedPdf { .. } => 3,
            Self::FailedToCreateOutput { .. } | Self::FailedToWrite { .. } => 4,
            Self::InvalidConfig { .. } => 5,
            Self::BookmarkCancelled { .. } => 130,
            _ => 1,
        }
    }
}

/// The single error surfaced by a failed merge run.
///
/// Carries the descriptor of the instruction that was being processed
/// when the failure happened, if any.
#[derive(Debug)]
pub struct MergeFailure {
    /// The first fatal error.
    pub error: PdfSpliceError,
    /// Descriptor of the instruction in flight.
    pub descriptor: Option<String>,
}

impl MergeFailure {
    /// Wrap an error raised outside any instruction.
    pub fn new(error: PdfSpliceError) -> Self {
        Self {
            error,
            descriptor: None,
        }
    }

    /// Wrap an error raised while `descriptor` was being processed.
    pub fn during(error: PdfSpliceError, descriptor: impl Into<String>) -> Self {
        Self {
            error,
            descriptor: Some(descriptor.into()),
        }
    }
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.descriptor {
            Some(descriptor) => write!(f, "{}\nOn instruction:\n{descriptor}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for MergeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<PdfSpliceError> for MergeFailure {
    fn from(error: PdfSpliceError) -> Self {
        Self::new(error)
    }
}
