//! pdfsplice - Assemble a PDF from page ranges of other PDFs.
//!
//! This library builds one output document from an ordered list of merge
//! instructions. It supports:
//!
//! - Lenient 1-based page selection per source
//! - Importing each source's outline, re-anchored onto output pages
//! - Optional titled bookmarks per source at any nesting level
//! - A page numbering and footer pass
//! - A fallback normalizer for sources the primary parser rejects
//! - A diagnostic `<output>.info` sidecar
//!
//! # Examples
//!
//! ## Basic Merge
//!
//! ```no_run
//! use pdfsplice::config::{MergeInstruction, MergeJob, MergeOptions, PaginationFormat, PaginationSpec};
//! use pdfsplice::merge::{BookmarkPolicy, do_merge};
//!
//! let job = MergeJob::new(
//!     vec![
//!         MergeInstruction::new("cover.pdf").titled("Cover", 0),
//!         MergeInstruction::new("report.pdf").pages("2-10").with_bookmarks(),
//!     ],
//!     "merged.pdf",
//! )
//! .with_pagination(PaginationSpec::numbered(PaginationFormat::PageXOfY));
//!
//! let result = do_merge(&job, &MergeOptions::default(), None, &mut BookmarkPolicy::Continue);
//! assert!(result.is_success(), "{}", result.error_message);
//! ```
//!
//! ## Using Individual Components
//!
//! ```no_run
//! use pdfsplice::io::{PdfReader, PdfWriter};
//! use pdfsplice::merge::PageAssembler;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = PdfReader::new().open(Path::new("input.pdf"))?;
//! println!("PDF has {} pages", source.page_count());
//!
//! let mut assembler = PageAssembler::new();
//! assembler.append(source, Some(&[0, 0]))?;
//!
//! let mut output = assembler.into_document();
//! PdfWriter::new().save(&mut output, Path::new("twice.pdf"))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod io;
pub mod merge;
pub mod output;
pub mod utils;

// Re-export commonly used types
pub use config::{MergeInstruction, MergeJob, MergeOptions, PaginationFormat, PaginationSpec};
pub use error::{MergeFailure, PdfSpliceError, Result};
pub use merge::{MergeResult, do_merge};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
