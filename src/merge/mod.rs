//! PDF merging operations.
//!
//! This module provides the core merge engine:
//! - Page assembly from selected source pages
//! - Outline import and re-anchoring onto output pages
//! - Building and writing the output outline
//! - The page numbering / footer pass
//! - Info dictionary metadata
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::config::{MergeInstruction, MergeJob, MergeOptions};
//! use pdfsplice::merge::{BookmarkPolicy, do_merge};
//!
//! let job = MergeJob::new(
//!     vec![
//!         MergeInstruction::new("a.pdf").with_bookmarks(),
//!         MergeInstruction::new("b.pdf").pages("1-2"),
//!     ],
//!     "merged.pdf",
//! );
//!
//! let result = do_merge(&job, &MergeOptions::default(), None, &mut BookmarkPolicy::Continue);
//! if !result.is_success() {
//!     eprintln!("{}", result.error_message);
//! }
//! ```

pub mod bookmarks;
pub mod merger;
pub mod metadata;
pub mod outline;
pub mod pages;
pub mod pagination;

pub use bookmarks::{BookmarkTree, OutlineNode};
pub use merger::{
    BookmarkDecision, BookmarkFailure, BookmarkFailureHandler, BookmarkPolicy, BookmarkSeverity,
    MergeReport, MergeResult, Merger, ProgressSink, do_merge,
};
pub use metadata::MetadataWriter;
pub use outline::{Destination, OutlineImporter};
pub use pages::PageAssembler;
pub use pagination::PageStamper;
