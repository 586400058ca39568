//! I/O operations for pdfsplice.
//!
//! This module handles all file I/O operations including:
//! - Opening source PDFs from disk or memory
//! - Normalizing sources the primary parser rejects
//! - Writing the merged PDF to disk atomically
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::io::{PdfReader, PdfWriter};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let mut source = reader.open(Path::new("input.pdf"))?;
//!
//! let writer = PdfWriter::new();
//! writer.save(&mut source.document, Path::new("copy.pdf"))?;
//! # Ok(())
//! # }
//! ```

pub mod normalize;
pub mod reader;
pub mod writer;

pub use reader::{PdfReader, PdfSource, SourceDocument};
pub use writer::{PdfWriter, WriteOptions, WriteStatistics};
