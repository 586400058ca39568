//! PDF source loading.
//!
//! This module opens a source PDF as a random-access page collection:
//! - Path checks with errors that name the offending file
//! - Primary parse with lopdf
//! - Fallback normalization through qpdf for files lopdf rejects
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::io::reader::PdfReader;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let source = reader.open(Path::new("document.pdf"))?;
//! println!("{} pages, PDF {}", source.page_count(), source.version());
//! # Ok(())
//! # }
//! ```

use lopdf::{Document, ObjectId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::normalize;
use crate::error::{PdfSpliceError, Result};

/// Where a source comes from.
#[derive(Debug, Clone, Copy)]
pub enum PdfSource<'a> {
    /// A file on disk.
    Path(&'a Path),
    /// An in-memory PDF, labelled for error messages.
    Bytes {
        /// Raw PDF bytes.
        data: &'a [u8],
        /// Name used in errors and logs.
        label: &'a Path,
    },
}

/// An opened source document.
#[derive(Debug)]
pub struct SourceDocument {
    /// The parsed document.
    pub document: Document,

    /// Path (or label) of the source.
    pub path: PathBuf,

    /// Page object ids in page order.
    pub page_ids: Vec<ObjectId>,

    /// Whether the fallback normalizer was needed.
    pub normalized: bool,

    /// Time taken to open the document.
    pub load_time: Duration,
}

impl SourceDocument {
    fn new(document: Document, path: &Path, normalized: bool, started: Instant) -> Self {
        let page_ids = document.get_pages().into_values().collect();
        Self {
            document,
            path: path.to_path_buf(),
            page_ids,
            normalized,
            load_time: started.elapsed(),
        }
    }

    /// Number of pages in the source.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Declared PDF version, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// 0-based index of the page object `page_id`, by linear scan.
    pub fn page_index(&self, page_id: ObjectId) -> Option<usize> {
        self.page_ids.iter().position(|id| *id == page_id)
    }
}

/// PDF reader with configurable fallback behavior.
#[derive(Debug, Clone)]
pub struct PdfReader {
    /// Whether to normalize unparseable files through the fallback engine.
    fallback: bool,
}

impl PdfReader {
    /// Create a reader with fallback normalization enabled.
    pub fn new() -> Self {
        Self { fallback: true }
    }

    /// Create a reader that fails on the first parse error.
    pub fn without_fallback() -> Self {
        Self { fallback: false }
    }

    /// Create a reader with an explicit fallback setting.
    pub fn with_fallback(fallback: bool) -> Self {
        Self { fallback }
    }

    /// Verify that `path` exists and is a regular file.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound`, `NotAFile` or `FileNotAccessible`.
    pub fn check_path_exists(path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PdfSpliceError::file_not_found(path),
            _ => PdfSpliceError::FileNotAccessible {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        if !metadata.is_file() {
            return Err(PdfSpliceError::not_a_file(path));
        }

        Ok(())
    }

    /// Open a source from a path or a byte buffer.
    ///
    /// # Errors
    ///
    /// See [`PdfReader::open`] and [`PdfReader::open_bytes`].
    pub fn load(&self, source: PdfSource<'_>) -> Result<SourceDocument> {
        match source {
            PdfSource::Path(path) => self.open(path),
            PdfSource::Bytes { data, label } => self.open_bytes(data, label),
        }
    }

    /// Open a source PDF file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File does not exist or cannot be read
    /// - Neither lopdf nor the fallback can parse it
    /// - PDF is encrypted
    pub fn open(&self, path: &Path) -> Result<SourceDocument> {
        Self::check_path_exists(path)?;

        let bytes = std::fs::read(path).map_err(|e| PdfSpliceError::FileNotAccessible {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.open_bytes(&bytes, path)
    }

    /// Open a PDF held in memory. `label` names it in errors.
    ///
    /// # Errors
    ///
    /// Returns `FailedToLoadPdf` when both parse attempts fail (the reason
    /// carries both messages) and `EncryptedPdf` for encrypted input.
    pub fn open_bytes(&self, bytes: &[u8], label: &Path) -> Result<SourceDocument> {
        let started = Instant::now();

        let (document, normalized) = match Document::load_mem(bytes) {
            Ok(document) => (document, false),
            Err(primary) if self.fallback => {
                warn!(
                    path = %label.display(),
                    error = %primary,
                    "primary parse failed, normalizing through fallback"
                );
                (self.load_normalized(bytes, label, &primary)?, true)
            }
            Err(primary) => {
                return Err(PdfSpliceError::failed_to_load_pdf(label, primary.to_string()));
            }
        };

        if document.trailer.has(b"Encrypt") {
            return Err(PdfSpliceError::encrypted_pdf(label));
        }

        let source = SourceDocument::new(document, label, normalized, started);
        if source.page_count() == 0 {
            warn!(path = %label.display(), "source has no pages");
        }
        debug!(
            path = %label.display(),
            pages = source.page_count(),
            version = %source.version(),
            normalized,
            elapsed = ?source.load_time,
            "opened source"
        );

        Ok(source)
    }

    fn load_normalized(
        &self,
        bytes: &[u8],
        label: &Path,
        primary: &lopdf::Error,
    ) -> Result<Document> {
        let buffer = normalize::normalize(bytes).map_err(|fallback| {
            PdfSpliceError::failed_to_load_pdf(label, format!("{primary}; fallback: {fallback}"))
        })?;

        let mut document = Document::load_mem(&buffer).map_err(|e| {
            PdfSpliceError::failed_to_load_pdf(
                label,
                format!("{primary}; after normalization: {e}"),
            )
        })?;

        normalize::flatten_form_fields(&mut document)?;
        Ok(document)
    }
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}
