use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("failed to render page: {0}")]
    RenderError(String),
    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for document backends (text layer + rasterization).
///
/// Implementors provide the low-level per-page steps; the OCR fallback and
/// sentinel handling live in [`crate::extraction::TextExtractor`].
pub trait DocumentBackend: Send + Sync {
    /// Open a document for page-by-page access.
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument>, BackendError>;
}

/// An opened document. Not required to be `Send`; extraction runs on a
/// blocking thread that owns the handle for its whole lifetime.
pub trait PagedDocument {
    fn page_count(&self) -> usize;

    /// Embedded text layer of the page at `index` (0-based).
    fn page_text(&mut self, index: usize) -> Result<String, BackendError>;

    /// Rasterize the page at `index` to PNG bytes at `dpi`.
    fn render_page(&mut self, index: usize, dpi: u32) -> Result<Vec<u8>, BackendError>;
}
