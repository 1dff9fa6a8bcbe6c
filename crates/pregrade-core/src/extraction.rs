//! Text extraction with OCR fallback.
//!
//! Both entry points are total: unreadable pages, images and documents are
//! encoded as sentinel text so a single bad file never aborts a batch.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ExtractionResult;
use crate::backend::DocumentBackend;
use crate::ocr::OcrEngine;

/// Pages whose trimmed text layer is shorter than this are treated as
/// image-only and sent to OCR.
pub const MIN_TEXT_CHARS: usize = 10;

pub const DEFAULT_DPI: u32 = 200;

pub const UNREADABLE_PAGE: &str = "[UNREADABLE_PAGE]";
pub const UNREADABLE_IMAGE: &str = "[UNREADABLE_IMAGE]";
pub const UNREADABLE_DOCUMENT: &str = "[UNREADABLE_DOCUMENT]";

/// Kinds of submission files the analysis step understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    /// Classify by extension (case-insensitive). `None` for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(FileKind::Image),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Pdf => "PDF",
            FileKind::Image => "IMAGE",
        }
    }
}

/// Extracted text of one submission file, tagged by name and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionText {
    pub file_name: String,
    pub kind: FileKind,
    pub extraction: ExtractionResult,
}

/// Document and image text extraction over pluggable backends.
#[derive(Clone)]
pub struct TextExtractor {
    documents: Arc<dyn DocumentBackend>,
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(documents: Arc<dyn DocumentBackend>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { documents, ocr }
    }

    pub fn ocr_available(&self) -> bool {
        self.ocr.is_available()
    }

    /// Extract up to `max_pages` pages (all when `None`), falling back to OCR
    /// for pages without a usable text layer.
    pub fn extract_document(
        &self,
        path: &Path,
        max_pages: Option<usize>,
        dpi: u32,
    ) -> ExtractionResult {
        let mut document = match self.documents.open(path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not open document");
                return ExtractionResult {
                    text: format!("{} {}: {}", UNREADABLE_DOCUMENT, display_name(path), e),
                    total_pages: 0,
                    ocr_pages_used: 0,
                };
            }
        };

        let total = document.page_count();
        let limit = max_pages.map_or(total, |m| m.min(total));
        let mut text = String::new();
        let mut ocr_pages_used = 0;

        for index in 0..limit {
            let layer = match document.page_text(index) {
                Ok(t) => t.trim().to_string(),
                Err(e) => {
                    tracing::debug!(path = %path.display(), page = index + 1, error = %e, "text layer unreadable");
                    String::new()
                }
            };

            let page_text = if layer.chars().count() < MIN_TEXT_CHARS {
                let recognized = document
                    .render_page(index, dpi)
                    .map_err(|e| e.to_string())
                    .and_then(|png| self.ocr.recognize(&png).map_err(|e| e.to_string()));
                match recognized {
                    Ok(t) if !t.trim().is_empty() => {
                        ocr_pages_used += 1;
                        t
                    }
                    Ok(_) => unreadable_page(),
                    Err(reason) => {
                        tracing::debug!(path = %path.display(), page = index + 1, reason = %reason, "OCR fallback failed");
                        unreadable_page()
                    }
                }
            } else {
                layer
            };

            text.push_str(&page_block(index + 1, total, &page_text));
        }

        ExtractionResult {
            text,
            total_pages: total,
            ocr_pages_used,
        }
    }

    /// OCR a single image file.
    pub fn extract_image(&self, path: &Path) -> String {
        let name = display_name(path);
        if !self.ocr.is_available() {
            return unreadable_image(&name);
        }

        let png = match image::open(path) {
            Ok(img) => {
                let mut buf = Cursor::new(Vec::new());
                if let Err(e) = img.write_to(&mut buf, image::ImageFormat::Png) {
                    return format!("[ERROR] Failed to open image {}: {}", name, e);
                }
                buf.into_inner()
            }
            Err(e) => return format!("[ERROR] Failed to open image {}: {}", name, e),
        };

        match self.ocr.recognize(&png) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => unreadable_image(&name),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "image OCR failed");
                unreadable_image(&name)
            }
        }
    }

    /// Extract every supported file, in the given order. Unsupported files
    /// are skipped.
    pub fn extract_submission_files(
        &self,
        files: &[PathBuf],
        max_pages: usize,
        dpi: u32,
    ) -> Vec<SubmissionText> {
        files
            .iter()
            .filter_map(|path| {
                let kind = FileKind::from_path(path)?;
                let extraction = match kind {
                    FileKind::Pdf => self.extract_document(path, Some(max_pages), dpi),
                    FileKind::Image => ExtractionResult {
                        text: self.extract_image(path),
                        total_pages: 1,
                        ocr_pages_used: 0,
                    },
                };
                Some(SubmissionText {
                    file_name: display_name(path),
                    kind,
                    extraction,
                })
            })
            .collect()
    }
}

/// Format one page with its positional header.
pub fn page_block(number: usize, total: usize, text: &str) -> String {
    format!("\n--- PAGE {}/{} ---\n{}\n", number, total, text)
}

fn unreadable_page() -> String {
    format!(
        "{} No extractable text; OCR unavailable/failed.",
        UNREADABLE_PAGE
    )
}

fn unreadable_image(name: &str) -> String {
    format!("{} {}: OCR unavailable or failed.", UNREADABLE_IMAGE, name)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
