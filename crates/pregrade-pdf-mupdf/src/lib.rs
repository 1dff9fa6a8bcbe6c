use std::path::Path;

use mupdf::{Colorspace, Document, ImageFormat, Matrix, TextPageFlags};

use pregrade_core::{BackendError, DocumentBackend, PagedDocument};

/// MuPDF-based implementation of [`DocumentBackend`].
///
/// Keeps the AGPL mupdf dependency out of `pregrade-core`, so the core
/// crate can be tested against plain-text documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentBackend for MupdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;
        let page_count = document
            .page_count()
            .map_err(|e| BackendError::OpenError(e.to_string()))?;

        Ok(Box::new(MupdfDocument {
            document,
            page_count: page_count.max(0) as usize,
        }))
    }
}

struct MupdfDocument {
    document: Document,
    page_count: usize,
}

impl MupdfDocument {
    fn load(&self, index: usize) -> Result<mupdf::Page, BackendError> {
        if index >= self.page_count {
            return Err(BackendError::PageOutOfRange {
                index,
                count: self.page_count,
            });
        }
        self.document
            .load_page(index as i32)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))
    }
}

impl PagedDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&mut self, index: usize) -> Result<String, BackendError> {
        let page = self.load(index)?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        // Block/line iteration keeps one output line per layout line
        let mut page_text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                page_text.push_str(&line_text);
                page_text.push('\n');
            }
        }
        Ok(page_text)
    }

    fn render_page(&mut self, index: usize, dpi: u32) -> Result<Vec<u8>, BackendError> {
        let page = self.load(index)?;
        // PDF user space is 72 units per inch
        let zoom = dpi.max(1) as f32 / 72.0;
        let pixmap = page
            .to_pixmap(
                &Matrix::new_scale(zoom, zoom),
                &Colorspace::device_rgb(),
                false,
                true,
            )
            .map_err(|e| BackendError::RenderError(e.to_string()))?;

        let mut png = Vec::new();
        pixmap
            .write_to(&mut png, ImageFormat::PNG)
            .map_err(|e| BackendError::RenderError(e.to_string()))?;
        Ok(png)
    }
}
