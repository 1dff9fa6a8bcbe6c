//! OCR capability: turn a rasterized page or image into text.
//!
//! OCR is optional. When no engine is available, extraction degrades to
//! sentinel text instead of failing.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use thiserror::Error;

use crate::Settings;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine not available")]
    Unavailable,
    #[error("OCR failed: {0}")]
    Failed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Whether calling [`recognize`](OcrEngine::recognize) can succeed at all.
    fn is_available(&self) -> bool;

    /// Recognize text in a PNG-encoded image.
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;
}

/// Stand-in used when no OCR engine is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::Unavailable)
    }
}

/// Runs the `tesseract` command-line tool on a temporary PNG file.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    lang: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, lang: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            lang: lang.into(),
        }
    }

    /// Locate the binary: an explicit path if it exists, otherwise a `PATH`
    /// lookup. Returns `None` when tesseract cannot be found.
    pub fn detect(configured: Option<&Path>, lang: &str) -> Option<Self> {
        let binary = match configured {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => which::which(path).ok()?,
            None => which::which("tesseract").ok()?,
        };
        Some(Self::new(binary, lang))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        let mut image = tempfile::Builder::new()
            .prefix("pregrade-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.write_all(png)?;
        image.flush()?;

        let output = Command::new(&self.binary)
            .arg(image.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Pick the OCR engine for these settings, falling back to [`NoOcr`].
pub fn engine_from_settings(settings: &Settings) -> Arc<dyn OcrEngine> {
    match TesseractCli::detect(settings.tesseract_path.as_deref(), &settings.ocr_lang) {
        Some(engine) => {
            tracing::info!(binary = %engine.binary().display(), "using tesseract for OCR");
            Arc::new(engine)
        }
        None => {
            tracing::warn!("tesseract not found; OCR disabled");
            Arc::new(NoOcr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ocr_is_unavailable() {
        let engine = NoOcr;
        assert!(!engine.is_available());
        assert!(matches!(engine.recognize(b"png"), Err(OcrError::Unavailable)));
    }

    #[test]
    fn detect_with_missing_explicit_path_returns_none() {
        let missing = std::env::temp_dir().join("pregrade-definitely-missing-tesseract-bin");
        assert!(TesseractCli::detect(Some(&missing), "eng").is_none());
    }
}
