//! Test doubles for the document, OCR and model capabilities.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::backend::{BackendError, DocumentBackend, PagedDocument};
use crate::model::{ModelError, ModelRequest, TextModel};
use crate::ocr::{OcrEngine, OcrError};

/// A configurable mock response for [`MockModel`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this text.
    Text(String),
    /// Fail with this message.
    Error(String),
}

/// A hand-rolled mock implementing [`TextModel`] for tests.
///
/// Supports:
/// - A fixed response used for every call.
/// - Failing any request whose input contains a marker string.
/// - Optional per-call latency.
/// - Call counting, recorded inputs, and the high-water mark of
///   simultaneously in-flight calls.
pub struct MockModel {
    name: &'static str,
    response: MockResponse,
    fail_marker: Option<String>,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl MockModel {
    /// Create a mock that always returns `response`.
    pub fn new(name: &'static str, response: MockResponse) -> Self {
        Self {
            name,
            response,
            fail_marker: None,
            delay: None,
            call_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a mock that always answers with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new("mock", MockResponse::Text(text.into()))
    }

    /// Fail every request whose input contains `marker`.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Set simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `complete()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Largest number of calls that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every request input received so far, in arrival order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

impl TextModel for MockModel {
    fn name(&self) -> &str {
        self.name
    }

    fn complete<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(request.input.clone());
        let response = match &self.fail_marker {
            Some(marker) if request.input.contains(marker.as_str()) => {
                MockResponse::Error(format!("simulated failure for {}", marker))
            }
            _ => self.response.clone(),
        };
        let delay = self.delay;

        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match response {
                MockResponse::Text(text) => Ok(text),
                MockResponse::Error(msg) => Err(ModelError::Other(msg)),
            }
        })
    }
}

/// Treats any file as UTF-8 text whose pages are separated by form feeds
/// (`\x0c`). Rendering returns the raw page bytes, so OCR doubles can see
/// which page they were handed.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextDocuments;

struct PlainTextDocument {
    pages: Vec<String>,
}

impl DocumentBackend for PlainTextDocuments {
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument>, BackendError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BackendError::OpenError(e.to_string()))?;
        let pages = content.split('\u{c}').map(str::to_string).collect();
        Ok(Box::new(PlainTextDocument { pages }))
    }
}

impl PagedDocument for PlainTextDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&mut self, index: usize) -> Result<String, BackendError> {
        self.pages
            .get(index)
            .cloned()
            .ok_or(BackendError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
    }

    fn render_page(&mut self, index: usize, _dpi: u32) -> Result<Vec<u8>, BackendError> {
        self.page_text(index).map(String::into_bytes)
    }
}

/// OCR double that is either unavailable or answers with a fixed string.
#[derive(Debug, Clone)]
pub struct MockOcr {
    output: Option<String>,
    calls: std::sync::Arc<AtomicUsize>,
}

impl MockOcr {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            output: Some(text.into()),
            calls: Default::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            output: None,
            calls: Default::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcr {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.output.is_some()
    }

    fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone().ok_or(OcrError::Unavailable)
    }
}
