//! Text model capability: prompt in, text out.
//!
//! The same trait serves the analysis capability (one call per alias) and
//! the generation capability (solution synthesis).

pub mod openai;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use openai::{DEFAULT_BASE_URL, OpenAiChatModel};

/// A single prompt: system-level instructions plus the user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub instructions: String,
    pub input: String,
}

impl ModelRequest {
    pub fn new(instructions: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            input: input.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
    #[error("{0}")]
    Other(String),
}

/// A text model backend that turns a request into a response string.
pub trait TextModel: Send + Sync {
    /// Name of the model (e.g., "gpt-5-mini").
    fn name(&self) -> &str;

    /// Run one completion.
    fn complete<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;
}
