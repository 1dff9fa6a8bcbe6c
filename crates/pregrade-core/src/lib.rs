use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod discovery;
pub mod extraction;
pub mod mock;
pub mod model;
pub mod ocr;
pub mod paths;
pub mod pipeline;
pub mod pool;
pub mod prompt;
pub mod severity;
pub mod synthesis;
pub mod text_pdf;

// Re-export for convenience
pub use backend::{BackendError, DocumentBackend, PagedDocument};
pub use discovery::{Discovery, DiscoveryError, discover_submissions, gather_submission_files};
pub use extraction::TextExtractor;
pub use model::{ModelError, ModelRequest, OpenAiChatModel, TextModel};
pub use ocr::{NoOcr, OcrEngine, OcrError, TesseractCli};
pub use pipeline::{Capabilities, RunReport, RunRequest, run};
pub use severity::count_severities;

/// Top-level names (compared case-insensitively) that are never treated as
/// submissions and are pruned when walking a submission folder.
pub const RESERVED_NAMES: [&str; 2] = ["materials", "outputs"];

/// One anonymized submission: a top-level file or folder of the homework root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionUnit {
    /// Zero-padded, 1-based alias ("001", "002", ...) in discovery order.
    pub alias_id: String,
    pub original_name: String,
    /// Where the submission was found. Never modified.
    pub original_path: PathBuf,
    /// Private copy of the submission's files, owned by this alias.
    pub normalized_dir: PathBuf,
    pub notes: String,
}

/// Snapshot of the effective configuration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub submissions_dir: PathBuf,
    pub problem_set_path: Option<PathBuf>,
    pub solutions_path: Option<PathBuf>,
    pub notes: String,
    pub class_info_path: Option<PathBuf>,
    pub max_async: usize,
    pub out_dir: PathBuf,
}

/// Text pulled from a document. Unreadable regions are represented by
/// sentinel markers inside `text`, never by an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    pub total_pages: usize,
    pub ocr_pages_used: usize,
}

/// What the analysis step produced for one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutput {
    /// Response text from the analysis capability.
    Analysis(String),
    /// The alias had no PDF/PNG/JPG files; no external call was made.
    NoSupportedFiles,
    /// Something failed while gathering, extracting or analyzing.
    Failed(String),
}

impl AgentOutput {
    /// Text written to the `agent_output` column.
    pub fn render(&self) -> String {
        match self {
            AgentOutput::Analysis(text) => text.clone(),
            AgentOutput::NoSupportedFiles => {
                "[No supported files (PDF/PNG/JPG) found for this submission.]".to_string()
            }
            AgentOutput::Failed(message) => format!("[ERROR] {}", message),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AgentOutput::Failed(_))
    }
}

/// Result row for one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingOutcome {
    pub alias_id: String,
    pub original_name: String,
    pub major_count: usize,
    pub moderate_count: usize,
    pub output: AgentOutput,
}

impl GradingOutcome {
    /// Build an outcome, deriving severities from analysis text only.
    pub fn new(unit: &SubmissionUnit, output: AgentOutput) -> Self {
        let (major_count, moderate_count) = match &output {
            AgentOutput::Analysis(text) => count_severities(text),
            _ => (0, 0),
        };
        Self {
            alias_id: unit.alias_id.clone(),
            original_name: unit.original_name.clone(),
            major_count,
            moderate_count,
            output,
        }
    }

    pub fn failed(unit: &SubmissionUnit, message: impl Into<String>) -> Self {
        Self::new(unit, AgentOutput::Failed(message.into()))
    }

    pub fn agent_output(&self) -> String {
        self.output.render()
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Discovered {
        count: usize,
    },
    Synthesizing,
    Grading {
        index: usize,
        total: usize,
        alias_id: String,
    },
    Graded {
        index: usize,
        total: usize,
        alias_id: String,
        major: usize,
        moderate: usize,
        failed: bool,
    },
    /// A degraded condition; also recorded in the manifest.
    Warning {
        message: String,
    },
}

/// Callback type used to report [`ProgressEvent`]s.
pub type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Per-document page limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub problem: usize,
    pub solution: usize,
    pub submission: usize,
    /// Problem pages fed to solution synthesis.
    pub synthesis: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            problem: 15,
            solution: 15,
            submission: 25,
            synthesis: 20,
        }
    }
}

/// Runtime settings resolved from CLI flags, environment and config files.
#[derive(Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub analysis_model: String,
    pub generation_model: String,
    /// Optional client-side timeout for model calls. `None` leaves timing
    /// to the remote service.
    pub request_timeout_secs: Option<u64>,
    pub max_async: usize,
    pub dpi: u32,
    pub page_limits: PageLimits,
    pub tesseract_path: Option<PathBuf>,
    pub ocr_lang: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("analysis_model", &self.analysis_model)
            .field("generation_model", &self.generation_model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_async", &self.max_async)
            .field("dpi", &self.dpi)
            .field("page_limits", &self.page_limits)
            .field("tesseract_path", &self.tesseract_path)
            .field("ocr_lang", &self.ocr_lang)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: model::DEFAULT_BASE_URL.to_string(),
            analysis_model: "gpt-5-mini".to_string(),
            generation_model: "gpt-5".to_string(),
            request_timeout_secs: None,
            max_async: 5,
            dpi: extraction::DEFAULT_DPI,
            page_limits: PageLimits::default(),
            tesseract_path: None,
            ocr_lang: "eng".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("homework folder not found or not a directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> SubmissionUnit {
        SubmissionUnit {
            alias_id: "001".into(),
            original_name: "alice.pdf".into(),
            original_path: PathBuf::from("/hw/alice.pdf"),
            normalized_dir: PathBuf::from("/out/students/001"),
            notes: "single file".into(),
        }
    }

    #[test]
    fn analysis_outcome_counts_severities() {
        let outcome = GradingOutcome::new(
            &unit(),
            AgentOutput::Analysis("Major issue found; a moderate mistake.".into()),
        );
        assert_eq!(outcome.major_count, 1);
        assert_eq!(outcome.moderate_count, 1);
        assert_eq!(outcome.agent_output(), "Major issue found; a moderate mistake.");
    }

    #[test]
    fn failed_outcome_has_zero_severities() {
        let outcome = GradingOutcome::failed(&unit(), "major moderate boom");
        assert_eq!(outcome.major_count, 0);
        assert_eq!(outcome.moderate_count, 0);
        assert_eq!(outcome.agent_output(), "[ERROR] major moderate boom");
        assert!(outcome.output.is_failure());
    }

    #[test]
    fn no_supported_files_renders_marker() {
        let outcome = GradingOutcome::new(&unit(), AgentOutput::NoSupportedFiles);
        assert_eq!(outcome.major_count, 0);
        assert!(outcome.agent_output().starts_with("[No supported files"));
    }

    #[test]
    fn settings_debug_redacts_api_key() {
        let settings = Settings {
            api_key: Some("sk-secret".into()),
            ..Settings::default()
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }
}
