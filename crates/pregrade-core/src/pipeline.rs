//! One pre-review run: `Discover → [Synthesize] → Dispatch → Aggregate`.
//!
//! Persisting the artifacts is left to the caller (see `pregrade-reporting`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::DocumentBackend;
use crate::discovery::discover_submissions;
use crate::extraction::TextExtractor;
use crate::model::TextModel;
use crate::ocr::OcrEngine;
use crate::paths::read_class_info;
use crate::pool::{GradingContext, grade_submissions};
use crate::prompt::analysis_instructions;
use crate::synthesis::{SynthesisInputs, SynthesizedSolution, synthesize_solution};
use crate::text_pdf::paginated_text;
use crate::{
    CoreError, ExtractionResult, GradingOutcome, ProgressEvent, ProgressFn, RunConfig, Settings,
    SubmissionUnit,
};

/// Name of the per-alias working copies folder under the output directory.
pub const STUDENTS_DIR: &str = "students";

/// External collaborators of a run.
#[derive(Clone)]
pub struct Capabilities {
    pub documents: Arc<dyn DocumentBackend>,
    pub ocr: Arc<dyn OcrEngine>,
    pub analysis: Arc<dyn TextModel>,
    /// Used only when no solutions PDF is found. `None` disables synthesis.
    pub generation: Option<Arc<dyn TextModel>>,
}

/// What to run on. Paths are already resolved by the caller.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub root: PathBuf,
    /// Expected problem set location; may not exist.
    pub problem_set: PathBuf,
    /// Expected solutions location; synthesis kicks in when it does not exist.
    pub solutions: PathBuf,
    pub notes: String,
    pub class_info: Option<PathBuf>,
    pub out_dir: PathBuf,
}

/// Everything a run produced, ready to be persisted.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub config: RunConfig,
    pub units: Vec<SubmissionUnit>,
    /// One per unit, in discovery order.
    pub outcomes: Vec<GradingOutcome>,
    pub warnings: Vec<String>,
    pub generated_solution: Option<SynthesizedSolution>,
}

struct Warnings {
    messages: Vec<String>,
    progress: ProgressFn,
}

impl Warnings {
    fn push(&mut self, message: String) {
        tracing::warn!("{}", message);
        (self.progress)(ProgressEvent::Warning {
            message: message.clone(),
        });
        self.messages.push(message);
    }
}

async fn extract_once(
    extractor: &TextExtractor,
    path: &Path,
    max_pages: usize,
    dpi: u32,
) -> Result<ExtractionResult, CoreError> {
    let extractor = extractor.clone();
    let path = path.to_path_buf();
    let result =
        tokio::task::spawn_blocking(move || extractor.extract_document(&path, Some(max_pages), dpi))
            .await?;
    Ok(result)
}

/// Execute a run. Only an invalid homework root (or an unusable output
/// folder) is an error; everything else degrades into warnings or per-alias
/// failures.
pub async fn run(
    request: RunRequest,
    settings: &Settings,
    caps: Capabilities,
    progress: ProgressFn,
) -> Result<RunReport, CoreError> {
    if !request.root.is_dir() {
        return Err(CoreError::InvalidRoot(request.root));
    }

    let max_async = settings.max_async.max(1);
    let limits = settings.page_limits;
    let extractor = TextExtractor::new(caps.documents.clone(), caps.ocr.clone());
    let mut warnings = Warnings {
        messages: Vec::new(),
        progress: progress.clone(),
    };

    if !extractor.ocr_available() {
        warnings.push(
            "OCR unavailable; scanned pages and images will be marked unreadable.".to_string(),
        );
    }

    let class_info = read_class_info(request.class_info.as_deref());
    if let Some(message) = class_info.warning.clone() {
        warnings.push(message);
    }

    // ── Discover ──
    let students_root = request.out_dir.join(STUDENTS_DIR);
    let (root, students) = (request.root.clone(), students_root.clone());
    let discovery =
        tokio::task::spawn_blocking(move || discover_submissions(&root, &students)).await??;
    for message in discovery.skipped {
        warnings.push(message);
    }
    let units = discovery.units;
    tracing::info!(count = units.len(), root = %request.root.display(), "discovered submissions");
    progress(ProgressEvent::Discovered { count: units.len() });
    if units.is_empty() {
        warnings.push(
            "No submission units discovered (check your homework folder for files/folders)."
                .to_string(),
        );
    }

    // ── Materials ──
    let problem_path = request.problem_set.is_file().then(|| request.problem_set.clone());
    if problem_path.is_none() {
        warnings.push(format!(
            "Problem set not found at {}.",
            request.problem_set.display()
        ));
    }
    let problem = match &problem_path {
        Some(path) => Some(extract_once(&extractor, path, limits.problem, settings.dpi).await?),
        None => None,
    };

    // ── Synthesize ──
    let mut generated_solution = None;
    let (solutions_path, solution) = if request.solutions.is_file() {
        let text = extract_once(&extractor, &request.solutions, limits.solution, settings.dpi).await?;
        (Some(request.solutions.clone()), Some(text))
    } else {
        let synthesized = match &caps.generation {
            Some(generation) => {
                progress(ProgressEvent::Synthesizing);
                let inputs = SynthesisInputs {
                    extractor: &extractor,
                    generation: &**generation,
                    class_info: class_info.text.as_deref(),
                    max_pages: limits.synthesis,
                    dpi: settings.dpi,
                };
                synthesize_solution(inputs, problem_path.as_deref(), &request.out_dir)
                    .await
                    .map_err(|e| e.to_string())
            }
            None => Err("no generation model configured".to_string()),
        };
        match synthesized {
            Ok(generated) => {
                warnings.push(format!(
                    "No author-provided solutions found; synthesized at {}.",
                    generated.pdf_path.display()
                ));
                let text = paginated_text(&generated.text);
                let path = generated.pdf_path.clone();
                generated_solution = Some(generated);
                (Some(path), Some(text))
            }
            Err(reason) => {
                tracing::warn!(reason = %reason, "solution synthesis failed");
                warnings.push(format!(
                    "Solutions not found and synthesis failed ({}); proceeding without solutions.",
                    reason
                ));
                (None, None)
            }
        }
    };

    // ── Dispatch ──
    let ctx = Arc::new(GradingContext {
        extractor,
        analysis: caps.analysis.clone(),
        instructions: analysis_instructions(class_info.text.as_deref()),
        problem,
        solution,
        max_pages: limits.submission,
        dpi: settings.dpi,
    });
    let outcomes = grade_submissions(&units, ctx, max_async, progress).await;

    let config = RunConfig {
        submissions_dir: request.root,
        problem_set_path: problem_path,
        solutions_path,
        notes: request.notes,
        class_info_path: class_info.path,
        max_async,
        out_dir: request.out_dir,
    };

    Ok(RunReport {
        config,
        units,
        outcomes,
        warnings: warnings.messages,
        generated_solution,
    })
}
