//! Solution synthesis for runs without an author-provided solution.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::extraction::TextExtractor;
use crate::model::{ModelError, ModelRequest, TextModel};
use crate::prompt::{synthesis_instructions, synthesis_prompt};
use crate::text_pdf::write_text_pdf;

pub const GENERATED_DIR: &str = "generated";
pub const GENERATED_TEXT: &str = "solution_generated.txt";
pub const GENERATED_PDF: &str = "solution_generated.pdf";

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("problem PDF missing")]
    MissingProblem,
    #[error("problem PDF has no extractable pages")]
    EmptyProblem,
    #[error("generation failed: {0}")]
    Model(#[from] ModelError),
    #[error("generation returned an empty solution")]
    EmptyResponse,
    #[error("writing generated solution failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("rendering generated solution failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A generated solution persisted under `<out>/generated/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedSolution {
    pub text_path: PathBuf,
    pub pdf_path: PathBuf,
    pub text: String,
}

/// Everything synthesis needs besides the problem path and output folder.
pub struct SynthesisInputs<'a> {
    pub extractor: &'a TextExtractor,
    pub generation: &'a dyn TextModel,
    pub class_info: Option<&'a str>,
    pub max_pages: usize,
    pub dpi: u32,
}

/// Generate a solution from the problem set with exactly one generation
/// call, and write it as text and as a paginated PDF.
pub async fn synthesize_solution(
    inputs: SynthesisInputs<'_>,
    problem_path: Option<&Path>,
    out_dir: &Path,
) -> Result<SynthesizedSolution, SynthesisError> {
    let problem_path = match problem_path {
        Some(p) if p.is_file() => p.to_path_buf(),
        _ => return Err(SynthesisError::MissingProblem),
    };

    let extractor = inputs.extractor.clone();
    let (max_pages, dpi) = (inputs.max_pages, inputs.dpi);
    let problem = tokio::task::spawn_blocking(move || {
        extractor.extract_document(&problem_path, Some(max_pages), dpi)
    })
    .await?;
    if problem.total_pages == 0 {
        return Err(SynthesisError::EmptyProblem);
    }

    tracing::info!(
        model = inputs.generation.name(),
        pages = problem.total_pages,
        ocr_pages = problem.ocr_pages_used,
        "synthesizing solution"
    );
    let request = ModelRequest::new(
        synthesis_instructions(inputs.class_info),
        synthesis_prompt(&problem),
    );
    let text = inputs.generation.complete(&request).await?;
    if text.trim().is_empty() {
        return Err(SynthesisError::EmptyResponse);
    }

    let dir = out_dir.join(GENERATED_DIR);
    let text_path = dir.join(GENERATED_TEXT);
    let pdf_path = dir.join(GENERATED_PDF);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(&text_path, &text).await?;

    let (pdf_target, pdf_text) = (pdf_path.clone(), text.clone());
    tokio::task::spawn_blocking(move || write_text_pdf(&pdf_target, &pdf_text)).await??;
    tracing::info!(path = %pdf_path.display(), "generated solution written");

    Ok(SynthesizedSolution {
        text_path,
        pdf_path,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockModel, MockResponse, PlainTextDocuments};
    use crate::ocr::NoOcr;
    use std::sync::Arc;

    fn extractor() -> TextExtractor {
        TextExtractor::new(Arc::new(PlainTextDocuments), Arc::new(NoOcr))
    }

    fn inputs<'a>(extractor: &'a TextExtractor, model: &'a MockModel) -> SynthesisInputs<'a> {
        SynthesisInputs {
            extractor,
            generation: model,
            class_info: Some("Intro calculus"),
            max_pages: 20,
            dpi: 200,
        }
    }

    #[tokio::test]
    async fn writes_text_and_pdf_with_one_call() {
        let dir = tempfile::tempdir().unwrap();
        let problem = dir.path().join("problems.pdf");
        std::fs::write(&problem, "1. Differentiate x^2 with respect to x.").unwrap();
        let extractor = extractor();
        let model = MockModel::replying("Problem 1\n1. d/dx x^2 = 2x.");

        let solution = synthesize_solution(inputs(&extractor, &model), Some(&problem), dir.path())
            .await
            .unwrap();

        assert_eq!(model.call_count(), 1);
        assert!(model.inputs()[0].contains("Differentiate x^2"));
        assert_eq!(solution.pdf_path, dir.path().join("generated/solution_generated.pdf"));
        assert!(solution.pdf_path.is_file());
        assert_eq!(
            std::fs::read_to_string(&solution.text_path).unwrap(),
            "Problem 1\n1. d/dx x^2 = 2x."
        );
    }

    #[tokio::test]
    async fn missing_problem_makes_no_call() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor();
        let model = MockModel::replying("unused");

        let result = synthesize_solution(
            inputs(&extractor, &model),
            Some(&dir.path().join("problems.pdf")),
            dir.path(),
        )
        .await;

        assert!(matches!(result, Err(SynthesisError::MissingProblem)));
        assert_eq!(model.call_count(), 0);
        assert!(!dir.path().join(GENERATED_DIR).exists());
    }

    #[tokio::test]
    async fn model_failure_is_reported_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let problem = dir.path().join("problems.pdf");
        std::fs::write(&problem, "Prove that sqrt(2) is irrational.").unwrap();
        let extractor = extractor();
        let model = MockModel::new("gen", MockResponse::Error("quota exceeded".into()));

        let result = synthesize_solution(inputs(&extractor, &model), Some(&problem), dir.path()).await;

        assert!(matches!(result, Err(SynthesisError::Model(_))));
        assert!(!dir.path().join(GENERATED_DIR).join(GENERATED_TEXT).exists());
    }
}
