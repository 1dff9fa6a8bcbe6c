//! Fixed-size worker pool for per-alias analysis.
//!
//! Architecture: `max(1, N)` worker tasks consume [`GradeJob`]s from a shared
//! unbounded queue. Each worker handles one alias at a time, so at most N
//! analysis calls are ever in flight. Every job carries a oneshot sender for
//! its outcome; the caller re-orders outcomes into discovery order.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::discovery::gather_submission_files;
use crate::extraction::{SubmissionText, TextExtractor};
use crate::model::{ModelError, ModelRequest, TextModel};
use crate::prompt::analysis_prompt;
use crate::{AgentOutput, ExtractionResult, GradingOutcome, ProgressEvent, ProgressFn, SubmissionUnit};

/// Shared, read-only inputs for every alias of a run.
pub struct GradingContext {
    pub extractor: TextExtractor,
    pub analysis: Arc<dyn TextModel>,
    /// System instructions, built once per run.
    pub instructions: String,
    /// Pre-extracted problem text; `None` when no problem set was found.
    pub problem: Option<ExtractionResult>,
    /// Pre-extracted (or synthesized) solution text.
    pub solution: Option<ExtractionResult>,
    /// Page limit per submission PDF.
    pub max_pages: usize,
    pub dpi: u32,
}

#[derive(Error, Debug)]
pub enum GradeError {
    #[error("failed to gather files in {path}: {source}")]
    Gather {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Model(#[from] ModelError),
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One alias submitted to the pool.
pub struct GradeJob {
    pub unit: SubmissionUnit,
    pub result_tx: oneshot::Sender<GradingOutcome>,
    pub index: usize,
    pub total: usize,
    pub progress: ProgressFn,
}

/// A pool of worker tasks that process grading jobs.
///
/// Submit jobs via [`submit()`](GradingPool::submit), receive results via
/// the oneshot receiver paired with each job.
pub struct GradingPool {
    job_tx: async_channel::Sender<GradeJob>,
    pool_handle: JoinHandle<()>,
}

impl GradingPool {
    /// Create a new pool with `num_workers` workers (at least one).
    pub fn new(ctx: Arc<GradingContext>, num_workers: usize) -> Self {
        let (job_tx, job_rx) = async_channel::unbounded::<GradeJob>();
        let num_workers = num_workers.max(1);

        let pool_handle = tokio::spawn(async move {
            let mut handles = Vec::with_capacity(num_workers);
            for worker in 0..num_workers {
                handles.push(tokio::spawn(worker_loop(worker, job_rx.clone(), ctx.clone())));
            }

            // Drop our clone so workers are the last holders
            drop(job_rx);

            for h in handles {
                let _ = h.await;
            }
        });

        Self {
            job_tx,
            pool_handle,
        }
    }

    /// Submit a job to the pool.
    pub async fn submit(&self, job: GradeJob) {
        let _ = self.job_tx.send(job).await;
    }

    /// Close the queue and wait for all workers to finish.
    pub async fn shutdown(self) {
        self.job_tx.close();
        let _ = self.pool_handle.await;
    }
}

async fn worker_loop(
    worker: usize,
    job_rx: async_channel::Receiver<GradeJob>,
    ctx: Arc<GradingContext>,
) {
    tracing::debug!(worker, "grading worker started");
    while let Ok(job) = job_rx.recv().await {
        let GradeJob {
            unit,
            result_tx,
            index,
            total,
            progress,
        } = job;

        progress(ProgressEvent::Grading {
            index,
            total,
            alias_id: unit.alias_id.clone(),
        });

        // Run each alias in its own task so a panic is contained to it.
        let task_ctx = ctx.clone();
        let task_unit = unit.clone();
        let output = match tokio::spawn(async move { grade_alias(&task_ctx, &task_unit).await }).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(alias = %unit.alias_id, error = %e, "grading failed");
                AgentOutput::Failed(e.to_string())
            }
            Err(e) => {
                tracing::error!(alias = %unit.alias_id, error = %e, "grading task panicked");
                AgentOutput::Failed(format!("grading task aborted: {}", e))
            }
        };

        let outcome = GradingOutcome::new(&unit, output);
        progress(ProgressEvent::Graded {
            index,
            total,
            alias_id: outcome.alias_id.clone(),
            major: outcome.major_count,
            moderate: outcome.moderate_count,
            failed: outcome.output.is_failure(),
        });
        let _ = result_tx.send(outcome);
    }
    tracing::debug!(worker, "grading worker stopped");
}

/// Grade one alias: gather its files, extract them, and make exactly one
/// analysis call. Aliases without supported files make no call.
pub async fn grade_alias(
    ctx: &GradingContext,
    unit: &SubmissionUnit,
) -> Result<AgentOutput, GradeError> {
    let dir = unit.normalized_dir.clone();
    let extractor = ctx.extractor.clone();
    let (max_pages, dpi) = (ctx.max_pages, ctx.dpi);

    let sections = tokio::task::spawn_blocking(move || -> Result<Vec<SubmissionText>, GradeError> {
        let files = gather_submission_files(&dir).map_err(|source| GradeError::Gather {
            path: dir.clone(),
            source,
        })?;
        Ok(extractor.extract_submission_files(&files, max_pages, dpi))
    })
    .await??;

    if sections.is_empty() {
        tracing::info!(alias = %unit.alias_id, "no supported files; skipping analysis");
        return Ok(AgentOutput::NoSupportedFiles);
    }

    let request = ModelRequest::new(
        ctx.instructions.clone(),
        analysis_prompt(ctx.problem.as_ref(), ctx.solution.as_ref(), &sections),
    );
    tracing::debug!(
        alias = %unit.alias_id,
        files = sections.len(),
        model = ctx.analysis.name(),
        "requesting analysis"
    );
    let text = ctx.analysis.complete(&request).await?;
    Ok(AgentOutput::Analysis(text))
}

/// Grade every unit with at most `max_async` concurrent analysis calls.
///
/// Returns exactly one outcome per unit, in the order of `units`.
pub async fn grade_submissions(
    units: &[SubmissionUnit],
    ctx: Arc<GradingContext>,
    max_async: usize,
    progress: ProgressFn,
) -> Vec<GradingOutcome> {
    let total = units.len();
    if total == 0 {
        return Vec::new();
    }

    let pool = GradingPool::new(ctx, max_async.min(total));

    // Submit all units and collect oneshot receivers
    let mut receivers = Vec::with_capacity(total);
    for (index, unit) in units.iter().enumerate() {
        let (result_tx, result_rx) = oneshot::channel();
        pool.submit(GradeJob {
            unit: unit.clone(),
            result_tx,
            index,
            total,
            progress: progress.clone(),
        })
        .await;
        receivers.push(result_rx);
    }

    // Collect results
    let mut results: Vec<Option<GradingOutcome>> = vec![None; total];
    for (i, rx) in receivers.into_iter().enumerate() {
        if let Ok(outcome) = rx.await {
            results[i] = Some(outcome);
        }
    }

    pool.shutdown().await;

    results
        .into_iter()
        .zip(units)
        .map(|(outcome, unit)| {
            outcome.unwrap_or_else(|| {
                tracing::error!(alias = %unit.alias_id, "no outcome reported");
                GradingOutcome::failed(unit, "grading did not report an outcome")
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockModel, PlainTextDocuments};
    use crate::ocr::NoOcr;

    fn unit_with_files(root: &std::path::Path, alias: &str, files: &[(&str, &str)]) -> SubmissionUnit {
        let dir = root.join(alias);
        std::fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
        SubmissionUnit {
            alias_id: alias.to_string(),
            original_name: format!("student-{}", alias),
            original_path: dir.clone(),
            normalized_dir: dir,
            notes: "single file".to_string(),
        }
    }

    fn context(model: Arc<MockModel>) -> GradingContext {
        GradingContext {
            extractor: TextExtractor::new(Arc::new(PlainTextDocuments), Arc::new(NoOcr)),
            analysis: model,
            instructions: "grade nothing".to_string(),
            problem: None,
            solution: None,
            max_pages: 25,
            dpi: 200,
        }
    }

    #[tokio::test]
    async fn alias_without_supported_files_makes_no_call() {
        let dir = tempfile::tempdir().unwrap();
        let unit = unit_with_files(dir.path(), "001", &[("essay.docx", "words")]);
        let model = Arc::new(MockModel::replying("major"));
        let ctx = context(model.clone());

        let output = grade_alias(&ctx, &unit).await.unwrap();
        assert_eq!(output, AgentOutput::NoSupportedFiles);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_directory_is_a_gather_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut unit = unit_with_files(dir.path(), "001", &[]);
        unit.normalized_dir = dir.path().join("gone");
        let ctx = context(Arc::new(MockModel::replying("ok")));

        let result = grade_alias(&ctx, &unit).await;
        assert!(matches!(result, Err(GradeError::Gather { .. })));
    }

    #[tokio::test]
    async fn prompt_includes_each_file_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let unit = unit_with_files(
            dir.path(),
            "001",
            &[("b.pdf", "second file body text"), ("A.pdf", "first file body text")],
        );
        let model = Arc::new(MockModel::replying("a moderate slip"));
        let ctx = context(model.clone());

        let output = grade_alias(&ctx, &unit).await.unwrap();
        assert_eq!(output, AgentOutput::Analysis("a moderate slip".into()));

        let prompt = &model.inputs()[0];
        let a = prompt.find("=== SUBMISSION (PDF): A.pdf ===").unwrap();
        let b = prompt.find("=== SUBMISSION (PDF): b.pdf ===").unwrap();
        assert!(a < b);
    }

    #[tokio::test]
    async fn empty_batch_returns_no_outcomes() {
        let ctx = Arc::new(context(Arc::new(MockModel::replying("x"))));
        let outcomes = grade_submissions(&[], ctx, 3, Arc::new(|_| {})).await;
        assert!(outcomes.is_empty());
    }
}
