//! Persistence of run artifacts: the anonymization map, the run manifest and
//! the results table.

use std::path::{Path, PathBuf};

use thiserror::Error;

use pregrade_core::pipeline::RunReport;

pub mod anonymization;
mod csv;
pub mod manifest;
pub mod results;

pub use anonymization::{ANONYMIZATION_MAP, write_anonymization_map};
pub use manifest::{NEXT_STEPS, RUN_MANIFEST, write_manifest};
pub use results::{RESULTS_TABLE, write_results};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the artifacts of a run were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub anonymization_map: PathBuf,
    pub manifest: PathBuf,
    pub results: PathBuf,
}

pub(crate) fn write_file(path: &Path, content: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write all three artifacts into `out_dir`. Runs with no submissions still
/// get a manifest and a header-only results table.
pub fn write_run_artifacts(report: &RunReport, out_dir: &Path) -> Result<RunArtifacts, ReportError> {
    let artifacts = RunArtifacts {
        anonymization_map: out_dir.join(ANONYMIZATION_MAP),
        manifest: out_dir.join(RUN_MANIFEST),
        results: out_dir.join(RESULTS_TABLE),
    };

    write_anonymization_map(&report.units, &artifacts.anonymization_map)?;
    write_manifest(
        &report.config,
        &report.units,
        &report.warnings,
        &artifacts.manifest,
    )?;
    write_results(&report.outcomes, &artifacts.results)?;

    tracing::info!(out_dir = %out_dir.display(), rows = report.outcomes.len(), "run artifacts written");
    Ok(artifacts)
}
