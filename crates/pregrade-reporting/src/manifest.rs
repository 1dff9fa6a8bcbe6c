use std::path::Path;

use serde::Serialize;

use pregrade_core::{RunConfig, SubmissionUnit};

use crate::{ReportError, write_file};

pub const RUN_MANIFEST: &str = "run_manifest.json";

pub const NEXT_STEPS: [&str; 2] = [
    "Run agents on each alias (PDF/PNG/JPG supported).",
    "Aggregate outputs into pregrading_results.csv.",
];

#[derive(Serialize)]
struct Manifest<'a> {
    config: &'a RunConfig,
    discovered_submissions: &'a [SubmissionUnit],
    warnings: &'a [String],
    next_steps: [&'static str; 2],
}

/// Pretty-printed JSON manifest of a run.
pub fn manifest_json(
    config: &RunConfig,
    units: &[SubmissionUnit],
    warnings: &[String],
) -> Result<String, ReportError> {
    let manifest = Manifest {
        config,
        discovered_submissions: units,
        warnings,
        next_steps: NEXT_STEPS,
    };
    Ok(serde_json::to_string_pretty(&manifest)?)
}

pub fn write_manifest(
    config: &RunConfig,
    units: &[SubmissionUnit],
    warnings: &[String],
    path: &Path,
) -> Result<(), ReportError> {
    write_file(path, &manifest_json(config, units, warnings)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn absent_paths_serialize_as_null() {
        let config = RunConfig {
            submissions_dir: PathBuf::from("/hw"),
            problem_set_path: None,
            solutions_path: Some(PathBuf::from("/hw/Materials/solutions.pdf")),
            notes: String::new(),
            class_info_path: None,
            max_async: 3,
            out_dir: PathBuf::from("/hw/outputs/run_1"),
        };
        let json = manifest_json(&config, &[], &["Problem set not found.".to_string()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["config"]["problem_set_path"].is_null());
        assert!(value["config"]["class_info_path"].is_null());
        assert_eq!(value["config"]["solutions_path"], "/hw/Materials/solutions.pdf");
        assert_eq!(value["config"]["max_async"], 3);
        assert_eq!(value["discovered_submissions"].as_array().unwrap().len(), 0);
        assert_eq!(value["warnings"][0], "Problem set not found.");
        assert_eq!(value["next_steps"][1], NEXT_STEPS[1]);
    }
}
