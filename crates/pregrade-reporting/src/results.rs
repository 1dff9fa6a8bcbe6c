use std::path::Path;

use pregrade_core::GradingOutcome;

use crate::csv::render;
use crate::{ReportError, write_file};

pub const RESULTS_TABLE: &str = "pregrading_results.csv";

const HEADER: [&str; 5] = [
    "alias_id",
    "original_name",
    "major_count",
    "moderate_count",
    "agent_output",
];

/// One row per outcome, in the order given.
pub fn results_csv(outcomes: &[GradingOutcome]) -> String {
    render(
        &HEADER,
        outcomes.iter().map(|o| {
            vec![
                o.alias_id.clone(),
                o.original_name.clone(),
                o.major_count.to_string(),
                o.moderate_count.to_string(),
                o.agent_output(),
            ]
        }),
    )
}

pub fn write_results(outcomes: &[GradingOutcome], path: &Path) -> Result<(), ReportError> {
    write_file(path, &results_csv(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pregrade_core::{AgentOutput, SubmissionUnit};
    use std::path::PathBuf;

    fn unit(alias: &str) -> SubmissionUnit {
        SubmissionUnit {
            alias_id: alias.into(),
            original_name: format!("{}.pdf", alias),
            original_path: PathBuf::from("/hw"),
            normalized_dir: PathBuf::from("/out"),
            notes: "single file".into(),
        }
    }

    #[test]
    fn renders_each_output_kind() {
        let outcomes = vec![
            GradingOutcome::new(&unit("001"), AgentOutput::Analysis("- major: sign error".into())),
            GradingOutcome::new(&unit("002"), AgentOutput::NoSupportedFiles),
            GradingOutcome::failed(&unit("003"), "HTTP 500"),
        ];
        let csv = results_csv(&outcomes);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "alias_id,original_name,major_count,moderate_count,agent_output");
        assert_eq!(lines[1], "001,001.pdf,1,0,- major: sign error");
        assert_eq!(
            lines[2],
            "002,002.pdf,0,0,[No supported files (PDF/PNG/JPG) found for this submission.]"
        );
        assert_eq!(lines[3], "003,003.pdf,0,0,[ERROR] HTTP 500");
    }

    #[test]
    fn empty_results_have_header_only() {
        assert_eq!(
            results_csv(&[]),
            "alias_id,original_name,major_count,moderate_count,agent_output\n"
        );
    }
}
