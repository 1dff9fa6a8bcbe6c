use std::path::Path;

use pregrade_core::SubmissionUnit;

use crate::csv::render;
use crate::{ReportError, write_file};

pub const ANONYMIZATION_MAP: &str = "anonymization_map.csv";

const HEADER: [&str; 5] = [
    "alias_id",
    "original_name",
    "original_path",
    "normalized_dir",
    "notes",
];

/// Render the alias → original mapping in discovery order.
pub fn anonymization_csv(units: &[SubmissionUnit]) -> String {
    render(
        &HEADER,
        units.iter().map(|u| {
            vec![
                u.alias_id.clone(),
                u.original_name.clone(),
                u.original_path.display().to_string(),
                u.normalized_dir.display().to_string(),
                u.notes.clone(),
            ]
        }),
    )
}

pub fn write_anonymization_map(units: &[SubmissionUnit], path: &Path) -> Result<(), ReportError> {
    write_file(path, &anonymization_csv(units))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn rows_follow_unit_order() {
        let units = vec![
            SubmissionUnit {
                alias_id: "001".into(),
                original_name: "Doe, Jane.pdf".into(),
                original_path: PathBuf::from("/hw/Doe, Jane.pdf"),
                normalized_dir: PathBuf::from("/out/students/001"),
                notes: "single file".into(),
            },
            SubmissionUnit {
                alias_id: "002".into(),
                original_name: "smith".into(),
                original_path: PathBuf::from("/hw/smith"),
                normalized_dir: PathBuf::from("/out/students/002"),
                notes: "multi-file folder".into(),
            },
        ];
        let csv = anonymization_csv(&units);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "alias_id,original_name,original_path,normalized_dir,notes"
        );
        assert_eq!(
            lines[1],
            "001,\"Doe, Jane.pdf\",\"/hw/Doe, Jane.pdf\",/out/students/001,single file"
        );
        assert_eq!(lines[2], "002,smith,/hw/smith,/out/students/002,multi-file folder");
    }
}
