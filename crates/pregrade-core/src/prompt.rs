//! Prompt assembly for the analysis and generation capabilities.

use crate::ExtractionResult;
use crate::extraction::{FileKind, SubmissionText};

const ANALYSIS_INSTRUCTIONS: &str = "\
You are a math-focused pre-grading assistant. Do NOT assign grades or points.
Your job: identify likely errors, gaps in understanding, missing steps, and misapplied theorems.
Be concise and concrete. Prefer math-specific tags (e.g., chain_rule_misuse, missing_justification, units_mismatch).
Classify errors in terms of severity (major, moderate, minor), where major implies completely wrong approach/understanding, moderate implies significant mistake, and minor minor mistakes.
Only assess errors associated with the assigned problems. For example, if a problem does not require an explanation, then do not claim that the lack of one is an error.
Do not be excessively nitpicky, unless rigor is demanded and the problem requires it. For example, if numeric tests are not required, do not mention them.";

const ANALYSIS_RULES: &str = "\
Rules:
- If the student's material is unreadable (or mostly unreadable), say so and STOP (no analysis).
- Otherwise, list problem points as concise bullets with brief evidence (page/section hints).
- If solution is missing or mismatched, state the limitation.
- Keep output <= 300 words. No grades, no percentages.";

const SYNTHESIS_INSTRUCTIONS: &str = "\
You are a math solution author. Write a clear, correct, step-by-step solution \
in plain text (no LaTeX required). Use numbered steps, define symbols, and justify key steps. \
If multiple problems exist, separate them with clear headers like 'Problem 1', 'Problem 2', etc. \
Be concise but complete; avoid extraneous commentary.";

pub const MISSING_PROBLEM: &str = "[INFO] Problem PDF not provided or not found.";
pub const MISSING_SOLUTION: &str = "[WARN] No solution PDF provided; analysis may be limited.";

/// System instructions for the analysis capability.
pub fn analysis_instructions(class_info: Option<&str>) -> String {
    let class_clause = match class_info {
        Some(text) => format!("Class information (for expectations and tone):\n{}", text),
        None => "Class information: [none provided]".to_string(),
    };
    format!("{}\n\n{}\n\n{}", ANALYSIS_INSTRUCTIONS, class_clause, ANALYSIS_RULES)
}

/// System instructions for the generation capability.
pub fn synthesis_instructions(class_info: Option<&str>) -> String {
    match class_info {
        Some(text) => format!("{}\n\nClass information:\n{}", SYNTHESIS_INSTRUCTIONS, text),
        None => SYNTHESIS_INSTRUCTIONS.to_string(),
    }
}

/// User prompt asking for a worked solution to the problem set.
pub fn synthesis_prompt(problem: &ExtractionResult) -> String {
    format!(
        "Generate a complete, plain-text solution (no LaTeX) to the following problem set.\n\
         Use numbered steps, and separate multiple problems with clear headers.\n\n\
         Problem PDF text (pages={}, ocr_pages={}):\n{}\n",
        problem.total_pages, problem.ocr_pages_used, problem.text
    )
}

/// User prompt for one alias: problem, solution (or its absence), and each
/// submission file tagged by name and kind.
pub fn analysis_prompt(
    problem: Option<&ExtractionResult>,
    solution: Option<&ExtractionResult>,
    submissions: &[SubmissionText],
) -> String {
    let (problem_text, pages, ocr_pages) = match problem {
        Some(p) => (p.text.as_str(), p.total_pages, p.ocr_pages_used),
        None => (MISSING_PROBLEM, 0, 0),
    };

    let solution_clause = match solution {
        Some(s) => format!(
            "Solution (PDF→text; pages={}, ocr_pages={}):\n{}",
            s.total_pages, s.ocr_pages_used, s.text
        ),
        None => MISSING_SOLUTION.to_string(),
    };

    let blobs: String = submissions.iter().map(submission_block).collect();

    format!(
        "Problem (PDF→text; pages={}, ocr_pages={}):\n{}\n\n{}\n\n\
         Student submission(s) (analyze for problem points):\n{}\n\n\
         Task:\n\
         Identify likely problem points in the student's work. Classify by severity (major, moderate, minor). Do not grade.\n\
         If unreadable, say so and stop.",
        pages,
        ocr_pages,
        problem_text,
        solution_clause,
        blobs
    )
    .trim()
    .to_string()
}

fn submission_block(sub: &SubmissionText) -> String {
    match sub.kind {
        FileKind::Pdf => format!(
            "\n=== SUBMISSION (PDF): {} ===\n[meta] pages={}, ocr_pages={}\n{}\n",
            sub.file_name, sub.extraction.total_pages, sub.extraction.ocr_pages_used, sub.extraction.text
        ),
        FileKind::Image => format!(
            "\n=== SUBMISSION ({}): {} ===\n{}\n",
            sub.kind.label(),
            sub.file_name,
            sub.extraction.text
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(t: &str, pages: usize) -> ExtractionResult {
        ExtractionResult {
            text: t.to_string(),
            total_pages: pages,
            ocr_pages_used: 0,
        }
    }

    #[test]
    fn instructions_mention_class_info_or_none() {
        assert!(analysis_instructions(None).contains("Class information: [none provided]"));
        let with = analysis_instructions(Some("Linear algebra, sophomores"));
        assert!(with.contains("Linear algebra, sophomores"));
        assert!(with.contains("Do NOT assign grades"));
    }

    #[test]
    fn prompt_tags_each_submission_file() {
        let subs = vec![
            SubmissionText {
                file_name: "work.pdf".into(),
                kind: FileKind::Pdf,
                extraction: text("\n--- PAGE 1/1 ---\nx = 2\n", 1),
            },
            SubmissionText {
                file_name: "photo.png".into(),
                kind: FileKind::Image,
                extraction: text("[UNREADABLE_IMAGE] photo.png: OCR unavailable or failed.", 1),
            },
        ];
        let prompt = analysis_prompt(Some(&text("Solve x + 1 = 3", 1)), None, &subs);
        assert!(prompt.starts_with("Problem (PDF→text; pages=1, ocr_pages=0):\nSolve x + 1 = 3"));
        assert!(prompt.contains(MISSING_SOLUTION));
        assert!(prompt.contains("=== SUBMISSION (PDF): work.pdf ===\n[meta] pages=1, ocr_pages=0"));
        assert!(prompt.contains("=== SUBMISSION (IMAGE): photo.png ===\n[UNREADABLE_IMAGE]"));
        assert!(prompt.ends_with("If unreadable, say so and stop."));
    }

    #[test]
    fn prompt_without_problem_uses_marker() {
        let prompt = analysis_prompt(None, Some(&text("x = 2", 1)), &[]);
        assert!(prompt.contains(MISSING_PROBLEM));
        assert!(prompt.contains("Solution (PDF→text; pages=1, ocr_pages=0):\nx = 2"));
    }

    #[test]
    fn synthesis_prompt_carries_metadata() {
        let prompt = synthesis_prompt(&ExtractionResult {
            text: "P1".into(),
            total_pages: 3,
            ocr_pages_used: 1,
        });
        assert!(prompt.contains("pages=3, ocr_pages=1"));
        assert!(synthesis_instructions(Some("ctx")).ends_with("Class information:\nctx"));
    }
}
