use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use pregrade_core::RunReport;
use pregrade_reporting::RunArtifacts;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print a degraded condition.
pub fn print_warning(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "WARNING:".yellow(), message)
    } else {
        writeln!(w, "WARNING: {}", message)
    }
}

/// Print a fatal error.
pub fn print_error(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "ERROR:".red().bold(), message)
    } else {
        writeln!(w, "ERROR: {}", message)
    }
}

fn label(w: &mut dyn Write, name: &str, value: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, " {:<16}: {}", name.bold(), value)
    } else {
        writeln!(w, " {:<16}: {}", name, value)
    }
}

/// Print the end-of-run summary.
pub fn print_summary(
    w: &mut dyn Write,
    report: &RunReport,
    problem_set: &Path,
    artifacts: &RunArtifacts,
    color: ColorMode,
) -> std::io::Result<()> {
    let config = &report.config;

    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "=== Pre-grading Run Complete ===".bold().green())?;
    } else {
        writeln!(w, "=== Pre-grading Run Complete ===")?;
    }

    label(w, "Homework root", &config.submissions_dir.display().to_string(), color)?;

    let found = if config.problem_set_path.is_some() {
        "[FOUND]"
    } else {
        "[MISSING]"
    };
    label(
        w,
        "Problem set",
        &format!("{} {}", problem_set.display(), found),
        color,
    )?;

    match &config.solutions_path {
        Some(path) => label(w, "Solutions", &format!("{} [IN USE]", path.display()), color)?,
        None => label(w, "Solutions", "[MISSING/GENERATE FAILED]", color)?,
    }
    label(
        w,
        "Class info used",
        &config.class_info_path.is_some().to_string(),
        color,
    )?;
    label(w, "Max async", &config.max_async.to_string(), color)?;
    label(w, "Output dir", &config.out_dir.display().to_string(), color)?;
    label(w, "Units discovered", &report.units.len().to_string(), color)?;

    let failed = report
        .outcomes
        .iter()
        .filter(|o| o.output.is_failure())
        .count();
    if failed > 0 {
        let msg = format!("{} of {} aliases failed; see agent_output", failed, report.outcomes.len());
        if color.enabled() {
            label(w, "Failures", &msg.red().to_string(), color)?;
        } else {
            label(w, "Failures", &msg, color)?;
        }
    }

    writeln!(w)?;
    writeln!(w, "Artifacts:")?;
    writeln!(w, " - {}", artifacts.anonymization_map.display())?;
    writeln!(w, " - {}", artifacts.manifest.display())?;
    writeln!(w, " - {}", artifacts.results.display())?;
    if let Some(generated) = &report.generated_solution {
        writeln!(
            w,
            " - Generated solution: {} and {}",
            generated.pdf_path.display(),
            generated.text_path.display()
        )?;
    }
    writeln!(w)?;
    Ok(())
}
