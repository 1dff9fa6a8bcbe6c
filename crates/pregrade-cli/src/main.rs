use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use pregrade_core::config_file::{load_config, resolve_settings};
use pregrade_core::paths::{absolutize, default_materials, resolve_homework_root};
use pregrade_core::{
    Capabilities, CoreError, OpenAiChatModel, ProgressEvent, RunRequest, TextModel, ocr,
};
use pregrade_pdf_mupdf::MupdfBackend;

mod output;

use output::ColorMode;

/// Anonymized pre-review of homework submissions (PDF/PNG/JPG)
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Folder containing the submissions. Used as-is if a path component is
    /// "Homeworks", otherwise resolved as ./Homeworks/<folder>
    #[arg(long)]
    folder: PathBuf,

    /// Problem set PDF (default: <root>/Materials/problems.pdf)
    #[arg(long)]
    problem_set: Option<PathBuf>,

    /// Solutions PDF (default: <root>/Materials/solutions.pdf)
    #[arg(long)]
    solutions: Option<PathBuf>,

    /// Free-text notes recorded in the run manifest
    #[arg(long, default_value = "")]
    notes: String,

    /// A single .txt file with class information; anything else is ignored
    #[arg(long = "class")]
    class_info: Option<PathBuf>,

    /// Maximum number of concurrent analysis calls (default: 5)
    #[arg(long)]
    max_async: Option<usize>,

    /// Output directory (default: <root>/outputs/run_<timestamp>)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let color = ColorMode(!cli.no_color);

    match pregrade(cli, color).await {
        Ok(code) => code,
        Err(e) => {
            let _ = output::print_error(&mut std::io::stderr(), &format!("{:#}", e), color);
            ExitCode::from(1)
        }
    }
}

async fn pregrade(cli: Cli, color: ColorMode) -> anyhow::Result<ExitCode> {
    // Resolve configuration: CLI flags > env vars > config files > defaults
    let config = load_config();
    let mut settings = resolve_settings(&config, |name| std::env::var(name).ok());
    if let Some(max_async) = cli.max_async {
        settings.max_async = max_async.max(1);
    }
    tracing::debug!(?settings, "resolved settings");

    let root = resolve_homework_root(&cli.folder).context("resolving homework folder")?;
    if !root.is_dir() {
        output::print_error(
            &mut std::io::stderr(),
            &format!("Homework folder not found or not a directory: {}", root.display()),
            color,
        )?;
        return Ok(ExitCode::from(2));
    }

    let (default_problems, default_solutions) = default_materials(&root);
    let problem_set = match cli.problem_set {
        Some(path) => absolutize(&path)?,
        None => default_problems,
    };
    let solutions = match cli.solutions {
        Some(path) => absolutize(&path)?,
        None => default_solutions,
    };
    let out_dir = match cli.out {
        Some(path) => absolutize(&path)?,
        None => root.join("outputs").join(format!(
            "run_{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        )),
    };

    if settings.api_key.is_none() {
        output::print_warning(
            &mut std::io::stderr(),
            "OPENAI_API_KEY is not set; analysis and synthesis calls will fail.",
            color,
        )?;
    }

    let analysis: Arc<dyn TextModel> = Arc::new(OpenAiChatModel::from_settings(
        &settings,
        &settings.analysis_model,
    ));
    let generation: Arc<dyn TextModel> = Arc::new(OpenAiChatModel::from_settings(
        &settings,
        &settings.generation_model,
    ));
    let caps = Capabilities {
        documents: Arc::new(MupdfBackend::new()),
        ocr: ocr::engine_from_settings(&settings),
        analysis,
        generation: Some(generation),
    };

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    let progress = {
        let bar = bar.clone();
        move |event: ProgressEvent| match event {
            ProgressEvent::Discovered { count } => {
                bar.set_length(count as u64);
                bar.set_message(format!("{} submissions", count));
            }
            ProgressEvent::Synthesizing => {
                bar.set_message("synthesizing solution");
            }
            ProgressEvent::Grading { alias_id, .. } => {
                bar.set_message(format!("grading {}", alias_id));
            }
            ProgressEvent::Graded {
                alias_id, failed, ..
            } => {
                bar.inc(1);
                if failed {
                    bar.set_message(format!("{} failed", alias_id));
                }
            }
            ProgressEvent::Warning { message } => {
                bar.suspend(|| {
                    let _ = output::print_warning(&mut std::io::stderr(), &message, color);
                });
            }
        }
    };

    let request = RunRequest {
        root,
        problem_set: problem_set.clone(),
        solutions,
        notes: cli.notes,
        class_info: cli.class_info,
        out_dir,
    };

    let report = match pregrade_core::run(request, &settings, caps, Arc::new(progress)).await {
        Ok(report) => report,
        Err(CoreError::InvalidRoot(path)) => {
            bar.finish_and_clear();
            output::print_error(
                &mut std::io::stderr(),
                &format!("Homework folder not found or not a directory: {}", path.display()),
                color,
            )?;
            return Ok(ExitCode::from(2));
        }
        Err(e) => {
            bar.finish_and_clear();
            return Err(e.into());
        }
    };
    bar.finish_and_clear();

    let artifacts = pregrade_reporting::write_run_artifacts(&report, &report.config.out_dir)
        .context("writing run artifacts")?;

    let mut stdout = std::io::stdout();
    output::print_summary(&mut stdout, &report, &problem_set, &artifacts, color)?;
    stdout.flush()?;

    Ok(ExitCode::SUCCESS)
}
