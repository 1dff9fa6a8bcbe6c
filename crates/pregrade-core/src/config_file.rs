use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Settings;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model: Option<ModelConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub concurrency: Option<ConcurrencyConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub analysis_model: Option<String>,
    pub generation_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub dpi: Option<u32>,
    pub tesseract_path: Option<String>,
    pub ocr_lang: Option<String>,
    pub problem_pages: Option<usize>,
    pub solution_pages: Option<usize>,
    pub submission_pages: Option<usize>,
    pub synthesis_pages: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub max_async: Option<usize>,
}

/// Platform config directory path: `<config_dir>/pregrade/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pregrade").join("config.toml"))
}

/// Load config by cascading CWD `.pregrade.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".pregrade.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Some(config)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bm, om) = (&base.model, &overlay.model);
    let (be, oe) = (&base.extraction, &overlay.extraction);
    let (bc, oc) = (&base.concurrency, &overlay.concurrency);
    ConfigFile {
        model: Some(ModelConfig {
            api_key: pick(om, bm, |m| m.api_key.clone()),
            base_url: pick(om, bm, |m| m.base_url.clone()),
            analysis_model: pick(om, bm, |m| m.analysis_model.clone()),
            generation_model: pick(om, bm, |m| m.generation_model.clone()),
            request_timeout_secs: pick(om, bm, |m| m.request_timeout_secs),
        }),
        extraction: Some(ExtractionConfig {
            dpi: pick(oe, be, |e| e.dpi),
            tesseract_path: pick(oe, be, |e| e.tesseract_path.clone()),
            ocr_lang: pick(oe, be, |e| e.ocr_lang.clone()),
            problem_pages: pick(oe, be, |e| e.problem_pages),
            solution_pages: pick(oe, be, |e| e.solution_pages),
            submission_pages: pick(oe, be, |e| e.submission_pages),
            synthesis_pages: pick(oe, be, |e| e.synthesis_pages),
        }),
        concurrency: Some(ConcurrencyConfig {
            max_async: pick(oc, bc, |c| c.max_async),
        }),
    }
}

/// Build settings from defaults, then the config file, then the
/// environment (`OPENAI_API_KEY`, `OPENAI_BASE_URL`).
pub fn resolve_settings(config: &ConfigFile, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(model) = &config.model {
        if let Some(key) = &model.api_key {
            settings.api_key = Some(key.clone());
        }
        if let Some(url) = &model.base_url {
            settings.base_url = url.clone();
        }
        if let Some(name) = &model.analysis_model {
            settings.analysis_model = name.clone();
        }
        if let Some(name) = &model.generation_model {
            settings.generation_model = name.clone();
        }
        settings.request_timeout_secs = model.request_timeout_secs;
    }

    if let Some(extraction) = &config.extraction {
        if let Some(dpi) = extraction.dpi {
            settings.dpi = dpi.max(1);
        }
        if let Some(path) = &extraction.tesseract_path {
            settings.tesseract_path = Some(PathBuf::from(path));
        }
        if let Some(lang) = &extraction.ocr_lang {
            settings.ocr_lang = lang.clone();
        }
        let limits = &mut settings.page_limits;
        limits.problem = extraction.problem_pages.unwrap_or(limits.problem);
        limits.solution = extraction.solution_pages.unwrap_or(limits.solution);
        limits.submission = extraction.submission_pages.unwrap_or(limits.submission);
        limits.synthesis = extraction.synthesis_pages.unwrap_or(limits.synthesis);
    }

    if let Some(max_async) = config.concurrency.as_ref().and_then(|c| c.max_async) {
        settings.max_async = max_async.max(1);
    }

    if let Some(key) = env("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
        settings.api_key = Some(key);
    }
    if let Some(url) = env("OPENAI_BASE_URL").filter(|u| !u.trim().is_empty()) {
        settings.base_url = url;
    }

    settings
}
