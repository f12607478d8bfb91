//! Optional `xmlreview.toml` settings.
//!
//! Search order: `./xmlreview.toml`, then `<config dir>/xmlreview/xmlreview.toml`.
//! Values from an earlier file win; command-line flags win over both.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "xmlreview.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewConfig {
    pub diff: Option<DiffCfg>,
    pub apply: Option<ApplyCfg>,
    pub log: Option<LogCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffCfg {
    pub context_words: Option<usize>,
    pub preview_chars: Option<usize>,
    pub extension: Option<String>,
    pub out_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyCfg {
    pub out_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogCfg {
    pub dir: Option<String>,
}

impl ReviewConfig {
    pub fn diff(&self) -> DiffCfg {
        self.diff.clone().unwrap_or_default()
    }

    pub fn apply(&self) -> ApplyCfg {
        self.apply.clone().unwrap_or_default()
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log.as_ref()?.dir.as_ref().map(PathBuf::from)
    }
}

/// Loads and merges every config file found in the default locations.
pub fn load_config() -> Result<ReviewConfig> {
    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE));
    }
    if let Some(base) = dirs::config_dir() {
        candidates.push(base.join("xmlreview").join(CONFIG_FILE));
    }
    load_from(&candidates)
}

/// Merges the files in `paths` that exist, earlier files taking precedence.
/// A file that exists but does not parse is an error.
pub fn load_from(paths: &[PathBuf]) -> Result<ReviewConfig> {
    let mut merged = ReviewConfig::default();
    for path in paths.iter().filter(|p| p.is_file()) {
        merged = merge(merged, read_file(path)?);
    }
    Ok(merged)
}

fn read_file(path: &Path) -> Result<ReviewConfig> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&text).wrap_err_with(|| format!("invalid config file {}", path.display()))
}

fn merge(mut a: ReviewConfig, b: ReviewConfig) -> ReviewConfig {
    a.diff = merge_opt(a.diff, b.diff, merge_diff);
    a.apply = merge_opt(a.apply, b.apply, merge_apply);
    a.log = merge_opt(a.log, b.log, merge_log);
    a
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_diff(mut a: DiffCfg, b: DiffCfg) -> DiffCfg {
    a.context_words = a.context_words.or(b.context_words);
    a.preview_chars = a.preview_chars.or(b.preview_chars);
    a.extension = a.extension.or(b.extension);
    a.out_dir = a.out_dir.or(b.out_dir);
    a
}

fn merge_apply(mut a: ApplyCfg, b: ApplyCfg) -> ApplyCfg {
    a.out_dir = a.out_dir.or(b.out_dir);
    a
}

fn merge_log(mut a: LogCfg, b: LogCfg) -> LogCfg {
    a.dir = a.dir.or(b.dir);
    a
}
