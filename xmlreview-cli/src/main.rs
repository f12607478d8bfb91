//! xmlreview - diff XML snapshots into reviewable change records and apply
//! the approved ones.

mod config;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xml_review::{
    read_changes_file, scan_documents, write_changes_file, Applicator, ChangeRecord, ChangeSet,
    DiffConfig, DiffEngine, DEFAULT_CONTEXT_WORDS, DEFAULT_EXTENSION, DEFAULT_PREVIEW_CHARS,
};

use crate::config::ReviewConfig;

const CHANGES_PREFIX: &str = "changes_";

/// Records shown after a diff.
const PREVIEW_RECORDS: usize = 3;

/// Reviewable XML snapshot diffs
#[derive(Parser)]
#[command(name = "xmlreview")]
#[command(version)]
#[command(about = "Diff XML snapshots into reviewable change records and apply the approved ones", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two snapshot directories and export the change records
    #[command(visible_alias = "d")]
    Diff {
        /// Directory holding the older documents
        #[arg(long, default_value = "before")]
        before: PathBuf,
        /// Directory holding the newer documents
        #[arg(long, default_value = "after")]
        after: PathBuf,
        /// Output file (default: changes_<timestamp>.csv)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Words of context around each focused change
        #[arg(short = 'c', long)]
        context_words: Option<usize>,
    },

    /// Apply the approved records of a reviewed export
    #[command(visible_alias = "a")]
    Apply {
        /// Reviewed change file (default: newest changes_*.csv here)
        #[arg(long)]
        changes: Option<PathBuf>,
        /// Directory holding the original documents
        #[arg(long, default_value = "before")]
        source: PathBuf,
        /// Output directory (default: updated_<timestamp>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("Error: {}", e);
    }
    let cli = Cli::parse();

    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_tracing(config.log_dir().as_deref());

    let result = match cli.command {
        Commands::Diff {
            before,
            after,
            out,
            context_words,
        } => run_diff(&before, &after, out, context_words, &config),
        Commands::Apply {
            changes,
            source,
            out,
        } => run_apply(changes, &source, out, &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "command_failed", error = %e);
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Console logging to stderr, plus a daily log file when a log directory is
/// configured. The returned guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, "xmlreview.log"));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

/// Runs the snapshot diff and exports the records.
fn run_diff(
    before: &Path,
    after: &Path,
    out: Option<PathBuf>,
    context_words: Option<usize>,
    config: &ReviewConfig,
) -> Result<()> {
    for dir in [before, after] {
        if !dir.is_dir() {
            bail!("directory not found: {}", dir.display());
        }
    }

    let cfg = config.diff();
    let preview_chars = cfg.preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS);
    let engine = DiffEngine::new(DiffConfig {
        context_words: context_words
            .or(cfg.context_words)
            .unwrap_or(DEFAULT_CONTEXT_WORDS),
        preview_chars,
        extension: cfg.extension.unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
    });

    info!(event = "diff_started", before = %before.display(), after = %after.display());
    let report = engine
        .diff_directories(before, after)
        .wrap_err("failed to compare snapshots")?;

    let out = out.unwrap_or_else(|| {
        let name = format!("{}{}.csv", CHANGES_PREFIX, timestamp());
        cfg.out_dir.map_or_else(|| PathBuf::from(&name), |d| PathBuf::from(d).join(&name))
    });
    write_changes_file(&out, &report.changes)
        .wrap_err_with(|| format!("failed to write {}", out.display()))?;

    println!(
        "Found {} changes ({} compared, {} added, {} deleted, {} failed)",
        report.changes.len(),
        report.compared,
        report.added,
        report.deleted,
        report.failed
    );
    for (change_type, count) in report.counts_by_type() {
        println!("  {:10}: {:4} changes", change_type, count);
    }
    println!("Changes written to {}", out.display());

    if !report.changes.is_empty() {
        println!("\nFirst {} changes:", report.changes.len().min(PREVIEW_RECORDS));
        for (i, change) in report.changes.iter().take(PREVIEW_RECORDS).enumerate() {
            print_preview(i + 1, change, preview_chars);
        }
    }
    Ok(())
}

fn print_preview(n: usize, change: &ChangeRecord, max_chars: usize) {
    println!(
        "  {}. [{}] {} - {}",
        n, change.change_type, change.file_id, change.xml_path
    );
    println!("     Old: {}", clip(&change.old_content, max_chars));
    println!("     New: {}", clip(&change.new_content, max_chars));
}

/// First `max_chars` characters of `text`, marked with `...` when cut.
fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Applies the approved records of a reviewed export.
fn run_apply(
    changes: Option<PathBuf>,
    source: &Path,
    out: Option<PathBuf>,
    config: &ReviewConfig,
) -> Result<()> {
    if !source.is_dir() {
        bail!("directory not found: {}", source.display());
    }
    let changes = match changes {
        Some(path) => path,
        None => latest_changes_file(Path::new("."))?
            .ok_or_else(|| eyre!("no {}*.csv found; pass --changes", CHANGES_PREFIX))?,
    };
    if !changes.is_file() {
        bail!("change file not found: {}", changes.display());
    }

    let records = read_changes_file(&changes)
        .wrap_err_with(|| format!("failed to read {}", changes.display()))?;
    let set = ChangeSet::partition(records);
    info!(
        event = "changes_loaded",
        path = %changes.display(),
        approved = set.approved.len(),
        rejected = set.rejected.len(),
        pending = set.pending.len(),
    );

    let out = out.unwrap_or_else(|| {
        let name = format!("updated_{}", timestamp());
        config
            .apply()
            .out_dir
            .map_or_else(|| PathBuf::from(&name), |d| PathBuf::from(d).join(&name))
    });
    let extension = config
        .diff()
        .extension
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    let summary = Applicator::new(source, &out)
        .with_extension(&extension)
        .apply(&set)
        .wrap_err("failed to apply changes")?;

    println!(
        "Records: {} (approved: {}, rejected: {}, pending: {})",
        summary.total_records, summary.approved, summary.rejected, summary.pending
    );
    println!(
        "Applied {}/{} approved changes ({} failed)",
        summary.success_count(),
        summary.approved,
        summary.failed
    );
    println!(
        "Files: {} written, {} copied, {} failed",
        summary.files_written, summary.files_copied, summary.files_failed
    );
    println!("Output written to {}", out.display());

    let generated = scan_documents(&out, &extension)
        .wrap_err_with(|| format!("failed to list {}", out.display()))?;
    println!("Generated {} files:", generated.len());
    for path in generated.values() {
        if let Some(name) = path.file_name() {
            println!("  {}", name.to_string_lossy());
        }
    }
    Ok(())
}

/// Newest `changes_*.csv` in `dir`; timestamped names sort chronologically.
fn latest_changes_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(dir).wrap_err_with(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        let is_export = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(CHANGES_PREFIX) && n.ends_with(".csv"));
        if is_export && latest.as_ref().is_none_or(|l| path > *l) {
            latest = Some(path);
        }
    }
    Ok(latest)
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
