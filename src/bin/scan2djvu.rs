//! CLI binary for scan2djvu.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ArchiveConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2djvu::{
    check_toolchain, convert_list, ArchiveConfig, ArchiveProgressCallback, ArticleError,
    Credentials, ProgressCallback, RunSummary, Toolchain,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar per stage of the current article
/// (downloading, then assembling), with a log line per identifier and per
/// downloaded file printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to a bounded bar of `total` pages for the named stage.
    fn activate_bar(&self, stage: &str, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(stage.to_string());
        self.bar.reset_elapsed();
    }
}

impl ArchiveProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_articles: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Loaded {total_articles} identifiers"))
        ));
    }

    fn on_article_start(&self, identifier: &str, index: usize, total_articles: usize) {
        self.bar.println(format!(
            "{} Downloading files of {}",
            dim(&format!("[{index}/{total_articles}]")),
            bold(identifier)
        ));
        self.bar.set_message(identifier.to_string());
    }

    fn on_download_start(&self, identifier: &str, total_pages: usize) {
        self.activate_bar("Downloading", total_pages);
        self.bar.set_message(identifier.to_string());
    }

    fn on_page_downloaded(&self, _identifier: &str, filename: &str, page_num: usize, total_pages: usize) {
        self.bar.println(format!(
            "    {} {:>3}/{:<3}  {}",
            dim("↓"),
            page_num,
            total_pages,
            dim(filename)
        ));
        self.bar.inc(1);
    }

    fn on_assembly_start(&self, identifier: &str, total_pages: usize) {
        self.activate_bar("Assembling ", total_pages);
        self.bar.set_message(identifier.to_string());
    }

    fn on_page_assembled(&self, _identifier: &str, _page_num: usize, _total_pages: usize) {
        self.bar.inc(1);
    }

    fn on_article_complete(&self, identifier: &str, document: &Path) {
        self.bar.println(format!(
            "  {} {}  →  {}",
            green("✓"),
            identifier,
            dim(&document.display().to_string())
        ));
    }

    fn on_article_skipped(&self, identifier: &str, error: &ArticleError) {
        // Truncate very long error messages to keep output tidy.
        let msg = error.to_string();
        let msg = if msg.chars().count() > 80 {
            format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
        } else {
            msg
        };
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            identifier,
            red(&msg)
        ));
    }

    fn on_run_complete(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every article listed in ids.txt
  scan2djvu --list ids.txt

  # Credentials from the environment
  SCAN2DJVU_USERNAME=archivist SCAN2DJVU_PASSWORD=... scan2djvu --list ids.txt

  # Keep going when cjb2/djvm fail on one article
  scan2djvu --list ids.txt --keep-going

  # Upstream file names do not sort into reading order
  scan2djvu --list ids.txt --renumber-pages

  # Machine-readable run summary
  scan2djvu --list ids.txt --json > summary.json

FILES PRODUCED:
  <work-dir>/<identifier>/      downloaded page images, one directory per article
  <output-dir>/<identifier>.djvu  assembled document, overwritten on rerun
  <log-dir>/YYYYMMDD-HHMMSS.log   identifiers skipped for missing scans

REQUIREMENTS:
  DjVuLibre's cjb2 and djvm must be on PATH and executable.

ENVIRONMENT VARIABLES:
  SCAN2DJVU_USERNAME      Repository user name (basic auth, metadata only)
  SCAN2DJVU_PASSWORD      Repository password
  RUST_LOG                Override log filtering (e.g. scan2djvu=debug)
"#;

/// Download scanned articles from Dokumentlager and assemble DjVu documents.
#[derive(Parser, Debug)]
#[command(
    name = "scan2djvu",
    version,
    about = "Download scanned articles from Dokumentlager and assemble DjVu documents",
    long_about = "Reads a list of article identifiers, downloads the TIFF scan of every page \
from the Dokumentlager API, and bundles each article into a multi-page DjVu file using \
DjVuLibre's cjb2 and djvm. Articles with missing scans are written to a timestamped log \
and skipped.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Text file with one article identifier per line.
    #[arg(long, value_name = "PATH")]
    list: PathBuf,

    /// Repository user name.
    #[arg(long, env = "SCAN2DJVU_USERNAME", default_value = "")]
    username: String,

    /// Repository password.
    #[arg(long, env = "SCAN2DJVU_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Scheme and host of the metadata API.
    #[arg(long, env = "SCAN2DJVU_API_BASE", default_value = scan2djvu::config::DEFAULT_API_BASE)]
    api_base: String,

    /// Scheme and host used for image downloads.
    #[arg(long, env = "SCAN2DJVU_DOWNLOAD_BASE", default_value = scan2djvu::config::DEFAULT_DOWNLOAD_BASE)]
    download_base: String,

    /// Directory in which per-article image directories are created.
    #[arg(long, env = "SCAN2DJVU_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Directory receiving the assembled documents.
    #[arg(short, long, env = "SCAN2DJVU_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Directory receiving the skipped-article log.
    #[arg(long, env = "SCAN2DJVU_LOG_DIR", default_value = ".")]
    log_dir: PathBuf,

    /// Single-page encoder executable.
    #[arg(long, env = "SCAN2DJVU_ENCODER", default_value = "cjb2")]
    encoder: String,

    /// Multi-page bundler executable.
    #[arg(long, env = "SCAN2DJVU_MERGER", default_value = "djvm")]
    merger: String,

    /// Extension of page images picked up for assembly.
    #[arg(long, env = "SCAN2DJVU_PAGE_EXTENSION", default_value = "tif")]
    page_extension: String,

    /// Log and skip an article when cjb2/djvm fail, instead of stopping the run.
    #[arg(long, env = "SCAN2DJVU_KEEP_GOING")]
    keep_going: bool,

    /// Prefix downloaded files with their page position so they sort in order.
    #[arg(long, env = "SCAN2DJVU_RENUMBER_PAGES")]
    renumber_pages: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SCAN2DJVU_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCAN2DJVU_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCAN2DJVU_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the operator.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Preflight ────────────────────────────────────────────────────────
    check_tools(&cli)?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ArchiveProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = convert_list(&cli.list, &config)
        .await
        .context("Conversion run aborted")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Look for the encoder and merger before any other flag is validated.
fn check_tools(cli: &Cli) -> Result<Toolchain> {
    let tools = ArchiveConfig {
        encoder: cli.encoder.clone(),
        merger: cli.merger.clone(),
        ..ArchiveConfig::default()
    };
    Ok(check_toolchain(&tools)?)
}

/// Map CLI args to `ArchiveConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ArchiveConfig> {
    let mut builder = ArchiveConfig::builder()
        .credentials(Credentials::new(&cli.username, &cli.password))
        .api_base(&cli.api_base)
        .download_base(&cli.download_base)
        .work_root(&cli.work_dir)
        .output_dir(&cli.output_dir)
        .log_dir(&cli.log_dir)
        .encoder(&cli.encoder)
        .merger(&cli.merger)
        .page_extension(&cli.page_extension)
        .isolate_conversion_failures(cli.keep_going)
        .renumber_pages(cli.renumber_pages);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &RunSummary) {
    let mark = if summary.skipped.is_empty() {
        green("✔")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{}  {}/{} articles converted  {} pages  {}ms",
        mark,
        bold(&summary.converted.len().to_string()),
        summary.identifiers,
        summary.total_pages(),
        summary.total_duration_ms,
    );
    if let Some(ref log) = summary.error_log {
        eprintln!(
            "   {} skipped  →  {}",
            red(&summary.skipped.len().to_string()),
            bold(&log.display().to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan2djvu::ArchiveError;

    #[test]
    fn missing_tools_are_reported_before_credentials() {
        let cli = Cli::try_parse_from([
            "scan2djvu",
            "--list",
            "ids.txt",
            "--username",
            "",
            "--encoder",
            "scan2djvu-test-no-cjb2",
            "--merger",
            "scan2djvu-test-no-djvm",
        ])
        .unwrap();

        let err = check_tools(&cli).unwrap_err();
        match err.downcast_ref::<ArchiveError>() {
            Some(ArchiveError::MissingTools { missing }) => {
                assert_eq!(missing, &["scan2djvu-test-no-cjb2", "scan2djvu-test-no-djvm"])
            }
            other => panic!("expected MissingTools, got {other:?}"),
        }
        assert!(build_config(&cli, None).is_err());
    }
}
