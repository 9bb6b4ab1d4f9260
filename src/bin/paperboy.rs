//! CLI binary for paperboy.
//!
//! A thin shim over the library crate that maps CLI flags to `JobConfig`
//! and renders progress.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paperboy::{
    deliver_edition, Edition, JobConfig, JobProgressCallback, PageFailureMode,
};
use std::io;
use std::path::PathBuf;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while waiting on the manifest, a page bar
/// while downloading, and log lines for stage transitions and retries.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_manifest

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Fetching manifest…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Downloading");
    }
}

impl JobProgressCallback for CliProgress {
    fn on_attempt_start(&self, attempt: u32, edition: &Edition) {
        if attempt > 1 {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Attempt {attempt} for edition {edition}"))
            ));
        }
    }

    fn on_manifest(&self, pages: usize) {
        self.activate_bar(pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Manifest lists {pages} pages"))
        ));
    }

    fn on_page_start(&self, page: usize, _total: usize) {
        self.bar.set_message(format!("page {page}"));
    }

    fn on_page_done(&self, page: usize, total: usize, bytes: u64) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page,
            total,
            dim(&format!("{:>7} KiB", bytes / 1024)),
        ));
        self.bar.inc(1);
    }

    fn on_page_failed(&self, page: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_bound(&self, pages: usize) {
        self.bar
            .println(format!("{} Bound {} pages into PDF", green("✓"), pages));
        self.bar.set_prefix("Uploading");
        self.bar.set_message("");
    }

    fn on_uploaded(&self, object: &str) {
        self.bar
            .println(format!("{} Uploaded {}", green("✓"), bold(object)));
    }

    fn on_attempt_failed(&self, attempt: u32, error: &str, delay_secs: u64) {
        self.bar.println(format!(
            "{} Attempt {} failed: {}  {}",
            red("✘"),
            attempt,
            red(error),
            dim(&format!("(retrying in {delay_secs}s)")),
        ));
        self.bar.set_prefix("Waiting");
        self.bar.set_message(format!("retry in {delay_secs}s"));
    }

    fn on_delivered(&self, edition: &Edition, attempts: u32) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Edition {} delivered ({} attempt{})",
            green("✔"),
            bold(edition.as_str()),
            attempts,
            if attempts == 1 { "" } else { "s" }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Deliver today's edition (credentials from the environment)
  paperboy

  # Deliver a specific date's edition
  paperboy --date 2024-03-05

  # Local test: fetch and bind, keep the PDF, never upload
  paperboy --dry-run --date 2024-03-05

  # Bounded retries for a supervised deployment
  paperboy --retry-delay 300 --max-attempts 12

  # Tolerate missing inner pages instead of retrying the whole job
  paperboy --page-failure keep-numbering

ENVIRONMENT VARIABLES:
  PAPERBOY_STORAGE_KEY_ID    Storage access key id        (required to upload)
  PAPERBOY_STORAGE_KEY       Storage secret key           (required to upload)
  PAPERBOY_STORAGE_BUCKET    Target bucket name           (required to upload)
  PAPERBOY_STORAGE_REGION    Storage region               (default: us-east-1)
  PAPERBOY_STORAGE_ENDPOINT  S3-compatible endpoint URL   (optional)

BEHAVIOUR:
  The job retries the whole pipeline on any failure — by default forever,
  every 15 minutes, because the usual failure is an edition that is not
  published yet. Bound it with --max-attempts for supervised setups.

  Downloaded pages are staged under <staging-root>/<edition>/ and removed
  when the job finishes; --keep-staging (implied by --dry-run) retains them.
"#;

/// Fetch a daily e-paper edition, bind it into a PDF, and upload it.
#[derive(Parser, Debug)]
#[command(
    name = "paperboy",
    version,
    about = "Fetch a daily e-paper edition, bind it into a PDF, and upload it",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Deliver the edition for this date (YYYY-MM-DD) instead of today's.
    #[arg(long, conflicts_with = "edition")]
    date: Option<NaiveDate>,

    /// Deliver an explicit edition id (e.g. mundo050324).
    #[arg(long)]
    edition: Option<String>,

    /// Base URL of the reader service.
    #[arg(long, env = "PAPERBOY_BASE_URL", default_value = "https://reader3.isu.pub/elmundocomsv")]
    base_url: String,

    /// Manifest filename under the edition URL.
    #[arg(long, env = "PAPERBOY_MANIFEST_FILE", default_value = "reader3_4.json")]
    manifest_file: String,

    /// Prefix of date-derived edition ids.
    #[arg(long, env = "PAPERBOY_EDITION_PREFIX", default_value = "mundo")]
    prefix: String,

    /// Publishing cutoff, in hours subtracted before deriving the date.
    #[arg(long, env = "PAPERBOY_CUTOFF_HOURS", default_value_t = 6)]
    cutoff_hours: i64,

    /// Root directory for staging (default: system temp).
    #[arg(long, env = "PAPERBOY_STAGING_ROOT")]
    staging_root: Option<PathBuf>,

    /// Keep the staging directory (pages + PDF) after the job.
    #[arg(long)]
    keep_staging: bool,

    /// Seconds to wait between failed attempts.
    #[arg(long, env = "PAPERBOY_RETRY_DELAY", default_value_t = 900)]
    retry_delay: u64,

    /// Give up after this many attempts (default: retry forever).
    #[arg(long, env = "PAPERBOY_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// What a failed page download does to the attempt.
    #[arg(long, value_enum, default_value = "abort")]
    page_failure: PageFailureArg,

    /// HTTP timeout in seconds for every request.
    #[arg(long, env = "PAPERBOY_HTTP_TIMEOUT", default_value_t = 30)]
    http_timeout: u64,

    /// Fetch and bind only; skip the upload (implies --keep-staging).
    #[arg(long)]
    dry_run: bool,

    /// Print the delivery receipt as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PageFailureArg {
    Abort,
    KeepNumbering,
}

impl From<PageFailureArg> for PageFailureMode {
    fn from(v: PageFailureArg) -> Self {
        match v {
            PageFailureArg::Abort => PageFailureMode::Abort,
            PageFailureArg::KeepNumbering => PageFailureMode::KeepNumbering,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters interactively.
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

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;

    // ── Run the job ──────────────────────────────────────────────────────
    let receipt = deliver_edition(&config)
        .await
        .context("Delivery failed; all attempts exhausted")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&receipt).context("Failed to serialise receipt")?
        );
    } else if !cli.quiet {
        match &receipt.uploaded {
            Some((cover, pdf)) => {
                eprintln!(
                    "   {} + {}  {}",
                    bold(cover),
                    bold(pdf),
                    dim(&format!("{}ms total", receipt.timings.total_ms)),
                );
            }
            None => {
                eprintln!(
                    "{} Bound PDF at {}  {}",
                    green("✔"),
                    bold(&receipt.local_pdf.display().to_string()),
                    dim(&format!("{}ms total", receipt.timings.total_ms)),
                );
            }
        }
        if !receipt.failed_pages.is_empty() {
            eprintln!(
                "   {} {} page(s) missing from this edition",
                red("⚠"),
                receipt.failed_pages.len()
            );
        }
    }

    Ok(())
}

/// Map CLI args to `JobConfig`.
fn build_config(cli: &Cli) -> Result<JobConfig> {
    let mut builder = JobConfig::builder()
        .base_url(cli.base_url.clone())
        .manifest_file(cli.manifest_file.clone())
        .edition_prefix(cli.prefix.clone())
        .cutoff_hours(cli.cutoff_hours)
        .retain_staging(cli.keep_staging || cli.dry_run)
        .http_timeout(Duration::from_secs(cli.http_timeout))
        .page_failure(cli.page_failure.clone().into())
        .retry_delay(Duration::from_secs(cli.retry_delay))
        .max_attempts(cli.max_attempts)
        .skip_upload(cli.dry_run);

    if let Some(date) = cli.date {
        builder = builder.edition(Edition::for_date(&cli.prefix, date));
    }
    if let Some(ref id) = cli.edition {
        builder = builder.edition(Edition::from_id(id.clone()));
    }
    if let Some(ref root) = cli.staging_root {
        builder = builder.staging_root(root.clone());
    }
    if !cli.quiet && !cli.no_progress && !cli.json {
        builder = builder.progress(CliProgress::new() as Arc<dyn JobProgressCallback>);
    }

    builder.build().context("Invalid configuration")
}
