//! CLI binary for drive-import.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `TransferConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use drive_import::pipeline::checksum::Adler32;
use drive_import::{
    transfer, Destination, Phase, ProgressCallback, ProgressEvent, StaticCredential, TargetType,
    TransferConfig, TransferProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
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

/// Terminal progress callback: a chunk bar during upload, then a spinner
/// while the import is polled. Chunks may complete out of order, so the bar
/// counts completions rather than tracking sequence numbers.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening upload session…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }

    fn activate_bar(&self, total_chunks: u32) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(u64::from(total_chunks));
        self.bar.set_style(style);
        self.bar.set_prefix("Uploading");
        self.bar.reset_eta();
    }
}

impl TransferProgressCallback for CliProgressCallback {
    fn on_progress(&self, event: &ProgressEvent) {
        match event.phase {
            Phase::SessionCreated => {
                self.activate_bar(event.total_chunks.unwrap_or(0));
                self.bar
                    .println(format!("{} {}", cyan("◆"), bold(&event.message)));
            }
            Phase::Uploading => {
                if let Some(seq) = event.sequence {
                    self.bar.set_message(format!("chunk {seq}"));
                }
                self.bar.inc(1);
            }
            Phase::UploadFinished => {
                self.bar.println(format!(
                    "  {} {}",
                    green("✓"),
                    dim(&format!("{} chunk(s) assembled", event.total_chunks.unwrap_or(0)))
                ));
                self.bar.set_style(Self::spinner_style());
                self.bar.set_prefix("Importing");
                self.bar.set_message("submitting task…");
            }
            Phase::ConversionSubmitted | Phase::Converting => {
                self.bar.set_message(event.message.clone());
            }
            Phase::Completed => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", green("✔"), bold(&event.message));
            }
            Phase::Failed => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", red("✘"), event.message);
            }
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload a spreadsheet and convert it to an online sheet
  drive-import report.xlsx --parent-node fldcnXXXX

  # Convert a CSV into a multi-dimensional table
  drive-import --target bitable data.csv

  # Upload into one folder, mount the converted doc in another
  drive-import notes.docx --parent-node fldcnRAW --mount-key fldcnDOCS

  # Machine-readable result
  drive-import --json report.xlsx > result.json

  # Print the Adler-32 checksum the uploader would send (no network)
  drive-import --checksum-only report.xlsx

TARGET TYPES:
  Extension                     Default target
  ────────────────────────────  ──────────────
  xlsx, xls, csv                sheet
  docx, doc, txt, md, html      docx
  (any, with --target bitable)  bitable

ENVIRONMENT VARIABLES:
  DRIVE_IMPORT_ACCESS_TOKEN  Bearer token (tenant or user access token)
  DRIVE_IMPORT_BASE_URL      API root (default https://open.feishu.cn/open-apis)
  RUST_LOG                   Override the log filter
"#;

/// Upload local files to a cloud drive and convert them into online documents.
#[derive(Parser, Debug)]
#[command(
    name = "drive-import",
    version,
    about = "Upload local files to a cloud drive and convert them into online documents",
    long_about = "Upload a local file to a cloud drive in checksummed 4 MiB chunks (three at a \
time, with retry), then submit an import task that converts it into an online spreadsheet, \
multi-dimensional table, or document, and wait for the result.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file to upload.
    input: PathBuf,

    /// Bearer access token.
    #[arg(long, env = "DRIVE_IMPORT_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// API root.
    #[arg(long, env = "DRIVE_IMPORT_BASE_URL")]
    base_url: Option<String>,

    /// Folder token the raw upload lands in (empty: drive root).
    #[arg(long, env = "DRIVE_IMPORT_PARENT_NODE", default_value = "")]
    parent_node: String,

    /// Folder token the converted document is mounted in (default: --parent-node).
    #[arg(long, env = "DRIVE_IMPORT_MOUNT_KEY")]
    mount_key: Option<String>,

    /// Mount kind for the converted document (1 = drive folder).
    #[arg(long, default_value_t = 1)]
    mount_type: u8,

    /// Document type to convert into; inferred from the extension if omitted.
    #[arg(long, value_enum)]
    target: Option<TargetArg>,

    /// Concurrent chunk uploads.
    #[arg(short, long, env = "DRIVE_IMPORT_CONCURRENCY", default_value_t = 3,
          value_parser = clap::value_parser!(u16).range(1..=16))]
    concurrency: u16,

    /// Chunk size in MiB, used only when the service does not dictate one.
    #[arg(long, default_value_t = 4,
          value_parser = clap::value_parser!(u64).range(1..=64))]
    chunk_size_mb: u64,

    /// Wait between import status polls, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Answered polls before giving up.
    #[arg(long, default_value_t = 30)]
    max_polls: u32,

    /// Output the result as JSON (TransferOutput).
    #[arg(long, env = "DRIVE_IMPORT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DRIVE_IMPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Print the file's Adler-32 checksum and exit.
    #[arg(long)]
    checksum_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DRIVE_IMPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DRIVE_IMPORT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TargetArg {
    Sheet,
    Bitable,
    Docx,
}

impl From<TargetArg> for TargetType {
    fn from(v: TargetArg) -> Self {
        match v {
            TargetArg::Sheet => TargetType::Sheet,
            TargetArg::Bitable => TargetType::Bitable,
            TargetArg::Docx => TargetType::Docx,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters while it is
    // shown, so library logs drop to errors only.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.checksum_only;
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

    // ── Checksum-only mode ───────────────────────────────────────────────
    if cli.checksum_only {
        let (sum, size) = file_checksum(&cli.input).await?;
        if cli.json {
            let value = serde_json::json!({
                "file": cli.input.display().to_string(),
                "size": size,
                "adler32": sum,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("Failed to serialise checksum")?
            );
        } else {
            println!("{sum}  {:#010x}  {}", sum, cli.input.display());
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn TransferProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let mount_key = cli.mount_key.clone().unwrap_or_else(|| cli.parent_node.clone());
    let destination = Destination::folder(mount_key).with_mount_type(cli.mount_type);

    // ── Run transfer ─────────────────────────────────────────────────────
    let output = transfer(&cli.input, &destination, &config)
        .await
        .with_context(|| format!("Transfer of {} failed", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        println!("{}", output.url);
    }

    if !cli.quiet && !cli.json {
        for w in &output.warnings {
            eprintln!("  {} {}", cyan("⚠"), w);
        }
        eprintln!(
            "   {} chunk(s), {} retr{}, {} poll(s)  ·  {}ms total",
            output.stats.total_chunks,
            output.stats.chunk_retries,
            if output.stats.chunk_retries == 1 { "y" } else { "ies" },
            output.stats.polls,
            output.stats.total_duration_ms,
        );
        eprintln!("   {} {}", dim("token"), output.result_handle);
    }

    Ok(())
}

/// Map CLI args to `TransferConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TransferConfig> {
    let mut builder = TransferConfig::builder()
        .parent_node(cli.parent_node.clone())
        .upload_concurrency(usize::from(cli.concurrency))
        .max_chunk_size(cli.chunk_size_mb * 1024 * 1024)
        .poll_interval_ms(cli.poll_interval_ms)
        .max_poll_attempts(cli.max_polls);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(ref token) = cli.token {
        builder = builder.credential(Arc::new(StaticCredential::new(token.clone())));
    }
    if let Some(target) = cli.target {
        builder = builder.target_type(target.into());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Stream the file through Adler-32 without loading it whole.
async fn file_checksum(path: &Path) -> Result<(u32, u64)> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Adler32::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = file
            .read(&mut buf)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((hasher.finish(), size))
}
