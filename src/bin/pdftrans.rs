//! CLI binary for pdftrans.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, drives a `Session`, and prints or saves results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdftrans::{
    materialize, ArtifactKind, CancellationToken, ClientConfig, JobStatus, LoadedResults,
    PollOutcome, ProgressCallback, Session, SheetGrid, TableOutcome, TranslationProgressCallback,
};
use std::io::{self, Write};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the job is polled, with
/// per-event log lines for submission, terminal state and each artifact.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Submitting");
        bar.set_message("contacting backend…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    /// Clear the spinner so summary output starts on a clean line.
    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_submitted(&self, handle: &pdftrans::JobHandle) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Translating {} to {}",
                handle.id, handle.reference.target_language
            ))
        ));
        self.bar.set_prefix("Translating");
        self.bar.set_message("waiting for first status…");
    }

    fn on_poll(&self, attempt: u32, status: JobStatus) {
        self.bar.set_message(format!("check {attempt}: {status}"));
    }

    fn on_terminal(&self, outcome: &PollOutcome) {
        let line = match outcome {
            PollOutcome::Completed { .. } => format!("{} translation completed", green("✔")),
            PollOutcome::Failed { .. } => format!("{} translation failed", red("✘")),
            PollOutcome::Cancelled => format!("{} translation cancelled", cyan("⚠")),
        };
        self.bar.println(line);
        self.bar.set_prefix("Loading");
        self.bar.set_message("fetching result artifacts…");
    }

    fn on_artifact_loaded(&self, kind: ArtifactKind, amount: usize) {
        let detail = match kind {
            ArtifactKind::Images => format!("{amount} page images"),
            _ => format_size(amount as u64),
        };
        self.bar
            .println(format!("  {} {kind:<8}  {}", green("✓"), dim(&detail)));
    }

    fn on_artifact_failed(&self, kind: ArtifactKind, error: String) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}…", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        self.bar
            .println(format!("  {} {kind:<8}  {}", red("✗"), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload a local PDF and translate it to Chinese (the default)
  pdftrans submit report.pdf

  # Translate to English, polling every 3 s for up to 200 checks
  pdftrans submit report.pdf --language en --interval 3 --max-attempts 200

  # Translate a PDF that already sits on the backend host
  pdftrans submit-path "C:\docs\report.pdf" --language fr

  # One-shot status check for a running or finished job
  pdftrans status report.pdf

  # Stored PDFs and the current result listing
  pdftrans list
  pdftrans results

  # Save artifacts somewhere else, or not at all
  pdftrans submit report.pdf --out ./translated
  pdftrans submit report.pdf --no-save

  # Machine-readable summary
  pdftrans submit report.pdf --json > summary.json

  # Grab the packaged result archive for a finished job
  pdftrans download report.pdf -o report-results.zip

RESULT ARTIFACTS:
  text       translated document text     saved under its listing filename
  formulas   extracted formulas           saved under its listing filename
  table      translated spreadsheet       rendered per sheet and saved as .html
  images     page snapshots               printed as URLs, never downloaded

ENVIRONMENT VARIABLES:
  PDFTRANS_BASE_URL   Backend base URL (default http://127.0.0.1:1234)
  PDFTRANS_LANGUAGE   Default target language (default zh)

EXIT CODES:
  0  job completed (partial artifact loads included)
  1  job failed, was cancelled, or a client error occurred
  2  usage error
"#;

/// Drive a PDF-translation backend from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "pdftrans",
    version,
    about = "Drive a PDF-translation backend from the command line",
    long_about = "Submit PDF documents to a translation backend, follow the job to completion, \
and save or print what comes back: translated text, extracted formulas, a rendered spreadsheet \
and page-image URLs.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL.
    #[arg(
        long,
        global = true,
        env = "PDFTRANS_BASE_URL",
        default_value = "http://127.0.0.1:1234"
    )]
    base_url: String,

    /// Target language code (zh, en, fr, de, ja, es).
    #[arg(
        short,
        long,
        global = true,
        env = "PDFTRANS_LANGUAGE",
        default_value = "zh"
    )]
    language: String,

    /// Seconds between status checks.
    #[arg(long, global = true, default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..=3600))]
    interval: u64,

    /// Give up after this many status checks.
    #[arg(long, global = true, default_value_t = 120,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// HTTP request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Timeout for artifact and archive downloads in seconds.
    #[arg(long, global = true, default_value_t = 120)]
    download_timeout: u64,

    /// Directory to save result artifacts into.
    #[arg(long, global = true, default_value = ".")]
    out: PathBuf,

    /// Do not save artifacts; print the translated text to stdout instead.
    #[arg(long, global = true)]
    no_save: bool,

    /// Output a structured JSON summary instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local PDF and translate it.
    Submit {
        /// Local PDF file to upload.
        file: PathBuf,
    },
    /// Translate a PDF that already exists on the backend host.
    SubmitPath {
        /// Absolute Windows path on the backend host, e.g. C:\docs\report.pdf.
        path: String,
    },
    /// One-shot status check for a job.
    Status {
        /// Job id (the source PDF's filename).
        job_id: String,
    },
    /// List the PDFs stored on the backend.
    List,
    /// Show the backend's current result listing.
    Results,
    /// Download the packaged result archive for a job.
    Download {
        /// Job id (the source PDF's filename).
        job_id: String,
        /// Write the archive here instead of <job id>-results.zip.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the live feedback; keep library logs quiet
    // unless the user asked for them.
    let submitting = matches!(
        cli.command,
        Command::Submit { .. } | Command::SubmitPath { .. }
    );
    let show_progress = submitting && !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Session ──────────────────────────────────────────────────────────
    let progress_cb = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress_cb
            .clone()
            .map(|cb| cb as Arc<dyn TranslationProgressCallback>),
    )?;
    let session = Session::connect(config).context("Failed to set up the backend client")?;

    // Ctrl-C turns into a cooperative cancel, but only while a job is
    // being driven; for the quick commands the default signal behaviour
    // stays in place.
    let cancel = CancellationToken::new();
    if submitting {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!(
                    "\n{}",
                    dim("Stopping. The backend job keeps running; check it later with `pdftrans status <id>`.")
                );
                cancel.cancel();
            }
        });
    }

    match &cli.command {
        Command::Submit { file } => {
            let bytes = tokio::fs::read(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .and_then(|name| name.to_str())
                .context("Input path has no usable filename")?;
            session.upload(filename, bytes).await?;
            run_translation(&cli, &session, &cancel, progress_cb.as_deref()).await
        }
        Command::SubmitPath { path } => {
            session.use_local_path(path).await?;
            run_translation(&cli, &session, &cancel, progress_cb.as_deref()).await
        }
        Command::Status { job_id } => cmd_status(&cli, &session, job_id).await,
        Command::List => cmd_list(&cli, &session).await,
        Command::Results => cmd_results(&cli, &session).await,
        Command::Download { job_id, output } => {
            cmd_download(&cli, &session, job_id, output.as_deref()).await
        }
    }
}

/// Map CLI args to `ClientConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(cli.base_url.clone())
        .poll_interval_secs(cli.interval)
        .max_poll_attempts(cli.max_attempts)
        .request_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

// ── Subcommands ──────────────────────────────────────────────────────────────

async fn run_translation(
    cli: &Cli,
    session: &Session,
    cancel: &CancellationToken,
    progress: Option<&CliProgressCallback>,
) -> Result<()> {
    let outcome = session.translate(&cli.language, cancel).await;
    if let Some(cb) = progress {
        cb.finish();
    }
    let outcome = outcome.context("Translation failed")?;

    match &outcome.outcome {
        PollOutcome::Cancelled => anyhow::bail!(
            "Translation cancelled; the backend may still finish the job. \
             Check it with `pdftrans status {}`",
            outcome.handle.id
        ),
        PollOutcome::Failed { message } => anyhow::bail!(
            "Translation failed: {}",
            message
                .clone()
                .unwrap_or_else(|| "the backend reported no reason".to_string())
        ),
        PollOutcome::Completed { .. } => {}
    }

    let results = outcome
        .results
        .as_ref()
        .context("Job completed but no results were loaded")?;

    let saved = if cli.no_save {
        Vec::new()
    } else {
        save_artifacts(cli, results).await?
    };

    if cli.json {
        let failed: Vec<_> = results
            .errors
            .iter()
            .map(|e| {
                serde_json::json!({
                    "kind": e.kind().to_string(),
                    "error": e.to_string(),
                })
            })
            .collect();
        let sheets = results
            .table
            .as_ref()
            .and_then(TableOutcome::workbook)
            .map(|wb| {
                wb.sheet_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
            });
        let summary = serde_json::json!({
            "job": outcome.handle.id,
            "language": outcome.handle.reference.target_language,
            "outcome": outcome.outcome,
            "stats": outcome.stats,
            "listing": results.listing,
            "failed_artifacts": failed,
            "table_sheets": sheets,
            "image_urls": results.images.iter().map(|i| i.url.clone()).collect::<Vec<_>>(),
            "saved": saved.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
        return Ok(());
    }

    if cli.no_save {
        // The translated text is the primary artifact; without saving it
        // goes to stdout so the command stays pipeable.
        if let Some(text) = &results.text {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    if !cli.quiet {
        eprintln!(
            "{} {} → {}  {}",
            green("✔"),
            bold(&outcome.handle.id),
            cli.language,
            dim(&format!(
                "{} checks, {:.1}s",
                outcome.stats.poll_attempts,
                outcome.stats.total_duration_ms as f64 / 1000.0
            )),
        );
        for path in &saved {
            eprintln!("   saved {}", bold(&path.display().to_string()));
        }
        if let Some(TableOutcome::Decoded(workbook)) = &results.table {
            if let Some(first) = workbook.first_sheet() {
                if let Ok(grid) = materialize(workbook, &first.name) {
                    print_grid_preview(&grid);
                }
            }
        }
        if let Some(TableOutcome::Undecodable { reference, reason }) = &results.table {
            eprintln!(
                "   {} table {} would not decode: {}",
                cyan("⚠"),
                reference.filename,
                reason
            );
            eprintln!(
                "     raw file: {}",
                pdftrans::results::artifact_url(&cli.base_url, &reference.path)
            );
        }
        if !results.images.is_empty() {
            eprintln!("   {} page images:", results.images.len());
            for image in &results.images {
                eprintln!("     {}", dim(&image.url));
            }
        }
        if !results.errors.is_empty() {
            eprintln!(
                "   {} {} artifact(s) failed to load",
                cyan("⚠"),
                results.errors.len()
            );
        }
    }

    Ok(())
}

async fn cmd_status(cli: &Cli, session: &Session, job_id: &str) -> Result<()> {
    let response = session.job_status(job_id).await?;
    if cli.json {
        let value = serde_json::json!({
            "job": job_id,
            "status": response.status,
            "message": response.message,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let glyph = match response.status {
        JobStatus::Completed => green("✔"),
        JobStatus::Failed => red("✘"),
        JobStatus::Pending | JobStatus::Processing => cyan("◆"),
    };
    println!("{glyph} {job_id}: {}", bold(&response.status.to_string()));
    if let Some(message) = response.message {
        println!("   {}", dim(&message));
    }
    Ok(())
}

async fn cmd_list(cli: &Cli, session: &Session) -> Result<()> {
    let pdfs = session.list_pdfs().await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&pdfs)?);
        return Ok(());
    }
    if pdfs.is_empty() {
        println!("No PDFs stored on the backend.");
        return Ok(());
    }
    for pdf in &pdfs {
        println!(
            "  {}  {}",
            bold(&pdf.filename),
            dim(&format_size(pdf.size_bytes))
        );
    }
    Ok(())
}

async fn cmd_results(cli: &Cli, session: &Session) -> Result<()> {
    let listing = session.fetch_results().await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }
    if listing.is_empty() {
        println!("No results available yet.");
        return Ok(());
    }
    for (kind, reference) in [
        (ArtifactKind::Text, listing.text.as_ref()),
        (ArtifactKind::Formulas, listing.formulas.as_ref()),
        (ArtifactKind::Table, listing.table.as_ref()),
    ] {
        if let Some(reference) = reference {
            println!(
                "  {kind:<8}  {}  {}",
                bold(&reference.filename),
                dim(&format_size(reference.size_bytes))
            );
        }
    }
    if !listing.images.is_empty() {
        println!("  images    {} files", listing.images.len());
        for image in &listing.images {
            println!(
                "            {}",
                dim(&pdftrans::results::artifact_url(&cli.base_url, &image.path))
            );
        }
    }
    Ok(())
}

async fn cmd_download(
    cli: &Cli,
    session: &Session,
    job_id: &str,
    output: Option<&Path>,
) -> Result<()> {
    let bytes = session.download_archive(job_id).await?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{job_id}-results.zip")));
    save_atomic(&path, &bytes).await?;
    if cli.json {
        let value = serde_json::json!({
            "job": job_id,
            "bytes": bytes.len(),
            "path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if !cli.quiet {
        eprintln!(
            "{} {} {}",
            green("✔"),
            dim(&format_size(bytes.len() as u64)),
            bold(&path.display().to_string())
        );
    }
    Ok(())
}

// ── Output helpers ───────────────────────────────────────────────────────────

/// Write loaded artifacts into `--out`: text and formulas under their
/// listing filenames, the decoded table as one HTML file per workbook.
async fn save_artifacts(cli: &Cli, results: &LoadedResults) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(&cli.out)
        .await
        .with_context(|| format!("Failed to create {}", cli.out.display()))?;

    let mut saved = Vec::new();

    if let (Some(text), Some(reference)) = (&results.text, &results.listing.text) {
        let path = cli.out.join(&reference.filename);
        save_atomic(&path, text.as_bytes()).await?;
        saved.push(path);
    }
    if let (Some(formulas), Some(reference)) = (&results.formulas, &results.listing.formulas) {
        let path = cli.out.join(&reference.filename);
        save_atomic(&path, formulas.as_bytes()).await?;
        saved.push(path);
    }
    if let Some(TableOutcome::Decoded(workbook)) = &results.table {
        let mut html = String::new();
        let multi = workbook.sheets.len() > 1;
        for name in workbook.sheet_names() {
            let grid = materialize(workbook, name)?;
            if multi {
                html.push_str(&format!("<h2>{}</h2>\n", escape_text(name)));
            }
            html.push_str(&grid.to_html());
        }
        let filename = results
            .listing
            .table
            .as_ref()
            .and_then(|r| Path::new(&r.filename).file_stem())
            .and_then(|stem| stem.to_str())
            .map(|stem| format!("{stem}.html"))
            .unwrap_or_else(|| "table.html".to_string());
        let path = cli.out.join(filename);
        save_atomic(&path, html.as_bytes()).await?;
        saved.push(path);
    }

    Ok(saved)
}

/// Write-then-rename so an interrupted save never leaves a torn file.
async fn save_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

/// Compact first-sheet preview on stderr, capped to a handful of rows.
fn print_grid_preview(grid: &SheetGrid) {
    const MAX_ROWS: usize = 8;
    const MAX_WIDTH: usize = 24;

    if grid.is_empty() {
        return;
    }

    let columns = grid.column_count();
    let mut widths: Vec<usize> = grid
        .header
        .iter()
        .map(|h| clip(h, MAX_WIDTH).chars().count())
        .collect();
    for row in grid.rows.iter().take(MAX_ROWS) {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(clip(&cell.text, MAX_WIDTH).chars().count());
        }
    }

    eprintln!(
        "   {} {}",
        bold(&grid.sheet_name),
        dim(&format!("({} rows × {} cols)", grid.rows.len(), columns))
    );
    let header: Vec<String> = grid
        .header
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", clip(h, MAX_WIDTH), width = widths[i]))
        .collect();
    eprintln!("     {}", bold(&header.join("  ")));

    for row in grid.rows.iter().take(MAX_ROWS) {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .take(columns)
            .map(|(i, cell)| {
                let text = clip(&cell.text, MAX_WIDTH);
                match cell.align {
                    pdftrans::CellAlign::Right => format!("{text:>width$}", width = widths[i]),
                    pdftrans::CellAlign::Left => format!("{text:<width$}", width = widths[i]),
                }
            })
            .collect();
        eprintln!("     {}", line.join("  "));
    }
    if grid.rows.len() > MAX_ROWS {
        eprintln!("     {}", dim(&format!("… {} more rows", grid.rows.len() - MAX_ROWS)));
    }
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max - 1).collect();
        format!("{clipped}…")
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
