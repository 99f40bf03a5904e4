//! localtime - render UTC timestamps in HTML as local, human-readable time
//!
//! Runs bind passes over `<time data-local-time>` elements in HTML files:
//! once per file for `bind`, and again after every change for `watch`.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/localtime/localtime.log (~/.local/state/localtime/localtime.log)
//! - Config: $XDG_CONFIG_HOME/localtime/config.toml (~/.config/localtime/config.toml)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use localtime_core::config::DisplayConfig;
use localtime_core::files::{bind_file, discover_files, BoundFile, FileWatch};
use localtime_core::{
    parse_timestamp, BindReport, Binder, Clock, Config, DisplayZone, FixedClock, LocaleTag, Mode,
    SystemClock, Trigger,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "localtime")]
#[command(about = "Render UTC timestamps in HTML as local, human-readable time")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one bind pass over HTML files
    Bind(BindArgs),
    /// Bind a file, then re-bind it every time it changes
    Watch(WatchArgs),
    /// Format a single timestamp
    Format(FormatArgs),
}

/// Viewer settings; each overrides the config file
#[derive(Args)]
struct DisplayArgs {
    /// Locale tag for calendar dates (e.g. en-US, de_DE.UTF-8)
    #[arg(long)]
    locale: Option<LocaleTag>,

    /// Zone for calendar dates (utc or local)
    #[arg(long)]
    zone: Option<DisplayZone>,

    /// Reference instant instead of the wall clock
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct BindArgs {
    /// HTML files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the result here instead of stdout (single input only)
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Rewrite each input file in place
    #[arg(long)]
    in_place: bool,

    /// Format of the per-file report written to stderr
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,

    #[command(flatten)]
    display: DisplayArgs,
}

#[derive(Args)]
struct WatchArgs {
    /// HTML file to watch
    input: PathBuf,

    /// Where the bound document is written after every pass
    #[arg(short, long)]
    output: PathBuf,

    /// Poll interval in milliseconds (default from config)
    #[arg(long)]
    poll: Option<u64>,

    #[command(flatten)]
    display: DisplayArgs,
}

#[derive(Args)]
struct FormatArgs {
    /// Timestamp, e.g. 2024-01-01T00:00:00Z
    timestamp: String,

    /// Display mode (relative or absolute-date)
    #[arg(long, default_value = "relative")]
    mode: Mode,

    #[command(flatten)]
    display: DisplayArgs,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn parse_now(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_timestamp(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Logging is best-effort; a read-only state dir must not block rendering
    let _log_guard = match localtime_core::logging::init(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled: {e}");
            None
        }
    };

    match cli.command {
        Command::Bind(args) => run_bind(&config, args),
        Command::Watch(args) => run_watch(&config, args),
        Command::Format(args) => run_format(&config, args),
    }
}

/// Build a binder from config with command-line overrides applied
fn build_binder(config: &Config, overrides: &DisplayArgs) -> Binder<Box<dyn Clock>> {
    let settings = DisplayConfig {
        locale: overrides.locale.clone().or_else(|| config.display.locale.clone()),
        zone: overrides.zone.unwrap_or(config.display.zone),
    };
    let formatter = settings.formatter();

    tracing::debug!(
        locale = %formatter.locale(),
        zone = ?formatter.zone(),
        now = ?overrides.now,
        "Display settings resolved"
    );

    let clock: Box<dyn Clock> = match overrides.now {
        Some(now) => Box::new(FixedClock(now)),
        None => Box::new(SystemClock),
    };
    Binder::with_clock(formatter, clock)
}

fn run_bind(config: &Config, args: BindArgs) -> Result<()> {
    let files = discover_files(&args.inputs).context("failed to expand inputs")?;
    if files.is_empty() {
        anyhow::bail!("No input files matched: {}", args.inputs.join(" "));
    }
    if files.len() > 1 && !args.in_place {
        anyhow::bail!(
            "{} inputs matched; use --in-place to rewrite several files",
            files.len()
        );
    }

    let binder = build_binder(config, &args.display);
    let mut bound_files = Vec::with_capacity(files.len());

    for path in &files {
        let bound = bind_file(&binder, Trigger::DocumentLoaded, path)
            .with_context(|| format!("failed to bind {}", path.display()))?;

        if args.in_place {
            bound
                .write_to(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
        } else if let Some(output) = &args.output {
            bound
                .write_to(output)
                .with_context(|| format!("failed to write {}", output.display()))?;
        } else {
            print!("{}", bound.html());
        }

        bound_files.push(bound);
    }

    print_reports(&bound_files, args.report)?;

    tracing::info!(files = bound_files.len(), "localtime bind complete");
    Ok(())
}

/// Print per-file bind reports to stderr
fn print_reports(bound_files: &[BoundFile], format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => {
            let reports: Vec<_> = bound_files
                .iter()
                .map(|b| json!({ "path": b.path, "report": b.report }))
                .collect();
            eprintln!("{}", serde_json::to_string_pretty(&reports)?);
        }
        ReportFormat::Text => {
            for bound in bound_files {
                print_report(&bound.path, &bound.report);
            }
        }
    }
    Ok(())
}

fn print_report(path: &Path, report: &BindReport) {
    eprintln!(
        "{}: {} matched, {} updated, {} diagnostic(s)",
        path.display(),
        report.matched,
        report.updated,
        report.diagnostics.len()
    );
    for diagnostic in &report.diagnostics {
        eprintln!("  warning: {}", diagnostic);
    }
}

/// Run continuous watch mode
fn run_watch(config: &Config, args: WatchArgs) -> Result<()> {
    let binder = build_binder(config, &args.display);
    let poll_ms = args.poll.unwrap_or(config.watch.poll_ms).max(1);

    // Taken before the first read so an edit racing the initial pass still
    // triggers a re-bind
    let mut watch = FileWatch::new(&args.input);

    let bound = bind_file(&binder, Trigger::DocumentLoaded, &args.input)
        .with_context(|| format!("failed to bind {}", args.input.display()))?;
    write_watch_output(&bound, &args.output, &mut watch)?;
    print_report(&bound.path, &bound.report);

    // Set up signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    println!(
        "Watching {} (poll every {}ms). Press Ctrl+C to stop.",
        args.input.display(),
        poll_ms
    );

    let poll_duration = Duration::from_millis(poll_ms);
    let mut passes = 1u64;

    while running.load(Ordering::SeqCst) {
        thread::sleep(poll_duration);

        if !watch.changed() {
            continue;
        }

        // The file may be mid-write; the next change event retries
        let bound = match bind_file(&binder, Trigger::AfterSwap, watch.path()) {
            Ok(bound) => bound,
            Err(e) => {
                tracing::warn!(path = %watch.path().display(), error = %e, "Re-bind failed");
                continue;
            }
        };
        write_watch_output(&bound, &args.output, &mut watch)?;

        passes += 1;
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        println!(
            "[{}] Rebound: {} updated, {} diagnostic(s)",
            timestamp,
            bound.report.updated,
            bound.report.diagnostics.len()
        );
        for diagnostic in &bound.report.diagnostics {
            println!("  warning: {}", diagnostic);
        }

        tracing::info!(passes, "watch bind pass");
    }

    println!("Watch mode stopped.");
    tracing::info!(passes, "localtime watch mode stopped");

    Ok(())
}

/// Write a watch pass; rewriting the watched file itself is not a new swap.
fn write_watch_output(bound: &BoundFile, output: &Path, watch: &mut FileWatch) -> Result<()> {
    bound
        .write_to(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if watch.is_same_file(output) {
        watch.refresh();
    }
    Ok(())
}

fn run_format(config: &Config, args: FormatArgs) -> Result<()> {
    let target = parse_timestamp(&args.timestamp).context("failed to parse timestamp")?;
    let binder = build_binder(config, &args.display);

    let now = binder.clock().now();
    println!("{}", binder.formatter().format(target, args.mode, now));

    Ok(())
}
