//! Command line front end: collect a thread's comments and their replies,
//! then export them.
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use harvester_core::SessionMetadata;
use harvester_engine::{BatchReport, CrawlEvent, EngineHandle, ExportFormat, ThreadContext};
use harvester_logging::{harvest_error, LogDestination, DEFAULT_LOG_FILE};
use log::LevelFilter;

use crate::config::{load_config, save_config, AppConfig, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(name = "harvester", version, about = "Collect comments and their replies for one thread")]
struct Cli {
    /// Thread identifier (the numeric `oid` of the video).
    #[arg(long)]
    oid: String,

    /// Number of top-level comments to collect.
    #[arg(long, default_value_t = 20)]
    target: usize,

    /// Only collect top-level comments, skip replies.
    #[arg(long)]
    top_only: bool,

    #[arg(long, value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,

    /// Directory the export is written to.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Write the effective config to `--config` and exit.
    #[arg(long)]
    write_config: bool,

    /// Title used in the export metadata and file name.
    #[arg(long)]
    title: Option<String>,

    #[arg(long, value_enum, default_value_t = LogArg::Terminal)]
    log: LogArg,

    #[arg(long, short = 'v')]
    verbose: bool,

    /// Overrides `crawl.base_delay_ms`.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Overrides `crawl.max_concurrent_roots`.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Overrides `http.api_base`.
    #[arg(long)]
    api_base: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Json,
    Table,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Table => ExportFormat::Table,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogArg {
    Terminal,
    File,
    Both,
}

impl From<LogArg> for LogDestination {
    fn from(value: LogArg) -> Self {
        match value {
            LogArg::Terminal => LogDestination::Terminal,
            LogArg::File => LogDestination::File(PathBuf::from(DEFAULT_LOG_FILE)),
            LogArg::Both => LogDestination::Both(PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if !harvester_logging::initialize(cli.log.into(), level) {
        eprintln!("Warning: logging could not be initialized");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            harvest_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = effective_config(&cli);
    if cli.write_config {
        save_config(&cli.config, &config)
            .with_context(|| format!("writing config to {}", cli.config.display()))?;
        println!("Wrote {}", cli.config.display());
        return Ok(());
    }

    let engine = EngineHandle::new(
        config.crawl.clone(),
        config.http.fetch_settings(),
        ThreadContext::new(cli.oid.clone()),
    )
    .context("setting up the HTTP client")?;

    let max_roots = if cli.top_only {
        engine.acquire_top_level(cli.target);
        wait_for_top_level(&engine)?;
        None
    } else {
        engine.run_batch(cli.target);
        let report = wait_for_batch(&engine)?;
        println!("{}", report.summary());
        Some(cli.target)
    };

    engine.export(cli.format.into(), &cli.out, metadata(&cli), max_roots);
    loop {
        match next_event(&engine)? {
            CrawlEvent::ExportCompleted(Ok(summary)) => {
                println!(
                    "Exported {} comments under {} roots to {}",
                    summary.comment_count,
                    summary.root_count,
                    summary.output_path.display()
                );
                return Ok(());
            }
            CrawlEvent::ExportCompleted(Err(err)) => bail!("export failed: {err}"),
            other => print_event(&other),
        }
    }
}

fn effective_config(cli: &Cli) -> AppConfig {
    let mut config = load_config(&cli.config);
    if let Some(delay) = cli.delay_ms {
        config.crawl.base_delay_ms = delay;
    }
    if let Some(width) = cli.concurrency {
        config.crawl.max_concurrent_roots = Some(width);
    }
    if let Some(base) = &cli.api_base {
        config.http.api_base = base.clone();
    }
    config
}

fn metadata(cli: &Cli) -> SessionMetadata {
    SessionMetadata {
        source_title: cli
            .title
            .clone()
            .unwrap_or_else(|| format!("comments of {}", cli.oid)),
        link: format!("https://www.bilibili.com/video/av{}", cli.oid),
        captured_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn wait_for_top_level(engine: &EngineHandle) -> Result<usize> {
    loop {
        match next_event(engine)? {
            CrawlEvent::TopLevelComplete { count } => return Ok(count),
            CrawlEvent::Stopped(err) => bail!("top-level collection stopped: {err}"),
            other => print_event(&other),
        }
    }
}

fn wait_for_batch(engine: &EngineHandle) -> Result<BatchReport> {
    loop {
        match next_event(engine)? {
            CrawlEvent::BatchComplete(report) => return Ok(report),
            CrawlEvent::Stopped(err) => bail!("crawl stopped: {err}"),
            other => print_event(&other),
        }
    }
}

fn next_event(engine: &EngineHandle) -> Result<CrawlEvent> {
    engine
        .recv()
        .context("engine stopped before finishing the command")
}

fn print_event(event: &CrawlEvent) {
    match event {
        CrawlEvent::Log(entry) => println!("[{}] {}", entry.timestamp, entry.message),
        CrawlEvent::UpstreamUnhealthy => {
            eprintln!("Upstream looks unhealthy; remaining roots are skipped")
        }
        _ => {}
    }
}
