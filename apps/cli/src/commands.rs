//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use orbitscrape_core::{IngestReport, ProgressReporter, run_ingest};
use orbitscrape_shared::{AppConfig, IngestConfig, NoradId, init_config, load_config};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// orbitscrape — mirror satellite catalog records to a local directory store.
#[derive(Parser)]
#[command(
    name = "orbitscrape",
    version,
    about = "Crawl a satellite catalog by NORAD id range into a directory store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl an inclusive range of NORAD ids.
    Run {
        /// NORAD id to start at.
        #[arg(short, long)]
        start: Option<u32>,

        /// NORAD id to end at (inclusive).
        #[arg(short, long)]
        end: Option<u32>,

        /// Output store directory.
        #[arg(short, long, env = "ORBITSCRAPE_OUT")]
        out: Option<PathBuf>,

        /// Number of concurrent workers.
        #[arg(long, env = "ORBITSCRAPE_CONCURRENCY")]
        concurrency: Option<u32>,

        /// Minimum delay between two dispatched ids, in milliseconds.
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Print the run report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "orbitscrape=info",
        1 => "orbitscrape=debug",
        _ => "orbitscrape=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            start,
            end,
            out,
            concurrency,
            pacing_ms,
            json,
        } => {
            let overrides = RunOverrides {
                start,
                end,
                out,
                concurrency,
                pacing_ms,
            };
            cmd_run(overrides, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Flag values that override the config file.
#[derive(Debug, Default)]
struct RunOverrides {
    start: Option<u32>,
    end: Option<u32>,
    out: Option<PathBuf>,
    concurrency: Option<u32>,
    pacing_ms: Option<u64>,
}

impl RunOverrides {
    fn apply(self, config: &mut IngestConfig) {
        if let Some(start) = self.start {
            config.start = NoradId(start);
        }
        if let Some(end) = self.end {
            config.end = NoradId(end);
        }
        if let Some(out) = self.out {
            config.output_dir = out;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(pacing_ms) = self.pacing_ms {
            config.pacing_ms = pacing_ms;
        }
    }
}

async fn cmd_run(overrides: RunOverrides, json: bool) -> Result<()> {
    let app_config = load_config()?;
    let mut config = IngestConfig::from(&app_config);
    overrides.apply(&mut config);
    config.validate()?;

    info!(
        start = %config.start,
        end = %config.end,
        out = %config.output_dir.display(),
        "pulling satellites starting at {} and finishing with {}",
        config.start,
        config.end
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight ids");
            on_interrupt.cancel();
        }
    });

    let reporter = CliProgress::new(config.range_len(), json)?;
    let report = run_ingest(&config, &reporter, cancel).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    if report.cancelled() {
        println!("  Run cancelled.");
    } else {
        println!("  Run complete.");
    }
    println!("  Run:          {}", report.run_id);
    println!("  Range:        {}..={}", report.start, report.end);
    println!(
        "  Satellites:   {} of {} dispatched",
        report.aggregate.satellites_received, report.dispatch.dispatched
    );
    println!("  Descriptions: {}", report.aggregate.descriptions_written);
    println!("  Categories:   {}", report.aggregate.categories_written);
    println!("  Images:       {}", report.aggregate.images_written);
    if report.aggregate.write_failures > 0 {
        println!("  Failed writes: {}", report.aggregate.write_failures);
    }
    println!("  Store:        {}", config.output_dir.display());
    println!("  Time:         {:.1}s", report.elapsed().as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: u64, hidden: bool) -> Result<Self> {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total)
        };
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}",
            )?
            .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Ok(Self { bar })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn satellite_stored(&self, id: NoradId, stored: u64, _total: u64) {
        self.bar.set_position(stored);
        self.bar.set_message(format!("NORAD {id}"));
    }

    fn done(&self, _report: &IngestReport) {
        self.bar.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
