//! VCU Dashboard CLI Application
//!
//! Command-line front end for the dashboard engine. It:
//! - Loads the dashboard layout from a TOML configuration
//! - Replays a recorded telemetry stream through a channel worker
//! - Prints alerts as the controller raises them
//! - Sends operator commands back over the channel
//! - Reports the resulting dashboard state (text or JSON)

use anyhow::{Context, Result};
use clap::Parser;
use dashboard_core::{Command, CruiseSetup, Dashboard, DashboardSnapshot};
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod report;
mod worker;

use config::AppConfig;
use report::ConsoleNotifier;
use worker::{ReplayWorker, Source, WorkerEvent};

/// VCU Dashboard - Replay controller telemetry into the operator dashboard
#[derive(Parser, Debug)]
#[command(name = "dashboard-cli")]
#[command(about = "Replay vehicle controller telemetry into the operator dashboard", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Telemetry stream, one JSON batch per line ("-" for stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Operator command to send after the replay (can be repeated)
    #[arg(long = "command", value_name = "CMD")]
    commands: Vec<String>,

    /// Delay between replayed batches in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("VCU Dashboard CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using dashboard library v{}", dashboard_core::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => {
            log::warn!("No configuration given, every channel is unbound");
            AppConfig::default()
        }
    };

    let source = resolve_source(&args, &app_config);
    let interval = Duration::from_millis(args.interval_ms.unwrap_or(app_config.input.interval_ms));

    let (snapshot, sent, cruise) = run(&args, &app_config, source, interval)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else if !args.quiet {
        print!("{}", report::render_text(&snapshot, &sent, &cruise));
    }

    Ok(())
}

/// Input from the command line wins over the configured stream; stdin otherwise
fn resolve_source(args: &Args, app_config: &AppConfig) -> Source {
    match args.input.as_ref().or(app_config.input.stream.as_ref()) {
        Some(path) if path.as_os_str() == "-" => Source::Stdin,
        Some(path) => Source::File(path.clone()),
        None => Source::Stdin,
    }
}

/// Replay the stream into a dashboard, then send the requested commands
fn run(
    args: &Args,
    app_config: &AppConfig,
    source: Source,
    interval: Duration,
) -> Result<(DashboardSnapshot, Vec<String>, Vec<dashboard_core::CruiseButton>)> {
    let (worker, events) = ReplayWorker::new(source, interval);
    let notifier = ConsoleNotifier::new(args.quiet);
    let mut dashboard = Dashboard::new(&app_config.dashboard, worker, notifier)
        .context("Failed to build dashboard")?;

    let cruise = app_config
        .cruise
        .as_ref()
        .map(|c| CruiseSetup::from(c).buttons())
        .unwrap_or_default();
    if let Some(charger) = &app_config.charger {
        let options = dashboard_core::ChargeOptions::from(charger);
        log::debug!(
            "Charge input levels: {:?}, preselected {:?}",
            options.levels(),
            options.selected()
        );
    }

    dashboard.activate().context("Failed to start channel worker")?;
    // A fresh connection makes the controller resend every value
    dashboard.send(&Command::Raw("connected".to_string()))?;

    let mut batches = 0usize;
    for event in events.iter() {
        match event {
            WorkerEvent::Message(text) => match dashboard.handle_text(&text) {
                Ok(_) => batches += 1,
                Err(e) => log::warn!("Discarding message: {}", e),
            },
            WorkerEvent::Closed => break,
        }
    }
    log::info!("Replay finished: {} batch(es) applied", batches);

    for raw in &args.commands {
        let command = Command::parse(raw);
        if let Command::Raw(_) = command {
            log::debug!("Forwarding unrecognised command verbatim: {}", raw);
        }
        dashboard.send(&command)?;
    }

    dashboard.send(&Command::Raw("disconnected".to_string()))?;
    dashboard.deactivate()?;

    let snapshot = dashboard.snapshot();
    let sent = dashboard.channel().sent().to_vec();
    Ok((snapshot, sent, cruise))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
