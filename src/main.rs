use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use remotekit::config as cfg;
use remotekit::executor::{Input, Runtime};
use remotekit::host::{AutoPrompter, EntityState, Host, MemoryStates, Prompter, TtyPrompter};
use remotekit::sources::{self, ConfigWatcher, InputLine, InputSource, ReplaySource, StdinSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfirmMode {
    /// Ask on the controlling terminal.
    Ask,
    /// Accept every confirmation.
    Yes,
    /// Decline every confirmation.
    No,
}

/// remotekit CLI
#[derive(Debug, Parser)]
#[command(
    name = remotekit::PKG_NAME,
    version = remotekit::PKG_VERSION,
    about = "Gesture recognition and action dispatch for virtual remote-control surfaces"
)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config", default_value = "remote.json")]
    config: PathBuf,

    /// Replay input lines from this NDJSON file instead of the configured sources
    #[arg(short = 'e', long = "events")]
    events: Option<PathBuf>,

    /// JSON object of initial entity states, keyed by entity id
    #[arg(long = "states")]
    states: Option<PathBuf>,

    /// User id used for confirmation exemptions
    #[arg(short = 'u', long = "user")]
    user: Option<String>,

    /// How confirmations are answered
    #[arg(long = "confirm", value_enum, default_value_t = ConfirmMode::Ask)]
    confirm: ConfirmMode,

    /// Reload the configuration when its file changes
    #[arg(long = "watch")]
    watch: bool,

    /// Log commands instead of printing them as NDJSON
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Print the JSON Schema for the configuration and exit
    #[arg(long = "print-schema")]
    print_schema: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    remotekit::init_tracing(args.log_level.as_deref());

    if args.print_schema {
        let schema = cfg::generate_schema();
        let json = serde_json::to_string_pretty(&schema)?;
        println!("{json}");
        return Ok(());
    }

    info!(
        version = remotekit::PKG_VERSION,
        config = %args.config.display(),
        dry_run = args.dry_run,
        "Starting remotekit"
    );

    let config = cfg::load_from_path_async(&args.config).await?;
    debug!(target: "remotekit", elements = config.elements.len(), "Configuration loaded successfully");

    let states = Arc::new(MemoryStates::new());
    if let Some(path) = &args.states {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read states file {}", path.display()))?;
        let initial: BTreeMap<String, EntityState> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse states file {}", path.display()))?;
        for (entity_id, state) in initial {
            states.set(entity_id, state);
        }
        info!(entities = states.len(), "Initial states loaded");
    }

    let prompter: Arc<dyn Prompter> = match args.confirm {
        ConfirmMode::Ask => Arc::new(TtyPrompter::new()),
        ConfirmMode::Yes => Arc::new(AutoPrompter(true)),
        ConfirmMode::No => Arc::new(AutoPrompter(false)),
    };
    let host = Host::console(args.dry_run, states.clone(), prompter, args.user.clone());

    let line_sources: Vec<Box<dyn InputSource>> = match &args.events {
        Some(path) => vec![Box::new(ReplaySource::new(path.to_string_lossy()))],
        None => {
            let configured = sources::build_sources_from_config(&config);
            if configured.is_empty() {
                debug!(target: "remotekit", "No sources configured; reading stdin");
                vec![Box::new(StdinSource::new())]
            } else {
                configured
            }
        }
    };

    let (line_tx, line_rx) = mpsc::channel::<InputLine>(256);
    let (input_tx, input_rx) = mpsc::channel::<Input>(256);
    let _handles = sources::spawn_all_sources(&line_sources, line_tx);
    tokio::spawn(sources::forward(line_rx, states, input_tx.clone()));

    let _watch = if args.watch {
        Some(ConfigWatcher::new(&args.config).start(input_tx.clone())?)
    } else {
        None
    };
    drop(input_tx);

    let runtime = tokio::spawn(Runtime::new(config, host).run(input_rx));

    tokio::select! {
        res = runtime => match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(error = %err, "Runtime failed"),
            Err(err) => error!(error = %err, "Runtime task aborted"),
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Received Ctrl+C, shutting down");
        }
    }

    info!("remotekit exited");
    Ok(())
}
