//! Edgelight - Main entry point
//!
//! Runs the ambient lighting pipeline as a daemon: samples the screen edge
//! regions, reduces them to colors, and mirrors those colors onto the
//! configured fixture groups until Ctrl+C.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use edgelight::{
    make_reducer, open_backend, Config, FixtureTarget, FrameSource, LightDispatcher, Pipeline,
    ReducerKind, ScreenSampler, SharedColorState, Side, TraceController,
};

/// Command line overrides on top of the config file
#[derive(Debug, Clone, Default)]
struct CliArgs {
    /// Path to config file
    config_path: Option<PathBuf>,
    /// Monitor to sample
    monitor_index: Option<usize>,
    /// Region reduction strategy
    strategy: Option<ReducerKind>,
}

/// Parse command line arguments
fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("edgelight v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    cli.config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--monitor" => {
                i += 1;
                if i < args.len() {
                    if let Ok(index) = args[i].parse() {
                        cli.monitor_index = Some(index);
                    }
                }
            }
            "--strategy" => {
                i += 1;
                if i < args.len() {
                    cli.strategy = match args[i].as_str() {
                        "average" => Some(ReducerKind::Average),
                        "dominant" => Some(ReducerKind::Dominant),
                        other => {
                            eprintln!("Unknown strategy: {} (expected average or dominant)", other);
                            std::process::exit(1);
                        }
                    };
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Use --help for usage information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn print_help() {
    println!(
        r#"Edgelight - Ambient screen lighting daemon

USAGE:
    edgelight [OPTIONS]

OPTIONS:
    -h, --help              Show this help message
    -v, --version           Show version
    -c, --config <PATH>     Path to configuration file
    --monitor <INDEX>       Monitor to sample (default: 0)
    --strategy <NAME>       Region reduction strategy: average or dominant

PIPELINE:
    Two regions anchored to the left and right screen edges are sampled
    about twenty times a second and reduced to one representative color
    each. Two fixture groups follow those colors about ten times a second;
    colors too dark or too washed out turn their side effectively off.

CONFIGURATION:
    Settings load from <config dir>/edgelight/config.toml when present.
    Sections: [general], [capture], [regions], [dispatch], [bridge].

EXAMPLES:
    edgelight                            # Defaults, synthetic backend
    edgelight --strategy dominant        # Dominant-bin reduction
    edgelight --config ~/edgelight.toml  # Custom configuration
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();

    // Config decides the log level, so load it before logging starts
    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let mut config = Config::load_from_path(config_path.clone());
    if let Some(index) = args.monitor_index {
        config.capture.monitor_index = index;
    }
    if let Some(strategy) = args.strategy {
        config.capture.strategy = strategy;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let level = config
        .general
        .log_level
        .parse::<Level>()
        .unwrap_or(Level::INFO);
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .init();

    info!("Starting edgelight");
    info!("Configuration loaded from {:?}", config_path);

    // Capture side
    let grabber = open_backend(&config.capture.backend, config.capture.monitor_index)?;
    let source = FrameSource::new(
        grabber,
        config.regions.width_ratio,
        config.regions.height_ratio,
    );

    let state = SharedColorState::new();
    let sampler = ScreenSampler::new(
        source,
        make_reducer(config.capture.strategy),
        state.clone(),
    );

    // Dispatch side
    if config.bridge.address.is_empty() {
        info!("No bridge address configured; commands go to the dry-run controller");
    }
    let dispatcher = LightDispatcher::new(
        TraceController,
        state,
        FixtureTarget::new(Side::Left, config.bridge.left_fixture_ids.clone()),
        FixtureTarget::new(Side::Right, config.bridge.right_fixture_ids.clone()),
        config.dispatch.clone(),
    );

    let mut pipeline = Pipeline::start(
        sampler,
        dispatcher,
        Duration::from_millis(config.capture.interval_ms),
        Duration::from_millis(config.dispatch.interval_ms),
    );

    // Setup shutdown signal
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    info!("Running; press Ctrl+C to stop");

    while running.load(Ordering::SeqCst) {
        if pipeline.is_dispatch_finished() {
            warn!("Dispatch loop ended on its own; shutting down");
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    match pipeline.shutdown().await {
        Ok(()) => info!("Shutdown complete"),
        Err(e) => {
            error!("Dispatch loop failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
