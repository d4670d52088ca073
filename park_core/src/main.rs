//! # Parking-Assist Core Binary
//!
//! Runs the core on the simulation board with an obstacle that approaches
//! the center sensor and backs away again.
//!
//! # Usage
//!
//! ```bash
//! # Reverse engaged, run until Ctrl-C
//! park_core --reverse
//!
//! # Ten seconds with one stream client, JSON logs
//! park_core --reverse --stream --duration-secs 10 --json
//!
//! # Custom unit config
//! park_core --config config/parkassist.toml -v
//! ```

use clap::Parser;
use park_common::config::{ConfigError, LogLevel, UnitConfig};
use park_common::consts::MAX_RANGE_CM;
use park_core::ParkAssist;
use park_hal::sim::{LogTelemetrySink, MemoryStore, SimTransport};
use park_hal::SimBoard;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Closest and farthest point of the simulated obstacle [cm].
const SCENARIO_NEAR_CM: f32 = 20.0;
const SCENARIO_FAR_CM: f32 = 250.0;
/// One full approach-and-retreat cycle.
const SCENARIO_PERIOD: Duration = Duration::from_secs(20);
const TICK: Duration = Duration::from_millis(100);

/// Parking-assist core on the simulation board
#[derive(Parser, Debug)]
#[command(name = "park_core")]
#[command(version)]
#[command(about = "Parking-assist real-time core (simulation board)")]
struct Args {
    /// Unit configuration TOML. Defaults apply if the file is absent.
    #[arg(short, long, default_value = "config/parkassist.toml")]
    config: PathBuf,

    /// Stop after this many seconds (0 = run until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Start with reverse gear engaged.
    #[arg(long)]
    reverse: bool,

    /// Attach one simulated stream client.
    #[arg(long)]
    stream: bool,

    /// Enable verbose logging (at least DEBUG, overrides the config level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    // Loaded before tracing so the configured level applies from the first line.
    let loaded = UnitConfig::load_or_default(&args.config);
    let configured = loaded
        .as_ref()
        .map_or(LogLevel::default(), |c| c.shared.log_level);
    setup_tracing(&args, configured);

    info!("Parking-assist core v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e: ConfigError| -> Box<dyn std::error::Error> { Box::new(e) })
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Parking-assist core shutdown complete");
}

fn run(args: &Args, config: UnitConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Unit config source: {}", args.config.display());
    info!(
        "Config OK: service={}, grace={:?}, sweep interval={:?}",
        config.shared.service_name,
        config.timing.grace_period(),
        config.timing.sweep_interval()
    );

    let SimBoard { board, probes } = SimBoard::new(&config.hardware);
    let transport = Arc::new(SimTransport::new());
    let telemetry = Arc::new(LogTelemetrySink::new());
    let store = MemoryStore::new();
    telemetry.set_clients(1);

    let core = ParkAssist::new(
        config,
        board,
        Box::new(store.clone()),
        transport.clone(),
        telemetry.clone(),
    )
    .start()?;
    let api = core.api().clone();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    probes.reverse.set_engaged(args.reverse);
    if args.stream {
        transport.set_subscribers(1);
        api.request_stream();
    }

    let started = Instant::now();
    let deadline = (args.duration_secs > 0).then(|| Duration::from_secs(args.duration_secs));
    let mut last_report = Instant::now();

    while running.load(Ordering::SeqCst) {
        let elapsed = started.elapsed();
        if deadline.is_some_and(|d| elapsed >= d) {
            break;
        }

        let center = scenario_distance(elapsed);
        probes.obstacles.set_all([None, Some(center), Some((center * 1.6).min(MAX_RANGE_CM))]);

        if last_report.elapsed() >= Duration::from_secs(1) {
            last_report = Instant::now();
            match api.status() {
                Ok(s) => info!(
                    "active={} distances=[{:.0}, {:.0}, {:.0}] buzzer={} camera={:?} frames={}",
                    s.subsystem_active,
                    s.distances[0],
                    s.distances[1],
                    s.distances[2],
                    probes.buzzer.is_sounding(),
                    api.camera_state(),
                    transport.frames_sent()
                ),
                Err(e) => error!("Status unavailable: {e}"),
            }
        }
        thread::sleep(TICK);
    }

    if args.stream {
        api.release_stream();
    }
    core.shutdown();
    info!(
        "Scenario done: {} telemetry snapshots, {} frames streamed, {} settings saves",
        telemetry.published(),
        transport.frames_sent(),
        store.saves()
    );
    Ok(())
}

/// Triangle wave between the far and near points.
fn scenario_distance(elapsed: Duration) -> f32 {
    let period = SCENARIO_PERIOD.as_secs_f32();
    let phase = (elapsed.as_secs_f32() % period) / period;
    let t = if phase < 0.5 { phase * 2.0 } else { (1.0 - phase) * 2.0 };
    SCENARIO_FAR_CM - t * (SCENARIO_FAR_CM - SCENARIO_NEAR_CM)
}

/// Default filter level: the configured one, raised to DEBUG by `-v`.
fn effective_level(verbose: bool, configured: LogLevel) -> LogLevel {
    match configured {
        LogLevel::Trace | LogLevel::Debug => configured,
        _ if verbose => LogLevel::Debug,
        _ => configured,
    }
}

/// Setup tracing subscriber. `RUST_LOG` takes precedence when set.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = effective_level(args.verbose, configured);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
