//! SweepSLAM daemon
//!
//! Reads a rotating range finder over serial (or a capture file), runs the
//! SLAM engine at a fixed tick and logs the pose and map state.
//!
//! ```text
//! ┌──────────────┐   bytes   ┌──────────────┐  samples  ┌──────────────┐
//! │  ByteSource  │ ────────▶ │ StreamReader │ ────────▶ │ SampleChannel│
//! └──────────────┘           └──────────────┘           └──────┬───────┘
//!                             (reader thread)                  │ drain per tick
//!                                                      ┌───────▼───────┐
//!                                                      │  SlamEngine   │
//!                                                      └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! # With default config (./sweep-slam.toml if present)
//! cargo run --release
//!
//! # With custom config file and port override
//! cargo run --release -- --config sweep-slam.toml --port /dev/ttyUSB1
//!
//! # Replay a raw capture
//! cargo run --release -- --replay capture.bin
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use clap::Parser;
use sweep_io::{SampleChannel, StreamReader};
use sweep_slam::config::{AppConfig, SourceKind};
use sweep_slam::engine::slam::SlamEngine;

#[derive(Parser, Debug)]
#[command(author, version, about = "Minimal 2D lidar SLAM daemon", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./sweep-slam.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial port override
    #[arg(long, value_name = "PATH", conflicts_with = "replay")]
    port: Option<String>,

    /// Replay a raw capture file instead of a serial port
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.source.kind = SourceKind::Serial;
            config.source.serial.port = port.clone();
        }
        if let Some(path) = &self.replay {
            config.source.kind = SourceKind::Replay;
            config.source.replay.path = path.clone();
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Logging is configured from the file, so load errors go to stderr
    let (mut config, origin) = match AppConfig::load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("sweep-slam: {}", e);
            return ExitCode::FAILURE;
        }
    };
    args.apply(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("sweep-slam: {}", e);
        return ExitCode::FAILURE;
    }

    if args.print_config {
        return match config.to_toml() {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("sweep-slam: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "[{}] {} - {}",
            record.level(),
            record.target(),
            record.args()
        )
    })
    .init();

    log::info!("sweep-slam starting");
    origin.log();
    match config.source.kind {
        SourceKind::Serial => log::info!(
            "  Source: serial {} at {} baud",
            config.source.serial.port,
            config.source.serial.baud_rate
        ),
        SourceKind::Replay => log::info!(
            "  Source: replay {}",
            config.source.replay.path.display()
        ),
    }
    log::info!(
        "  Grid: {}x{} at {}m",
        config.grid.width,
        config.grid.height,
        config.grid.resolution
    );
    log::info!(
        "  Estimator: {} trials, tick {}ms",
        config.estimator.trials,
        config.runtime.tick_ms
    );

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    }) {
        log::warn!("Failed to install Ctrl-C handler: {}", e);
    }

    match run(&config, &running) {
        Ok(()) => {
            log::info!("sweep-slam shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Daemon error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig, running: &AtomicBool) -> Result<(), Box<dyn std::error::Error>> {
    let channel = SampleChannel::new();
    let mut engine = SlamEngine::new(config.slam_config())?;
    let mut reader = StreamReader::new(config.byte_source(), channel.clone(), config.reader.clone());
    reader.start()?;

    let tick = config.runtime.tick();
    let status_interval = config.runtime.status_interval_ticks;
    let mut ticks: u64 = 0;

    while running.load(Ordering::Relaxed) {
        let started = Instant::now();

        let update = engine.process(&channel);
        ticks += 1;

        if let Some(estimate) = update.estimate {
            log::debug!(
                "Pose ({:.3}, {:.3}, {:.3}) from {} samples, score {:.1}",
                update.pose.x,
                update.pose.y,
                update.pose.theta,
                update.samples.len(),
                estimate.score
            );
        }

        if status_interval > 0 && ticks % status_interval == 0 {
            let counts = engine.grid().counts();
            let stats = reader.stats();
            log::info!(
                "Pose ({:.2}, {:.2}, {:.2}) | map {} occupied, {} free, {} unknown | {} frames, {} samples, {} queued",
                update.pose.x,
                update.pose.y,
                update.pose.theta,
                counts.occupied,
                counts.free,
                counts.unknown,
                stats.frames,
                stats.samples,
                channel.len()
            );
        }

        if !reader.is_running() {
            log::error!("Stream reader on {} stopped", reader.source_name());
            break;
        }

        thread::sleep(tick.saturating_sub(started.elapsed()));
    }

    reader.stop()?;
    Ok(())
}
