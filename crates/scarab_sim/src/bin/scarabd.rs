use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use scarab_net::EventLoggerFilter;
use scarab_sim::{EventLoggerConfig, Simulation, SimulationConfig};
use tracing::{error, info};

/// Standalone process entry point for the Scarab simulation kernel.
///
/// Hosts the Control Server and drives the stepping loop; entities are
/// registered by embedding [`scarab_sim::Simulation`] as a library — this
/// binary alone runs a kernel with no entities registered, useful for
/// exercising the control protocol on its own.
#[derive(Parser)]
#[command(name = "scarabd", about = "Scarab discrete-event simulation kernel")]
struct Args {
    /// Control server bind host.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Control server bind port.
    #[arg(long, default_value_t = 1234)]
    port: u32,

    /// Number of steps to run before shutting down.
    #[arg(long, default_value_t = 0)]
    steps: i64,

    /// Minimum step duration, in seconds (fractional values allowed).
    #[arg(long, default_value_t = 0.0)]
    step_length: f64,

    /// Write an event log to this file instead of stdout.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match SimulationConfig::new(
        args.host.clone(),
        args.port,
        args.steps,
        Duration::from_secs_f64(args.step_length.max(0.0)),
        Some(EventLoggerConfig {
            path: args.log_file,
            filter: EventLoggerFilter::default(),
        }),
    ) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(host = %config.host, port = config.port, steps = config.number_steps, "starting scarabd");

    let simulation = Simulation::new(config);
    match simulation.run().await {
        Ok(()) => {
            info!("simulation terminated cleanly");
            std::process::ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "simulation terminated with an error");
            std::process::ExitCode::FAILURE
        }
    }
}
