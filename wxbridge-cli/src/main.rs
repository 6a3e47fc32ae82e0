//! wxbridge command line runner.
//!
//! Loads configuration, builds the engine against the AviationWeather.gov
//! provider and runs the tick loop until Ctrl-C. Without a simulator
//! attached the aircraft position comes from `--lat`/`--lon` and packets
//! go to the logging sink, which is enough to watch real weather stream
//! for any point on Earth.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use wxbridge::config::Config;
use wxbridge::engine::WeatherEngine;
use wxbridge::logging::init_logging;
use wxbridge::provider::{AviationWeatherProvider, ReqwestClient};
use wxbridge::sim::{FixedStateSource, LogSink};
use wxbridge::station::StationRegistry;

#[derive(Debug, Parser)]
#[command(name = "wxbridge", version = wxbridge::VERSION, about = "Real-world weather streaming for FSX-class simulators")]
struct Args {
    /// Path to the INI configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the station database CSV (overrides the config file).
    #[arg(long, value_name = "FILE")]
    stations: Option<PathBuf>,

    /// Aircraft latitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Aircraft longitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Aircraft altitude in feet.
    #[arg(long, default_value_t = 3000.0)]
    alt: f32,
}

fn load_config(args: &Args) -> Result<Config, String> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| e.to_string())?,
        None => Config::default(),
    };
    if let Some(stations) = &args.stations {
        config.stations.database = Some(stations.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("configuration error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_logging(&config.logging.directory, &config.logging.file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(version = wxbridge::VERSION, "wxbridge starting");

    let registry = match &config.stations.database {
        Some(path) => match StationRegistry::from_csv_path(path) {
            Ok(registry) => registry,
            Err(e) => {
                error!(error = %e, "Failed to load station database");
                return ExitCode::FAILURE;
            }
        },
        None => {
            error!("No station database configured; pass --stations or set [stations] database");
            return ExitCode::FAILURE;
        }
    };

    let client = match ReqwestClient::new(config.provider.request_timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let provider = AviationWeatherProvider::new(client, &config.provider);
    let source = FixedStateSource::new(args.lat, args.lon, args.alt);
    let sink = LogSink::new();

    let engine = WeatherEngine::new(config, registry, provider, source, sink);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            signal_token.cancel();
        }
    });

    engine.run(shutdown).await;
    ExitCode::SUCCESS
}
