use env_logger::Builder;
use log::{LevelFilter, error, info};
use std::process::ExitCode;

use crate::config::ExperimentConfig;
use crate::simulation::SimulationEngine;

mod config;
mod export;
mod simulation;

const DEFAULT_CONFIG_PATH: &str = "scenes/pulsed_grid.json";

fn main() -> ExitCode {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("coincidence_simulator"), LevelFilter::Debug)
        .init();

    info!("Starting up");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match ExperimentConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Cannot load experiment configuration {}: {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    let mut engine = match SimulationEngine::new(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Cannot initialize engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let summary = match engine.run() {
        Ok(summary) => summary,
        Err(e) => {
            error!("Simulation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Registered {} detections: {} neutrons, {} alpha particles ({} geometric misses)",
        summary.total_detections, summary.neutron_detections, summary.alpha_detections, summary.missed_count
    );

    // Export failures never abort: the in-memory results stay authoritative
    // and both encodings are attempted independently.
    let directory = export::history_directory();
    if let Err(e) = export::export_csv(&engine, &directory, "results.csv") {
        error!("CSV export failed: {:#}", e);
    }
    if let Err(e) = export::export_json(&engine, &directory, "results.json") {
        error!("JSON export failed: {:#}", e);
    }

    ExitCode::SUCCESS
}
