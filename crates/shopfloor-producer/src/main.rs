//! Telemetry producer binary.
//!
//! Boots a simulated machine fleet from `machines.yaml` (or a built-in
//! default fleet when the file is absent), then drives every machine
//! through the shared tick loop while rendering lifecycle events,
//! sensor readings, and periodic statistics to the console.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (respects `RUST_LOG`)
//! 2. Load the fleet configuration from `machines.yaml`
//! 3. Resolve the machine roster (configured entries or default fleet)
//! 4. Build one seeded simulator per machine
//! 5. Start the console display
//! 6. Run the tick loop until a bound or Ctrl-C stops it

mod display;
mod error;
mod fleet;
mod runner;

use std::path::Path;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shopfloor_sim::machine::MachineSimulator;

use crate::display::ConsoleDisplay;
use crate::error::ProducerError;
use crate::fleet::{FleetConfig, MachineEntry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("shopfloor-producer starting");

    // 2. Load configuration
    let config = load_fleet_config()?;
    info!(
        machines = config.machines.len(),
        seed = config.seed,
        tick_interval_s = config.tuning.tick_interval_s,
        time_multiplier = config.tuning.time_multiplier,
        "Configuration loaded"
    );

    let FleetConfig { seed, tuning, bounds, machines } = config;

    // 3. Resolve the machine roster
    let machine_configs = if machines.is_empty() {
        info!("No machines configured, using the default fleet");
        fleet::default_fleet()
    } else {
        machines.into_iter().map(MachineEntry::into_machine_config).collect()
    };

    // 4. Build the simulators, one deterministic seed per machine
    let start = Utc::now();
    let mut simulators = Vec::with_capacity(machine_configs.len());
    for (index, machine_config) in machine_configs.into_iter().enumerate() {
        let machine_seed = seed.wrapping_add(u64::try_from(index).unwrap_or(u64::MAX));
        simulators.push(MachineSimulator::new(
            machine_config,
            tuning.clone(),
            start,
            machine_seed,
        )?);
    }
    info!(count = simulators.len(), "Fleet assembled");

    // 5. Start the console display
    let mut display = ConsoleDisplay::start(simulators.len(), &tuning);

    // 6. Run the tick loop
    let result = runner::run_fleet(&mut simulators, &tuning, &bounds, &mut display).await;

    info!(
        end_reason = ?result.end_reason,
        iterations = result.total_iterations,
        "shopfloor-producer shutdown complete"
    );

    Ok(())
}

/// Load the fleet configuration from `machines.yaml` in the working
/// directory, falling back to defaults when the file does not exist.
fn load_fleet_config() -> Result<FleetConfig, ProducerError> {
    let path = Path::new("machines.yaml");
    if path.exists() {
        info!(path = %path.display(), "Loading configuration");
        Ok(FleetConfig::from_file(path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(FleetConfig::default())
    }
}
