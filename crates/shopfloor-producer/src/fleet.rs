//! Fleet configuration loading from `machines.yaml`.
//!
//! The fleet document carries the base seed, the process-wide tuning,
//! the run bounds, and one entry per machine. Entries use the compact
//! shopfloor schema (`id`, `type`, `specs`, `reliability`) and are
//! converted into full [`MachineConfig`] values before simulators are
//! built. When the document lists no machines the producer falls back to
//! [`default_fleet`].

use std::path::Path;

use serde::Deserialize;

use shopfloor_sim::config::{ConfigError, MachineConfig, SimTuning};
use shopfloor_types::Shift;

use crate::runner::RunBounds;

const DEFAULT_MAX_TEMPERATURE_C: f64 = 85.0;
const DEFAULT_OPTIMAL_TEMPERATURE_C: f64 = 65.0;
const DEFAULT_MAX_VIBRATION_MM_S: f64 = 5.0;
const DEFAULT_OPTIMAL_VIBRATION_MM_S: f64 = 1.5;
const DEFAULT_MAX_PRESSURE_BAR: f64 = 8.0;
const DEFAULT_OPTIMAL_PRESSURE_BAR: f64 = 6.5;
const DEFAULT_FAILURE_INJECTION_RATE: f64 = 0.05;

/// Top-level fleet document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FleetConfig {
    /// Base seed; machine `n` is seeded with `seed + n`.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Process-wide simulation tuning.
    #[serde(default)]
    pub tuning: SimTuning,

    /// Run bounds; zero values mean unbounded.
    #[serde(default)]
    pub bounds: RunBounds,

    /// Machine entries; empty means "use the default fleet".
    #[serde(default)]
    pub machines: Vec<MachineEntry>,
}

impl FleetConfig {
    /// Load and parse a fleet document from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML for this
    /// schema.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a fleet document from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the content is not valid YAML for
    /// this schema.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(contents)?;
        Ok(config)
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            tuning: SimTuning::default(),
            bounds: RunBounds::default(),
            machines: Vec::new(),
        }
    }
}

/// One machine entry in the fleet document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MachineEntry {
    /// Unique machine identifier.
    pub id: String,

    /// Machine class, lowercase in the document (e.g. `cnc_mill`).
    #[serde(rename = "type")]
    pub machine_type: String,

    /// Rated capability and optional sensor thresholds.
    pub specs: MachineSpecs,

    /// Optional reliability overrides.
    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

impl MachineEntry {
    /// Convert the document entry into an engine [`MachineConfig`].
    ///
    /// The type label is uppercased, the operator is derived from the
    /// machine id, and omitted thresholds fall back to the standard
    /// machining-center values.
    pub fn into_machine_config(self) -> MachineConfig {
        let operator = format!("operator_{}", self.id);
        MachineConfig {
            machine_id: self.id,
            machine_type: self.machine_type.to_uppercase(),
            rated_speed_rpm: self.specs.optimal_rpm,
            cycle_time_s: self.specs.cycle_time,
            operator,
            shift: Shift::Day,
            max_temperature_c: self
                .specs
                .max_temperature
                .unwrap_or(DEFAULT_MAX_TEMPERATURE_C),
            optimal_temperature_c: self
                .specs
                .optimal_temperature
                .unwrap_or(DEFAULT_OPTIMAL_TEMPERATURE_C),
            max_vibration_mm_s: self
                .specs
                .max_vibration
                .unwrap_or(DEFAULT_MAX_VIBRATION_MM_S),
            optimal_vibration_mm_s: self
                .specs
                .optimal_vibration
                .unwrap_or(DEFAULT_OPTIMAL_VIBRATION_MM_S),
            max_pressure_bar: self.specs.max_pressure.unwrap_or(DEFAULT_MAX_PRESSURE_BAR),
            optimal_pressure_bar: self
                .specs
                .optimal_pressure
                .unwrap_or(DEFAULT_OPTIMAL_PRESSURE_BAR),
            failure_injection_rate: self
                .reliability
                .failure_injection_rate
                .unwrap_or(DEFAULT_FAILURE_INJECTION_RATE),
        }
    }
}

/// Rated capability and sensor thresholds of one machine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MachineSpecs {
    /// Rated spindle speed in rpm.
    pub optimal_rpm: u32,
    /// Nominal seconds per production cycle.
    pub cycle_time: f64,
    /// Temperature ceiling in degrees Celsius.
    pub max_temperature: Option<f64>,
    /// Target temperature while Running.
    pub optimal_temperature: Option<f64>,
    /// Vibration ceiling in mm/s.
    pub max_vibration: Option<f64>,
    /// Healthy vibration level in mm/s.
    pub optimal_vibration: Option<f64>,
    /// Pressure ceiling in bar.
    pub max_pressure: Option<f64>,
    /// Working pressure in bar.
    pub optimal_pressure: Option<f64>,
}

/// Reliability overrides of one machine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct ReliabilityConfig {
    /// Per-tick probability of starting an anomaly.
    pub failure_injection_rate: Option<f64>,
}

/// Build the standard five-machine demonstration fleet.
pub fn default_fleet() -> Vec<MachineConfig> {
    vec![
        standard_machine("machine_001", "CNC_MILL", 3000, 8.0, "operator_A", Shift::Day),
        standard_machine("machine_002", "CNC_LATHE", 2500, 10.0, "operator_B", Shift::Day),
        standard_machine(
            "machine_003",
            "INJECTION_MOLD",
            1500,
            12.0,
            "operator_C",
            Shift::Day,
        ),
        standard_machine("machine_004", "PRESS", 800, 6.0, "operator_D", Shift::Night),
        standard_machine(
            "machine_005",
            "ASSEMBLY_ROBOT",
            1200,
            5.0,
            "operator_E",
            Shift::Night,
        ),
    ]
}

/// A machine with the standard sensor thresholds.
fn standard_machine(
    machine_id: &str,
    machine_type: &str,
    rated_speed_rpm: u32,
    cycle_time_s: f64,
    operator: &str,
    shift: Shift,
) -> MachineConfig {
    MachineConfig {
        machine_id: machine_id.to_owned(),
        machine_type: machine_type.to_owned(),
        rated_speed_rpm,
        cycle_time_s,
        operator: operator.to_owned(),
        shift,
        max_temperature_c: DEFAULT_MAX_TEMPERATURE_C,
        optimal_temperature_c: DEFAULT_OPTIMAL_TEMPERATURE_C,
        max_vibration_mm_s: DEFAULT_MAX_VIBRATION_MM_S,
        optimal_vibration_mm_s: DEFAULT_OPTIMAL_VIBRATION_MM_S,
        max_pressure_bar: DEFAULT_MAX_PRESSURE_BAR,
        optimal_pressure_bar: DEFAULT_OPTIMAL_PRESSURE_BAR,
        failure_injection_rate: DEFAULT_FAILURE_INJECTION_RATE,
    }
}

const fn default_seed() -> u64 {
    42
}
