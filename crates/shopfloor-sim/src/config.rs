//! Typed configuration for the simulation engine.
//!
//! Two structs feed the engine: [`MachineConfig`] describes one machine
//! (identity, rated capability, sensor thresholds) and [`SimTuning`] holds
//! the process-wide tunables shared by every machine. Both deserialize
//! from YAML and must pass [`MachineConfig::validate`] /
//! [`SimTuning::validate`] before a simulator is built; the tick path
//! assumes validated values.

use serde::Deserialize;

use shopfloor_types::{AnomalyKind, Shift};

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A machine entry violates a validation rule.
    #[error("invalid config for machine {machine_id}: {reason}")]
    InvalidMachine {
        /// Identifier of the offending machine.
        machine_id: String,
        /// Explanation of the violated rule.
        reason: String,
    },

    /// The process-wide tuning violates a validation rule.
    #[error("invalid tuning: {reason}")]
    InvalidTuning {
        /// Explanation of the violated rule.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// Per-machine configuration
// ---------------------------------------------------------------------------

/// Immutable description of one machine.
///
/// Identity and rated capability are required; sensor thresholds default
/// to values typical of a mid-size machining center.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MachineConfig {
    /// Unique machine identifier (e.g. `machine_001`).
    pub machine_id: String,

    /// Machine class label (e.g. `CNC_MILL`), carried on emitted records.
    pub machine_type: String,

    /// Rated spindle speed in rpm while Running.
    pub rated_speed_rpm: u32,

    /// Nominal seconds to complete one production cycle.
    pub cycle_time_s: f64,

    /// Operator label attached to lifecycle events.
    pub operator: String,

    /// Shift the machine is staffed on.
    #[serde(default = "default_shift")]
    pub shift: Shift,

    /// Temperature ceiling in degrees Celsius; anomaly spikes exceed it.
    #[serde(default = "default_max_temperature_c")]
    pub max_temperature_c: f64,

    /// Temperature the machine targets while Running.
    #[serde(default = "default_optimal_temperature_c")]
    pub optimal_temperature_c: f64,

    /// Vibration ceiling in mm/s; anomaly spikes exceed it.
    #[serde(default = "default_max_vibration_mm_s")]
    pub max_vibration_mm_s: f64,

    /// Vibration level of a healthy machine while Running.
    #[serde(default = "default_optimal_vibration_mm_s")]
    pub optimal_vibration_mm_s: f64,

    /// Pressure ceiling in bar.
    #[serde(default = "default_max_pressure_bar")]
    pub max_pressure_bar: f64,

    /// Working pressure in bar while Running.
    #[serde(default = "default_optimal_pressure_bar")]
    pub optimal_pressure_bar: f64,

    /// Per-tick probability of starting an anomaly when none is active.
    #[serde(default = "default_failure_injection_rate")]
    pub failure_injection_rate: f64,
}

impl MachineConfig {
    /// Check the configuration against the engine's assumptions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMachine`] naming the first violated
    /// rule: empty identifier, zero rated speed, non-positive cycle time,
    /// non-positive thresholds, or a failure-injection rate outside [0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.machine_id.is_empty() {
            return Err(self.invalid("machine_id must not be empty"));
        }
        if self.rated_speed_rpm == 0 {
            return Err(self.invalid("rated_speed_rpm must be positive"));
        }
        if self.cycle_time_s <= 0.0 {
            return Err(self.invalid("cycle_time_s must be positive"));
        }
        if self.max_temperature_c <= 0.0 {
            return Err(self.invalid("max_temperature_c must be positive"));
        }
        if self.max_vibration_mm_s <= 0.0 {
            return Err(self.invalid("max_vibration_mm_s must be positive"));
        }
        if self.max_pressure_bar <= 0.0 || self.optimal_pressure_bar <= 0.0 {
            return Err(self.invalid("pressure thresholds must be positive"));
        }
        if !(0.0..=1.0).contains(&self.failure_injection_rate) {
            return Err(self.invalid("failure_injection_rate must be within [0, 1]"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> ConfigError {
        ConfigError::InvalidMachine {
            machine_id: self.machine_id.clone(),
            reason: reason.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Process-wide tuning
// ---------------------------------------------------------------------------

/// Process-wide tunables shared by every machine in the fleet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimTuning {
    /// Wall seconds between producer iterations.
    #[serde(default = "default_tick_interval_s")]
    pub tick_interval_s: u64,

    /// Simulated seconds per wall second of tick interval.
    #[serde(default = "default_time_multiplier")]
    pub time_multiplier: f64,

    /// Wall-clock speedup applied to the sleep between iterations.
    #[serde(default = "default_simulation_speed")]
    pub simulation_speed: f64,

    /// Operating hours between preventive maintenance; wear reaches 1.0
    /// when this many hours accrue.
    #[serde(default = "default_maintenance_interval_hours")]
    pub maintenance_interval_hours: f64,

    /// Probability that a completed cycle is quality-inspected.
    #[serde(default = "default_quality_check_probability")]
    pub quality_check_probability: f64,

    /// Per-tick probability of a scheduled break while Running.
    #[serde(default = "default_planned_downtime_probability")]
    pub planned_downtime_probability: f64,

    /// Per-tick base probability of an unplanned failure while Running,
    /// before wear scaling.
    #[serde(default = "default_unplanned_failure_base_probability")]
    pub unplanned_failure_base_probability: f64,

    /// Whether anomaly injection runs at all.
    #[serde(default = "default_true")]
    pub anomaly_injection_enabled: bool,

    /// Anomaly kinds eligible for injection.
    #[serde(default = "default_anomaly_kinds")]
    pub anomaly_kinds: Vec<AnomalyKind>,

    /// Producer iterations between fleet statistics printouts.
    #[serde(default = "default_stats_interval_iterations")]
    pub stats_interval_iterations: u64,
}

impl SimTuning {
    /// Check the tuning against the engine's assumptions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTuning`] naming the first violated
    /// rule: zero tick interval, non-positive multipliers or maintenance
    /// interval, probabilities outside [0, 1], or an empty anomaly kind
    /// list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_s == 0 {
            return Err(invalid_tuning("tick_interval_s must be at least 1"));
        }
        if self.time_multiplier <= 0.0 {
            return Err(invalid_tuning("time_multiplier must be positive"));
        }
        if self.simulation_speed <= 0.0 {
            return Err(invalid_tuning("simulation_speed must be positive"));
        }
        if self.maintenance_interval_hours <= 0.0 {
            return Err(invalid_tuning("maintenance_interval_hours must be positive"));
        }
        for (name, value) in [
            ("quality_check_probability", self.quality_check_probability),
            ("planned_downtime_probability", self.planned_downtime_probability),
            (
                "unplanned_failure_base_probability",
                self.unplanned_failure_base_probability,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid_tuning(&format!("{name} must be within [0, 1]")));
            }
        }
        if self.anomaly_kinds.is_empty() {
            return Err(invalid_tuning("anomaly_kinds must not be empty"));
        }
        Ok(())
    }
}

impl Default for SimTuning {
    fn default() -> Self {
        Self {
            tick_interval_s: default_tick_interval_s(),
            time_multiplier: default_time_multiplier(),
            simulation_speed: default_simulation_speed(),
            maintenance_interval_hours: default_maintenance_interval_hours(),
            quality_check_probability: default_quality_check_probability(),
            planned_downtime_probability: default_planned_downtime_probability(),
            unplanned_failure_base_probability: default_unplanned_failure_base_probability(),
            anomaly_injection_enabled: true,
            anomaly_kinds: default_anomaly_kinds(),
            stats_interval_iterations: default_stats_interval_iterations(),
        }
    }
}

fn invalid_tuning(reason: &str) -> ConfigError {
    ConfigError::InvalidTuning { reason: reason.to_owned() }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_shift() -> Shift {
    Shift::Day
}

const fn default_max_temperature_c() -> f64 {
    85.0
}

const fn default_optimal_temperature_c() -> f64 {
    65.0
}

const fn default_max_vibration_mm_s() -> f64 {
    5.0
}

const fn default_optimal_vibration_mm_s() -> f64 {
    1.5
}

const fn default_max_pressure_bar() -> f64 {
    8.0
}

const fn default_optimal_pressure_bar() -> f64 {
    6.5
}

const fn default_failure_injection_rate() -> f64 {
    0.05
}

const fn default_tick_interval_s() -> u64 {
    5
}

const fn default_time_multiplier() -> f64 {
    1.0
}

const fn default_simulation_speed() -> f64 {
    1.0
}

const fn default_maintenance_interval_hours() -> f64 {
    168.0
}

const fn default_quality_check_probability() -> f64 {
    0.15
}

const fn default_planned_downtime_probability() -> f64 {
    0.02
}

const fn default_unplanned_failure_base_probability() -> f64 {
    0.005
}

fn default_anomaly_kinds() -> Vec<AnomalyKind> {
    vec![
        AnomalyKind::TemperatureSpike,
        AnomalyKind::VibrationAnomaly,
        AnomalyKind::PressureDrop,
        AnomalyKind::SpeedFluctuation,
        AnomalyKind::PowerSurge,
    ]
}

const fn default_stats_interval_iterations() -> u64 {
    12
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper to create a plausible milling machine configuration.
    fn make_machine_config() -> MachineConfig {
        MachineConfig {
            machine_id: String::from("machine_001"),
            machine_type: String::from("CNC_MILL"),
            rated_speed_rpm: 3000,
            cycle_time_s: 8.0,
            operator: String::from("operator_A"),
            shift: Shift::Day,
            max_temperature_c: default_max_temperature_c(),
            optimal_temperature_c: default_optimal_temperature_c(),
            max_vibration_mm_s: default_max_vibration_mm_s(),
            optimal_vibration_mm_s: default_optimal_vibration_mm_s(),
            max_pressure_bar: default_max_pressure_bar(),
            optimal_pressure_bar: default_optimal_pressure_bar(),
            failure_injection_rate: default_failure_injection_rate(),
        }
    }

    #[test]
    fn default_tuning_is_valid() {
        let tuning = SimTuning::default();
        assert!(tuning.validate().is_ok());
        assert_eq!(tuning.tick_interval_s, 5);
        assert!((tuning.maintenance_interval_hours - 168.0).abs() < f64::EPSILON);
        assert!((tuning.quality_check_probability - 0.15).abs() < f64::EPSILON);
        assert_eq!(tuning.anomaly_kinds.len(), 5);
        assert!(tuning.anomaly_injection_enabled);
    }

    #[test]
    fn plausible_machine_config_is_valid() {
        assert!(make_machine_config().validate().is_ok());
    }

    #[test]
    fn zero_rated_speed_is_rejected() {
        let mut config = make_machine_config();
        config.rated_speed_rpm = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cycle_time_is_rejected() {
        let mut config = make_machine_config();
        config.cycle_time_s = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_failure_rate_is_rejected() {
        let mut config = make_machine_config();
        config.failure_injection_rate = 1.5;
        assert!(config.validate().is_err());
        config.failure_injection_rate = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let tuning = SimTuning { tick_interval_s: 0, ..SimTuning::default() };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let tuning =
            SimTuning { planned_downtime_probability: 2.0, ..SimTuning::default() };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn empty_anomaly_kind_list_is_rejected() {
        let tuning = SimTuning { anomaly_kinds: Vec::new(), ..SimTuning::default() };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn machine_config_deserializes_with_threshold_defaults() {
        let yaml = r"
machine_id: machine_007
machine_type: PRESS
rated_speed_rpm: 800
cycle_time_s: 6.0
operator: operator_D
";
        let config: MachineConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.machine_id, "machine_007");
        assert_eq!(config.shift, Shift::Day);
        assert!((config.max_temperature_c - 85.0).abs() < f64::EPSILON);
        assert!((config.failure_injection_rate - 0.05).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tuning_deserializes_with_field_defaults() {
        let yaml = "tick_interval_s: 1\ntime_multiplier: 60.0\n";
        let tuning: SimTuning = serde_yml::from_str(yaml).unwrap();
        assert_eq!(tuning.tick_interval_s, 1);
        assert!((tuning.time_multiplier - 60.0).abs() < f64::EPSILON);
        assert!((tuning.simulation_speed - 1.0).abs() < f64::EPSILON);
        assert_eq!(tuning.stats_interval_iterations, 12);
        assert!(tuning.validate().is_ok());
    }
}
