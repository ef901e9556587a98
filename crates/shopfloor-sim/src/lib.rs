//! Machine lifecycle simulation engine for the shopfloor fleet.
//!
//! This crate owns everything that happens to one machine between two
//! ticks: phase transitions with dwell timing, probabilistic exits from
//! production, wear accrual, sensor synthesis, anomaly injection, and
//! quality inspection.
//!
//! # Modules
//!
//! - [`anomaly`] -- Anomaly injection and sensor-reading overlays.
//! - [`config`] -- Machine and tuning configuration with validation.
//! - [`machine`] -- [`MachineSimulator`], the per-machine tick engine.
//! - [`phase`] -- Phase transition graph and the dwell-timed state machine.
//! - [`sensor`] -- Phase-conditioned sensor reading synthesis.
//!
//! [`MachineSimulator`]: machine::MachineSimulator

pub mod anomaly;
pub mod config;
pub mod machine;
pub mod phase;
pub mod sensor;
