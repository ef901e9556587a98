//! Shared type definitions for the shopfloor telemetry simulation.
//!
//! This crate is the single source of truth for the value types that flow
//! between the simulation engine and the fleet producer: identifiers,
//! enumerations, and the telemetry records themselves.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for emitted record identifiers
//! - [`enums`] -- Enumeration types (phases, event kinds, defects, anomalies)
//! - [`records`] -- Telemetry records (events, readings, inspections, snapshots)

pub mod enums;
pub mod ids;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use enums::{AnomalyKind, DefectKind, MachineEventKind, MachinePhase, QualityVerdict, Shift};
pub use ids::{EventId, InspectionId, ReadingId};
pub use records::{DefectRecord, MachineEvent, MachineSnapshot, QualityEvent, SensorReading};
