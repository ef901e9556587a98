//! Enumeration types for the shopfloor telemetry simulation.
//!
//! Closed variant sets shared by the simulation engine and the fleet
//! producer: operational phases, event kinds, quality outcomes, anomaly
//! kinds, and shift labels.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Machine phases
// ---------------------------------------------------------------------------

/// One discrete operational mode of a machine.
///
/// Exactly one phase is current per machine at any time. Legal movement
/// between phases is owned by the engine's transition graph; this type is
/// only the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MachinePhase {
    /// Powered on but not producing; the usual startup phase.
    Idle,
    /// Spinning up toward rated speed and operating temperature.
    Warmup,
    /// Producing parts at rated speed.
    Running,
    /// Tool change or job changeover between production runs.
    Setup,
    /// Scheduled break (shift pause, operator meal).
    PlannedDowntime,
    /// Unexpected failure; production halted until repair.
    UnplannedDowntime,
    /// Preventive or corrective maintenance in progress.
    Maintenance,
    /// Spinning down at the end of a production run.
    Cooldown,
}

// ---------------------------------------------------------------------------
// Lifecycle event kinds
// ---------------------------------------------------------------------------

/// The kind of lifecycle event a machine emitted on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MachineEventKind {
    /// The machine moved from one phase to another.
    StatusChange,
    /// A production cycle finished while Running.
    CycleComplete,
}

// ---------------------------------------------------------------------------
// Quality inspection outcomes
// ---------------------------------------------------------------------------

/// The verdict of a single quality inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityVerdict {
    /// The inspected unit is within tolerance.
    Conforming,
    /// The inspected unit failed inspection.
    Defective,
}

/// The category of a detected defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DefectKind {
    /// Out-of-tolerance geometry.
    Dimensional,
    /// Scratches, burrs, or finish flaws.
    Surface,
    /// Raw-material flaw (inclusions, porosity).
    Material,
    /// Mis-assembled or missing component.
    Assembly,
}

// ---------------------------------------------------------------------------
// Injected anomaly kinds
// ---------------------------------------------------------------------------

/// A kind of sensor anomaly the engine can inject.
///
/// Anomalies are time-boxed overlays on otherwise healthy readings, emitted
/// so downstream detection models have labeled fault windows to train on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// Temperature pushed above the configured maximum.
    TemperatureSpike,
    /// Vibration pushed above the configured maximum.
    VibrationAnomaly,
    /// Pressure collapsing well below optimal.
    PressureDrop,
    /// Rotational speed jumping by hundreds of rpm in either direction.
    SpeedFluctuation,
    /// Power draw multiplied beyond normal load.
    PowerSurge,
}

// ---------------------------------------------------------------------------
// Shifts
// ---------------------------------------------------------------------------

/// The work shift a machine is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Shift {
    /// Daytime crew.
    Day,
    /// Nighttime crew.
    Night,
}
