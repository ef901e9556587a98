//! Telemetry record structs emitted by the simulation.
//!
//! Covers `MachineEvent`, `SensorReading`, `QualityEvent`, and
//! `MachineSnapshot`. All records are immutable once emitted and plain
//! serde-serializable; wire encoding is the consumer's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{DefectKind, MachineEventKind, MachinePhase, QualityVerdict, Shift};
use crate::ids::{EventId, InspectionId, ReadingId};

// ---------------------------------------------------------------------------
// Lifecycle events
// ---------------------------------------------------------------------------

/// A lifecycle event: a phase transition or a completed production cycle.
///
/// At most one is emitted per machine per tick. For
/// [`MachineEventKind::CycleComplete`] events `previous_phase` is `None`
/// and `phase` is the phase the cycle completed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineEvent {
    /// Unique identifier of this event.
    pub event_id: EventId,
    /// Identifier of the emitting machine.
    pub machine_id: String,
    /// Simulated time the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Whether this is a status change or a cycle completion.
    pub kind: MachineEventKind,
    /// Phase the machine left, for status changes.
    pub previous_phase: Option<MachinePhase>,
    /// Phase the machine is in after the event.
    pub phase: MachinePhase,
    /// Human-readable cause of the event.
    pub reason: String,
    /// Current-batch cycle count at emission time.
    pub cycle_count: u64,
    /// Shift the machine was staffed on.
    pub shift: Shift,
    /// Operator label attached to the machine.
    pub operator: String,
}

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

/// A point-in-time sensor vector, produced fresh every tick.
///
/// Values are never mutated after emission except by the anomaly overlay
/// step within the same tick that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Unique identifier of this reading.
    pub reading_id: ReadingId,
    /// Identifier of the emitting machine.
    pub machine_id: String,
    /// Simulated time the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Spindle or chamber temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Vibration amplitude in millimeters per second.
    pub vibration_mm_s: f64,
    /// Rotational speed in revolutions per minute.
    pub speed_rpm: u32,
    /// Hydraulic or pneumatic pressure in bar.
    pub pressure_bar: f64,
    /// Electrical power draw in kilowatts.
    pub power_kw: f64,
    /// Cumulative operating hours since last maintenance.
    pub operating_hours: f64,
}

// ---------------------------------------------------------------------------
// Quality inspections
// ---------------------------------------------------------------------------

/// The defect found by a failed inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectRecord {
    /// Category of the defect.
    pub kind: DefectKind,
    /// Severity on a 1 (cosmetic) to 5 (scrap) scale.
    pub severity: u8,
}

impl DefectRecord {
    /// Create a defect record, clamping `severity` to the 1--5 scale.
    pub const fn new(kind: DefectKind, severity: u8) -> Self {
        Self { kind, severity: clamp_severity(severity) }
    }
}

/// The outcome of one quality inspection of a produced unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityEvent {
    /// Unique identifier of this inspection.
    pub inspection_id: InspectionId,
    /// Identifier of the inspected machine.
    pub machine_id: String,
    /// Simulated time of the inspection.
    pub timestamp: DateTime<Utc>,
    /// Whether the unit passed or failed.
    pub verdict: QualityVerdict,
    /// The defect found, present iff the verdict is [`QualityVerdict::Defective`].
    pub defect: Option<DefectRecord>,
    /// Label of the inspector who performed the check.
    pub inspector: String,
    /// Hourly batch the inspected unit belongs to.
    pub batch: String,
}

impl QualityEvent {
    /// Create a passing inspection record.
    pub fn conforming(
        machine_id: String,
        timestamp: DateTime<Utc>,
        inspector: String,
        batch: String,
    ) -> Self {
        Self {
            inspection_id: InspectionId::new(),
            machine_id,
            timestamp,
            verdict: QualityVerdict::Conforming,
            defect: None,
            inspector,
            batch,
        }
    }

    /// Create a failing inspection record with the detected defect.
    pub fn defective(
        machine_id: String,
        timestamp: DateTime<Utc>,
        defect: DefectRecord,
        inspector: String,
        batch: String,
    ) -> Self {
        Self {
            inspection_id: InspectionId::new(),
            machine_id,
            timestamp,
            verdict: QualityVerdict::Defective,
            defect: Some(defect),
            inspector,
            batch,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only statistics for one machine at a point in time.
///
/// Snapshots are value copies; taking one never mutates the machine, so
/// two snapshots without an intervening tick are identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Identifier of the machine.
    pub machine_id: String,
    /// Current operational phase.
    pub phase: MachinePhase,
    /// Production cycles completed over the machine's lifetime.
    pub lifetime_cycles: u64,
    /// Units that passed inspection.
    pub good_parts: u64,
    /// Units that failed inspection.
    pub bad_parts: u64,
    /// Percentage of inspected units that passed; 100.0 before any inspection.
    pub quality_rate: f64,
    /// Operating hours accrued since last maintenance.
    pub operating_hours: f64,
    /// Wear factor expressed as a percentage.
    pub wear_percent: f64,
}

/// Clamp an inspection severity to the 1--5 scale.
const fn clamp_severity(severity: u8) -> u8 {
    match severity {
        0 => 1,
        1..=5 => severity,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defect_severity_is_clamped() {
        let low = DefectRecord::new(DefectKind::Surface, 0);
        let high = DefectRecord::new(DefectKind::Material, 9);
        let in_range = DefectRecord::new(DefectKind::Dimensional, 3);
        assert_eq!(low.severity, 1);
        assert_eq!(high.severity, 5);
        assert_eq!(in_range.severity, 3);
    }

    #[test]
    fn defective_event_carries_defect() {
        let event = QualityEvent::defective(
            String::from("machine_001"),
            Utc::now(),
            DefectRecord::new(DefectKind::Assembly, 4),
            String::from("inspector_2"),
            String::from("batch_100"),
        );
        assert_eq!(event.verdict, QualityVerdict::Defective);
        assert_eq!(
            event.defect,
            Some(DefectRecord { kind: DefectKind::Assembly, severity: 4 })
        );
    }

    #[test]
    fn conforming_event_has_no_defect() {
        let event = QualityEvent::conforming(
            String::from("machine_001"),
            Utc::now(),
            String::from("inspector_1"),
            String::from("batch_100"),
        );
        assert_eq!(event.verdict, QualityVerdict::Conforming);
        assert!(event.defect.is_none());
    }

    #[test]
    fn records_roundtrip_serde() {
        let snapshot = MachineSnapshot {
            machine_id: String::from("machine_001"),
            phase: MachinePhase::Idle,
            lifetime_cycles: 0,
            good_parts: 0,
            bad_parts: 0,
            quality_rate: 100.0,
            operating_hours: 0.0,
            wear_percent: 0.0,
        };
        let json = serde_json::to_string(&snapshot).ok();
        assert!(json.is_some());
        let restored: Result<MachineSnapshot, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }
}
