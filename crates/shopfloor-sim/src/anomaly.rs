//! Time-boxed anomaly injection over synthesized readings.
//!
//! At most one anomaly is active per machine. When none is active, each
//! pass may start one with the machine's configured failure-injection
//! rate; an active anomaly corrupts the tick's reading according to its
//! kind, burns down its remaining duration, and clears itself once the
//! duration is spent. Start and end are logged so labeled fault windows
//! can be recovered downstream.

use rand::Rng;
use tracing::info;

use shopfloor_types::{AnomalyKind, SensorReading};

use crate::config::MachineConfig;

/// Sampled duration range of one anomaly in simulated seconds.
const DURATION_RANGE_S: (f64, f64) = (30.0, 180.0);

/// An anomaly currently corrupting a machine's readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveAnomaly {
    /// Which corruption is applied.
    pub kind: AnomalyKind,
    /// Simulated seconds until the anomaly clears.
    pub remaining_seconds: f64,
}

/// Per-machine anomaly status.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnomalyState {
    active: Option<ActiveAnomaly>,
}

impl AnomalyState {
    /// Create a state with no anomaly active.
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Create a state with an anomaly already active (useful for testing
    /// and state restoration).
    pub const fn with_active(kind: AnomalyKind, remaining_seconds: f64) -> Self {
        Self { active: Some(ActiveAnomaly { kind, remaining_seconds }) }
    }

    /// Return whether an anomaly is currently active.
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Return the active anomaly, if any.
    pub const fn active(&self) -> Option<&ActiveAnomaly> {
        self.active.as_ref()
    }
}

/// What one anomaly pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnomalyTickResult {
    /// Anomaly started this pass, if any.
    pub started: Option<AnomalyKind>,
    /// Anomaly that ran out and cleared this pass, if any.
    pub ended: Option<AnomalyKind>,
}

/// Run one anomaly pass over a freshly synthesized reading.
///
/// Order of operations:
///
/// 1. If no anomaly is active, start one with probability
///    `config.failure_injection_rate`, picking a kind uniformly from
///    `kinds` and a duration uniformly from the 30--180 second range.
/// 2. If an anomaly is active (just started or continuing), overlay its
///    effect onto `reading`.
/// 3. Burn `elapsed` seconds off the remaining duration; at zero or
///    below, clear the anomaly.
///
/// A just-started anomaly therefore corrupts at least one reading even
/// when `elapsed` exceeds its whole duration.
pub fn apply_anomaly_tick(
    state: &mut AnomalyState,
    reading: &mut SensorReading,
    config: &MachineConfig,
    kinds: &[AnomalyKind],
    elapsed: f64,
    rng: &mut impl Rng,
) -> AnomalyTickResult {
    let mut result = AnomalyTickResult::default();

    if state.active.is_none()
        && !kinds.is_empty()
        && rng.random_bool(config.failure_injection_rate.clamp(0.0, 1.0))
    {
        let index = rng.random_range(0..kinds.len());
        if let Some(&kind) = kinds.get(index) {
            let (min, max) = DURATION_RANGE_S;
            let duration = rng.random_range(min..=max);
            state.active = Some(ActiveAnomaly { kind, remaining_seconds: duration });
            result.started = Some(kind);
            info!(
                machine_id = %config.machine_id,
                kind = ?kind,
                duration_s = duration,
                "Anomaly injected"
            );
        }
    }

    if let Some(anomaly) = state.active.as_mut() {
        apply_overlay(reading, anomaly.kind, config, rng);
        anomaly.remaining_seconds -= elapsed;
        if anomaly.remaining_seconds <= 0.0 {
            result.ended = Some(anomaly.kind);
        }
    }
    if let Some(kind) = result.ended {
        state.active = None;
        info!(machine_id = %config.machine_id, kind = ?kind, "Anomaly cleared");
    }

    result
}

/// Corrupt one reading according to the anomaly kind.
fn apply_overlay(
    reading: &mut SensorReading,
    kind: AnomalyKind,
    config: &MachineConfig,
    rng: &mut impl Rng,
) {
    match kind {
        AnomalyKind::TemperatureSpike => {
            reading.temperature_c = config.max_temperature_c * rng.random_range(1.05..=1.25);
        }
        AnomalyKind::VibrationAnomaly => {
            reading.vibration_mm_s = config.max_vibration_mm_s * rng.random_range(1.1..=1.5);
        }
        AnomalyKind::PressureDrop => {
            reading.pressure_bar = config.optimal_pressure_bar * rng.random_range(0.3..=0.6);
        }
        AnomalyKind::SpeedFluctuation => {
            let delta = rng.random_range(200..=500);
            reading.speed_rpm = if rng.random_bool(0.5) {
                reading.speed_rpm.saturating_add(delta)
            } else {
                reading.speed_rpm.saturating_sub(delta)
            };
        }
        AnomalyKind::PowerSurge => {
            reading.power_kw *= rng.random_range(1.5..=2.5);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use shopfloor_types::{ReadingId, Shift};

    use super::*;

    const ALL_KINDS: [AnomalyKind; 5] = [
        AnomalyKind::TemperatureSpike,
        AnomalyKind::VibrationAnomaly,
        AnomalyKind::PressureDrop,
        AnomalyKind::SpeedFluctuation,
        AnomalyKind::PowerSurge,
    ];

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
    }

    fn make_config(failure_injection_rate: f64) -> MachineConfig {
        MachineConfig {
            machine_id: String::from("machine_001"),
            machine_type: String::from("CNC_MILL"),
            rated_speed_rpm: 3000,
            cycle_time_s: 8.0,
            operator: String::from("operator_A"),
            shift: Shift::Day,
            max_temperature_c: 85.0,
            optimal_temperature_c: 65.0,
            max_vibration_mm_s: 5.0,
            optimal_vibration_mm_s: 1.5,
            max_pressure_bar: 8.0,
            optimal_pressure_bar: 6.5,
            failure_injection_rate,
        }
    }

    fn make_reading() -> SensorReading {
        SensorReading {
            reading_id: ReadingId::new(),
            machine_id: String::from("machine_001"),
            timestamp: t0(),
            temperature_c: 50.0,
            vibration_mm_s: 2.5,
            speed_rpm: 2850,
            pressure_bar: 6.0,
            power_kw: 15.0,
            operating_hours: 10.0,
        }
    }

    #[test]
    fn zero_rate_never_starts() {
        let config = make_config(0.0);
        let mut state = AnomalyState::new();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..1_000 {
            let mut reading = make_reading();
            let result = apply_anomaly_tick(
                &mut state,
                &mut reading,
                &config,
                &ALL_KINDS,
                5.0,
                &mut rng,
            );
            assert!(result.started.is_none());
            assert!(!state.is_active());
        }
    }

    #[test]
    fn unit_rate_starts_with_sampled_duration() {
        let config = make_config(1.0);
        let mut state = AnomalyState::new();
        let mut rng = SmallRng::seed_from_u64(2);
        let mut reading = make_reading();

        let result = apply_anomaly_tick(
            &mut state,
            &mut reading,
            &config,
            &ALL_KINDS,
            5.0,
            &mut rng,
        );
        assert!(result.started.is_some());
        assert!(state.is_active());

        let anomaly = state.active().unwrap();
        // One 5-second decrement already happened, so the remainder sits
        // inside the sampled 30..=180 window minus that.
        assert!(anomaly.remaining_seconds >= 25.0);
        assert!(anomaly.remaining_seconds <= 175.0);
    }

    #[test]
    fn anomaly_self_clears_once_duration_is_spent() {
        let inject = make_config(1.0);
        let quiet = make_config(0.0);
        let mut state = AnomalyState::new();
        let mut rng = SmallRng::seed_from_u64(3);

        let mut reading = make_reading();
        let started = apply_anomaly_tick(
            &mut state,
            &mut reading,
            &inject,
            &ALL_KINDS,
            50.0,
            &mut rng,
        );
        assert!(started.started.is_some());

        // Deterministic 50-second decrements with no new injection. The
        // duration is at most 180 seconds, so at most three more passes.
        let mut clears = 0;
        for _ in 0..4 {
            if !state.is_active() {
                break;
            }
            let mut next = make_reading();
            let result = apply_anomaly_tick(
                &mut state,
                &mut next,
                &quiet,
                &ALL_KINDS,
                50.0,
                &mut rng,
            );
            if result.ended.is_some() {
                clears += 1;
                assert!(!state.is_active());
            }
        }
        assert_eq!(clears, 1);
        assert!(!state.is_active());
    }

    #[test]
    fn temperature_spike_exceeds_the_maximum() {
        let config = make_config(0.0);
        let mut state = AnomalyState::with_active(AnomalyKind::TemperatureSpike, 100.0);
        let mut rng = SmallRng::seed_from_u64(4);
        let mut reading = make_reading();

        apply_anomaly_tick(&mut state, &mut reading, &config, &ALL_KINDS, 5.0, &mut rng);
        assert!(reading.temperature_c >= 85.0 * 1.05);
        assert!(reading.temperature_c <= 85.0 * 1.25);
    }

    #[test]
    fn pressure_drop_collapses_below_optimal() {
        let config = make_config(0.0);
        let mut state = AnomalyState::with_active(AnomalyKind::PressureDrop, 100.0);
        let mut rng = SmallRng::seed_from_u64(5);
        let mut reading = make_reading();

        apply_anomaly_tick(&mut state, &mut reading, &config, &ALL_KINDS, 5.0, &mut rng);
        assert!(reading.pressure_bar >= 6.5 * 0.3);
        assert!(reading.pressure_bar <= 6.5 * 0.6);
    }

    #[test]
    fn speed_fluctuation_shifts_rpm_without_underflow() {
        let config = make_config(0.0);
        let mut rng = SmallRng::seed_from_u64(6);
        for _ in 0..200 {
            let mut state = AnomalyState::with_active(AnomalyKind::SpeedFluctuation, 100.0);
            let mut reading = make_reading();
            reading.speed_rpm = 100;
            apply_anomaly_tick(&mut state, &mut reading, &config, &ALL_KINDS, 5.0, &mut rng);
            // Either bumped up by 200..=500 or floored at zero.
            assert!(reading.speed_rpm == 0 || reading.speed_rpm >= 300);
            assert!(reading.speed_rpm <= 600);
        }
    }

    #[test]
    fn power_surge_multiplies_draw() {
        let config = make_config(0.0);
        let mut state = AnomalyState::with_active(AnomalyKind::PowerSurge, 100.0);
        let mut rng = SmallRng::seed_from_u64(7);
        let mut reading = make_reading();

        apply_anomaly_tick(&mut state, &mut reading, &config, &ALL_KINDS, 5.0, &mut rng);
        assert!(reading.power_kw >= 15.0 * 1.5);
        assert!(reading.power_kw <= 15.0 * 2.5);
    }

    #[test]
    fn continuing_anomaly_does_not_report_start() {
        let config = make_config(0.0);
        let mut state = AnomalyState::with_active(AnomalyKind::VibrationAnomaly, 500.0);
        let mut rng = SmallRng::seed_from_u64(8);
        let mut reading = make_reading();

        let result =
            apply_anomaly_tick(&mut state, &mut reading, &config, &ALL_KINDS, 5.0, &mut rng);
        assert!(result.started.is_none());
        assert!(result.ended.is_none());
        assert!(state.is_active());
        assert!(reading.vibration_mm_s >= 5.0 * 1.1);
    }
}
