//! Phase-conditioned sensor synthesis.
//!
//! Every tick produces one fresh [`SensorReading`] whose values depend on
//! the machine's current phase, its progress through that phase, and its
//! accumulated wear. Warmup and Cooldown interpolate between cold and
//! working values using phase progress; Running drifts upward with wear;
//! downtime and Maintenance sit near ambient levels. All noise terms are
//! uniform draws from the machine's own random stream.

use chrono::{DateTime, Utc};
use rand::Rng;

use shopfloor_types::{MachinePhase, ReadingId, SensorReading};

use crate::config::MachineConfig;

/// Working-baseline temperature in degrees Celsius.
const BASE_TEMPERATURE_C: f64 = 45.0;

/// Working-baseline vibration in mm/s.
const BASE_VIBRATION_MM_S: f64 = 2.5;

/// Working-baseline pressure in bar.
const BASE_PRESSURE_BAR: f64 = 6.0;

/// Machine state entering one reading synthesis, captured by the simulator.
#[derive(Debug, Clone, Copy)]
pub struct SensorContext {
    /// Current operational phase.
    pub phase: MachinePhase,
    /// Completion of the current phase sojourn in [0, 1].
    pub progress: f64,
    /// Wear factor in [0, 1].
    pub wear: f64,
    /// Operating hours accrued since last maintenance.
    pub operating_hours: f64,
}

/// Raw five-channel vector before it is packed into a record.
struct RawVector {
    temperature: f64,
    vibration: f64,
    speed: f64,
    pressure: f64,
    power: f64,
}

/// Synthesize one sensor reading for the given machine state.
pub fn synthesize_reading(
    config: &MachineConfig,
    ctx: SensorContext,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> SensorReading {
    let raw = raw_vector(config, ctx, rng);

    // Safe: every speed formula scales the rated speed by a factor in
    // [0, 1], keeping the value non-negative and far below u32::MAX.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let speed_rpm = raw.speed.max(0.0) as u32;

    SensorReading {
        reading_id: ReadingId::new(),
        machine_id: config.machine_id.clone(),
        timestamp: now,
        temperature_c: raw.temperature,
        vibration_mm_s: raw.vibration,
        speed_rpm,
        pressure_bar: raw.pressure,
        power_kw: raw.power,
        operating_hours: ctx.operating_hours,
    }
}

fn raw_vector(config: &MachineConfig, ctx: SensorContext, rng: &mut impl Rng) -> RawVector {
    let rated = f64::from(config.rated_speed_rpm);
    let progress = ctx.progress;

    match ctx.phase {
        MachinePhase::Idle => RawVector {
            temperature: BASE_TEMPERATURE_C + noise(rng, 2.0),
            vibration: rng.random_range(0.1..=0.5),
            speed: 0.0,
            pressure: rng.random_range(0.0..=1.0),
            power: rng.random_range(0.5..=2.0),
        },
        // Warmup climbs from half-cold toward working values.
        MachinePhase::Warmup => RawVector {
            temperature: BASE_TEMPERATURE_C * (0.5 + 0.5 * progress) + noise(rng, 3.0),
            vibration: 1.0 + 1.5 * progress + noise(rng, 0.3),
            speed: rated * progress * 0.5,
            pressure: BASE_PRESSURE_BAR * (0.3 + 0.7 * progress),
            power: 5.0 + 10.0 * progress,
        },
        // Running drifts upward as wear accumulates.
        MachinePhase::Running => RawVector {
            temperature: BASE_TEMPERATURE_C * (1.0 + ctx.wear * 0.2)
                + rng.random_range(-5.0..=8.0),
            vibration: BASE_VIBRATION_MM_S * (1.0 + ctx.wear * 0.5) + noise(rng, 0.5),
            speed: rated * rng.random_range(0.90..=0.98),
            pressure: BASE_PRESSURE_BAR + noise(rng, 0.5),
            power: 15.0 + rng.random_range(-3.0..=5.0),
        },
        MachinePhase::Setup => RawVector {
            temperature: BASE_TEMPERATURE_C * 0.8 + noise(rng, 2.0),
            vibration: rng.random_range(0.5..=2.0),
            speed: rated * rng.random_range(0.0..=0.3),
            pressure: BASE_PRESSURE_BAR * 0.5,
            power: rng.random_range(3.0..=8.0),
        },
        MachinePhase::PlannedDowntime | MachinePhase::UnplannedDowntime => RawVector {
            temperature: BASE_TEMPERATURE_C * 0.6 + rng.random_range(-5.0..=0.0),
            vibration: rng.random_range(0.0..=0.2),
            speed: 0.0,
            pressure: rng.random_range(0.0..=1.0),
            power: rng.random_range(0.2..=1.0),
        },
        // Maintenance readings sit at ambient, independent of the baseline.
        MachinePhase::Maintenance => RawVector {
            temperature: 25.0 + noise(rng, 2.0),
            vibration: rng.random_range(0.0..=0.1),
            speed: 0.0,
            pressure: 0.0,
            power: rng.random_range(0.0..=0.5),
        },
        // Cooldown unwinds from working values back toward idle.
        MachinePhase::Cooldown => RawVector {
            temperature: BASE_TEMPERATURE_C * (1.0 - 0.5 * progress) + noise(rng, 3.0),
            vibration: (1.0 - progress) * 2.0 + rng.random_range(0.0..=0.2),
            speed: rated * (1.0 - progress) * 0.3,
            pressure: BASE_PRESSURE_BAR * (1.0 - 0.7 * progress),
            power: 5.0 * (1.0 - progress),
        },
    }
}

/// Draw symmetric uniform noise in `[-span, span]`.
fn noise(rng: &mut impl Rng, span: f64) -> f64 {
    rng.random_range(-span..=span)
}
