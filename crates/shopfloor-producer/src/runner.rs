//! Fleet simulation loop with bounded runs and shutdown handling.
//!
//! This module provides [`run_fleet`], the top-level async function that
//! drives the tick loop with support for:
//!
//! - **Bounded runs**: stop after `max_iterations` or `max_real_time_seconds`
//! - **Accelerated time**: simulated seconds per tick scale with the
//!   time multiplier, wall sleeps shrink with the simulation speed
//! - **Clean shutdown**: ctrl-c ends the run with final statistics
//!
//! The runner wraps [`MachineSimulator::tick`] and adds the control
//! plane around it; per-tick output goes to a [`TickSink`].

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::info;

use shopfloor_sim::config::SimTuning;
use shopfloor_sim::machine::{MachineSimulator, TickOutput};
use shopfloor_types::MachineSnapshot;

/// Limits on a fleet run; zero values mean unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct RunBounds {
    /// Stop after this many iterations.
    #[serde(default)]
    pub max_iterations: u64,
    /// Stop once this much wall time has elapsed.
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

/// The reason a fleet run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The configured iteration limit was reached.
    IterationLimit,
    /// The configured wall-time limit was reached.
    TimeLimit,
    /// The process received an interrupt signal.
    Interrupted,
}

/// Result of a fleet run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetRunResult {
    /// The reason the run ended.
    pub end_reason: RunEndReason,
    /// Total number of iterations executed.
    pub total_iterations: u64,
}

/// Receiver for per-tick output and periodic statistics.
///
/// Implementations render to the console, count for tests, or forward
/// records elsewhere. Called synchronously from the tick loop.
pub trait TickSink {
    /// Called after every iteration with each machine's output.
    fn on_tick(&mut self, now: DateTime<Utc>, outputs: &[TickOutput]);

    /// Called on the statistics cadence with fresh snapshots.
    fn on_stats(&mut self, iteration: u64, snapshots: &[MachineSnapshot]);

    /// Called exactly once when the run ends.
    fn on_end(&mut self, result: &FleetRunResult, snapshots: &[MachineSnapshot]);
}

/// Simulated wall clock advanced by a fixed step per iteration.
///
/// The step may exceed the real tick interval when time is accelerated;
/// every emitted record carries this clock's time, never the host's.
#[derive(Debug, Clone)]
pub struct SimClock {
    now: DateTime<Utc>,
    step: TimeDelta,
}

impl SimClock {
    /// Create a clock at `start` advancing `step_seconds` per call.
    ///
    /// A non-finite or negative step collapses to zero, which holds the
    /// clock in place.
    pub fn new(start: DateTime<Utc>, step_seconds: f64) -> Self {
        let step = Duration::try_from_secs_f64(step_seconds)
            .ok()
            .and_then(|duration| TimeDelta::from_std(duration).ok())
            .unwrap_or_else(TimeDelta::zero);
        Self { now: start, step }
    }

    /// Advance by one step and return the new time.
    ///
    /// Holds the current time if the addition would overflow the
    /// representable range.
    pub fn advance(&mut self) -> DateTime<Utc> {
        if let Some(next) = self.now.checked_add_signed(self.step) {
            self.now = next;
        }
        self.now
    }
}

/// Run the fleet tick loop until a termination condition is met.
///
/// Every iteration advances the simulated clock by one step, ticks each
/// machine with the same timestamp, and hands the outputs to `sink`.
/// Statistics snapshots go out every `stats_interval_iterations`. The
/// sink's `on_end` fires on every exit path.
pub async fn run_fleet(
    fleet: &mut [MachineSimulator],
    tuning: &SimTuning,
    bounds: &RunBounds,
    sink: &mut dyn TickSink,
) -> FleetRunResult {
    // Safe: tick intervals are small integers, far below 2^52.
    #[allow(clippy::cast_precision_loss)]
    let interval_s = tuning.tick_interval_s as f64;
    let step_seconds = interval_s * tuning.time_multiplier;
    let wall_interval = Duration::try_from_secs_f64(interval_s / tuning.simulation_speed)
        .unwrap_or_else(|_| Duration::from_secs(tuning.tick_interval_s));

    let mut clock = SimClock::new(Utc::now(), step_seconds);
    let started = Instant::now();
    let mut iteration: u64 = 0;

    info!(
        machines = fleet.len(),
        tick_interval_s = tuning.tick_interval_s,
        time_multiplier = tuning.time_multiplier,
        simulation_speed = tuning.simulation_speed,
        max_iterations = bounds.max_iterations,
        max_real_time_seconds = bounds.max_real_time_seconds,
        "Fleet simulation starting"
    );

    let end_reason = loop {
        // --- Check wall-time limit (before tick) ---
        if bounds.max_real_time_seconds > 0
            && started.elapsed().as_secs() >= bounds.max_real_time_seconds
        {
            info!(max_seconds = bounds.max_real_time_seconds, "Wall-time limit reached");
            break RunEndReason::TimeLimit;
        }

        // --- Advance simulated time and tick every machine ---
        let now = clock.advance();
        let outputs: Vec<TickOutput> =
            fleet.iter_mut().map(|machine| machine.tick(now, step_seconds)).collect();
        sink.on_tick(now, &outputs);

        // --- Periodic statistics ---
        if iteration.checked_rem(tuning.stats_interval_iterations) == Some(0) {
            let snapshots: Vec<MachineSnapshot> =
                fleet.iter().map(MachineSimulator::snapshot).collect();
            sink.on_stats(iteration, &snapshots);
        }

        iteration = iteration.saturating_add(1);

        // --- Check iteration limit (after tick) ---
        if bounds.max_iterations > 0 && iteration >= bounds.max_iterations {
            info!(iterations = iteration, "Iteration limit reached");
            break RunEndReason::IterationLimit;
        }

        // --- Sleep until the next tick, watching for an interrupt ---
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break RunEndReason::Interrupted;
            }
            () = tokio::time::sleep(wall_interval) => {}
        }
    };

    let result = FleetRunResult { end_reason, total_iterations: iteration };
    let snapshots: Vec<MachineSnapshot> =
        fleet.iter().map(MachineSimulator::snapshot).collect();
    sink.on_end(&result, &snapshots);
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeZone;

    use shopfloor_sim::config::MachineConfig;
    use shopfloor_types::Shift;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
    }

    fn make_config(machine_id: &str) -> MachineConfig {
        MachineConfig {
            machine_id: machine_id.to_owned(),
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
            failure_injection_rate: 0.0,
        }
    }

    /// Tuning with near-zero wall sleeps so loop tests finish instantly.
    fn fast_tuning() -> SimTuning {
        SimTuning { simulation_speed: 1_000_000.0, ..SimTuning::default() }
    }

    fn make_fleet(count: usize) -> Vec<MachineSimulator> {
        (0..count)
            .map(|index| {
                let config = make_config(&format!("machine_{index:03}"));
                let seed = u64::try_from(index).unwrap();
                MachineSimulator::new(config, fast_tuning(), t0(), seed).unwrap()
            })
            .collect()
    }

    #[derive(Default)]
    struct CountingSink {
        ticks: u64,
        stats: u64,
        last_output_count: usize,
        ended: bool,
    }

    impl TickSink for CountingSink {
        fn on_tick(&mut self, _now: DateTime<Utc>, outputs: &[TickOutput]) {
            self.ticks += 1;
            self.last_output_count = outputs.len();
        }

        fn on_stats(&mut self, _iteration: u64, _snapshots: &[MachineSnapshot]) {
            self.stats += 1;
        }

        fn on_end(&mut self, _result: &FleetRunResult, _snapshots: &[MachineSnapshot]) {
            self.ended = true;
        }
    }

    #[tokio::test]
    async fn bounded_by_max_iterations() {
        let mut fleet = make_fleet(2);
        let bounds = RunBounds { max_iterations: 5, max_real_time_seconds: 0 };
        let mut sink = CountingSink::default();

        let result = run_fleet(&mut fleet, &fast_tuning(), &bounds, &mut sink).await;

        assert_eq!(result.end_reason, RunEndReason::IterationLimit);
        assert_eq!(result.total_iterations, 5);
        assert_eq!(sink.ticks, 5);
        assert!(sink.ended);
    }

    #[tokio::test]
    async fn sink_sees_one_output_per_machine() {
        let mut fleet = make_fleet(3);
        let bounds = RunBounds { max_iterations: 1, max_real_time_seconds: 0 };
        let mut sink = CountingSink::default();

        run_fleet(&mut fleet, &fast_tuning(), &bounds, &mut sink).await;

        assert_eq!(sink.last_output_count, 3);
    }

    #[tokio::test]
    async fn stats_follow_the_configured_cadence() {
        let mut fleet = make_fleet(1);
        let tuning = SimTuning { stats_interval_iterations: 2, ..fast_tuning() };
        let bounds = RunBounds { max_iterations: 5, max_real_time_seconds: 0 };
        let mut sink = CountingSink::default();

        run_fleet(&mut fleet, &tuning, &bounds, &mut sink).await;

        // Iterations 0, 2, and 4 hit the cadence.
        assert_eq!(sink.stats, 3);
    }

    #[test]
    fn sim_clock_advances_by_fixed_step() {
        let mut clock = SimClock::new(t0(), 5.0);
        let first = clock.advance();
        assert_eq!(first, t0().checked_add_signed(TimeDelta::seconds(5)).unwrap());
        let second = clock.advance();
        assert_eq!(second, t0().checked_add_signed(TimeDelta::seconds(10)).unwrap());
    }

    #[test]
    fn zero_step_clock_holds_time() {
        let mut clock = SimClock::new(t0(), 0.0);
        assert_eq!(clock.advance(), t0());
    }

    #[test]
    fn default_bounds_are_unbounded() {
        let bounds = RunBounds::default();
        assert_eq!(bounds.max_iterations, 0);
        assert_eq!(bounds.max_real_time_seconds, 0);
    }
}
