//! Machine lifecycle simulator.
//!
//! One [`MachineSimulator`] owns one machine's mutable state: its phase
//! state machine, wear and operating hours, cycle and part counters, and
//! anomaly status. [`MachineSimulator::tick`] is the sole entry point,
//! called once per machine per interval.
//!
//! # Order of operations per tick
//!
//! 1. Advance the phase machine; if nothing moved and the machine was
//!    Running, roll the probabilistic exits (unplanned failure, planned
//!    downtime, setup), first success wins.
//! 2. Convert a transition into a status-change event.
//! 3. While Running, accrue operating hours, recompute wear, and roll for
//!    a completed cycle (which may emit a cycle event and trigger a
//!    quality inspection).
//! 4. Synthesize the tick's sensor reading.
//! 5. Run the anomaly pass over the reading, when injection is enabled.
//! 6. At wear 0.95 or above while Running, nudge the machine toward
//!    Cooldown so maintenance can follow.
//!
//! Nothing in the tick path is fatal: rejected transitions are silent
//! no-ops and absent events are `None`.

use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use shopfloor_types::{
    DefectKind, DefectRecord, EventId, MachineEvent, MachineEventKind, MachinePhase,
    MachineSnapshot, QualityEvent, SensorReading,
};

use crate::anomaly::{AnomalyState, apply_anomaly_tick};
use crate::config::{ConfigError, MachineConfig, SimTuning};
use crate::phase::PhaseMachine;
use crate::sensor::{SensorContext, synthesize_reading};

/// Per-tick probability of a tool change while Running.
const SETUP_PROBABILITY: f64 = 0.05;

/// Probability that a completed cycle emits a cycle event.
const CYCLE_EVENT_PROBABILITY: f64 = 0.3;

/// Defect probability of a machine with no wear.
const BASE_DEFECT_PROBABILITY: f64 = 0.05;

/// Additional defect probability at full wear.
const WEAR_DEFECT_GAIN: f64 = 0.15;

/// Failure probability multiplier gained per unit of wear.
const WEAR_FAILURE_GAIN: f64 = 3.0;

/// Wear at which the machine is steered toward maintenance.
const WEAR_MAINTENANCE_THRESHOLD: f64 = 0.95;

/// Number of inspectors quality checks are attributed to.
const INSPECTOR_COUNT: u32 = 5;

const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Everything one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    /// Lifecycle event, at most one per tick.
    pub event: Option<MachineEvent>,
    /// Sensor reading, produced every tick.
    pub reading: SensorReading,
    /// Quality inspection outcome, at most one per tick.
    pub quality: Option<QualityEvent>,
}

/// Simulates one machine's operational lifecycle.
///
/// Instances share no state; a fleet of simulators may be ticked from
/// independent tasks as long as each instance is driven by one caller at
/// a time. All randomness comes from an owned seedable stream, so equal
/// seeds and inputs reproduce equal behavior.
#[derive(Debug, Clone)]
pub struct MachineSimulator {
    config: MachineConfig,
    tuning: SimTuning,
    machine: PhaseMachine,
    rng: SmallRng,
    operating_hours: f64,
    wear: f64,
    cycle_count: u64,
    total_cycles: u64,
    good_parts: u64,
    bad_parts: u64,
    anomaly: AnomalyState,
}

impl MachineSimulator {
    /// Create a simulator in Idle with all counters at zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMachine`] or
    /// [`ConfigError::InvalidTuning`] when either input fails validation;
    /// the tick path assumes validated values.
    pub fn new(
        config: MachineConfig,
        tuning: SimTuning,
        start: DateTime<Utc>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        tuning.validate()?;
        let mut rng = SmallRng::seed_from_u64(seed);
        let machine = PhaseMachine::new(MachinePhase::Idle, start, &mut rng);
        info!(
            machine_id = %config.machine_id,
            machine_type = %config.machine_type,
            seed,
            "Machine simulator created"
        );
        Ok(Self {
            config,
            tuning,
            machine,
            rng,
            operating_hours: 0.0,
            wear: 0.0,
            cycle_count: 0,
            total_cycles: 0,
            good_parts: 0,
            bad_parts: 0,
            anomaly: AnomalyState::new(),
        })
    }

    /// Advance the machine by `elapsed` simulated seconds.
    ///
    /// `now` is the simulated timestamp stamped onto every record this
    /// tick emits. Never fails; see the module docs for the order of
    /// operations.
    pub fn tick(&mut self, now: DateTime<Utc>, elapsed: f64) -> TickOutput {
        let previous = self.machine.phase();

        // 1. Automatic exit first, probabilistic exits out of Running
        //    only when nothing moved on its own.
        let mut transitioned = self.machine.advance(now, elapsed, &mut self.rng);
        if transitioned.is_none() && previous == MachinePhase::Running {
            transitioned = self.roll_running_exit(now);
        }

        // 2. One status-change event per transition.
        let mut event =
            transitioned.map(|next| self.status_change_event(previous, next, now));

        // 3. Production accrual in the (possibly just-entered) Running phase.
        let mut quality = None;
        if self.machine.phase() == MachinePhase::Running {
            self.operating_hours += elapsed / SECONDS_PER_HOUR;
            self.wear =
                (self.operating_hours / self.tuning.maintenance_interval_hours).min(1.0);

            let cycle_probability = (elapsed / self.config.cycle_time_s).clamp(0.0, 1.0);
            if self.rng.random_bool(cycle_probability) {
                self.cycle_count = self.cycle_count.saturating_add(1);
                self.total_cycles = self.total_cycles.saturating_add(1);
                debug!(
                    machine_id = %self.config.machine_id,
                    cycle = self.total_cycles,
                    "Cycle completed"
                );
                if event.is_none() && self.rng.random_bool(CYCLE_EVENT_PROBABILITY) {
                    event = Some(self.cycle_event(now));
                }
                if self.rng.random_bool(self.tuning.quality_check_probability) {
                    quality = Some(self.inspect(now));
                }
            }
        }

        // 4. Sensor reading, every tick.
        let context = SensorContext {
            phase: self.machine.phase(),
            progress: self.machine.progress(),
            wear: self.wear,
            operating_hours: self.operating_hours,
        };
        let mut reading = synthesize_reading(&self.config, context, now, &mut self.rng);

        // 5. Anomaly pass over the fresh reading.
        if self.tuning.anomaly_injection_enabled {
            apply_anomaly_tick(
                &mut self.anomaly,
                &mut reading,
                &self.config,
                &self.tuning.anomaly_kinds,
                elapsed,
                &mut self.rng,
            );
        }

        // 6. Steer a worn-out machine toward maintenance.
        self.nudge_maintenance(now);

        TickOutput { event, reading, quality }
    }

    /// Perform maintenance now: zero wear and operating hours and force
    /// the phase to Maintenance, bypassing the transition graph.
    ///
    /// Administrative override; emits no lifecycle event.
    pub fn force_maintenance(&mut self, now: DateTime<Utc>) {
        self.operating_hours = 0.0;
        self.wear = 0.0;
        if self.machine.phase() != MachinePhase::Maintenance {
            self.machine.force(MachinePhase::Maintenance, now, &mut self.rng);
        }
        info!(machine_id = %self.config.machine_id, "Maintenance performed");
    }

    /// Return the machine's statistics at this instant.
    ///
    /// Pure read; two snapshots without an intervening [`Self::tick`] are
    /// identical.
    pub fn snapshot(&self) -> MachineSnapshot {
        let inspected = self.good_parts.saturating_add(self.bad_parts);
        // Safe: part counters stay far below 2^52, so the conversions
        // are exact.
        #[allow(clippy::cast_precision_loss)]
        let quality_rate = if inspected == 0 {
            100.0
        } else {
            self.good_parts as f64 / inspected as f64 * 100.0
        };
        MachineSnapshot {
            machine_id: self.config.machine_id.clone(),
            phase: self.machine.phase(),
            lifetime_cycles: self.total_cycles,
            good_parts: self.good_parts,
            bad_parts: self.bad_parts,
            quality_rate,
            operating_hours: self.operating_hours,
            wear_percent: self.wear * 100.0,
        }
    }

    /// Return the current operational phase.
    pub const fn phase(&self) -> MachinePhase {
        self.machine.phase()
    }

    /// Return the current wear factor in [0, 1].
    pub const fn wear(&self) -> f64 {
        self.wear
    }

    /// Return whether an injected anomaly is currently corrupting readings.
    pub const fn anomaly_active(&self) -> bool {
        self.anomaly.is_active()
    }

    /// Return the machine identifier.
    pub fn machine_id(&self) -> &str {
        &self.config.machine_id
    }

    /// Return the machine's configuration.
    pub const fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Roll the probabilistic exits from Running, in priority order.
    ///
    /// Unplanned failure is checked first (scaled up with wear), then
    /// planned downtime, then setup. The first roll that succeeds and
    /// passes the transition graph wins; at most one exit per tick.
    fn roll_running_exit(&mut self, now: DateTime<Utc>) -> Option<MachinePhase> {
        let failure_probability = (self.tuning.unplanned_failure_base_probability
            * (1.0 + self.wear * WEAR_FAILURE_GAIN))
            .clamp(0.0, 1.0);
        if self.rng.random_bool(failure_probability)
            && self.machine.transition(MachinePhase::UnplannedDowntime, now, &mut self.rng)
        {
            return Some(MachinePhase::UnplannedDowntime);
        }
        if self.rng.random_bool(self.tuning.planned_downtime_probability)
            && self.machine.transition(MachinePhase::PlannedDowntime, now, &mut self.rng)
        {
            return Some(MachinePhase::PlannedDowntime);
        }
        if self.rng.random_bool(SETUP_PROBABILITY)
            && self.machine.transition(MachinePhase::Setup, now, &mut self.rng)
        {
            return Some(MachinePhase::Setup);
        }
        None
    }

    fn status_change_event(
        &self,
        previous: MachinePhase,
        next: MachinePhase,
        now: DateTime<Utc>,
    ) -> MachineEvent {
        let reason = transition_reason(previous, next);
        info!(
            machine_id = %self.config.machine_id,
            previous = ?previous,
            new = ?next,
            reason = %reason,
            "Machine changed phase"
        );
        MachineEvent {
            event_id: EventId::new(),
            machine_id: self.config.machine_id.clone(),
            timestamp: now,
            kind: MachineEventKind::StatusChange,
            previous_phase: Some(previous),
            phase: next,
            reason,
            cycle_count: self.cycle_count,
            shift: self.config.shift,
            operator: self.config.operator.clone(),
        }
    }

    fn cycle_event(&self, now: DateTime<Utc>) -> MachineEvent {
        MachineEvent {
            event_id: EventId::new(),
            machine_id: self.config.machine_id.clone(),
            timestamp: now,
            kind: MachineEventKind::CycleComplete,
            previous_phase: None,
            phase: self.machine.phase(),
            reason: String::from("Production cycle completed"),
            cycle_count: self.cycle_count,
            shift: self.config.shift,
            operator: self.config.operator.clone(),
        }
    }

    /// Inspect one produced unit and update the part counters.
    ///
    /// Defect probability grows linearly with wear from 5% on a fresh
    /// machine to 20% at full wear.
    fn inspect(&mut self, now: DateTime<Utc>) -> QualityEvent {
        let defect_probability =
            (BASE_DEFECT_PROBABILITY + self.wear * WEAR_DEFECT_GAIN).clamp(0.0, 1.0);
        let inspector =
            format!("inspector_{}", self.rng.random_range(1..=INSPECTOR_COUNT));
        // Units produced in the same simulated hour share a batch label.
        let batch = format!("batch_{}", now.timestamp().checked_div(3600).unwrap_or(0));

        if self.rng.random_bool(defect_probability) {
            self.bad_parts = self.bad_parts.saturating_add(1);
            let defect = DefectRecord::new(
                random_defect_kind(&mut self.rng),
                self.rng.random_range(1_u8..=5),
            );
            QualityEvent::defective(
                self.config.machine_id.clone(),
                now,
                defect,
                inspector,
                batch,
            )
        } else {
            self.good_parts = self.good_parts.saturating_add(1);
            QualityEvent::conforming(self.config.machine_id.clone(), now, inspector, batch)
        }
    }

    /// Attempt Running -> Cooldown once wear crosses the threshold.
    ///
    /// Best-effort: when the graph rejects the move nothing happens and
    /// the machine keeps producing until a later tick succeeds.
    fn nudge_maintenance(&mut self, now: DateTime<Utc>) {
        if self.wear < WEAR_MAINTENANCE_THRESHOLD
            || self.machine.phase() != MachinePhase::Running
        {
            return;
        }
        if self.machine.transition(MachinePhase::Cooldown, now, &mut self.rng) {
            info!(
                machine_id = %self.config.machine_id,
                wear = self.wear,
                "Wear limit reached, winding down toward maintenance"
            );
        } else {
            debug!(machine_id = %self.config.machine_id, "Maintenance nudge rejected");
        }
    }
}

/// Look up the operator-facing reason for a phase transition.
///
/// Unlisted pairs fall back to a generic description.
pub fn transition_reason(previous: MachinePhase, next: MachinePhase) -> String {
    match (previous, next) {
        (MachinePhase::Idle, MachinePhase::Warmup) => {
            String::from("Starting production shift")
        }
        (MachinePhase::Warmup, MachinePhase::Running) => {
            String::from("Machine ready for production")
        }
        (MachinePhase::Running, MachinePhase::Setup) => String::from("Tool change required"),
        (MachinePhase::Running, MachinePhase::PlannedDowntime) => {
            String::from("Scheduled break")
        }
        (MachinePhase::Running, MachinePhase::UnplannedDowntime) => {
            String::from("Unexpected failure")
        }
        (MachinePhase::Running, MachinePhase::Maintenance) => {
            String::from("Preventive maintenance")
        }
        (MachinePhase::Running, MachinePhase::Cooldown) => String::from("End of shift"),
        (MachinePhase::Setup, MachinePhase::Running) => String::from("Setup completed"),
        (MachinePhase::PlannedDowntime, MachinePhase::Warmup) => {
            String::from("Resuming production")
        }
        (MachinePhase::UnplannedDowntime, MachinePhase::Maintenance) => {
            String::from("Repair needed")
        }
        (MachinePhase::UnplannedDowntime, MachinePhase::Warmup) => {
            String::from("Issue resolved")
        }
        (MachinePhase::Maintenance, MachinePhase::Warmup) => {
            String::from("Maintenance completed")
        }
        (MachinePhase::Cooldown, MachinePhase::Idle) => String::from("Machine stopped"),
        _ => format!("Transition from {previous:?} to {next:?}"),
    }
}

fn random_defect_kind(rng: &mut impl Rng) -> DefectKind {
    match rng.random_range(0..4_u8) {
        0 => DefectKind::Dimensional,
        1 => DefectKind::Surface,
        2 => DefectKind::Material,
        _ => DefectKind::Assembly,
    }
}
