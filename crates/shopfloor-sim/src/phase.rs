//! Operational phase state machine for a single machine.
//!
//! One instance is the source of truth for one machine's current phase,
//! the time accumulated in that phase, and the dwell duration sampled when
//! the phase was entered. The owning simulator drives it once per tick.
//!
//! # Design Principles
//!
//! - The transition graph, dwell ranges, and automatic successors are
//!   static per-variant tables. The variant set is closed and small, so
//!   no dynamic dispatch is involved.
//! - Validity ("may this transition happen") is separate from policy
//!   ("should it happen now"). The owning simulator layers probabilistic
//!   exits on the same graph the automatic exits use.
//! - An invalid transition request is a rejected no-op signaled by a
//!   boolean, never an error.

use chrono::{DateTime, Utc};
use rand::Rng;

use shopfloor_types::MachinePhase;

// ---------------------------------------------------------------------------
// Static tables
// ---------------------------------------------------------------------------

/// Return the set of phases `phase` may legally transition into.
///
/// Every phase has an entry. A requested transition whose target is not in
/// this set must be rejected by [`PhaseMachine::transition`].
pub const fn allowed_transitions(phase: MachinePhase) -> &'static [MachinePhase] {
    match phase {
        MachinePhase::Idle => &[MachinePhase::Warmup, MachinePhase::Maintenance],
        MachinePhase::Warmup => &[MachinePhase::Running, MachinePhase::UnplannedDowntime],
        MachinePhase::Running => &[
            MachinePhase::Setup,
            MachinePhase::PlannedDowntime,
            MachinePhase::UnplannedDowntime,
            MachinePhase::Maintenance,
            MachinePhase::Cooldown,
        ],
        MachinePhase::Setup => &[MachinePhase::Running, MachinePhase::UnplannedDowntime],
        MachinePhase::PlannedDowntime | MachinePhase::Maintenance => &[MachinePhase::Warmup],
        MachinePhase::UnplannedDowntime => {
            &[MachinePhase::Maintenance, MachinePhase::Warmup]
        }
        MachinePhase::Cooldown => &[MachinePhase::Idle],
    }
}

/// Return the inclusive dwell range for `phase` in simulated seconds.
///
/// A duration is drawn uniformly from this range each time the phase is
/// entered.
pub const fn dwell_range(phase: MachinePhase) -> (f64, f64) {
    match phase {
        MachinePhase::Idle => (5.0, 15.0),
        MachinePhase::Warmup => (10.0, 20.0),
        MachinePhase::Running => (30.0, 120.0),
        MachinePhase::Setup => (15.0, 30.0),
        MachinePhase::PlannedDowntime => (20.0, 40.0),
        MachinePhase::UnplannedDowntime => (25.0, 60.0),
        MachinePhase::Maintenance => (40.0, 80.0),
        MachinePhase::Cooldown => (10.0, 20.0),
    }
}

/// Return the deterministic successor consulted when the dwell duration
/// has elapsed, or `None` for phases with no automatic exit.
///
/// Running exits only through the simulator's probabilistic checks, and
/// `UnplannedDowntime` only through the administrative maintenance
/// override.
pub const fn auto_successor(phase: MachinePhase) -> Option<MachinePhase> {
    match phase {
        MachinePhase::Idle => Some(MachinePhase::Warmup),
        MachinePhase::Warmup | MachinePhase::Setup => Some(MachinePhase::Running),
        MachinePhase::PlannedDowntime | MachinePhase::Maintenance => {
            Some(MachinePhase::Warmup)
        }
        MachinePhase::Cooldown => Some(MachinePhase::Idle),
        MachinePhase::Running | MachinePhase::UnplannedDowntime => None,
    }
}

/// Sample a dwell duration for `phase` uniformly from its range.
fn sample_dwell(phase: MachinePhase, rng: &mut impl Rng) -> f64 {
    let (min, max) = dwell_range(phase);
    rng.random_range(min..=max)
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Phase state machine owning one machine's current phase and dwell state.
///
/// The graph is cyclic; there is no terminal phase. All random draws go
/// through the caller-supplied source, so one machine's entire behavior
/// sits on a single seedable stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseMachine {
    /// Current operational phase.
    phase: MachinePhase,

    /// Simulated seconds accumulated in the current phase.
    time_in_phase: f64,

    /// Dwell duration sampled when the current phase was entered.
    dwell_seconds: f64,

    /// Simulated time the current phase was entered.
    entered_at: DateTime<Utc>,
}

impl PhaseMachine {
    /// Create a state machine in `initial`, sampling its dwell duration.
    pub fn new(initial: MachinePhase, now: DateTime<Utc>, rng: &mut impl Rng) -> Self {
        Self {
            phase: initial,
            time_in_phase: 0.0,
            dwell_seconds: sample_dwell(initial, rng),
            entered_at: now,
        }
    }

    /// Create a state machine from explicit parts (useful for testing and
    /// state restoration). No dwell duration is sampled; `dwell_seconds`
    /// is taken as given, including a degenerate zero.
    pub const fn from_parts(
        phase: MachinePhase,
        time_in_phase: f64,
        dwell_seconds: f64,
        entered_at: DateTime<Utc>,
    ) -> Self {
        Self { phase, time_in_phase, dwell_seconds, entered_at }
    }

    /// Return whether `target` is a legal successor of the current phase.
    ///
    /// Pure query with no side effects.
    pub fn can_transition(&self, target: MachinePhase) -> bool {
        allowed_transitions(self.phase).contains(&target)
    }

    /// Transition to `target` if the graph allows it.
    ///
    /// On success the phase changes, the time-in-phase accumulator resets
    /// to 0, a fresh dwell duration is sampled from the target's range,
    /// and the entry timestamp is recorded. On rejection nothing changes
    /// and `false` is returned.
    pub fn transition(
        &mut self,
        target: MachinePhase,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> bool {
        if !self.can_transition(target) {
            return false;
        }
        self.enter(target, now, rng);
        true
    }

    /// Enter `target` unconditionally, bypassing the transition graph.
    ///
    /// Administrative override used by forced maintenance. Resets the
    /// accumulator and samples a fresh dwell duration like any entry.
    pub fn force(&mut self, target: MachinePhase, now: DateTime<Utc>, rng: &mut impl Rng) {
        self.enter(target, now, rng);
    }

    /// Advance the accumulator by `elapsed` simulated seconds and perform
    /// at most one automatic transition.
    ///
    /// When the accumulator reaches the sampled dwell duration and the
    /// current phase has an automatic successor, transitions to it and
    /// returns the new phase. Returns `None` otherwise. Even if several
    /// dwell periods worth of time elapse in one call, only one
    /// transition is produced (no catch-up loop).
    pub fn advance(
        &mut self,
        now: DateTime<Utc>,
        elapsed: f64,
        rng: &mut impl Rng,
    ) -> Option<MachinePhase> {
        self.time_in_phase += elapsed;
        if self.time_in_phase < self.dwell_seconds {
            return None;
        }
        let next = auto_successor(self.phase)?;
        if self.transition(next, now, rng) { Some(next) } else { None }
    }

    /// Return completion of the current sojourn as a fraction.
    ///
    /// Clamped to [0.0, 1.0]. A zero dwell duration yields 0.0 rather
    /// than dividing by zero.
    pub const fn progress(&self) -> f64 {
        if self.dwell_seconds <= 0.0 {
            return 0.0;
        }
        let ratio = self.time_in_phase / self.dwell_seconds;
        if ratio > 1.0 { 1.0 } else { ratio }
    }

    /// Return the current phase.
    pub const fn phase(&self) -> MachinePhase {
        self.phase
    }

    /// Return the simulated seconds spent in the current phase so far.
    pub const fn time_in_phase(&self) -> f64 {
        self.time_in_phase
    }

    /// Return the dwell duration sampled for the current phase.
    pub const fn dwell_seconds(&self) -> f64 {
        self.dwell_seconds
    }

    /// Return the simulated time the current phase was entered.
    pub const fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    /// Shared entry bookkeeping for graph transitions and forced entries.
    fn enter(&mut self, target: MachinePhase, now: DateTime<Utc>, rng: &mut impl Rng) {
        self.phase = target;
        self.time_in_phase = 0.0;
        self.dwell_seconds = sample_dwell(target, rng);
        self.entered_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    const ALL_PHASES: [MachinePhase; 8] = [
        MachinePhase::Idle,
        MachinePhase::Warmup,
        MachinePhase::Running,
        MachinePhase::Setup,
        MachinePhase::PlannedDowntime,
        MachinePhase::UnplannedDowntime,
        MachinePhase::Maintenance,
        MachinePhase::Cooldown,
    ];

    /// Helper to create a deterministic random source for tests.
    fn make_rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    /// Helper to create a fixed timestamp for tests.
    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
    }

    /// Helper to create a machine in `initial` with a seeded source.
    fn make_machine(initial: MachinePhase, seed: u64) -> (PhaseMachine, SmallRng) {
        let mut rng = make_rng(seed);
        let machine = PhaseMachine::new(initial, t0(), &mut rng);
        (machine, rng)
    }

    #[test]
    fn auto_successors_are_members_of_allowed_sets() {
        for &phase in &ALL_PHASES {
            if let Some(next) = auto_successor(phase) {
                assert!(
                    allowed_transitions(phase).contains(&next),
                    "automatic successor of {phase:?} is not a legal transition",
                );
            }
        }
    }

    #[test]
    fn running_and_unplanned_downtime_have_no_auto_exit() {
        assert!(auto_successor(MachinePhase::Running).is_none());
        assert!(auto_successor(MachinePhase::UnplannedDowntime).is_none());
    }

    #[test]
    fn dwell_ranges_are_positive_and_ordered() {
        for &phase in &ALL_PHASES {
            let (min, max) = dwell_range(phase);
            assert!(min > 0.0, "{phase:?} has a non-positive dwell minimum");
            assert!(max >= min, "{phase:?} has an inverted dwell range");
        }
    }

    #[test]
    fn new_machine_samples_dwell_within_range() {
        for seed in 0..100 {
            let (machine, _) = make_machine(MachinePhase::Warmup, seed);
            let (min, max) = dwell_range(MachinePhase::Warmup);
            assert!(machine.dwell_seconds() >= min);
            assert!(machine.dwell_seconds() <= max);
        }
    }

    #[test]
    fn valid_transition_succeeds_and_resets_elapsed() {
        let (mut machine, mut rng) = make_machine(MachinePhase::Idle, 7);
        machine.advance(t0(), 3.0, &mut rng);
        assert!(machine.time_in_phase() > 0.0);

        assert!(machine.transition(MachinePhase::Warmup, t0(), &mut rng));
        assert_eq!(machine.phase(), MachinePhase::Warmup);
        assert!(machine.time_in_phase() <= 0.0);
    }

    #[test]
    fn invalid_transition_is_rejected_and_state_unchanged() {
        let (mut machine, mut rng) = make_machine(MachinePhase::Idle, 7);
        let before = machine.clone();

        // Idle -> Cooldown is not in the graph.
        assert!(!machine.can_transition(MachinePhase::Cooldown));
        assert!(!machine.transition(MachinePhase::Cooldown, t0(), &mut rng));
        assert_eq!(machine, before);
    }

    #[test]
    fn advance_below_dwell_accumulates_without_transition() {
        let (mut machine, mut rng) = make_machine(MachinePhase::Idle, 11);
        // Idle dwell is at least 5 seconds; 1 second cannot complete it.
        let moved = machine.advance(t0(), 1.0, &mut rng);
        assert!(moved.is_none());
        assert_eq!(machine.phase(), MachinePhase::Idle);
        assert!((machine.time_in_phase() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn advance_past_dwell_takes_automatic_successor() {
        let (mut machine, mut rng) = make_machine(MachinePhase::Idle, 11);
        // Idle dwell is at most 15 seconds.
        let moved = machine.advance(t0(), 20.0, &mut rng);
        assert_eq!(moved, Some(MachinePhase::Warmup));
        assert_eq!(machine.phase(), MachinePhase::Warmup);
        assert!(machine.time_in_phase() <= 0.0);
    }

    #[test]
    fn advance_produces_at_most_one_transition_per_call() {
        let (mut machine, mut rng) = make_machine(MachinePhase::Cooldown, 3);
        // Enough time for Cooldown -> Idle -> Warmup, but only one hop
        // may happen per call.
        let moved = machine.advance(t0(), 1_000.0, &mut rng);
        assert_eq!(moved, Some(MachinePhase::Idle));
        assert_eq!(machine.phase(), MachinePhase::Idle);
    }

    #[test]
    fn running_never_exits_automatically() {
        let mut rng = make_rng(5);
        let mut machine = PhaseMachine::new(MachinePhase::Running, t0(), &mut rng);
        for _ in 0..50 {
            assert!(machine.advance(t0(), 60.0, &mut rng).is_none());
        }
        assert_eq!(machine.phase(), MachinePhase::Running);
    }

    #[test]
    fn progress_is_monotone_and_clamped() {
        let (mut machine, mut rng) = make_machine(MachinePhase::Running, 13);
        let mut last = machine.progress();
        assert!(last >= 0.0);
        for _ in 0..200 {
            machine.advance(t0(), 1.0, &mut rng);
            let current = machine.progress();
            assert!(current >= last);
            assert!((0.0..=1.0).contains(&current));
            last = current;
        }
        // Running has no automatic exit, so progress saturates at 1.0.
        assert!((last - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_with_zero_dwell_is_zero() {
        let machine =
            PhaseMachine::from_parts(MachinePhase::Idle, 0.0, 0.0, t0());
        assert!(machine.progress().abs() < f64::EPSILON);
    }

    #[test]
    fn force_bypasses_the_graph() {
        let (mut machine, mut rng) = make_machine(MachinePhase::Idle, 17);

        // Idle -> Cooldown is illegal, but force ignores the graph.
        machine.force(MachinePhase::Cooldown, t0(), &mut rng);
        assert_eq!(machine.phase(), MachinePhase::Cooldown);
        assert!(machine.time_in_phase() <= 0.0);
        let (min, max) = dwell_range(MachinePhase::Cooldown);
        assert!(machine.dwell_seconds() >= min);
        assert!(machine.dwell_seconds() <= max);
    }

    #[test]
    fn transition_records_entry_timestamp() {
        let (mut machine, mut rng) = make_machine(MachinePhase::Idle, 19);
        let later = t0() + chrono::TimeDelta::seconds(42);
        assert!(machine.transition(MachinePhase::Warmup, later, &mut rng));
        assert_eq!(machine.entered_at(), later);
    }

    #[test]
    fn same_seed_samples_identical_dwell() {
        let (a, _) = make_machine(MachinePhase::Running, 23);
        let (b, _) = make_machine(MachinePhase::Running, 23);
        assert!((a.dwell_seconds() - b.dwell_seconds()).abs() < f64::EPSILON);
    }
}
