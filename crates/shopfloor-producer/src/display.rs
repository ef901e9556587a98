//! Console rendering of fleet activity.
//!
//! [`ConsoleDisplay`] is the producer's [`TickSink`]: lifecycle and
//! quality events print as single lines, sensor readings as a per-tick
//! block, and statistics as ruled tables. Operational logging stays on
//! `tracing`; this module owns everything meant for a human watching
//! the demo.

use std::time::Instant;

use chrono::{DateTime, Utc};

use shopfloor_sim::config::SimTuning;
use shopfloor_sim::machine::TickOutput;
use shopfloor_types::{MachineEventKind, MachineSnapshot, QualityVerdict};

use crate::runner::{FleetRunResult, TickSink};

const RULE: &str =
    "================================================================================";
const THIN_RULE: &str =
    "--------------------------------------------------------------------------------";

/// Renders fleet activity to stdout.
pub struct ConsoleDisplay {
    started: Instant,
}

impl ConsoleDisplay {
    /// Print the startup banner and return a display tracking run time.
    pub fn start(fleet_size: usize, tuning: &SimTuning) -> Self {
        println!("\n{RULE}");
        println!("SHOPFLOOR TELEMETRY SIMULATOR");
        println!("{RULE}\n");
        println!("Fleet started with {fleet_size} machines");
        println!("Update interval: {}s", tuning.tick_interval_s);
        println!("Simulation speed: {}x", tuning.simulation_speed);
        println!("Time multiplier: {}x", tuning.time_multiplier);
        if tuning.time_multiplier > 1.0 {
            let days_per_minute = tuning.time_multiplier * 60.0 / 86_400.0;
            println!("  -> {days_per_minute:.2} simulated days per real minute");
        }
        println!("{RULE}");
        Self { started: Instant::now() }
    }
}

impl TickSink for ConsoleDisplay {
    fn on_tick(&mut self, now: DateTime<Utc>, outputs: &[TickOutput]) {
        let stamp = now.format("%H:%M:%S").to_string();

        for output in outputs {
            if let Some(event) = &output.event {
                match event.kind {
                    MachineEventKind::StatusChange => {
                        let previous = event
                            .previous_phase
                            .map_or_else(|| String::from("None"), |p| format!("{p:?}"));
                        println!(
                            "[{stamp}] {}: {previous} -> {:?} (Reason: {})",
                            event.machine_id, event.phase, event.reason
                        );
                    }
                    MachineEventKind::CycleComplete => {
                        println!(
                            "[{stamp}] {}: Cycle #{} completed",
                            event.machine_id, event.cycle_count
                        );
                    }
                }
            }

            if let Some(quality) = &output.quality {
                match (quality.verdict, quality.defect) {
                    (QualityVerdict::Conforming, _) => {
                        println!(
                            "[OK]  [{stamp}] {}: Quality check PASSED",
                            quality.machine_id
                        );
                    }
                    (QualityVerdict::Defective, Some(defect)) => {
                        println!(
                            "[NOK] [{stamp}] {}: Quality check FAILED - {:?} (severity: {})",
                            quality.machine_id, defect.kind, defect.severity
                        );
                    }
                    (QualityVerdict::Defective, None) => {
                        println!(
                            "[NOK] [{stamp}] {}: Quality check FAILED",
                            quality.machine_id
                        );
                    }
                }
            }
        }

        if !outputs.is_empty() {
            println!("\n[SENSORS] [{stamp}] Fleet readings:");
            for output in outputs {
                let reading = &output.reading;
                println!(
                    "  {:<15} | Temp: {:5.1}C | Vib: {:5.2}mm/s | Press: {:5.2}bar | RPM: {:4} | Power: {:5.1}kW",
                    reading.machine_id,
                    reading.temperature_c,
                    reading.vibration_mm_s,
                    reading.pressure_bar,
                    reading.speed_rpm,
                    reading.power_kw
                );
            }
        }
    }

    fn on_stats(&mut self, iteration: u64, snapshots: &[MachineSnapshot]) {
        println!("\n{RULE}");
        println!("STATISTICS - Iteration #{iteration}");
        println!("{RULE}");
        for snapshot in snapshots {
            let phase = format!("{:?}", snapshot.phase);
            println!(
                "  {:<12} | Phase: {phase:<18} | Cycles: {:>4} | Quality: {:>6.2}% | Wear: {:>5.1}% | Hours: {:>6.2}h",
                snapshot.machine_id,
                snapshot.lifetime_cycles,
                snapshot.quality_rate,
                snapshot.wear_percent,
                snapshot.operating_hours
            );
        }
        println!("{RULE}\n");
    }

    fn on_end(&mut self, result: &FleetRunResult, snapshots: &[MachineSnapshot]) {
        let elapsed = self.started.elapsed().as_secs_f64();

        println!("\n{RULE}");
        println!("FINAL STATISTICS");
        println!("{RULE}");
        println!(
            "Run time: {elapsed:.1}s ({} iterations, {:?})",
            result.total_iterations, result.end_reason
        );
        println!("Machines simulated: {}", snapshots.len());
        println!("\nPer-machine performance:");
        println!("{THIN_RULE}");

        let mut total_cycles: u64 = 0;
        let mut total_good: u64 = 0;
        let mut total_bad: u64 = 0;
        for snapshot in snapshots {
            total_cycles = total_cycles.saturating_add(snapshot.lifetime_cycles);
            total_good = total_good.saturating_add(snapshot.good_parts);
            total_bad = total_bad.saturating_add(snapshot.bad_parts);
            println!(
                "  {:<12} | Cycles: {:>5} | OK: {:>4} | NOK: {:>4} | Quality: {:>6.2}% | Hours: {:>6.2}h",
                snapshot.machine_id,
                snapshot.lifetime_cycles,
                snapshot.good_parts,
                snapshot.bad_parts,
                snapshot.quality_rate,
                snapshot.operating_hours
            );
        }
        println!("{THIN_RULE}");

        let inspected = total_good.saturating_add(total_bad);
        // Safe: part counters stay far below 2^52, so the conversions
        // are exact.
        #[allow(clippy::cast_precision_loss)]
        let overall_quality = if inspected == 0 {
            0.0
        } else {
            total_good as f64 / inspected as f64 * 100.0
        };

        println!("\nFleet totals:");
        println!("   Total cycles: {total_cycles}");
        println!("   Parts inspected: {inspected}");
        println!("   Parts OK: {total_good}");
        println!("   Parts NOK: {total_bad}");
        println!("   Overall quality rate: {overall_quality:.2}%");
        println!("{RULE}\n");
    }
}
