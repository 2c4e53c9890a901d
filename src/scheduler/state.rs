//! Scheduler state: the ledger.
//!
//! Central mutable state of a scheduling run: the booked calendar,
//! per-resource booking indices, occurrence counters, backup-activation
//! log, and aggregated failure diagnostics. The orchestrator owns one
//! ledger, lends it read-only to the checker and scorer while a
//! candidate is evaluated, and mutates it only at commit.
//!
//! All maps are `BTreeMap`s: iteration order, and therefore
//! serialization and reporting, is deterministic by construction.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::TimeSlot;
use crate::scheduler::constraints::{ConstraintViolation, ViolationKind};

/// Aggregated record of failed placement attempts for one activity.
///
/// Keeps per-kind counts and the most recent violation of each kind;
/// the full violation stream is deliberately not retained.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchedulingAttempt {
    /// Total rejected candidates across all tiers.
    pub attempts: u32,
    /// Per-kind tally with the last violation seen of that kind.
    pub kinds: BTreeMap<ViolationKind, KindRecord>,
}

/// Count and latest example of one violation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindRecord {
    pub count: u32,
    pub last: ConstraintViolation,
}

impl SchedulingAttempt {
    fn record(&mut self, violation: ConstraintViolation) {
        self.attempts += 1;
        self.kinds
            .entry(violation.kind)
            .and_modify(|r| {
                r.count += 1;
                r.last = violation.clone();
            })
            .or_insert(KindRecord {
                count: 1,
                last: violation,
            });
    }

    /// The most frequent substantive violation kind. Exhaustion markers
    /// only win when nothing else was ever recorded.
    fn dominant(&self) -> Option<&KindRecord> {
        self.kinds
            .iter()
            .filter(|(kind, _)| **kind != ViolationKind::Exhaustion)
            .max_by_key(|(_, record)| record.count)
            .map(|(_, record)| record)
            .or_else(|| self.kinds.get(&ViolationKind::Exhaustion))
    }
}

/// A terminal failure surfaced to the user: an activity that never made
/// it onto the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalFailure {
    /// Dominant violation kind behind the failure.
    pub kind: ViolationKind,
    /// Reason text of the last violation of that kind.
    pub reason: String,
    /// Date of the last violation of that kind.
    pub last_date: NaiveDate,
    /// Total rejected candidates.
    pub attempts: u32,
}

/// Day-level schedule intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadIntensity {
    /// Nothing scheduled.
    Rest,
    /// Up to one hour.
    Low,
    /// Up to three hours.
    Medium,
    /// More than three hours.
    High,
}

impl LoadIntensity {
    /// Classifies total scheduled activity minutes for a day.
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            0 => LoadIntensity::Rest,
            1..=60 => LoadIntensity::Low,
            61..=180 => LoadIntensity::Medium,
            _ => LoadIntensity::High,
        }
    }
}

/// Derived context for one day of the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayContext {
    /// Whether a travel period covers the day.
    pub is_traveling: bool,
    /// Destination label when traveling.
    pub location: Option<String>,
    /// Scheduled load classification.
    pub load: LoadIntensity,
}

/// Success metrics for one priority tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityStats {
    /// Demand instances expanded for this tier.
    pub demand: u32,
    /// Demand instances that ended in a commit (primary or backup).
    pub fulfilled: u32,
    /// `fulfilled / demand`, 1.0 when nothing was demanded.
    pub success_rate: f64,
}

/// Booking volume for one resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResourceUsage {
    /// Number of bookings referencing the resource.
    pub bookings: usize,
    /// Total booked activity minutes.
    pub minutes: u32,
}

/// Run-level metrics computed from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    /// All committed slots.
    pub total_slots: usize,
    /// Slots committed for the originally demanded activity.
    pub primary_slots: usize,
    /// Slots committed through a fallback chain.
    pub backup_slots: usize,
    /// Demand instances expanded over the horizon.
    pub total_demand: u32,
    /// Demand instances that ended in a commit.
    pub fulfilled_demand: u32,
    /// `fulfilled_demand / total_demand`.
    pub overall_success_rate: f64,
    /// `backup_slots / total_demand`: how much of the plan is adaptive
    /// substitution rather than the ideal schedule.
    pub resilience_rate: f64,
    /// Per-priority success breakdown.
    pub by_priority: BTreeMap<u8, PriorityStats>,
    /// Booking volume per specialist.
    pub specialist_usage: BTreeMap<String, ResourceUsage>,
    /// Booking volume per equipment item.
    pub equipment_usage: BTreeMap<String, ResourceUsage>,
}

/// Mutable state of a scheduling run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchedulerState {
    /// The master calendar: per-date slots sorted by start time.
    pub schedule: BTreeMap<NaiveDate, Vec<TimeSlot>>,
    /// Bookings per specialist.
    pub specialist_bookings: BTreeMap<String, Vec<TimeSlot>>,
    /// Bookings per equipment item.
    pub equipment_bookings: BTreeMap<String, Vec<TimeSlot>>,
    /// Commits credited per activity; backup commits credit the primary
    /// they replaced.
    pub activity_occurrences: BTreeMap<String, u32>,
    /// Backup slots booked in place of each primary.
    pub backup_activations: BTreeMap<String, Vec<TimeSlot>>,
    /// Aggregated placement failures per activity.
    pub failures: BTreeMap<String, SchedulingAttempt>,
    /// Per-activity weekday histogram (0 = Monday), fed to the scorer.
    pub weekly_patterns: BTreeMap<String, [u32; 7]>,
    /// Derived per-day context, filled at the end of a run.
    pub day_contexts: BTreeMap<NaiveDate, DayContext>,
    /// Demand instances expanded per priority tier (index = priority - 1).
    pub demand_by_priority: [u32; 5],
    /// Demand instances fulfilled per priority tier.
    pub fulfilled_by_priority: [u32; 5],
}

impl SchedulerState {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits a booking and updates every index.
    ///
    /// The checker must have approved the slot: colliding with an
    /// existing booking here is a programmer error and aborts the run.
    pub fn add_booking(&mut self, slot: TimeSlot) {
        assert_eq!(
            slot.is_backup,
            slot.original_activity_id.is_some(),
            "original_activity_id must be set exactly for backup slots (activity `{}`)",
            slot.activity_id
        );

        let day = self.schedule.entry(slot.date).or_default();
        for existing in day.iter() {
            assert!(
                !existing.overlaps_effective(
                    slot.effective_start_minutes(),
                    slot.end_minutes()
                ),
                "ledger invariant broken: `{}` at {} {} collides with committed `{}`",
                slot.activity_id,
                slot.date,
                slot.start_time,
                existing.activity_id
            );
        }
        let idx = day.partition_point(|s| s.start_time <= slot.start_time);
        day.insert(idx, slot.clone());

        if let Some(spec_id) = &slot.specialist_id {
            self.specialist_bookings
                .entry(spec_id.clone())
                .or_default()
                .push(slot.clone());
        }

        for eq_id in &slot.equipment_ids {
            self.equipment_bookings
                .entry(eq_id.clone())
                .or_default()
                .push(slot.clone());
        }

        *self
            .activity_occurrences
            .entry(slot.credited_activity_id().to_string())
            .or_insert(0) += 1;

        if slot.is_backup {
            if let Some(original) = &slot.original_activity_id {
                self.backup_activations
                    .entry(original.clone())
                    .or_default()
                    .push(slot.clone());
            }
        }

        let weekday = slot.date.weekday().num_days_from_monday() as usize;
        self.weekly_patterns
            .entry(slot.activity_id.clone())
            .or_insert([0; 7])[weekday] += 1;
    }

    /// Logs a rejected placement attempt for an activity.
    pub fn record_failure(&mut self, activity_id: &str, violation: ConstraintViolation) {
        self.failures
            .entry(activity_id.to_string())
            .or_default()
            .record(violation);
    }

    /// Counts one expanded demand instance for a priority tier.
    pub fn record_demand(&mut self, priority: u8) {
        self.demand_by_priority[(priority - 1) as usize] += 1;
    }

    /// Counts one fulfilled demand instance for a priority tier.
    pub fn record_fulfilled(&mut self, priority: u8) {
        self.fulfilled_by_priority[(priority - 1) as usize] += 1;
    }

    /// All bookings on a date, sorted by start time.
    pub fn slots_for(&self, date: NaiveDate) -> &[TimeSlot] {
        self.schedule.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// How many times an activity has been placed (backup placements
    /// credit the primary they replaced).
    pub fn occurrence_count(&self, activity_id: &str) -> u32 {
        self.activity_occurrences
            .get(activity_id)
            .copied()
            .unwrap_or(0)
    }

    /// Whether a date already carries a commitment for the given demand:
    /// either a slot credited to `credited_id` or a slot performing
    /// `placing_id` itself.
    pub fn day_has_commitment(
        &self,
        date: NaiveDate,
        credited_id: &str,
        placing_id: &str,
    ) -> bool {
        self.slots_for(date)
            .iter()
            .any(|s| s.credited_activity_id() == credited_id || s.activity_id == placing_id)
    }

    /// Committed bookings of a specialist overlapping
    /// `[start_min, end_min)` on `date`.
    pub fn specialist_overlap_count(
        &self,
        specialist_id: &str,
        date: NaiveDate,
        start_min: i32,
        end_min: i32,
    ) -> u32 {
        Self::interval_overlaps(
            self.specialist_bookings.get(specialist_id),
            date,
            start_min,
            end_min,
        )
    }

    /// Committed bookings of an equipment item overlapping
    /// `[start_min, end_min)` on `date`.
    pub fn equipment_overlap_count(
        &self,
        equipment_id: &str,
        date: NaiveDate,
        start_min: i32,
        end_min: i32,
    ) -> u32 {
        Self::interval_overlaps(
            self.equipment_bookings.get(equipment_id),
            date,
            start_min,
            end_min,
        )
    }

    fn interval_overlaps(
        slots: Option<&Vec<TimeSlot>>,
        date: NaiveDate,
        start_min: i32,
        end_min: i32,
    ) -> u32 {
        slots
            .map(|slots| {
                slots
                    .iter()
                    .filter(|s| {
                        s.date == date
                            && start_min < s.end_minutes()
                            && s.start_minutes() < end_min
                    })
                    .count() as u32
            })
            .unwrap_or(0)
    }

    /// Committed activity minutes per priority tier on a date
    /// (index = priority - 1). Prep minutes are buffer, not load.
    pub fn day_priority_minutes(&self, date: NaiveDate) -> [u32; 5] {
        let mut minutes = [0u32; 5];
        for slot in self.slots_for(date) {
            if (1..=5).contains(&slot.priority) {
                minutes[(slot.priority - 1) as usize] += slot.duration_minutes;
            }
        }
        minutes
    }

    /// Total scheduled activity minutes on a date.
    pub fn day_minutes(&self, date: NaiveDate) -> u32 {
        self.slots_for(date).iter().map(|s| s.duration_minutes).sum()
    }

    /// Scorer input: committed bookings of an activity on a weekday
    /// (0 = Monday).
    pub fn weekday_count(&self, activity_id: &str, weekday: usize) -> u32 {
        self.weekly_patterns
            .get(activity_id)
            .map(|hist| hist[weekday])
            .unwrap_or(0)
    }

    /// Derived context for a day, if the run has been finalized.
    pub fn day_context(&self, date: NaiveDate) -> Option<&DayContext> {
        self.day_contexts.get(&date)
    }

    /// Terminal failures: activities with zero successful commits over
    /// the horizon. Transient failures rescued by a later tier never
    /// appear here.
    pub fn failures_terminal(&self) -> BTreeMap<String, TerminalFailure> {
        self.failures
            .iter()
            .filter(|(id, _)| self.occurrence_count(id) == 0)
            .filter_map(|(id, attempt)| {
                attempt.dominant().map(|record| {
                    (
                        id.clone(),
                        TerminalFailure {
                            kind: record.last.kind,
                            reason: record.last.reason.clone(),
                            last_date: record.last.date,
                            attempts: attempt.attempts,
                        },
                    )
                })
            })
            .collect()
    }

    /// Run-level metrics.
    pub fn statistics(&self) -> Statistics {
        let total_slots: usize = self.schedule.values().map(Vec::len).sum();
        let backup_slots: usize = self
            .schedule
            .values()
            .flatten()
            .filter(|s| s.is_backup)
            .count();

        let total_demand: u32 = self.demand_by_priority.iter().sum();
        let fulfilled_demand: u32 = self.fulfilled_by_priority.iter().sum();

        let rate = |fulfilled: u32, demand: u32| {
            if demand == 0 {
                1.0
            } else {
                fulfilled as f64 / demand as f64
            }
        };

        let by_priority = (1u8..=5)
            .filter(|p| self.demand_by_priority[(p - 1) as usize] > 0)
            .map(|p| {
                let demand = self.demand_by_priority[(p - 1) as usize];
                let fulfilled = self.fulfilled_by_priority[(p - 1) as usize];
                (
                    p,
                    PriorityStats {
                        demand,
                        fulfilled,
                        success_rate: rate(fulfilled, demand),
                    },
                )
            })
            .collect();

        let usage = |index: &BTreeMap<String, Vec<TimeSlot>>| -> BTreeMap<String, ResourceUsage> {
            index
                .iter()
                .map(|(id, slots)| {
                    (
                        id.clone(),
                        ResourceUsage {
                            bookings: slots.len(),
                            minutes: slots.iter().map(|s| s.duration_minutes).sum(),
                        },
                    )
                })
                .collect()
        };

        Statistics {
            total_slots,
            primary_slots: total_slots - backup_slots,
            backup_slots,
            total_demand,
            fulfilled_demand,
            overall_success_rate: rate(fulfilled_demand, total_demand),
            resilience_rate: if total_demand == 0 {
                0.0
            } else {
                backup_slots as f64 / total_demand as f64
            },
            by_priority,
            specialist_usage: usage(&self.specialist_bookings),
            equipment_usage: usage(&self.equipment_bookings),
        }
    }

    /// Resets all state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotStatus;
    use chrono::NaiveTime;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn slot(id: &str, day: u32, start: (u32, u32), duration: u32) -> TimeSlot {
        TimeSlot {
            activity_id: id.into(),
            priority: 3,
            date: d(day),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            duration_minutes: duration,
            prep_minutes: 0,
            specialist_id: None,
            equipment_ids: Vec::new(),
            is_backup: false,
            original_activity_id: None,
            status: SlotStatus::Scheduled,
        }
    }

    fn violation(kind: ViolationKind, day: u32) -> ConstraintViolation {
        ConstraintViolation::new(kind, format!("{kind} reason"), "a", d(day))
    }

    #[test]
    fn test_add_booking_updates_indices() {
        let mut state = SchedulerState::new();
        let mut s = slot("gym", 6, (9, 0), 60);
        s.specialist_id = Some("trainer".into());
        s.equipment_ids = vec!["tread".into()];
        state.add_booking(s);

        assert_eq!(state.slots_for(d(6)).len(), 1);
        assert_eq!(state.specialist_bookings["trainer"].len(), 1);
        assert_eq!(state.equipment_bookings["tread"].len(), 1);
        assert_eq!(state.occurrence_count("gym"), 1);
        // 2025-01-06 is a Monday.
        assert_eq!(state.weekday_count("gym", 0), 1);
        assert!(state.backup_activations.is_empty());
    }

    #[test]
    fn test_day_slots_kept_sorted() {
        let mut state = SchedulerState::new();
        state.add_booking(slot("b", 6, (12, 0), 30));
        state.add_booking(slot("a", 6, (7, 0), 30));
        state.add_booking(slot("c", 6, (9, 0), 30));

        let starts: Vec<_> = state.slots_for(d(6)).iter().map(|s| s.start_time).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_backup_booking_credits_primary() {
        let mut state = SchedulerState::new();
        let mut backup = slot("home_flow", 6, (9, 0), 30);
        backup.is_backup = true;
        backup.original_activity_id = Some("gym".into());
        state.add_booking(backup);

        assert_eq!(state.occurrence_count("gym"), 1);
        assert_eq!(state.occurrence_count("home_flow"), 0);
        assert_eq!(state.backup_activations["gym"].len(), 1);
        // The weekday habit belongs to the activity actually performed.
        assert_eq!(state.weekday_count("home_flow", 0), 1);
    }

    #[test]
    #[should_panic(expected = "ledger invariant broken")]
    fn test_overlapping_commit_aborts() {
        let mut state = SchedulerState::new();
        state.add_booking(slot("a", 6, (9, 0), 60));
        state.add_booking(slot("b", 6, (9, 30), 60));
    }

    #[test]
    #[should_panic(expected = "original_activity_id")]
    fn test_backup_flag_mismatch_aborts() {
        let mut state = SchedulerState::new();
        let mut s = slot("a", 6, (9, 0), 60);
        s.is_backup = true; // no original_activity_id
        state.add_booking(s);
    }

    #[test]
    fn test_resource_overlap_counts() {
        let mut state = SchedulerState::new();
        let mut s = slot("a", 6, (9, 0), 60);
        s.specialist_id = Some("spec".into());
        s.equipment_ids = vec!["eq".into()];
        state.add_booking(s);

        assert_eq!(state.specialist_overlap_count("spec", d(6), 9 * 60, 10 * 60), 1);
        assert_eq!(state.specialist_overlap_count("spec", d(6), 10 * 60, 11 * 60), 0);
        assert_eq!(state.specialist_overlap_count("spec", d(7), 9 * 60, 10 * 60), 0);
        assert_eq!(state.equipment_overlap_count("eq", d(6), 9 * 60 + 30, 10 * 60), 1);
        assert_eq!(state.equipment_overlap_count("other", d(6), 0, 1440), 0);
    }

    #[test]
    fn test_day_priority_minutes() {
        let mut state = SchedulerState::new();
        let mut critical = slot("a", 6, (7, 0), 45);
        critical.priority = 1;
        state.add_booking(critical);
        let mut optional = slot("b", 6, (9, 0), 120);
        optional.priority = 5;
        state.add_booking(optional);

        assert_eq!(state.day_priority_minutes(d(6)), [45, 0, 0, 0, 120]);
        assert_eq!(state.day_minutes(d(6)), 165);
    }

    #[test]
    fn test_failure_aggregation() {
        let mut state = SchedulerState::new();
        state.record_failure("a", violation(ViolationKind::Travel, 6));
        state.record_failure("a", violation(ViolationKind::Travel, 7));
        state.record_failure("a", violation(ViolationKind::Overlap, 7));

        let attempt = &state.failures["a"];
        assert_eq!(attempt.attempts, 3);
        assert_eq!(attempt.kinds[&ViolationKind::Travel].count, 2);
        assert_eq!(attempt.kinds[&ViolationKind::Travel].last.date, d(7));
        assert_eq!(attempt.kinds[&ViolationKind::Overlap].count, 1);
    }

    #[test]
    fn test_terminal_failures_filtering() {
        let mut state = SchedulerState::new();

        // `rescued` failed once but was eventually committed.
        state.record_failure("rescued", violation(ViolationKind::Travel, 6));
        state.add_booking(slot("rescued", 8, (9, 0), 30));

        // `doomed` only ever failed.
        state.record_failure("doomed", violation(ViolationKind::Capacity, 6));
        state.record_failure("doomed", violation(ViolationKind::Exhaustion, 6));

        let terminal = state.failures_terminal();
        assert_eq!(terminal.len(), 1);
        let failure = &terminal["doomed"];
        assert_eq!(failure.kind, ViolationKind::Capacity);
        assert_eq!(failure.last_date, d(6));
        assert_eq!(failure.attempts, 2);
    }

    #[test]
    fn test_terminal_failure_pure_exhaustion() {
        let mut state = SchedulerState::new();
        state.record_failure("doomed", violation(ViolationKind::Exhaustion, 6));

        let terminal = state.failures_terminal();
        assert_eq!(terminal["doomed"].kind, ViolationKind::Exhaustion);
    }

    #[test]
    fn test_statistics() {
        let mut state = SchedulerState::new();
        for _ in 0..3 {
            state.record_demand(2);
        }
        state.record_demand(5);

        let mut gym = slot("gym", 6, (9, 0), 60);
        gym.priority = 2;
        gym.specialist_id = Some("trainer".into());
        state.add_booking(gym);
        state.record_fulfilled(2);

        let mut fallback = slot("home_flow", 7, (9, 0), 30);
        fallback.priority = 3;
        fallback.is_backup = true;
        fallback.original_activity_id = Some("gym".into());
        state.add_booking(fallback);
        state.record_fulfilled(2);

        let stats = state.statistics();
        assert_eq!(stats.total_slots, 2);
        assert_eq!(stats.primary_slots, 1);
        assert_eq!(stats.backup_slots, 1);
        assert_eq!(stats.total_demand, 4);
        assert_eq!(stats.fulfilled_demand, 2);
        assert!((stats.overall_success_rate - 0.5).abs() < 1e-10);
        assert!((stats.resilience_rate - 0.25).abs() < 1e-10);

        let p2 = &stats.by_priority[&2];
        assert_eq!(p2.demand, 3);
        assert_eq!(p2.fulfilled, 2);
        let p5 = &stats.by_priority[&5];
        assert_eq!(p5.fulfilled, 0);

        assert_eq!(stats.specialist_usage["trainer"].bookings, 1);
        assert_eq!(stats.specialist_usage["trainer"].minutes, 60);
    }

    #[test]
    fn test_clear() {
        let mut state = SchedulerState::new();
        state.add_booking(slot("a", 6, (9, 0), 30));
        state.record_demand(3);
        state.record_failure("b", violation(ViolationKind::Travel, 6));

        state.clear();
        assert!(state.schedule.is_empty());
        assert!(state.failures.is_empty());
        assert_eq!(state.demand_by_priority, [0; 5]);
    }
}
