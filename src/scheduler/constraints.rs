//! Hard constraint validation.
//!
//! Answers the binary question: can activity X start at time Y on date Z
//! given everything already booked? The checker is a pure predicate over
//! the ledger; it never mutates state.
//!
//! # Stage order
//! Travel context, specialist availability, equipment, user overlap,
//! time window — cheapest and most exclusionary first. The order is
//! contractual: the first failing stage determines the violation kind
//! reported, and diagnostics depend on it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::{minutes_of, Activity, Equipment, Location, Specialist, TravelPeriod};
use crate::scheduler::state::SchedulerState;

/// Classification of scheduling violations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ViolationKind {
    /// Travel context forbids the activity.
    Travel,
    /// Required specialist unavailable or fully booked.
    Specialist,
    /// Required equipment unavailable, serviced, or fully booked.
    Equipment,
    /// Collides with an existing booking of the user.
    Overlap,
    /// Start or end falls outside the declared time window.
    TimeWindow,
    /// Daily priority-capacity quota exceeded.
    Capacity,
    /// All placement attempts failed; terminal.
    Exhaustion,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ViolationKind::Travel => "Travel",
            ViolationKind::Specialist => "Specialist",
            ViolationKind::Equipment => "Equipment",
            ViolationKind::Overlap => "Overlap",
            ViolationKind::TimeWindow => "TimeWindow",
            ViolationKind::Capacity => "Capacity",
            ViolationKind::Exhaustion => "Exhaustion",
        };
        f.write_str(label)
    }
}

/// Why a candidate placement was rejected.
///
/// Violations are ordinary values, not errors: the engine expects them
/// constantly and routes them into the ledger's failure log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Violation classification.
    pub kind: ViolationKind,
    /// Human-readable reason.
    pub reason: String,
    /// The activity whose placement was rejected.
    pub activity_id: String,
    /// The attempted date.
    pub date: NaiveDate,
}

impl ConstraintViolation {
    /// Creates a violation record.
    pub fn new(
        kind: ViolationKind,
        reason: impl Into<String>,
        activity_id: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            kind,
            reason: reason.into(),
            activity_id: activity_id.into(),
            date,
        }
    }
}

/// Validates hard constraints for candidate placements.
///
/// Holds indexed supply collections; borrows the ledger read-only for
/// the duration of each check.
#[derive(Debug, Clone)]
pub struct ConstraintChecker {
    specialists: BTreeMap<String, Specialist>,
    equipment: BTreeMap<String, Equipment>,
    travel_periods: Vec<TravelPeriod>,
}

impl ConstraintChecker {
    /// Indexes the supply collections for O(log n) lookup.
    pub fn new(
        specialists: &[Specialist],
        equipment: &[Equipment],
        travel_periods: &[TravelPeriod],
    ) -> Self {
        Self {
            specialists: specialists
                .iter()
                .map(|s| (s.id.clone(), s.clone()))
                .collect(),
            equipment: equipment.iter().map(|e| (e.id.clone(), e.clone())).collect(),
            travel_periods: travel_periods.to_vec(),
        }
    }

    /// Master validation entry point.
    ///
    /// Returns `Ok(())` when the activity may start at `start` on `date`,
    /// or the violation raised by the first failing stage.
    pub fn check(
        &self,
        activity: &Activity,
        date: NaiveDate,
        start: NaiveTime,
        state: &SchedulerState,
        is_backup: bool,
    ) -> Result<(), ConstraintViolation> {
        self.check_travel_context(activity, date, is_backup)?;

        if activity.specialist_id.is_some() {
            self.check_specialist(activity, date, start, state)?;
        }

        if !activity.equipment_ids.is_empty() {
            self.check_equipment(activity, date, start, state)?;
        }

        self.check_overlap(activity, date, start, state)?;
        self.check_time_window(activity, date, start)?;

        Ok(())
    }

    /// The travel period covering `date`, if any.
    pub fn active_travel(&self, date: NaiveDate) -> Option<&TravelPeriod> {
        self.travel_periods.iter().find(|t| t.contains(date))
    }

    /// Whether an activity is treated as remote-capable for travel
    /// checks: declared remote, or carrying only portable equipment.
    ///
    /// An activity with no equipment at all is only remote if declared
    /// so — having nothing to carry is not the same as being portable.
    pub fn effectively_remote(&self, activity: &Activity) -> bool {
        if activity.remote_capable {
            return true;
        }
        !activity.equipment_ids.is_empty()
            && activity.equipment_ids.iter().all(|id| {
                self.equipment
                    .get(id)
                    .map(|e| e.is_portable)
                    .unwrap_or(false)
            })
    }

    /// Stage 1: travel context.
    ///
    /// Backup placements bypass this stage entirely: fallbacks are by
    /// construction performable wherever the user happens to be.
    fn check_travel_context(
        &self,
        activity: &Activity,
        date: NaiveDate,
        is_backup: bool,
    ) -> Result<(), ConstraintViolation> {
        let Some(trip) = self.active_travel(date) else {
            return Ok(());
        };

        if is_backup {
            return Ok(());
        }

        let remote = self.effectively_remote(activity);

        if trip.remote_activities_only && !remote {
            return Err(ConstraintViolation::new(
                ViolationKind::Travel,
                format!("traveling to {} (remote activities only)", trip.location),
                &activity.id,
                date,
            ));
        }

        if !trip.available_equipment_ids.is_empty() {
            for eq_id in &activity.equipment_ids {
                let portable = self
                    .equipment
                    .get(eq_id)
                    .map(|e| e.is_portable)
                    .unwrap_or(false);
                if !portable && !trip.available_equipment_ids.contains(eq_id) {
                    return Err(ConstraintViolation::new(
                        ViolationKind::Travel,
                        format!("equipment `{}` not provided at {}", eq_id, trip.location),
                        &activity.id,
                        date,
                    ));
                }
            }
        }

        if activity.location == Location::Home && !remote {
            return Err(ConstraintViolation::new(
                ViolationKind::Travel,
                format!("away at {}, cannot do home activity", trip.location),
                &activity.id,
                date,
            ));
        }

        Ok(())
    }

    /// Stage 2: specialist shifts, blackout dates, and client capacity.
    fn check_specialist(
        &self,
        activity: &Activity,
        date: NaiveDate,
        start: NaiveTime,
        state: &SchedulerState,
    ) -> Result<(), ConstraintViolation> {
        let Some(spec_id) = &activity.specialist_id else {
            return Ok(());
        };
        let Some(spec) = self.specialists.get(spec_id) else {
            // References are checked before the run; missing here means
            // the caller skipped validation. Treat as unavailable.
            return Err(ConstraintViolation::new(
                ViolationKind::Specialist,
                format!("specialist `{spec_id}` not found"),
                &activity.id,
                date,
            ));
        };

        let start_min = minutes_of(start);
        let end_min = start_min + activity.duration_minutes as i32;
        let weekday = date.weekday().num_days_from_monday() as u8;

        let covered = spec.availability.iter().any(|block| {
            block.day_of_week == weekday
                && minutes_of(block.start_time) <= start_min
                && end_min <= minutes_of(block.end_time)
        });
        if !covered {
            return Err(ConstraintViolation::new(
                ViolationKind::Specialist,
                format!("{} is not working at this time", spec.name),
                &activity.id,
                date,
            ));
        }

        if spec.is_blacked_out(date) {
            return Err(ConstraintViolation::new(
                ViolationKind::Specialist,
                format!("{} is off on {date}", spec.name),
                &activity.id,
                date,
            ));
        }

        let concurrent = state.specialist_overlap_count(spec_id, date, start_min, end_min);
        if concurrent >= spec.max_concurrent_clients {
            return Err(ConstraintViolation::new(
                ViolationKind::Specialist,
                format!("{} is fully booked", spec.name),
                &activity.id,
                date,
            ));
        }

        Ok(())
    }

    /// Stage 3: equipment availability.
    ///
    /// While traveling, an item passes if it is portable or provided by
    /// the destination. At home, the item must be out of maintenance and
    /// under its concurrency cap.
    fn check_equipment(
        &self,
        activity: &Activity,
        date: NaiveDate,
        start: NaiveTime,
        state: &SchedulerState,
    ) -> Result<(), ConstraintViolation> {
        let trip = self.active_travel(date);
        let start_min = minutes_of(start);
        let end_min = start_min + activity.duration_minutes as i32;

        for eq_id in &activity.equipment_ids {
            let Some(eq) = self.equipment.get(eq_id) else {
                continue;
            };

            if let Some(trip) = trip {
                if !eq.is_portable && !trip.available_equipment_ids.contains(eq_id) {
                    return Err(ConstraintViolation::new(
                        ViolationKind::Equipment,
                        format!("{} not available during travel to {}", eq.name, trip.location),
                        &activity.id,
                        date,
                    ));
                }
                continue;
            }

            if eq.under_maintenance(date) {
                return Err(ConstraintViolation::new(
                    ViolationKind::Equipment,
                    format!("{} is under maintenance", eq.name),
                    &activity.id,
                    date,
                ));
            }

            let concurrent = state.equipment_overlap_count(eq_id, date, start_min, end_min);
            if concurrent >= eq.max_concurrent_users {
                return Err(ConstraintViolation::new(
                    ViolationKind::Equipment,
                    format!("{} is fully booked", eq.name),
                    &activity.id,
                    date,
                ));
            }
        }

        Ok(())
    }

    /// Stage 4: user overlap with prep-adjusted effective intervals.
    fn check_overlap(
        &self,
        activity: &Activity,
        date: NaiveDate,
        start: NaiveTime,
        state: &SchedulerState,
    ) -> Result<(), ConstraintViolation> {
        let start_min = minutes_of(start);
        let eff_start = start_min - activity.prep_minutes as i32;
        let eff_end = start_min + activity.duration_minutes as i32;

        for slot in state.slots_for(date) {
            if slot.overlaps_effective(eff_start, eff_end) {
                return Err(ConstraintViolation::new(
                    ViolationKind::Overlap,
                    format!("clashes with `{}` (prep included)", slot.activity_id),
                    &activity.id,
                    date,
                ));
            }
        }

        Ok(())
    }

    /// Stage 5: declared time window, inclusive on both ends.
    fn check_time_window(
        &self,
        activity: &Activity,
        date: NaiveDate,
        start: NaiveTime,
    ) -> Result<(), ConstraintViolation> {
        let (Some(win_start), Some(win_end)) =
            (activity.time_window_start, activity.time_window_end)
        else {
            return Ok(());
        };

        let start_min = minutes_of(start);
        if start_min < minutes_of(win_start) {
            return Err(ConstraintViolation::new(
                ViolationKind::TimeWindow,
                "starts before the allowed window",
                &activity.id,
                date,
            ));
        }

        if start_min + activity.duration_minutes as i32 > minutes_of(win_end) {
            return Err(ConstraintViolation::new(
                ViolationKind::TimeWindow,
                "ends after the allowed window",
                &activity.id,
                date,
            ));
        }

        Ok(())
    }
}
