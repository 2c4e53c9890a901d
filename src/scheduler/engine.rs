//! The adaptive scheduling engine.
//!
//! Turns recurring demand into a concrete calendar through a
//! deterministic greedy pipeline:
//!
//! 1. **Demand expansion** — frequencies become concrete demand
//!    instances, one per expected occurrence, sorted by priority, then
//!    deadline, then activity id.
//! 2. **Placement ladder** — per instance: the primary activity in its
//!    natural window (Tier 1), then the fallback chain (Tier 2), then
//!    the primary again in a window widened by one period (Tier 3,
//!    "liquid" overflow for weekly and monthly demand). A missed daily
//!    occurrence is a hard miss.
//! 3. **Commit** — candidate starts are filtered by the constraint
//!    checker, ranked by the slot scorer, and the winner is committed to
//!    the ledger.
//!
//! Daily priority-capacity quotas keep optional demand from flooding a
//! day before critical demand is served. The whole run is synchronous
//! and single-threaded: identical inputs produce identical output.
//!
//! # Complexity
//! O(I × W × T) where I = demand instances, W = search-window days, and
//! T = candidate starts per day (≈ 14 on the anchor grid).

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::models::{
    time_from_minutes, Activity, Equipment, FrequencyPattern, SlotStatus, Specialist, TimeSlot,
    TravelPeriod,
};
use crate::scheduler::constraints::{ConstraintChecker, ConstraintViolation, ViolationKind};
use crate::scheduler::scoring::{ScorerWeights, SlotScorer};
use crate::scheduler::state::{DayContext, LoadIntensity, SchedulerState};
use crate::validation::{validate_inputs, ValidationError};

/// Minutes in a civil day.
const MINUTES_PER_DAY: i32 = 24 * 60;

/// Tunable parameters of a scheduling run. The defaults are the
/// engine's contract; overriding them is for experimentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fraction of the day each priority tier may occupy
    /// (index = priority - 1).
    pub capacity_factors: [f64; 5],
    /// Candidate start times used when an activity has no time window.
    pub anchor_times: Vec<NaiveTime>,
    /// Step between candidate starts inside a time window.
    pub candidate_step_minutes: u32,
    /// Soft-preference scoring weights.
    pub scorer_weights: ScorerWeights,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let anchor = |h: u32| NaiveTime::from_hms_opt(h, 0, 0).expect("anchor hour in range");
        Self {
            capacity_factors: [1.00, 0.80, 0.60, 0.50, 0.40],
            anchor_times: [6, 7, 8, 9, 12, 14, 17, 18, 19, 20]
                .into_iter()
                .map(anchor)
                .collect(),
            candidate_step_minutes: 15,
            scorer_weights: ScorerWeights::default(),
        }
    }
}

/// Everything a scheduling run consumes.
///
/// `activities` generate demand. `backup_pool` holds reserve-only
/// activities: they are resolvable from backup chains but expand no
/// demand of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerInputs {
    /// First day of the horizon.
    pub start_date: NaiveDate,
    /// Horizon length in days.
    pub horizon_days: u32,
    /// Demand-generating activities.
    pub activities: Vec<Activity>,
    /// Reserve-only activities referenced by backup chains.
    pub backup_pool: Vec<Activity>,
    /// Human resources.
    pub specialists: Vec<Specialist>,
    /// Physical resources.
    pub equipment: Vec<Equipment>,
    /// Periods the user is away from home.
    pub travel_periods: Vec<TravelPeriod>,
    /// Engine parameters.
    pub config: SchedulerConfig,
}

impl SchedulerInputs {
    /// Creates empty inputs over the given horizon.
    pub fn new(start_date: NaiveDate, horizon_days: u32) -> Self {
        Self {
            start_date,
            horizon_days,
            activities: Vec::new(),
            backup_pool: Vec::new(),
            specialists: Vec::new(),
            equipment: Vec::new(),
            travel_periods: Vec::new(),
            config: SchedulerConfig::default(),
        }
    }

    /// Sets the demand-generating activities.
    pub fn with_activities(mut self, activities: Vec<Activity>) -> Self {
        self.activities = activities;
        self
    }

    /// Sets the reserve-only backup activities.
    pub fn with_backup_pool(mut self, backup_pool: Vec<Activity>) -> Self {
        self.backup_pool = backup_pool;
        self
    }

    /// Sets the specialists.
    pub fn with_specialists(mut self, specialists: Vec<Specialist>) -> Self {
        self.specialists = specialists;
        self
    }

    /// Sets the equipment.
    pub fn with_equipment(mut self, equipment: Vec<Equipment>) -> Self {
        self.equipment = equipment;
        self
    }

    /// Sets the travel periods.
    pub fn with_travel_periods(mut self, travel_periods: Vec<TravelPeriod>) -> Self {
        self.travel_periods = travel_periods;
        self
    }

    /// Overrides the engine parameters.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }
}

/// Validates the inputs and executes a scheduling run.
///
/// This is the single entry point of the crate: validation failures
/// abort before any state is produced, and a successful run returns the
/// fully populated ledger.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use vita_schedule::models::{Activity, ActivityType, Frequency};
/// use vita_schedule::scheduler::{run, SchedulerInputs};
///
/// let stretch = Activity::new(
///     "act_stretch",
///     "Morning Stretch",
///     ActivityType::Fitness,
///     3,
///     15,
///     Frequency::daily(),
/// );
/// let inputs = SchedulerInputs::new(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), 7)
///     .with_activities(vec![stretch]);
///
/// let state = run(inputs).unwrap();
/// assert_eq!(state.occurrence_count("act_stretch"), 7);
/// ```
pub fn run(inputs: SchedulerInputs) -> Result<SchedulerState, Vec<ValidationError>> {
    validate_inputs(
        &inputs.activities,
        &inputs.backup_pool,
        &inputs.specialists,
        &inputs.equipment,
        &inputs.travel_periods,
    )?;
    Ok(AdaptiveScheduler::new(inputs).run())
}

/// One expected occurrence of an activity in a concrete period.
#[derive(Debug, Clone)]
struct DemandInstance {
    activity_id: String,
    priority: u8,
    pattern: FrequencyPattern,
    preferred_days: Vec<u8>,
    /// First day of the (horizon-clipped) natural period.
    search_start: NaiveDate,
    /// The occurrence's own deadline within the period.
    target: NaiveDate,
    /// Last day of the natural period, unclipped; base for widening.
    period_end: NaiveDate,
    /// Position within the period, for deterministic ordering.
    occurrence: u32,
}

/// Main scheduling engine. Consumes validated inputs, produces a ledger.
pub struct AdaptiveScheduler {
    activities: Vec<Activity>,
    activity_map: BTreeMap<String, Activity>,
    checker: ConstraintChecker,
    scorer: SlotScorer,
    state: SchedulerState,
    start_date: NaiveDate,
    end_date: NaiveDate,
    /// Per-priority daily minute caps derived from the capacity factors.
    capacity_caps: [u32; 5],
    anchor_minutes: Vec<i32>,
    step_minutes: i32,
}

impl AdaptiveScheduler {
    /// Builds an engine from validated inputs.
    pub fn new(inputs: SchedulerInputs) -> Self {
        let activity_map = inputs
            .activities
            .iter()
            .chain(inputs.backup_pool.iter())
            .map(|a| (a.id.clone(), a.clone()))
            .collect();

        let mut capacity_caps = [0u32; 5];
        for (cap, factor) in capacity_caps.iter_mut().zip(inputs.config.capacity_factors) {
            *cap = (factor * MINUTES_PER_DAY as f64).round() as u32;
        }

        Self {
            checker: ConstraintChecker::new(
                &inputs.specialists,
                &inputs.equipment,
                &inputs.travel_periods,
            ),
            scorer: SlotScorer::new(inputs.config.scorer_weights.clone()),
            state: SchedulerState::new(),
            start_date: inputs.start_date,
            end_date: inputs.start_date + Duration::days(i64::from(inputs.horizon_days) - 1),
            capacity_caps,
            anchor_minutes: inputs
                .config
                .anchor_times
                .iter()
                .map(|t| crate::models::minutes_of(*t))
                .collect(),
            step_minutes: inputs.config.candidate_step_minutes as i32,
            activity_map,
            activities: inputs.activities,
        }
    }

    /// Executes the run and returns the populated ledger.
    pub fn run(mut self) -> SchedulerState {
        info!(
            "adaptive scheduling run: {} activities, {} to {}",
            self.activities.len(),
            self.start_date,
            self.end_date
        );

        let instances = self.expand_demand();
        for inst in &instances {
            self.state.record_demand(inst.priority);
        }

        let total = instances.len();
        let mut placed = 0usize;
        for inst in instances {
            if self.serve(&inst) {
                self.state.record_fulfilled(inst.priority);
                placed += 1;
            } else {
                debug!(
                    "demand exhausted: `{}` occurrence {} targeting {}",
                    inst.activity_id, inst.occurrence, inst.target
                );
                self.state.record_failure(
                    &inst.activity_id,
                    ConstraintViolation::new(
                        ViolationKind::Exhaustion,
                        "all placement attempts failed",
                        &inst.activity_id,
                        inst.target,
                    ),
                );
            }
        }

        self.finalize_day_contexts();
        info!("run complete: {placed}/{total} demand instances placed");
        self.state
    }

    /// Flattens frequencies into concrete demand instances and sorts
    /// them into the processing order: priority, then period start, then
    /// activity id, then occurrence.
    fn expand_demand(&self) -> Vec<DemandInstance> {
        let mut instances = Vec::new();

        for activity in &self.activities {
            match activity.frequency.pattern {
                FrequencyPattern::Daily => {
                    let mut date = self.start_date;
                    while date <= self.end_date {
                        instances.push(DemandInstance {
                            activity_id: activity.id.clone(),
                            priority: activity.priority,
                            pattern: activity.frequency.pattern,
                            preferred_days: Vec::new(),
                            search_start: date,
                            target: date,
                            period_end: date,
                            occurrence: 0,
                        });
                        date += Duration::days(1);
                    }
                }
                FrequencyPattern::Weekly { count } => {
                    let mut preferred = activity.frequency.preferred_days.clone();
                    preferred.sort_unstable();
                    preferred.dedup();

                    let mut monday = self.start_date
                        - Duration::days(
                            i64::from(self.start_date.weekday().num_days_from_monday()),
                        );
                    while monday <= self.end_date {
                        let sunday = monday + Duration::days(6);
                        let search_start = monday.max(self.start_date);
                        let window_end = sunday.min(self.end_date);
                        if search_start > window_end {
                            monday += Duration::days(7);
                            continue;
                        }

                        for occurrence in 0..count {
                            let target = if preferred.is_empty() {
                                search_start + Duration::days(i64::from(occurrence))
                            } else {
                                let weekday =
                                    preferred[occurrence as usize % preferred.len()];
                                monday + Duration::days(i64::from(weekday))
                            };
                            instances.push(DemandInstance {
                                activity_id: activity.id.clone(),
                                priority: activity.priority,
                                pattern: activity.frequency.pattern,
                                preferred_days: preferred.clone(),
                                search_start,
                                target: target.clamp(search_start, window_end),
                                period_end: sunday,
                                occurrence,
                            });
                        }
                        monday += Duration::days(7);
                    }
                }
                FrequencyPattern::Monthly { count } => {
                    let mut first = self
                        .start_date
                        .with_day(1)
                        .expect("day 1 exists in every month");
                    while first <= self.end_date {
                        let last = last_day_of_month(first);
                        let search_start = first.max(self.start_date);
                        let window_end = last.min(self.end_date);
                        if search_start > window_end {
                            break;
                        }

                        for occurrence in 0..count {
                            let target = search_start + Duration::days(i64::from(occurrence));
                            instances.push(DemandInstance {
                                activity_id: activity.id.clone(),
                                priority: activity.priority,
                                pattern: activity.frequency.pattern,
                                preferred_days: Vec::new(),
                                search_start,
                                target: target.clamp(search_start, window_end),
                                period_end: last,
                                occurrence,
                            });
                        }
                        first = first
                            .checked_add_months(Months::new(1))
                            .expect("horizon within representable dates");
                    }
                }
            }
        }

        instances.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.search_start.cmp(&b.search_start))
                .then_with(|| a.activity_id.cmp(&b.activity_id))
                .then_with(|| a.occurrence.cmp(&b.occurrence))
        });
        instances
    }

    /// Runs the placement ladder for one demand instance.
    fn serve(&mut self, inst: &DemandInstance) -> bool {
        let Some(primary) = self.activity_map.get(&inst.activity_id).cloned() else {
            warn!("demand instance references unknown activity `{}`", inst.activity_id);
            return false;
        };

        // Tier 1: primary in its natural window, up to the target day.
        if self.attempt_placement(
            &primary,
            &primary.id,
            inst.search_start,
            inst.target,
            &inst.preferred_days,
            false,
            None,
        ) {
            return true;
        }

        // Tier 2: the fallback chain, same window, travel immunity.
        for backup_id in &primary.backup_activity_ids {
            let Some(backup) = self.activity_map.get(backup_id).cloned() else {
                warn!("backup `{backup_id}` not found in activity pool");
                continue;
            };
            debug!("fallback triggered: `{}` -> `{}`", primary.name, backup.name);
            if self.attempt_placement(
                &backup,
                &primary.id,
                inst.search_start,
                inst.target,
                &inst.preferred_days,
                true,
                Some(primary.id.clone()),
            ) {
                return true;
            }
        }

        // Tier 3: liquid overflow into the next period, primary only.
        if matches!(
            inst.pattern,
            FrequencyPattern::Weekly { .. } | FrequencyPattern::Monthly { .. }
        ) {
            let widened_end = self.widened_end(inst);
            if self.attempt_placement(
                &primary,
                &primary.id,
                inst.search_start,
                widened_end,
                &[],
                false,
                None,
            ) {
                return true;
            }
        }

        false
    }

    /// Tries each day of `[from, to]` in order and commits the
    /// best-scoring legal candidate of the first day that has one.
    ///
    /// Days already carrying a commitment for this demand are skipped:
    /// one occurrence of an activity per day.
    #[allow(clippy::too_many_arguments)]
    fn attempt_placement(
        &mut self,
        activity: &Activity,
        demand_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        preferred_days: &[u8],
        is_backup: bool,
        original_id: Option<String>,
    ) -> bool {
        let mut date = from;
        while date <= to {
            let day = date;
            date += Duration::days(1);

            if !preferred_days.is_empty() {
                let weekday = day.weekday().num_days_from_monday() as u8;
                if !preferred_days.contains(&weekday) {
                    continue;
                }
            }

            if self.state.day_has_commitment(day, demand_id, &activity.id) {
                continue;
            }

            if !self.quota_allows(day, activity.priority, activity.duration_minutes) {
                self.state.record_failure(
                    demand_id,
                    ConstraintViolation::new(
                        ViolationKind::Capacity,
                        format!("daily capacity quota reached for priority {}", activity.priority),
                        &activity.id,
                        day,
                    ),
                );
                continue;
            }

            // Best candidate on this day: highest score, then earliest
            // start, then enumeration order.
            let mut best: Option<(i32, i32)> = None;
            for start_min in self.candidate_times(activity, day) {
                let start = time_from_minutes(start_min);
                match self.checker.check(activity, day, start, &self.state, is_backup) {
                    Err(violation) => self.state.record_failure(demand_id, violation),
                    Ok(()) => {
                        let score = self.scorer.score(activity, day, start, &self.state);
                        let better = match best {
                            None => true,
                            Some((s, t)) => score > s || (score == s && start_min < t),
                        };
                        if better {
                            best = Some((score, start_min));
                        }
                    }
                }
            }

            if let Some((score, start_min)) = best {
                debug!(
                    "committing `{}` on {} at {} (score {})",
                    activity.id,
                    day,
                    time_from_minutes(start_min),
                    score
                );
                self.state.add_booking(TimeSlot {
                    activity_id: activity.id.clone(),
                    priority: activity.priority,
                    date: day,
                    start_time: time_from_minutes(start_min),
                    duration_minutes: activity.duration_minutes,
                    prep_minutes: activity.prep_minutes,
                    specialist_id: activity.specialist_id.clone(),
                    equipment_ids: activity.equipment_ids.clone(),
                    is_backup,
                    original_activity_id: original_id.clone(),
                    status: SlotStatus::Scheduled,
                });
                return true;
            }
        }

        false
    }

    /// Candidate start times for an activity on a date, in minutes from
    /// midnight, deduplicated with order preserved.
    fn candidate_times(&self, activity: &Activity, date: NaiveDate) -> Vec<i32> {
        let duration = activity.duration_minutes as i32;
        let mut raw = Vec::new();

        if let (Some(win_start), Some(win_end)) =
            (activity.time_window_start, activity.time_window_end)
        {
            let lo = crate::models::minutes_of(win_start);
            let hi = crate::models::minutes_of(win_end);
            let mut t = lo;
            while t + duration <= hi {
                raw.push(t);
                t += self.step_minutes;
            }
        } else {
            raw.extend(self.anchor_minutes.iter().copied());
        }

        // Batching candidates adjacent to existing bookings.
        for slot in self.state.slots_for(date) {
            let after = slot.end_minutes();
            if (0..MINUTES_PER_DAY).contains(&after) {
                raw.push(after);
            }
            let before = slot.start_minutes() - duration - activity.prep_minutes as i32;
            if (0..MINUTES_PER_DAY).contains(&before) {
                raw.push(before);
            }
        }

        let mut times: Vec<i32> = Vec::with_capacity(raw.len());
        for t in raw {
            if !times.contains(&t) {
                times.push(t);
            }
        }
        times
    }

    /// Whether committing `duration` minutes at `priority` on `date`
    /// keeps every priority-capacity quota intact. The cap for priority
    /// p bounds the minutes of all demand at priority p and below
    /// (numerically >= p).
    fn quota_allows(&self, date: NaiveDate, priority: u8, duration: u32) -> bool {
        let by_priority = self.state.day_priority_minutes(date);
        for p in 1..=priority {
            let used: u32 = (p..=5).map(|q| by_priority[(q - 1) as usize]).sum();
            if used + duration > self.capacity_caps[(p - 1) as usize] {
                return false;
            }
        }
        true
    }

    /// Last day of the Tier-3 search window: one period past the
    /// natural period end, clipped to the horizon.
    fn widened_end(&self, inst: &DemandInstance) -> NaiveDate {
        let widened = match inst.pattern {
            FrequencyPattern::Weekly { .. } => inst.period_end + Duration::days(7),
            FrequencyPattern::Monthly { .. } => {
                last_day_of_month(inst.period_end + Duration::days(1))
            }
            FrequencyPattern::Daily => inst.period_end,
        };
        widened.min(self.end_date)
    }

    /// Derives the per-day context map over the whole horizon.
    fn finalize_day_contexts(&mut self) {
        let mut date = self.start_date;
        while date <= self.end_date {
            let trip = self.checker.active_travel(date);
            let context = DayContext {
                is_traveling: trip.is_some(),
                location: trip.map(|t| t.location.clone()),
                load: LoadIntensity::from_minutes(self.state.day_minutes(date)),
            };
            self.state.day_contexts.insert(date, context);
            date += Duration::days(1);
        }
    }
}

/// Last day of the month containing `date`.
fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).expect("day 1 exists in every month");
    first
        .checked_add_months(Months::new(1))
        .expect("horizon within representable dates")
        - Duration::days(1)
}
