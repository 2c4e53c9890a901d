//! Soft-preference scoring for legal candidate slots.
//!
//! Hard constraints are binary; this module provides the gradient. Every
//! candidate that survives the checker is scored on a 0..=100 scale and
//! the orchestrator commits the best one. Components:
//!
//! - **Time-window fidelity** — prefer the center of the declared window
//!   (parabolic curve, the only floating-point math in the engine).
//! - **Habit** — reward repeating an activity on its established weekday.
//! - **Clustering** — reward back-to-back placement, nudge against
//!   isolated islands that fragment the day.
//! - **Resilience buffer** — reward a modest gap after the preceding
//!   booking, penalise gaps too tight to absorb a delay.
//!
//! All gap math uses prep-adjusted effective intervals in integer minutes.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::{minutes_of, Activity};
use crate::scheduler::state::SchedulerState;

/// Base score before any component is applied.
pub const BASE_SCORE: i32 = 50;

/// Component weights for the slot scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerWeights {
    /// Maximum bonus for a perfectly centered window placement.
    pub window_fit_max: i32,
    /// Bonus when the activity ran on this weekday twice or more.
    pub habit_established: i32,
    /// Bonus when the activity ran on this weekday exactly once.
    pub habit_emerging: i32,
    /// Bonus for placing within 15 minutes of a neighbouring booking.
    pub cluster_bonus: i32,
    /// Penalty for creating an isolated booking (both gaps >= 60 min).
    pub island_penalty: i32,
    /// Bonus for a 15-45 minute gap after the preceding booking.
    pub buffer_bonus: i32,
    /// Penalty for under 15 minutes after the preceding booking.
    pub buffer_penalty: i32,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            window_fit_max: 20,
            habit_established: 10,
            habit_emerging: 5,
            cluster_bonus: 15,
            island_penalty: 5,
            buffer_bonus: 10,
            buffer_penalty: 10,
        }
    }
}

/// Evaluates legal candidate slots against soft preferences.
#[derive(Debug, Clone, Default)]
pub struct SlotScorer {
    weights: ScorerWeights,
}

impl SlotScorer {
    /// Creates a scorer with the given weights.
    pub fn new(weights: ScorerWeights) -> Self {
        Self { weights }
    }

    /// Scores a legal candidate. Returns a value in 0..=100.
    pub fn score(
        &self,
        activity: &Activity,
        date: NaiveDate,
        start: NaiveTime,
        state: &SchedulerState,
    ) -> i32 {
        let start_min = minutes_of(start);

        let mut score = BASE_SCORE;
        score += self.window_fit(activity, start_min);
        score += self.habit(activity, date, state);

        let (gap_before, gap_after) = self.neighbour_gaps(activity, date, start_min, state);
        score += self.clustering(date, gap_before, gap_after, state);
        score += self.buffer(gap_before);

        score.clamp(0, 100)
    }

    /// Parabolic window fidelity: full bonus at the window center,
    /// zero at the edges of the feasible start range.
    fn window_fit(&self, activity: &Activity, start_min: i32) -> i32 {
        let (Some(win_start), Some(win_end)) =
            (activity.time_window_start, activity.time_window_end)
        else {
            return 0;
        };

        let lo = minutes_of(win_start);
        let span = minutes_of(win_end) - lo - activity.duration_minutes as i32;
        if span <= 0 {
            // Exactly one feasible start; it is the center by definition.
            return self.weights.window_fit_max;
        }

        let pos = (start_min - lo) as f64 / span as f64;
        let fit = 1.0 - 4.0 * (pos - 0.5).powi(2);
        (self.weights.window_fit_max as f64 * fit).round() as i32
    }

    /// Weekday habit: how often has this activity run on this weekday?
    fn habit(&self, activity: &Activity, date: NaiveDate, state: &SchedulerState) -> i32 {
        let weekday = date.weekday().num_days_from_monday() as usize;
        match state.weekday_count(&activity.id, weekday) {
            0 => 0,
            1 => self.weights.habit_emerging,
            _ => self.weights.habit_established,
        }
    }

    /// Effective-interval gaps to the nearest bookings before and after
    /// the candidate on its date. `None` when no neighbour exists on
    /// that side.
    fn neighbour_gaps(
        &self,
        activity: &Activity,
        date: NaiveDate,
        start_min: i32,
        state: &SchedulerState,
    ) -> (Option<i32>, Option<i32>) {
        let cand_start = start_min - activity.prep_minutes as i32;
        let cand_end = start_min + activity.duration_minutes as i32;

        let mut before: Option<i32> = None;
        let mut after: Option<i32> = None;

        for slot in state.slots_for(date) {
            let eff_start = slot.effective_start_minutes();
            let eff_end = slot.end_minutes();

            if eff_end <= cand_start {
                let gap = cand_start - eff_end;
                before = Some(before.map_or(gap, |g: i32| g.min(gap)));
            } else if eff_start >= cand_end {
                let gap = eff_start - cand_end;
                after = Some(after.map_or(gap, |g: i32| g.min(gap)));
            }
        }

        (before, after)
    }

    /// Clustering: tight adjacency earns the bonus, an island (both
    /// sides open by an hour or more) takes the penalty. An empty day
    /// is neutral.
    fn clustering(
        &self,
        date: NaiveDate,
        gap_before: Option<i32>,
        gap_after: Option<i32>,
        state: &SchedulerState,
    ) -> i32 {
        if state.slots_for(date).is_empty() {
            return 0;
        }

        let before = gap_before.unwrap_or(i32::MAX);
        let after = gap_after.unwrap_or(i32::MAX);

        if before.min(after) < 15 {
            self.weights.cluster_bonus
        } else if before >= 60 && after >= 60 {
            -self.weights.island_penalty
        } else {
            0
        }
    }

    /// Resilience buffer, judged on the preceding gap only: that is
    /// where delays cascade from.
    fn buffer(&self, gap_before: Option<i32>) -> i32 {
        match gap_before {
            Some(gap) if gap < 15 => -self.weights.buffer_penalty,
            Some(gap) if gap <= 45 => self.weights.buffer_bonus,
            _ => 0,
        }
    }
}
