//! Committed time slots.
//!
//! A `TimeSlot` is a block of calendar time the engine has booked for a
//! specific activity, including the preparation time reserved
//! immediately before the start.
//!
//! # Time model
//! All interval arithmetic is minute-precision integers counted from
//! midnight of the slot's date. The *effective interval* of a slot is
//! `[start - prep, start + duration)`: preparation blocks the user just
//! as the activity itself does.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Status of a committed slot.
///
/// The engine only ever emits `Scheduled`; the remaining states exist
/// for downstream consumers that track execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

/// A committed block of time for a specific activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Activity effectively scheduled in this slot.
    pub activity_id: String,
    /// Priority copied from the scheduled activity.
    pub priority: u8,
    /// Calendar date.
    pub date: chrono::NaiveDate,
    /// Start time of the activity itself (prep precedes this).
    pub start_time: NaiveTime,
    /// Duration of the activity in minutes.
    pub duration_minutes: u32,
    /// Minutes reserved immediately prior to `start_time`.
    pub prep_minutes: u32,
    /// Assigned specialist, if any.
    pub specialist_id: Option<String>,
    /// Assigned equipment items.
    pub equipment_ids: Vec<String>,
    /// True if this slot was booked as a fallback for another activity.
    pub is_backup: bool,
    /// The primary activity this slot replaces. Set iff `is_backup`.
    pub original_activity_id: Option<String>,
    /// Current state of the slot.
    pub status: SlotStatus,
}

impl TimeSlot {
    /// Start of the activity in minutes from midnight.
    #[inline]
    pub fn start_minutes(&self) -> i32 {
        minutes_of(self.start_time)
    }

    /// Start of the effective interval (prep included), minutes from
    /// midnight. May be negative when prep reaches past midnight.
    #[inline]
    pub fn effective_start_minutes(&self) -> i32 {
        self.start_minutes() - self.prep_minutes as i32
    }

    /// End of the activity (exclusive), minutes from midnight.
    #[inline]
    pub fn end_minutes(&self) -> i32 {
        self.start_minutes() + self.duration_minutes as i32
    }

    /// Whether this slot's effective interval intersects
    /// `[other_start, other_end)` on the same date.
    #[inline]
    pub fn overlaps_effective(&self, other_start: i32, other_end: i32) -> bool {
        other_start < self.end_minutes() && self.effective_start_minutes() < other_end
    }

    /// The activity this slot earns credit for: the replaced primary
    /// for backup slots, the slot's own activity otherwise.
    pub fn credited_activity_id(&self) -> &str {
        self.original_activity_id
            .as_deref()
            .unwrap_or(&self.activity_id)
    }
}

/// Minutes from midnight for a wall-clock time. Seconds are dropped.
#[inline]
pub fn minutes_of(time: NaiveTime) -> i32 {
    (time.hour() * 60 + time.minute()) as i32
}

/// Wall-clock time for minutes from midnight. `minutes` must lie in
/// `0..1440`.
#[inline]
pub fn time_from_minutes(minutes: i32) -> NaiveTime {
    debug_assert!((0..1440).contains(&minutes));
    NaiveTime::from_hms_opt(minutes as u32 / 60, minutes as u32 % 60, 0)
        .expect("minute offset within a single day")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(start: (u32, u32), duration: u32, prep: u32) -> TimeSlot {
        TimeSlot {
            activity_id: "act".into(),
            priority: 3,
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            duration_minutes: duration,
            prep_minutes: prep,
            specialist_id: None,
            equipment_ids: Vec::new(),
            is_backup: false,
            original_activity_id: None,
            status: SlotStatus::Scheduled,
        }
    }

    #[test]
    fn test_minute_conversions() {
        let t = NaiveTime::from_hms_opt(7, 45, 0).unwrap();
        assert_eq!(minutes_of(t), 465);
        assert_eq!(time_from_minutes(465), t);
        assert_eq!(minutes_of(time_from_minutes(0)), 0);
        assert_eq!(minutes_of(time_from_minutes(1439)), 1439);
    }

    #[test]
    fn test_effective_interval() {
        let s = slot((9, 30), 60, 15);
        assert_eq!(s.effective_start_minutes(), 9 * 60 + 15);
        assert_eq!(s.end_minutes(), 10 * 60 + 30);
    }

    #[test]
    fn test_overlap_detection() {
        // 09:30 + 60 with 15 prep -> effective [09:15, 10:30)
        let s = slot((9, 30), 60, 15);

        // [10:00, 10:30) intersects
        assert!(s.overlaps_effective(600, 630));
        // [10:30, 11:00) touches the end: no overlap
        assert!(!s.overlaps_effective(630, 660));
        // [09:00, 09:15) touches the prep start: no overlap
        assert!(!s.overlaps_effective(540, 555));
        // [09:00, 09:16) intersects the prep block
        assert!(s.overlaps_effective(540, 556));
    }

    #[test]
    fn test_credited_activity() {
        let mut s = slot((8, 0), 30, 0);
        assert_eq!(s.credited_activity_id(), "act");

        s.is_backup = true;
        s.original_activity_id = Some("primary".into());
        assert_eq!(s.credited_activity_id(), "primary");
    }
}
