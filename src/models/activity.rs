//! Activity (demand) model.
//!
//! An activity is a recurring health task competing for calendar space:
//! a workout, a meal, a medication, a therapy session. Each activity
//! declares how often it must happen, how long it takes (including
//! preparation), which resources it needs, and which alternative
//! activities may stand in for it when it cannot be placed.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Categorization of health activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    Fitness,
    Food,
    Medication,
    Therapy,
    Consultation,
    Other,
}

/// Physical context where an activity can be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Home,
    Gym,
    Clinic,
    Outdoors,
    /// No location requirement.
    Any,
}

/// Recurrence pattern for an activity.
///
/// `count` is occurrences per period: at most 7 for `Weekly`,
/// at most 31 for `Monthly` (checked by input validation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyPattern {
    /// One occurrence every day of the horizon.
    Daily,
    /// `count` occurrences per ISO week.
    Weekly { count: u32 },
    /// `count` occurrences per calendar month.
    Monthly { count: u32 },
}

/// How often an activity should occur, with optional weekday preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    /// The recurrence pattern.
    pub pattern: FrequencyPattern,
    /// Preferred weekdays (0 = Monday .. 6 = Sunday). Weekly only;
    /// empty = no preference.
    pub preferred_days: Vec<u8>,
}

impl Frequency {
    /// Every day.
    pub fn daily() -> Self {
        Self {
            pattern: FrequencyPattern::Daily,
            preferred_days: Vec::new(),
        }
    }

    /// `count` times per ISO week.
    pub fn weekly(count: u32) -> Self {
        Self {
            pattern: FrequencyPattern::Weekly { count },
            preferred_days: Vec::new(),
        }
    }

    /// `count` times per calendar month.
    pub fn monthly(count: u32) -> Self {
        Self {
            pattern: FrequencyPattern::Monthly { count },
            preferred_days: Vec::new(),
        }
    }

    /// Sets preferred weekdays (0 = Monday .. 6 = Sunday).
    pub fn with_preferred_days(mut self, days: Vec<u8>) -> Self {
        self.preferred_days = days;
        self
    }
}

/// A recurring health task to be scheduled.
///
/// Timing, resource requirements, and the ordered fallback chain used
/// when the primary cannot be placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Category of the activity.
    pub activity_type: ActivityType,
    /// Priority level (1 = critical, 5 = optional).
    pub priority: u8,
    /// Duration of the activity itself, in minutes (>= 10).
    pub duration_minutes: u32,
    /// Minutes reserved immediately before the start (travel, setup).
    pub prep_minutes: u32,
    /// Recurrence configuration.
    pub frequency: Frequency,
    /// Required specialist, if any.
    pub specialist_id: Option<String>,
    /// Required equipment items.
    pub equipment_ids: Vec<String>,
    /// Required location context.
    pub location: Location,
    /// Whether the activity can be performed remotely (e.g. while traveling).
    pub remote_capable: bool,
    /// Earliest allowed start time (inclusive). Paired with `time_window_end`.
    pub time_window_start: Option<NaiveTime>,
    /// Latest allowed end time (inclusive). Paired with `time_window_start`.
    pub time_window_end: Option<NaiveTime>,
    /// Ordered alternative activity ids to attempt when this one
    /// cannot be placed.
    pub backup_activity_ids: Vec<String>,
}

impl Activity {
    /// Creates a new activity with the given identity and cadence.
    ///
    /// Defaults: home location, no resources, no time window, no backups,
    /// no preparation time, not remote-capable.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        activity_type: ActivityType,
        priority: u8,
        duration_minutes: u32,
        frequency: Frequency,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            activity_type,
            priority,
            duration_minutes,
            prep_minutes: 0,
            frequency,
            specialist_id: None,
            equipment_ids: Vec::new(),
            location: Location::Home,
            remote_capable: false,
            time_window_start: None,
            time_window_end: None,
            backup_activity_ids: Vec::new(),
        }
    }

    /// Sets the preparation time in minutes.
    pub fn with_prep(mut self, prep_minutes: u32) -> Self {
        self.prep_minutes = prep_minutes;
        self
    }

    /// Requires a specialist.
    pub fn with_specialist(mut self, specialist_id: impl Into<String>) -> Self {
        self.specialist_id = Some(specialist_id.into());
        self
    }

    /// Requires an equipment item.
    pub fn with_equipment(mut self, equipment_id: impl Into<String>) -> Self {
        self.equipment_ids.push(equipment_id.into());
        self
    }

    /// Sets the location requirement.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Marks the activity as performable remotely.
    pub fn remote_capable(mut self) -> Self {
        self.remote_capable = true;
        self
    }

    /// Constrains starts to a daily time window (inclusive-inclusive).
    pub fn with_time_window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.time_window_start = Some(start);
        self.time_window_end = Some(end);
        self
    }

    /// Appends a backup activity id to the fallback chain.
    pub fn with_backup(mut self, backup_id: impl Into<String>) -> Self {
        self.backup_activity_ids.push(backup_id.into());
        self
    }

    /// Whether this activity requires any physical resource.
    pub fn requires_resources(&self) -> bool {
        self.specialist_id.is_some() || !self.equipment_ids.is_empty()
    }
}
