//! Supply-side models: specialists, equipment, and travel periods.
//!
//! Specialists are human resources with weekly shifts and blackout
//! dates. Equipment items are physical resources with maintenance
//! windows; portable items travel with the user. Travel periods are
//! context modifiers that override normal availability.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Categories of human resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialistType {
    Trainer,
    Dietitian,
    Therapist,
    Physician,
    AlliedHealth,
}

/// A weekly shift during which a specialist is working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityBlock {
    /// Weekday index (0 = Monday .. 6 = Sunday).
    pub day_of_week: u8,
    /// Shift start.
    pub start_time: NaiveTime,
    /// Shift end.
    pub end_time: NaiveTime,
}

impl AvailabilityBlock {
    /// Creates a shift on the given weekday.
    pub fn new(day_of_week: u8, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            day_of_week,
            start_time,
            end_time,
        }
    }
}

/// A human resource with weekly operating hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialist {
    /// Unique identifier.
    pub id: String,
    /// Name of the professional.
    pub name: String,
    /// Role category.
    pub specialist_type: SpecialistType,
    /// Standard weekly shifts.
    pub availability: Vec<AvailabilityBlock>,
    /// Specific dates of unavailability (holidays, sick leave).
    pub blackout_dates: Vec<NaiveDate>,
    /// How many clients can be seen simultaneously.
    pub max_concurrent_clients: u32,
}

impl Specialist {
    /// Creates a specialist with no shifts and capacity 1.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        specialist_type: SpecialistType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            specialist_type,
            availability: Vec::new(),
            blackout_dates: Vec::new(),
            max_concurrent_clients: 1,
        }
    }

    /// Adds a weekly shift.
    pub fn with_shift(mut self, day_of_week: u8, start: NaiveTime, end: NaiveTime) -> Self {
        self.availability
            .push(AvailabilityBlock::new(day_of_week, start, end));
        self
    }

    /// Adds a blackout date.
    pub fn with_blackout(mut self, date: NaiveDate) -> Self {
        self.blackout_dates.push(date);
        self
    }

    /// Sets the concurrent client capacity.
    pub fn with_capacity(mut self, max_concurrent_clients: u32) -> Self {
        self.max_concurrent_clients = max_concurrent_clients;
        self
    }

    /// Whether the specialist is off on the given date.
    pub fn is_blacked_out(&self, date: NaiveDate) -> bool {
        self.blackout_dates.contains(&date)
    }
}

/// An inclusive date range during which equipment is being serviced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl MaintenanceWindow {
    /// Creates a maintenance window over `[start_date, end_date]`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Whether the window covers the given date.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// A physical resource.
///
/// Portable items (bands, mats) travel with the user and remain
/// usable away from home; fixed items (treadmills, chambers) do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name, e.g. "Hyperbaric Chamber".
    pub name: String,
    /// Where the item normally lives.
    pub location: String,
    /// Whether the user can take this item along when traveling.
    pub is_portable: bool,
    /// Periods of unavailability.
    pub maintenance_windows: Vec<MaintenanceWindow>,
    /// How many users can share the item simultaneously.
    pub max_concurrent_users: u32,
}

impl Equipment {
    /// Creates a fixed (non-portable) equipment item with capacity 1.
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            is_portable: false,
            maintenance_windows: Vec::new(),
            max_concurrent_users: 1,
        }
    }

    /// Marks the item as portable.
    pub fn portable(mut self) -> Self {
        self.is_portable = true;
        self
    }

    /// Adds a maintenance window.
    pub fn with_maintenance(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.maintenance_windows.push(MaintenanceWindow::new(start, end));
        self
    }

    /// Sets the concurrent user capacity.
    pub fn with_capacity(mut self, max_concurrent_users: u32) -> Self {
        self.max_concurrent_users = max_concurrent_users;
        self
    }

    /// Whether the item is being serviced on the given date.
    pub fn under_maintenance(&self, date: NaiveDate) -> bool {
        self.maintenance_windows.iter().any(|w| w.contains(date))
    }
}

/// A period during which the user is away from home.
///
/// Overrides standard availability: strictly-remote trips forbid any
/// facility use, while ordinary trips may provide a subset of equipment
/// at the destination (the hotel gym).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelPeriod {
    /// Unique identifier.
    pub id: String,
    /// Destination name.
    pub location: String,
    /// First day away (inclusive).
    pub start_date: NaiveDate,
    /// Last day away (inclusive).
    pub end_date: NaiveDate,
    /// If true, strictly forbids physical facility usage (detox trip).
    pub remote_activities_only: bool,
    /// Equipment ids available at the destination.
    pub available_equipment_ids: Vec<String>,
}

impl TravelPeriod {
    /// Creates a travel period over `[start_date, end_date]`.
    pub fn new(
        id: impl Into<String>,
        location: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            start_date,
            end_date,
            remote_activities_only: false,
            available_equipment_ids: Vec::new(),
        }
    }

    /// Marks the trip as remote-only (no facilities).
    pub fn remote_only(mut self) -> Self {
        self.remote_activities_only = true;
        self
    }

    /// Declares an equipment item available at the destination.
    pub fn with_equipment(mut self, equipment_id: impl Into<String>) -> Self {
        self.available_equipment_ids.push(equipment_id.into());
        self
    }

    /// Whether the trip covers the given date.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_specialist_builder() {
        let spec = Specialist::new("spec_physio", "Sarah Jones", SpecialistType::AlliedHealth)
            .with_shift(0, t(9, 0), t(17, 0))
            .with_blackout(d(2025, 1, 6))
            .with_capacity(2);

        assert_eq!(spec.availability.len(), 1);
        assert_eq!(spec.availability[0].day_of_week, 0);
        assert!(spec.is_blacked_out(d(2025, 1, 6)));
        assert!(!spec.is_blacked_out(d(2025, 1, 7)));
        assert_eq!(spec.max_concurrent_clients, 2);
    }

    #[test]
    fn test_equipment_maintenance() {
        let eq = Equipment::new("equip_chamber", "Hyperbaric Chamber", "Clinic")
            .with_maintenance(d(2025, 1, 10), d(2025, 1, 12));

        assert!(!eq.is_portable);
        assert!(!eq.under_maintenance(d(2025, 1, 9)));
        assert!(eq.under_maintenance(d(2025, 1, 10)));
        assert!(eq.under_maintenance(d(2025, 1, 12)));
        assert!(!eq.under_maintenance(d(2025, 1, 13)));
    }

    #[test]
    fn test_equipment_portable() {
        let mat = Equipment::new("equip_mat", "Yoga Mat", "Home").portable();
        assert!(mat.is_portable);
        assert_eq!(mat.max_concurrent_users, 1);
    }

    #[test]
    fn test_travel_period() {
        let trip = TravelPeriod::new("trip_01", "Hotel Berlin", d(2025, 1, 6), d(2025, 1, 7))
            .with_equipment("equip_treadmill");

        assert!(trip.contains(d(2025, 1, 6)));
        assert!(trip.contains(d(2025, 1, 7)));
        assert!(!trip.contains(d(2025, 1, 8)));
        assert!(!trip.remote_activities_only);
        assert_eq!(trip.available_equipment_ids, vec!["equip_treadmill"]);

        let detox = TravelPeriod::new("trip_02", "Cabin", d(2025, 2, 1), d(2025, 2, 3)).remote_only();
        assert!(detox.remote_activities_only);
    }
}
