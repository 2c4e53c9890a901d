//! Scheduling domain models.
//!
//! The demand side (`Activity`, `Frequency`), the supply side
//! (`Specialist`, `Equipment`, `TravelPeriod`), and the output side
//! (`TimeSlot`) of the adaptive scheduling engine.
//!
//! All types are plain values: created once before a run, immutable
//! throughout, and serde-serializable for downstream consumers.

mod activity;
mod resource;
mod slot;

pub use activity::{Activity, ActivityType, Frequency, FrequencyPattern, Location};
pub use resource::{
    AvailabilityBlock, Equipment, MaintenanceWindow, Specialist, SpecialistType, TravelPeriod,
};
pub use slot::{minutes_of, time_from_minutes, SlotStatus, TimeSlot};
