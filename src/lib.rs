//! Adaptive scheduling engine for recurring personal health activities.
//!
//! Builds a multi-week calendar from recurring activities, human and
//! equipment resources, and travel periods. The engine is a
//! deterministic greedy placer with weekly-quota ("liquid") semantics
//! and a backup-chain resilience loop: demand that cannot be placed in
//! its natural period falls back to alternative activities, then floats
//! into the next period, and only then surfaces as a terminal failure.
//!
//! # Modules
//!
//! - **`models`**: domain value types — `Activity`, `Frequency`,
//!   `Specialist`, `Equipment`, `TravelPeriod`, `TimeSlot`
//! - **`validation`**: pre-run input integrity checks (id references,
//!   value ranges, backup-chain acyclicity)
//! - **`scheduler`**: the engine — orchestrator, constraint checker,
//!   slot scorer, and the state ledger
//!
//! # Entry point
//!
//! [`scheduler::run`] consumes a [`scheduler::SchedulerInputs`] bundle
//! and returns the populated [`scheduler::SchedulerState`]: the booked
//! calendar plus a forensic record of everything that could not be
//! placed and why. Two runs over identical inputs produce identical
//! results; all bookkeeping is ordered and serial by design.

pub mod models;
pub mod scheduler;
pub mod validation;

pub use scheduler::{run, SchedulerInputs, SchedulerState};
