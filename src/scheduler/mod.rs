//! The adaptive scheduling engine and its collaborators.
//!
//! Four tightly coupled parts, leaves first:
//!
//! - **`state`**: the ledger — booked calendar, resource indices,
//!   occurrence counters, failure diagnostics
//! - **`constraints`**: the gatekeeper — pure hard-constraint checks
//! - **`scoring`**: the judge — soft-preference ranking of legal slots
//! - **`engine`**: the orchestrator — demand expansion, the three-tier
//!   placement ladder, and priority-capacity quotas
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4:
//! priority dispatching heuristics.

pub mod constraints;
pub mod engine;
pub mod scoring;
pub mod state;

pub use constraints::{ConstraintChecker, ConstraintViolation, ViolationKind};
pub use engine::{run, AdaptiveScheduler, SchedulerConfig, SchedulerInputs};
pub use scoring::{ScorerWeights, SlotScorer};
pub use state::{
    DayContext, LoadIntensity, SchedulerState, SchedulingAttempt, Statistics, TerminalFailure,
};
