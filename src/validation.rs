//! Input validation for scheduling runs.
//!
//! Checks structural integrity of the demand and supply collections
//! before the engine runs. Detects:
//! - Duplicate activity IDs
//! - Out-of-range priorities, durations, prep times, and frequency counts
//! - Malformed time windows and preferred-day sets
//! - Dangling backup / specialist / equipment references
//! - Cycles in the backup-chain graph (DFS)
//! - Inverted travel periods
//!
//! Validation failures abort the run; no partial state is produced.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::{Activity, Equipment, FrequencyPattern, Specialist, TravelPeriod};

/// Validation result. `Err` carries every issue found, not just the first.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A pre-run input integrity error, identifying the offending object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate activity id `{id}`")]
    DuplicateActivityId { id: String },

    #[error("activity `{activity_id}` has priority {priority}, expected 1..=5")]
    PriorityOutOfRange { activity_id: String, priority: u8 },

    #[error("activity `{activity_id}` lasts {duration} minutes, below the 10 minute minimum")]
    DurationTooShort { activity_id: String, duration: u32 },

    #[error("activity `{activity_id}` has {prep} minutes of prep, above the 60 minute maximum")]
    PrepTooLong { activity_id: String, prep: u32 },

    #[error("activity `{activity_id}` has frequency count {count}, expected {expected}")]
    FrequencyCountOutOfRange {
        activity_id: String,
        count: u32,
        expected: &'static str,
    },

    #[error("activity `{activity_id}` has invalid preferred days: {reason}")]
    InvalidPreferredDays {
        activity_id: String,
        reason: &'static str,
    },

    #[error("activity `{activity_id}` has an invalid time window")]
    InvalidTimeWindow { activity_id: String },

    #[error("activity `{activity_id}` references unknown backup `{backup_id}`")]
    UnknownBackupReference {
        activity_id: String,
        backup_id: String,
    },

    #[error("backup chain through activity `{activity_id}` contains a cycle")]
    BackupCycle { activity_id: String },

    #[error("activity `{activity_id}` references unknown specialist `{specialist_id}`")]
    UnknownSpecialistReference {
        activity_id: String,
        specialist_id: String,
    },

    #[error("activity `{activity_id}` references unknown equipment `{equipment_id}`")]
    UnknownEquipmentReference {
        activity_id: String,
        equipment_id: String,
    },

    #[error("travel period `{travel_id}` ends before it starts")]
    TravelPeriodInverted { travel_id: String },
}

/// Validates the demand and supply collections for a scheduling run.
///
/// `activities` generate demand; `backup_pool` holds reserve-only
/// activities resolvable from backup chains. Both populations are held
/// to the same per-activity rules and share one id namespace.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_inputs(
    activities: &[Activity],
    backup_pool: &[Activity],
    specialists: &[Specialist],
    equipment: &[Equipment],
    travel_periods: &[TravelPeriod],
) -> ValidationResult {
    let mut errors = Vec::new();

    let specialist_ids: HashSet<&str> = specialists.iter().map(|s| s.id.as_str()).collect();
    let equipment_ids: HashSet<&str> = equipment.iter().map(|e| e.id.as_str()).collect();

    let all: Vec<&Activity> = activities.iter().chain(backup_pool.iter()).collect();

    let mut seen = HashSet::new();
    for act in &all {
        if !seen.insert(act.id.as_str()) {
            errors.push(ValidationError::DuplicateActivityId { id: act.id.clone() });
        }
    }

    for act in &all {
        check_activity(act, &specialist_ids, &equipment_ids, &seen, &mut errors);
    }

    if let Some(cycle) = detect_backup_cycle(&all) {
        errors.push(cycle);
    }

    for trip in travel_periods {
        if trip.end_date < trip.start_date {
            errors.push(ValidationError::TravelPeriodInverted {
                travel_id: trip.id.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_activity(
    act: &Activity,
    specialist_ids: &HashSet<&str>,
    equipment_ids: &HashSet<&str>,
    activity_ids: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    if !(1..=5).contains(&act.priority) {
        errors.push(ValidationError::PriorityOutOfRange {
            activity_id: act.id.clone(),
            priority: act.priority,
        });
    }

    if act.duration_minutes < 10 {
        errors.push(ValidationError::DurationTooShort {
            activity_id: act.id.clone(),
            duration: act.duration_minutes,
        });
    }

    if act.prep_minutes > 60 {
        errors.push(ValidationError::PrepTooLong {
            activity_id: act.id.clone(),
            prep: act.prep_minutes,
        });
    }

    match act.frequency.pattern {
        FrequencyPattern::Daily => {}
        FrequencyPattern::Weekly { count } => {
            if !(1..=7).contains(&count) {
                errors.push(ValidationError::FrequencyCountOutOfRange {
                    activity_id: act.id.clone(),
                    count,
                    expected: "1..=7 per week",
                });
            }
        }
        FrequencyPattern::Monthly { count } => {
            if !(1..=31).contains(&count) {
                errors.push(ValidationError::FrequencyCountOutOfRange {
                    activity_id: act.id.clone(),
                    count,
                    expected: "1..=31 per month",
                });
            }
        }
    }

    if !act.frequency.preferred_days.is_empty() {
        if !matches!(act.frequency.pattern, FrequencyPattern::Weekly { .. }) {
            errors.push(ValidationError::InvalidPreferredDays {
                activity_id: act.id.clone(),
                reason: "preferred days only apply to weekly activities",
            });
        } else if act.frequency.preferred_days.iter().any(|&d| d > 6) {
            errors.push(ValidationError::InvalidPreferredDays {
                activity_id: act.id.clone(),
                reason: "weekday index above 6",
            });
        }
    }

    match (act.time_window_start, act.time_window_end) {
        (None, None) => {}
        (Some(start), Some(end)) if start < end => {}
        _ => errors.push(ValidationError::InvalidTimeWindow {
            activity_id: act.id.clone(),
        }),
    }

    if let Some(spec_id) = &act.specialist_id {
        if !specialist_ids.contains(spec_id.as_str()) {
            errors.push(ValidationError::UnknownSpecialistReference {
                activity_id: act.id.clone(),
                specialist_id: spec_id.clone(),
            });
        }
    }

    for eq_id in &act.equipment_ids {
        if !equipment_ids.contains(eq_id.as_str()) {
            errors.push(ValidationError::UnknownEquipmentReference {
                activity_id: act.id.clone(),
                equipment_id: eq_id.clone(),
            });
        }
    }

    for backup_id in &act.backup_activity_ids {
        if !activity_ids.contains(backup_id.as_str()) {
            errors.push(ValidationError::UnknownBackupReference {
                activity_id: act.id.clone(),
                backup_id: backup_id.clone(),
            });
        }
    }
}

/// Detects cycles in the backup-chain graph using DFS.
///
/// A back-edge (reaching a node currently on the recursion stack)
/// means an activity is transitively its own backup.
fn detect_backup_cycle(activities: &[&Activity]) -> Option<ValidationError> {
    let adj: HashMap<&str, &[String]> = activities
        .iter()
        .map(|a| (a.id.as_str(), a.backup_activity_ids.as_slice()))
        .collect();

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for act in activities {
        let id = act.id.as_str();
        if !visited.contains(id) && has_cycle_dfs(id, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::BackupCycle {
                activity_id: act.id.clone(),
            });
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, &'a [String]>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(backups) = adj.get(node) {
        for next in backups.iter() {
            let next = next.as_str();
            if in_stack.contains(next) {
                return true;
            }
            // Unknown ids are reported separately; skip them here.
            if adj.contains_key(next)
                && !visited.contains(next)
                && has_cycle_dfs(next, adj, visited, in_stack)
            {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityType, Frequency};
    use chrono::{NaiveDate, NaiveTime};

    fn act(id: &str) -> Activity {
        Activity::new(id, id, ActivityType::Fitness, 3, 30, Frequency::weekly(2))
    }

    #[test]
    fn test_valid_input() {
        let activities = vec![act("a1").with_backup("b1")];
        let pool = vec![act("b1")];
        assert!(validate_inputs(&activities, &pool, &[], &[], &[]).is_ok());
    }

    #[test]
    fn test_duplicate_activity_id() {
        let activities = vec![act("a1"), act("a1")];
        let errors = validate_inputs(&activities, &[], &[], &[], &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateActivityId { id } if id == "a1")));
    }

    #[test]
    fn test_priority_out_of_range() {
        let mut a = act("a1");
        a.priority = 6;
        let errors = validate_inputs(&[a], &[], &[], &[], &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::PriorityOutOfRange { priority: 6, .. })));
    }

    #[test]
    fn test_duration_too_short() {
        let mut a = act("a1");
        a.duration_minutes = 5;
        let errors = validate_inputs(&[a], &[], &[], &[], &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DurationTooShort { duration: 5, .. })));
    }

    #[test]
    fn test_prep_too_long() {
        let a = act("a1").with_prep(90);
        let errors = validate_inputs(&[a], &[], &[], &[], &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::PrepTooLong { prep: 90, .. })));
    }

    #[test]
    fn test_frequency_count_out_of_range() {
        let mut a = act("a1");
        a.frequency = Frequency::weekly(8);
        let mut b = act("b1");
        b.frequency = Frequency::monthly(0);

        let errors = validate_inputs(&[a, b], &[], &[], &[], &[]).unwrap_err();
        let counts: Vec<u32> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::FrequencyCountOutOfRange { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![8, 0]);
    }

    #[test]
    fn test_preferred_days_rules() {
        let mut daily = act("a1");
        daily.frequency = Frequency::daily().with_preferred_days(vec![0]);
        let mut bad_index = act("a2");
        bad_index.frequency = Frequency::weekly(1).with_preferred_days(vec![7]);

        let errors = validate_inputs(&[daily, bad_index], &[], &[], &[], &[]).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidPreferredDays { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_invalid_time_window() {
        let start = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let inverted = act("a1").with_time_window(start, end);

        let mut half = act("a2");
        half.time_window_start = Some(start);

        let errors = validate_inputs(&[inverted, half], &[], &[], &[], &[]).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidTimeWindow { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_unknown_references() {
        let a = act("a1")
            .with_backup("missing_backup")
            .with_specialist("missing_spec")
            .with_equipment("missing_equip");

        let errors = validate_inputs(&[a], &[], &[], &[], &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownBackupReference { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownSpecialistReference { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownEquipmentReference { .. })));
    }

    #[test]
    fn test_backup_cycle() {
        // a1 -> b1 -> b2 -> a1
        let activities = vec![act("a1").with_backup("b1")];
        let pool = vec![act("b1").with_backup("b2"), act("b2").with_backup("a1")];

        let errors = validate_inputs(&activities, &pool, &[], &[], &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::BackupCycle { .. })));
    }

    #[test]
    fn test_backup_chain_no_cycle() {
        let activities = vec![act("a1").with_backup("b1")];
        let pool = vec![act("b1").with_backup("b2"), act("b2")];
        assert!(validate_inputs(&activities, &pool, &[], &[], &[]).is_ok());
    }

    #[test]
    fn test_travel_period_inverted() {
        let trip = TravelPeriod::new(
            "trip_01",
            "Hotel",
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        );
        let errors = validate_inputs(&[], &[], &[], &[], &[trip]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::TravelPeriodInverted { .. })));
    }
}
