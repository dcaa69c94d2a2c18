//! # Condition Ledger
//!
//! Insert-or-update bookkeeping for status conditions.
//!
//! - A condition type appears at most once; new types are appended and
//!   existing types are updated in place.
//! - `lastTransitionTime` changes only when the status value changes.

use crate::clock::format_time;
use crate::crd::{Condition, ConditionStatus};
use chrono::{DateTime, Utc};
use tracing::info;

/// Set a condition on `conditions`.
///
/// If no condition of the same type exists, it is appended with the
/// transition time set to `now`. If one exists with the same status, reason
/// and message are replaced and the transition time is kept. If one exists
/// with a different status, it is replaced and the transition time set to
/// `now`.
///
/// Returns `true` when the status value changed (including insertion).
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> bool {
    let mut condition = Condition {
        r#type: condition_type.to_string(),
        status,
        last_transition_time: Some(format_time(now)),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
    };

    let Some(existing) = conditions
        .iter_mut()
        .find(|c| c.r#type == condition_type)
    else {
        conditions.push(condition);
        return true;
    };

    let changed = existing.status != status;
    if changed {
        info!(
            condition = condition_type,
            old_status = existing.status.as_str(),
            new_status = status.as_str(),
            "found status change for condition; setting lastTransitionTime"
        );
    } else {
        condition.last_transition_time = existing.last_transition_time.take();
    }

    *existing = condition;
    changed
}

/// Whether `conditions` holds a condition with the given type and status.
/// Reason, message and transition time are ignored.
#[must_use]
pub fn has_condition(
    conditions: &[Condition],
    condition_type: &str,
    status: ConditionStatus,
) -> bool {
    conditions
        .iter()
        .any(|c| c.r#type == condition_type && c.status == status)
}

/// Like [`has_condition`] but also requires the reason to match
#[must_use]
pub fn has_condition_with_reason(
    conditions: &[Condition],
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
) -> bool {
    conditions.iter().any(|c| {
        c.r#type == condition_type && c.status == status && c.reason.as_deref() == Some(reason)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::CONDITION_READY;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn test_set_condition_appends_new_type() {
        let mut conditions = Vec::new();
        let changed = set_condition(
            &mut conditions,
            CONDITION_READY,
            ConditionStatus::False,
            "Pending",
            "waiting",
            t(0),
        );

        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_set_condition_same_status_keeps_transition_time() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, CONDITION_READY, ConditionStatus::False, "Pending", "a", t(0));
        let changed = set_condition(
            &mut conditions,
            CONDITION_READY,
            ConditionStatus::False,
            "NotFound",
            "b",
            t(60),
        );

        assert!(!changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].reason.as_deref(), Some("NotFound"));
        assert_eq!(conditions[0].message.as_deref(), Some("b"));
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_set_condition_status_change_updates_transition_time() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, CONDITION_READY, ConditionStatus::False, "Pending", "a", t(0));
        let changed = set_condition(
            &mut conditions,
            CONDITION_READY,
            ConditionStatus::True,
            "Issued",
            "Certificate issued",
            t(90),
        );

        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, ConditionStatus::True);
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:01:30Z")
        );
    }

    #[test]
    fn test_set_condition_is_idempotent() {
        let mut once = Vec::new();
        set_condition(&mut once, CONDITION_READY, ConditionStatus::True, "Issued", "ok", t(0));
        let mut twice = once.clone();
        set_condition(&mut twice, CONDITION_READY, ConditionStatus::True, "Issued", "ok", t(300));

        assert_eq!(once, twice);
    }

    #[test]
    fn test_set_condition_preserves_order_of_other_types() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, "Approved", ConditionStatus::True, "a", "a", t(0));
        set_condition(&mut conditions, CONDITION_READY, ConditionStatus::False, "p", "p", t(0));
        set_condition(&mut conditions, "Approved", ConditionStatus::False, "b", "b", t(5));

        let types: Vec<_> = conditions.iter().map(|c| c.r#type.as_str()).collect();
        assert_eq!(types, vec!["Approved", CONDITION_READY]);
    }

    #[test]
    fn test_has_condition_ignores_reason_and_message() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, CONDITION_READY, ConditionStatus::False, "Failed", "x", t(0));

        assert!(has_condition(&conditions, CONDITION_READY, ConditionStatus::False));
        assert!(!has_condition(&conditions, CONDITION_READY, ConditionStatus::True));
        assert!(has_condition_with_reason(
            &conditions,
            CONDITION_READY,
            ConditionStatus::False,
            "Failed"
        ));
        assert!(!has_condition_with_reason(
            &conditions,
            CONDITION_READY,
            ConditionStatus::False,
            "Denied"
        ));
    }
}
