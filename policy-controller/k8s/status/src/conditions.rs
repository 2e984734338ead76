//! Constructors for the `Accepted` condition written to each attachment.

#[cfg(not(test))]
use chrono::offset::Utc;
use gateway_policy_controller_core::conflict::{Decision, Reason};
use gateway_policy_controller_k8s_api::{Condition, Time};

pub(crate) const ACCEPTED_TYPE: &str = "Accepted";

fn now() -> Time {
    #[cfg(not(test))]
    let timestamp = Utc::now();
    #[cfg(test)]
    let timestamp = chrono::DateTime::<chrono::Utc>::MIN_UTC;
    Time(timestamp)
}

fn condition(status: bool, reason: &str, message: &str, observed_generation: i64) -> Condition {
    Condition {
        last_transition_time: now(),
        message: message.to_string(),
        observed_generation: Some(observed_generation),
        reason: reason.to_string(),
        status: if status { "True" } else { "False" }.to_string(),
        type_: ACCEPTED_TYPE.to_string(),
    }
}

pub(crate) fn accepted(message: &str, observed_generation: i64) -> Condition {
    condition(true, "Accepted", message, observed_generation)
}

pub(crate) fn invalid(message: &str, observed_generation: i64) -> Condition {
    condition(false, "Invalid", message, observed_generation)
}

pub(crate) fn target_not_found(message: &str, observed_generation: i64) -> Condition {
    condition(false, "TargetNotFound", message, observed_generation)
}

pub(crate) fn no_access_to_target(message: &str, observed_generation: i64) -> Condition {
    condition(false, "NoAccessToTarget", message, observed_generation)
}

pub(crate) fn conflicted(message: &str, observed_generation: i64) -> Condition {
    condition(false, "Conflicted", message, observed_generation)
}

pub(crate) fn from_decision(decision: &Decision) -> Condition {
    let make = match decision.reason {
        Reason::Accepted => accepted,
        Reason::Invalid => invalid,
        Reason::TargetNotFound => target_not_found,
        Reason::NoAccessToTarget => no_access_to_target,
        Reason::Conflicted => conflicted,
    };
    make(&decision.message, decision.generation)
}

/// Keeps the previous transition time when neither status nor reason
/// changed, so rewrites of an unchanged decision are no-ops.
pub(crate) fn preserve_transition_time(condition: &mut Condition, existing: Option<&Condition>) {
    if let Some(existing) = existing {
        if existing.status == condition.status && existing.reason == condition.reason {
            condition.last_transition_time = existing.last_transition_time.clone();
        }
    }
}

/// Equality of everything the controller manages; the transition time is
/// derived state.
pub(crate) fn conditions_equal(a: &Condition, b: &Condition) -> bool {
    a.type_ == b.type_
        && a.status == b.status
        && a.reason == b.reason
        && a.message == b.message
        && a.observed_generation == b.observed_generation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_time_preserved_when_status_and_reason_unchanged() {
        let previous = Condition {
            last_transition_time: Time(
                chrono::DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
                    .unwrap()
                    .with_timezone(&chrono::Utc),
            ),
            ..accepted("AccessControlPolicy is accepted", 1)
        };

        let mut next = accepted("AccessControlPolicy is accepted", 2);
        preserve_transition_time(&mut next, Some(&previous));
        assert_eq!(next.last_transition_time, previous.last_transition_time);

        let mut flipped = conflicted("Conflict with AccessControlPolicy: ns/a", 2);
        preserve_transition_time(&mut flipped, Some(&previous));
        assert_ne!(flipped.last_transition_time, previous.last_transition_time);
    }

    #[test]
    fn equality_ignores_transition_time() {
        let a = accepted("ok", 1);
        let mut b = accepted("ok", 1);
        b.last_transition_time = Time(
            chrono::DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        );
        assert!(conditions_equal(&a, &b));
        assert!(!conditions_equal(&a, &accepted("ok", 2)));
        assert!(!conditions_equal(&a, &invalid("ok", 1)));
    }
}
