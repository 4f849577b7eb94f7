//! Subscription lifecycle: a four-state, append-only transition model.
//!
//! `trial → active → cancelled → expired`. Cancelling is permitted only from
//! `active` and either ends the subscription immediately or defers the end to
//! the current billing period. Reactivation is permitted only from
//! `cancelled`. Expiry is a guard over the stored timestamps; nothing
//! schedules it; request handling is strictly synchronous.

use chrono::{DateTime, Duration, Utc};

pub const STATUS_TRIAL: &str = "trial";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_EXPIRED: &str = "expired";

pub const VALID_STATUSES: &[&str] = &[
    STATUS_TRIAL,
    STATUS_ACTIVE,
    STATUS_CANCELLED,
    STATUS_EXPIRED,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            STATUS_TRIAL => Some(SubscriptionStatus::Trial),
            STATUS_ACTIVE => Some(SubscriptionStatus::Active),
            STATUS_CANCELLED => Some(SubscriptionStatus::Cancelled),
            STATUS_EXPIRED => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => STATUS_TRIAL,
            SubscriptionStatus::Active => STATUS_ACTIVE,
            SubscriptionStatus::Cancelled => STATUS_CANCELLED,
            SubscriptionStatus::Expired => STATUS_EXPIRED,
        }
    }
}

/// New subscriptions start in `trial` when the plan carries trial days.
pub fn initial_status(trial_days: i64) -> SubscriptionStatus {
    if trial_days > 0 {
        SubscriptionStatus::Trial
    } else {
        SubscriptionStatus::Active
    }
}

/// Only an active subscription can be cancelled.
pub fn can_cancel(status: SubscriptionStatus) -> bool {
    status == SubscriptionStatus::Active
}

/// Only a cancelled subscription can be reactivated.
pub fn can_reactivate(status: SubscriptionStatus) -> bool {
    status == SubscriptionStatus::Cancelled
}

/// A subscription in one of these states still blocks creating another one
/// for the same plan.
pub fn blocks_duplicate(status: SubscriptionStatus) -> bool {
    matches!(
        status,
        SubscriptionStatus::Trial | SubscriptionStatus::Active
    )
}

pub fn trial_end(now: DateTime<Utc>, trial_days: i64) -> Option<DateTime<Utc>> {
    (trial_days > 0).then(|| now + Duration::days(trial_days))
}

/// End of the first billing period from `now`.
pub fn period_end(now: DateTime<Utc>, period: &str) -> DateTime<Utc> {
    match period {
        "yearly" => now + Duration::days(365),
        _ => now + Duration::days(30),
    }
}

/// Effective end date of a cancellation: immediate, or the current period
/// end when requested and still in the future.
pub fn cancellation_end(
    now: DateTime<Utc>,
    at_period_end: bool,
    current_period_end: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    match current_period_end {
        Some(end) if at_period_end && end > now => end,
        _ => now,
    }
}

/// Whether the stored state has run out and the row is due for `expired`.
pub fn has_lapsed(
    status: SubscriptionStatus,
    now: DateTime<Utc>,
    trial_ends_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> bool {
    match status {
        SubscriptionStatus::Trial => trial_ends_at.is_some_and(|t| t <= now),
        SubscriptionStatus::Cancelled => ends_at.is_some_and(|t| t <= now),
        SubscriptionStatus::Active | SubscriptionStatus::Expired => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn only_active_is_cancellable() {
        assert!(can_cancel(SubscriptionStatus::Active));
        assert!(!can_cancel(SubscriptionStatus::Trial));
        assert!(!can_cancel(SubscriptionStatus::Cancelled));
        assert!(!can_cancel(SubscriptionStatus::Expired));
    }

    #[test]
    fn only_cancelled_is_reactivatable() {
        assert!(can_reactivate(SubscriptionStatus::Cancelled));
        assert!(!can_reactivate(SubscriptionStatus::Trial));
        assert!(!can_reactivate(SubscriptionStatus::Active));
        assert!(!can_reactivate(SubscriptionStatus::Expired));
    }

    #[test]
    fn trial_and_active_block_duplicates() {
        assert!(blocks_duplicate(SubscriptionStatus::Trial));
        assert!(blocks_duplicate(SubscriptionStatus::Active));
        assert!(!blocks_duplicate(SubscriptionStatus::Cancelled));
        assert!(!blocks_duplicate(SubscriptionStatus::Expired));
    }

    #[test]
    fn plans_with_trial_days_start_in_trial() {
        assert_eq!(initial_status(14), SubscriptionStatus::Trial);
        assert_eq!(initial_status(0), SubscriptionStatus::Active);
    }

    #[test]
    fn immediate_cancellation_ends_now() {
        let now = ts("2026-08-05T12:00:00Z");
        let period_end = Some(ts("2026-09-01T00:00:00Z"));
        assert_eq!(cancellation_end(now, false, period_end), now);
    }

    #[test]
    fn deferred_cancellation_ends_at_period_end() {
        let now = ts("2026-08-05T12:00:00Z");
        let end = ts("2026-09-01T00:00:00Z");
        assert_eq!(cancellation_end(now, true, Some(end)), end);
    }

    #[test]
    fn deferred_cancellation_with_past_period_end_ends_now() {
        let now = ts("2026-08-05T12:00:00Z");
        let end = ts("2026-08-01T00:00:00Z");
        assert_eq!(cancellation_end(now, true, Some(end)), now);
    }

    #[test]
    fn lapse_guard_follows_the_relevant_timestamp() {
        let now = ts("2026-08-05T12:00:00Z");
        let past = Some(ts("2026-08-01T00:00:00Z"));
        let future = Some(ts("2026-09-01T00:00:00Z"));
        assert!(has_lapsed(SubscriptionStatus::Trial, now, past, None));
        assert!(!has_lapsed(SubscriptionStatus::Trial, now, future, None));
        assert!(has_lapsed(SubscriptionStatus::Cancelled, now, None, past));
        assert!(!has_lapsed(SubscriptionStatus::Cancelled, now, None, future));
        assert!(!has_lapsed(SubscriptionStatus::Active, now, past, past));
    }

    #[test]
    fn status_strings_round_trip() {
        for s in VALID_STATUSES {
            assert_eq!(SubscriptionStatus::parse(s).unwrap().as_str(), *s);
        }
        assert!(SubscriptionStatus::parse("paused").is_none());
    }
}
