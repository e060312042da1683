//! Upgrades stored ledger records to the current layout.
//!
//! The record grew over time: the earliest layout only had the balance, elapsed seconds and the
//! day marker, and used different field names. Missing fields are defaulted instead of rejecting
//! the record, and values that break ledger invariants are repaired.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use super::{
    entities::{LedgerEntry, LedgerState, DEFAULT_DISPLAY_NAME},
    GOAL_SECONDS, HISTORY_LIMIT,
};

/// Every layout the ledger has been stored in. Only the fields present in the very first layout
/// are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLedgerRecord {
    #[serde(alias = "points")]
    balance: u64,
    #[serde(alias = "secondsDone")]
    elapsed_seconds: u32,
    #[serde(alias = "lastDate")]
    last_active_date: NaiveDate,
    #[serde(default, alias = "userName")]
    display_name: Option<String>,
    #[serde(default, alias = "userAvatar")]
    avatar_ref: Option<String>,
    #[serde(default, alias = "totalPointsEarned")]
    total_earned: Option<u64>,
    #[serde(default, alias = "totalPointsSpent")]
    total_spent: Option<u64>,
    #[serde(default)]
    days_active: Option<u64>,
    #[serde(default, alias = "earningHistory")]
    history: Option<Vec<LedgerEntry>>,
}

impl From<StoredLedgerRecord> for LedgerState {
    fn from(record: StoredLedgerRecord) -> Self {
        let total_spent = record.total_spent.unwrap_or(0);
        let mut state = LedgerState {
            balance: record.balance,
            elapsed_seconds: record.elapsed_seconds,
            last_active_date: record.last_active_date,
            display_name: record
                .display_name
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.into()),
            avatar_ref: record.avatar_ref,
            total_earned: record.total_earned.unwrap_or(record.balance),
            total_spent,
            days_active: record.days_active.unwrap_or(1),
            history: record.history.unwrap_or_default(),
        };
        repair(&mut state);
        state
    }
}

fn repair(state: &mut LedgerState) {
    if state.days_active == 0 {
        warn!("Stored ledger has zero active days, counting the current one");
        state.days_active = 1;
    }

    if state.elapsed_seconds >= GOAL_SECONDS {
        // The next tick completes the goal instead of crediting a stale overshoot.
        warn!(
            "Stored elapsed time {} reaches the goal, clamping",
            state.elapsed_seconds
        );
        state.elapsed_seconds = GOAL_SECONDS - 1;
    }

    if state.history.len() > HISTORY_LIMIT {
        warn!(
            "Stored history has {} entries, keeping the newest {HISTORY_LIMIT}",
            state.history.len()
        );
        state.history.truncate(HISTORY_LIMIT);
    }

    if state.total_earned.checked_sub(state.total_spent) != Some(state.balance) {
        let total_earned = state.balance.saturating_add(state.total_spent);
        warn!(
            "Stored totals don't match balance {} (earned {}, spent {}), setting earned to {}",
            state.balance, state.total_earned, state.total_spent, total_earned
        );
        state.total_earned = total_earned;
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::ledger::{
        entities::{EntryKind, LedgerState},
        GOAL_SECONDS, HISTORY_LIMIT,
    };

    #[test]
    fn test_minimal_record_gets_defaults() {
        let state: LedgerState = serde_json::from_str(
            r#"{"balance": 3, "elapsedSeconds": 120, "lastActiveDate": "2024-05-01"}"#,
        )
        .unwrap();

        assert_eq!(state.balance, 3);
        assert_eq!(state.elapsed_seconds, 120);
        assert_eq!(
            state.last_active_date,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert_eq!(state.total_earned, 3);
        assert_eq!(state.total_spent, 0);
        assert_eq!(state.days_active, 1);
        assert!(state.history.is_empty());
        assert_eq!(state.display_name, "User");
        assert_eq!(state.avatar_ref, None);
        assert!(state.holds_invariants());
    }

    #[test]
    fn test_legacy_field_names_are_accepted() {
        let state: LedgerState = serde_json::from_str(
            r#"{
                "points": 2,
                "secondsDone": 10,
                "lastDate": "2024-05-01",
                "userName": "Alex",
                "userAvatar": null,
                "totalPointsEarned": 5,
                "totalPointsSpent": 3,
                "daysActive": 4,
                "earningHistory": [
                    {
                        "date": "2024-05-01T10:00:00Z",
                        "pointsEarned": 3,
                        "secondsMined": 0,
                        "type": "spent",
                        "description": "Mobile recharge"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(state.balance, 2);
        assert_eq!(state.display_name, "Alex");
        assert_eq!(state.total_earned, 5);
        assert_eq!(state.total_spent, 3);
        assert_eq!(state.days_active, 4);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].kind, EntryKind::Spent);
        assert_eq!(state.history[0].amount, 3);
    }

    #[test]
    fn test_broken_values_are_repaired() {
        let history = (0..HISTORY_LIMIT + 5)
            .map(|_| {
                r#"{"timestamp": "2024-05-01T10:00:00Z", "amount": 1, "kind": "earned", "secondsMined": 18000, "description": "x"}"#
            })
            .collect::<Vec<_>>()
            .join(",");
        let state: LedgerState = serde_json::from_str(&format!(
            r#"{{
                "balance": 4,
                "elapsedSeconds": {GOAL_SECONDS},
                "lastActiveDate": "2024-05-01",
                "totalEarned": 1,
                "totalSpent": 1,
                "daysActive": 0,
                "history": [{history}]
            }}"#
        ))
        .unwrap();

        assert_eq!(state.elapsed_seconds, GOAL_SECONDS - 1);
        assert_eq!(state.days_active, 1);
        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert_eq!(state.total_earned, 5);
        assert!(state.holds_invariants());
    }

    #[test]
    fn test_negative_balance_is_rejected() {
        let result = serde_json::from_str::<LedgerState>(
            r#"{"balance": -1, "elapsedSeconds": 0, "lastActiveDate": "2024-05-01"}"#,
        );
        assert!(result.is_err());
    }
}
