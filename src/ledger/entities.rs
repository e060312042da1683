use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{migration::StoredLedgerRecord, GOAL_SECONDS, HISTORY_LIMIT};

pub const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Earned,
    Spent,
}

/// A single movement of points. Entries are never modified after they are created.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    #[serde(alias = "date")]
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "pointsEarned")]
    pub amount: u64,
    #[serde(alias = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub seconds_mined: u32,
    #[serde(default)]
    pub description: String,
}

impl LedgerEntry {
    pub fn earned(timestamp: DateTime<Utc>, description: impl Into<String>) -> Self {
        Self {
            timestamp,
            amount: 1,
            kind: EntryKind::Earned,
            seconds_mined: GOAL_SECONDS,
            description: description.into(),
        }
    }

    pub fn spent(timestamp: DateTime<Utc>, amount: u64, description: impl Into<String>) -> Self {
        Self {
            timestamp,
            amount,
            kind: EntryKind::Spent,
            seconds_mined: 0,
            description: description.into(),
        }
    }
}

/// The persisted aggregate. There is a single instance per user and it is only mutated through
/// [SessionLedger](super::SessionLedger).
///
/// Decoding goes through [StoredLedgerRecord], which fills in fields that older records didn't
/// have.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase", from = "StoredLedgerRecord")]
pub struct LedgerState {
    pub balance: u64,
    pub elapsed_seconds: u32,
    pub last_active_date: NaiveDate,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub total_earned: u64,
    pub total_spent: u64,
    pub days_active: u64,
    pub history: Vec<LedgerEntry>,
}

impl LedgerState {
    /// State of a ledger that has never been used, or has just been reset.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            balance: 0,
            elapsed_seconds: 0,
            last_active_date: today,
            display_name: DEFAULT_DISPLAY_NAME.into(),
            avatar_ref: None,
            total_earned: 0,
            total_spent: 0,
            days_active: 1,
            history: vec![],
        }
    }

    /// Adds an entry as the most recent one, dropping the oldest entries past the limit.
    pub(super) fn record(&mut self, entry: LedgerEntry) {
        self.history.insert(0, entry);
        self.history.truncate(HISTORY_LIMIT);
    }

    pub(crate) fn holds_invariants(&self) -> bool {
        self.elapsed_seconds < GOAL_SECONDS
            && self.total_earned.checked_sub(self.total_spent) == Some(self.balance)
            && self.history.len() <= HISTORY_LIMIT
            && self.days_active >= 1
    }
}
