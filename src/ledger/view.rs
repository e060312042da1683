use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use crate::utils::{
    percentage::{ratio_percentage, Percentage},
    time::{format_hms, trailing_days},
};

use super::{
    entities::{EntryKind, LedgerEntry, LedgerState},
    Activity, GOAL_SECONDS,
};

/// Snapshot of the ledger handed to the presentation layer. Everything here is computed from
/// [LedgerState] and the current [Activity]; none of it is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerView {
    pub balance: u64,
    pub elapsed_seconds: u32,
    pub is_active: bool,
    pub progress_percent: Percentage,
    pub formatted_elapsed: String,
    pub formatted_goal: String,
    pub total_earned: u64,
    pub total_spent: u64,
    pub days_active: u64,
    pub history: Vec<LedgerEntry>,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

impl LedgerView {
    pub fn new(state: &LedgerState, activity: Activity) -> Self {
        Self {
            balance: state.balance,
            elapsed_seconds: state.elapsed_seconds,
            is_active: activity == Activity::Mining,
            progress_percent: progress_percent(state.elapsed_seconds),
            formatted_elapsed: format_hms(state.elapsed_seconds),
            formatted_goal: format_hms(GOAL_SECONDS),
            total_earned: state.total_earned,
            total_spent: state.total_spent,
            days_active: state.days_active,
            history: state.history.clone(),
            display_name: state.display_name.clone(),
            avatar_ref: state.avatar_ref.clone(),
        }
    }
}

pub fn progress_percent(elapsed_seconds: u32) -> Percentage {
    ratio_percentage(elapsed_seconds.into(), GOAL_SECONDS.into())
}

/// Number of days shown in [EarningsSummary::recent_days].
pub const RECENT_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub earned: u64,
    pub spent: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    pub balance: u64,
    pub total_earned: u64,
    pub total_spent: u64,
    pub days_active: u64,
    pub average_per_day: f64,
    /// Oldest first, ending with `today`.
    pub recent_days: Vec<DailyActivity>,
}

/// Aggregates the retained history into per-day totals. Entry timestamps are bucketed by their
/// date in `zone`. Only the retained history is considered, so older days may be incomplete.
pub fn summarize<Tz: TimeZone>(
    state: &LedgerState,
    today: NaiveDate,
    zone: &Tz,
    days: u32,
) -> EarningsSummary {
    let mut recent_days = trailing_days(today, days)
        .into_iter()
        .map(|date| DailyActivity {
            date,
            earned: 0,
            spent: 0,
        })
        .collect::<Vec<_>>();

    for entry in &state.history {
        let date = entry.timestamp.with_timezone(zone).date_naive();
        let Some(day) = recent_days.iter_mut().find(|v| v.date == date) else {
            continue;
        };
        match entry.kind {
            EntryKind::Earned => day.earned += entry.amount,
            EntryKind::Spent => day.spent += entry.amount,
        }
    }

    EarningsSummary {
        balance: state.balance,
        total_earned: state.total_earned,
        total_spent: state.total_spent,
        days_active: state.days_active,
        average_per_day: state.total_earned as f64 / state.days_active.max(1) as f64,
        recent_days,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::ledger::{
        entities::{LedgerEntry, LedgerState},
        Activity, GOAL_SECONDS,
    };

    use super::{summarize, LedgerView, RECENT_DAYS};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn test_view_derives_progress() {
        let mut state = LedgerState::new(today());
        state.elapsed_seconds = GOAL_SECONDS / 4;

        let view = LedgerView::new(&state, Activity::Mining);

        assert!(view.is_active);
        assert_eq!(*view.progress_percent, 25.);
        assert_eq!(view.formatted_elapsed, "01:15:00");
        assert_eq!(view.formatted_goal, "05:00:00");
        assert!(!LedgerView::new(&state, Activity::Idle).is_active);
    }

    #[test]
    fn test_summary_groups_by_day() {
        let noon = Utc.from_utc_datetime(&today().and_hms_opt(12, 0, 0).unwrap());
        let mut state = LedgerState::new(today());
        state.balance = 1;
        state.total_earned = 4;
        state.total_spent = 3;
        state.days_active = 8;
        state.history = vec![
            LedgerEntry::spent(noon, 3, "Mobile recharge"),
            LedgerEntry::earned(noon, "Daily mining goal completed"),
            LedgerEntry::earned(noon - Duration::days(1), "Daily mining goal completed"),
            LedgerEntry::earned(noon - Duration::days(2), "Daily mining goal completed"),
            // Outside of the window.
            LedgerEntry::earned(noon - Duration::days(30), "Daily mining goal completed"),
        ];

        let summary = summarize(&state, today(), &Utc, RECENT_DAYS);

        assert_eq!(summary.recent_days.len(), 7);
        let last = summary.recent_days.last().unwrap();
        assert_eq!(last.date, today());
        assert_eq!((last.earned, last.spent), (1, 3));
        assert_eq!(summary.recent_days[5].earned, 1);
        assert_eq!(summary.recent_days[4].earned, 1);
        assert_eq!(
            summary.recent_days.iter().map(|v| v.earned).sum::<u64>(),
            3
        );
        assert_eq!(summary.average_per_day, 0.5);
    }
}
