//! The session ledger: accrues mining time, turns a completed daily goal into a point and keeps
//! track of how points are spent.
//!
//! [SessionLedger] is synchronous and knows nothing about timers. Whoever owns it calls
//! [SessionLedger::on_tick] once per second while it is mining (see
//! [LedgerService](crate::service::LedgerService)), which keeps every transition testable
//! without waiting on real time.

pub mod entities;
mod migration;
pub mod view;

use std::sync::Arc;

use chrono::NaiveDate;
use entities::{LedgerEntry, LedgerState};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use view::LedgerView;

use crate::{
    storage::{load_state, save_state, DurableStore},
    utils::clock::Clock,
};

/// Seconds of mining needed for one point (5 hours).
pub const GOAL_SECONDS: u32 = 18_000;

/// Maximum number of entries kept in the history.
pub const HISTORY_LIMIT: usize = 50;

pub const GOAL_DESCRIPTION: &str = "Daily mining goal completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Mining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The ledger wasn't mining. Nothing changed.
    Ignored,
    Accrued,
    /// A new calendar day started. Progress of the previous day is dropped.
    RolledOver,
    /// The goal was reached, a point was credited and mining stopped.
    GoalCompleted,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpendError {
    #[error("Spent amount must be positive")]
    InvalidAmount,
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },
}

/// Profile fields to change. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    /// `Some(None)` removes the avatar.
    pub avatar_ref: Option<Option<String>>,
}

/// Owns the ledger state and applies every transition to it. Each mutation is persisted into the
/// store before the call returns.
pub struct SessionLedger<S: DurableStore> {
    state: LedgerState,
    activity: Activity,
    goal_just_reached: bool,
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: DurableStore> SessionLedger<S> {
    /// Loads the ledger from the store. Mining is never resumed after a restart. A record left on
    /// an earlier day is rolled over right away so it shows today's progress.
    pub fn open(store: S, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();
        let state = load_state(&store, today);
        let mut ledger = Self::from_state(state, store, clock);
        if ledger.roll_over_if_needed(today) {
            ledger.persist();
        }
        ledger
    }

    pub fn from_state(state: LedgerState, store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            state,
            activity: Activity::Idle,
            goal_just_reached: false,
            store,
            clock,
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_active(&self) -> bool {
        self.activity == Activity::Mining
    }

    pub fn view(&self) -> LedgerView {
        LedgerView::new(&self.state, self.activity)
    }

    /// Switches between idle and mining. Stored data is left untouched.
    pub fn toggle(&mut self) -> Activity {
        self.activity = match self.activity {
            Activity::Idle => Activity::Mining,
            Activity::Mining => Activity::Idle,
        };
        info!("Mining session is now {:?}", self.activity);
        self.activity
    }

    pub fn stop(&mut self) {
        if self.is_active() {
            self.toggle();
        }
    }

    /// Applies one second of mining.
    pub fn on_tick(&mut self) -> TickOutcome {
        if !self.is_active() {
            debug!("Tick arrived while idle, ignoring");
            return TickOutcome::Ignored;
        }

        let today = self.clock.today();
        let outcome = if self.roll_over_if_needed(today) {
            TickOutcome::RolledOver
        } else if self.state.elapsed_seconds + 1 >= GOAL_SECONDS {
            self.complete_goal();
            TickOutcome::GoalCompleted
        } else {
            self.state.elapsed_seconds += 1;
            TickOutcome::Accrued
        };

        self.persist();
        outcome
    }

    /// Same as [Self::try_spend] but reports only whether points were spent.
    pub fn spend(&mut self, amount: u64, description: &str) -> bool {
        match self.try_spend(amount, description) {
            Ok(_) => true,
            Err(SpendError::InvalidAmount) => {
                error!("Rejected spending of {amount} points");
                false
            }
            Err(e) => {
                info!("{e}");
                false
            }
        }
    }

    pub fn try_spend(&mut self, amount: u64, description: &str) -> Result<LedgerEntry, SpendError> {
        if amount == 0 {
            return Err(SpendError::InvalidAmount);
        }
        if amount > self.state.balance {
            return Err(SpendError::InsufficientBalance {
                requested: amount,
                available: self.state.balance,
            });
        }

        let entry = LedgerEntry::spent(self.clock.time(), amount, description);
        self.state.balance -= amount;
        self.state.total_spent += amount;
        self.state.record(entry.clone());
        info!("Spent {amount} points on {description:?}");

        self.persist();
        Ok(entry)
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) {
        if let Some(display_name) = update.display_name {
            self.state.display_name = display_name;
        }
        if let Some(avatar_ref) = update.avatar_ref {
            self.state.avatar_ref = avatar_ref;
        }
        self.persist();
    }

    /// Replaces the ledger with a fresh one. Mining stops.
    pub fn reset(&mut self) {
        warn!("Resetting ledger");
        self.activity = Activity::Idle;
        self.goal_just_reached = false;
        self.state = LedgerState::new(self.clock.today());
        self.persist();
    }

    /// Returns true once for every completed goal.
    pub fn take_goal_reached(&mut self) -> bool {
        std::mem::take(&mut self.goal_just_reached)
    }

    fn roll_over_if_needed(&mut self, today: NaiveDate) -> bool {
        // Only a later date counts as a new day, so a clock moving backwards can't regress the
        // marker.
        if today <= self.state.last_active_date {
            return false;
        }
        info!(
            "New day {today} started (was {}), dropping {} seconds of progress",
            self.state.last_active_date, self.state.elapsed_seconds
        );
        self.state.elapsed_seconds = 0;
        self.state.days_active += 1;
        self.state.last_active_date = today;
        true
    }

    fn complete_goal(&mut self) {
        self.state
            .record(LedgerEntry::earned(self.clock.time(), GOAL_DESCRIPTION));
        self.state.balance += 1;
        self.state.total_earned += 1;
        self.state.elapsed_seconds = 0;
        self.activity = Activity::Idle;
        self.goal_just_reached = true;
        info!("Goal completed, balance is now {}", self.state.balance);
    }

    fn persist(&mut self) {
        debug_assert!(
            self.state.holds_invariants(),
            "Ledger invariants broken {:?}",
            self.state
        );
        if let Err(e) = save_state(&self.store, &self.state) {
            // The in-memory state stays authoritative, the next successful save catches up.
            warn!("Failed to persist ledger {e:?}");
        }
    }
}
