use std::fmt::Display;

use clap::ValueEnum;
use thiserror::Error;

use crate::{
    ledger::{entities::LedgerEntry, SessionLedger, SpendError},
    storage::DurableStore,
};

/// Points charged for one mobile recharge.
pub const RECHARGE_COST: u64 = 28;

const NUMBER_LENGTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operator {
    Jio,
    Airtel,
    Vi,
    Bsnl,
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operator::Jio => "Jio",
            Operator::Airtel => "Airtel",
            Operator::Vi => "Vi (Vodafone Idea)",
            Operator::Bsnl => "BSNL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, clap::Args)]
pub struct RechargeCommand {
    #[arg(short, long, help = "10-digit mobile number to recharge")]
    pub number: String,
    #[arg(short, long, value_enum)]
    pub operator: Operator,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RechargeError {
    #[error("Please enter a valid 10-digit mobile number")]
    InvalidNumber,
    #[error("Insufficient points. You need {missing} more points.")]
    InsufficientPoints { missing: u64 },
    #[error(transparent)]
    Spend(#[from] SpendError),
}

/// Pays for a recharge of `number` out of the balance. Nothing changes unless the number is valid
/// and the balance covers [RECHARGE_COST].
pub fn recharge<S: DurableStore>(
    ledger: &mut SessionLedger<S>,
    number: &str,
    operator: Operator,
) -> Result<LedgerEntry, RechargeError> {
    if number.len() != NUMBER_LENGTH || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(RechargeError::InvalidNumber);
    }

    let balance = ledger.state().balance;
    if balance < RECHARGE_COST {
        return Err(RechargeError::InsufficientPoints {
            missing: RECHARGE_COST - balance,
        });
    }

    Ok(ledger.try_spend(RECHARGE_COST, &format!("Mobile recharge - {operator}"))?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        ledger::{
            entities::{EntryKind, LedgerState},
            SessionLedger,
        },
        storage::{memory::MemoryStore, LEDGER_KEY},
        utils::{
            clock::{test_clock::ManualClock, Clock},
            logging::TEST_LOGGING,
        },
    };

    use super::{recharge, Operator, RechargeError, RECHARGE_COST};

    fn ledger_with_balance(balance: u64) -> (SessionLedger<Arc<MemoryStore>>, Arc<MemoryStore>) {
        *TEST_LOGGING;
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(MemoryStore::default());
        let mut state = LedgerState::new(clock.today());
        state.balance = balance;
        state.total_earned = balance;
        (SessionLedger::from_state(state, store.clone(), clock), store)
    }

    #[test]
    fn test_recharge_rejects_bad_numbers() {
        let (mut ledger, store) = ledger_with_balance(40);
        let before = ledger.state().clone();

        for number in ["", "98765", "98765432101", "98765-4321", "９８７６５４３２１０"] {
            assert_eq!(
                recharge(&mut ledger, number, Operator::Jio),
                Err(RechargeError::InvalidNumber)
            );
        }

        assert_eq!(ledger.state(), &before);
        assert!(store.get(LEDGER_KEY).is_none());
    }

    #[test]
    fn test_recharge_reports_missing_points() {
        let (mut ledger, store) = ledger_with_balance(5);

        let error = recharge(&mut ledger, "9876543210", Operator::Airtel).unwrap_err();

        assert_eq!(error, RechargeError::InsufficientPoints { missing: 23 });
        assert_eq!(
            error.to_string(),
            "Insufficient points. You need 23 more points."
        );
        assert_eq!(ledger.state().balance, 5);
        assert!(store.get(LEDGER_KEY).is_none());
    }

    #[test]
    fn test_recharge_spends_cost() {
        let (mut ledger, _) = ledger_with_balance(30);

        let entry = recharge(&mut ledger, "9876543210", Operator::Vi).unwrap();

        assert_eq!(entry.kind, EntryKind::Spent);
        assert_eq!(entry.amount, RECHARGE_COST);
        assert_eq!(entry.description, "Mobile recharge - Vi (Vodafone Idea)");
        assert_eq!(ledger.state().balance, 2);
        assert_eq!(ledger.state().total_spent, RECHARGE_COST);
        assert_eq!(ledger.state().history[0], entry);
    }
}
