//! Durable storage of the ledger.
//!
//!  The basic idea is:
//!   - A store is a synchronous key-value surface holding serialized blobs.
//!   - The ledger lives under [LEDGER_KEY] as a single JSON record.
//!   - Storage problems are never fatal. A missing or corrupt record loads as a fresh ledger, and
//!     a failed save is retried with the next mutation.

pub mod file_store;
pub mod memory;

use std::ops::Deref;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::ledger::entities::LedgerState;

/// Key under which the ledger record is stored.
pub const LEDGER_KEY: &str = "ledger";

/// Interface for abstracting persistence of serialized records.
#[cfg_attr(test, mockall::automock)]
pub trait DurableStore {
    /// Returns the blob stored under `key`, or `None` if nothing was stored yet.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the blob stored under `key`.
    fn save(&self, key: &str, blob: &str) -> Result<()>;
}

impl<T: Deref> DurableStore for T
where
    T::Target: DurableStore,
{
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.deref().load(key)
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        self.deref().save(key, blob)
    }
}

pub fn encode_state(state: &LedgerState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

/// Decodes a record of any layout the ledger has been stored in.
pub fn decode_state(blob: &str) -> Result<LedgerState> {
    Ok(serde_json::from_str(blob)?)
}

/// Loads the ledger, falling back to a fresh one dated `today` when there's nothing usable in the
/// store.
pub fn load_state(store: &impl DurableStore, today: NaiveDate) -> LedgerState {
    let blob = match store.load(LEDGER_KEY) {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            debug!("No stored ledger, starting a new one");
            return LedgerState::new(today);
        }
        Err(e) => {
            warn!("Failed to read stored ledger, starting a new one {e:?}");
            return LedgerState::new(today);
        }
    };

    match decode_state(&blob) {
        Ok(state) => state,
        Err(e) => {
            warn!("Stored ledger is corrupted, starting a new one: {e}");
            LedgerState::new(today)
        }
    }
}

pub fn save_state(store: &impl DurableStore, state: &LedgerState) -> Result<()> {
    let blob = encode_state(state)?;
    store.save(LEDGER_KEY, &blob)
}
