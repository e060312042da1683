//! Personal mining session tracker. Time spent in an active session accrues towards a daily goal,
//! every completed goal is converted into a point and points can later be spent.
//!
//! The core is [ledger::SessionLedger]; [service::LedgerService] drives it with a one second
//! tick while a session is active, and [storage] keeps it across restarts.

pub mod cli;
pub mod fs;
pub mod ledger;
pub mod service;
pub mod storage;
pub mod utils;
