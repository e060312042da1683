use std::{io::Write, sync::Arc};

use anyhow::{bail, Result};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    ledger::{entities::LedgerEntry, Activity, SessionLedger},
    service::{create_service, shutdown::detect_shutdown, LedgerEvent, LedgerHandle},
    storage::DurableStore,
    utils::clock::Clock,
};

use super::report;

#[derive(Debug, clap::Args)]
pub struct MineCommand {
    #[arg(short, long, help = "Don't render progress, only report how the session ended")]
    quiet: bool,
}

/// Runs a mining session in the foreground. The session ends when the goal is reached or the
/// process is interrupted, progress is saved every second either way.
pub async fn process_mine_command<S: DurableStore>(
    ledger: SessionLedger<S>,
    clock: Arc<dyn Clock>,
    MineCommand { quiet }: MineCommand,
) -> Result<()> {
    let shutdown_token = CancellationToken::new();
    let (service, handle) = create_service(ledger, clock, shutdown_token.clone());

    let (_, service_result, session_result) = tokio::join!(
        detect_shutdown(shutdown_token),
        service.run(),
        drive_session(handle, quiet),
    );

    service_result?;
    session_result
}

async fn drive_session(handle: LedgerHandle, quiet: bool) -> Result<()> {
    let mut events = handle.events();
    let mut changes = handle.changes();

    if handle.toggle().await? != Activity::Mining {
        bail!("Mining session didn't start");
    }
    report::print_session_start(&handle.state());

    let reached: Option<LedgerEntry> = loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(LedgerEvent::GoalReached(entry))) => break Some(entry),
                Some(Ok(LedgerEvent::RolledOver { date })) => report::print_rollover(date),
                Some(Err(e)) => warn!("Missed ledger events {e}"),
                None => break None,
            },
            view = changes.next() => match view {
                Some(view) if !quiet => {
                    report::print_progress(&view);
                    std::io::stdout().flush()?;
                }
                Some(_) => {}
                // Service is gone, most likely interrupted.
                None => break None,
            },
        }
    };
    handle.shutdown();

    match reached {
        Some(entry) => report::print_goal_reached(&entry, &handle.state()),
        None => report::print_session_stopped(&handle.state()),
    }
    Ok(())
}
