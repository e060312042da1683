//! Runs the accrual loop around a [SessionLedger].
//!
//! [LedgerService] owns the ledger and is the only place it is touched once the service starts.
//! Commands from the presentation layer and ticks from the clock are handled one at a time in a
//! single event loop, so no locking is needed. [LedgerHandle] is the cheap, cloneable side the
//! presentation layer talks to.

pub mod shutdown;

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use futures::{stream::BoxStream, StreamExt};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    time::Instant,
};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};

use crate::{
    ledger::{
        entities::LedgerEntry, view::LedgerView, Activity, ProfileUpdate, SessionLedger,
        TickOutcome,
    },
    storage::DurableStore,
    utils::{
        clock::Clock,
        ticker::{ticks, TICK_PERIOD},
    },
};

const COMMAND_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 16;

/// One-shot notifications. Every event is published exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    GoalReached(LedgerEntry),
    RolledOver { date: NaiveDate },
}

#[derive(Debug)]
enum LedgerCommand {
    Toggle {
        reply: oneshot::Sender<Activity>,
    },
    Spend {
        amount: u64,
        description: String,
        reply: oneshot::Sender<bool>,
    },
    UpdateProfile {
        update: ProfileUpdate,
        reply: oneshot::Sender<()>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

enum Step {
    Shutdown,
    Command(Option<LedgerCommand>),
    Tick(Option<Instant>),
}

pub struct LedgerService<S: DurableStore> {
    ledger: SessionLedger<S>,
    clock: Arc<dyn Clock>,
    commands: mpsc::Receiver<LedgerCommand>,
    view: watch::Sender<LedgerView>,
    events: broadcast::Sender<LedgerEvent>,
    shutdown: CancellationToken,
    tick_period: Duration,
}

#[derive(Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<LedgerCommand>,
    view: watch::Receiver<LedgerView>,
    events: broadcast::Sender<LedgerEvent>,
    shutdown: CancellationToken,
}

/// Wires a service to its handle. Nothing runs until [LedgerService::run] is awaited.
pub fn create_service<S: DurableStore>(
    ledger: SessionLedger<S>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) -> (LedgerService<S>, LedgerHandle) {
    let (command_sender, command_receiver) = mpsc::channel(COMMAND_BUFFER);
    let (view_sender, view_receiver) = watch::channel(ledger.view());
    let (event_sender, _) = broadcast::channel(EVENT_BUFFER);

    let service = LedgerService {
        ledger,
        clock,
        commands: command_receiver,
        view: view_sender,
        events: event_sender.clone(),
        shutdown: shutdown.clone(),
        tick_period: TICK_PERIOD,
    };
    let handle = LedgerHandle {
        commands: command_sender,
        view: view_receiver,
        events: event_sender,
        shutdown,
    };
    (service, handle)
}

impl<S: DurableStore> LedgerService<S> {
    /// Executes the ledger event loop until shutdown is requested or every handle is dropped.
    pub async fn run(mut self) -> Result<()> {
        let mut ticker: Option<BoxStream<'static, Instant>> = None;
        loop {
            // The tick subscription only exists while mining. Dropping it here, before the next
            // poll, guarantees that no tick is delivered after the session stops.
            match (self.ledger.is_active(), ticker.is_some()) {
                (true, false) => {
                    debug!("Subscribing to ticks");
                    ticker = Some(ticks(self.clock.clone(), self.tick_period));
                }
                (false, true) => {
                    debug!("Cancelling tick subscription");
                    ticker = None;
                }
                _ => {}
            }

            let step = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Step::Shutdown,
                command = self.commands.recv() => Step::Command(command),
                tick = next_tick(&mut ticker) => Step::Tick(tick),
            };

            match step {
                Step::Shutdown | Step::Command(None) => break,
                Step::Command(Some(command)) => self.handle_command(command),
                Step::Tick(Some(_)) => self.handle_tick(),
                Step::Tick(None) => {
                    warn!("Tick source ended unexpectedly");
                    ticker = None;
                }
            }
        }

        self.ledger.stop();
        info!("Ledger service stopped");
        Ok(())
    }

    fn handle_command(&mut self, command: LedgerCommand) {
        let span = info_span!("Handling ledger command");
        let _entered = span.enter();
        debug!("Received {:?}", command);

        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            LedgerCommand::Toggle { reply } => {
                let _ = reply.send(self.ledger.toggle());
            }
            LedgerCommand::Spend {
                amount,
                description,
                reply,
            } => {
                let _ = reply.send(self.ledger.spend(amount, &description));
            }
            LedgerCommand::UpdateProfile { update, reply } => {
                self.ledger.update_profile(update);
                let _ = reply.send(());
            }
            LedgerCommand::Reset { reply } => {
                self.ledger.reset();
                let _ = reply.send(());
            }
        }
        self.publish_view();
    }

    fn handle_tick(&mut self) {
        match self.ledger.on_tick() {
            TickOutcome::Ignored => return,
            TickOutcome::Accrued => {}
            TickOutcome::RolledOver => {
                let date = self.ledger.state().last_active_date;
                self.publish_event(LedgerEvent::RolledOver { date });
            }
            TickOutcome::GoalCompleted => {}
        }

        if self.ledger.take_goal_reached() {
            if let Some(entry) = self.ledger.state().history.first().cloned() {
                self.publish_event(LedgerEvent::GoalReached(entry));
            }
        }
        self.publish_view();
    }

    fn publish_view(&self) {
        self.view.send_replace(self.ledger.view());
    }

    fn publish_event(&self, event: LedgerEvent) {
        info!("Publishing {:?}", event);
        // Having no subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn next_tick(ticker: &mut Option<BoxStream<'static, Instant>>) -> Option<Instant> {
    match ticker {
        Some(ticker) => ticker.next().await,
        None => std::future::pending().await,
    }
}

impl LedgerHandle {
    /// Latest snapshot of the ledger.
    pub fn state(&self) -> LedgerView {
        self.view.borrow().clone()
    }

    /// Snapshots published after every change, starting with the current one.
    pub fn changes(&self) -> WatchStream<LedgerView> {
        WatchStream::new(self.view.clone())
    }

    /// One-shot events published after this call.
    pub fn events(&self) -> BroadcastStream<LedgerEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    pub async fn toggle(&self) -> Result<Activity> {
        self.request(|reply| LedgerCommand::Toggle { reply }).await
    }

    pub async fn spend(&self, amount: u64, description: impl Into<String>) -> Result<bool> {
        let description = description.into();
        self.request(|reply| LedgerCommand::Spend {
            amount,
            description,
            reply,
        })
        .await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<()> {
        self.request(|reply| LedgerCommand::UpdateProfile { update, reply })
            .await
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| LedgerCommand::Reset { reply }).await
    }

    /// Asks the service to stop. Mining stops with it.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> LedgerCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| anyhow!("Ledger service has stopped"))?;
        response
            .await
            .map_err(|_| anyhow!("Ledger service stopped before replying"))
    }
}
