//! The core dispatcher: one Tokio task that owns the [`Core`].
//!
//! Connection handlers never touch shared state. They send a
//! [`CoreCommand`] through a [`CoreHandle`] and the dispatcher applies it.
//! The presence tick is just another arm of the same `select!`, so a tick
//! can never observe a half-applied join or disconnect.

use chrono::{DateTime, Utc};
use nightowl_clock::{Clock, TickConfig, TickScheduler};
use nightowl_protocol::MatchId;
use nightowl_session::EventSender;
use nightowl_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::coordinator::{Core, CoreStats};
use crate::NightowlError;

/// Commands a connection handler can send to the dispatcher.
///
/// `Stats` carries a oneshot reply channel; everything else is
/// fire-and-forget, since events reach the client through its sink.
pub(crate) enum CoreCommand {
    Connect {
        conn: ConnectionId,
        sink: EventSender,
    },
    Join {
        conn: ConnectionId,
        display_name: String,
    },
    SendMessage {
        conn: ConnectionId,
        match_id: MatchId,
        body: String,
    },
    Disconnect {
        conn: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<CoreStats>,
    },
    Shutdown,
}

/// Handle to the running dispatcher.
///
/// Cheap to clone; every connection handler holds one.
#[derive(Clone)]
pub struct CoreHandle {
    sender: mpsc::Sender<CoreCommand>,
}

impl CoreHandle {
    /// Registers a connection's outbound sink.
    pub async fn connect(&self, conn: ConnectionId, sink: EventSender) -> Result<(), NightowlError> {
        self.send(CoreCommand::Connect { conn, sink }).await
    }

    pub async fn join(&self, conn: ConnectionId, display_name: String) -> Result<(), NightowlError> {
        self.send(CoreCommand::Join { conn, display_name }).await
    }

    pub async fn send_message(
        &self,
        conn: ConnectionId,
        match_id: MatchId,
        body: String,
    ) -> Result<(), NightowlError> {
        self.send(CoreCommand::SendMessage {
            conn,
            match_id,
            body,
        })
        .await
    }

    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), NightowlError> {
        self.send(CoreCommand::Disconnect { conn }).await
    }

    /// Requests a snapshot of the core's counters.
    pub async fn stats(&self) -> Result<CoreStats, NightowlError> {
        let (reply, rx) = oneshot::channel();
        self.send(CoreCommand::Stats { reply }).await?;
        rx.await.map_err(|_| NightowlError::CoreUnavailable)
    }

    /// Stops the dispatcher. Commands already queued ahead of this one are
    /// still applied.
    pub async fn shutdown(&self) -> Result<(), NightowlError> {
        self.send(CoreCommand::Shutdown).await
    }

    /// `true` once the dispatcher has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: CoreCommand) -> Result<(), NightowlError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| NightowlError::CoreUnavailable)
    }
}

struct Dispatcher<C: Clock> {
    core: Core,
    clock: C,
    scheduler: TickScheduler,
    receiver: mpsc::Receiver<CoreCommand>,
}

impl<C: Clock> Dispatcher<C> {
    async fn run(mut self) {
        tracing::info!(period = ?self.scheduler.period(), "core dispatcher started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                info = self.scheduler.wait_for_tick() => {
                    let now = self.now();
                    self.core.presence_tick(info.tick, now);
                }
            }
        }

        tracing::info!(stats = ?self.core.stats(), "core dispatcher stopped");
    }

    /// Applies one command. Returns `false` on shutdown.
    fn handle(&mut self, cmd: CoreCommand) -> bool {
        match cmd {
            CoreCommand::Connect { conn, sink } => self.core.connect(conn, sink),
            CoreCommand::Join { conn, display_name } => {
                let now = self.now();
                self.core.join(conn, &display_name, now);
            }
            CoreCommand::SendMessage {
                conn,
                match_id,
                body,
            } => {
                let now = self.now();
                self.core.send_message(conn, match_id, &body, now);
            }
            CoreCommand::Disconnect { conn } => self.core.disconnect(conn),
            CoreCommand::Stats { reply } => {
                let _ = reply.send(self.core.stats());
            }
            CoreCommand::Shutdown => return false,
        }
        true
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Spawns the dispatcher task and returns a handle to it.
///
/// `channel_size` bounds the command queue; handlers wait when it is
/// full.
pub fn spawn_core<C: Clock>(core: Core, clock: C, tick: TickConfig, channel_size: usize) -> CoreHandle {
    let (sender, receiver) = mpsc::channel(channel_size.max(1));
    let dispatcher = Dispatcher {
        core,
        clock,
        scheduler: TickScheduler::new(tick),
        receiver,
    };
    tokio::spawn(dispatcher.run());
    CoreHandle { sender }
}
