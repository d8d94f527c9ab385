//! The single task that owns the session.
//!
//! WebSocket handlers never touch the [Engine] directly: they post messages to
//! the [Mailbox] and the [Actor] applies them one at a time, in arrival order.

use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use yieldroom_execution::{Audience, Engine, Envelope};
use yieldroom_types::{api::Command, ConnectionId};

use crate::metrics::Metrics;

pub enum Message {
    Connect {
        connection: ConnectionId,
        outbound: mpsc::Sender<String>,
    },
    Command {
        connection: ConnectionId,
        command: Command,
    },
    Disconnect {
        connection: ConnectionId,
    },
}

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("session mailbox closed")]
    Closed,
}

#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
}

impl Mailbox {
    /// Register a connection and the queue its outbound frames are written to.
    pub async fn connect(
        &self,
        connection: ConnectionId,
        outbound: mpsc::Sender<String>,
    ) -> Result<(), MailboxError> {
        self.send(Message::Connect {
            connection,
            outbound,
        })
        .await
    }

    pub async fn command(
        &self,
        connection: ConnectionId,
        command: Command,
    ) -> Result<(), MailboxError> {
        self.send(Message::Command {
            connection,
            command,
        })
        .await
    }

    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), MailboxError> {
        self.send(Message::Disconnect { connection }).await
    }

    async fn send(&self, message: Message) -> Result<(), MailboxError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| MailboxError::Closed)
    }
}

pub struct Actor {
    engine: Engine,
    mailbox: mpsc::Receiver<Message>,
    connections: BTreeMap<ConnectionId, mpsc::Sender<String>>,
    metrics: Arc<Metrics>,
}

impl Actor {
    pub fn new(engine: Engine, mailbox_size: usize, metrics: Arc<Metrics>) -> (Self, Mailbox) {
        let (sender, mailbox) = mpsc::channel(mailbox_size);
        (
            Self {
                engine,
                mailbox,
                connections: BTreeMap::new(),
                metrics,
            },
            Mailbox { sender },
        )
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(message) = self.mailbox.recv().await {
            let envelopes = match message {
                Message::Connect {
                    connection,
                    outbound,
                } => {
                    debug!(%connection, "connection opened");
                    self.metrics.connections.inc();
                    self.connections.insert(connection, outbound);
                    Vec::new()
                }
                Message::Command {
                    connection,
                    command,
                } => {
                    self.metrics.commands.inc();
                    let round = self.engine.session().game().round;
                    let envelopes = self.engine.handle(connection, command);
                    if self.engine.session().game().round > round {
                        self.metrics.rounds_settled.inc();
                    }
                    envelopes
                }
                Message::Disconnect { connection } => {
                    debug!(%connection, "connection closed");
                    self.connections.remove(&connection);
                    self.engine.disconnect(connection)
                }
            };
            self.metrics
                .participants
                .set(self.engine.session().players().len() as i64);
            self.deliver(envelopes);
        }
        info!("session actor stopped");
    }

    fn deliver(&self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            let name = envelope.event.name();
            let text = match envelope.event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(event = name, "failed to encode event: {}", e);
                    continue;
                }
            };
            match envelope.audience {
                Audience::Participant(connection) => self.send(connection, name, text),
                Audience::Facilitator => {
                    if let Some(connection) = self.engine.session().facilitator() {
                        self.send(connection, name, text);
                    }
                }
                Audience::Everyone => {
                    for connection in self.connections.keys() {
                        self.send(*connection, name, text.clone());
                    }
                }
            }
        }
    }

    fn send(&self, connection: ConnectionId, event: &str, text: String) {
        let Some(outbound) = self.connections.get(&connection) else {
            debug!(%connection, event, "no open connection, dropping event");
            return;
        };
        match outbound.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%connection, event, "outbound queue full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%connection, event, "outbound queue closed, dropping event");
            }
        }
    }
}
