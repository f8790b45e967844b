//! In-process gateway backed by one bounded mailbox per connected target

use async_trait::async_trait;
use conveyor_core::dto::command::Command;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc, oneshot};
use uuid::Uuid;

use super::{CommandGateway, CommandTarget, Delivery, DispatchError, Envelope};

pub struct ChannelGateway {
    capacity: usize,
    mailboxes: RwLock<HashMap<CommandTarget, mpsc::Sender<Envelope>>>,
}

impl ChannelGateway {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            mailboxes: RwLock::new(HashMap::new()),
        }
    }

    /// Register a target and return the receiving end of its mailbox.
    ///
    /// Reconnecting replaces the previous mailbox; commands still queued in
    /// the old one are lost.
    pub async fn connect(&self, target: CommandTarget) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.mailboxes.write().await.insert(target, tx);
        tracing::debug!("{} connected", target);
        rx
    }

    /// Drop the mailbox of `target` only if it is still the closed `sender`;
    /// a reconnect may have replaced it since it was read.
    async fn remove_closed(&self, target: CommandTarget, sender: &mpsc::Sender<Envelope>) {
        let mut mailboxes = self.mailboxes.write().await;
        if mailboxes
            .get(&target)
            .is_some_and(|current| current.same_channel(sender))
        {
            mailboxes.remove(&target);
        }
    }

    pub async fn disconnect(&self, target: CommandTarget) {
        if self.mailboxes.write().await.remove(&target).is_some() {
            tracing::debug!("{} disconnected", target);
        }
    }

    pub async fn is_connected(&self, target: CommandTarget) -> bool {
        self.mailboxes
            .read()
            .await
            .get(&target)
            .is_some_and(|tx| !tx.is_closed())
    }

    async fn enqueue(&self, target: CommandTarget, envelope: Envelope) -> Delivery {
        let sender = self.mailboxes.read().await.get(&target).cloned();

        let Some(sender) = sender else {
            return Delivery::Offline;
        };

        match sender.try_send(envelope) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Mailbox of {} is full, dropping command", target);
                Delivery::Offline
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Receiver went away without disconnecting
                self.remove_closed(target, &sender).await;
                Delivery::Offline
            }
        }
    }
}

#[async_trait]
impl CommandGateway for ChannelGateway {
    async fn send_command(
        &self,
        team_id: Uuid,
        target: CommandTarget,
        command: Command,
    ) -> Delivery {
        let kind = command.kind;
        let delivery = self
            .enqueue(
                target,
                Envelope {
                    team_id,
                    command,
                    reply: None,
                },
            )
            .await;

        tracing::debug!("Command {:?} to {}: {:?}", kind, target, delivery);
        delivery
    }

    async fn send_command_await_reply(
        &self,
        team_id: Uuid,
        target: CommandTarget,
        command: Command,
        timeout: Duration,
    ) -> Result<Value, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        let envelope = Envelope {
            team_id,
            command,
            reply: Some(reply_tx),
        };

        if self.enqueue(target, envelope).await == Delivery::Offline {
            return Err(DispatchError::Offline(target));
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(DispatchError::Closed(target)),
            Err(_) => Err(DispatchError::Timeout { target, timeout }),
        }
    }
}
