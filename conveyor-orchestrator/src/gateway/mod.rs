//! Command Dispatch Gateway
//!
//! Channel used to tell runtimes what to do: restart an instance with new
//! settings, or make a device fetch its target snapshot. Device delivery is
//! best-effort; a device may be offline for any length of time and picks up
//! its target on reconnect.

pub mod channel;

pub use channel::ChannelGateway;

use async_trait::async_trait;
use conveyor_core::dto::command::Command;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Runtime a command is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTarget {
    Instance(Uuid),
    Device(Uuid),
}

impl std::fmt::Display for CommandTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance(id) => write!(f, "instance {}", id),
            Self::Device(id) => write!(f, "device {}", id),
        }
    }
}

/// Outcome of a fire-and-forget send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the target's mailbox
    Queued,
    /// Nobody is listening; the target catches up from its stored pointer later
    Offline,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{0} is not connected")]
    Offline(CommandTarget),

    #[error("{target} did not reply within {timeout:?}")]
    Timeout {
        target: CommandTarget,
        timeout: Duration,
    },

    #[error("{0} dropped the command without replying")]
    Closed(CommandTarget),
}

/// What a connected runtime receives from its mailbox
#[derive(Debug)]
pub struct Envelope {
    pub team_id: Uuid,
    pub command: Command,
    /// Present when the sender waits for an answer
    pub reply: Option<oneshot::Sender<Value>>,
}

impl Envelope {
    /// Answer the sender, if it is waiting
    pub fn respond(self, response: Value) {
        if let Some(reply) = self.reply {
            // The sender may have timed out already
            let _ = reply.send(response);
        }
    }
}

#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// Enqueue a command and return without waiting for the target
    async fn send_command(&self, team_id: Uuid, target: CommandTarget, command: Command)
    -> Delivery;

    /// Enqueue a command and wait (bounded) for the target's reply
    async fn send_command_await_reply(
        &self,
        team_id: Uuid,
        target: CommandTarget,
        command: Command,
        timeout: Duration,
    ) -> Result<Value, DispatchError>;
}
