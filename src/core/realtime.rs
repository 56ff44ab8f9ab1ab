//! In-process fan-out of chat and notification events to open event streams.
//!
//! Delivery is best effort: a subscriber that falls behind the channel
//! capacity skips the events it missed.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::messages::Message;
use crate::models::notifications::Notification;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("event stream closed")]
    Closed,
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReadReceipt {
    pub reader_id: Uuid,
    pub message_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeletedMessage {
    pub message_id: Uuid,
    pub deleted_by: Uuid,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypingSignal {
    pub from: Uuid,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum HubEvent {
    Message(Message),
    Read(ReadReceipt),
    Delete(DeletedMessage),
    Typing(TypingSignal),
    Notification(Notification),
}

impl HubEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HubEvent::Message(_) => "message",
            HubEvent::Read(_) => "read",
            HubEvent::Delete(_) => "delete",
            HubEvent::Typing(_) => "typing",
            HubEvent::Notification(_) => "notification",
        }
    }

    pub fn to_sse_frame(&self) -> Result<String, HubError> {
        let data = serde_json::to_string(self)?;
        Ok(format!("event: {}\ndata: {}\n\n", self.name(), data))
    }
}

#[derive(Debug, Clone)]
struct Envelope {
    recipient: Uuid,
    event: HubEvent,
}

#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<Envelope>,
    presence: Arc<Mutex<HashMap<Uuid, usize>>>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            presence: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fire and forget. Nobody listening is not an error.
    pub fn publish(&self, recipient: Uuid, event: HubEvent) {
        let event_name = event.name();
        if self.sender.send(Envelope { recipient, event }).is_err() {
            tracing::debug!(%recipient, event_name, "no open event streams");
        }
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.connections(user_id) > 0
    }

    pub fn connections(&self, user_id: Uuid) -> usize {
        self.presence
            .lock()
            .map(|presence| presence.get(&user_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn subscribe(&self, user_id: Uuid) -> Subscription {
        if let Ok(mut presence) = self.presence.lock() {
            *presence.entry(user_id).or_insert(0) += 1;
        }

        Subscription {
            user_id,
            receiver: self.sender.subscribe(),
            _guard: PresenceGuard {
                user_id,
                presence: Arc::clone(&self.presence),
            },
        }
    }
}

struct PresenceGuard {
    user_id: Uuid,
    presence: Arc<Mutex<HashMap<Uuid, usize>>>,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        if let Ok(mut presence) = self.presence.lock() {
            if let Some(count) = presence.get_mut(&self.user_id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    presence.remove(&self.user_id);
                }
            }
        }
    }
}

pub struct Subscription {
    user_id: Uuid,
    receiver: broadcast::Receiver<Envelope>,
    _guard: PresenceGuard,
}

impl Subscription {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Next event addressed to this subscriber.
    pub async fn next_event(&mut self) -> Result<HubEvent, HubError> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.recipient == self.user_id => return Ok(envelope.event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %self.user_id, skipped, "event stream lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return Err(HubError::Closed),
            }
        }
    }
}
