//! In-memory message store.
//!
//! [`MessageStore`] keeps messages in insertion order and assigns ids.
//! It is a plain owned value; [`MessageService`](crate::service::MessageService)
//! wraps it in a mutex and is its only user.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ServiceError;
use crate::ids::MessageId;
use crate::message::Message;

/// How new message ids are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Monotonic counter starting at zero. Ids are never reused.
    #[default]
    Counter,
    /// Id equals the store length before insertion. Ids can collide after
    /// a removal; kept for clients that depend on the legacy numbering.
    StoreLength,
}

/// Ordered, process-local collection of messages.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    next_id: u64,
    strategy: IdStrategy,
}

impl MessageStore {
    /// Create an empty store using the given id strategy.
    pub const fn new(strategy: IdStrategy) -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
            strategy,
        }
    }

    /// All messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a new message and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the id space is exhausted.
    pub fn insert(
        &mut self,
        text: String,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Result<Message, ServiceError> {
        let id = self.assign_id()?;
        let message = Message {
            id,
            text,
            created_at,
            updated_at,
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Remove the first message with the given id.
    ///
    /// Returns the removed record, or `None` if no message matched. The
    /// relative order of the remaining messages is unchanged.
    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    fn assign_id(&mut self) -> Result<MessageId, ServiceError> {
        match self.strategy {
            IdStrategy::Counter => {
                let id = self.next_id;
                self.next_id = id
                    .checked_add(1)
                    .ok_or_else(|| ServiceError::Internal(String::from("message id overflow")))?;
                Ok(MessageId(id))
            }
            IdStrategy::StoreLength => u64::try_from(self.messages.len())
                .map(MessageId)
                .map_err(|e| ServiceError::Internal(format!("message id overflow: {e}"))),
        }
    }
}
