//! The message service and the [`Service`] trait it implements.
//!
//! A service holds business logic only. It knows nothing about hooks,
//! transports, or real-time events; [`HookPipeline`](crate::hooks::HookPipeline)
//! wraps it to add those.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::ids::MessageId;
use crate::message::{Message, MessageData, Params};
use crate::store::{IdStrategy, MessageStore};

/// A method that can be called on a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMethod {
    /// List records.
    Find,
    /// Create a record.
    Create,
    /// Replace a record.
    Update,
    /// Partially modify a record.
    Patch,
    /// Remove a record.
    Remove,
}

impl ServiceMethod {
    /// Lowercase method name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch => "patch",
            Self::Remove => "remove",
        }
    }
}

impl core::fmt::Display for ServiceMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business operations exposed by a resource.
///
/// `update` and `patch` are optional and reject with
/// [`ServiceError::MethodNotAllowed`] unless overridden.
pub trait Service: Send + Sync {
    /// Return every record.
    fn find(&self, params: &Params) -> Result<Vec<Message>, ServiceError>;

    /// Create a record from the payload and return it.
    fn create(&self, data: MessageData, params: &Params) -> Result<Message, ServiceError>;

    /// Replace the record with the given id.
    fn update(
        &self,
        _id: Option<MessageId>,
        _data: MessageData,
        _params: &Params,
    ) -> Result<Message, ServiceError> {
        Err(ServiceError::MethodNotAllowed(ServiceMethod::Update))
    }

    /// Modify part of the record with the given id.
    fn patch(
        &self,
        _id: Option<MessageId>,
        _data: MessageData,
        _params: &Params,
    ) -> Result<Message, ServiceError> {
        Err(ServiceError::MethodNotAllowed(ServiceMethod::Patch))
    }

    /// Remove the record with the given id and return what is left.
    fn remove(&self, id: Option<MessageId>, params: &Params) -> Result<Vec<Message>, ServiceError>;
}

/// The `messages` resource: find, create, and remove over a
/// [`MessageStore`].
#[derive(Debug, Default)]
pub struct MessageService {
    store: Mutex<MessageStore>,
}

impl MessageService {
    /// Create a service over an empty store.
    pub const fn new(strategy: IdStrategy) -> Self {
        Self {
            store: Mutex::new(MessageStore::new(strategy)),
        }
    }

    /// Number of stored messages.
    pub fn count(&self) -> Result<usize, ServiceError> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MessageStore>, ServiceError> {
        self.store
            .lock()
            .map_err(|e| ServiceError::Internal(format!("message store lock poisoned: {e}")))
    }
}

impl Service for MessageService {
    fn find(&self, _params: &Params) -> Result<Vec<Message>, ServiceError> {
        Ok(self.lock()?.messages().to_vec())
    }

    fn create(&self, data: MessageData, _params: &Params) -> Result<Message, ServiceError> {
        let text = data
            .text
            .ok_or_else(|| ServiceError::Validation(String::from("`text` is required")))?;
        self.lock()?.insert(text, data.created_at, data.updated_at)
    }

    /// A missing id matches nothing, so the call is a no-op.
    fn remove(&self, id: Option<MessageId>, _params: &Params) -> Result<Vec<Message>, ServiceError> {
        let mut store = self.lock()?;
        if let Some(id) = id {
            store.remove(id);
        }
        Ok(store.messages().to_vec())
    }
}
