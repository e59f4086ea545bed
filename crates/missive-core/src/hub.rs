//! The application object transports talk to.
//!
//! [`Hub`] owns the `messages` [`HookPipeline`] and the
//! [`EventBroadcaster`]. Every call runs hooks, then the service, and on
//! success of a mutating method publishes exactly one [`ServiceEvent`]
//! to the default group. New connections join that group on connect.

use tokio::sync::mpsc;
use tracing::debug;

use crate::channel::{EventBroadcaster, EventKind, ServiceEvent};
use crate::config::MissiveConfig;
use crate::error::ServiceError;
use crate::hooks::{HookContext, HookPipeline, LogErrors, SetTimestamp, TimestampField};
use crate::ids::{ConnectionId, MessageId};
use crate::message::{Message, MessageData, Outcome, Params};
use crate::service::{MessageService, ServiceMethod};

/// Resource path of the message service.
pub const MESSAGES_PATH: &str = "messages";

/// Hook pipeline, service, and real-time channels for one process.
#[derive(Debug)]
pub struct Hub {
    messages: HookPipeline<MessageService>,
    channels: EventBroadcaster,
    default_channel: String,
}

impl Hub {
    /// Build a hub with an empty store and the standard hooks:
    ///
    /// - before `create`: stamp `createdAt`
    /// - before `update`: stamp `updatedAt`
    /// - on error: log path, method, and backtrace
    pub fn new(config: &MissiveConfig) -> Self {
        let mut messages = HookPipeline::new(
            MESSAGES_PATH,
            MessageService::new(config.messages.id_strategy),
        );
        messages
            .before(
                ServiceMethod::Create,
                SetTimestamp::new(TimestampField::CreatedAt),
            )
            .before(
                ServiceMethod::Update,
                SetTimestamp::new(TimestampField::UpdatedAt),
            )
            .on_error(LogErrors);

        Self {
            messages,
            channels: EventBroadcaster::new(config.realtime.channel_capacity),
            default_channel: config.realtime.default_channel.clone(),
        }
    }

    /// The `messages` pipeline.
    pub const fn messages(&self) -> &HookPipeline<MessageService> {
        &self.messages
    }

    /// Mutable access to the `messages` pipeline for registering hooks.
    pub const fn messages_mut(&mut self) -> &mut HookPipeline<MessageService> {
        &mut self.messages
    }

    /// The real-time channels.
    pub const fn channels(&self) -> &EventBroadcaster {
        &self.channels
    }

    /// Register a real-time connection and add it to the default group.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServiceEvent>) {
        let (id, rx) = self.channels.connect();
        self.channels.join(&self.default_channel, id);
        (id, rx)
    }

    /// Tear down a real-time connection.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.channels.disconnect(id)
    }

    /// Run one call through the pipeline and publish its event.
    ///
    /// # Errors
    ///
    /// Returns whatever the hooks or the service raised. Nothing is
    /// published for a failed call.
    pub fn call(&self, context: HookContext) -> Result<Outcome, ServiceError> {
        let method = context.method;
        let outcome = self.messages.call(context)?;

        if let Some(event) = EventKind::for_method(method) {
            let event = ServiceEvent {
                path: self.messages.path().to_owned(),
                event,
                data: outcome.clone(),
            };
            let receivers = self.channels.publish(&self.default_channel, &event);
            debug!(
                path = self.messages.path(),
                %method,
                receivers,
                "Event published"
            );
        }

        Ok(outcome)
    }

    /// All messages in insertion order.
    ///
    /// # Errors
    ///
    /// Propagates hook and service errors.
    pub fn find(&self, params: Params) -> Result<Vec<Message>, ServiceError> {
        self.call(self.context(ServiceMethod::Find, params))
            .map(Outcome::into_collection)
    }

    /// Create a message.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] if `data.text` is missing, or any
    /// hook error.
    pub fn create(&self, data: MessageData, params: Params) -> Result<Message, ServiceError> {
        self.call(self.context(ServiceMethod::Create, params).with_data(data))?
            .into_record()
    }

    /// Replace a message. Not supported by the message service.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MethodNotAllowed`] unless a hook supplies a result.
    pub fn update(
        &self,
        id: MessageId,
        data: MessageData,
        params: Params,
    ) -> Result<Message, ServiceError> {
        let context = self
            .context(ServiceMethod::Update, params)
            .with_id(Some(id))
            .with_data(data);
        self.call(context)?.into_record()
    }

    /// Modify part of a message. Not supported by the message service.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MethodNotAllowed`] unless a hook supplies a result.
    pub fn patch(
        &self,
        id: MessageId,
        data: MessageData,
        params: Params,
    ) -> Result<Message, ServiceError> {
        let context = self
            .context(ServiceMethod::Patch, params)
            .with_id(Some(id))
            .with_data(data);
        self.call(context)?.into_record()
    }

    /// Remove a message and return the remaining ones. An unknown id is a
    /// no-op, and the unchanged collection is still published.
    ///
    /// # Errors
    ///
    /// Propagates hook and service errors.
    pub fn remove(&self, id: MessageId, params: Params) -> Result<Vec<Message>, ServiceError> {
        self.call(self.context(ServiceMethod::Remove, params).with_id(Some(id)))
            .map(Outcome::into_collection)
    }

    /// Create each seed message through the full pipeline.
    ///
    /// # Errors
    ///
    /// Stops at the first failing create.
    pub fn seed<I, T>(&self, texts: I) -> Result<usize, ServiceError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut created: usize = 0;
        for text in texts {
            self.create(MessageData::new(text), Params::default())?;
            created = created.saturating_add(1);
        }
        Ok(created)
    }

    fn context(&self, method: ServiceMethod, params: Params) -> HookContext {
        HookContext::new(self.messages.path(), method, params)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(&MissiveConfig::default())
    }
}
