//! Message store, service hooks, and real-time fan-out for Missive.
//!
//! This crate holds everything that is not transport: the `messages`
//! resource and the machinery around it.
//!
//! # Modules
//!
//! - [`store`] -- [`MessageStore`], the ordered in-memory list and its id
//!   assignment.
//! - [`service`] -- the [`Service`] trait and [`MessageService`].
//! - [`hooks`] -- [`HookPipeline`]: before/after hooks, timestamping,
//!   and error interceptors.
//! - [`channel`] -- [`EventBroadcaster`]: connection groups and event
//!   fan-out.
//! - [`hub`] -- [`Hub`], which wires the above together for a transport.
//! - [`config`] -- configuration loading from `missive-config.yaml`.
//!
//! # Call flow
//!
//! A transport hands a call to [`Hub::call`]. Before hooks run, then the
//! service method, then after hooks. On success of a mutating method the
//! hub publishes one [`ServiceEvent`] to every connection in the
//! `everybody` group. On failure, error hooks log the path, method, and a
//! backtrace, and the error goes back to the transport unchanged.
//!
//! [`MessageStore`]: store::MessageStore
//! [`Service`]: service::Service
//! [`MessageService`]: service::MessageService
//! [`HookPipeline`]: hooks::HookPipeline
//! [`EventBroadcaster`]: channel::EventBroadcaster
//! [`ServiceEvent`]: channel::ServiceEvent

pub mod channel;
pub mod config;
pub mod error;
pub mod hooks;
pub mod hub;
pub mod ids;
pub mod message;
pub mod service;
pub mod store;

pub use config::MissiveConfig;
pub use error::ServiceError;
pub use hub::{Hub, MESSAGES_PATH};
pub use ids::{ConnectionId, MessageId};
pub use message::{Message, MessageData, Outcome, Params, Provider};
pub use service::ServiceMethod;
