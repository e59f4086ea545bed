//! Real-time event fan-out over named connection groups.
//!
//! Each connection gets its own bounded [`mpsc`] queue. Publishing to a
//! group is a non-blocking `try_send` into every member's queue:
//!
//! - a full queue drops the event for that connection only;
//! - a closed queue means the client went away, and the connection is
//!   pruned from every group.
//!
//! Neither case affects delivery to the other members.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::ids::ConnectionId;
use crate::message::Outcome;
use crate::service::ServiceMethod;

/// Name of the group every connection joins on connect.
pub const EVERYBODY: &str = "everybody";

/// Default per-connection queue size.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Kind of state change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A record was created.
    Created,
    /// A record was replaced.
    Updated,
    /// A record was partially modified.
    Patched,
    /// A record was removed.
    Removed,
}

impl EventKind {
    /// Event emitted by a successful call to `method`. `find` emits nothing.
    pub const fn for_method(method: ServiceMethod) -> Option<Self> {
        match method {
            ServiceMethod::Find => None,
            ServiceMethod::Create => Some(Self::Created),
            ServiceMethod::Update => Some(Self::Updated),
            ServiceMethod::Patch => Some(Self::Patched),
            ServiceMethod::Remove => Some(Self::Removed),
        }
    }
}

/// A published service event, as delivered to real-time clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEvent {
    /// Resource path that changed.
    pub path: String,
    /// What happened.
    pub event: EventKind,
    /// The call result: the new record, or the remaining collection.
    pub data: Outcome,
}

#[derive(Debug, Default)]
struct Registry {
    connections: BTreeMap<ConnectionId, mpsc::Sender<ServiceEvent>>,
    groups: BTreeMap<String, BTreeSet<ConnectionId>>,
}

/// Connection registry and group publisher.
#[derive(Debug)]
pub struct EventBroadcaster {
    capacity: usize,
    registry: RwLock<Registry>,
}

impl EventBroadcaster {
    /// Create a broadcaster whose per-connection queues hold `capacity`
    /// events. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Register a new connection and return its id and event receiver.
    ///
    /// The connection belongs to no group until [`join`](Self::join) is
    /// called.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServiceEvent>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = ConnectionId::new();
        self.write().connections.insert(id, tx);
        debug!(connection_id = %id, "Connection registered");
        (id, rx)
    }

    /// Add a connection to a group. Returns `false` if the connection is
    /// unknown.
    pub fn join(&self, group: &str, id: ConnectionId) -> bool {
        let mut registry = self.write();
        if !registry.connections.contains_key(&id) {
            return false;
        }
        registry.groups.entry(group.to_owned()).or_default().insert(id);
        true
    }

    /// Remove a connection from a group. Empty groups are dropped.
    pub fn leave(&self, group: &str, id: ConnectionId) -> bool {
        let mut registry = self.write();
        let Some(members) = registry.groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(&id);
        if members.is_empty() {
            registry.groups.remove(group);
        }
        removed
    }

    /// Tear down a connection: drop its queue and remove it from every
    /// group. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut registry = self.write();
        let existed = registry.connections.remove(&id).is_some();
        registry.groups.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
        if existed {
            debug!(connection_id = %id, "Connection removed");
        }
        existed
    }

    /// Deliver `event` to every member of `group`.
    ///
    /// Returns the number of connections the event was queued for.
    /// Publishing to an empty or unknown group is not an error.
    pub fn publish(&self, group: &str, event: &ServiceEvent) -> usize {
        let mut delivered: usize = 0;
        let mut closed = Vec::new();
        {
            let registry = self.read();
            let Some(members) = registry.groups.get(group) else {
                return 0;
            };
            for id in members {
                let Some(tx) = registry.connections.get(id) else {
                    continue;
                };
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered = delivered.saturating_add(1),
                    Err(TrySendError::Full(_)) => {
                        warn!(connection_id = %id, group, "Connection queue full, dropping event");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }
        for id in closed {
            self.disconnect(id);
        }
        delivered
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    /// Members of a group, in id order.
    pub fn members(&self, group: &str) -> Vec<ConnectionId> {
        self.read()
            .groups
            .get(group)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
