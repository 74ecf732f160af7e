use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod messages;

/// Unique identifier for a registered connection.
///
/// Each WebSocket session gets a unique subscriber ID when it registers,
/// allowing precise cleanup when the connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared role of a connection, controlling notification authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    /// Parse the `client` query parameter; anything but `admin` is a
    /// plain receiver.
    pub fn from_client_param(value: Option<&str>) -> Self {
        match value {
            Some("admin") => Role::Sender,
            _ => Role::Receiver,
        }
    }
}

/// Subscriber entry with ID and outbound channel
struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

/// Registry of currently connected WebSocket subscribers.
///
/// Holds only the outbound channel end of each session; the connection
/// itself stays owned by its session actor. Broadcast takes a snapshot of
/// the senders under the lock and performs the sends outside it, so a
/// slow or dead connection never blocks registration.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<Vec<Subscriber>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber with its declared role.
    ///
    /// Returns the subscriber ID (used for cleanup) and the channel on
    /// which the session receives broadcast lines.
    pub async fn register(&self, role: Role) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard.push(Subscriber { id, sender: tx });

        tracing::debug!(
            subscriber = ?id,
            ?role,
            total = guard.len(),
            "registered subscriber"
        );

        (id, rx)
    }

    /// Remove a subscriber; a no-op if it is already gone.
    pub async fn deregister(&self, id: SubscriberId) {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|s| s.id != id);

        if guard.len() != before {
            tracing::debug!(subscriber = ?id, remaining = guard.len(), "deregistered subscriber");
        }
    }

    /// Deliver a line to every registered subscriber, regardless of role.
    ///
    /// Delivery is best-effort per connection: a failed send marks that
    /// subscriber dead and it is pruned afterwards, without affecting
    /// delivery to the rest.
    pub async fn broadcast(&self, line: &str) {
        let targets: Vec<(SubscriberId, UnboundedSender<String>)> = {
            let guard = self.inner.read().await;
            guard.iter().map(|s| (s.id, s.sender.clone())).collect()
        };

        let mut dead = Vec::new();
        for (id, sender) in targets {
            if sender.send(line.to_string()).is_err() {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut guard = self.inner.write().await;
            guard.retain(|s| !dead.contains(&s.id));
            tracing::debug!(
                pruned = dead.len(),
                remaining = guard.len(),
                "pruned dead subscribers during broadcast"
            );
        }
    }

    /// Number of currently registered subscribers (observability only).
    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_registry_is_empty() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn register_and_deregister() {
        let registry = ConnectionRegistry::new();
        let (id, _rx) = registry.register(Role::Receiver).await;
        assert_eq!(registry.count().await, 1);

        registry.deregister(id).await;
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn deregister_absent_is_noop() {
        let registry = ConnectionRegistry::new();
        let (_id, _rx) = registry.register(Role::Sender).await;

        registry.deregister(SubscriberId::new()).await;
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let registry = ConnectionRegistry::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (_id, rx) = registry.register(Role::Receiver).await;
            receivers.push(rx);
        }

        registry.broadcast("[Notification] hi").await;

        for rx in receivers.iter_mut() {
            assert_eq!(rx.recv().await.as_deref(), Some("[Notification] hi"));
        }
    }

    #[tokio::test]
    async fn broadcast_includes_senders() {
        let registry = ConnectionRegistry::new();
        let (_id, mut sender_rx) = registry.register(Role::Sender).await;

        registry.broadcast("[Notification] own").await;
        assert_eq!(sender_rx.recv().await.as_deref(), Some("[Notification] own"));
    }

    #[tokio::test]
    async fn dead_subscriber_is_pruned_without_blocking_others() {
        let registry = ConnectionRegistry::new();
        let (_dead_id, dead_rx) = registry.register(Role::Receiver).await;
        let (_live_id, mut live_rx) = registry.register(Role::Receiver).await;

        drop(dead_rx);
        registry.broadcast("[Notification] still here").await;

        assert_eq!(
            live_rx.recv().await.as_deref(),
            Some("[Notification] still here")
        );
        assert_eq!(registry.count().await, 1);
    }

    #[test]
    fn role_parsing_defaults_to_receiver() {
        assert_eq!(Role::from_client_param(Some("admin")), Role::Sender);
        assert_eq!(Role::from_client_param(Some("user")), Role::Receiver);
        assert_eq!(Role::from_client_param(Some("other")), Role::Receiver);
        assert_eq!(Role::from_client_param(None), Role::Receiver);
    }
}
