use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use medlink_types::events::ServerEvent;

/// Identity attached to a connection at handshake time. Trusted as handed
/// to us: validating it is the job of whatever sits in front of the relay.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    /// Free-form ("patient", "medecin", ...); used for logging only.
    pub role: String,
}

/// Tracks every live connection, grouped by user. One user may hold several
/// connections at once (multiple tabs/devices), so "deliver to user" fans
/// out to the whole group.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    /// user_id -> (conn_id -> outbound event channel)
    groups: RwLock<HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<ServerEvent>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection under its user's group and make it reachable for
    /// delivery. Returns the connection id used to evict it later.
    pub async fn admit(&self, user_id: &str, tx: mpsc::UnboundedSender<ServerEvent>) -> Uuid {
        let conn_id = Uuid::new_v4();
        let mut groups = self.inner.groups.write().await;
        groups.entry(user_id.to_string()).or_default().insert(conn_id, tx);
        conn_id
    }

    /// Remove a connection from its group. Idempotent: evicting an unknown
    /// or already-evicted connection is a no-op.
    pub async fn evict(&self, user_id: &str, conn_id: Uuid) {
        let mut groups = self.inner.groups.write().await;
        if let Some(group) = groups.get_mut(user_id) {
            group.remove(&conn_id);
            if group.is_empty() {
                groups.remove(user_id);
            }
        }
    }

    /// Send an event to every connection in the user's group. An offline
    /// user (empty or missing group) is a silent no-op; there is no queuing
    /// or offline delivery. Returns how many connections were reached.
    pub async fn deliver_to_user(&self, user_id: &str, event: ServerEvent) -> usize {
        let groups = self.inner.groups.read().await;
        let Some(group) = groups.get(user_id) else {
            debug!("deliver to {}: offline, dropped", user_id);
            return 0;
        };
        let mut delivered = 0;
        for tx in group.values() {
            // A send can only fail if the connection task already exited;
            // eviction will catch up with it.
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of live connections for a user.
    pub async fn group_size(&self, user_id: &str) -> usize {
        self.inner.groups.read().await.get(user_id).map_or(0, HashMap::len)
    }
}
