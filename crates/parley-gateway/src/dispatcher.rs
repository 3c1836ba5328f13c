use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::trace;
use uuid::Uuid;

use parley_types::events::GatewayEvent;

/// Fans gateway events out to connected clients and tracks who is online.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every connection subscribes; each one keeps only events addressed to its user.
    events_tx: broadcast::Sender<GatewayEvent>,

    /// user_id -> live connection ids. A user may be connected from several devices.
    online: RwLock<HashMap<i64, HashSet<Uuid>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                events_tx,
                online: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Queue an event for its recipient. Safe to call from blocking code.
    /// Events for users with no open connection are dropped.
    pub fn publish(&self, event: GatewayEvent) {
        let recipient = event.recipient();
        if self.inner.events_tx.send(event).is_err() {
            trace!("No gateway subscribers, dropped event for user {}", recipient);
        }
    }

    /// Register a new connection for `user_id`. Returns its connection id.
    pub async fn connect(&self, user_id: i64) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner
            .online
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(conn_id);
        conn_id
    }

    /// Drop one connection. The user stays online while any other connection remains.
    pub async fn disconnect(&self, user_id: i64, conn_id: Uuid) {
        let mut online = self.inner.online.write().await;
        if let Some(conns) = online.get_mut(&user_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                online.remove(&user_id);
            }
        }
    }

    pub async fn is_online(&self, user_id: i64) -> bool {
        self.inner.online.read().await.contains_key(&user_id)
    }

    pub async fn online_count(&self) -> usize {
        self.inner.online.read().await.len()
    }
}
