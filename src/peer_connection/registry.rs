use std::collections::HashMap;
use std::sync::{Arc, Weak};

use rand::Rng;
use tokio::sync::Mutex;

use super::{ConnectionId, RTCPeerConnection};
use crate::error::{Error, Result};

/// Upper bound (inclusive) of randomly drawn connection ids.
pub(crate) const MAX_CONNECTION_ID: ConnectionId = 100_000_000;

#[derive(Default)]
struct Connections {
    live: HashMap<ConnectionId, Arc<RTCPeerConnection>>,
    // Unregistering keeps the route so that the terminal state events
    // emitted after removal still reach the proxy.
    routes: HashMap<ConnectionId, Weak<RTCPeerConnection>>,
}

impl Connections {
    fn is_taken(&self, id: ConnectionId) -> bool {
        self.live.contains_key(&id)
            || self
                .routes
                .get(&id)
                .is_some_and(|route| route.strong_count() > 0)
    }

    fn prune_routes(&mut self) {
        self.routes.retain(|_, route| route.strong_count() > 0);
    }
}

/// PeerConnectionRegistry maps connection ids to the live proxies.
///
/// One registry is owned by each [`crate::api::API`]. A record is added when
/// a proxy is constructed and removed once the connection reports `closed`.
/// Events are routed by a separate table of weak references, so a removed
/// proxy keeps receiving events for as long as the application holds it.
#[derive(Default)]
pub struct PeerConnectionRegistry {
    connections: Mutex<Connections>,
}

impl PeerConnectionRegistry {
    pub fn new() -> Self {
        PeerConnectionRegistry::default()
    }

    /// register adds a record under an explicit id.
    pub async fn register(&self, id: ConnectionId, pc: Arc<RTCPeerConnection>) -> Result<()> {
        let mut connections = self.connections.lock().await;
        if connections.live.contains_key(&id) {
            return Err(Error::ErrConnectionIdInUse(id));
        }
        connections.routes.insert(id, Arc::downgrade(&pc));
        connections.live.insert(id, pc);
        Ok(())
    }

    /// register_new draws an id that neither a live connection nor a routed
    /// one uses, builds the proxy for it and registers it, all under one lock.
    pub(crate) async fn register_new<F>(&self, build: F) -> Result<Arc<RTCPeerConnection>>
    where
        F: FnOnce(ConnectionId) -> Result<RTCPeerConnection>,
    {
        let mut connections = self.connections.lock().await;
        connections.prune_routes();
        let id = {
            let mut rng = rand::rng();
            let mut id = rng.random_range(0..=MAX_CONNECTION_ID);
            while connections.is_taken(id) {
                log::trace!("connection id {} in use, drawing again", id);
                id = rng.random_range(0..=MAX_CONNECTION_ID);
            }
            id
        };

        let pc = Arc::new(build(id)?);
        connections.routes.insert(id, Arc::downgrade(&pc));
        connections.live.insert(id, Arc::clone(&pc));
        Ok(pc)
    }

    pub async fn get(&self, id: ConnectionId) -> Option<Arc<RTCPeerConnection>> {
        self.connections.lock().await.live.get(&id).cloned()
    }

    /// route returns the proxy events for `id` are delivered to. Unlike
    /// [`PeerConnectionRegistry::get`] it still finds unregistered proxies
    /// that have not been dropped.
    pub(crate) async fn route(&self, id: ConnectionId) -> Option<Arc<RTCPeerConnection>> {
        let connections = self.connections.lock().await;
        if let Some(pc) = connections.live.get(&id) {
            return Some(Arc::clone(pc));
        }
        connections.routes.get(&id).and_then(Weak::upgrade)
    }

    /// unregister removes the record for `id`; removing an absent id is a no-op.
    pub async fn unregister(&self, id: ConnectionId) {
        if self.connections.lock().await.live.remove(&id).is_some() {
            log::debug!("RTCPeerConnection-{} unregistered", id);
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.live.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.live.is_empty()
    }

    /// ids lists the live connection ids, in ascending order.
    pub async fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> =
            self.connections.lock().await.live.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
