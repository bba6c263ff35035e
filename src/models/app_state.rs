use actix::Addr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::game_state::ConnectionId;
use crate::websocket::host_actor::HostActor;

/// Application state shared between connections
pub struct AppState {
    pub host: Addr<HostActor>,
    next_connection: AtomicU64,
}

impl AppState {
    pub fn new(host: Addr<HostActor>) -> Self {
        Self {
            host,
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn allocate_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }

    /// Connections accepted since startup.
    pub fn connections_opened(&self) -> u64 {
        self.next_connection.load(Ordering::Relaxed) - 1
    }
}
