//! Durable participant identity across reconnects.
//!
//! Transport connections come and go; the identity token a participant
//! announces does not. Entries are created on the first announcement and
//! are never removed while the process runs, so a participant can always
//! come back to the side they were given.

use log::{info, warn};
use std::collections::{BTreeMap, HashMap};

use crate::models::{ConnectionId, ParticipantIdentity, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    FirstJoin,
    Rejoin,
}

/// Result of a successful identity handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub identity: ParticipantIdentity,
    pub side: Side,
    pub kind: JoinKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub identity: ParticipantIdentity,
    pub connection: Option<ConnectionId>,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    // Connected but no identity announced yet
    Pending,
    Bound(ParticipantIdentity),
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: HashMap<ParticipantIdentity, SessionEntry>,
    connections: HashMap<ConnectionId, ConnectionState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection without an announced identity is not classified yet.
    pub fn on_connect(&mut self, connection: ConnectionId) {
        info!("Connection {} opened, awaiting identity", connection);
        self.connections.insert(connection, ConnectionState::Pending);
    }

    pub fn on_identity_announced(
        &mut self,
        connection: ConnectionId,
        identity: ParticipantIdentity,
    ) -> Option<Admission> {
        match self.connections.get(&connection) {
            None => {
                warn!("Identity {} announced on unknown connection {}", identity, connection);
                return None;
            }
            Some(ConnectionState::Bound(existing)) => {
                warn!(
                    "Connection {} already announced {}, ignoring {}",
                    connection, existing, identity
                );
                return None;
            }
            Some(ConnectionState::Pending) => {}
        }

        let first_identity = self.entries.is_empty();
        let (side, kind, superseded) = match self.entries.get_mut(&identity) {
            Some(entry) => {
                let superseded = entry.connection.replace(connection);
                info!(
                    "Player {} rejoined on {} as {}",
                    identity, connection, entry.side
                );
                (entry.side, JoinKind::Rejoin, superseded)
            }
            None => {
                let side = if first_identity { Side::White } else { Side::Black };
                info!(
                    "Player {} joined on {} for the first time as {}",
                    identity, connection, side
                );
                self.entries.insert(
                    identity.clone(),
                    SessionEntry {
                        identity: identity.clone(),
                        connection: Some(connection),
                        side,
                    },
                );
                (side, JoinKind::FirstJoin, None)
            }
        };

        if let Some(old) = superseded.filter(|old| *old != connection) {
            info!("Connection {} superseded by {} for {}", old, connection, identity);
            self.connections.remove(&old);
        }
        self.connections
            .insert(connection, ConnectionState::Bound(identity.clone()));

        Some(Admission {
            identity,
            side,
            kind,
        })
    }

    /// Releases the connection. The identity's entry stays for a later rejoin.
    pub fn on_disconnect(&mut self, connection: ConnectionId) {
        match self.connections.remove(&connection) {
            Some(ConnectionState::Bound(identity)) => {
                if let Some(entry) = self.entries.get_mut(&identity) {
                    if entry.connection == Some(connection) {
                        entry.connection = None;
                    }
                }
                info!("Player {} disconnected from {}", identity, connection);
            }
            Some(ConnectionState::Pending) => {
                info!("Connection {} closed before announcing an identity", connection);
            }
            None => {}
        }
    }

    pub fn identity_of_connection(&self, connection: ConnectionId) -> Option<&ParticipantIdentity> {
        match self.connections.get(&connection)? {
            ConnectionState::Bound(identity) => Some(identity),
            ConnectionState::Pending => None,
        }
    }

    pub fn side_of_connection(&self, connection: ConnectionId) -> Option<Side> {
        let identity = self.identity_of_connection(connection)?;
        self.entries.get(identity).map(|entry| entry.side)
    }

    pub fn entry(&self, identity: &ParticipantIdentity) -> Option<&SessionEntry> {
        self.entries.get(identity)
    }

    /// Connections bound to an identity, in a stable order.
    pub fn active_connections(&self) -> Vec<ConnectionId> {
        let mut connections: Vec<ConnectionId> = self
            .entries
            .values()
            .filter_map(|entry| entry.connection)
            .collect();
        connections.sort();
        connections
    }

    pub fn side_map(&self) -> BTreeMap<ParticipantIdentity, Side> {
        self.entries
            .values()
            .map(|entry| (entry.identity.clone(), entry.side))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(token: &str) -> ParticipantIdentity {
        ParticipantIdentity::new(token)
    }

    fn join(registry: &mut SessionRegistry, connection: u64, token: &str) -> Option<Admission> {
        registry.on_connect(ConnectionId(connection));
        registry.on_identity_announced(ConnectionId(connection), id(token))
    }

    #[test]
    fn pending_connection_has_no_side() {
        let mut registry = SessionRegistry::new();
        registry.on_connect(ConnectionId(1));
        assert_eq!(registry.side_of_connection(ConnectionId(1)), None);
        assert!(registry.is_empty());
        assert!(registry.active_connections().is_empty());
    }

    #[test]
    fn first_identity_is_white_then_black() {
        let mut registry = SessionRegistry::new();
        let a = join(&mut registry, 1, "A").unwrap();
        let b = join(&mut registry, 2, "B").unwrap();
        assert_eq!((a.side, a.kind), (Side::White, JoinKind::FirstJoin));
        assert_eq!((b.side, b.kind), (Side::Black, JoinKind::FirstJoin));
    }

    #[test]
    fn later_identities_are_black() {
        let mut registry = SessionRegistry::new();
        join(&mut registry, 1, "A");
        join(&mut registry, 2, "B");
        let c = join(&mut registry, 3, "C").unwrap();
        assert_eq!(c.side, Side::Black);
    }

    #[test]
    fn rejoin_keeps_side() {
        let mut registry = SessionRegistry::new();
        join(&mut registry, 1, "A");
        join(&mut registry, 2, "B");

        for round in 0..3 {
            let previous = ConnectionId(1 + 10 * round);
            registry.on_disconnect(previous);
            assert_eq!(registry.entry(&id("A")).unwrap().connection, None);

            let admission = join(&mut registry, 11 + 10 * round, "A").unwrap();
            assert_eq!(admission.kind, JoinKind::Rejoin);
            assert_eq!(admission.side, Side::White);
        }
        let entry = registry.entry(&id("A")).unwrap();
        assert_eq!(entry.side, Side::White);
        assert_eq!(entry.connection, Some(ConnectionId(31)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn second_announcement_on_same_connection_is_ignored() {
        let mut registry = SessionRegistry::new();
        join(&mut registry, 1, "A");
        assert_eq!(registry.on_identity_announced(ConnectionId(1), id("B")), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn announcement_on_unknown_connection_is_ignored() {
        let mut registry = SessionRegistry::new();
        assert_eq!(registry.on_identity_announced(ConnectionId(9), id("A")), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn reconnect_without_disconnect_supersedes_old_connection() {
        let mut registry = SessionRegistry::new();
        join(&mut registry, 1, "A");
        join(&mut registry, 2, "A");
        assert_eq!(registry.side_of_connection(ConnectionId(1)), None);
        assert_eq!(registry.side_of_connection(ConnectionId(2)), Some(Side::White));
        assert_eq!(registry.active_connections(), vec![ConnectionId(2)]);

        // The stale connection closing later must not unbind the new one
        registry.on_disconnect(ConnectionId(1));
        assert_eq!(registry.active_connections(), vec![ConnectionId(2)]);
    }

    #[test]
    fn side_map_lists_every_identity() {
        let mut registry = SessionRegistry::new();
        join(&mut registry, 1, "A");
        join(&mut registry, 2, "B");
        registry.on_disconnect(ConnectionId(2));
        let map = registry.side_map();
        assert_eq!(map.get(&id("A")), Some(&Side::White));
        assert_eq!(map.get(&id("B")), Some(&Side::Black));
    }
}
