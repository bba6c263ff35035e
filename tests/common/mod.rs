#![allow(dead_code)]

use std::collections::BTreeMap;

use turn_arbiter_chess::error::MirrorError;
use turn_arbiter_chess::game::ChessEngine;
use turn_arbiter_chess::client::ParticipantView;
use turn_arbiter_chess::host::{Host, HostEvent, StorageRequest};
use turn_arbiter_chess::models::{
    ClientMessage, ConnectionId, Envelope, ParticipantIdentity, ServerMessage,
};
use turn_arbiter_chess::persistence::{list_saved_games, GameStore, MemoryGameStore, SharedStore};

pub const MATCH_ID: &str = "match_table";

/// A host and the mirrors of everyone connected to it, delivering every
/// envelope the way the websocket transport would.
pub struct Table {
    pub host: Host,
    pub store: SharedStore<MemoryGameStore>,
    views: BTreeMap<ConnectionId, ParticipantView>,
    delivered: Vec<(ConnectionId, ServerMessage)>,
}

impl Table {
    pub fn new() -> Self {
        Self::with_store(SharedStore::new(MemoryGameStore::new()), MATCH_ID)
    }

    /// A fresh host for `match_id` writing into an existing store.
    pub fn with_store(store: SharedStore<MemoryGameStore>, match_id: &str) -> Self {
        let host = Host::with_match_id(match_id, ChessEngine::new(), Box::new(store.clone()));
        Self {
            host,
            store,
            views: BTreeMap::new(),
            delivered: Vec::new(),
        }
    }

    pub fn join(&mut self, connection: u64, token: &str) -> Vec<Envelope> {
        let connection = ConnectionId(connection);
        let view = ParticipantView::new(ParticipantIdentity::new(token));
        let announce = view.announce();
        self.views.insert(connection, view);
        self.apply(HostEvent::Connected(connection));
        self.send(connection.0, announce)
    }

    pub fn leave(&mut self, connection: u64) {
        let connection = ConnectionId(connection);
        self.apply(HostEvent::Disconnected(connection));
        self.views.remove(&connection);
    }

    pub fn send(&mut self, connection: u64, message: ClientMessage) -> Vec<Envelope> {
        let mut envelopes = self.apply(HostEvent::Message(ConnectionId(connection), message));
        for request in self.host.take_storage_requests() {
            let answer = match request {
                StorageRequest::Load {
                    connection,
                    match_id,
                    move_index,
                } => HostEvent::GameLoaded(
                    connection,
                    self.store.with(|s| s.load(&match_id, move_index)),
                ),
                StorageRequest::List { connection, limit } => HostEvent::GamesListed(
                    connection,
                    self.store.with(|s| list_saved_games(&*s, limit)),
                ),
            };
            envelopes.extend(self.apply(answer));
        }
        envelopes
    }

    pub fn propose(&mut self, connection: u64, from: &str, to: &str) -> Vec<Envelope> {
        let message = self.view(connection).propose(from, to);
        self.send(connection, message)
    }

    pub fn view(&self, connection: u64) -> &ParticipantView {
        &self.views[&ConnectionId(connection)]
    }

    /// Messages written to one connection so far, in order.
    pub fn received(&self, connection: u64) -> Vec<ServerMessage> {
        self.delivered
            .iter()
            .filter(|(c, _)| *c == ConnectionId(connection))
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear_received(&mut self) {
        self.delivered.clear();
    }

    fn apply(&mut self, event: HostEvent) -> Vec<Envelope> {
        let envelopes = self.host.apply_event(event);
        for envelope in &envelopes {
            for connection in self.host.recipients(envelope.recipient) {
                self.delivered.push((connection, envelope.message.clone()));
                let Some(view) = self.views.get_mut(&connection) else {
                    continue;
                };
                match view.process_server_message(&envelope.message) {
                    Ok(_) | Err(MirrorError::ServerReturnedError(_)) => {}
                    Err(e) => panic!("{connection} fell out of sync: {e}"),
                }
            }
        }
        envelopes
    }
}
