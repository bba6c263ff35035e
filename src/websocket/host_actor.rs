//! Actor owning the [`Host`]. Its mailbox is the host's event loop: every
//! connection's traffic is funneled through here and applied one message at
//! a time.

use actix::prelude::*;
use log::{debug, error, info, warn};
use std::collections::HashMap;

use crate::error::PersistenceError;
use crate::host::{Host, HostEvent, StorageRequest};
use crate::models::{ChessWebSocketMessage, ClientMessage, ConnectionId, Envelope};
use crate::persistence::actor::{ListRecords, LoadRecord, PersistenceActor};

type SessionRecipient = actix::Recipient<ChessWebSocketMessage>;

pub struct HostActor {
    host: Host,
    sessions: HashMap<ConnectionId, SessionRecipient>,
    storage: Addr<PersistenceActor>,
}

impl HostActor {
    pub fn new(host: Host, storage: Addr<PersistenceActor>) -> Self {
        Self {
            host,
            sessions: HashMap::new(),
            storage,
        }
    }

    fn dispatch(&mut self, event: HostEvent, ctx: &mut Context<Self>) {
        let envelopes = self.host.apply_event(event);
        self.deliver(envelopes);
        for request in self.host.take_storage_requests() {
            self.fetch(request, ctx);
        }
    }

    fn deliver(&self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            let text = match serde_json::to_string(&envelope.message) {
                Ok(text) => text,
                Err(e) => {
                    error!("Error serializing {:?}: {}", envelope.message, e);
                    continue;
                }
            };
            for connection in self.host.recipients(envelope.recipient) {
                match self.sessions.get(&connection) {
                    Some(session) => {
                        debug!("Sending to {}: {}", connection, text);
                        session.do_send(ChessWebSocketMessage(text.clone()));
                    }
                    None => warn!("Session not found for {}", connection),
                }
            }
        }
    }

    /// A load blocks the mailbox until answered, so no event is applied
    /// against a half-loaded match. Listings change nothing and run
    /// alongside later events.
    fn fetch(&mut self, request: StorageRequest, ctx: &mut Context<Self>) {
        match request {
            StorageRequest::Load {
                connection,
                match_id,
                move_index,
            } => {
                info!("Loading {} for {}", match_id, connection);
                let load = self.storage.send(LoadRecord {
                    match_id,
                    move_index,
                });
                ctx.wait(load.into_actor(self).map(move |res, act, ctx| {
                    let loaded =
                        res.unwrap_or_else(|e| Err(PersistenceError::Unavailable(e.to_string())));
                    act.dispatch(HostEvent::GameLoaded(connection, loaded), ctx);
                }));
            }
            StorageRequest::List { connection, limit } => {
                let list = self.storage.send(ListRecords { limit });
                ctx.spawn(list.into_actor(self).map(move |res, act, ctx| {
                    let listed =
                        res.unwrap_or_else(|e| Err(PersistenceError::Unavailable(e.to_string())));
                    act.dispatch(HostEvent::GamesListed(connection, listed), ctx);
                }));
            }
        }
    }
}

impl Actor for HostActor {
    type Context = Context<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        info!("Host started for {}", self.host.match_id());
    }
}

/// A websocket session opened.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Register {
    pub connection: ConnectionId,
    pub session: SessionRecipient,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unregister {
    pub connection: ConnectionId,
}

/// A parsed frame from a session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Inbound {
    pub connection: ConnectionId,
    pub message: ClientMessage,
}

impl Handler<Register> for HostActor {
    type Result = ();

    fn handle(&mut self, msg: Register, ctx: &mut Self::Context) {
        self.sessions.insert(msg.connection, msg.session);
        info!("Total active sessions: {}", self.sessions.len());
        self.dispatch(HostEvent::Connected(msg.connection), ctx);
    }
}

impl Handler<Unregister> for HostActor {
    type Result = ();

    fn handle(&mut self, msg: Unregister, ctx: &mut Self::Context) {
        self.dispatch(HostEvent::Disconnected(msg.connection), ctx);
        self.sessions.remove(&msg.connection);
        info!("Total active sessions: {}", self.sessions.len());
    }
}

impl Handler<Inbound> for HostActor {
    type Result = ();

    fn handle(&mut self, msg: Inbound, ctx: &mut Self::Context) {
        self.dispatch(HostEvent::Message(msg.connection, msg.message), ctx);
    }
}
