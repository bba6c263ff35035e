//! The authoritative host: every service wired together behind one dispatch
//! function.
//!
//! [`Host::apply_event`] is the only entry point. Events are applied one at a
//! time and each runs to completion, so the services need no locking. The
//! sends an event produces come back as envelopes for the transport to
//! deliver, in order.

use log::{error, info, warn};
use std::collections::VecDeque;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{LoadError, PersistenceError};
use crate::game::coordinator::{MoveCoordinator, ProposeOutcome};
use crate::game::engine::{ChessEngine, RuleEngine};
use crate::game::registry::SessionRegistry;
use crate::game::sync;
use crate::game::turn::{Role, TurnArbiter};
use crate::models::{
    ClientMessage, ConnectionId, CosmeticOverlay, Envelope, Outbox, Recipient, ServerMessage,
    StateType,
};
use crate::persistence::{GameRecord, PersistenceSink, SavedGameInfo};

pub const MATCH_ID_PREFIX: &str = "match_";
pub const DEFAULT_SAVED_GAMES_LIMIT: usize = 10;

#[derive(Debug)]
pub enum HostEvent {
    Connected(ConnectionId),
    Disconnected(ConnectionId),
    Message(ConnectionId, ClientMessage),
    /// Answer to a [`StorageRequest::Load`].
    GameLoaded(ConnectionId, Result<GameRecord, PersistenceError>),
    /// Answer to a [`StorageRequest::List`].
    GamesListed(ConnectionId, Result<Vec<SavedGameInfo>, PersistenceError>),
}

/// Storage reads the host cannot do itself. The transport fetches them and
/// feeds the answer back as a `GameLoaded` or `GamesListed` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRequest {
    Load {
        connection: ConnectionId,
        match_id: String,
        move_index: Option<u32>,
    },
    List {
        connection: ConnectionId,
        limit: usize,
    },
}

pub fn new_match_id() -> String {
    format!("{MATCH_ID_PREFIX}{}", Uuid::new_v4().simple())
}

pub struct Host<E: RuleEngine = ChessEngine> {
    match_id: String,
    arbiter: TurnArbiter,
    coordinator: MoveCoordinator<E>,
    registry: SessionRegistry,
    overlay: CosmeticOverlay,
    sink: Box<dyn PersistenceSink>,
    storage_requests: VecDeque<StorageRequest>,
    saved_games_limit: usize,
}

impl<E: RuleEngine> Host<E> {
    pub fn new(engine: E, sink: Box<dyn PersistenceSink>) -> Self {
        Self::with_match_id(new_match_id(), engine, sink)
    }

    /// Starts a match under a known id and records its initial state.
    pub fn with_match_id(
        match_id: impl Into<String>,
        engine: E,
        sink: Box<dyn PersistenceSink>,
    ) -> Self {
        let mut host = Self {
            match_id: match_id.into(),
            arbiter: TurnArbiter::new(Role::Authoritative),
            coordinator: MoveCoordinator::new(engine),
            registry: SessionRegistry::new(),
            overlay: CosmeticOverlay::default(),
            sink,
            storage_requests: VecDeque::new(),
            saved_games_limit: DEFAULT_SAVED_GAMES_LIMIT,
        };
        if let Err(e) = host.arbiter.align(host.coordinator.engine().side_to_move()) {
            error!("Could not align turn state with the starting position: {}", e);
        }
        info!("Hosting {}", host.match_id);
        host.persist(StateType::InitialState);
        host
    }

    pub fn set_saved_games_limit(&mut self, limit: usize) {
        self.saved_games_limit = limit;
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn arbiter(&self) -> &TurnArbiter {
        &self.arbiter
    }

    pub fn coordinator(&self) -> &MoveCoordinator<E> {
        &self.coordinator
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn overlay(&self) -> &CosmeticOverlay {
        &self.overlay
    }

    /// Connections an envelope should be written to right now.
    pub fn recipients(&self, recipient: Recipient) -> Vec<ConnectionId> {
        match recipient {
            Recipient::One(connection) => vec![connection],
            Recipient::All => self.registry.active_connections(),
        }
    }

    /// Drains the storage reads queued by the events applied so far.
    pub fn take_storage_requests(&mut self) -> Vec<StorageRequest> {
        self.storage_requests.drain(..).collect()
    }

    pub fn apply_event(&mut self, event: HostEvent) -> Vec<Envelope> {
        let mut outbox = Outbox::new();
        match event {
            HostEvent::Connected(connection) => self.registry.on_connect(connection),
            HostEvent::Disconnected(connection) => self.registry.on_disconnect(connection),
            HostEvent::Message(connection, message) => {
                self.handle_message(connection, message, &mut outbox)
            }
            HostEvent::GameLoaded(connection, loaded) => {
                let result = loaded
                    .map_err(LoadError::from)
                    .and_then(|record| self.restore(record));
                match result {
                    Ok(resync) => outbox = resync,
                    Err(e) => {
                        error!("Failed to load a saved game for {}: {}", connection, e);
                        outbox.unicast(connection, ServerMessage::Error { error: e.to_string() });
                    }
                }
            }
            HostEvent::GamesListed(connection, listed) => match listed {
                Ok(games) => outbox.unicast(connection, ServerMessage::SavedGames { games }),
                Err(e) => {
                    error!("Failed to list saved games for {}: {}", connection, e);
                    outbox.unicast(connection, ServerMessage::Error { error: e.to_string() });
                }
            },
        }
        outbox.into_envelopes()
    }

    fn handle_message(
        &mut self,
        connection: ConnectionId,
        message: ClientMessage,
        outbox: &mut Outbox,
    ) {
        let honored_before_identity = matches!(
            message,
            ClientMessage::IdentityAnnounce { .. } | ClientMessage::Ping { .. }
        );
        if !honored_before_identity && self.registry.identity_of_connection(connection).is_none() {
            warn!("Dropping {:?} from {} before identity announcement", message, connection);
            return;
        }

        match message {
            ClientMessage::IdentityAnnounce { identity } => {
                if let Some(admission) = self.registry.on_identity_announced(connection, identity) {
                    sync::catchup(
                        connection,
                        &admission,
                        &self.match_id,
                        &self.coordinator,
                        &mut self.arbiter,
                        &self.overlay,
                        outbox,
                    );
                }
            }
            ClientMessage::ProposeMove { from, to, promotion } => {
                let result = self.coordinator.propose_move(
                    connection,
                    &from,
                    &to,
                    promotion.as_deref(),
                    &self.registry,
                    &mut self.arbiter,
                    outbox,
                );
                if let ProposeOutcome::Accepted { outcome, .. } = result {
                    let state_type = match outcome {
                        Some(_) => StateType::EndState,
                        None => StateType::MidgameState,
                    };
                    self.persist(state_type);
                }
            }
            ClientMessage::Resign { identity } => {
                if self
                    .coordinator
                    .resign(connection, &identity, &self.registry, outbox)
                    .is_some()
                {
                    self.persist(StateType::EndState);
                }
            }
            ClientMessage::GetMoves { square } => {
                self.coordinator
                    .legal_destinations(connection, &square, &self.registry, outbox);
            }
            ClientMessage::SetCosmetic { skin } => {
                // Sides are fixed per identity, so the overlay is each
                // identity's last-known skin
                if let Some(side) = self.registry.side_of_connection(connection) {
                    info!("{} skin set to {}", side, skin);
                    self.overlay.set(side, skin.clone());
                    outbox.broadcast(ServerMessage::CosmeticChanged { side, skin });
                }
            }
            ClientMessage::SaveGame => {
                info!("Manual save of {} requested by {}", self.match_id, connection);
                self.persist(StateType::ManualSave);
            }
            ClientMessage::LoadGame { match_id, move_index } => {
                if !match_id.starts_with(MATCH_ID_PREFIX) {
                    warn!("{} asked to load {}, which is not a match id", connection, match_id);
                    outbox.unicast(
                        connection,
                        ServerMessage::Error {
                            error: format!("Not a match id: {match_id}"),
                        },
                    );
                    return;
                }
                self.storage_requests.push_back(StorageRequest::Load {
                    connection,
                    match_id,
                    move_index,
                });
            }
            ClientMessage::ListSavedGames { limit } => {
                self.storage_requests.push_back(StorageRequest::List {
                    connection,
                    limit: limit.unwrap_or(self.saved_games_limit),
                });
            }
            ClientMessage::Ping { client_time_ms } => {
                outbox.unicast(
                    connection,
                    ServerMessage::Pong {
                        client_time_ms,
                        server_time_ms: now_ms(),
                    },
                );
            }
        }
    }

    /// Adopts a saved match and returns the resync broadcasts. Side
    /// assignments stay with the current registry.
    fn restore(&mut self, record: GameRecord) -> Result<Outbox, LoadError> {
        self.coordinator
            .restore(&record.serialized_position, record.move_index)?;
        self.match_id = record.match_id;
        self.overlay = record.cosmetic_overlay;

        let mut outbox = Outbox::new();
        sync::resync_all(&self.coordinator, &mut self.arbiter, &self.overlay, &mut outbox)?;
        info!(
            "Loaded {} at move {}, {} to move",
            self.match_id,
            self.coordinator.move_index(),
            self.arbiter.current()
        );
        Ok(outbox)
    }

    fn persist(&mut self, state_type: StateType) {
        let record = GameRecord::new(
            self.match_id.clone(),
            self.coordinator.serialized_position(),
            state_type,
            self.coordinator.move_index(),
            self.registry.side_map(),
            self.overlay.clone(),
        );
        self.sink.submit(record);
    }
}

fn now_ms() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or_default()
}
