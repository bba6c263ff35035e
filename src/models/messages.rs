use actix::Message;
use serde::{Deserialize, Serialize};

use crate::models::game_state::{ConnectionId, CosmeticOverlay, Outcome, ParticipantIdentity, Side};
use crate::persistence::SavedGameInfo;

/// Message sent from a participant to the host
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sent once per connection, before anything else is honored.
    IdentityAnnounce { identity: ParticipantIdentity },
    ProposeMove {
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<String>,
    },
    Resign { identity: ParticipantIdentity },
    GetMoves { square: String },
    SetCosmetic { skin: String },
    SaveGame,
    LoadGame {
        match_id: String,
        #[serde(default)]
        move_index: Option<u32>,
    },
    ListSavedGames {
        #[serde(default)]
        limit: Option<usize>,
    },
    Ping { client_time_ms: u64 },
}

/// Why a proposed move was sent back to its proposer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    OutOfTurn,
    IllegalMove,
    ApplyFailed,
    GameOver,
}

/// Message sent from the host to one or all participants
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined {
        match_id: String,
        side: Side,
        rejoin: bool,
    },
    Catchup {
        position: String,
        turn: Side,
        cosmetics: CosmeticOverlay,
        outcome: Option<Outcome>,
    },
    TurnChanged { side: Side },
    MoveAccepted {
        from: String,
        to: String,
        promotion: Option<String>,
    },
    /// Targeted correction: the proposer snaps the piece on `from` back.
    MoveRejected { from: String, reason: RejectReason },
    OutcomeAnnounced { message: String, outcome: Outcome },
    AvailableMoves {
        from: String,
        destinations: Vec<String>,
    },
    CosmeticChanged { side: Side, skin: String },
    BoardSynced { position: String, move_index: u32 },
    SavedGames { games: Vec<SavedGameInfo> },
    Pong {
        client_time_ms: u64,
        server_time_ms: u64,
    },
    Error { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    One(ConnectionId),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

/// Sends produced by one state-mutating operation, in issue order.
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unicast(&mut self, connection: ConnectionId, message: ServerMessage) {
        self.envelopes.push(Envelope {
            recipient: Recipient::One(connection),
            message,
        });
    }

    pub fn broadcast(&mut self, message: ServerMessage) {
        self.envelopes.push(Envelope {
            recipient: Recipient::All,
            message,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn envelopes(&self) -> &[Envelope] {
        &self.envelopes
    }

    pub fn into_envelopes(self) -> Vec<Envelope> {
        self.envelopes
    }
}

/// Serialized frame handed to a websocket session for writing
#[derive(Message)]
#[rtype(result = "()")]
pub struct ChessWebSocketMessage(pub String);
