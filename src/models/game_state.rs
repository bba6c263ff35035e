use std::fmt;

use chess::{Color, Piece, Square};
use serde::{Deserialize, Serialize};

/// Which set of pieces a participant plays, and whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

/// A proposed move. Lives for one validate-and-apply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl Move {
    pub fn new(from: Square, to: Square, promotion: Option<Piece>) -> Self {
        Self { from, to, promotion }
    }
}

/// Transient handle for one transport connection. A participant gets a new
/// one every time they reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Durable token identifying a player across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantIdentity(pub String);

impl ParticipantIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last-applied visual customization per side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticOverlay {
    pub white: Option<String>,
    pub black: Option<String>,
}

impl CosmeticOverlay {
    pub fn get(&self, side: Side) -> Option<&str> {
        match side {
            Side::White => self.white.as_deref(),
            Side::Black => self.black.as_deref(),
        }
    }

    pub fn set(&mut self, side: Side, skin: String) {
        match side {
            Side::White => self.white = Some(skin),
            Side::Black => self.black = Some(skin),
        }
    }

    /// Sides that carry a skin, white first.
    pub fn entries(&self) -> impl Iterator<Item = (Side, &str)> {
        [Side::White, Side::Black]
            .into_iter()
            .filter_map(move |side| self.get(side).map(|skin| (side, skin)))
    }
}

/// How a finished game ended. Once set, no side may move again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Checkmate { winner: Side },
    Stalemate,
    InsufficientMaterial,
    Resignation { winner: Side },
}

impl Outcome {
    pub fn winner(self) -> Option<Side> {
        match self {
            Self::Checkmate { winner } | Self::Resignation { winner } => Some(winner),
            Self::Stalemate | Self::InsufficientMaterial => None,
        }
    }

    /// Human-readable announcement sent to every participant.
    pub fn message(self) -> String {
        match self {
            Self::Checkmate { winner } => format!("Checkmate, {winner} wins"),
            Self::Stalemate => "Draw by stalemate".to_string(),
            Self::InsufficientMaterial => "Draw by insufficient material".to_string(),
            Self::Resignation { winner } => {
                format!("{} resigns, {winner} wins", winner.opposite())
            }
        }
    }
}

/// Why a game record was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    InitialState,
    MidgameState,
    EndState,
    ManualSave,
}
