//! Participant side of the protocol: a read-only mirror of the host's
//! match, written only from host messages.

use log::{info, warn};
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

use crate::error::MirrorError;
use crate::game::engine::{ChessEngine, RuleEngine};
use crate::game::turn::{Role, TurnArbiter};
use crate::game::utils::{parse_promotion, parse_square};
use crate::models::{
    ClientMessage, CosmeticOverlay, Outcome, ParticipantIdentity, RejectReason, ServerMessage, Side,
};

/// What a host message meant for this participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotableEvent {
    None,
    Joined { side: Side, rejoin: bool },
    MoveMade,
    /// The piece on `from` goes back where it was.
    SnappedBack { from: String, reason: RejectReason },
    GameOver(Outcome),
    BoardReplaced,
}

pub struct ParticipantView {
    identity: ParticipantIdentity,
    side: Option<Side>,
    match_id: Option<String>,
    engine: ChessEngine,
    arbiter: TurnArbiter,
    overlay: CosmeticOverlay,
    outcome: Option<Outcome>,
    last_snap_back: Option<String>,
}

impl ParticipantView {
    pub fn new(identity: ParticipantIdentity) -> Self {
        Self {
            identity,
            side: None,
            match_id: None,
            engine: ChessEngine::new(),
            arbiter: TurnArbiter::new(Role::Mirror),
            overlay: CosmeticOverlay::default(),
            outcome: None,
            last_snap_back: None,
        }
    }

    pub fn identity(&self) -> &ParticipantIdentity {
        &self.identity
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn match_id(&self) -> Option<&str> {
        self.match_id.as_deref()
    }

    pub fn position(&self) -> String {
        self.engine.serialize()
    }

    pub fn turn(&self) -> Side {
        self.arbiter.current()
    }

    pub fn overlay(&self) -> &CosmeticOverlay {
        &self.overlay
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Square of the most recent rejected proposal, until the next accepted
    /// move.
    pub fn last_snap_back(&self) -> Option<&str> {
        self.last_snap_back.as_deref()
    }

    /// Whether this participant's pieces accept input right now.
    pub fn pieces_enabled(&self) -> bool {
        match self.side {
            Some(side) => self.outcome.is_none() && self.arbiter.can_move(side),
            None => false,
        }
    }

    pub fn announce(&self) -> ClientMessage {
        ClientMessage::IdentityAnnounce {
            identity: self.identity.clone(),
        }
    }

    pub fn propose(&self, from: &str, to: &str) -> ClientMessage {
        ClientMessage::ProposeMove {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }

    pub fn resign(&self) -> ClientMessage {
        ClientMessage::Resign {
            identity: self.identity.clone(),
        }
    }

    pub fn process_server_message(
        &mut self,
        message: &ServerMessage,
    ) -> Result<NotableEvent, MirrorError> {
        match message {
            ServerMessage::Joined {
                match_id,
                side,
                rejoin,
            } => {
                info!("{} playing {} in {}", self.identity, side, match_id);
                self.side = Some(*side);
                self.match_id = Some(match_id.clone());
                Ok(NotableEvent::Joined {
                    side: *side,
                    rejoin: *rejoin,
                })
            }
            ServerMessage::Catchup {
                position,
                turn,
                cosmetics,
                outcome,
            } => {
                self.engine.deserialize(position)?;
                self.arbiter.observe(*turn)?;
                self.overlay = cosmetics.clone();
                self.outcome = *outcome;
                self.last_snap_back = None;
                Ok(NotableEvent::BoardReplaced)
            }
            ServerMessage::TurnChanged { side } => {
                self.arbiter.observe(*side)?;
                Ok(NotableEvent::None)
            }
            ServerMessage::MoveAccepted {
                from,
                to,
                promotion,
            } => {
                self.animate(from, to, promotion.as_deref())?;
                self.last_snap_back = None;
                Ok(NotableEvent::MoveMade)
            }
            ServerMessage::MoveRejected { from, reason } => {
                warn!("Move from {} rejected: {:?}", from, reason);
                self.last_snap_back = Some(from.clone());
                Ok(NotableEvent::SnappedBack {
                    from: from.clone(),
                    reason: *reason,
                })
            }
            ServerMessage::OutcomeAnnounced { message, outcome } => {
                info!("{}", message);
                self.outcome = Some(*outcome);
                Ok(NotableEvent::GameOver(*outcome))
            }
            ServerMessage::CosmeticChanged { side, skin } => {
                self.overlay.set(*side, skin.clone());
                Ok(NotableEvent::None)
            }
            ServerMessage::BoardSynced { position, .. } => {
                self.engine.deserialize(position)?;
                self.outcome = self.engine.outcome();
                self.last_snap_back = None;
                Ok(NotableEvent::BoardReplaced)
            }
            ServerMessage::Error { error } => Err(MirrorError::ServerReturnedError(error.clone())),
            ServerMessage::AvailableMoves { .. }
            | ServerMessage::SavedGames { .. }
            | ServerMessage::Pong { .. } => Ok(NotableEvent::None),
        }
    }

    fn animate(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<(), MirrorError> {
        let from_square = parse_square(from)?;
        let to_square = parse_square(to)?;
        let promotion = promotion.map(parse_promotion).transpose()?;
        let mv = self
            .engine
            .try_get_legal_move(from_square, to_square, promotion)
            .ok_or_else(|| {
                MirrorError::CannotApply(format!(
                    "{from}-{to} is not legal in {}",
                    self.engine.serialize()
                ))
            })?;
        if !self.engine.apply_move(mv) {
            return Err(MirrorError::CannotApply(format!("{from}-{to} failed to apply")));
        }
        Ok(())
    }
}

/// Reads the installation's identity token, creating and storing a new one
/// on first use.
pub fn load_or_create_identity(path: &Path) -> io::Result<ParticipantIdentity> {
    match fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => {
            return Ok(ParticipantIdentity::new(contents.trim()));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let identity = ParticipantIdentity::new(Uuid::new_v4().to_string());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, identity.as_str())?;
    info!("Created identity {} at {}", identity, path.display());
    Ok(identity)
}
