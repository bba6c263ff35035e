//! The only path by which the canonical Position changes.

use chess::Square;
use log::{error, info, warn};

use crate::error::EngineError;
use crate::game::engine::RuleEngine;
use crate::game::registry::SessionRegistry;
use crate::game::turn::TurnArbiter;
use crate::game::utils::{parse_promotion, parse_square, promotion_to_string};
use crate::models::{
    ConnectionId, Move, Outbox, Outcome, ParticipantIdentity, RejectReason, ServerMessage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposeOutcome {
    /// The sender could not be resolved, or the message was malformed.
    /// Nothing was sent to anyone.
    Dropped,
    /// The proposer received a targeted correction. No shared state changed.
    Rejected(RejectReason),
    Accepted {
        mv: Move,
        outcome: Option<Outcome>,
    },
}

pub struct MoveCoordinator<E: RuleEngine> {
    engine: E,
    outcome: Option<Outcome>,
    move_index: u32,
}

impl<E: RuleEngine> MoveCoordinator<E> {
    pub fn new(engine: E) -> Self {
        let outcome = engine.outcome();
        Self {
            engine,
            outcome,
            move_index: 0,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Number of half-moves applied in this match.
    pub fn move_index(&self) -> u32 {
        self.move_index
    }

    pub fn serialized_position(&self) -> String {
        self.engine.serialize()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn propose_move(
        &mut self,
        connection: ConnectionId,
        from: &str,
        to: &str,
        promotion: Option<&str>,
        registry: &SessionRegistry,
        arbiter: &mut TurnArbiter,
        outbox: &mut Outbox,
    ) -> ProposeOutcome {
        if !arbiter.is_authoritative() {
            warn!("Move proposal reached a non-authoritative coordinator, dropping");
            return ProposeOutcome::Dropped;
        }

        let Some(side) = registry.side_of_connection(connection) else {
            warn!("No participant registered for {}, dropping move", connection);
            return ProposeOutcome::Dropped;
        };

        let from_square = match parse_square(from) {
            Ok(square) => square,
            Err(e) => {
                warn!("Malformed move from {}: {}", connection, e);
                return ProposeOutcome::Dropped;
            }
        };

        if !arbiter.can_move(side) {
            warn!("{} ({}) tried to move out of turn", connection, side);
            return Self::reject(connection, from_square, RejectReason::OutOfTurn, outbox);
        }

        if let Some(outcome) = self.outcome {
            warn!("{} tried to move after the game ended: {:?}", connection, outcome);
            return Self::reject(connection, from_square, RejectReason::GameOver, outbox);
        }

        let mv = match self.find_legal_move(from_square, to, promotion) {
            Ok(Some(mv)) => mv,
            Ok(None) => {
                warn!("Illegal move {}-{} by {}", from, to, side);
                return Self::reject(connection, from_square, RejectReason::IllegalMove, outbox);
            }
            Err(e) => {
                warn!("Unreadable move {}-{} by {}: {}", from, to, side, e);
                return Self::reject(connection, from_square, RejectReason::IllegalMove, outbox);
            }
        };

        if !self.engine.apply_move(mv) {
            error!("Move {}-{} passed validation but failed to apply", mv.from, mv.to);
            return Self::reject(connection, from_square, RejectReason::ApplyFailed, outbox);
        }
        self.move_index += 1;

        let next = match arbiter.end_turn() {
            Ok(next) => next,
            Err(e) => {
                error!("Failed to end turn after an applied move: {}", e);
                arbiter.current()
            }
        };
        info!(
            "Move {} {}-{} accepted, {} to move",
            self.move_index, mv.from, mv.to, next
        );

        outbox.broadcast(ServerMessage::TurnChanged { side: next });
        outbox.broadcast(ServerMessage::MoveAccepted {
            from: mv.from.to_string(),
            to: mv.to.to_string(),
            promotion: mv.promotion.map(promotion_to_string),
        });

        self.outcome = self.engine.outcome();
        if let Some(outcome) = self.outcome {
            info!("Game over: {}", outcome.message());
            outbox.broadcast(ServerMessage::OutcomeAnnounced {
                message: outcome.message(),
                outcome,
            });
        }

        ProposeOutcome::Accepted {
            mv,
            outcome: self.outcome,
        }
    }

    /// Ends the game in favor of the other side, bypassing move validation.
    pub fn resign(
        &mut self,
        connection: ConnectionId,
        identity: &ParticipantIdentity,
        registry: &SessionRegistry,
        outbox: &mut Outbox,
    ) -> Option<Outcome> {
        if registry.identity_of_connection(connection) != Some(identity) {
            warn!("Resignation for {} from {} does not match its identity", identity, connection);
            return None;
        }
        let side = registry.side_of_connection(connection)?;
        if self.outcome.is_some() {
            warn!("{} resigned after the game had already ended", identity);
            return None;
        }

        let outcome = Outcome::Resignation {
            winner: side.opposite(),
        };
        info!("{} ({}) resigned", identity, side);
        self.outcome = Some(outcome);
        outbox.broadcast(ServerMessage::OutcomeAnnounced {
            message: outcome.message(),
            outcome,
        });
        Some(outcome)
    }

    /// Unicasts the legal destinations of the piece on `square`.
    pub fn legal_destinations(
        &self,
        connection: ConnectionId,
        square: &str,
        registry: &SessionRegistry,
        outbox: &mut Outbox,
    ) {
        let Some(side) = registry.side_of_connection(connection) else {
            warn!("Move query from unregistered {}", connection);
            return;
        };
        let from = match parse_square(square) {
            Ok(from) => from,
            Err(e) => {
                outbox.unicast(connection, ServerMessage::Error { error: e.to_string() });
                return;
            }
        };
        if self.engine.piece_owner(from).is_some_and(|owner| owner != side) {
            outbox.unicast(
                connection,
                ServerMessage::Error {
                    error: "Not your piece".to_string(),
                },
            );
            return;
        }

        let destinations = if self.outcome.is_some() {
            Vec::new()
        } else {
            self.engine
                .legal_destinations(from)
                .into_iter()
                .map(|square| square.to_string())
                .collect()
        };
        outbox.unicast(
            connection,
            ServerMessage::AvailableMoves {
                from: from.to_string(),
                destinations,
            },
        );
    }

    /// Replaces the position with a saved one. The caller re-synchronizes
    /// turn state and participants.
    pub fn restore(&mut self, position: &str, move_index: u32) -> Result<(), EngineError> {
        self.engine.deserialize(position)?;
        self.move_index = move_index;
        self.outcome = self.engine.outcome();
        Ok(())
    }

    fn find_legal_move(
        &self,
        from: Square,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<Option<Move>, EngineError> {
        let to = parse_square(to)?;
        let promotion = promotion.map(parse_promotion).transpose()?;
        Ok(self.engine.try_get_legal_move(from, to, promotion))
    }

    fn reject(
        connection: ConnectionId,
        from: Square,
        reason: RejectReason,
        outbox: &mut Outbox,
    ) -> ProposeOutcome {
        outbox.unicast(
            connection,
            ServerMessage::MoveRejected {
                from: from.to_string(),
                reason,
            },
        );
        ProposeOutcome::Rejected(reason)
    }
}
