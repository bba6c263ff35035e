//! Brings participants up to date with the canonical state.
//!
//! `catchup` serves a single connection after its identity handshake.
//! `resync_all` is the load path, where every mirror must drop what it has
//! and adopt the restored match.

use log::{info, warn};

use crate::error::TurnError;
use crate::game::coordinator::MoveCoordinator;
use crate::game::engine::RuleEngine;
use crate::game::registry::{Admission, JoinKind};
use crate::game::turn::TurnArbiter;
use crate::models::{ConnectionId, CosmeticOverlay, Outbox, ServerMessage};

/// Unicasts `Joined` followed by a full `Catchup` to one connection.
///
/// On the authoritative host the arbiter is aligned with the side to move
/// of the position first. That alignment is local and is not broadcast.
pub fn catchup<E: RuleEngine>(
    connection: ConnectionId,
    admission: &Admission,
    match_id: &str,
    coordinator: &MoveCoordinator<E>,
    arbiter: &mut TurnArbiter,
    overlay: &CosmeticOverlay,
    outbox: &mut Outbox,
) {
    let position = coordinator.serialized_position();
    let side_to_move = coordinator.engine().side_to_move();

    if arbiter.is_authoritative() {
        if let Err(e) = arbiter.align(side_to_move) {
            warn!("Could not align turn state during catchup: {}", e);
        }
    }

    info!(
        "Catching up {} ({}) at move {}",
        connection,
        admission.side,
        coordinator.move_index()
    );
    outbox.unicast(
        connection,
        ServerMessage::Joined {
            match_id: match_id.to_string(),
            side: admission.side,
            rejoin: admission.kind == JoinKind::Rejoin,
        },
    );
    outbox.unicast(
        connection,
        ServerMessage::Catchup {
            position,
            turn: arbiter.current(),
            cosmetics: overlay.clone(),
            outcome: coordinator.outcome(),
        },
    );
}

/// Broadcasts the restored board, the turn, and every recorded skin.
pub fn resync_all<E: RuleEngine>(
    coordinator: &MoveCoordinator<E>,
    arbiter: &mut TurnArbiter,
    overlay: &CosmeticOverlay,
    outbox: &mut Outbox,
) -> Result<(), TurnError> {
    outbox.broadcast(ServerMessage::BoardSynced {
        position: coordinator.serialized_position(),
        move_index: coordinator.move_index(),
    });
    arbiter.set_turn_state(coordinator.engine().side_to_move(), outbox)?;

    for (side, skin) in overlay.entries() {
        outbox.broadcast(ServerMessage::CosmeticChanged {
            side,
            skin: skin.to_string(),
        });
    }

    if let Some(outcome) = coordinator.outcome() {
        outbox.broadcast(ServerMessage::OutcomeAnnounced {
            message: outcome.message(),
            outcome,
        });
    }
    Ok(())
}
