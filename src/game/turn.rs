use log::{info, warn};

use crate::error::TurnError;
use crate::models::{Outbox, ServerMessage, Side};

/// Whether this process owns the canonical game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    // The single host whose Position and TurnState are canonical.
    Authoritative,

    // A participant holding a read-only copy, written only from replicated
    // host messages.
    Mirror,
}

/// Single source of truth for whose turn it is.
#[derive(Debug, Clone)]
pub struct TurnArbiter {
    role: Role,
    current: Side,
    flips: u64,
}

impl TurnArbiter {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            current: Side::White,
            flips: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_authoritative(&self) -> bool {
        self.role == Role::Authoritative
    }

    pub fn current(&self) -> Side {
        self.current
    }

    /// Number of successful `end_turn` calls.
    pub fn flip_count(&self) -> u64 {
        self.flips
    }

    pub fn can_move(&self, side: Side) -> bool {
        side == self.current
    }

    pub fn end_turn(&mut self) -> Result<Side, TurnError> {
        self.ensure_authority("end_turn")?;
        self.current = self.current.opposite();
        self.flips += 1;
        Ok(self.current)
    }

    /// Absolute override used when restoring a saved match. Pushes a
    /// `TurnChanged` broadcast so every mirror re-synchronizes.
    pub fn set_turn_state(&mut self, side: Side, outbox: &mut Outbox) -> Result<(), TurnError> {
        self.ensure_authority("set_turn_state")?;
        info!("Turn state set to {}", side);
        self.current = side;
        outbox.broadcast(ServerMessage::TurnChanged { side });
        Ok(())
    }

    /// Host-local set without a broadcast, used while catching up a single
    /// connection.
    pub(crate) fn align(&mut self, side: Side) -> Result<(), TurnError> {
        self.ensure_authority("align")?;
        if self.current != side {
            warn!("Turn state {} diverged from position, realigning to {}", self.current, side);
            self.current = side;
        }
        Ok(())
    }

    /// Apply a replicated `TurnChanged`. Only mirrors accept these.
    pub fn observe(&mut self, side: Side) -> Result<(), TurnError> {
        if self.is_authoritative() {
            warn!("Ignoring replicated turn update on the authoritative arbiter");
            return Err(TurnError::NotAMirror);
        }
        self.current = side;
        Ok(())
    }

    fn ensure_authority(&self, operation: &'static str) -> Result<(), TurnError> {
        if self.is_authoritative() {
            Ok(())
        } else {
            warn!("Authority violation: {} called on a mirror", operation);
            Err(TurnError::AuthorityViolation { operation })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recipient;

    #[test]
    fn white_moves_first() {
        let arbiter = TurnArbiter::new(Role::Authoritative);
        assert!(arbiter.can_move(Side::White));
        assert!(!arbiter.can_move(Side::Black));
    }

    #[test]
    fn end_turn_toggles_and_counts() {
        let mut arbiter = TurnArbiter::new(Role::Authoritative);
        assert_eq!(arbiter.end_turn(), Ok(Side::Black));
        assert_eq!(arbiter.end_turn(), Ok(Side::White));
        assert_eq!(arbiter.flip_count(), 2);
    }

    #[test]
    fn mirror_cannot_end_turn() {
        let mut arbiter = TurnArbiter::new(Role::Mirror);
        assert_eq!(
            arbiter.end_turn(),
            Err(TurnError::AuthorityViolation { operation: "end_turn" })
        );
        assert_eq!(arbiter.current(), Side::White);
        assert_eq!(arbiter.flip_count(), 0);
    }

    #[test]
    fn mirror_cannot_set_turn_state() {
        let mut arbiter = TurnArbiter::new(Role::Mirror);
        let mut outbox = Outbox::new();
        assert!(arbiter.set_turn_state(Side::Black, &mut outbox).is_err());
        assert!(outbox.is_empty());
        assert_eq!(arbiter.current(), Side::White);
    }

    #[test]
    fn set_turn_state_broadcasts() {
        let mut arbiter = TurnArbiter::new(Role::Authoritative);
        let mut outbox = Outbox::new();
        arbiter.set_turn_state(Side::Black, &mut outbox).unwrap();
        assert_eq!(arbiter.current(), Side::Black);
        assert_eq!(arbiter.flip_count(), 0);
        let envelopes = outbox.into_envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].recipient, Recipient::All);
        assert_eq!(
            envelopes[0].message,
            ServerMessage::TurnChanged { side: Side::Black }
        );
    }

    #[test]
    fn only_mirrors_observe() {
        let mut mirror = TurnArbiter::new(Role::Mirror);
        mirror.observe(Side::Black).unwrap();
        assert_eq!(mirror.current(), Side::Black);

        let mut host = TurnArbiter::new(Role::Authoritative);
        assert_eq!(host.observe(Side::Black), Err(TurnError::NotAMirror));
        assert_eq!(host.current(), Side::White);
    }
}
