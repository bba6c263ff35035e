//! Rule engine collaborator.
//!
//! The host never interprets chess rules itself; it asks a [`RuleEngine`]
//! whether a move is legal and has it apply the move. [`ChessEngine`] is the
//! implementation backed by the `chess` crate, extended with the half-move
//! clock and full-move number that `chess::Board` does not track.

use chess::{Board, ChessMove, MoveGen, Piece, Square};
use std::str::FromStr;

use crate::error::EngineError;
use crate::game::utils::detect_outcome;
use crate::models::{Move, Outcome, Side};

pub trait RuleEngine {
    /// Find the legal move from `from` to `to`. A pawn reaching the last rank
    /// without an explicit promotion piece promotes to a queen.
    fn try_get_legal_move(&self, from: Square, to: Square, promotion: Option<Piece>)
        -> Option<Move>;

    /// Apply a move, returning false (and leaving the position untouched) if
    /// it cannot be applied.
    fn apply_move(&mut self, mv: Move) -> bool;

    fn side_to_move(&self) -> Side;

    fn serialize(&self) -> String;

    fn deserialize(&mut self, serialized: &str) -> Result<(), EngineError>;

    fn legal_destinations(&self, from: Square) -> Vec<Square>;

    fn piece_owner(&self, square: Square) -> Option<Side>;

    fn outcome(&self) -> Option<Outcome>;
}

/// Standard chess position with FEN serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct ChessEngine {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for ChessEngine {
    fn default() -> Self {
        Self {
            board: Board::default(),
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }
}

impl ChessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(fen: &str) -> Result<Self, EngineError> {
        let mut engine = Self::new();
        engine.deserialize(fen)?;
        Ok(engine)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }
}

impl RuleEngine for ChessEngine {
    fn try_get_legal_move(
        &self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Option<Move> {
        let candidates: Vec<ChessMove> = MoveGen::new_legal(&self.board)
            .filter(|m| m.get_source() == from && m.get_dest() == to)
            .collect();

        let is_promotion = candidates.iter().any(|m| m.get_promotion().is_some());
        let found = if is_promotion {
            let wanted = promotion.unwrap_or(Piece::Queen);
            candidates
                .into_iter()
                .find(|m| m.get_promotion() == Some(wanted))
        } else {
            candidates.into_iter().next()
        }?;

        Some(Move::new(
            found.get_source(),
            found.get_dest(),
            found.get_promotion(),
        ))
    }

    fn apply_move(&mut self, mv: Move) -> bool {
        let chess_move = ChessMove::new(mv.from, mv.to, mv.promotion);
        if !self.board.legal(chess_move) {
            return false;
        }

        let mover = self.board.side_to_move();
        let is_pawn_move = self.board.piece_on(mv.from) == Some(Piece::Pawn);
        let is_capture = self.board.piece_on(mv.to).is_some();

        self.board = self.board.make_move_new(chess_move);

        if is_pawn_move || is_capture {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if mover == chess::Color::Black {
            self.fullmove_number += 1;
        }
        true
    }

    fn side_to_move(&self) -> Side {
        self.board.side_to_move().into()
    }

    fn serialize(&self) -> String {
        let board_fen = self.board.to_string();
        let placement: Vec<&str> = board_fen.split_whitespace().take(4).collect();
        format!(
            "{} {} {}",
            placement.join(" "),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    fn deserialize(&mut self, serialized: &str) -> Result<(), EngineError> {
        let fields: Vec<&str> = serialized.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(EngineError::InvalidPosition(serialized.to_string()));
        }
        let board = Board::from_str(&fields[..4].join(" "))
            .map_err(|e| EngineError::InvalidPosition(format!("{serialized}: {e}")))?;

        let parse_counter = |index: usize, default: u32| -> Result<u32, EngineError> {
            match fields.get(index) {
                Some(value) => value
                    .parse()
                    .map_err(|_| EngineError::InvalidPosition(serialized.to_string())),
                None => Ok(default),
            }
        };
        let halfmove_clock = parse_counter(4, 0)?;
        let fullmove_number = parse_counter(5, 1)?;

        self.board = board;
        self.halfmove_clock = halfmove_clock;
        self.fullmove_number = fullmove_number;
        Ok(())
    }

    fn legal_destinations(&self, from: Square) -> Vec<Square> {
        let mut destinations: Vec<Square> = MoveGen::new_legal(&self.board)
            .filter(|m| m.get_source() == from)
            .map(|m| m.get_dest())
            .collect();
        // Promotions yield one move per piece for the same destination
        destinations.dedup();
        destinations
    }

    fn piece_owner(&self, square: Square) -> Option<Side> {
        self.board.color_on(square).map(Side::from)
    }

    fn outcome(&self) -> Option<Outcome> {
        detect_outcome(&self.board)
    }
}
