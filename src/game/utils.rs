use chess::{Board, BoardStatus, Color, Piece, Square, ALL_SQUARES};
use std::str::FromStr;

use crate::error::EngineError;
use crate::models::{Outcome, Side};

/// Parse a square name such as "e4" (case-insensitive)
pub fn parse_square(name: &str) -> Result<Square, EngineError> {
    Square::from_str(&name.trim().to_lowercase())
        .map_err(|_| EngineError::InvalidSquare(name.to_string()))
}

/// Parse a promotion piece given as a letter ("q") or a name ("queen")
pub fn parse_promotion(name: &str) -> Result<Piece, EngineError> {
    match name.trim().to_lowercase().as_str() {
        "q" | "queen" => Ok(Piece::Queen),
        "r" | "rook" => Ok(Piece::Rook),
        "b" | "bishop" => Ok(Piece::Bishop),
        "n" | "knight" => Ok(Piece::Knight),
        _ => Err(EngineError::InvalidPiece(name.to_string())),
    }
}

pub fn promotion_to_string(piece: Piece) -> String {
    match piece {
        Piece::Queen => "q",
        Piece::Rook => "r",
        Piece::Bishop => "b",
        Piece::Knight => "n",
        Piece::Pawn => "p",
        Piece::King => "k",
    }
    .to_string()
}

/// Get the outcome of the position on the board, if the game is decided
pub fn detect_outcome(board: &Board) -> Option<Outcome> {
    match board.status() {
        BoardStatus::Checkmate => Some(Outcome::Checkmate {
            winner: Side::from(!board.side_to_move()),
        }),
        BoardStatus::Stalemate => Some(Outcome::Stalemate),
        BoardStatus::Ongoing if has_insufficient_material(board) => {
            Some(Outcome::InsufficientMaterial)
        }
        BoardStatus::Ongoing => None,
    }
}

#[derive(Default)]
struct Material {
    minor: u32,
    major_or_pawn: u32,
    bishop_on_light: bool,
    bishop_on_dark: bool,
    bishops: u32,
}

/// Check if the board has insufficient material for checkmate
pub fn has_insufficient_material(board: &Board) -> bool {
    let mut white = Material::default();
    let mut black = Material::default();

    for square in ALL_SQUARES {
        let (Some(piece), Some(color)) = (board.piece_on(square), board.color_on(square)) else {
            continue;
        };
        let material = match color {
            Color::White => &mut white,
            Color::Black => &mut black,
        };
        match piece {
            Piece::Knight => material.minor += 1,
            Piece::Bishop => {
                material.minor += 1;
                material.bishops += 1;
                if (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 0 {
                    material.bishop_on_dark = true;
                } else {
                    material.bishop_on_light = true;
                }
            }
            Piece::Pawn | Piece::Rook | Piece::Queen => material.major_or_pawn += 1,
            Piece::King => {}
        }
    }

    if white.major_or_pawn > 0 || black.major_or_pawn > 0 {
        return false;
    }

    match (white.minor, black.minor) {
        // King vs king, or a lone minor piece against a bare king
        (0, 0) | (1, 0) | (0, 1) => true,
        // One bishop each, both on squares of the same color
        (1, 1) if white.bishops == 1 && black.bishops == 1 => {
            (white.bishop_on_light && black.bishop_on_light)
                || (white.bishop_on_dark && black.bishop_on_dark)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> Board {
        Board::from_str(fen).unwrap()
    }

    #[test]
    fn parses_squares_case_insensitively() {
        assert_eq!(parse_square("E2").unwrap(), Square::E2);
        assert!(matches!(parse_square("z9"), Err(EngineError::InvalidSquare(_))));
    }

    #[test]
    fn parses_promotion_letters_and_names() {
        assert_eq!(parse_promotion("N").unwrap(), Piece::Knight);
        assert_eq!(parse_promotion("queen").unwrap(), Piece::Queen);
        assert!(parse_promotion("king").is_err());
    }

    #[test]
    fn bare_kings_are_insufficient() {
        assert!(has_insufficient_material(&board("8/8/4k3/8/8/3K4/8/8 w - - 0 1")));
    }

    #[test]
    fn king_and_knight_against_king_is_insufficient() {
        assert!(has_insufficient_material(&board("8/8/4k3/8/8/3KN3/8/8 w - - 0 1")));
    }

    #[test]
    fn same_colored_bishops_are_insufficient() {
        // c1 and f8 are both dark squares
        assert!(has_insufficient_material(&board("5b2/8/4k3/8/8/3K4/8/2B5 w - - 0 1")));
        // c1 is dark, c8 is light
        assert!(!has_insufficient_material(&board("2b5/8/4k3/8/8/3K4/8/2B5 w - - 0 1")));
    }

    #[test]
    fn a_pawn_is_enough() {
        assert!(!has_insufficient_material(&board("8/8/4k3/8/8/3K4/4P3/8 w - - 0 1")));
    }

    #[test]
    fn detects_checkmate_winner() {
        // Fool's mate, white to move and mated
        let mated = board("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert_eq!(
            detect_outcome(&mated),
            Some(Outcome::Checkmate { winner: Side::Black })
        );
        assert_eq!(detect_outcome(&Board::default()), None);
    }

    #[test]
    fn detects_stalemate() {
        let stalemate = board("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert_eq!(detect_outcome(&stalemate), Some(Outcome::Stalemate));
    }
}
