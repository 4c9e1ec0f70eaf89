//! Coordinate (UCI-style) move notation helpers.

use cozy_chess::{File, Move, Rank, Square};

use crate::types::{format_square, parse_square, PieceKind};

/// Parse a coordinate move token (`e2e4`, `e7e8q`) into a move.
/// Shape-only: the result may still be illegal on the board.
pub fn parse_uci_move(token: &str) -> Option<Move> {
    if token.len() != 4 && token.len() != 5 {
        return None;
    }
    let from = parse_square(token.get(0..2)?)?;
    let to = parse_square(token.get(2..4)?)?;
    let promotion = match token.get(4..5) {
        Some(letter) => {
            let kind = PieceKind::from_char(letter.chars().next()?)?;
            if !matches!(
                kind,
                PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight
            ) {
                return None;
            }
            Some(kind.into())
        }
        None => None,
    };
    Some(Move {
        from,
        to,
        promotion,
    })
}

/// Format a move as a coordinate token (`e2e4`, `e7e8q`).
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(PieceKind::from(promo).to_char());
    }
    s
}

/// Convert standard castling notation to cozy_chess notation.
///
/// Engines write the king's two-square move (e1g1, e1c1, e8g8, e8c8);
/// cozy_chess represents castling as king-takes-rook (e1h1, e1a1, ...).
/// Returns the converted move only when it is actually legal, otherwise
/// the move is passed through untouched.
pub fn convert_castling(mv: Move, legal_moves: &[Move]) -> Move {
    let on_back_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let from_e_file = matches!(mv.from.file(), File::E);
    let to_g_or_c = matches!(mv.to.file(), File::G | File::C);

    if !(on_back_rank && from_e_file && to_g_or_c && mv.promotion.is_none()) {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        _ => File::A,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if legal_moves.contains(&converted) {
        converted
    } else {
        mv
    }
}
