use cozy_chess::{Board, GameStatus, Move, Square};

use crate::fen;
use crate::types::{format_square, PieceColor, PieceKind};
use crate::uci;

/// Thin façade over the cozy-chess board.
///
/// This is the single authoritative position: callers mutate it in place
/// through move application, reset and position overwrite, and read it
/// back as FEN. Anything rule-related (legality, check, game end) is
/// answered by cozy-chess underneath.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
}

/// A legal destination for a selected piece.
///
/// `promotion_required` is an explicit tag rather than something callers
/// infer from the position; a move to such a square must carry a
/// promotion piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub square: Square,
    pub promotion_required: bool,
}

/// Result of the game as far as the rules engine is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ongoing,
    Won(PieceColor),
    Drawn,
}

impl Game {
    /// Start a game from the standard initial position.
    pub fn new() -> Self {
        Self {
            position: Board::default(),
        }
    }

    /// Start a game from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        Ok(Self {
            position: fen::parse_fen(fen)?,
        })
    }

    pub fn side_to_move(&self) -> PieceColor {
        self.position.side_to_move().into()
    }

    pub fn piece_at(&self, square: Square) -> Option<(PieceKind, PieceColor)> {
        let kind = self.position.piece_on(square)?;
        let color = self.position.color_on(square)?;
        Some((kind.into(), color.into()))
    }

    /// All legal moves in the current position.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|batch| {
            moves.extend(batch);
            false
        });
        moves
    }

    /// Legal destinations for the piece on `origin`, deduplicated across
    /// the four promotion variants.
    pub fn legal_destinations(&self, origin: Square) -> Vec<Destination> {
        let mut out: Vec<Destination> = Vec::new();
        for mv in self.legal_moves() {
            if mv.from != origin {
                continue;
            }
            match out.iter_mut().find(|d| d.square == mv.to) {
                Some(dest) => dest.promotion_required |= mv.promotion.is_some(),
                None => out.push(Destination {
                    square: mv.to,
                    promotion_required: mv.promotion.is_some(),
                }),
            }
        }
        out
    }

    /// Apply a move given as a coordinate token (`e2e4`, `e7e8q`).
    ///
    /// Standard castling notation is converted to cozy-chess form before
    /// matching. A token that lands a pawn on a promotion square without
    /// naming the promotion piece is rejected, never defaulted.
    pub fn apply_uci(&mut self, token: &str) -> Result<(), GameError> {
        let mv = uci::parse_uci_move(token)
            .ok_or_else(|| GameError::InvalidToken(token.to_string()))?;
        let legal = self.legal_moves();

        if legal.contains(&mv) {
            self.play(mv);
            return Ok(());
        }
        // only moves not directly legal are candidates for conversion, so
        // a real piece move to the g or c file is never rewritten
        let converted = uci::convert_castling(mv, &legal);
        if converted != mv && legal.contains(&converted) {
            self.play(converted);
            return Ok(());
        }
        if mv.promotion.is_none() && requires_promotion(&legal, mv.from, mv.to) {
            return Err(GameError::PromotionRequired(token.to_string()));
        }
        Err(GameError::IllegalMove(token.to_string()))
    }

    /// Apply a move built from an interactive selection.
    ///
    /// The caller decides the promotion piece; passing `None` for a
    /// promotion-eligible destination is an error so the defaulting
    /// policy stays with the caller.
    pub fn apply_selection(
        &mut self,
        origin: Square,
        destination: Square,
        promotion: Option<PieceKind>,
    ) -> Result<(), GameError> {
        let legal = self.legal_moves();
        let mv = Move {
            from: origin,
            to: destination,
            promotion: promotion.map(Into::into),
        };

        if legal.contains(&mv) {
            self.play(mv);
            return Ok(());
        }
        if mv.promotion.is_none() && requires_promotion(&legal, origin, destination) {
            return Err(GameError::PromotionRequired(format!(
                "{}{}",
                format_square(origin),
                format_square(destination)
            )));
        }
        Err(GameError::IllegalMove(uci::format_uci_move(mv)))
    }

    /// Overwrite the position from FEN text. On failure the current
    /// position is left untouched.
    pub fn load_fen(&mut self, text: &str) -> Result<(), GameError> {
        self.position = fen::parse_fen(text)?;
        Ok(())
    }

    /// Reset to the standard initial position.
    pub fn reset(&mut self) {
        self.position = Board::default();
    }

    pub fn to_fen(&self) -> String {
        fen::format_fen(&self.position)
    }

    pub fn outcome(&self) -> Outcome {
        match self.position.status() {
            GameStatus::Ongoing => Outcome::Ongoing,
            // cozy-chess reports Won when the side to move has lost
            GameStatus::Won => Outcome::Won(self.side_to_move().opposite()),
            GameStatus::Drawn => Outcome::Drawn,
        }
    }

    fn play(&mut self, mv: Move) {
        // Callers have already verified legality against legal_moves()
        self.position.play_unchecked(mv);
    }
}

fn requires_promotion(legal: &[Move], from: Square, to: Square) -> bool {
    legal
        .iter()
        .any(|m| m.from == from && m.to == to && m.promotion.is_some())
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("unrecognized move token: {0}")]
    InvalidToken(String),
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("promotion piece required for {0}")]
    PromotionRequired(String),
    #[error(transparent)]
    Fen(#[from] crate::fen::FenError),
}
