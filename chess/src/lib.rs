pub mod fen;
pub mod game;
pub mod types;
pub mod uci;

/// The square type is shared with callers as-is; everything else from
/// cozy-chess stays internal.
pub use cozy_chess::Square;

pub use fen::FenError;
pub use game::{Destination, Game, GameError, Outcome};
pub use types::{format_square, parse_square, square_at, PieceColor, PieceKind};
pub use uci::{convert_castling, format_uci_move, parse_uci_move};
