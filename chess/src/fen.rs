use cozy_chess::Board;

/// Parse a FEN string into a board. Leading/trailing whitespace is
/// tolerated because position text often arrives from pasted input.
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    fen.trim().parse().map_err(|_| FenError::InvalidFormat)
}

/// Serialize a board as a FEN string.
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
}
