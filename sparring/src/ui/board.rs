use chess::{Destination, Game, PieceColor, PieceKind, Square};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Widget},
};

const SQUARE_WIDTH: u16 = 5;
const SQUARE_HEIGHT: u16 = 2;

pub struct BoardWidget<'a> {
    pub game: &'a Game,
    pub cursor: Square,
    pub selection: Option<Square>,
    pub targets: &'a [Destination],
    pub last_move: Option<(Square, Square)>,
}

impl Widget for BoardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().title("Board").borders(Borders::ALL);
        let inner = block.inner(area);
        block.render(area, buf);

        // rank labels on the left, file labels underneath
        for rank_idx in 0..8u16 {
            let y = inner.y + rank_idx * SQUARE_HEIGHT;
            if y < inner.bottom() {
                let label = format!("{}", 8 - rank_idx);
                buf.set_string(inner.x, y, label, Style::default().fg(Color::DarkGray));
            }
        }
        let label_y = inner.y + 8 * SQUARE_HEIGHT;
        for file_idx in 0..8u16 {
            let x = inner.x + 2 + file_idx * SQUARE_WIDTH + SQUARE_WIDTH / 2;
            if x < inner.right() && label_y < inner.bottom() {
                let label = format!("{}", (b'a' + file_idx as u8) as char);
                buf.set_string(x, label_y, label, Style::default().fg(Color::DarkGray));
            }
        }

        for rank_idx in 0..8usize {
            for file_idx in 0..8usize {
                // top row is rank 8
                let square = chess::square_at(file_idx, 7 - rank_idx);
                let x = inner.x + 2 + file_idx as u16 * SQUARE_WIDTH;
                let y = inner.y + rank_idx as u16 * SQUARE_HEIGHT;
                if x >= inner.right() || y >= inner.bottom() {
                    continue;
                }

                let width = SQUARE_WIDTH.min(inner.right() - x);
                let height = SQUARE_HEIGHT.min(inner.bottom() - y);
                let cell = Rect::new(x, y, width, height);

                let bg = self.square_background(square, file_idx, rank_idx);
                buf.set_style(cell, Style::default().bg(bg));

                if let Some((kind, color)) = self.game.piece_at(square) {
                    let fg = match color {
                        PieceColor::White => Color::White,
                        PieceColor::Black => Color::Black,
                    };
                    let style = Style::default()
                        .bg(bg)
                        .fg(fg)
                        .add_modifier(Modifier::BOLD);
                    let gx = x + SQUARE_WIDTH / 2;
                    if gx < inner.right() {
                        buf.set_string(gx, y, piece_glyph(kind, color), style);
                    }
                }
            }
        }
    }
}

impl BoardWidget<'_> {
    fn square_background(&self, square: Square, file_idx: usize, rank_idx: usize) -> Color {
        if square == self.cursor {
            return Color::Yellow;
        }
        if self.selection == Some(square) {
            return Color::Cyan;
        }
        if self.targets.iter().any(|d| d.square == square) {
            return Color::Green;
        }
        if self
            .last_move
            .map(|(from, to)| from == square || to == square)
            .unwrap_or(false)
        {
            return Color::Blue;
        }
        if (file_idx + rank_idx) % 2 == 0 {
            Color::Rgb(181, 136, 99)
        } else {
            Color::Rgb(240, 217, 181)
        }
    }
}

fn piece_glyph(kind: PieceKind, color: PieceColor) -> &'static str {
    match (color, kind) {
        (PieceColor::White, PieceKind::King) => "♔",
        (PieceColor::White, PieceKind::Queen) => "♕",
        (PieceColor::White, PieceKind::Rook) => "♖",
        (PieceColor::White, PieceKind::Bishop) => "♗",
        (PieceColor::White, PieceKind::Knight) => "♘",
        (PieceColor::White, PieceKind::Pawn) => "♙",
        (PieceColor::Black, PieceKind::King) => "♚",
        (PieceColor::Black, PieceKind::Queen) => "♛",
        (PieceColor::Black, PieceKind::Rook) => "♜",
        (PieceColor::Black, PieceKind::Bishop) => "♝",
        (PieceColor::Black, PieceKind::Knight) => "♞",
        (PieceColor::Black, PieceKind::Pawn) => "♟",
    }
}
