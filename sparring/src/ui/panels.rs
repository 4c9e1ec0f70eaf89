use chess::{Outcome, PieceColor};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::orchestrator::{EngineStatus, Orchestrator};

pub struct StatusPanel<'a> {
    pub orchestrator: &'a Orchestrator,
}

impl Widget for StatusPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let orch = self.orchestrator;

        let engine_span = match orch.engine_status() {
            EngineStatus::Loading => Span::styled("loading…", Style::default().fg(Color::Yellow)),
            EngineStatus::Ready if orch.thinking() => {
                Span::styled("thinking…", Style::default().fg(Color::Cyan))
            }
            EngineStatus::Ready => Span::styled("ready", Style::default().fg(Color::Green)),
            EngineStatus::Error(err) => Span::styled(
                format!("error: {err}"),
                Style::default().fg(Color::Red),
            ),
        };

        let outcome_line = match orch.game().outcome() {
            Outcome::Ongoing => Line::from(format!("Turn: {}", orch.game().side_to_move())),
            Outcome::Won(PieceColor::White) => checkered("Checkmate: white wins"),
            Outcome::Won(PieceColor::Black) => checkered("Checkmate: black wins"),
            Outcome::Drawn => checkered("Draw"),
        };

        let lines = vec![
            Line::from(vec![Span::raw("Engine: "), engine_span]),
            Line::from(format!(
                "Engine plays {}, you play {}",
                orch.engine_side(),
                orch.engine_side().opposite()
            )),
            Line::from(format!("Search depth: {}", orch.depth())),
            outcome_line,
            Line::from(""),
            Line::from(Span::styled("FEN", Style::default().fg(Color::DarkGray))),
            Line::from(orch.game().to_fen()),
        ];

        Paragraph::new(lines)
            .block(Block::default().title("Game").borders(Borders::ALL))
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

fn checkered(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    ))
}

pub struct OutputPanel<'a> {
    pub log: &'a [String],
}

impl Widget for OutputPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let visible = area.height.saturating_sub(2) as usize;
        let start = self.log.len().saturating_sub(visible);
        let lines: Vec<Line> = self.log[start..]
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect();

        Paragraph::new(lines)
            .block(Block::default().title("Engine output").borders(Borders::ALL))
            .render(area, buf);
    }
}

pub struct HelpLine<'a> {
    pub fen_entry: Option<&'a str>,
}

impl Widget for HelpLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = match self.fen_entry {
            Some(buffer) => Line::from(vec![
                Span::styled("FEN> ", Style::default().fg(Color::Yellow)),
                Span::raw(buffer.to_string()),
            ]),
            None => Line::from(Span::styled(
                "arrows move · enter select/move · esc deselect · s side · r reset · f fen · +/- depth · e restart engine · q quit",
                Style::default().fg(Color::DarkGray),
            )),
        };
        Paragraph::new(line).render(area, buf);
    }
}
