mod board;
mod panels;

use std::io;
use std::time::Duration;

use chess::{Game, Square};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use engine::{EngineSession, ModuleLocators};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};

use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use board::BoardWidget;
use panels::{HelpLine, OutputPanel, StatusPanel};

/// How long one tick waits for keyboard input before draining session
/// events again. Keeps the loop responsive without busy-spinning.
const TICK: Duration = Duration::from_millis(50);

/// Zero-based (file, rank) cursor on the board.
struct Cursor {
    file: usize,
    rank: usize,
}

impl Cursor {
    fn square(&self) -> Square {
        chess::square_at(self.file, self.rank)
    }
}

/// Run the TUI application.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, settings).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    settings: Settings,
) -> anyhow::Result<()> {
    let game = match &settings.start_fen {
        Some(fen) => Game::from_fen(fen)
            .map_err(|err| anyhow::anyhow!("invalid start position: {err}"))?,
        None => Game::new(),
    };
    let mut orchestrator = Orchestrator::new(game, settings.engine_side, settings.depth);

    let locators = match &settings.payload {
        Some(payload) => ModuleLocators::new(&settings.module).with_payload(payload),
        None => ModuleLocators::new(&settings.module),
    };
    let mut session = EngineSession::new();
    session.start(locators.clone()).await?;

    let mut cursor = Cursor { file: 4, rank: 1 };
    let mut fen_entry: Option<String> = None;

    loop {
        // drain whatever the worker produced since the last tick
        while let Some(event) = session.try_recv_event() {
            orchestrator.handle_session_event(event);
        }

        // turn re-evaluation runs every tick; the orchestrator makes it
        // fire at most once per engine turn
        if let Some(request) = orchestrator.next_search() {
            match session.run(request).await {
                Ok(run_id) => orchestrator.search_started(run_id),
                Err(err) => orchestrator.search_aborted(&err.to_string()),
            }
        }

        terminal.draw(|f| draw(f, &orchestrator, &cursor, fen_entry.as_deref()))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        // FEN entry mode captures all keys until enter/esc
        if let Some(mut buffer) = fen_entry.take() {
            match key.code {
                KeyCode::Enter => orchestrator.load_fen(&buffer),
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    buffer.pop();
                    fen_entry = Some(buffer);
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    fen_entry = Some(buffer);
                }
                _ => fen_entry = Some(buffer),
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => return Ok(()),
            KeyCode::Left => cursor.file = cursor.file.saturating_sub(1),
            KeyCode::Right => cursor.file = (cursor.file + 1).min(7),
            KeyCode::Down => cursor.rank = cursor.rank.saturating_sub(1),
            KeyCode::Up => cursor.rank = (cursor.rank + 1).min(7),
            KeyCode::Enter | KeyCode::Char(' ') => orchestrator.tap_square(cursor.square()),
            KeyCode::Esc => orchestrator.clear_selection(),
            KeyCode::Char('s') => {
                let side = orchestrator.engine_side().opposite();
                orchestrator.set_engine_side(side);
            }
            KeyCode::Char('r') => orchestrator.reset(),
            KeyCode::Char('f') => fen_entry = Some(orchestrator.game().to_fen()),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                orchestrator.set_depth(orchestrator.depth().saturating_add(1));
            }
            KeyCode::Char('-') => {
                orchestrator.set_depth(orchestrator.depth().saturating_sub(1));
            }
            KeyCode::Char('e') => {
                orchestrator.engine_restarting();
                session.start(locators.clone()).await?;
            }
            _ => {}
        }
    }
}

fn draw(f: &mut Frame, orchestrator: &Orchestrator, cursor: &Cursor, fen_entry: Option<&str>) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(18), Constraint::Length(1)])
        .split(f.area());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(30)])
        .split(outer[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(3)])
        .split(main[1]);

    let targets = orchestrator
        .selection()
        .map(|sq| orchestrator.game().legal_destinations(sq))
        .unwrap_or_default();

    f.render_widget(
        BoardWidget {
            game: orchestrator.game(),
            cursor: cursor.square(),
            selection: orchestrator.selection(),
            targets: &targets,
            last_move: orchestrator.last_move(),
        },
        main[0],
    );
    f.render_widget(
        StatusPanel { orchestrator },
        side[0],
    );
    f.render_widget(OutputPanel { log: orchestrator.log() }, side[1]);
    f.render_widget(HelpLine { fen_entry }, outer[1]);
}
