//! Turn orchestration: the single state machine that decides, after
//! every position change, whether the human or the automated side acts,
//! issues at most one search at a time, and applies engine results.
//!
//! The orchestrator owns the authoritative game state and is the only
//! code that mutates it, on behalf of both the human path and the
//! engine-result path. It never talks to the worker directly; the
//! control loop feeds it `SessionEvent`s and forwards the
//! `SearchRequest`s it produces.

use chess::{format_square, parse_square, Game, GameError, Outcome, PieceColor, PieceKind, Square};
use engine::{extract_best_move, split_token, SearchRequest, SessionEvent};

use crate::config;

/// User-visible engine status. Only session-fatal conditions land here;
/// move-level problems go to the observability log instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Loading,
    Ready,
    Error(String),
}

/// Bound on the in-memory observability log.
const LOG_CAPACITY: usize = 200;

pub struct Orchestrator {
    game: Game,
    engine_side: PieceColor,
    engine_status: EngineStatus,
    depth: u8,
    /// True exactly while a search has been issued and no terminal
    /// signal has been consumed for it.
    thinking: bool,
    /// Identifier of the run we are waiting on; results for any other
    /// run are discarded.
    pending_run: Option<u64>,
    /// Set when a user intervention invalidated the in-flight run. The
    /// run stays pending (it still holds the turn and blocks input)
    /// but its terminal signal is consumed without applying the result.
    discard_result: bool,
    /// Set when an engine turn ended without a usable move (no token or
    /// an illegal one). Blocks automatic re-invocation until the user
    /// intervenes.
    stalled: bool,
    selection: Option<Square>,
    last_move: Option<(Square, Square)>,
    log: Vec<String>,
}

impl Orchestrator {
    pub fn new(game: Game, engine_side: PieceColor, depth: u8) -> Self {
        Self {
            game,
            engine_side,
            engine_status: EngineStatus::Loading,
            depth: config::clamp_depth(depth),
            thinking: false,
            pending_run: None,
            discard_result: false,
            stalled: false,
            selection: None,
            last_move: None,
            log: Vec::new(),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn engine_side(&self) -> PieceColor {
        self.engine_side
    }

    pub fn engine_status(&self) -> &EngineStatus {
        &self.engine_status
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn thinking(&self) -> bool {
        self.thinking
    }

    pub fn selection(&self) -> Option<Square> {
        self.selection
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Re-evaluate whose turn it is. Safe to call on every tick: it
    /// returns a request at most once per engine turn, guarded by the
    /// thinking flag, and does nothing at all otherwise.
    pub fn next_search(&mut self) -> Option<SearchRequest> {
        if self.thinking || self.stalled {
            return None;
        }
        if self.engine_status != EngineStatus::Ready {
            return None;
        }
        if self.game.outcome() != Outcome::Ongoing {
            return None;
        }
        if self.game.side_to_move() != self.engine_side {
            return None;
        }
        self.thinking = true;
        Some(SearchRequest {
            position: self.game.to_fen(),
            depth: self.depth,
        })
    }

    /// Record the run id the session assigned to the search we issued.
    pub fn search_started(&mut self, run_id: u64) {
        self.pending_run = Some(run_id);
    }

    /// The search could not be issued after all.
    pub fn search_aborted(&mut self, error: &str) {
        tracing::error!(%error, "search could not be issued");
        self.push_log(format!("[error] {error}"));
        self.thinking = false;
        self.pending_run = None;
        self.discard_result = false;
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Ready => {
                self.engine_status = EngineStatus::Ready;
                // a fresh worker counts as user intervention
                self.stalled = false;
                self.push_log("[engine ready]");
            }
            SessionEvent::OutputLine { line, .. } => self.push_log(line),
            SessionEvent::Finished { run_id, output } => {
                if self.pending_run != Some(run_id) {
                    tracing::warn!(run_id, "ignoring result from a superseded run");
                    return;
                }
                self.pending_run = None;
                self.thinking = false;
                if self.discard_result {
                    self.discard_result = false;
                    tracing::debug!(run_id, "discarding result for a superseded position");
                    self.push_log("[stale result discarded]");
                    return;
                }
                self.push_log("[engine finished]");
                self.apply_engine_output(&output);
            }
            SessionEvent::Failed { run_id, error } => {
                tracing::error!(?run_id, %error, "engine session failed");
                self.pending_run = None;
                self.thinking = false;
                self.discard_result = false;
                self.engine_status = EngineStatus::Error(error.clone());
                self.push_log(format!("[fatal] {error}"));
            }
        }
    }

    /// One square of the select-then-move gesture. Ignored entirely
    /// while a search is pending, which closes the race window on the
    /// shared position.
    pub fn tap_square(&mut self, square: Square) {
        if self.thinking {
            return;
        }
        match self.selection {
            Some(origin) if origin == square => self.selection = None,
            Some(origin) => {
                let destination = self
                    .game
                    .legal_destinations(origin)
                    .into_iter()
                    .find(|d| d.square == square);
                match destination {
                    Some(dest) => {
                        // interactive path only: promotion defaults to
                        // the strongest piece
                        let promotion = dest.promotion_required.then_some(PieceKind::Queen);
                        match self.game.apply_selection(origin, square, promotion) {
                            Ok(()) => self.human_moved(origin, square),
                            Err(err) => {
                                tracing::debug!(%err, "interactive move rejected");
                            }
                        }
                    }
                    None => {
                        // reselect when tapping another of our pieces,
                        // otherwise drop the selection
                        self.selection = self.can_select(square).then_some(square);
                    }
                }
            }
            None => {
                if self.can_select(square) {
                    self.selection = Some(square);
                }
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Reassign the automated side. An in-flight result no longer makes
    /// sense for the new assignment and is discarded when it arrives.
    pub fn set_engine_side(&mut self, side: PieceColor) {
        if side == self.engine_side {
            return;
        }
        self.engine_side = side;
        self.stalled = false;
        self.invalidate_pending();
        self.push_log(format!("[engine plays {side}]"));
    }

    pub fn set_depth(&mut self, depth: u8) {
        self.depth = config::clamp_depth(depth);
    }

    /// Back to the initial position.
    pub fn reset(&mut self) {
        self.game.reset();
        self.selection = None;
        self.last_move = None;
        self.stalled = false;
        self.invalidate_pending();
        self.push_log("[game reset]");
    }

    /// Overwrite the position from pasted FEN text. Malformed text is
    /// silently ignored at this boundary; the position stays as it was.
    pub fn load_fen(&mut self, text: &str) {
        match self.game.load_fen(text) {
            Ok(()) => {
                self.selection = None;
                self.last_move = None;
                self.stalled = false;
                self.invalidate_pending();
                self.push_log("[position loaded]");
            }
            Err(err) => {
                tracing::debug!(%err, "rejected pasted position text");
            }
        }
    }

    /// The user asked for an engine restart; the control loop calls
    /// `EngineSession::start` alongside this. The superseded worker
    /// delivers no terminal signal, so the pending run is dropped
    /// outright rather than held for discard.
    pub fn engine_restarting(&mut self) {
        self.engine_status = EngineStatus::Loading;
        self.stalled = false;
        self.thinking = false;
        self.pending_run = None;
        self.discard_result = false;
        self.push_log("[engine restarting]");
    }

    fn apply_engine_output(&mut self, output: &str) {
        let Some(token) = extract_best_move(output) else {
            // a no-result run is not an error: the turn stays
            // unresolved until the user intervenes
            tracing::warn!("engine output contained no recognizable move");
            self.push_log("[warn] no move in engine output");
            self.stalled = true;
            return;
        };
        match self.game.apply_uci(&token) {
            Ok(()) => {
                self.selection = None;
                self.last_move = token_squares(&token);
                self.push_log(format!("[engine] {token}"));
            }
            Err(err @ (GameError::IllegalMove(_) | GameError::PromotionRequired(_))) => {
                // no automatic retry; logged and left for the user
                tracing::warn!(%token, %err, "engine move rejected");
                self.push_log(format!("[warn] engine move rejected: {token}"));
                self.stalled = true;
            }
            Err(err) => {
                tracing::warn!(%token, %err, "engine move unusable");
                self.push_log(format!("[warn] engine move unusable: {token}"));
                self.stalled = true;
            }
        }
    }

    fn human_moved(&mut self, origin: Square, destination: Square) {
        self.selection = None;
        self.last_move = Some((origin, destination));
        // a manual move counts as user intervention
        self.stalled = false;
        tracing::info!(
            from = %format_square(origin),
            to = %format_square(destination),
            "human move applied"
        );
    }

    fn can_select(&self, square: Square) -> bool {
        if self.game.outcome() != Outcome::Ongoing {
            return false;
        }
        let human_side = self.engine_side.opposite();
        if self.game.side_to_move() != human_side {
            return false;
        }
        matches!(self.game.piece_at(square), Some((_, color)) if color == human_side)
    }

    /// Invalidate the in-flight run without releasing the turn. The run
    /// stays pending so no second search can be issued and human input
    /// stays blocked; its terminal signal clears the flags and the
    /// result is thrown away.
    fn invalidate_pending(&mut self) {
        if self.thinking || self.pending_run.is_some() {
            self.discard_result = true;
        }
    }

    fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
        if self.log.len() > LOG_CAPACITY {
            self.log.remove(0);
        }
    }
}

fn token_squares(token: &str) -> Option<(Square, Square)> {
    let parts = split_token(token)?;
    Some((parse_square(&parts.origin)?, parse_square(&parts.destination)?))
}
