//! Engine session: hosts a compiled search module in an isolated worker
//! and relays its tagged signal protocol to the control side.

pub mod notation;
pub mod session;
pub mod worker;

pub use notation::{extract_best_move, is_coordinate_token, split_token, BestMove};
pub use session::{EngineSession, SearchRequest, SessionError, SessionEvent, SessionState};
pub use worker::{ModuleLocators, WorkerRequest, WorkerSignal};
