//! Session state machine over one worker instance.
//!
//! The session owns the worker exclusively: `start` supersedes any
//! previous worker, `dispose` tears it down, `run` issues a search.
//! Signals from a superseded worker can never reach the session again
//! because its channel endpoints are dropped with the old handle, so
//! invalidation is by worker identity rather than session state. Within
//! one worker, monotonically increasing run identifiers let the session
//! discard terminal signals from runs it no longer cares about.

use crate::worker::{self, ModuleLocators, WorkerHandle, WorkerRequest, WorkerSignal};
use tokio::sync::mpsc::error::TryRecvError;

/// Lifecycle of the session's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Running,
    Errored,
}

/// Classified signals surfaced to the control side.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The module finished loading; any prior error is cleared.
    Ready,
    /// One line of diagnostic output, forwarded verbatim.
    OutputLine { run_id: u64, line: String },
    /// A run finished normally; `output` is the joined line accumulator.
    Finished { run_id: u64, output: String },
    /// The module failed to load (`run_id` is `None`) or a run crashed.
    /// The worker is assumed compromised and must be restarted.
    Failed { run_id: Option<u64>, error: String },
}

/// A single search: the serialized position and the depth budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub position: String,
    pub depth: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is not ready to search (state: {0:?})")]
    NotReady(SessionState),
    #[error("a search is already in flight (run {0})")]
    SearchInFlight(u64),
    #[error("engine worker is gone")]
    WorkerGone,
}

/// Owns one isolated worker instance and runs the init/run/teardown
/// protocol against it.
pub struct EngineSession {
    state: SessionState,
    worker: Option<WorkerHandle>,
    next_run_id: u64,
    pending_run: Option<u64>,
}

impl EngineSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            worker: None,
            next_run_id: 1,
            pending_run: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identifier of the in-flight run, if any.
    pub fn pending_run(&self) -> Option<u64> {
        self.pending_run
    }

    /// Tear down any live worker and bring up a fresh one, then send the
    /// init request. Idempotent: every call fully supersedes the
    /// previous worker instance.
    pub async fn start(&mut self, locators: ModuleLocators) -> Result<(), SessionError> {
        self.teardown();
        tracing::info!(module = %locators.module.display(), "starting engine worker");
        let handle = worker::spawn();
        handle
            .requests
            .send(WorkerRequest::Init { locators })
            .await
            .map_err(|_| SessionError::WorkerGone)?;
        self.worker = Some(handle);
        self.state = SessionState::Initializing;
        Ok(())
    }

    /// Issue one search. Only valid while `Ready` with no run pending;
    /// the orchestrator is the sole caller and enforces mutual exclusion,
    /// these checks just turn caller bugs into errors instead of
    /// crossed-up results.
    pub async fn run(&mut self, request: SearchRequest) -> Result<u64, SessionError> {
        if let Some(run_id) = self.pending_run {
            return Err(SessionError::SearchInFlight(run_id));
        }
        if self.state != SessionState::Ready {
            return Err(SessionError::NotReady(self.state));
        }
        let worker = self.worker.as_ref().ok_or(SessionError::WorkerGone)?;

        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let args = vec![
            "--fen".to_string(),
            request.position,
            "--search".to_string(),
            request.depth.to_string(),
        ];
        tracing::debug!(run_id, "issuing search request");
        worker
            .requests
            .send(WorkerRequest::Run { run_id, args })
            .await
            .map_err(|_| SessionError::WorkerGone)?;
        self.state = SessionState::Running;
        self.pending_run = Some(run_id);
        Ok(run_id)
    }

    /// Terminate the worker and release its resources. Idempotent and
    /// safe to call at any time; an in-flight run is discarded with no
    /// signal delivered for it.
    pub fn dispose(&mut self) {
        self.teardown();
        self.state = SessionState::Uninitialized;
    }

    /// Non-blocking event poll for tick-driven callers.
    pub fn try_recv_event(&mut self) -> Option<SessionEvent> {
        loop {
            let received = match self.worker.as_mut() {
                Some(worker) => worker.signals.try_recv(),
                None => return None,
            };
            match received {
                Ok(signal) => {
                    if let Some(event) = self.classify(signal) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(self.worker_vanished()),
            }
        }
    }

    /// Await the next event from the current worker. Returns `None` when
    /// no worker is live.
    pub async fn recv_event(&mut self) -> Option<SessionEvent> {
        loop {
            let received = match self.worker.as_mut() {
                Some(worker) => worker.signals.recv().await,
                None => return None,
            };
            match received {
                Some(signal) => {
                    if let Some(event) = self.classify(signal) {
                        return Some(event);
                    }
                }
                None => return Some(self.worker_vanished()),
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.worker.take() {
            // dropping the handle severs both channels; aborting the task
            // also kills any child still searching (kill_on_drop)
            handle.task.abort();
        }
        self.pending_run = None;
    }

    fn worker_vanished(&mut self) -> SessionEvent {
        // transport-level fault: surface as a synthesized fatal
        self.worker = None;
        self.pending_run = None;
        self.state = SessionState::Errored;
        SessionEvent::Failed {
            run_id: None,
            error: "engine worker exited unexpectedly".to_string(),
        }
    }

    fn classify(&mut self, signal: WorkerSignal) -> Option<SessionEvent> {
        match signal {
            WorkerSignal::Ready => {
                self.state = SessionState::Ready;
                Some(SessionEvent::Ready)
            }
            WorkerSignal::Print { run_id, line } => {
                if self.pending_run == Some(run_id) {
                    Some(SessionEvent::OutputLine { run_id, line })
                } else {
                    tracing::warn!(run_id, "discarding output line from a stale run");
                    None
                }
            }
            WorkerSignal::Done { run_id, output } => {
                if self.pending_run == Some(run_id) {
                    self.pending_run = None;
                    self.state = SessionState::Ready;
                    Some(SessionEvent::Finished { run_id, output })
                } else {
                    tracing::warn!(run_id, "discarding terminal signal from a stale run");
                    None
                }
            }
            WorkerSignal::Fatal { run_id, error } => {
                if run_id.is_some() && run_id != self.pending_run {
                    tracing::warn!(?run_id, %error, "discarding failure from a stale run");
                    return None;
                }
                self.pending_run = None;
                self.state = SessionState::Errored;
                Some(SessionEvent::Failed { run_id, error })
            }
        }
    }
}

impl Default for EngineSession {
    fn default() -> Self {
        Self::new()
    }
}
