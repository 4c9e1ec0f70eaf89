//! The isolated worker that hosts the compiled search module.
//!
//! The worker is a spawned task that owns everything on its side of the
//! protocol: the resolved module locators and, during a run, the child
//! process executing the search. It never shares memory with the control
//! side; requests come in on one channel, tagged signals go out on the
//! other. One search spawns one child process, and the line accumulator
//! for a run lives entirely inside that run's scope.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Locators for the compute module and its optional binary payload.
#[derive(Debug, Clone)]
pub struct ModuleLocators {
    pub module: PathBuf,
    pub payload: Option<PathBuf>,
}

impl ModuleLocators {
    pub fn new(module: impl Into<PathBuf>) -> Self {
        Self {
            module: module.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<PathBuf>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Fixed suffix-rewrite rule: the payload sits next to the module
    /// with a `bin` extension unless configured explicitly.
    pub fn derived_payload(&self) -> PathBuf {
        self.module.with_extension("bin")
    }
}

/// Control → worker requests.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    Init { locators: ModuleLocators },
    Run { run_id: u64, args: Vec<String> },
}

/// Worker → control signals. Run-scoped signals carry the identifier of
/// the run that produced them so the control side can discard stale ones.
#[derive(Debug, Clone)]
pub enum WorkerSignal {
    Ready,
    Print { run_id: u64, line: String },
    Done { run_id: u64, output: String },
    Fatal { run_id: Option<u64>, error: String },
}

/// Channel endpoints plus the task handle for one worker instance.
pub struct WorkerHandle {
    pub requests: mpsc::Sender<WorkerRequest>,
    pub signals: mpsc::Receiver<WorkerSignal>,
    pub task: JoinHandle<()>,
}

/// Bring up a fresh worker instance with its own channels.
pub fn spawn() -> WorkerHandle {
    let (request_tx, request_rx) = mpsc::channel(32);
    let (signal_tx, signal_rx) = mpsc::channel(64);
    let task = tokio::spawn(worker_loop(request_rx, signal_tx));
    WorkerHandle {
        requests: request_tx,
        signals: signal_rx,
        task,
    }
}

/// Module state after a successful init.
#[derive(Debug, Clone)]
struct LoadedModule {
    binary: PathBuf,
    payload: Option<PathBuf>,
}

async fn worker_loop(
    mut requests: mpsc::Receiver<WorkerRequest>,
    signals: mpsc::Sender<WorkerSignal>,
) {
    let mut module: Option<LoadedModule> = None;

    while let Some(request) = requests.recv().await {
        match request {
            WorkerRequest::Init { locators } => match load_module(&locators) {
                Ok(loaded) => {
                    tracing::info!(module = %loaded.binary.display(), "engine module loaded");
                    module = Some(loaded);
                    if signals.send(WorkerSignal::Ready).await.is_err() {
                        return;
                    }
                }
                Err(error) => {
                    tracing::error!(%error, "engine module failed to load");
                    module = None;
                    if signals
                        .send(WorkerSignal::Fatal {
                            run_id: None,
                            error,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            },
            WorkerRequest::Run { run_id, args } => {
                let Some(loaded) = module.clone() else {
                    let fatal = WorkerSignal::Fatal {
                        run_id: Some(run_id),
                        error: "engine module not initialized".to_string(),
                    };
                    if signals.send(fatal).await.is_err() {
                        return;
                    }
                    continue;
                };
                if run_module(&loaded, run_id, &args, &signals).await.is_err() {
                    // control side is gone; nothing left to report to
                    return;
                }
            }
        }
    }
    tracing::debug!("worker request channel closed, exiting");
}

fn load_module(locators: &ModuleLocators) -> Result<LoadedModule, String> {
    if !locators.module.is_file() {
        return Err(format!(
            "engine module not found: {}",
            locators.module.display()
        ));
    }
    let payload = match &locators.payload {
        // an explicitly configured payload must exist
        Some(path) => {
            if !path.is_file() {
                return Err(format!("engine payload not found: {}", path.display()));
            }
            Some(path.clone())
        }
        // a derived payload is optional: the module may be self-contained
        None => {
            let derived = locators.derived_payload();
            derived.is_file().then_some(derived)
        }
    };
    Ok(LoadedModule {
        binary: locators.module.clone(),
        payload,
    })
}

/// Execute one search: spawn the module, stream its output as `Print`
/// signals, then emit exactly one terminal `Done` or `Fatal`.
///
/// Returns `Err` only when the signal channel is closed, meaning this
/// worker has been superseded and should stop.
async fn run_module(
    loaded: &LoadedModule,
    run_id: u64,
    args: &[String],
    signals: &mpsc::Sender<WorkerSignal>,
) -> Result<(), ()> {
    tracing::debug!(run_id, ?args, "launching engine module");

    let mut command = tokio::process::Command::new(&loaded.binary);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(payload) = &loaded.payload {
        command.env("SPARRING_MODULE_PAYLOAD", payload);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            return send_fatal(signals, run_id, format!("failed to launch engine module: {err}"))
                .await;
        }
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return send_fatal(signals, run_id, "engine module pipes unavailable".to_string()).await;
    };

    // Owned by this run; a fresh run starts from an empty accumulator.
    let mut lines: Vec<String> = Vec::new();

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut stdout_open = true;
    let mut stderr_open = true;

    // Diagnostic and error output are forwarded alike, in arrival order.
    while stdout_open || stderr_open {
        let next = tokio::select! {
            line = stdout_lines.next_line(), if stdout_open => match line {
                Ok(Some(line)) => Some(line),
                Ok(None) => { stdout_open = false; None }
                Err(err) => {
                    return send_fatal(signals, run_id, format!("engine output unreadable: {err}")).await;
                }
            },
            line = stderr_lines.next_line(), if stderr_open => match line {
                Ok(Some(line)) => Some(line),
                Ok(None) => { stderr_open = false; None }
                Err(err) => {
                    return send_fatal(signals, run_id, format!("engine output unreadable: {err}")).await;
                }
            },
        };
        if let Some(line) = next {
            tracing::trace!(run_id, %line, "module >>");
            lines.push(line.clone());
            if signals
                .send(WorkerSignal::Print { run_id, line })
                .await
                .is_err()
            {
                return Err(());
            }
        }
    }

    match child.wait().await {
        Ok(status) if status.success() => {
            let signal = WorkerSignal::Done {
                run_id,
                output: lines.join("\n"),
            };
            signals.send(signal).await.map_err(|_| ())
        }
        Ok(status) => {
            send_fatal(
                signals,
                run_id,
                format!("engine module exited abnormally: {status}"),
            )
            .await
        }
        Err(err) => {
            send_fatal(signals, run_id, format!("failed to reap engine module: {err}")).await
        }
    }
}

async fn send_fatal(
    signals: &mpsc::Sender<WorkerSignal>,
    run_id: u64,
    error: String,
) -> Result<(), ()> {
    tracing::warn!(run_id, %error, "run failed");
    signals
        .send(WorkerSignal::Fatal {
            run_id: Some(run_id),
            error,
        })
        .await
        .map_err(|_| ())
}
