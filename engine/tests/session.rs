//! Integration tests for the session/worker protocol against stub
//! engine modules (small shell scripts standing in for the compiled
//! search binary).

use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::{EngineSession, ModuleLocators, SearchRequest, SessionError, SessionEvent, SessionState};

/// Write an executable stub module into `dir`.
fn stub_module(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

async fn next_event(session: &mut EngineSession) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(10), session.recv_event())
        .await
        .expect("timed out waiting for session event")
        .expect("no live worker")
}

/// Drain events until a terminal one arrives, collecting output lines.
async fn run_to_completion(session: &mut EngineSession) -> (Vec<String>, SessionEvent) {
    let mut lines = Vec::new();
    loop {
        match next_event(session).await {
            SessionEvent::OutputLine { line, .. } => lines.push(line),
            terminal @ (SessionEvent::Finished { .. } | SessionEvent::Failed { .. }) => {
                return (lines, terminal)
            }
            SessionEvent::Ready => panic!("unexpected ready mid-run"),
        }
    }
}

#[tokio::test]
async fn ready_then_single_run() {
    let dir = tempfile::tempdir().unwrap();
    let module = stub_module(
        dir.path(),
        "stub.sh",
        "echo \"info depth 1 score cp 20\"\necho \"bestmove e2e4\"",
    );

    let mut session = EngineSession::new();
    session.start(ModuleLocators::new(&module)).await.unwrap();
    assert_eq!(session.state(), SessionState::Initializing);

    assert!(matches!(next_event(&mut session).await, SessionEvent::Ready));
    assert_eq!(session.state(), SessionState::Ready);

    let run_id = session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 3,
        })
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.pending_run(), Some(run_id));

    let (lines, terminal) = run_to_completion(&mut session).await;
    let SessionEvent::Finished { run_id: done_id, output } = terminal else {
        panic!("expected a finished run, got {terminal:?}");
    };
    assert_eq!(done_id, run_id);
    // the joined result is exactly the forwarded lines, in order
    assert_eq!(output, lines.join("\n"));
    assert!(output.contains("bestmove e2e4"));
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.pending_run(), None);
}

#[tokio::test]
async fn stderr_is_forwarded_as_output() {
    let dir = tempfile::tempdir().unwrap();
    let module = stub_module(
        dir.path(),
        "stub.sh",
        "echo \"diag on stderr\" >&2\necho \"bestmove d2d4\"",
    );

    let mut session = EngineSession::new();
    session.start(ModuleLocators::new(&module)).await.unwrap();
    assert!(matches!(next_event(&mut session).await, SessionEvent::Ready));
    session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap();

    let (lines, terminal) = run_to_completion(&mut session).await;
    assert!(matches!(terminal, SessionEvent::Finished { .. }));
    assert!(lines.iter().any(|l| l == "diag on stderr"));
}

#[tokio::test]
async fn missing_module_is_a_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = EngineSession::new();
    session
        .start(ModuleLocators::new(dir.path().join("no-such-module")))
        .await
        .unwrap();

    let event = next_event(&mut session).await;
    let SessionEvent::Failed { run_id, error } = event else {
        panic!("expected a load failure, got {event:?}");
    };
    assert_eq!(run_id, None);
    assert!(error.contains("not found"));
    assert_eq!(session.state(), SessionState::Errored);
}

#[tokio::test]
async fn explicit_payload_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let module = stub_module(dir.path(), "stub.sh", "echo \"bestmove e2e4\"");

    let mut session = EngineSession::new();
    session
        .start(ModuleLocators::new(&module).with_payload(dir.path().join("weights.bin")))
        .await
        .unwrap();

    assert!(matches!(
        next_event(&mut session).await,
        SessionEvent::Failed { run_id: None, .. }
    ));
}

#[tokio::test]
async fn derived_payload_is_passed_through_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let module = stub_module(
        dir.path(),
        "stub.sh",
        "echo \"payload=$SPARRING_MODULE_PAYLOAD\"\necho \"bestmove e2e4\"",
    );
    std::fs::write(module.with_extension("bin"), b"weights").unwrap();

    let mut session = EngineSession::new();
    session.start(ModuleLocators::new(&module)).await.unwrap();
    assert!(matches!(next_event(&mut session).await, SessionEvent::Ready));
    session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap();

    let (lines, _) = run_to_completion(&mut session).await;
    assert!(lines.iter().any(|l| l.starts_with("payload=") && l.ends_with("stub.bin")));
}

#[tokio::test]
async fn crash_mid_run_marks_session_errored() {
    let dir = tempfile::tempdir().unwrap();
    let module = stub_module(dir.path(), "stub.sh", "echo \"thinking\"\nexit 3");

    let mut session = EngineSession::new();
    session.start(ModuleLocators::new(&module)).await.unwrap();
    assert!(matches!(next_event(&mut session).await, SessionEvent::Ready));
    let run_id = session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap();

    let (lines, terminal) = run_to_completion(&mut session).await;
    assert_eq!(lines, vec!["thinking".to_string()]);
    let SessionEvent::Failed { run_id: failed_id, error } = terminal else {
        panic!("expected a failed run, got {terminal:?}");
    };
    assert_eq!(failed_id, Some(run_id));
    assert!(error.contains("exited abnormally"));
    assert_eq!(session.state(), SessionState::Errored);

    // a compromised worker refuses further searches until restarted
    let err = session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotReady(SessionState::Errored)));
}

#[tokio::test]
async fn run_requires_ready_state() {
    let mut session = EngineSession::new();
    let err = session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::NotReady(SessionState::Uninitialized)
    ));
}

#[tokio::test]
async fn overlapping_runs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let module = stub_module(dir.path(), "stub.sh", "sleep 2\necho \"bestmove e2e4\"");

    let mut session = EngineSession::new();
    session.start(ModuleLocators::new(&module)).await.unwrap();
    assert!(matches!(next_event(&mut session).await, SessionEvent::Ready));

    let run_id = session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap();
    let err = session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::SearchInFlight(id) if id == run_id));
}

#[tokio::test]
async fn restart_supersedes_previous_worker() {
    let dir = tempfile::tempdir().unwrap();
    let slow = stub_module(dir.path(), "slow.sh", "sleep 30\necho \"bestmove a2a3\"");
    let fast = stub_module(dir.path(), "fast.sh", "echo \"bestmove e2e4\"");

    let mut session = EngineSession::new();
    session.start(ModuleLocators::new(&slow)).await.unwrap();
    assert!(matches!(next_event(&mut session).await, SessionEvent::Ready));
    let stale_run = session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap();

    // supersede the slow worker while its run is still in flight
    session.start(ModuleLocators::new(&fast)).await.unwrap();
    assert_eq!(session.pending_run(), None);
    assert!(matches!(next_event(&mut session).await, SessionEvent::Ready));

    let run_id = session
        .run(SearchRequest {
            position: "startpos".to_string(),
            depth: 1,
        })
        .await
        .unwrap();
    assert!(run_id > stale_run);

    let (_, terminal) = run_to_completion(&mut session).await;
    let SessionEvent::Finished { run_id: done_id, output } = terminal else {
        panic!("expected the fast worker's result, got {terminal:?}");
    };
    assert_eq!(done_id, run_id);
    assert!(output.contains("bestmove e2e4"));

    // nothing from the superseded worker ever surfaces
    assert!(session.try_recv_event().is_none());
}

#[tokio::test]
async fn dispose_then_start_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let module = stub_module(dir.path(), "stub.sh", "echo \"bestmove e2e4\"");

    let mut session = EngineSession::new();
    session.dispose();
    session.dispose();
    assert_eq!(session.state(), SessionState::Uninitialized);

    session.start(ModuleLocators::new(&module)).await.unwrap();
    session.start(ModuleLocators::new(&module)).await.unwrap();
    assert!(matches!(next_event(&mut session).await, SessionEvent::Ready));

    session.dispose();
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert!(session.try_recv_event().is_none());
}
