//! End-to-end tests for the Cadence CLI and runtime.
//!
//! The binary tests run `cadence` against a throwaway project directory with
//! `CADENCE_HOME` pointed inside it, so nothing touches the real workspace.

use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use std::time::Duration;

use cadence_config::AppConfig;
use cadence_core::{DispatchContext, DispatchStatus, EventInput, EventKind, HookBinding};
use cadence_engine::Runtime;
use cadence_hooks::{CallbackExecutable, HookRegistry};

// ── Helpers ──────────────────────────────────────────────────────────────

fn cadence(project: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cadence"))
        .args(args)
        .current_dir(project)
        .env("CADENCE_HOME", project.join(".cadence"))
        .env("RUST_LOG", "warn")
        .env_remove("CADENCE_CONFIDENCE_THRESHOLD")
        .env_remove("CADENCE_MAX_CONCURRENT")
        .env_remove("CADENCE_SENSITIVITY")
        .env_remove("CADENCE_STATE_DIR")
        .output()
        .expect("cadence binary runs")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "cadence failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn research_then_edit(rounds: usize) -> String {
    let mut lines = Vec::new();
    for i in 0..rounds {
        lines.push(format!(r#"{{"kind":"Read","subject":"src/mod_{i}.rs"}}"#));
        lines.push(format!(r#"{{"kind":"Edit","subject":"src/mod_{i}.rs"}}"#));
    }
    lines.push(r#"{"kind":"Read","subject":"src/main.rs"}"#.to_string());
    lines.join("\n")
}

fn write_config(project: &Path, body: &str) {
    let dir = project.join(".cadence");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), body).unwrap();
}

// ── CLI ──────────────────────────────────────────────────────────────────

#[test]
fn init_writes_loadable_config_once() {
    let project = tempfile::tempdir().unwrap();

    let first = cadence(project.path(), &["init"]);
    assert!(first.status.success());
    let path = project.path().join(".cadence/config.toml");
    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.hooks.bindings.len(), 3);

    let second = cadence(project.path(), &["init"]);
    assert!(!second.status.success());

    let forced = cadence(project.path(), &["init", "--force"]);
    assert!(forced.status.success());
}

#[test]
fn status_on_empty_project_is_cold() {
    let project = tempfile::tempdir().unwrap();
    let status = stdout_json(&cadence(project.path(), &["--json", "status"]));
    assert_eq!(status["config_exists"], false);
    assert_eq!(status["snapshots"], 0);
    assert!(status["latest"].is_null());
}

#[test]
fn ingest_learns_and_later_commands_see_it() {
    let project = tempfile::tempdir().unwrap();
    // No bindings: learning only
    write_config(project.path(), "[learning]\nconfidence_threshold = 0.9\n");
    let events = project.path().join("events.jsonl");
    std::fs::write(&events, research_then_edit(3)).unwrap();

    let output = cadence(
        project.path(),
        &["--json", "ingest", "--file", events.to_str().unwrap()],
    );
    assert!(output.status.success());
    // One JSON report per event, then the summary
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().next().unwrap().contains("\"decision\""));

    let patterns = stdout_json(&cadence(project.path(), &["--json", "patterns"]));
    let patterns = patterns.as_array().unwrap();
    assert!(
        patterns
            .iter()
            .any(|p| p["signature"] == serde_json::json!(["Read", "Edit"]) && p["occurrences"] == 3)
    );

    let predicted = stdout_json(&cadence(project.path(), &["--json", "predict", "Read"]));
    assert_eq!(predicted["prediction"]["kind"], "Edit");

    let relevant = stdout_json(&cadence(project.path(), &["--json", "relevant", "-k", "2"]));
    let relevant = relevant.as_array().unwrap();
    assert_eq!(relevant.len(), 2);
    // Touched twice and most recently
    assert_eq!(relevant[0]["subject"], "src/mod_2.rs");

    let status = stdout_json(&cadence(project.path(), &["--json", "status"]));
    assert_eq!(status["snapshots"], 1);
}

#[test]
fn malformed_lines_are_skipped() {
    let project = tempfile::tempdir().unwrap();
    let events = project.path().join("events.jsonl");
    std::fs::write(
        &events,
        "{\"kind\":\"Read\",\"subject\":\"a.rs\"}\nnot json\n\n# comment\n{\"kind\":\"Edit\",\"subject\":\"a.rs\"}\n",
    )
    .unwrap();

    let output = cadence(project.path(), &["ingest", "--file", events.to_str().unwrap()]);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("2 (1 rejected)"), "unexpected summary: {text}");
}

#[cfg(unix)]
#[test]
fn confident_prediction_runs_shell_hook() {
    let project = tempfile::tempdir().unwrap();
    write_config(
        project.path(),
        r#"
[learning]
confidence_threshold = 0.3

[[hooks.bindings]]
id = "log-edit"
matcher = "Edit"
command = "echo {predicted} {subject} >> hook.log"
"#,
    );
    let events = project.path().join("events.jsonl");
    std::fs::write(&events, research_then_edit(2)).unwrap();

    let output = cadence(project.path(), &["ingest", "--file", events.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let log = std::fs::read_to_string(project.path().join("hook.log")).unwrap();
    assert!(log.lines().any(|l| l == "Edit src/main.rs"), "hook log: {log}");

    let hooks = stdout_json(&cadence(project.path(), &["--json", "hooks"]));
    assert_eq!(hooks[0]["id"], "log-edit");
}

#[test]
fn prune_keeps_max_snapshots() {
    let project = tempfile::tempdir().unwrap();
    write_config(project.path(), "[state]\nmax_snapshots = 2\n");
    let events = project.path().join("events.jsonl");
    std::fs::write(&events, research_then_edit(1)).unwrap();

    for _ in 0..5 {
        let out = cadence(project.path(), &["ingest", "--file", events.to_str().unwrap()]);
        assert!(out.status.success());
    }
    // Every ingest applies retention after its final snapshot
    let status = stdout_json(&cadence(project.path(), &["--json", "status"]));
    assert_eq!(status["snapshots"], 2);

    let pruned = stdout_json(&cadence(project.path(), &["--json", "prune"]));
    assert!(pruned["deleted"].as_array().unwrap().is_empty());
}

#[test]
fn prune_trims_snapshots_left_by_a_looser_limit() {
    let project = tempfile::tempdir().unwrap();
    let events = project.path().join("events.jsonl");
    std::fs::write(&events, research_then_edit(1)).unwrap();

    for _ in 0..3 {
        let out = cadence(project.path(), &["ingest", "--file", events.to_str().unwrap()]);
        assert!(out.status.success());
    }
    write_config(project.path(), "[state]\nmax_snapshots = 2\n");
    let pruned = stdout_json(&cadence(project.path(), &["--json", "prune"]));
    assert_eq!(pruned["deleted"].as_array().unwrap().len(), 1);

    let status = stdout_json(&cadence(project.path(), &["--json", "status"]));
    assert_eq!(status["snapshots"], 2);
}

// ── Runtime ──────────────────────────────────────────────────────────────

fn runtime_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.state.dir = Some(dir.join("state"));
    config.hooks.project_root = Some(dir.to_path_buf());
    config.learning.confidence_threshold = 0.3;
    config
}

#[tokio::test]
async fn failing_hook_does_not_stop_learning() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = HookRegistry::new();
    registry
        .register(
            HookBinding {
                id: "broken".into(),
                matcher: "Edit".into(),
                command: String::new(),
                timeout_ms: None,
                enabled: true,
                description: String::new(),
            },
            Arc::new(CallbackExecutable::new("broken", |_ctx: DispatchContext| async {
                Err(cadence_core::HookError::ExecutionFailed {
                    binding: "broken".into(),
                    reason: "boom".into(),
                })
            })),
        )
        .unwrap();
    let runtime = Runtime::new(runtime_config(dir.path()), registry);

    for _ in 0..4 {
        runtime.ingest(EventInput::new(EventKind::Read, "a.rs"));
        runtime.ingest(EventInput::new(EventKind::Edit, "a.rs"));
    }
    assert!(runtime.wait_idle(Duration::from_secs(5)).await);
    runtime.shutdown().await;

    let stats = runtime.stats();
    assert_eq!(stats.events_ingested, 8);
    assert!(stats.dispatches_requested > 0);
    assert_eq!(stats.outcomes.failure, stats.dispatches_requested);
    assert!(
        runtime
            .recent_outcomes(1)
            .iter()
            .all(|o| o.status == DispatchStatus::Failure)
    );
    assert!(!runtime.current_patterns().is_empty());
}

#[tokio::test]
async fn unknown_kinds_are_learned_as_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Runtime::new(runtime_config(dir.path()), HookRegistry::new());
    for _ in 0..3 {
        runtime.ingest(EventInput::new("Bash", "cargo test"));
        runtime.ingest(EventInput::new(EventKind::Edit, "src/lib.rs"));
    }
    let prediction = runtime.predict_for(&[EventKind::from("Bash")]).unwrap();
    assert_eq!(prediction.kind, EventKind::Edit);
    runtime.shutdown().await;
}
