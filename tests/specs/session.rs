// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session subsystem specs: cross-process persistence is the heart of the
//! contract — the holder must outlive the CLI that spawned it.

use crate::prelude::*;
use serial_test::serial;
use similar_asserts::assert_eq;

fn start_shell(world: &World) -> String {
    let output = world.session(&["start", "sh"]);
    assert_exit(&output, 0);
    let id = stdout_of(&output).trim().to_string();
    assert!(id.starts_with("sess_"), "unexpected session id: {id}");
    id
}

fn end_session(world: &World, id: &str) {
    let _ = world.session(&["end", id]);
}

#[test]
#[serial]
fn session_survives_the_creating_cli_by_ten_seconds() {
    let world = World::new(HELLO_AGENT);

    // Process A starts the session and exits.
    let id = start_shell(&world);

    std::thread::sleep(std::time::Duration::from_secs(10));

    // Process B, a fresh CLI, operates the same session.
    let output = world.session(&["exec", &id, "echo hi"]);
    assert_exit(&output, 0);
    assert_eq!(stdout_of(&output), "hi\n");

    end_session(&world, &id);
}

#[test]
#[serial]
fn exec_preserves_shell_state_across_invocations() {
    let world = World::new(HELLO_AGENT);
    let id = start_shell(&world);

    assert_exit(&world.session(&["exec", &id, "STATE=carried"]), 0);
    let output = world.session(&["exec", &id, "echo $STATE"]);
    assert_exit(&output, 0);
    assert_eq!(stdout_of(&output), "carried\n");

    // Non-zero exit codes propagate.
    let failing = world.session(&["exec", &id, "false"]);
    assert_exit(&failing, 1);

    end_session(&world, &id);
}

#[test]
#[serial]
fn status_reports_holder_and_child() {
    let world = World::new(HELLO_AGENT);
    let id = start_shell(&world);

    let output = world.session(&["status", &id]);
    assert_exit(&output, 0);
    let status: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();

    assert_eq!(status["session_id"], id.as_str());
    assert_eq!(status["alive"], true);
    assert!(status["pid"].as_u64().unwrap() > 0);
    assert!(status["holder_pid"].as_u64().unwrap() > 0);

    // Metadata is user-visible under the workspace.
    let meta_path = world
        .workspace
        .join(".sessions")
        .join(&id)
        .join("metadata.json");
    assert!(meta_path.is_file());
    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(meta_path).unwrap()).unwrap();
    assert_eq!(meta["session_id"], id.as_str());
    assert!(meta["socket_path"]
        .as_str()
        .unwrap()
        .contains("delta-sock-"));

    end_session(&world, &id);
}

#[test]
#[serial]
fn list_and_end_lifecycle() {
    let world = World::new(HELLO_AGENT);
    let id = start_shell(&world);

    let listed = world.session(&["list"]);
    assert!(stdout_of(&listed).contains(&id));

    assert_exit(&world.session(&["end", &id]), 0);

    // Metadata directory is gone; status now fails.
    assert!(!world.workspace.join(".sessions").join(&id).exists());
    let status = world.session(&["status", &id]);
    assert_eq!(status.status.code(), Some(1));
}

#[test]
#[serial]
fn cleanup_removes_stale_sessions() {
    let world = World::new(HELLO_AGENT);

    // Fabricate a session whose holder never existed.
    let stale_dir = world.workspace.join(".sessions/sess_stale01");
    std::fs::create_dir_all(&stale_dir).unwrap();
    std::fs::write(
        stale_dir.join("metadata.json"),
        r#"{"session_id":"sess_stale01","pid":4000000,"holder_pid":4000001,"cwd":"/tmp","command":["sh"],"socket_path":"/tmp/delta-sock-stale01.sock","created_at":"2026-01-01T00:00:00.000Z"}"#,
    )
    .unwrap();

    let output = world.session(&["cleanup"]);
    assert_exit(&output, 0);
    assert!(stdout_of(&output).contains("sess_stale01"));
    assert!(!stale_dir.exists());
}

#[test]
#[serial]
fn write_and_read_drive_a_repl() {
    let world = World::new(HELLO_AGENT);
    let output = world.session(&["start", "cat"]);
    assert_exit(&output, 0);
    let id = stdout_of(&output).trim().to_string();

    assert_exit(&world.session(&["send", &id, "ping\n"]), 0);
    std::thread::sleep(std::time::Duration::from_millis(500));

    let read = world.session(&["read", &id, "--timeout-ms", "2000"]);
    assert_exit(&read, 0);
    assert!(stdout_of(&read).contains("ping"));

    // exec is refused for non-shell sessions with a pointer to write/read.
    let exec = world.session(&["exec", &id, "echo hi"]);
    assert_eq!(exec.status.code(), Some(1));
    assert!(stderr_of(&exec).contains("write/read"));

    end_session(&world, &id);
}

#[test]
fn overlong_socket_path_is_rejected_at_creation() {
    let world = World::new(HELLO_AGENT);
    let deep = world.dir.path().join("t".repeat(110));
    std::fs::create_dir_all(&deep).unwrap();

    let mut cmd = std::process::Command::new(delta_binary());
    cmd.arg("session")
        .arg("--work-dir")
        .arg(&world.workspace)
        .arg("start")
        .arg("sh")
        .env("DELTA_HOLDER_BIN", holder_binary())
        .env("TMPDIR", &deep);

    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("104"), "stderr: {stderr}");
}

#[test]
#[serial]
fn engine_builtins_drive_sessions_end_to_end() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[
        r#"{"content":"open a shell","tool_calls":[{"call_id":"call_1","name":"session_start","arguments":{"command":"sh"}}]}"#,
        r#"{"content":"use it","tool_calls":[{"call_id":"call_2","name":"session_exec","arguments":{"session_id":"SELF","command":"echo from-session"}}]}"#,
        r#"{"content":"done"}"#,
    ]);

    // The canned exec targets a placeholder id and fails as a normal
    // observation; the run still completes on the third reply.
    let output = world.run(&["--task", "use a session"]);
    assert_exit(&output, 0);

    let values = world.journal_values();
    let started = values
        .iter()
        .find(|v| {
            v["type"] == "ACTION_RESULT"
                && v["payload"]["stdout"]
                    .as_str()
                    .unwrap_or_default()
                    .starts_with("sess_")
        })
        .expect("session_start result with a session id");
    let session_id = started["payload"]["stdout"].as_str().unwrap().trim();

    // The real session is alive and operable outside the engine.
    let exec = world.session(&["exec", session_id, "echo still-here"]);
    assert_exit(&exec, 0);
    assert_eq!(stdout_of(&exec), "still-here\n");

    end_session(&world, session_id);
}
