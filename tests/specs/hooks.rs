// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle hook specs.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn hook_timeout_is_recorded_and_the_tool_still_runs() {
    let world = World::new(
        r#"
name: hooked
tools:
  - name: say_hello
    command: ["echo", "hello, world"]
hooks:
  pre_tool_exec:
    - command: ["sleep", "10"]
      timeout_ms: 500
"#,
    );
    world.script_lines(&[
        r#"{"content":"go","tool_calls":[{"call_id":"call_1","name":"say_hello"}]}"#,
        r#"{"content":"done"}"#,
    ]);

    let started = std::time::Instant::now();
    let output = world.run(&["--task", "go"]);
    assert_exit(&output, 0);
    // SIGTERM + grace, nowhere near the 10s sleep.
    assert!(started.elapsed() < std::time::Duration::from_secs(8));

    let values = world.journal_values();
    let hook = values
        .iter()
        .find(|v| v["type"] == "HOOK_EXECUTED")
        .unwrap();
    assert_eq!(hook["payload"]["point"], "pre_tool_exec");
    assert_eq!(hook["payload"]["timed_out"], true);

    // Policy is warn: the tool still ran and the run completed.
    let result = values
        .iter()
        .find(|v| v["type"] == "ACTION_RESULT")
        .unwrap();
    assert_eq!(result["payload"]["stdout"], "hello, world\n");
    assert_eq!(world.metadata()["status"], "completed");
}

#[test]
fn abort_hook_fails_the_run() {
    let world = World::new(
        r#"
name: strict
hooks:
  pre_llm_request:
    - command: ["false"]
      on_failure: abort
"#,
    );
    world.script_lines(&[r#"{"content":"never"}"#]);

    let output = world.run(&["--task", "go"]);
    assert_exit(&output, 1);

    let values = world.journal_values();
    assert!(values.iter().any(|v| v["type"] == "HOOK_EXECUTED"));
    let end = values.last().unwrap();
    assert_eq!(end["type"], "RUN_END");
    assert_eq!(end["payload"]["status"], "failed");
    assert_eq!(world.metadata()["status"], "failed");
}

#[test]
fn hook_observes_the_tool_call_payload() {
    let world = World::new(
        r#"
name: observer
tools:
  - name: say_hello
    command: ["echo", "hi"]
hooks:
  pre_tool_exec:
    - command: ["sh", "-c", "cat > observed.json"]
"#,
    );
    world.script_lines(&[
        r#"{"content":"go","tool_calls":[{"call_id":"call_1","name":"say_hello"}]}"#,
        r#"{"content":"done"}"#,
    ]);

    assert_exit(&world.run(&["--task", "go"]), 0);

    let observed: serde_json::Value = serde_json::from_slice(
        &std::fs::read(world.workspace.join("observed.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(observed["tool"], "say_hello");
    assert_eq!(observed["call_id"], "call_1");
}
