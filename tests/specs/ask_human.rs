// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async ask-human specs: park on 101, resume from the response file.

use crate::prelude::*;
use similar_asserts::assert_eq;

const ASK_SCRIPT: &str =
    r#"{"content":"need the key","tool_calls":[{"call_id":"call_1","name":"ask_human","arguments":{"prompt":"key?"}}]}"#;

#[test]
fn async_ask_human_full_cycle() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[ASK_SCRIPT, r#"{"content":"thanks"}"#]);

    // First invocation parks the run with the reserved exit code.
    let output = world.run(&["--task", "go"]);
    assert_exit(&output, 101);
    assert_eq!(world.metadata()["status"], "waiting-for-input");

    let request_path = world.latest_run_dir().join("interaction/request.json");
    let request: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&request_path).unwrap()).unwrap();
    assert_eq!(request["prompt"], "key?");
    assert_eq!(
        world.journal_kinds().last().map(String::as_str),
        Some("INTERACTION_REQUESTED")
    );

    // Resuming without an answer stays parked.
    assert_exit(&world.run(&["--resume"]), 101);

    // Provide the answer and resume again.
    std::fs::write(world.response_path(), "abc\n").unwrap();
    assert_exit(&world.run(&["--resume"]), 0);

    let kinds = world.journal_kinds();
    assert!(kinds.contains(&"INTERACTION_RESOLVED".to_string()));

    let values = world.journal_values();
    let answer = values
        .iter()
        .find(|v| v["type"] == "ACTION_RESULT")
        .unwrap();
    assert_eq!(answer["payload"]["stdout"], "abc");
    assert_eq!(answer["payload"]["call_id"], "call_1");

    // Interaction files are consumed and the run finishes cleanly.
    assert!(!world.latest_run_dir().join("interaction").exists());
    assert_eq!(world.metadata()["status"], "completed");
}

#[test]
fn sync_mode_with_assume_yes_answers_confirmations() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[
        r#"{"content":"confirm","tool_calls":[{"call_id":"call_1","name":"ask_human","arguments":{"prompt":"continue?","input_type":"confirmation"}}]}"#,
        r#"{"content":"done"}"#,
    ]);

    let output = world.run(&["--task", "go", "-i", "-y"]);
    assert_exit(&output, 0);

    let values = world.journal_values();
    let answer = values
        .iter()
        .find(|v| v["type"] == "ACTION_RESULT")
        .unwrap();
    assert_eq!(answer["payload"]["stdout"], "yes");

    // Sync mode is observationally identical: no interaction files, no
    // INTERACTION_* events.
    assert!(!world.latest_run_dir().join("interaction").exists());
    assert!(!world
        .journal_kinds()
        .contains(&"INTERACTION_REQUESTED".to_string()));
}
