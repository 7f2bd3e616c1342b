// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-loop specs: the hello-world scenario, tamper detection, resume.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn hello_world_single_tool() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[
        r#"{"content":"greeting","tool_calls":[{"call_id":"call_1","name":"say_hello"}]}"#,
        r#"{"content":"done"}"#,
    ]);

    let output = world.run(&["--task", "greet"]);
    assert_exit(&output, 0);

    assert_eq!(
        world.journal_kinds(),
        vec![
            "RUN_START",
            "USER_MESSAGE",
            "THOUGHT",
            "ACTION_REQUEST",
            "ACTION_RESULT",
            "THOUGHT",
            "RUN_END",
        ]
    );

    let values = world.journal_values();
    assert_eq!(values[4]["payload"]["stdout"], "hello, world\n");
    assert_eq!(values[4]["payload"]["exit_code"], 0);
    assert_eq!(values[6]["payload"]["status"], "completed");
    assert_eq!(world.metadata()["status"], "completed");

    // Sequence numbers are contiguous from 1 in file order.
    for (i, value) in values.iter().enumerate() {
        assert_eq!(value["seq"].as_u64().unwrap(), i as u64 + 1);
    }
}

#[test]
fn deterministic_replies_produce_identical_journals() {
    let script = &[
        r#"{"content":"greeting","tool_calls":[{"call_id":"call_1","name":"say_hello"}]}"#,
        r#"{"content":"done"}"#,
    ];

    let journals: Vec<Vec<serde_json::Value>> = (0..2)
        .map(|_| {
            let world = World::new(HELLO_AGENT);
            world.script_lines(script);
            assert_exit(&world.run(&["--task", "greet"]), 0);
            world
                .journal_values()
                .into_iter()
                .map(|mut v| {
                    // Timestamps, run ids, paths, and durations differ per
                    // run; event content must not.
                    v.as_object_mut().unwrap().remove("timestamp");
                    if let Some(payload) = v["payload"].as_object_mut() {
                        payload.remove("run_id");
                        payload.remove("agent_path");
                        payload.remove("duration_ms");
                    }
                    v
                })
                .collect()
        })
        .collect();

    assert_eq!(journals[0], journals[1]);
}

#[test]
fn journal_tamper_array_rewrite_is_fatal() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[
        r#"{"content":"ask","tool_calls":[{"call_id":"call_1","name":"ask_human","arguments":{"prompt":"key?"}}]}"#,
    ]);

    // Park the run so there is something to resume.
    assert_exit(&world.run(&["--task", "go"]), 101);

    // An external tool "helpfully" rewrites the journal as a JSON array.
    let journal = world.journal_path();
    std::fs::write(&journal, "[\n  {\"seq\": 1}\n]\n").unwrap();
    let before = std::fs::read_to_string(&journal).unwrap();

    let output = world.run(&["--resume"]);
    assert_exit(&output, 1);
    assert!(
        stderr_of(&output).contains("array"),
        "stderr: {}",
        stderr_of(&output)
    );

    // No events were appended to the tampered file.
    assert_eq!(std::fs::read_to_string(&journal).unwrap(), before);
}

#[test]
fn crash_resume_continues_the_event_sequence() {
    let world = World::new(HELLO_AGENT);

    // Hand-build the state a crash would leave: a completed first action
    // with no following THOUGHT, and LATEST pointing at the run.
    let run_id = "20260101T000000000_abc123";
    let run_dir = world.workspace.join(".delta/runs").join(run_id);
    std::fs::create_dir_all(run_dir.join("io/invocations")).unwrap();
    std::fs::create_dir_all(run_dir.join("io/tool_executions")).unwrap();
    let journal = [
        r#"{"seq":1,"timestamp":"2026-01-01T00:00:00.000Z","type":"RUN_START","payload":{"run_id":"20260101T000000000_abc123","agent_path":"agent","task":"greet","config_hash":""}}"#,
        r#"{"seq":2,"timestamp":"2026-01-01T00:00:00.100Z","type":"USER_MESSAGE","payload":{"content":"greet"}}"#,
        r#"{"seq":3,"timestamp":"2026-01-01T00:00:00.200Z","type":"THOUGHT","payload":{"content":"greeting","tool_calls":[{"call_id":"call_1","name":"say_hello"}]}}"#,
        r#"{"seq":4,"timestamp":"2026-01-01T00:00:00.300Z","type":"ACTION_REQUEST","payload":{"call_id":"call_1","tool":"say_hello"}}"#,
        r#"{"seq":5,"timestamp":"2026-01-01T00:00:00.400Z","type":"ACTION_RESULT","payload":{"call_id":"call_1","exit_code":0,"stdout":"hello, world\n","stderr":"","duration_ms":3}}"#,
    ];
    std::fs::write(
        run_dir.join("journal.jsonl"),
        format!("{}\n", journal.join("\n")),
    )
    .unwrap();
    std::fs::write(
        run_dir.join("metadata.json"),
        format!(
            r#"{{"run_id":"{run_id}","agent_path":"agent","status":"running","config_hash":"","created_at":"2026-01-01T00:00:00.000Z","updated_at":"2026-01-01T00:00:00.000Z"}}"#
        ),
    )
    .unwrap();
    std::fs::write(world.workspace.join(".delta/LATEST"), run_id).unwrap();

    // Iteration 1 maps to the second replay line.
    world.script_lines(&[r#"{"content":"unused"}"#, r#"{"content":"all done"}"#]);

    assert_exit(&world.run(&["--resume"]), 0);

    let values = world.journal_values();
    assert_eq!(values[5]["seq"], 6);
    assert_eq!(values[5]["type"], "THOUGHT");
    assert_eq!(values.last().unwrap()["type"], "RUN_END");
    assert_eq!(values.last().unwrap()["payload"]["status"], "completed");
}

#[test]
fn resume_after_completion_appends_nothing() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[r#"{"content":"done"}"#]);
    assert_exit(&world.run(&["--task", "go"]), 0);

    let before = std::fs::read_to_string(world.journal_path()).unwrap();
    assert_exit(&world.run(&["--resume"]), 0);
    let after = std::fs::read_to_string(world.journal_path()).unwrap();

    assert_eq!(before, after);
}

#[test]
fn iteration_cap_fails_the_run_with_max_iterations() {
    let world = World::new(
        r#"
name: looper
max_iterations: 2
tools:
  - name: say_hello
    command: ["echo", "hi"]
"#,
    );
    world.script_lines(&[
        r#"{"content":"again","tool_calls":[{"call_id":"call_1","name":"say_hello"}]}"#,
        r#"{"content":"again","tool_calls":[{"call_id":"call_2","name":"say_hello"}]}"#,
        r#"{"content":"never reached"}"#,
    ]);

    let output = world.run(&["--task", "loop"]);
    assert_exit(&output, 1);
    assert!(stderr_of(&output).contains("max_iterations"));

    let values = world.journal_values();
    let end = values.last().unwrap();
    assert_eq!(end["type"], "RUN_END");
    assert_eq!(end["payload"]["status"], "failed");
    assert_eq!(end["payload"]["error"], "max_iterations");
}

#[test]
fn latest_always_names_a_valid_run() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[r#"{"content":"done"}"#]);

    assert_exit(&world.run(&["--task", "go"]), 0);

    let run_dir = world.latest_run_dir();
    assert!(run_dir.is_dir());
    assert!(run_dir.join("journal.jsonl").is_file());
    assert!(run_dir.join("metadata.json").is_file());
    assert!(run_dir.join("io/invocations").is_dir());
    assert!(run_dir.join("io/tool_executions").is_dir());
}

#[test]
fn tool_audit_exists_for_every_action_result() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[
        r#"{"content":"greeting","tool_calls":[{"call_id":"call_1","name":"say_hello"}]}"#,
        r#"{"content":"done"}"#,
    ]);

    assert_exit(&world.run(&["--task", "greet"]), 0);

    let audit = world
        .latest_run_dir()
        .join("io/tool_executions/0001_say_hello.json");
    assert!(audit.is_file());
    let record: serde_json::Value =
        serde_json::from_slice(&std::fs::read(audit).unwrap()).unwrap();
    assert_eq!(record["stdout"], "hello, world\n");
    assert_eq!(record["argv"][0], "echo");
}

#[test]
fn second_engine_loop_on_the_same_workspace_is_refused() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[
        r#"{"content":"wait","tool_calls":[{"call_id":"call_1","name":"say_hello"}]}"#,
        r#"{"content":"done"}"#,
    ]);

    // Hold the lock the way a concurrent engine would.
    let lock_path = world.workspace.join(".delta/engine.lock");
    std::fs::create_dir_all(lock_path.parent().unwrap()).unwrap();
    let lock_file = std::fs::File::create(&lock_path).unwrap();
    fs2::FileExt::try_lock_exclusive(&lock_file).unwrap();

    let output = world.run(&["--task", "go"]);
    assert_exit(&output, 1);
    assert!(stderr_of(&output).contains("lock"));
}
