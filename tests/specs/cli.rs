// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface specs: exit codes and error reporting.

use crate::prelude::*;

#[test]
fn help_lists_the_subcommands() {
    let output = delta_cmd().arg("--help").output().unwrap();

    assert_exit(&output, 0);
    let help = stdout_of(&output);
    assert!(help.contains("run"));
    assert!(help.contains("session"));
}

#[test]
fn missing_agent_config_is_a_startup_failure() {
    let world = World::new(HELLO_AGENT);
    std::fs::remove_file(world.agent_dir.join("agent.yaml")).unwrap();
    world.script_lines(&[r#"{"content":"done"}"#]);

    let output = world.run(&["--task", "go"]);

    assert_exit(&output, 1);
    assert!(stderr_of(&output).contains("agent.yaml"));
}

#[test]
fn invalid_tool_definition_is_fatal_at_startup() {
    let world = World::new(
        r#"
name: broken
tools:
  - name: t
    command: ["true"]
    parameters:
      - name: n
        type: integer
"#,
    );
    world.script_lines(&[r#"{"content":"done"}"#]);

    let output = world.run(&["--task", "go"]);

    assert_exit(&output, 1);
    assert!(stderr_of(&output).contains("string"));
    // Nothing was created that could mislead a later resume.
    let output = world.run(&["--resume"]);
    assert_exit(&output, 1);
}

#[test]
fn missing_llm_transport_is_reported() {
    let world = World::new(HELLO_AGENT);

    let mut cmd = std::process::Command::new(delta_binary());
    cmd.arg("run")
        .arg("--agent")
        .arg(&world.agent_dir)
        .arg("--work-dir")
        .arg(&world.workspace)
        .arg("--task")
        .arg("go")
        .env_remove("DELTA_LLM");

    let output = cmd.output().unwrap();
    assert_exit(&output, 1);
    assert!(stderr_of(&output).contains("DELTA_LLM"));
}

#[test]
fn resume_with_no_runs_is_an_error() {
    let world = World::new(HELLO_AGENT);
    world.script_lines(&[r#"{"content":"done"}"#]);

    let output = world.run(&["--resume"]);

    assert_exit(&output, 1);
    assert!(stderr_of(&output).contains("no runs"));
}

#[test]
fn transport_failure_exits_one_with_failed_status() {
    let world = World::new(HELLO_AGENT);
    // Empty script: the first completion request already fails.
    world.script_lines(&[]);

    let output = world.run(&["--task", "go"]);

    assert_exit(&output, 1);
    assert_eq!(world.metadata()["status"], "failed");
}
