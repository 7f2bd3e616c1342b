// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_are_empty() {
    let hooks = HooksConfig::default();

    assert!(hooks.is_empty());
    assert!(hooks.for_point(LifecyclePoint::PreToolExec).is_empty());
}

#[test]
fn hook_defaults_apply() {
    let yaml = r#"
pre_tool_exec:
  - command: ["scripts/audit.sh"]
"#;
    let hooks: HooksConfig = serde_yaml::from_str(yaml).unwrap();
    let hook = &hooks.for_point(LifecyclePoint::PreToolExec)[0];

    assert_eq!(hook.timeout_ms, DEFAULT_HOOK_TIMEOUT_MS);
    assert_eq!(hook.on_failure, OnFailure::Warn);
}

#[test]
fn abort_policy_parses() {
    let yaml = r#"
on_error:
  - command: ["scripts/panic.sh"]
    timeout_ms: 500
    on_failure: abort
"#;
    let hooks: HooksConfig = serde_yaml::from_str(yaml).unwrap();
    let hook = &hooks.for_point(LifecyclePoint::OnError)[0];

    assert_eq!(hook.timeout_ms, 500);
    assert_eq!(hook.on_failure, OnFailure::Abort);
    assert!(!hooks.is_empty());
}
