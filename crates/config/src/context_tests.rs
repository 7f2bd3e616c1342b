// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn sources_parse_in_declared_order() {
    let yaml = r#"
sources:
  - type: static
    path: system_prompt.md
  - type: computed
    command: ["scripts/fold.sh"]
    output: summary.md
    max_tokens: 2000
  - type: file
    path: NOTES.md
    max_bytes: 4096
  - type: journal_tail
    iterations: 3
"#;
    let config: ContextConfig = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.sources.len(), 4);
    match &config.sources[1] {
        ContextSource::Computed {
            timeout_ms,
            max_tokens,
            on_failure,
            ..
        } => {
            assert_eq!(*timeout_ms, DEFAULT_GENERATOR_TIMEOUT_MS);
            assert_eq!(*max_tokens, Some(2000));
            assert_eq!(*on_failure, SourceFailure::Skip);
        }
        other => panic!("unexpected source: {:?}", other),
    }
    assert_eq!(config.journal_tail_iterations(), Some(3));
}

#[test]
fn file_source_defaults_to_if_exists() {
    let yaml = r#"
sources:
  - type: file
    path: NOTES.md
"#;
    let config: ContextConfig = serde_yaml::from_str(yaml).unwrap();

    match &config.sources[0] {
        ContextSource::File {
            if_exists,
            max_bytes,
            ..
        } => {
            assert!(*if_exists);
            assert!(max_bytes.is_none());
        }
        other => panic!("unexpected source: {:?}", other),
    }
}

#[test]
fn fatal_on_failure_parses() {
    let yaml = r#"
sources:
  - type: computed
    command: ["gen"]
    output: out.md
    on_failure: fatal
"#;
    let config: ContextConfig = serde_yaml::from_str(yaml).unwrap();

    match &config.sources[0] {
        ContextSource::Computed { on_failure, .. } => {
            assert_eq!(*on_failure, SourceFailure::Fatal)
        }
        other => panic!("unexpected source: {:?}", other),
    }
}
