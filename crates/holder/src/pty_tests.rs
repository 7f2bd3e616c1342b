// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn sentinel_is_found_with_exit_code() {
    let text = "hello\r\n__delta_done_1_0\r\n";

    let (offset, code) = find_sentinel(text, 1).unwrap();

    assert_eq!(code, 0);
    assert_eq!(&text[..offset], "hello\r\n");
}

#[test]
fn sentinel_with_nonzero_exit_code() {
    let text = "__delta_done_7_42\n";

    let (_, code) = find_sentinel(text, 7).unwrap();

    assert_eq!(code, 42);
}

#[test]
fn echoed_command_does_not_match() {
    // The echoed printf still shows the unexpanded %d.
    let text = "printf '__delta_done_1_%d\\n' $?\r\n";

    assert!(find_sentinel(text, 1).is_none());
}

#[test]
fn echo_then_expansion_matches_the_expansion() {
    let text = "printf '__delta_done_1_%d\\n' $?\r\nout\r\n__delta_done_1_3\r\n";

    let (offset, code) = find_sentinel(text, 1).unwrap();

    assert_eq!(code, 3);
    assert!(text[..offset].ends_with("out\r\n"));
}

#[parameterized(
    wrong_nonce = { "__delta_done_2_0\n", 1 },
    no_digits = { "__delta_done_1_\n", 1 },
    digits_mid_word = { "__delta_done_1_0x\n", 1 },
)]
fn non_matches(text: &str, nonce: u64) {
    assert!(find_sentinel(text, nonce).is_none());
}

#[test]
fn partial_last_line_is_preserved() {
    // Output without a trailing newline runs into the sentinel.
    let text = "no newline__delta_done_1_0\n";

    let (offset, code) = find_sentinel(text, 1).unwrap();

    assert_eq!(code, 0);
    assert_eq!(&text[..offset], "no newline");
}

#[test]
fn clean_output_normalizes_crlf_and_strips_sentinel_lines() {
    let raw = "a\r\nprintf '__delta_done_1_%d\\n' $?\r\nb\r\n";

    assert_eq!(clean_exec_output(raw), "a\nb\n");
}

#[test]
fn scrollback_trims_front_and_keeps_absolute_offsets() {
    let mut sb = Scrollback::new();
    sb.push(&vec![b'a'; SCROLLBACK_CAP]);
    let end_before = sb.end();
    sb.push(b"tail");

    assert_eq!(sb.end(), end_before + 4);
    assert_eq!(sb.slice_from(end_before), b"tail");
    // Front was trimmed to stay within the cap.
    assert!(sb.data.len() <= SCROLLBACK_CAP);
    assert!(sb.base > 0);
}

#[test]
fn scrollback_drain_unread_advances_cursor() {
    let mut sb = Scrollback::new();
    sb.push(b"one");

    assert!(sb.has_unread());
    assert_eq!(sb.drain_unread(), b"one");
    assert!(!sb.has_unread());

    sb.push(b"two");
    assert_eq!(sb.drain_unread(), b"two");
}

#[tokio::test]
async fn exec_runs_commands_in_a_real_shell() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = PtySession::spawn(&["sh".to_string()], dir.path()).unwrap();

    let (stdout, exit_code, _) = session
        .exec("echo hello, world", Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(exit_code, 0);
    assert!(stdout.contains("hello, world"));

    let (_, exit_code, _) = session
        .exec("false", Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(exit_code, 1);

    session.kill();
}

#[tokio::test]
async fn exec_preserves_shell_state_between_calls() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = PtySession::spawn(&["sh".to_string()], dir.path()).unwrap();

    session
        .exec("MARKER=state_survives", Duration::from_secs(10))
        .await
        .unwrap();
    let (stdout, _, _) = session
        .exec("echo $MARKER", Duration::from_secs(10))
        .await
        .unwrap();

    assert!(stdout.contains("state_survives"));
    session.kill();
}

#[tokio::test]
async fn exec_times_out_on_hung_command() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = PtySession::spawn(&["sh".to_string()], dir.path()).unwrap();

    let err = session
        .exec("sleep 30", Duration::from_millis(300))
        .await
        .unwrap_err();

    assert!(matches!(err, PtyError::ExecTimeout(_)));
    session.kill();
}

#[tokio::test]
async fn non_shell_session_rejects_exec() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = PtySession::spawn(&["cat".to_string()], dir.path()).unwrap();

    let err = session
        .exec("anything", Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, PtyError::NotAShell(_)));
    session.kill();
}

#[tokio::test]
async fn write_and_read_round_trip_through_the_pty() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = PtySession::spawn(&["cat".to_string()], dir.path()).unwrap();

    session.write_bytes(b"ping\n").unwrap();
    let output = session.read_output(Duration::from_secs(5)).await;

    // cat echoes through the PTY; expect the text back (possibly twice:
    // terminal echo plus cat itself).
    assert!(output.contains("ping"));
    session.kill();
}

#[test]
fn kill_then_try_wait_reports_exit() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = PtySession::spawn(&["cat".to_string()], dir.path()).unwrap();
    assert!(session.is_alive());

    session.kill();
    // Give the child a moment to die.
    for _ in 0..50 {
        if !session.is_alive() {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    assert!(!session.is_alive());
}

#[test]
fn spawn_empty_command_fails() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        PtySession::spawn(&[], dir.path()),
        Err(PtyError::Spawn { .. })
    ));
}
