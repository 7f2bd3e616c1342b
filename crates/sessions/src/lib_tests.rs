// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use delta_core::SessionId;
use serial_test::serial;

#[test]
#[serial]
fn socket_path_uses_short_prefix() {
    std::env::remove_var("TMPDIR");
    let path = socket_path_for(&SessionId::new("sess_a1b2c3d4")).unwrap();

    assert_eq!(path, Path::new("/tmp/delta-sock-a1b2c3d4.sock"));
}

#[test]
fn overlong_socket_path_is_rejected_with_diagnostic() {
    let long = PathBuf::from(format!("/tmp/{}.sock", "x".repeat(120)));

    let err = validate_socket_path(&long).unwrap_err();

    match &err {
        SessionError::SocketPathTooLong { len, .. } => assert!(*len >= MAX_SOCKET_PATH),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("104"));
}

#[test]
#[serial]
fn overlong_tmpdir_fails_at_creation() {
    std::env::set_var("TMPDIR", format!("/tmp/{}", "d".repeat(110)));
    let result = socket_path_for(&SessionId::new("sess_a1b2c3d4"));
    std::env::remove_var("TMPDIR");

    assert!(matches!(
        result,
        Err(SessionError::SocketPathTooLong { .. })
    ));
}

#[test]
fn short_paths_pass_validation() {
    assert!(validate_socket_path(Path::new("/tmp/delta-sock-abc.sock")).is_ok());
}
