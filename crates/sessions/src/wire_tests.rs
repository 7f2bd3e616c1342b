// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::{Request, Response};

#[tokio::test]
async fn round_trips_over_a_duplex_pipe() {
    let (mut a, mut b) = tokio::io::duplex(4096);
    let request = Request::Exec {
        command: "echo hi".to_string(),
        timeout_ms: Some(1000),
    };

    let data = encode(&request).unwrap();
    write_message(&mut a, &data).await.unwrap();

    let bytes = read_message(&mut b).await.unwrap();
    let decoded: Request = decode(&bytes).unwrap();

    assert_eq!(decoded, request);
}

#[tokio::test]
async fn framed_helpers_round_trip() {
    let (mut a, mut b) = tokio::io::duplex(4096);
    let response = Response::Data {
        data: "hi\n".to_string(),
    };

    write_framed(&mut a, &response, DEFAULT_IPC_TIMEOUT)
        .await
        .unwrap();
    let decoded: Response = read_framed(&mut b, DEFAULT_IPC_TIMEOUT).await.unwrap();

    assert_eq!(decoded, response);
}

#[tokio::test]
async fn closed_peer_reports_connection_closed() {
    let (a, mut b) = tokio::io::duplex(4096);
    drop(a);

    let err = read_message(&mut b).await.unwrap_err();

    assert!(matches!(err, WireError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let (mut a, mut b) = tokio::io::duplex(4096);
    let len = (MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
    tokio::io::AsyncWriteExt::write_all(&mut a, &len).await.unwrap();

    let err = read_message(&mut b).await.unwrap_err();

    assert!(matches!(err, WireError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn read_timeout_surfaces() {
    let (_a, mut b) = tokio::io::duplex(4096);

    let result: Result<Request, WireError> =
        read_framed(&mut b, std::time::Duration::from_millis(20)).await;

    assert!(matches!(result, Err(WireError::Timeout)));
}
