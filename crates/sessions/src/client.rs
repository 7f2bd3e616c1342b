// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-operation requests to holder sockets.
//!
//! Every operation opens a fresh connection: holders are single-threaded and
//! connections are cheap next to the work they carry.

use crate::protocol::{Request, Response};
use crate::wire::{self, WireError};
use crate::SessionError;
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;

/// One request/response round trip over a fresh connection.
pub async fn request(
    socket_path: &Path,
    req: &Request,
    timeout: Duration,
) -> Result<Response, SessionError> {
    let mut stream = tokio::time::timeout(timeout, UnixStream::connect(socket_path))
        .await
        .map_err(|_| SessionError::Wire(WireError::Timeout))?
        .map_err(SessionError::Io)?;

    wire::write_framed(&mut stream, req, timeout).await?;
    let response: Response = wire::read_framed(&mut stream, timeout).await?;
    Ok(response)
}

/// True when the holder answers a ping within `deadline`.
pub async fn ping(socket_path: &Path, deadline: Duration) -> bool {
    matches!(
        request(socket_path, &Request::Ping, deadline).await,
        Ok(Response::Pong)
    )
}
