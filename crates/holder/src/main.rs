// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delta session holder (deltah)
//!
//! Detached daemon that owns one interactive session: the child process, its
//! pseudo-terminal, and the UNIX control socket. The CLI that spawned it
//! exits immediately; this process stays until the session ends, so the
//! child never sees a SIGHUP from a closing CLI.
//!
//! The holder is typically started by `delta session start` and should not
//! be invoked directly.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod pty;

use delta_core::SessionId;
use delta_sessions::{
    read_message, write_message, ExecReply, Request, Response, SessionMeta, SessionStatus,
    SessionStore,
};
use pty::{PtySession, DEFAULT_EXEC_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// Parsed command line.
struct Args {
    session_id: SessionId,
    socket_path: PathBuf,
    sessions_dir: PathBuf,
    cwd: PathBuf,
    command: Vec<String>,
}

fn usage() -> ! {
    eprintln!(
        "Usage: deltah --session-id <id> --socket <path> --sessions-dir <dir> --cwd <dir> -- <command> [args...]"
    );
    eprintln!();
    eprintln!("The holder is started by `delta session start` and should not");
    eprintln!("be invoked directly.");
    std::process::exit(1);
}

fn parse_args() -> Args {
    let mut session_id = None;
    let mut socket_path = None;
    let mut sessions_dir = None;
    let mut cwd = None;
    let mut command = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--session-id" => session_id = args.next().map(SessionId::new),
            "--socket" => socket_path = args.next().map(PathBuf::from),
            "--sessions-dir" => sessions_dir = args.next().map(PathBuf::from),
            "--cwd" => cwd = args.next().map(PathBuf::from),
            "--" => {
                command = args.collect();
                break;
            }
            "--help" | "-h" => usage(),
            other => {
                eprintln!("error: unexpected argument '{other}'");
                usage();
            }
        }
    }

    match (session_id, socket_path, sessions_dir, cwd) {
        (Some(session_id), Some(socket_path), Some(sessions_dir), Some(cwd))
            if !command.is_empty() =>
        {
            Args {
                session_id,
                socket_path,
                sessions_dir,
                cwd,
                command,
            }
        }
        _ => usage(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = parse_args();
    let store = SessionStore::new(&args.sessions_dir);

    let _log_guard = match setup_logging(&store, &args.session_id) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("deltah: failed to set up logging: {e}");
            None
        }
    };

    if let Err(e) = delta_sessions::validate_socket_path(&args.socket_path) {
        error!("refusing to start: {e}");
        std::process::exit(1);
    }

    let mut session = match PtySession::spawn(&args.command, &args.cwd) {
        Ok(session) => session,
        Err(e) => {
            error!("failed to spawn session child: {e}");
            std::process::exit(1);
        }
    };

    // Metadata goes to disk before the socket opens; once a ping succeeds
    // the record is guaranteed readable.
    let meta = SessionMeta {
        session_id: args.session_id.clone(),
        pid: session.child_pid().unwrap_or(0),
        holder_pid: std::process::id(),
        cwd: args.cwd.clone(),
        command: args.command.clone(),
        socket_path: args.socket_path.clone(),
        created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    };
    if let Err(e) = store.save(&meta) {
        error!("failed to write session metadata: {e}");
        session.kill();
        std::process::exit(1);
    }

    // A stale socket from a crashed holder would block the bind.
    let _ = std::fs::remove_file(&args.socket_path);
    let listener = match UnixListener::bind(&args.socket_path) {
        Ok(listener) => listener,
        Err(e) => {
            error!(
                "failed to bind control socket {}: {e}",
                args.socket_path.display()
            );
            session.kill();
            std::process::exit(1);
        }
    };

    info!(
        session = %args.session_id,
        child_pid = meta.pid,
        socket = %args.socket_path.display(),
        "session holder ready"
    );

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {e}");
            session.kill();
            std::process::exit(1);
        }
    };

    // Serve one connection at a time; the session is inherently serial.
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let shutdown = serve(stream, &meta, &mut session, &store).await;
                        if shutdown {
                            break;
                        }
                    }
                    Err(e) => warn!("accept failed: {e}"),
                }
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, ending session");
                break;
            }
        }
    }

    session.kill();
    let _ = std::fs::remove_file(&args.socket_path);
    info!(session = %args.session_id, "session holder stopped");
}

/// Handle one connection: one request, one response.
///
/// Returns true when the request asked the holder to shut down.
async fn serve(
    mut stream: UnixStream,
    meta: &SessionMeta,
    session: &mut PtySession,
    store: &SessionStore,
) -> bool {
    let request = match read_message(&mut stream).await {
        Ok(bytes) => match serde_json::from_slice::<Request>(&bytes) {
            Ok(request) => request,
            Err(e) => {
                respond(
                    &mut stream,
                    &Response::Error {
                        kind: "bad_request".to_string(),
                        message: e.to_string(),
                    },
                )
                .await;
                return false;
            }
        },
        Err(e) => {
            warn!("failed to read request: {e}");
            return false;
        }
    };

    let mut shutdown = false;
    let response = match request {
        Request::Ping => Response::Pong,

        Request::Exec {
            command,
            timeout_ms,
        } => {
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_EXEC_TIMEOUT);
            let _ = store.append_history(
                &meta.session_id,
                &format!("exec: {}", command.trim_end()),
            );
            match session.exec(&command, timeout).await {
                Ok((stdout, exit_code, duration_ms)) => Response::Exec(ExecReply {
                    stdout,
                    stderr: String::new(),
                    exit_code,
                    duration_ms,
                }),
                Err(e) => error_response(&e),
            }
        }

        Request::Write { data } => match session.write_bytes(data.as_bytes()) {
            Ok(()) => Response::Ok,
            Err(e) => error_response(&e),
        },

        Request::Read { timeout_ms } => {
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(100));
            let data = session.read_output(timeout).await;
            Response::Data { data }
        }

        Request::Status => {
            let exit_code = session.try_wait();
            Response::Status(SessionStatus {
                session_id: meta.session_id.to_string(),
                pid: meta.pid,
                holder_pid: meta.holder_pid,
                alive: exit_code.is_none(),
                exit_code,
                command: meta.command.clone(),
                cwd: meta.cwd.clone(),
                started_at: meta.created_at.clone(),
            })
        }

        Request::End => {
            session.kill();
            shutdown = true;
            Response::Ok
        }
    };

    respond(&mut stream, &response).await;
    shutdown
}

fn error_response(e: &pty::PtyError) -> Response {
    let kind = match e {
        pty::PtyError::ExecTimeout(_) => "timeout",
        pty::PtyError::NotAShell(_) => "unsupported",
        _ => "session_error",
    };
    Response::Error {
        kind: kind.to_string(),
        message: e.to_string(),
    }
}

async fn respond(stream: &mut UnixStream, response: &Response) {
    let bytes = match serde_json::to_vec(response) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to encode response: {e}");
            return;
        }
    };
    if let Err(e) = write_message(stream, &bytes).await {
        warn!("failed to write response: {e}");
    }
}

/// Log to `holder.log` inside the session's metadata directory.
fn setup_logging(
    store: &SessionStore,
    session_id: &SessionId,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = store.session_dir(session_id);
    std::fs::create_dir_all(&dir)?;

    let file_appender = tracing_appender::rolling::never(&dir, "holder.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
