//! Unix socket server for the flavor plugin.
//!
//! NDJSON: each request line is answered by exactly one response line, and a
//! connection may carry any number of requests. Every connection runs on its
//! own task, so Prepare calls from different connections proceed concurrently.

use crate::protocol::{FlavorCommand, InterfaceSpec, WireError, WireMessage};
use kube_flavor::FlavorPlugin;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

/// Write one NDJSON line to an async writer.
async fn write_ndjson_async<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &WireMessage,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| format!("Serialize: {}", e))?;
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| format!("Write: {}", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| format!("Write newline: {}", e))?;
    writer.flush().await.map_err(|e| format!("Flush: {}", e))?;
    Ok(())
}

fn properties_bytes(properties: &serde_json::Value) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(properties)
        .map_err(|e| WireError::internal(format!("re-encode flavor properties: {}", e)))
}

/// Run one command against the plugin.
pub async fn dispatch(plugin: &dyn FlavorPlugin, cmd: FlavorCommand) -> WireMessage {
    match cmd {
        FlavorCommand::Implements => WireMessage::ok_interfaces(vec![InterfaceSpec::flavor()]),
        FlavorCommand::Validate {
            properties,
            allocation,
        } => match properties_bytes(&properties) {
            Ok(bytes) => plugin.validate(&bytes, &allocation).await.into(),
            Err(e) => WireMessage::err(e),
        },
        FlavorCommand::Healthy {
            properties,
            instance,
        } => match properties_bytes(&properties) {
            Ok(bytes) => match plugin.healthy(&bytes, &instance).await {
                Ok(health) => WireMessage::ok_health(health),
                Err(e) => WireMessage::err(e.into()),
            },
            Err(e) => WireMessage::err(e),
        },
        FlavorCommand::Drain {
            properties,
            instance,
        } => match properties_bytes(&properties) {
            Ok(bytes) => plugin.drain(&bytes, &instance).await.into(),
            Err(e) => WireMessage::err(e),
        },
        FlavorCommand::Prepare {
            properties,
            spec,
            allocation,
        } => match properties_bytes(&properties) {
            Ok(bytes) => match plugin.prepare(&bytes, spec, &allocation).await {
                Ok(prepared) => WireMessage::ok_spec(prepared),
                Err(e) => {
                    error!("[Daemon] Prepare failed: {}", e);
                    WireMessage::err(e.into())
                }
            },
            Err(e) => WireMessage::err(e),
        },
    }
}

async fn handle_client<S>(stream: S, peer: String, plugin: Arc<dyn FlavorPlugin>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    let (reader_half, mut writer_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader_half);
    let mut line_buf: Vec<u8> = Vec::new();

    loop {
        line_buf.clear();
        // Raw bytes: a line that is not UTF-8 still gets a Config error reply.
        let n = match reader.read_until(b'\n', &mut line_buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!("[Daemon] Read error from {}: {}", peer, e);
                break;
            }
        };

        if line_buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        debug!("[Daemon] Request from {} ({} bytes)", peer, n);

        let response = match serde_json::from_slice::<FlavorCommand>(&line_buf) {
            Ok(cmd) => {
                info!("[Daemon] Command from {}: {}", peer, cmd.label());
                dispatch(plugin.as_ref(), cmd).await
            }
            Err(e) => {
                warn!("[Daemon] Malformed request from {}: {}", peer, e);
                WireMessage::err(WireError::bad_request(format!("malformed request: {}", e)))
            }
        };

        if let Err(e) = write_ndjson_async(&mut writer_half, &response).await {
            error!("[Daemon] Failed to send response to {}: {}", peer, e);
            break;
        }
    }

    debug!("[Daemon] Connection from {} closed", peer);
}

/// Accept connections on `listener` forever, one task per connection.
pub async fn serve(listener: UnixListener, plugin: Arc<dyn FlavorPlugin>) {
    let mut next_conn: u64 = 0;
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                next_conn += 1;
                let peer = format!("conn-{}", next_conn);
                debug!("[Daemon] Connection accepted ({})", peer);
                tokio::spawn(handle_client(stream, peer, plugin.clone()));
            }
            Err(e) => {
                error!("[Daemon] Accept error: {}", e);
            }
        }
    }
}

/// Bind `socket_path` (replacing a stale socket file) and serve until the
/// task is dropped.
pub async fn run_daemon_server(
    socket_path: &Path,
    plugin: Arc<dyn FlavorPlugin>,
) -> anyhow::Result<()> {
    match std::fs::remove_file(socket_path) {
        Ok(()) => warn!("[Daemon] Removed stale socket {}", socket_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let listener = UnixListener::bind(socket_path)?;
    info!("[Daemon] Listening on {}", socket_path.display());

    serve(listener, plugin).await;
    Ok(())
}
