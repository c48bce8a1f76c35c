//! TCP server speaking newline-delimited JSON-RPC.
//!
//! One request/response cycle per connection: accumulate reads until a
//! newline (or EOF) arrives, dispatch, write the newline-terminated
//! response, close. Payloads must not contain raw newline bytes; JSON
//! string escaping and base64 image bodies satisfy this.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::{ServerConfig, ServerLimits};
use crate::error::ServeError;
use crate::rpc::envelope::PARSE_ERROR;
use crate::rpc::Dispatcher;

/// Read chunk size for request framing.
const READ_CHUNK_BYTES: usize = 4096;

/// Preview length for request/response diagnostics.
const LOG_PREVIEW_CHARS: usize = 120;

/// Accepts connections and serves the JSON-RPC protocol.
pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    config: ServerConfig,
}

impl Server {
    /// Bind the configured address.
    pub async fn bind(config: ServerConfig, dispatcher: Dispatcher) -> Result<Self, ServeError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;

        tracing::info!(
            "TCP JSON-RPC server listening on {}",
            listener.local_addr()?
        );

        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher),
            config,
        })
    }

    /// The address the listener actually bound (resolves port 0).
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServeError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the process exits.
    ///
    /// Each connection is served on its own task; a failed or slow
    /// connection never takes down the accept loop. In-flight connections
    /// are bounded by `max_connections`.
    pub async fn run(self) -> Result<(), ServeError> {
        let permits = Arc::new(Semaphore::new(self.config.limits.max_connections));

        loop {
            // Take a permit before accepting so the backlog stays in the
            // kernel queue instead of half-served tasks.
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed; treat it as shutdown.
                Err(_) => return Ok(()),
            };

            let (stream, peer) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let dispatcher = self.dispatcher.clone();
            let limits = self.config.limits.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, dispatcher, &limits).await {
                    tracing::warn!(peer = %peer, error = %e, "connection closed with error");
                }
                drop(permit);
            });
        }
    }
}

/// Serve one request/response cycle on an accepted connection.
async fn handle_connection(
    mut stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    limits: &ServerLimits,
) -> Result<(), ServeError> {
    let read_timeout = Duration::from_millis(limits.read_timeout_ms);

    // Accumulate chunks until a newline is seen or the peer closes.
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    loop {
        let n = timeout(read_timeout, stream.read(&mut chunk))
            .await
            .map_err(|_| ServeError::ReadTimeout {
                timeout_ms: limits.read_timeout_ms,
            })??;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() > limits.max_request_bytes {
            // Tell the client why before closing; the empty-payload silent
            // drop below is reserved for the protocol's defined case.
            let response = serde_json::json!({
                "jsonrpc": "2.0",
                "error": {
                    "code": PARSE_ERROR,
                    "message": format!(
                        "Request exceeds maximum size of {} bytes",
                        limits.max_request_bytes
                    ),
                },
                "id": null,
            });
            write_line(&mut stream, &response.to_string(), limits).await?;
            return Err(ServeError::RequestTooLarge {
                max_bytes: limits.max_request_bytes,
            });
        }
        if buffer.contains(&b'\n') {
            break;
        }
    }

    // Lossy decoding turns invalid UTF-8 into a regular parse error at the
    // dispatcher instead of a dead connection.
    let request = String::from_utf8_lossy(&buffer);
    let request = request.trim();
    if request.is_empty() {
        tracing::debug!("empty request, closing without response");
        return Ok(());
    }

    tracing::debug!("Received: {}", preview(request));

    // Decode + inference are CPU-bound; keep them off the accept runtime.
    let response = {
        let request = request.to_string();
        tokio::task::spawn_blocking(move || dispatcher.handle(&request))
            .await
            .map_err(|e| ServeError::Dispatch {
                message: e.to_string(),
            })?
    };

    tracing::debug!("Sending: {}", preview(&response));

    write_line(&mut stream, &response, limits).await
}

/// Write a newline-terminated response within the write timeout.
async fn write_line(
    stream: &mut TcpStream,
    response: &str,
    limits: &ServerLimits,
) -> Result<(), ServeError> {
    let write_timeout = Duration::from_millis(limits.write_timeout_ms);
    let mut line = Vec::with_capacity(response.len() + 1);
    line.extend_from_slice(response.as_bytes());
    line.push(b'\n');

    timeout(write_timeout, stream.write_all(&line))
        .await
        .map_err(|_| ServeError::WriteTimeout {
            timeout_ms: limits.write_timeout_ms,
        })??;
    Ok(())
}

/// Truncate a payload for diagnostic logs.
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(LOG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("hello"), "hello");
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "x".repeat(500);
        let p = preview(&long);
        assert_eq!(p.chars().count(), LOG_PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_preview_exact_boundary_has_no_ellipsis() {
        let exact = "y".repeat(LOG_PREVIEW_CHARS);
        assert_eq!(preview(&exact), exact);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let multibyte = "é".repeat(LOG_PREVIEW_CHARS + 10);
        let p = preview(&multibyte);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), LOG_PREVIEW_CHARS + 3);
    }
}
