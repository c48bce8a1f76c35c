//! The `iris classify` command: a one-shot protocol client.
//!
//! Reads an image file, wraps it in a `classify` request, sends it to a
//! running server over TCP, and prints the raw JSON-RPC response. Useful
//! for smoke-testing a deployment without writing a client.

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine as _;
use clap::Args;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Arguments for the `classify` command.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Image file to classify
    #[arg(required = true)]
    pub image: PathBuf,

    /// Candidate labels per category, as JSON (e.g. '{"animal": ["cat", "dog"]}')
    #[arg(short, long)]
    pub labels: String,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:9000", env = "IRIS_ADDRESS")]
    pub address: String,

    /// Connection attempts before giving up
    #[arg(long, default_value = "6")]
    pub max_attempts: u32,

    /// Pretty-print the response
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the classify command.
pub async fn execute(args: ClassifyArgs) -> anyhow::Result<()> {
    let labels: Value = serde_json::from_str(&args.labels)
        .map_err(|e| anyhow::anyhow!("--labels must be valid JSON: {e}"))?;

    let image_bytes = std::fs::read(&args.image)
        .map_err(|e| anyhow::anyhow!("could not read {}: {e}", args.image.display()))?;
    let image = base64::engine::general_purpose::STANDARD.encode(image_bytes);

    let request = json!({
        "jsonrpc": "2.0",
        "method": "classify",
        "params": { "image": image, "labels": labels },
        "id": 1,
    });

    let mut stream =
        dial_with_retry(&args.address, args.max_attempts, Duration::from_secs(1)).await?;

    let mut line = serde_json::to_vec(&request)?;
    line.push(b'\n');
    stream.write_all(&line).await?;

    let response = read_line(&mut stream).await?;
    let parsed: Value = serde_json::from_str(response.trim())
        .map_err(|e| anyhow::anyhow!("server sent invalid JSON: {e}"))?;

    if args.pretty {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        println!("{}", response.trim());
    }

    if let Some(error) = parsed.get("error") {
        anyhow::bail!("server returned an error: {error}");
    }
    Ok(())
}

/// Connect with exponential backoff: up to `max_attempts` tries, starting
/// at `initial_delay` and doubling after each failure.
async fn dial_with_retry(
    address: &str,
    max_attempts: u32,
    initial_delay: Duration,
) -> anyhow::Result<TcpStream> {
    let mut delay = initial_delay;
    let mut last_err = None;

    for attempt in 1..=max_attempts {
        match TcpStream::connect(address).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::warn!(
                    "Connection attempt {attempt}/{max_attempts} to {address} failed: {e}"
                );
                last_err = Some(e);
            }
        }
        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }

    let detail = last_err
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no attempts made".to_string());
    anyhow::bail!("could not connect to {address} after {max_attempts} attempts: {detail}")
}

/// Read from the stream until a newline or EOF.
async fn read_line(stream: &mut TcpStream) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.contains(&b'\n') {
            break;
        }
    }
    if buffer.is_empty() {
        anyhow::bail!("server closed the connection without responding");
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
