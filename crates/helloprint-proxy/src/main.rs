use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use helloprint_core::{DecodeMode, FingerprintRecord};

mod output;

use output::OutputFormat;

/// Largest TLS plaintext record body (2^14).
const MAX_RECORD_LEN: usize = 16384;

const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;

#[derive(Parser)]
#[command(name = "helloprint-proxy")]
#[command(about = "Accepts TLS connections and prints the JA3 / JA3N / JA4 of each ClientHello")]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8443")]
    listen: SocketAddr,

    /// Output format: "text" (human-readable) or "json" (NDJSON, one object per line)
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Also print the decoded record fields and raw JA4
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Reject ClientHellos with a malformed trailing cipher or extension entry
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let format = OutputFormat::parse(&cli.output)?;
    let mode = if cli.strict {
        DecodeMode::Strict
    } else {
        DecodeMode::Lenient
    };

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;

    info!("helloprint listening on {}", cli.listen);
    info!("Test with: curl -k https://localhost:{}", cli.listen.port());
    info!("Press Ctrl+C to stop\n");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        let verbose = cli.verbose;

        tokio::spawn(async move {
            match read_client_hello(stream, peer).await {
                Ok(Some(raw)) => report(peer, raw, mode, format, verbose),
                Ok(None) => {}
                Err(e) => warn!("[{}] {:#}", peer, e),
            }
            // Connection drops here; the client sees a TLS error, that's expected
        });
    }
}

/// Read the first TLS record from the stream, header included.
///
/// Returns `Ok(None)` for connections that do not start with a handshake
/// record or announce an oversized one.
async fn read_client_hello(mut stream: TcpStream, peer: SocketAddr) -> Result<Option<Vec<u8>>> {
    // content_type(1) + version(2) + length(2)
    let mut header = [0u8; 5];
    stream
        .read_exact(&mut header)
        .await
        .context("failed to read TLS header")?;

    if header[0] != CONTENT_TYPE_HANDSHAKE {
        warn!("[{}] not a TLS handshake (got 0x{:02x})", peer, header[0]);
        return Ok(None);
    }

    let record_len = u16::from_be_bytes([header[3], header[4]]) as usize;
    if record_len > MAX_RECORD_LEN {
        warn!("[{}] record too large: {} bytes", peer, record_len);
        return Ok(None);
    }

    let mut full = Vec::with_capacity(header.len() + record_len);
    full.extend_from_slice(&header);
    full.resize(header.len() + record_len, 0);
    stream
        .read_exact(&mut full[header.len()..])
        .await
        .context("failed to read record body")?;

    Ok(Some(full))
}

fn report(
    peer: SocketAddr,
    raw: Vec<u8>,
    mode: DecodeMode,
    format: OutputFormat,
    verbose: bool,
) {
    let record = match FingerprintRecord::observed(raw, mode) {
        Ok(record) => record,
        Err(e) => {
            error!("[{}] parse error: {}", peer, e);
            return;
        }
    };

    match output::Report::collect(peer, &record) {
        Ok(report) => output::print_report(&report, format, verbose),
        Err(e) => error!("[{}] fingerprint error: {}", peer, e),
    }
}
