//! Connection Multiplexer: the TCP front end of the driver.
//!
//! Grounded on `setup_server_socket()` / `handle_client()`: one accept loop,
//! one task per connection, a single mutex serializing scale and printer
//! traffic that is locked once per inbound read (a read may carry several
//! newline-delimited commands) rather than once per line. `MODE:WEIGHT`
//! switches a connection into the weighing command catalog with an
//! `OK:WEIGHT\n` acknowledgment; `MODE:PRINTER` expects exactly three more
//! lines (job document path, slot, barcode selector id) and replies
//! `OK\n` / `Error printing\n` / `Error: printer args missing\n`.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::errors::{DriverError, Result};
use crate::orchestrator;
use crate::scale;
use crate::storage::Storage;
use crate::transport::Port;

/// Shared state handed to every connection worker.
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
    pub printer: Arc<dyn Port>,
    pub scale: Option<Arc<dyn Port>>,
    scale_mutex: Mutex<()>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Storage,
        printer: Arc<dyn Port>,
        scale: Option<Arc<dyn Port>>,
    ) -> Self {
        Self {
            config,
            storage,
            printer,
            scale,
            scale_mutex: Mutex::new(()),
        }
    }
}

pub async fn bind(config: &Config) -> Result<TcpListener> {
    let addr = format!("0.0.0.0:{}", config.tcp_port);
    TcpListener::bind(&addr).await.map_err(DriverError::from)
}

pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await.map_err(DriverError::from)?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::warn!("connection {} ended: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) -> Result<()> {
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&buf[..n]).into_owned();

        let _guard = state.scale_mutex.lock().await;
        let mut lines = text.split('\n');
        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if trimmed == "MODE:WEIGHT" {
                stream.write_all(b"OK:WEIGHT\n").await?;
                continue;
            }

            if trimmed == "MODE:PRINTER" {
                handle_printer_envelope(&mut stream, &mut lines, &state).await?;
                break;
            }

            let reply = scale::run(state.scale.as_deref(), trimmed).await;
            stream.write_all(reply.as_bytes()).await?;
            stream.write_all(b"\n").await?;
        }
    }
}

async fn handle_printer_envelope(
    stream: &mut TcpStream,
    lines: &mut std::str::Split<'_, char>,
    state: &AppState,
) -> Result<()> {
    let json_path = lines.next();
    let slot_str = lines.next();
    let selector_str = lines.next();

    let (json_path, slot_str, selector_str) = match (json_path, slot_str, selector_str) {
        (Some(jp), Some(ss), Some(si))
            if !jp.trim().is_empty() && !ss.trim().is_empty() && !si.trim().is_empty() =>
        {
            (jp.trim(), ss.trim(), si.trim())
        }
        _ => {
            stream.write_all(b"Error: printer args missing\n").await?;
            return Ok(());
        }
    };

    let slot: i64 = slot_str.parse().unwrap_or(0);
    let barcode_selector_id: i64 = selector_str.parse().unwrap_or(0);

    let reply = match orchestrator::load_job_document(json_path).await {
        Ok(doc) => {
            orchestrator::run_job_for_reply(
                &state.storage,
                state.printer.as_ref(),
                state.scale.as_deref(),
                state.config.dots_per_mm,
                state.config.lbl_wtgrams,
                doc,
                slot,
                barcode_selector_id,
            )
            .await
        }
        Err(e) => {
            tracing::error!("job document {}: {}", json_path, e);
            "Error printing\n"
        }
    };

    stream.write_all(reply.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryPort;
    use tokio::io::AsyncBufReadExt;
    use tokio::io::BufReader;

    async fn spawn_test_server(printer: MemoryPort, scale: Option<MemoryPort>) -> std::net::SocketAddr {
        let config = Config {
            tcp_port: 0,
            ..Config::default()
        };
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        storage.initialize_tables().await.unwrap();
        storage.save_template(1, b"~S 54,40\n~P 1,D\n").await.unwrap();

        let state = Arc::new(AppState::new(
            config,
            storage,
            Arc::new(printer),
            scale.map(|s| Arc::new(s) as Arc<dyn Port>),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state));
        addr
    }

    #[tokio::test]
    async fn mode_weight_acks_and_switches_to_scale_commands() {
        let addr = spawn_test_server(MemoryPort::new(), Some(MemoryPort::new())).await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (rd, mut wr) = stream.into_split();
        let mut reader = BufReader::new(rd);

        wr.write_all(b"MODE:WEIGHT\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "OK:WEIGHT\n");

        wr.write_all(b"XC_TARE\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "XC_TARE: Tare command sent.\n");
    }

    #[tokio::test]
    async fn mode_printer_with_missing_args_reports_error() {
        let addr = spawn_test_server(MemoryPort::new(), None).await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (rd, mut wr) = stream.into_split();
        let mut reader = BufReader::new(rd);

        wr.write_all(b"MODE:PRINTER\n/tmp/job.json\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "Error: printer args missing\n");
    }

    #[tokio::test]
    async fn mode_printer_with_missing_job_file_reports_error_printing() {
        let addr = spawn_test_server(MemoryPort::new(), None).await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (rd, mut wr) = stream.into_split();
        let mut reader = BufReader::new(rd);

        wr.write_all(b"MODE:PRINTER\n/nonexistent/job.json\n1\n0\n")
            .await
            .unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "Error printing\n");
    }
}
