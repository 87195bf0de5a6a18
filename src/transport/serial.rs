use std::io::{BufRead, BufReader, Write};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{DriverError, Result};
use crate::transport::Port;

/// A real serial device, opened once and shared behind a std mutex — the
/// `serialport` crate's API is synchronous, so every call here runs inside
/// `spawn_blocking`.
pub struct SerialPort {
    inner: Arc<StdMutex<Box<dyn serialport::SerialPort>>>,
}

impl SerialPort {
    pub fn open(device: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(device, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(500))
            .open()
            .map_err(|e| DriverError::SerialUnavailable(format!("{device}: {e}")))?;

        Ok(Self { inner: Arc::new(StdMutex::new(port)) })
    }
}

#[async_trait]
impl Port for SerialPort {
    async fn write_all(&self, bytes: &[u8]) -> Result<()> {
        let inner = self.inner.clone();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().expect("serial port mutex poisoned");
            guard.write_all(&bytes)?;
            guard.flush()?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|e| DriverError::SerialUnavailable(e.to_string()))??;
        Ok(())
    }

    async fn read_line(&self, timeout_ms: u64) -> Result<Option<String>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().expect("serial port mutex poisoned");
            guard.set_timeout(Duration::from_millis(timeout_ms)).ok();
            let mut cloned = guard.try_clone().map_err(std::io::Error::other)?;
            drop(guard);
            let mut reader = BufReader::new(&mut cloned);
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| DriverError::SerialUnavailable(e.to_string()))?
        .map_err(DriverError::from)
    }
}
