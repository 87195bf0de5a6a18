//! Serial transport: the printer and scale are both plain serial devices
//! multiplexed behind one mutex. `serialport` is a synchronous API, so
//! every device call is dispatched onto a blocking task.

mod memory;
mod serial;

pub use memory::MemoryPort;
pub use serial::SerialPort;

use async_trait::async_trait;

use crate::errors::Result;

/// A serial endpoint the driver writes command bytes to and, for the
/// scale's `RD_*` family and the printer's `~e` directive, reads a
/// newline-delimited response line from.
#[async_trait]
pub trait Port: Send + Sync {
    async fn write_all(&self, bytes: &[u8]) -> Result<()>;

    /// Read one line (without its terminator), waiting up to `timeout_ms`.
    /// `Ok(None)` on timeout — this is the device-unresponsive case, not an
    /// error: callers decide whether silence is fatal.
    async fn read_line(&self, timeout_ms: u64) -> Result<Option<String>>;
}
