use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::Result;
use crate::transport::Port;

/// An in-memory [`Port`] for tests: captures every write, and serves queued
/// canned lines for reads. Not `cfg(test)`-gated so integration tests under
/// `tests/` can use it too.
#[derive(Default)]
pub struct MemoryPort {
    written: Mutex<Vec<u8>>,
    queued_lines: Mutex<Vec<String>>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queued_lines(lines: Vec<String>) -> Self {
        Self { written: Mutex::new(Vec::new()), queued_lines: Mutex::new(lines) }
    }

    pub fn written_bytes(&self) -> Vec<u8> {
        self.written.lock().expect("memory port mutex poisoned").clone()
    }
}

#[async_trait]
impl Port for MemoryPort {
    async fn write_all(&self, bytes: &[u8]) -> Result<()> {
        self.written.lock().expect("memory port mutex poisoned").extend_from_slice(bytes);
        Ok(())
    }

    async fn read_line(&self, _timeout_ms: u64) -> Result<Option<String>> {
        let mut queue = self.queued_lines.lock().expect("memory port mutex poisoned");
        if queue.is_empty() {
            Ok(None)
        } else {
            Ok(Some(queue.remove(0)))
        }
    }
}
