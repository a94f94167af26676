//! In-memory stand-in for a RAK811 module.
//!
//! A `ScriptedPort` answers written commands with canned lines and lets the
//! caller inject unsolicited output at any time. Clones share the same state,
//! so a test can keep one handle while the session owns another.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{Result, SerialError, SerialPortIO};
use super::unified::EOL;

#[derive(Default)]
struct ScriptState {
    incoming: VecDeque<u8>,
    written: Vec<String>,
    replies: HashMap<String, VecDeque<Vec<String>>>,
    flushes: usize,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct ScriptedPort {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue `lines` to be emitted the next time `at+<command>` is written.
    /// Several calls for the same command are consumed in order.
    pub fn reply_to(&self, command: &str, lines: &[&str]) {
        self.state()
            .replies
            .entry(command.to_string())
            .or_default()
            .push_back(lines.iter().map(|l| l.to_string()).collect());
    }

    /// Emit a CRLF-terminated line as if the module had sent it unprompted
    pub fn inject(&self, line: &str) {
        let mut state = self.state();
        state.incoming.extend(line.as_bytes());
        state.incoming.extend(EOL.as_bytes());
    }

    pub fn inject_raw(&self, bytes: &[u8]) {
        self.state().incoming.extend(bytes);
    }

    /// Everything written to the port so far, one entry per write
    pub fn written(&self) -> Vec<String> {
        self.state().written.clone()
    }

    /// Simulate the device going away: every further read or write fails
    pub fn unplug(&self) {
        self.state().closed = true;
    }

    pub fn flushes(&self) -> usize {
        self.state().flushes
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl SerialPortIO for ScriptedPort {
    async fn send_data(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.state();
        if state.closed {
            return Err(SerialError::Closed);
        }
        let text = String::from_utf8_lossy(data).to_string();
        let command = text
            .strip_prefix("at+")
            .and_then(|c| c.strip_suffix(EOL))
            .map(str::to_string);
        state.written.push(text);

        if let Some(command) = command {
            let reply = state.replies.get_mut(&command).and_then(|q| q.pop_front());
            for line in reply.unwrap_or_default() {
                state.incoming.extend(line.as_bytes());
                state.incoming.extend(EOL.as_bytes());
            }
        }
        Ok(data.len())
    }

    async fn read_data(&mut self, buffer: &mut [u8], timeout_ms: u64) -> Result<usize> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            {
                let mut state = self.state();
                if state.closed {
                    return Err(SerialError::Closed);
                }
                if !state.incoming.is_empty() {
                    let n = buffer.len().min(state.incoming.len());
                    for (slot, byte) in buffer.iter_mut().zip(state.incoming.drain(..n)) {
                        *slot = byte;
                    }
                    return Ok(n);
                }
            }
            if Instant::now() >= deadline {
                return Ok(0);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn flush(&mut self) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(SerialError::Closed);
        }
        state.flushes += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.state().closed = true;
    }
}
