//! Consumer side of the channel set plus the command write path
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use super::reader::{Router, SharedPort};
use super::types::{format_command, Channel};
use crate::serial::{Result, SerialError};

/// One FIFO of lines. Any number of callers may take from it; the reader
/// task is the only producer.
pub struct LineQueue {
    channel: Channel,
    rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl LineQueue {
    fn new(channel: Channel, rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self { channel, rx: Mutex::new(rx) }
    }

    /// Wait up to `wait` for the next line. Waiting for the queue itself
    /// (another caller is already taking) counts against the same budget.
    pub async fn take(&self, wait: Duration) -> Result<String> {
        let next = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };
        match tokio::time::timeout(wait, next).await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(SerialError::Closed),
            Err(_) => Err(SerialError::Timeout(self.channel)),
        }
    }

    /// Drop everything queued. A caller currently blocked in `take` holds the
    /// receiver, which means the queue was empty when it started waiting, so
    /// it is left alone.
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        if let Ok(mut rx) = self.rx.try_lock() {
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
        }
        dropped
    }
}

pub struct ChannelSet {
    pub response: LineQueue,
    pub info: LineQueue,
    pub event: LineQueue,
}

impl ChannelSet {
    /// Build the three queues and the router that feeds them
    pub fn new() -> (Self, Router) {
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (info_tx, info_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let set = Self {
            response: LineQueue::new(Channel::Response, response_rx),
            info: LineQueue::new(Channel::Info, info_rx),
            event: LineQueue::new(Channel::Event, event_rx),
        };
        (set, Router::new(response_tx, info_tx, event_tx))
    }

    pub fn queue(&self, channel: Channel) -> &LineQueue {
        match channel {
            Channel::Response => &self.response,
            Channel::Info => &self.info,
            Channel::Event => &self.event,
        }
    }

    pub fn clear_all(&self) -> usize {
        self.info.clear() + self.event.clear() + self.response.clear()
    }
}

pub struct Transport {
    port: SharedPort,
    queues: ChannelSet,
    alive: Arc<AtomicBool>,
    response_timeout: Duration,
    event_timeout: Duration,
}

impl Transport {
    pub(crate) fn new(
        port: SharedPort,
        queues: ChannelSet,
        alive: Arc<AtomicBool>,
        response_timeout: Duration,
        event_timeout: Duration,
    ) -> Self {
        Self { port, queues, alive, response_timeout, event_timeout }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn event_timeout(&self) -> Duration {
        self.event_timeout
    }

    /// Write `at+<command>\r\n`. With `clear_queues` every queue is emptied
    /// first, along with any half-received line, so nothing the module sent
    /// before the write can be routed after it. Never waits for the module
    /// to answer.
    pub async fn send(&self, command: &str, clear_queues: bool) -> Result<()> {
        self.send_string(&format_command(command), clear_queues).await
    }

    /// Write `text` verbatim, no framing added
    pub async fn send_raw(&self, text: &str) -> Result<()> {
        self.send_string(text, false).await
    }

    async fn send_string(&self, text: &str, clear_queues: bool) -> Result<()> {
        if !self.is_alive() {
            return Err(SerialError::Closed);
        }

        let mut port = self.port.lock().await;
        if clear_queues {
            let dropped = self.queues.clear_all();
            let partial = port.framer.discard();
            if dropped > 0 || partial > 0 {
                log::debug!("Cleared {} stale lines and {} partial bytes before send", dropped, partial);
            }
        }
        log::debug!("Send: {:?}", text);
        port.io.send_data(text.as_bytes()).await?;
        Ok(())
    }

    pub async fn take(&self, channel: Channel, timeout: Option<Duration>) -> Result<String> {
        let wait = timeout.unwrap_or(match channel {
            Channel::Event => self.event_timeout,
            Channel::Response | Channel::Info => self.response_timeout,
        });
        self.queues.queue(channel).take(wait).await
    }

    pub async fn take_response(&self, timeout: Option<Duration>) -> Result<String> {
        self.take(Channel::Response, timeout).await
    }

    pub async fn take_info(&self, timeout: Option<Duration>) -> Result<String> {
        self.take(Channel::Info, timeout).await
    }

    pub async fn take_event(&self, timeout: Option<Duration>) -> Result<String> {
        self.take(Channel::Event, timeout).await
    }

    /// Drain `channel` until it stays quiet for `timeout`.
    ///
    /// Returns the lines in arrival order once a wait times out or the reader
    /// stops, provided at least one line was received; otherwise the timeout
    /// or `SerialError::Closed` itself is returned.
    pub async fn collect(&self, channel: Channel, timeout: Option<Duration>) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            match self.take(channel, timeout).await {
                Ok(line) => lines.push(line),
                Err(SerialError::Timeout(_) | SerialError::Closed) if !lines.is_empty() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(lines)
    }

    pub async fn collect_info(&self, timeout: Option<Duration>) -> Result<Vec<String>> {
        self.collect(Channel::Info, timeout).await
    }

    pub async fn collect_events(&self, timeout: Option<Duration>) -> Result<Vec<String>> {
        self.collect(Channel::Event, timeout).await
    }

    /// Flush pending output, then close the port
    pub(crate) async fn release(&self) {
        let mut port = self.port.lock().await;
        if let Err(e) = port.io.flush().await {
            log::debug!("Flush before close failed: {}", e);
        }
        port.io.close();
    }
}
