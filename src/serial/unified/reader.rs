//! Background reader task: frames incoming bytes into lines, classifies them
//! and routes each line into the response, info or event queue.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};

use super::types::{Channel, LineClass};
use crate::serial::SerialPortIO;

/// The byte stream plus the bytes of a line not yet terminated. Both sit
/// behind one lock so clearing before a send also drops a half-received line.
pub struct PortState {
    pub(crate) io: Box<dyn SerialPortIO>,
    pub(crate) framer: LineFramer,
}

impl PortState {
    pub fn new(io: Box<dyn SerialPortIO>) -> Self {
        Self { io, framer: LineFramer::new() }
    }
}

pub type SharedPort = Arc<Mutex<PortState>>;

const READ_CHUNK: usize = 512;
const MAX_PARTIAL: usize = 8192;
const TRIMMED_PARTIAL: usize = 4096;

/// Splits a byte stream into text lines. A line may arrive over several reads.
///
/// CR, LF and CRLF each end a line; an empty line is still a line.
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
    after_cr: bool,
    trims: u64,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            match byte {
                // Second half of a CRLF pair, possibly split across reads
                b'\n' if self.after_cr => self.after_cr = false,
                b'\r' | b'\n' => {
                    let raw = std::mem::take(&mut self.partial);
                    lines.push(decode_line(&raw));
                    self.after_cr = byte == b'\r';
                }
                _ => {
                    self.partial.push(byte);
                    self.after_cr = false;
                }
            }
        }

        if self.partial.len() > MAX_PARTIAL {
            let excess = self.partial.len() - TRIMMED_PARTIAL;
            self.partial.drain(..excess);
            self.trims += 1;
            log::warn!("Unterminated input exceeded {} bytes, dropped {} bytes", MAX_PARTIAL, excess);
        }

        lines
    }

    /// Drop the unterminated tail, returning how many bytes were discarded
    pub fn discard(&mut self) -> usize {
        let dropped = self.partial.len();
        self.partial.clear();
        dropped
    }

    /// Bytes received but not yet terminated
    pub fn pending(&self) -> usize {
        self.partial.len()
    }

    pub fn trims(&self) -> u64 {
        self.trims
    }
}

fn decode_line(raw: &[u8]) -> String {
    if !raw.is_ascii() {
        log::warn!("Non-ASCII bytes in line from module: {:02X?}", raw);
    }
    String::from_utf8_lossy(raw).into_owned()
}

/// Producer side of the channel set. Only the reader task holds one.
pub struct Router {
    response: mpsc::UnboundedSender<String>,
    info: mpsc::UnboundedSender<String>,
    event: mpsc::UnboundedSender<String>,
}

impl Router {
    pub(crate) fn new(
        response: mpsc::UnboundedSender<String>,
        info: mpsc::UnboundedSender<String>,
        event: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self { response, info, event }
    }

    fn sender(&self, channel: Channel) -> &mpsc::UnboundedSender<String> {
        match channel {
            Channel::Response => &self.response,
            Channel::Info => &self.info,
            Channel::Event => &self.event,
        }
    }

    /// Classify `line` and push it to every queue its class routes to.
    /// Both pushes for `OK` lines happen before this returns.
    pub fn route(&self, line: &str) -> LineClass {
        let class = LineClass::classify(line);
        for channel in class.routes() {
            log::trace!("Routing {:?} to {} queue", line, channel);
            // A dropped receiver only means the session is going away
            let _ = self.sender(*channel).send(line.to_string());
        }
        class
    }
}

pub(crate) async fn reader_task(
    port: SharedPort,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
    read_timeout: Duration,
    alive: Arc<AtomicBool>,
) {
    use tokio::select;

    let mut buf = [0u8; READ_CHUNK];
    let timeout_ms = read_timeout.as_millis() as u64;

    log::debug!("Reader task started (poll {:?})", read_timeout);

    loop {
        if *shutdown.borrow() {
            break;
        }

        // Lines are routed while the port is still held, so a concurrent
        // send() never clears the queues between a read and its routing.
        let read_cycle = async {
            let mut guard = port.lock().await;
            let state = &mut *guard;
            let n = state.io.read_data(&mut buf, timeout_ms).await?;
            if n > 0 {
                for line in state.framer.push(&buf[..n]) {
                    log::debug!("Recvd: {}", line);
                    router.route(&line);
                }
            }
            Ok::<usize, crate::serial::SerialError>(n)
        };

        select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Session dropped without close()
                    break;
                }
            },
            res = read_cycle => {
                if let Err(e) = res {
                    log::error!("Reader task stopping on I/O error: {}", e);
                    break;
                }
            },
        }
    }

    alive.store(false, Ordering::SeqCst);
    let pending = port.lock().await.framer.pending();
    if pending > 0 {
        log::debug!("Reader task left {} unterminated bytes", pending);
    }
    log::debug!("Reader task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framer_splits_crlf() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"OK V3.0.0.14.H\r\nInitialization OK\r\n");
        assert_eq!(lines, vec!["OK V3.0.0.14.H", "Initialization OK"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_line_across_reads() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"at+recv=5,1,").is_empty());
        assert_eq!(framer.pending(), 12);
        let lines = framer.push(b"10,3,48656C6C6F\r");
        assert_eq!(lines, vec!["at+recv=5,1,10,3,48656C6C6F"]);
        // Trailing LF of the CRLF pair produces no extra line
        assert!(framer.push(b"\n").is_empty());
        assert_eq!(framer.push(b"OK\r\n"), vec!["OK"]);
    }

    #[test]
    fn test_framer_keeps_blank_lines() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"\r\n\r\nhelp\nOK\n\nat+run\r\r\n");
        assert_eq!(lines, vec!["", "", "help", "OK", "", "at+run", ""]);
    }

    #[test]
    fn test_framer_discard() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"ERROR:8").is_empty());
        assert_eq!(framer.discard(), 7);
        assert_eq!(framer.push(b"6\r\n"), vec!["6"]);
    }

    #[test]
    fn test_framer_non_ascii_is_lossy() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"abc\xffdef\r\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("abc"));
        assert!(lines[0].ends_with("def"));
    }

    #[test]
    fn test_framer_trims_runaway_input() {
        let mut framer = LineFramer::new();
        let junk = vec![b'x'; MAX_PARTIAL + 1];
        assert!(framer.push(&junk).is_empty());
        assert_eq!(framer.pending(), TRIMMED_PARTIAL);
        assert_eq!(framer.trims(), 1);
    }

    #[tokio::test]
    async fn test_router_dual_push_for_ok() {
        let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
        let (info_tx, mut info_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let router = Router::new(resp_tx, info_tx, event_tx);

        assert_eq!(router.route("OK"), LineClass::Ok);
        assert_eq!(router.route("ERROR:2"), LineClass::Error("2".into()));
        assert_eq!(router.route("at+recv=1,0,0"), LineClass::Event("1,0,0".into()));
        assert_eq!(router.route("LoRa (R) is a registered trademark"), LineClass::Info);

        assert_eq!(resp_rx.try_recv().ok().as_deref(), Some("OK"));
        assert_eq!(resp_rx.try_recv().ok().as_deref(), Some("ERROR:2"));
        assert!(resp_rx.try_recv().is_err());

        assert_eq!(info_rx.try_recv().ok().as_deref(), Some("OK"));
        assert_eq!(info_rx.try_recv().ok().as_deref(), Some("LoRa (R) is a registered trademark"));
        assert!(info_rx.try_recv().is_err());

        assert_eq!(event_rx.try_recv().ok().as_deref(), Some("at+recv=1,0,0"));
        assert!(event_rx.try_recv().is_err());
    }
}
