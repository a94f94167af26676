use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::reader::{reader_task, PortState};
use super::transport::{ChannelSet, Transport};
use crate::config::SessionConfig;
use crate::serial::{Result, SerialInterface, SerialPortIO};

/// One open connection to a module: the transport plus its reader task.
///
/// The reader starts as soon as the session exists and runs until `close`.
pub struct Session {
    transport: Arc<Transport>,
    shutdown_tx: watch::Sender<bool>,
    reader: Option<JoinHandle<()>>,
}

impl Session {
    /// Open the configured serial port and start reading
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let interface = SerialInterface::open(&config.port, config.baud_rate)?;
        log::debug!("Starting reader on {}", interface.port_name());
        Ok(Self::from_io(Box::new(interface), config))
    }

    /// Start a session over an already open byte stream. Must be called from
    /// within a tokio runtime.
    pub fn from_io(io: Box<dyn SerialPortIO>, config: &SessionConfig) -> Self {
        let port = Arc::new(Mutex::new(PortState::new(io)));
        let (queues, router) = ChannelSet::new();
        let alive = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let reader = tokio::spawn(reader_task(
            port.clone(),
            router,
            shutdown_rx,
            config.read_timeout(),
            alive.clone(),
        ));

        let transport = Arc::new(Transport::new(
            port,
            queues,
            alive,
            config.response_timeout(),
            config.event_timeout(),
        ));

        log::info!("RAK811 session started");
        Self { transport, shutdown_tx, reader: Some(reader) }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// A handle that can outlive borrows of the session, e.g. for a task
    /// waiting on events while another closes the session
    pub fn shared_transport(&self) -> Arc<Transport> {
        self.transport.clone()
    }

    /// Stop the reader, wait for it to exit, then release the port.
    /// Callers blocked in a take are woken with `SerialError::Closed`.
    pub async fn close(mut self) {
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(reader) = self.reader.take() {
            if let Err(e) = reader.await {
                log::error!("Reader task ended abnormally: {}", e);
            }
        }
        self.transport.release().await;
        log::info!("RAK811 session closed");
    }

    /// False once the reader has exited, e.g. after an I/O failure
    pub fn is_reading(&self) -> bool {
        self.reader.as_ref().map(|r| !r.is_finished()).unwrap_or(false)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Without close() the reader is only signalled, not joined
        let _ = self.shutdown_tx.send(true);
    }
}
