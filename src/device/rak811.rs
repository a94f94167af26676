use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::codes::{EventError, ResponseError};
use super::events::{Downlink, EventRecord};
use super::Result;
use crate::config::SessionConfig;
use crate::serial::unified::{LineClass, Session, Transport};
use crate::serial::SerialPortIO;

/// Handle to a RAK811 module running the v3 AT firmware
pub struct Rak811 {
    session: Session,
    config: SessionConfig,
    downlinks: VecDeque<Downlink>,
}

impl Rak811 {
    /// Open the serial port named in `config`. The port is flushed and the
    /// reader starts immediately.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let session = Session::open(&config)?;
        Ok(Self { session, config, downlinks: VecDeque::new() })
    }

    pub fn from_io(io: Box<dyn SerialPortIO>, config: SessionConfig) -> Self {
        let session = Session::from_io(io, &config);
        Self { session, config, downlinks: VecDeque::new() }
    }

    /// Stop the reader and release the serial port
    pub async fn close(self) {
        self.session.close().await;
    }

    pub fn transport(&self) -> &Transport {
        self.session.transport()
    }

    pub fn shared_transport(&self) -> Arc<Transport> {
        self.session.shared_transport()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn send_raw(&self, text: &str) -> Result<()> {
        Ok(self.transport().send_raw(text).await?)
    }

    /// Send `at+<command>` and wait for its status line.
    ///
    /// `OK...` and `Initialization OK` lines are returned untouched.
    /// `ERROR:<code>` becomes a `ResponseError` for that code, any other line
    /// a `ResponseError` carrying the whole line. A timeout is returned as is.
    pub async fn execute(&self, command: &str, timeout: Option<Duration>) -> Result<String> {
        let transport = self.transport();
        transport.send(command, true).await?;
        let response = transport.take_response(timeout).await?;

        match LineClass::classify(&response) {
            LineClass::Ok | LineClass::OkInit => Ok(response),
            LineClass::Error(code) => Err(ResponseError::new(&code).into()),
            LineClass::Event(_) | LineClass::Info => {
                log::warn!("Unexpected response to {:?}: {:?}", command, response);
                Err(ResponseError::new(&response).into())
            }
        }
    }

    /// Informational lines received since the last command, waiting until
    /// the module goes quiet. Fails with a timeout if nothing arrived.
    pub async fn get_info(&self, timeout: Option<Duration>) -> Result<Vec<String>> {
        Ok(self.transport().collect_info(timeout).await?)
    }

    /// Pending `at+recv=` lines, same draining rules as `get_info`
    pub async fn get_events(&self, timeout: Option<Duration>) -> Result<Vec<String>> {
        Ok(self.transport().collect_events(timeout).await?)
    }

    /// Firmware version: the status line plus the info lines that follow it
    pub async fn version(&self) -> Result<(String, Vec<String>)> {
        let response = self.execute("version", None).await?;
        let info = self.get_info(None).await?;
        Ok((response, info))
    }

    pub async fn run(&self) -> Result<String> {
        self.execute("run", None).await
    }

    pub async fn join(&self) -> Result<String> {
        self.execute("join", Some(self.config.join_timeout())).await
    }

    pub async fn help(&self) -> Result<String> {
        self.execute("help", None).await
    }

    /// `at+set_config=<parameter>`, e.g. `lora:region:EU868`. The module
    /// validates the parameter.
    pub async fn set_config(&self, parameter: &str) -> Result<String> {
        self.execute(&format!("set_config={}", parameter), None).await
    }

    /// `at+get_config=<parameter>`, e.g. `lora:status`. Details arrive on the
    /// info queue; read them with `get_info`.
    pub async fn get_config(&self, parameter: &str) -> Result<String> {
        self.execute(&format!("get_config={}", parameter), None).await
    }

    /// Send `data` over LoRaWAN on `port` (1-223)
    pub async fn send_lora(&self, data: impl AsRef<[u8]>, port: u8) -> Result<String> {
        let command = format!("send=lora:{}:{}", port, hex::encode(data));
        self.execute(&command, None).await
    }

    /// Send `data` out of UART `index` (1 or 3)
    pub async fn send_uart(&self, data: impl AsRef<[u8]>, index: u8) -> Result<String> {
        let command = format!("send=uart:{}:{}", index, hex::encode(data));
        self.execute(&command, None).await
    }

    pub async fn send_lorap2p(&self, data: impl AsRef<[u8]>) -> Result<String> {
        let command = format!("send=lorap2p:{}", hex::encode(data));
        self.execute(&command, None).await
    }

    /// Drain the event queue, store any downlinks, then fail on the first
    /// event whose status is not received-data or send-complete.
    ///
    /// Downlinks from the whole batch are stored before any error is raised.
    pub async fn process_events(&mut self, timeout: Option<Duration>) -> Result<Vec<EventRecord>> {
        let events = self.get_events(timeout).await?;
        let records: Vec<EventRecord> = events.iter().map(|e| EventRecord::parse(e)).collect();

        for record in records.iter().filter(|r| r.is_downlink()) {
            match Downlink::parse(&record.fields) {
                Ok(downlink) => {
                    log::debug!("Downlink on port {}: {} bytes", downlink.port, downlink.data.len());
                    self.downlinks.push_back(downlink);
                }
                Err(e) => log::warn!("Skipping malformed downlink {:?}: {}", record.fields, e),
            }
        }

        if let Some(record) = records.iter().find(|r| !r.is_benign()) {
            return Err(EventError { status: record.status.clone() }.into());
        }

        Ok(records)
    }

    pub fn nb_downlinks(&self) -> usize {
        self.downlinks.len()
    }

    /// Hand over every stored downlink, oldest first
    pub fn take_downlinks(&mut self) -> Vec<Downlink> {
        self.downlinks.drain(..).collect()
    }
}
