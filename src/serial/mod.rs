pub mod interface;
pub mod scripted;
pub mod unified;

pub use interface::{SerialInterface, SerialPortIO};
pub use scripted::ScriptedPort;

use serde::{Deserialize, Serialize};
use unified::Channel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialDeviceInfo {
    pub port_name: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout while waiting for {0}")]
    Timeout(Channel),

    #[error("Session closed")]
    Closed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

impl SerialError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SerialError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, SerialError>;
