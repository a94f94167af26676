pub mod codes;
pub mod events;
pub mod rak811;
pub mod reset;

pub use codes::{CodeTable, EventCode, EventError, ResponseCode, ResponseError, StatusCode};
pub use events::{Downlink, DownlinkParseError, EventRecord};
pub use rak811::Rak811;
pub use reset::{hard_reset, ResetLine};

use crate::serial::SerialError;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Serial communication error: {0}")]
    Serial(#[from] SerialError),
}

impl DeviceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeviceError::Serial(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
