//! Async driver for RAK811 LoRa modules over a serial AT command link.
//!
//! A background reader splits the module's output into three queues:
//! command responses, informational lines and `at+recv=` events.
//! [`Rak811`] issues commands against the response queue and drains the
//! other two on demand.
pub mod config;
pub mod device;
pub mod serial;

pub use config::SessionConfig;
pub use device::{DeviceError, Downlink, EventCode, EventError, Rak811, ResponseCode, ResponseError};
pub use serial::{ScriptedPort, SerialError, SerialInterface, SerialPortIO};
