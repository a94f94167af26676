use std::io::{Read, Write};
use std::time::Duration;

use async_trait::async_trait;
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tokio::time::Instant;

use super::{Result, SerialDeviceInfo, SerialError};

pub const DEFAULT_PORT: &str = "/dev/serial0";
pub const BAUD_RATE: u32 = 115200;

// Interval between `bytes_to_read` polls while the line is idle
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Byte-level access to the module's serial line.
///
/// `read_data` must return within roughly `timeout_ms`; `Ok(0)` means the
/// line stayed quiet for the whole window, it is not an error.
#[async_trait]
pub trait SerialPortIO: Send {
    async fn send_data(&mut self, data: &[u8]) -> Result<usize>;
    async fn read_data(&mut self, buffer: &mut [u8], timeout_ms: u64) -> Result<usize>;
    async fn flush(&mut self) -> Result<()>;
    /// Release the underlying handle. Further I/O fails with `SerialError::Closed`.
    fn close(&mut self) {}
}

pub struct SerialInterface {
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
}

impl SerialInterface {
    /// List the serial ports visible on this host
    pub fn discover_ports() -> Result<Vec<SerialDeviceInfo>> {
        let ports = serialport::available_ports()?;
        let devices = ports
            .into_iter()
            .map(|port| match port.port_type {
                SerialPortType::UsbPort(usb_info) => SerialDeviceInfo {
                    port_name: port.port_name,
                    vid: Some(usb_info.vid),
                    pid: Some(usb_info.pid),
                    serial_number: usb_info.serial_number,
                    manufacturer: usb_info.manufacturer,
                    product: usb_info.product,
                },
                _ => SerialDeviceInfo {
                    port_name: port.port_name,
                    vid: None,
                    pid: None,
                    serial_number: None,
                    manufacturer: None,
                    product: None,
                },
            })
            .collect();

        Ok(devices)
    }

    /// Open `port_name` and drop whatever the module sent before we attached.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => SerialError::PortNotFound(port_name.to_string()),
                _ => SerialError::ConnectionFailed(e.to_string()),
            })?;

        port.clear(ClearBuffer::Input)?;

        log::info!("Opened RAK811 serial port {} at {} baud", port_name, baud_rate);
        Ok(Self {
            port: Some(port),
            port_name: port_name.to_string(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl SerialPortIO for SerialInterface {
    async fn send_data(&mut self, data: &[u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(SerialError::Closed)?;

        let bytes_written = port.write(data)?;
        port.flush()?;

        Ok(bytes_written)
    }

    async fn read_data(&mut self, buffer: &mut [u8], timeout_ms: u64) -> Result<usize> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            let port = self.port.as_mut().ok_or(SerialError::Closed)?;
            match port.bytes_to_read()? {
                0 => {
                    if Instant::now() >= deadline {
                        return Ok(0);
                    }
                    tokio::time::sleep(IDLE_POLL).await;
                }
                _ => match port.read(buffer) {
                    Ok(bytes_read) => return Ok(bytes_read),
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        if Instant::now() >= deadline {
                            return Ok(0);
                        }
                    }
                    Err(e) => return Err(SerialError::IoError(e)),
                },
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(SerialError::Closed)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::info!("Closed serial port {}", self.port_name);
        }
    }
}
