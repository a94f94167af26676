//! Parsing of `at+recv=` event lines and downlink payloads
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::codes::{EventCode, StatusCode};
use crate::serial::unified::RESPONSE_EVENT;

/// An event tail split on commas with its status field isolated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub status: StatusCode<EventCode>,
    pub fields: Vec<String>,
}

impl EventRecord {
    /// Accepts either the full line or just the part after `at+recv=`
    pub fn parse(line: &str) -> Self {
        let tail = line.strip_prefix(RESPONSE_EVENT).unwrap_or(line);
        let mut items = tail.split(',');
        let status = StatusCode::resolve(items.next().unwrap_or_default());
        Self {
            status,
            fields: items.map(str::to_string).collect(),
        }
    }

    pub fn code(&self) -> Option<EventCode> {
        self.status.known()
    }

    pub fn is_downlink(&self) -> bool {
        self.code() == Some(EventCode::RecvData)
    }

    pub fn is_benign(&self) -> bool {
        self.code().map(EventCode::is_benign).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Downlink {
    pub port: u8,
    pub rssi: Option<i32>,
    pub snr: Option<i32>,
    /// Length as reported by the module
    pub len: usize,
    pub data: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownlinkParseError {
    #[error("Missing {0} field")]
    MissingField(&'static str),

    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Invalid hex payload: {0}")]
    InvalidPayload(String),
}

impl Downlink {
    /// Parse the fields following a received-data status.
    ///
    /// Layout is `port[,rssi[,snr]],len[,data]`. With three or more fields
    /// the last one is the payload. A final `len:data` field is also accepted.
    pub fn parse(fields: &[String]) -> Result<Self, DownlinkParseError> {
        let mut fields: Vec<&str> = fields.iter().map(|f| f.trim()).collect();

        // `...,len:data` carries length and payload in one field
        let mut data_field = None;
        if let Some(last) = fields.last().copied() {
            if let Some((len, data)) = last.split_once(':') {
                fields.pop();
                fields.push(len);
                data_field = Some(data);
            }
        }
        if data_field.is_none() && fields.len() >= 3 {
            data_field = fields.pop();
        }

        let (port, rest) = fields.split_first().ok_or(DownlinkParseError::MissingField("port"))?;
        let (len, signal) = rest.split_last().ok_or(DownlinkParseError::MissingField("len"))?;

        let port = parse_field::<u8>("port", port)?;
        let len = parse_field::<usize>("len", len)?;
        let rssi = signal.first().map(|v| parse_field::<i32>("rssi", v)).transpose()?;
        let snr = signal.get(1).map(|v| parse_field::<i32>("snr", v)).transpose()?;
        if signal.len() > 2 {
            return Err(DownlinkParseError::InvalidField {
                field: "signal",
                value: signal.join(","),
            });
        }

        let data = match data_field {
            Some(hex_str) if !hex_str.is_empty() => {
                hex::decode(hex_str).map_err(|_| DownlinkParseError::InvalidPayload(hex_str.to_string()))?
            }
            _ => Vec::new(),
        };
        if data.len() != len {
            log::debug!("Downlink on port {} reports len {} but carries {} bytes", port, len, data.len());
        }

        Ok(Self { port, rssi, snr, len, data, received_at: Utc::now() })
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, DownlinkParseError> {
    value.parse().map_err(|_| DownlinkParseError::InvalidField { field, value: value.to_string() })
}
