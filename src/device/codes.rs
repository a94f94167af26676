//! RAK811 status codes, their messages, and the errors built from them
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A catalog of numeric status codes with a catch-all entry
pub trait CodeTable: Copy + fmt::Debug + 'static {
    const UNKNOWN_MESSAGE: &'static str;

    fn from_code(code: i32) -> Option<Self>;
    fn code(self) -> i32;
    fn message(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    Unknown = -1,
    BadATCmd = 1,
    InvCmdParam = 2,
    ErrRdWrFlash = 3,
    ErrRdWrIIC = 4,
    ErrSndUart = 5,
    ErrBleInvState = 41,
    LoRaBusy = 80,
    LoRaSvcUnk = 81,
    LoRaParamInv = 82,
    LoRaFreqInv = 83,
    LoRaDRInv = 84,
    LoRaFreqDRInv = 85,
    DevNotJoined = 86,
    PktTooLong = 87,
    SvcClosed = 88,
    UnsuppRegion = 89,
    DutyCycleRestricted = 90,
    NoValidChanFnd = 91,
    NoFreeChanFnd = 92,
    StatusError = 93,
    LoRaTxTimeOut = 94,
    LoRaRx1TimeOut = 95,
    LoRaRx2TimeOut = 96,
    ErrRecvRx1 = 97,
    ErrRecvRx2 = 98,
    ErrLoRaJoinFailed = 99,
    DwnLnkRepeated = 100,
    ErrPayLoadSz = 101,
    ErrMnyDwnLinkFrameLost = 102,
    ErrAddrFail = 103,
    ErrVerifyMIC = 104,
}

impl ResponseCode {
    pub const ALL: [ResponseCode; 32] = [
        ResponseCode::Unknown,
        ResponseCode::BadATCmd,
        ResponseCode::InvCmdParam,
        ResponseCode::ErrRdWrFlash,
        ResponseCode::ErrRdWrIIC,
        ResponseCode::ErrSndUart,
        ResponseCode::ErrBleInvState,
        ResponseCode::LoRaBusy,
        ResponseCode::LoRaSvcUnk,
        ResponseCode::LoRaParamInv,
        ResponseCode::LoRaFreqInv,
        ResponseCode::LoRaDRInv,
        ResponseCode::LoRaFreqDRInv,
        ResponseCode::DevNotJoined,
        ResponseCode::PktTooLong,
        ResponseCode::SvcClosed,
        ResponseCode::UnsuppRegion,
        ResponseCode::DutyCycleRestricted,
        ResponseCode::NoValidChanFnd,
        ResponseCode::NoFreeChanFnd,
        ResponseCode::StatusError,
        ResponseCode::LoRaTxTimeOut,
        ResponseCode::LoRaRx1TimeOut,
        ResponseCode::LoRaRx2TimeOut,
        ResponseCode::ErrRecvRx1,
        ResponseCode::ErrRecvRx2,
        ResponseCode::ErrLoRaJoinFailed,
        ResponseCode::DwnLnkRepeated,
        ResponseCode::ErrPayLoadSz,
        ResponseCode::ErrMnyDwnLinkFrameLost,
        ResponseCode::ErrAddrFail,
        ResponseCode::ErrVerifyMIC,
    ];
}

static RESPONSE_CODES: Lazy<HashMap<i32, ResponseCode>> =
    Lazy::new(|| ResponseCode::ALL.iter().map(|c| (*c as i32, *c)).collect());

impl CodeTable for ResponseCode {
    const UNKNOWN_MESSAGE: &'static str = "Unknown";

    fn from_code(code: i32) -> Option<Self> {
        RESPONSE_CODES.get(&code).copied()
    }

    fn code(self) -> i32 {
        self as i32
    }

    fn message(self) -> &'static str {
        match self {
            ResponseCode::Unknown => Self::UNKNOWN_MESSAGE,
            ResponseCode::BadATCmd => "BAD AT Command",
            ResponseCode::InvCmdParam => "Invalid parameter in AT command",
            ResponseCode::ErrRdWrFlash => "Error reading or writing flash",
            ResponseCode::ErrRdWrIIC => "Error reading or writing through IIC",
            ResponseCode::ErrSndUart => "Error sending through UART",
            ResponseCode::ErrBleInvState => "BLE in invalid state",
            ResponseCode::LoRaBusy => "LoRa busy",
            ResponseCode::LoRaSvcUnk => "LoRa service unknown",
            ResponseCode::LoRaParamInv => "LoRa parameters invalid",
            ResponseCode::LoRaFreqInv => "LoRa frequency invalid",
            ResponseCode::LoRaDRInv => "LoRa datarate invalid",
            ResponseCode::LoRaFreqDRInv => "LoRa frequency and datarate are invalid",
            ResponseCode::DevNotJoined => "Device has not joined a LoRa network",
            ResponseCode::PktTooLong => "Packet too long to be sent",
            ResponseCode::SvcClosed => "Service closed by server",
            ResponseCode::UnsuppRegion => "Unsupported region",
            ResponseCode::DutyCycleRestricted => "Duty cycle restricted",
            ResponseCode::NoValidChanFnd => "No valid channel can be found",
            ResponseCode::NoFreeChanFnd => "No free channel found",
            ResponseCode::StatusError => "Status is error",
            ResponseCode::LoRaTxTimeOut => "LoRa transmit timeout",
            ResponseCode::LoRaRx1TimeOut => "LoRa RX1 timeout",
            ResponseCode::LoRaRx2TimeOut => "LoRa RX2 timeout",
            ResponseCode::ErrRecvRx1 => "Error receiving in RX1",
            ResponseCode::ErrRecvRx2 => "Error receiving in RX2",
            ResponseCode::ErrLoRaJoinFailed => "LoRa join failed",
            ResponseCode::DwnLnkRepeated => "Downlink repeated",
            ResponseCode::ErrPayLoadSz => "Payload size error with transmit DR",
            ResponseCode::ErrMnyDwnLinkFrameLost => "Too many downlink frames lost",
            ResponseCode::ErrAddrFail => "Address fail",
            ResponseCode::ErrVerifyMIC => "Error verifying MIC",
        }
    }
}

/// Status field of an `at+recv=` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCode {
    Unknown = -1,
    TxConfirmed = 1,
    TxUnconfirmed = 2,
    JoinSuccess = 3,
    JoinFailed = 4,
    RecvData = 5,
    LoRaBusy = 80,
    LoRaSvcUnk = 81,
    LoRaParamInv = 82,
    LoRaFreqInv = 83,
    LoRaDRInv = 84,
    LoRaFreqDRInv = 85,
    DevNotJoined = 86,
    PktTooLong = 87,
    SvcClosed = 88,
    UnsuppRegion = 89,
    DutyCycleRestricted = 90,
    NoValidChanFnd = 91,
    NoFreeChanFnd = 92,
    StatusError = 93,
    LoRaTxTimeOut = 94,
    LoRaRx1TimeOut = 95,
    LoRaRx2TimeOut = 96,
    ErrRecvRx1 = 97,
    ErrRecvRx2 = 98,
    ErrLoRaJoinFailed = 99,
    DwnLnkRepeated = 100,
    ErrPayLoadSz = 101,
    ErrMnyDwnLinkFrameLost = 102,
    ErrAddrFail = 103,
    ErrVerifyMIC = 104,
}

impl EventCode {
    pub const ALL: [EventCode; 31] = [
        EventCode::Unknown,
        EventCode::TxConfirmed,
        EventCode::TxUnconfirmed,
        EventCode::JoinSuccess,
        EventCode::JoinFailed,
        EventCode::RecvData,
        EventCode::LoRaBusy,
        EventCode::LoRaSvcUnk,
        EventCode::LoRaParamInv,
        EventCode::LoRaFreqInv,
        EventCode::LoRaDRInv,
        EventCode::LoRaFreqDRInv,
        EventCode::DevNotJoined,
        EventCode::PktTooLong,
        EventCode::SvcClosed,
        EventCode::UnsuppRegion,
        EventCode::DutyCycleRestricted,
        EventCode::NoValidChanFnd,
        EventCode::NoFreeChanFnd,
        EventCode::StatusError,
        EventCode::LoRaTxTimeOut,
        EventCode::LoRaRx1TimeOut,
        EventCode::LoRaRx2TimeOut,
        EventCode::ErrRecvRx1,
        EventCode::ErrRecvRx2,
        EventCode::ErrLoRaJoinFailed,
        EventCode::DwnLnkRepeated,
        EventCode::ErrPayLoadSz,
        EventCode::ErrMnyDwnLinkFrameLost,
        EventCode::ErrAddrFail,
        EventCode::ErrVerifyMIC,
    ];

    /// Outcomes that are not failures: data received, or a send completed
    pub fn is_benign(self) -> bool {
        matches!(self, EventCode::RecvData | EventCode::TxConfirmed | EventCode::TxUnconfirmed)
    }
}

static EVENT_CODES: Lazy<HashMap<i32, EventCode>> =
    Lazy::new(|| EventCode::ALL.iter().map(|c| (*c as i32, *c)).collect());

impl CodeTable for EventCode {
    const UNKNOWN_MESSAGE: &'static str = "Unknown";

    fn from_code(code: i32) -> Option<Self> {
        EVENT_CODES.get(&code).copied()
    }

    fn code(self) -> i32 {
        self as i32
    }

    fn message(self) -> &'static str {
        match self {
            EventCode::Unknown => Self::UNKNOWN_MESSAGE,
            EventCode::TxConfirmed => "Confirmed send acknowledged",
            EventCode::TxUnconfirmed => "Unconfirmed send completed",
            EventCode::JoinSuccess => "Join succeeded",
            EventCode::JoinFailed => "Join failed",
            EventCode::RecvData => "Received downlink data",
            // LoRa failures share the response table's wording
            other => ResponseCode::from_code(other as i32)
                .map(ResponseCode::message)
                .unwrap_or(Self::UNKNOWN_MESSAGE),
        }
    }
}

/// A status code as reported by the module: resolved against a catalog when
/// it is a recognised integer, otherwise kept as the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode<C: CodeTable> {
    Known(C),
    Unknown(String),
}

impl<C: CodeTable> StatusCode<C> {
    pub fn resolve(raw: &str) -> Self {
        match raw.trim().parse::<i32>().ok().and_then(C::from_code) {
            Some(code) => StatusCode::Known(code),
            None => StatusCode::Unknown(raw.trim().to_string()),
        }
    }

    /// The numeric value, when the module sent one
    pub fn value(&self) -> Option<i32> {
        match self {
            StatusCode::Known(code) => Some(code.code()),
            StatusCode::Unknown(raw) => raw.parse().ok(),
        }
    }

    pub fn known(&self) -> Option<C> {
        match self {
            StatusCode::Known(code) => Some(*code),
            StatusCode::Unknown(_) => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            StatusCode::Known(code) => code.message(),
            StatusCode::Unknown(_) => C::UNKNOWN_MESSAGE,
        }
    }
}

impl<C: CodeTable> fmt::Display for StatusCode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Known(code) => write!(f, "{}", code.code()),
            StatusCode::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// The module answered a command with `ERROR:<code>` or something unexpected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[Errno {status}] {}", .status.message())]
pub struct ResponseError {
    pub status: StatusCode<ResponseCode>,
}

impl ResponseError {
    pub fn new(code: &str) -> Self {
        Self { status: StatusCode::resolve(code) }
    }

    pub fn code(&self) -> String {
        self.status.to_string()
    }

    pub fn message(&self) -> &'static str {
        self.status.message()
    }
}

/// An event carried a status outside the benign set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[Errno {status}] {}", .status.message())]
pub struct EventError {
    pub status: StatusCode<EventCode>,
}

impl EventError {
    pub fn new(status: &str) -> Self {
        Self { status: StatusCode::resolve(status) }
    }

    pub fn code(&self) -> String {
        self.status.to_string()
    }

    pub fn message(&self) -> &'static str {
        self.status.message()
    }
}
