//! Wire constants and line classification for the RAK811 AT protocol
use std::fmt;

use serde::{Deserialize, Serialize};

pub const EOL: &str = "\r\n";
pub const COMMAND_PREFIX: &str = "at+";

pub const RESPONSE_OK: &str = "OK";
pub const RESPONSE_OK_INIT: &str = "Initialization OK";
pub const RESPONSE_ERROR: &str = "ERROR:";
pub const RESPONSE_EVENT: &str = "at+recv=";

/// The three logical queues incoming lines are demultiplexed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Response,
    Info,
    Event,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Response => "response",
            Channel::Info => "info",
            Channel::Event => "events",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Ok,
    OkInit,
    /// Text following `ERROR:`
    Error(String),
    /// Text following `at+recv=`
    Event(String),
    Info,
}

impl LineClass {
    /// Classify a CRLF-stripped line. Prefixes are tested in a fixed order:
    /// `OK`, `ERROR:`, `at+recv=`, `Initialization OK`, anything else is info.
    pub fn classify(line: &str) -> Self {
        if line.starts_with(RESPONSE_OK) {
            LineClass::Ok
        } else if let Some(rest) = line.strip_prefix(RESPONSE_ERROR) {
            LineClass::Error(rest.to_string())
        } else if let Some(rest) = line.strip_prefix(RESPONSE_EVENT) {
            LineClass::Event(rest.to_string())
        } else if line.starts_with(RESPONSE_OK_INIT) {
            LineClass::OkInit
        } else {
            LineClass::Info
        }
    }

    /// Queues that receive a line of this class, in push order
    pub fn routes(&self) -> &'static [Channel] {
        match self {
            LineClass::Ok | LineClass::OkInit => &[Channel::Response, Channel::Info],
            LineClass::Error(_) => &[Channel::Response],
            LineClass::Event(_) => &[Channel::Event],
            LineClass::Info => &[Channel::Info],
        }
    }
}

/// Frame an AT command for the wire: `at+<command>\r\n`
pub fn format_command(command: &str) -> String {
    format!("{}{}{}", COMMAND_PREFIX, command, EOL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(LineClass::classify("OK"), LineClass::Ok);
        assert_eq!(LineClass::classify("OK V3.0.0.14.H"), LineClass::Ok);
        assert_eq!(LineClass::classify("ERROR: 86"), LineClass::Error(" 86".into()));
        assert_eq!(LineClass::classify("ERROR:86"), LineClass::Error("86".into()));
        assert_eq!(LineClass::classify("at+recv=2,0,0"), LineClass::Event("2,0,0".into()));
        assert_eq!(LineClass::classify("Initialization OK"), LineClass::OkInit);
        assert_eq!(LineClass::classify("LoRa work mode:LoRaWAN"), LineClass::Info);
    }

    #[test]
    fn test_classify_edge_cases() {
        // Bare "ERROR" without the colon is informational
        assert_eq!(LineClass::classify("ERROR"), LineClass::Info);
        assert_eq!(LineClass::classify(""), LineClass::Info);
        // Prefix match is case sensitive
        assert_eq!(LineClass::classify("ok"), LineClass::Info);
        assert_eq!(LineClass::classify("AT+RECV=1"), LineClass::Info);
        assert_eq!(LineClass::classify(" OK"), LineClass::Info);
    }

    #[test]
    fn test_routes() {
        assert_eq!(LineClass::Ok.routes(), &[Channel::Response, Channel::Info]);
        assert_eq!(LineClass::OkInit.routes(), &[Channel::Response, Channel::Info]);
        assert_eq!(LineClass::Error("1".into()).routes(), &[Channel::Response]);
        assert_eq!(LineClass::Event("5".into()).routes(), &[Channel::Event]);
        assert_eq!(LineClass::Info.routes(), &[Channel::Info]);
    }

    #[test]
    fn test_format_command() {
        assert_eq!(format_command("version"), "at+version\r\n");
        assert_eq!(format_command("set_config=lora:dr:5"), "at+set_config=lora:dr:5\r\n");
    }
}
