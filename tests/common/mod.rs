#![allow(dead_code)]
use std::time::Duration;

use rak811_at::serial::unified::Transport;
use rak811_at::{Rak811, ScriptedPort, SessionConfig};

pub const SHORT: Duration = Duration::from_millis(150);

/// Timeouts short enough to keep the suite fast
pub fn test_config() -> SessionConfig {
    SessionConfig {
        port: "scripted".into(),
        read_timeout_ms: 20,
        response_timeout_ms: 300,
        event_timeout_ms: 300,
        join_timeout_ms: 500,
        ..SessionConfig::default()
    }
}

pub fn open_scripted() -> (Rak811, ScriptedPort) {
    let port = ScriptedPort::new();
    let device = Rak811::from_io(Box::new(port.clone()), test_config());
    (device, port)
}

/// Wait until the reader task has exited, e.g. after `ScriptedPort::unplug`
pub async fn wait_for_reader_stop(transport: &Transport) {
    let stopped = async {
        while transport.is_alive() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), stopped)
        .await
        .expect("reader task did not stop");
}
