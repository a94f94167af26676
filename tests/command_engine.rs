mod common;

use std::time::Duration;

use common::{open_scripted, SHORT};
use rak811_at::device::StatusCode;
use rak811_at::{DeviceError, ResponseCode};

#[tokio::test]
async fn test_execute_returns_ok_line_untrimmed() {
    let (device, port) = open_scripted();
    port.reply_to("run", &["OK"]);
    port.reply_to("version", &["OK V3.0.0.14.H"]);

    assert_eq!(device.run().await.unwrap(), "OK");
    assert_eq!(device.execute("version", None).await.unwrap(), "OK V3.0.0.14.H");
    assert_eq!(port.written(), vec!["at+run\r\n", "at+version\r\n"]);
    device.close().await;
}

#[tokio::test]
async fn test_execute_accepts_initialization_ok() {
    let (device, port) = open_scripted();
    port.reply_to("set_config=device:restart", &["UART1 work mode: RUI_UART_NORMAL", "Initialization OK"]);

    let response = device.set_config("device:restart").await.unwrap();
    assert_eq!(response, "Initialization OK");
    device.close().await;
}

#[tokio::test]
async fn test_execute_error_code_becomes_response_error() {
    let (device, port) = open_scripted();
    port.reply_to("join", &["ERROR:99"]);

    match device.join().await {
        Err(DeviceError::Response(err)) => {
            assert_eq!(err.status, StatusCode::Known(ResponseCode::ErrLoRaJoinFailed));
            assert_eq!(err.code(), "99");
            assert_eq!(err.to_string(), "[Errno 99] LoRa join failed");
        }
        other => panic!("expected response error, got {:?}", other),
    }
    device.close().await;
}

#[tokio::test]
async fn test_execute_unknown_code_keeps_raw_value() {
    let (device, port) = open_scripted();
    port.reply_to("help", &["ERROR:9999"]);

    match device.help().await {
        Err(DeviceError::Response(err)) => {
            assert_eq!(err.code(), "9999");
            assert_eq!(err.message(), "Unknown");
        }
        other => panic!("expected response error, got {:?}", other),
    }
    device.close().await;
}

#[tokio::test]
async fn test_execute_times_out_without_reply() {
    let (device, port) = open_scripted();
    let err = device.execute("run", Some(Duration::from_millis(80))).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(port.written(), vec!["at+run\r\n"]);
    device.close().await;
}

#[tokio::test]
async fn test_informational_lines_do_not_answer_a_command() {
    let (device, port) = open_scripted();
    port.reply_to("get_config=lora:status", &["Work Mode: LoRaWAN", "Region: EU868", "OK"]);

    assert_eq!(device.get_config("lora:status").await.unwrap(), "OK");
    let info = device.get_info(Some(SHORT)).await.unwrap();
    assert_eq!(info, vec!["Work Mode: LoRaWAN", "Region: EU868", "OK"]);
    device.close().await;
}

#[tokio::test]
async fn test_send_clears_stale_response() {
    let (device, port) = open_scripted();
    port.reply_to("join", &["OK", "ERROR:86"]);
    port.reply_to("version", &["OK V3.0.0.14.H"]);

    assert_eq!(device.join().await.unwrap(), "OK");
    // Both lines arrive in one read, so ERROR:86 is already queued
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(device.execute("version", Some(SHORT)).await.unwrap(), "OK V3.0.0.14.H");
    device.close().await;
}

#[tokio::test]
async fn test_send_without_clear_sees_stale_response() {
    let (device, port) = open_scripted();
    port.reply_to("join", &["OK", "ERROR:86"]);
    port.reply_to("version", &["OK V3.0.0.14.H"]);

    assert_eq!(device.join().await.unwrap(), "OK");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let transport = device.transport();
    transport.send("version", false).await.unwrap();
    assert_eq!(transport.take_response(Some(SHORT)).await.unwrap(), "ERROR:86");
    assert_eq!(transport.take_response(Some(SHORT)).await.unwrap(), "OK V3.0.0.14.H");
    device.close().await;
}

#[tokio::test]
async fn test_version_returns_status_and_info() {
    let (device, port) = open_scripted();
    port.reply_to("version", &["OK V3.0.0.14.H"]);

    let (response, info) = device.version().await.unwrap();
    assert_eq!(response, "OK V3.0.0.14.H");
    assert_eq!(info, vec!["OK V3.0.0.14.H"]);
    device.close().await;
}

#[tokio::test]
async fn test_send_payloads_are_hex_encoded() {
    let (device, port) = open_scripted();
    port.reply_to("send=lora:5:48656c6c6f20576f726c64", &["OK"]);
    port.reply_to("send=uart:3:0102ff", &["OK"]);
    port.reply_to("send=lorap2p:cafe", &["OK"]);

    device.send_lora("Hello World", 5).await.unwrap();
    device.send_uart([0x01u8, 0x02, 0xFF], 3).await.unwrap();
    device.send_lorap2p(vec![0xCAu8, 0xFE]).await.unwrap();

    assert_eq!(
        port.written(),
        vec![
            "at+send=lora:5:48656c6c6f20576f726c64\r\n",
            "at+send=uart:3:0102ff\r\n",
            "at+send=lorap2p:cafe\r\n",
        ]
    );
    device.close().await;
}

#[tokio::test]
async fn test_send_discards_half_received_line() {
    let (device, port) = open_scripted();
    port.inject_raw(b"ERROR:8");
    tokio::time::sleep(Duration::from_millis(60)).await;
    // The tail of the stale line only arrives after the command is written
    port.reply_to("version", &["6", "OK V3.0.0.14.H"]);

    assert_eq!(device.execute("version", Some(SHORT)).await.unwrap(), "OK V3.0.0.14.H");
    let info = device.get_info(Some(SHORT)).await.unwrap();
    assert_eq!(info, vec!["6", "OK V3.0.0.14.H"]);
    device.close().await;
}
