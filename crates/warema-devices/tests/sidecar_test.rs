//! Gateway daemon client tests against a local listener

use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::timeout;

use warema_core::DeviceId;
use warema_devices::gateway::{GatewayConfig, SidecarGateway};
use warema_devices::{AdapterError, Gateway, GatewayEvent};

fn config(addr: String) -> GatewayConfig {
    GatewayConfig {
        addr,
        reconnect_delay: Duration::from_millis(50),
        ..GatewayConfig::default()
    }
}

#[tokio::test]
async fn test_init_events_and_requests() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let (gateway, mut events) = SidecarGateway::connect(config(addr)).unwrap();
    let (socket, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .unwrap()
        .unwrap();
    let (read, mut write) = socket.into_split();
    let mut lines = BufReader::new(read).lines();

    // init comes first on every connection
    let init: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(init["method"], "init");
    assert_eq!(init["params"]["channel"], 17);

    write
        .write_all(b"{\"topic\":\"wms-vb-init-completion\"}\n\ngarbage\n{\"topic\":\"wms-vb-blind-position-update\",\"payload\":{\"snr\":5,\"position\":10,\"angle\":0}}\n")
        .await
        .unwrap();

    let first = timeout(Duration::from_secs(5), events.recv()).await.unwrap();
    assert_eq!(first, Some(GatewayEvent::InitCompletion));
    let second = timeout(Duration::from_secs(5), events.recv()).await.unwrap();
    assert!(matches!(second, Some(GatewayEvent::PositionUpdate(_))));

    assert!(gateway.is_connected().await);
    gateway
        .set_position(DeviceId::new(969444).unwrap(), 40, -10)
        .await
        .unwrap();
    gateway.scan_devices(false).await.unwrap();

    let request: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(
        request,
        json!({"method": "vnBlindSetPosition", "params": {"snr": 969444, "position": 40, "angle": -10}})
    );
    let request: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(
        request,
        json!({"method": "scanDevices", "params": {"autoAssignBlinds": false}})
    );
}

#[tokio::test]
async fn test_reconnect_sends_init_again() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let (_gateway, _events) = SidecarGateway::connect(config(addr)).unwrap();

    for _ in 0..2 {
        let (socket, _) = timeout(Duration::from_secs(5), listener.accept())
            .await
            .unwrap()
            .unwrap();
        let mut lines = BufReader::new(socket).lines();
        let init: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(init["method"], "init");
        // dropping the socket closes the connection
    }
}

#[tokio::test]
async fn test_requests_fail_while_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let (gateway, _events) = SidecarGateway::connect(config(addr)).unwrap();

    let result = gateway.stop(DeviceId::new(1).unwrap()).await;
    assert!(matches!(result, Err(AdapterError::Connection(_))));
}
