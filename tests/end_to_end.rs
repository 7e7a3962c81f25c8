//! End-to-end scenarios from spec §8, run against the real dispatcher
//! binary's library entry point with a `FakeBus` standing in for Redis.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use dispatch_bus::{keys, push_command, Bus};
use dispatch_test_support::{FakeBus, MockDeviceClient};
use dispatcher::Config;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn test_config(port: u16) -> Config {
    Config {
        host: "127.0.0.1".to_owned(),
        port,
        bus_url: String::new(),
    }
}

async fn connect_with_retries(addr: &str) -> MockDeviceClient {
    for _ in 0..100 {
        if let Ok(client) = MockDeviceClient::connect(addr).await {
            return client;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("dispatcher never started listening on {addr}");
}

#[tokio::test]
async fn happy_path_single_node() {
    let bus = Arc::new(FakeBus::new());
    let port = 16_551;
    tokio::spawn(dispatcher::run(test_config(port), bus.clone()));

    let addr = format!("127.0.0.1:{port}");
    let mut device = connect_with_retries(&addr).await;
    device
        .handshake(&json!({"type": "logical", "device_name": "D", "num_nodes": 1}))
        .await
        .unwrap();

    // Give the handshake a moment to land in the registry before pushing.
    tokio::time::sleep(Duration::from_millis(100)).await;

    push_command(
        bus.as_ref(),
        "127.0.0.1:D",
        &json!({"command": "start", "config": {}, "node_id": "n1", "scenario_name": "s"}).to_string(),
    )
    .await
    .unwrap();

    let envelope = device.recv(RECV_TIMEOUT).await.unwrap();
    assert_eq!(envelope["index"], 0);
    assert_eq!(envelope["command"], "start");
    assert_eq!(envelope["node_id"], "n1");

    device.send(&json!({"status": "success", "node_id": "n1"})).await.unwrap();

    assert_eq!(
        wait_for_ledger(bus.as_ref(), "n1", Duration::from_secs(2)).await,
        Some("completed".to_owned())
    );
}

#[tokio::test]
async fn device_reported_failure_marks_ledger_failed() {
    let bus = Arc::new(FakeBus::new());
    let port = 16_552;
    tokio::spawn(dispatcher::run(test_config(port), bus.clone()));

    let addr = format!("127.0.0.1:{port}");
    let mut device = connect_with_retries(&addr).await;
    device
        .handshake(&json!({"type": "logical", "device_name": "D2", "num_nodes": 1}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    push_command(
        bus.as_ref(),
        "127.0.0.1:D2",
        &json!({"command": "start", "node_id": "n2"}).to_string(),
    )
    .await
    .unwrap();

    let _envelope = device.recv(RECV_TIMEOUT).await.unwrap();
    device.send(&json!({"status": "error", "node_id": "n2"})).await.unwrap();

    assert_eq!(
        wait_for_ledger(bus.as_ref(), "n2", Duration::from_secs(2)).await,
        Some("failed".to_owned())
    );
}

#[tokio::test]
async fn disconnect_flag_flushes_queued_commands_to_failed() {
    let bus = Arc::new(FakeBus::new());
    let port = 16_553;
    tokio::spawn(dispatcher::run(test_config(port), bus.clone()));

    let addr = format!("127.0.0.1:{port}");
    let mut device = connect_with_retries(&addr).await;
    device
        .handshake(&json!({"type": "logical", "device_name": "D3", "num_nodes": 1}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    for (node_id, _) in [("x", 1), ("y", 2), ("z", 3)] {
        push_command(
            bus.as_ref(),
            "127.0.0.1:D3",
            &json!({"command": "start", "node_id": node_id}).to_string(),
        )
        .await
        .unwrap();
    }

    bus.set(&keys::disconnect_key("127.0.0.1:D3"), "true").await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    for node_id in ["x", "y", "z"] {
        assert_eq!(
            bus.get(&format!("flow_execution:{node_id}")).await.unwrap(),
            Some("failed".to_owned()),
            "node {node_id} should have been flushed to failed"
        );
    }
    assert!(bus.get(keys::CONNECTED_DEVICES).await.unwrap().is_some());
    assert!(!bus
        .get(keys::CONNECTED_DEVICES)
        .await
        .unwrap()
        .unwrap()
        .contains("127.0.0.1:D3"));
}

#[tokio::test]
async fn physical_direct_command_round_trips_through_bridge() {
    let bus = Arc::new(FakeBus::new());
    let port = 16_554;
    tokio::spawn(dispatcher::run(test_config(port), bus.clone()));

    let addr = format!("127.0.0.1:{port}");
    let mut device = connect_with_retries(&addr).await;
    device.handshake(&json!({"type": "physical"})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let bridge_bus = bus.clone();
    let bridge = tokio::spawn(async move {
        dispatch_bus::send_direct_command(
            bridge_bus.as_ref(),
            "127.0.0.1",
            &dispatch_protocol::PhysicalCommand {
                action: dispatch_protocol::PhysicalAction::GetMetrics,
                params: json!({}),
            },
            Duration::from_secs(5),
        )
        .await
    });

    let command = device.recv(RECV_TIMEOUT).await.unwrap();
    assert_eq!(command["action"], "get_metrics");
    device
        .send(&json!({"status": "success", "message": "ok", "data": {"cpu": 12}}))
        .await
        .unwrap();

    let ack = bridge.await.unwrap().unwrap();
    assert_eq!(ack.message, "ok");
    assert_eq!(ack.data["cpu"], 12);
}

/// Spec §8 scenario 2: a 3-node device with two envelopes queued on
/// sub-device 1 (`a`, `b`) and one on sub-device 2 (`c`); sub-device 3 never
/// has anything queued. Round-robin must dispatch `_1:a, _2:c, _3(miss),
/// _1:b` over the shared socket — sub-device 3's empty pop produces no
/// frame at all, it just advances the counter.
#[tokio::test]
async fn multi_node_round_robin_dispatches_expected_order() {
    let bus = Arc::new(FakeBus::new());
    let port = 16_555;
    tokio::spawn(dispatcher::run(test_config(port), bus.clone()));

    let addr = format!("127.0.0.1:{port}");
    let mut device = connect_with_retries(&addr).await;
    device
        .handshake(&json!({"type": "logical", "device_name": "M", "num_nodes": 3}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    push_command(
        bus.as_ref(),
        "127.0.0.1:M_1",
        &json!({"command": "start", "node_id": "a"}).to_string(),
    )
    .await
    .unwrap();
    push_command(
        bus.as_ref(),
        "127.0.0.1:M_1",
        &json!({"command": "start", "node_id": "b"}).to_string(),
    )
    .await
    .unwrap();
    push_command(
        bus.as_ref(),
        "127.0.0.1:M_2",
        &json!({"command": "start", "node_id": "c"}).to_string(),
    )
    .await
    .unwrap();

    for (expected_index, expected_node) in [(0, "a"), (1, "c"), (0, "b")] {
        let envelope = device.recv(RECV_TIMEOUT).await.unwrap();
        assert_eq!(envelope["index"], expected_index);
        assert_eq!(envelope["node_id"], expected_node);
        device
            .send(&json!({"status": "success", "node_id": expected_node}))
            .await
            .unwrap();
    }

    for node_id in ["a", "b", "c"] {
        assert_eq!(
            wait_for_ledger(bus.as_ref(), node_id, Duration::from_secs(2)).await,
            Some("completed".to_owned()),
            "node {node_id} should have completed"
        );
    }
}

/// Spec §8 scenario 6: while a session is active, the operator sets
/// `tcp_server:status = "stopped"`. The session must close at its next Idle
/// tick and the acceptor must stop accepting new connections entirely.
#[tokio::test]
async fn server_stop_tears_down_active_sessions_and_stops_accepting() {
    let bus = Arc::new(FakeBus::new());
    let port = 16_556;
    tokio::spawn(dispatcher::run(test_config(port), bus.clone()));

    let addr = format!("127.0.0.1:{port}");
    let mut device = connect_with_retries(&addr).await;
    device
        .handshake(&json!({"type": "logical", "device_name": "P", "num_nodes": 1}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    bus.set(keys::SERVER_STATUS, "stopped").await.unwrap();

    let closed = device.recv(Duration::from_secs(2)).await;
    assert!(closed.is_err(), "session should have closed after server stop");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(
        MockDeviceClient::connect(&addr).await.is_err(),
        "acceptor should refuse new connections once stopped"
    );
}

async fn wait_for_ledger(bus: &FakeBus, node_id: &str, within: Duration) -> Option<String> {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if let Some(value) = bus.get(&format!("flow_execution:{node_id}")).await.unwrap() {
            if value == "completed" || value == "failed" {
                return Some(value);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
