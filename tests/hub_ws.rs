//! End-to-end tests: a real server on an ephemeral port driven by
//! `tokio-tungstenite` and `reqwest`.

#![allow(clippy::panic, missing_docs)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use topic_hub::app_state::AppState;
use topic_hub::config::HubConfig;
use topic_hub::domain::{EventEnvelope, Topic};
use topic_hub::server::build_app;
use topic_hub::service::Hub;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

async fn spawn_server() -> (SocketAddr, Hub) {
    let hub = Hub::new(64);
    let app = build_app(AppState::new(hub.clone(), HubConfig::default()));
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, hub)
}

/// Connects and consumes the initial `ready` frame.
async fn connect(addr: SocketAddr) -> Client {
    let Ok((mut ws, _)) = connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect failed");
    };
    assert_eq!(next_json(&mut ws).await, json!({"type": "ready"}));
    ws
}

/// Reads the next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut Client) -> Value {
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(WAIT, ws.next()).await else {
            panic!("no frame received");
        };
        if let Message::Text(text) = msg {
            let Ok(value) = serde_json::from_str(text.as_str()) else {
                panic!("frame is not JSON: {}", text.as_str());
            };
            return value;
        }
    }
}

async fn send(ws: &mut Client, text: &str) {
    if ws.send(Message::text(text)).await.is_err() {
        panic!("send failed");
    }
}

async fn subscribe(ws: &mut Client, raw: &str) {
    send(ws, &format!(r#"{{"type":"subscribe","topic":"{raw}"}}"#)).await;
    assert_eq!(
        next_json(ws).await,
        json!({"type": "subscribed", "topic": raw})
    );
}

/// Asserts that no text frame arrives within a short window.
async fn assert_silent(ws: &mut Client) {
    let res = tokio::time::timeout(Duration::from_millis(150), ws.next()).await;
    if let Ok(Some(Ok(Message::Text(text)))) = res {
        panic!("unexpected frame: {}", text.as_str());
    }
}

/// Polls until the hub has forgotten every connection.
async fn wait_for_no_connections(hub: &Hub) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while hub.stats().await.connections > 0 {
        if tokio::time::Instant::now() > deadline {
            panic!("connections were not cleaned up");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn topic(raw: &str) -> Topic {
    let Ok(topic) = Topic::parse(raw) else {
        panic!("invalid test topic {raw}");
    };
    topic
}

#[tokio::test]
async fn connect_receives_ready() {
    let (addr, hub) = spawn_server().await;
    let mut ws = connect(addr).await;
    assert_eq!(hub.stats().await.connections, 1);

    send(&mut ws, r#"{"type":"ping"}"#).await;
    assert_eq!(next_json(&mut ws).await, json!({"type": "ready"}));
}

#[tokio::test]
async fn subscribe_then_publish_reaches_subscriber_only() {
    let (addr, hub) = spawn_server().await;
    let mut subscriber = connect(addr).await;
    let mut bystander = connect(addr).await;

    send(&mut subscriber, r#"{"type":"subscribe","topic":"order:123"}"#).await;
    assert_eq!(
        next_json(&mut subscriber).await,
        json!({"type": "subscribed", "topic": "order:123"})
    );

    let event = EventEnvelope::new("order.created", json!({"total": 42}));
    assert_eq!(hub.publish(&topic("order:123"), event).await, 1);

    assert_eq!(
        next_json(&mut subscriber).await,
        json!({
            "type": "event",
            "topic": "order:123",
            "event": {"name": "order.created", "payload": {"total": 42}}
        })
    );
    assert_silent(&mut bystander).await;
}

#[tokio::test]
async fn invalid_topic_is_rejected() {
    let (addr, hub) = spawn_server().await;
    let mut ws = connect(addr).await;

    send(&mut ws, r#"{"type":"subscribe","topic":"bogus:xyz"}"#).await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "error", "message": "Invalid topic"})
    );
    assert_eq!(hub.stats().await.subscriptions, 0);
    assert!(
        hub.publish_raw("bogus:xyz", EventEnvelope::new("x", Value::Null))
            .await
            .is_err()
    );
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn abrupt_disconnect_cleans_up_subscriptions() {
    let (addr, hub) = spawn_server().await;
    let mut ws = connect(addr).await;

    send(&mut ws, r#"{"type":"subscribe","topic":"driver:77"}"#).await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "subscribed", "topic": "driver:77"})
    );
    drop(ws);

    wait_for_no_connections(&hub).await;
    let stats = hub.stats().await;
    assert_eq!(stats.topics, 0);
    assert_eq!(stats.subscriptions, 0);
    assert_eq!(
        hub.publish(&topic("driver:77"), EventEnvelope::new("driver.moved", Value::Null))
            .await,
        0
    );
}

#[tokio::test]
async fn malformed_frame_keeps_connection_open() {
    let (addr, _hub) = spawn_server().await;
    let mut ws = connect(addr).await;

    send(&mut ws, "not-json").await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "error", "message": "Invalid JSON"})
    );

    send(&mut ws, r#"{"type":"teleport"}"#).await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "error", "message": "Unknown message type"})
    );

    send(&mut ws, r#"{"type":"subscribe","topic":"city:berlin"}"#).await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "subscribed", "topic": "city:berlin"})
    );
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let (addr, hub) = spawn_server().await;
    let mut ws = connect(addr).await;

    subscribe(&mut ws, "controlcenter:hq").await;
    send(&mut ws, r#"{"type":"unsubscribe","topic":"controlcenter:hq"}"#).await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "unsubscribed", "topic": "controlcenter:hq"})
    );

    assert_eq!(
        hub.publish(&topic("controlcenter:hq"), EventEnvelope::new("x", Value::Null))
            .await,
        0
    );
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn upgrade_outside_hub_path_is_refused() {
    let (addr, hub) = spawn_server().await;
    let result = connect_async(format!("ws://{addr}/socket")).await;
    assert!(result.is_err());
    assert_eq!(hub.stats().await.connections, 0);
}

#[tokio::test]
async fn nested_hub_path_is_accepted() {
    let (addr, _hub) = spawn_server().await;
    let Ok((mut ws, _)) = connect_async(format!("ws://{addr}/ws/dispatch")).await else {
        panic!("ws connect failed");
    };
    assert_eq!(next_json(&mut ws).await, json!({"type": "ready"}));
}

#[tokio::test]
async fn shutdown_closes_clients() {
    let (addr, hub) = spawn_server().await;
    let mut ws = connect(addr).await;

    assert_eq!(hub.shutdown().await, 1);
    let closed = tokio::time::timeout(WAIT, async {
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                return true;
            }
        }
        true
    })
    .await;
    assert_eq!(closed.ok(), Some(true));
    wait_for_no_connections(&hub).await;
}

#[tokio::test]
async fn rest_publish_fans_out() {
    let (addr, _hub) = spawn_server().await;
    let mut ws = connect(addr).await;
    subscribe(&mut ws, "order:9").await;

    let client = reqwest::Client::new();
    let Ok(resp) = client
        .post(format!("http://{addr}/api/v1/publish"))
        .json(&json!({
            "topic": "order:9",
            "event": {"name": "order.updated", "payload": {"status": "picked_up"}}
        }))
        .send()
        .await
    else {
        panic!("publish request failed");
    };
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let Ok(body) = resp.json::<Value>().await else {
        panic!("publish response is not JSON");
    };
    assert_eq!(body, json!({"topic": "order:9", "delivered": 1}));

    assert_eq!(
        next_json(&mut ws).await,
        json!({
            "type": "event",
            "topic": "order:9",
            "event": {"name": "order.updated", "payload": {"status": "picked_up"}}
        })
    );
}

#[tokio::test]
async fn rest_publish_rejects_invalid_topic() {
    let (addr, _hub) = spawn_server().await;
    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/publish"))
        .json(&json!({"topic": "vehicle:1", "event": {"name": "x"}}))
        .send()
        .await
    else {
        panic!("publish request failed");
    };
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let Ok(body) = resp.json::<Value>().await else {
        panic!("error response is not JSON");
    };
    assert_eq!(body.pointer("/error/code"), Some(&json!(1002)));
}

#[tokio::test]
async fn rest_introspection_reports_topics_and_stats() {
    let (addr, _hub) = spawn_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    subscribe(&mut a, "city:1").await;
    subscribe(&mut b, "city:1").await;
    subscribe(&mut b, "order:2").await;

    let client = reqwest::Client::new();
    let Ok(topics) = client
        .get(format!("http://{addr}/api/v1/topics"))
        .send()
        .await
    else {
        panic!("topics request failed");
    };
    let Ok(topics) = topics.json::<Value>().await else {
        panic!("topics response is not JSON");
    };
    assert_eq!(
        topics,
        json!([
            {"topic": "city:1", "subscribers": 2},
            {"topic": "order:2", "subscribers": 1}
        ])
    );

    let Ok(stats) = client
        .get(format!("http://{addr}/api/v1/stats"))
        .send()
        .await
    else {
        panic!("stats request failed");
    };
    let Ok(stats) = stats.json::<Value>().await else {
        panic!("stats response is not JSON");
    };
    assert_eq!(
        stats,
        json!({"connections": 2, "topics": 2, "subscriptions": 3})
    );
}

#[tokio::test]
async fn health_reports_version() {
    let (addr, _hub) = spawn_server().await;
    let Ok(resp) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request failed");
    };
    let Ok(body) = resp.json::<Value>().await else {
        panic!("health response is not JSON");
    };
    assert_eq!(body.get("status"), Some(&json!("healthy")));
    assert_eq!(
        body.get("version"),
        Some(&json!(env!("CARGO_PKG_VERSION")))
    );
}
