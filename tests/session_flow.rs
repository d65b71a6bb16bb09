//! End-to-end tests for the session pipeline over an in-process transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use chat_gateway::config::GatewayConfig;
use chat_gateway::permission::ConfigResolver;
use chat_gateway::routing::{handler, MatchKind, Router};
use chat_gateway::{Event, PermissionLevel, Session};

mod common;

fn resolver() -> Box<ConfigResolver> {
    Box::new(ConfigResolver::new(vec![], vec![], vec![]))
}

#[tokio::test]
async fn command_routes_end_to_end() {
    let (server, mut client) = common::ws_pair().await;

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<Event>();
    let mut builder = Router::builder(resolver());
    builder
        .on_command(
            MatchKind::FullMatch,
            "ping",
            handler(move |event, _api| {
                let seen = seen_tx.clone();
                async move {
                    let _ = seen.send(event);
                }
            }),
            PermissionLevel::Normal,
            false,
        )
        .unwrap();
    let router = Arc::new(builder.build());

    let session = Session::start(server, router, &GatewayConfig::default());

    client
        .send(Message::Text(common::message_frame(9, "ping").into()))
        .await
        .unwrap();

    let event = timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("handler should run")
        .unwrap();
    assert_eq!(event.message(), Some("ping"));
    assert_eq!(event.user_id(), Some(9));

    session.shutdown().await;
}

#[tokio::test]
async fn pipeline_survives_malformed_frames() {
    let (server, mut client) = common::ws_pair().await;

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<Event>();
    let mut builder = Router::builder(resolver());
    builder
        .on_command(
            MatchKind::FullMatch,
            "ping",
            handler(move |event, _api| {
                let seen = seen_tx.clone();
                async move {
                    let _ = seen.send(event);
                }
            }),
            PermissionLevel::Normal,
            false,
        )
        .unwrap();
    let router = Arc::new(builder.build());

    let session = Session::start(server, router, &GatewayConfig::default());

    // A malformed frame is dropped; the frame after it still routes.
    client
        .send(Message::Text("{definitely not json".into()))
        .await
        .unwrap();
    client
        .send(Message::Text(common::message_frame(9, "ping").into()))
        .await
        .unwrap();

    let event = timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("pipeline should keep processing")
        .unwrap();
    assert_eq!(event.message(), Some("ping"));

    session.shutdown().await;
}

#[tokio::test]
async fn echo_correlation_round_trip() {
    let (server, mut client) = common::ws_pair().await;
    let router = Arc::new(Router::builder(resolver()).build());
    let session = Session::start(server, router, &GatewayConfig::default());
    let api = session.api();

    let call = tokio::spawn(async move {
        api.call(json!({"action": "send_msg", "params": {"user_id": 9, "message": "hi"}}))
            .await
    });

    // The request surfaces on the wire annotated with its echo id.
    let frame = timeout(Duration::from_secs(2), client.next())
        .await
        .expect("request should be written")
        .unwrap()
        .unwrap();
    let doc: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(doc["action"], "send_msg");
    let echo = doc["echo"].as_u64().expect("echo id annotated");

    client
        .send(Message::Text(common::response_frame(echo, 77).into()))
        .await
        .unwrap();

    let response = timeout(Duration::from_secs(2), call)
        .await
        .expect("completion should fire")
        .unwrap()
        .expect("response should be delivered");
    assert!(response.is_ok());
    assert_eq!(response.data["message_id"], 77);

    // A duplicate response and an unknown id are both ignored silently.
    client
        .send(Message::Text(common::response_frame(echo, 78).into()))
        .await
        .unwrap();
    client
        .send(Message::Text(common::response_frame(9999, 79).into()))
        .await
        .unwrap();

    // The session still serves fresh requests afterwards.
    let api = session.api();
    let call = tokio::spawn(async move { api.call(json!({"action": "get_status"})).await });
    let frame = timeout(Duration::from_secs(2), client.next())
        .await
        .expect("request should be written")
        .unwrap()
        .unwrap();
    let doc: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    let echo = doc["echo"].as_u64().unwrap();
    client
        .send(Message::Text(common::response_frame(echo, 80).into()))
        .await
        .unwrap();
    assert!(timeout(Duration::from_secs(2), call)
        .await
        .unwrap()
        .unwrap()
        .is_some());

    session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_inbound_frames_lost_or_duplicated() {
    let (server, mut client) = common::ws_pair().await;

    let dispatched = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&dispatched);
    let mut builder = Router::builder(resolver());
    builder
        .on_command(
            MatchKind::FullMatch,
            "ping",
            handler(move |_event, _api| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
            PermissionLevel::Normal,
            false,
        )
        .unwrap();
    let router = Arc::new(builder.build());

    let mut config = GatewayConfig::default();
    config.pipeline.process_workers = 4;
    let session = Session::start(server, router, &config);

    const FRAMES: usize = 500;
    for i in 0..FRAMES {
        client
            .send(Message::Text(common::message_frame(i as i64, "ping").into()))
            .await
            .unwrap();
    }

    timeout(Duration::from_secs(10), async {
        while dispatched.load(Ordering::SeqCst) < FRAMES {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("every frame should be dispatched");

    // Nothing is dispatched twice.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(dispatched.load(Ordering::SeqCst), FRAMES);

    session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_senders_all_reach_the_wire() {
    let (server, mut client) = common::ws_pair().await;
    let router = Arc::new(Router::builder(resolver()).build());
    let session = Session::start(server, router, &GatewayConfig::default());

    const SENDERS: usize = 8;
    const REQUESTS: usize = 25;
    for _ in 0..SENDERS {
        let api = session.api();
        tokio::spawn(async move {
            for _ in 0..REQUESTS {
                let (tx, _rx) = tokio::sync::oneshot::channel();
                api.send_request(json!({"action": "get_status"}), tx);
            }
        });
    }

    let mut echoes = std::collections::HashSet::new();
    for _ in 0..SENDERS * REQUESTS {
        let frame = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("all requests should be written")
            .unwrap()
            .unwrap();
        let doc: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert!(echoes.insert(doc["echo"].as_u64().unwrap()), "duplicate echo id");
    }
    assert_eq!(echoes.len(), SENDERS * REQUESTS);

    session.shutdown().await;
}

#[tokio::test]
async fn shutdown_joins_workers_promptly_when_idle() {
    let (server, _client) = common::ws_pair().await;
    let router = Arc::new(Router::builder(resolver()).build());
    let session = Session::start(server, router, &GatewayConfig::default());

    // All queues are empty; the broadcast wake alone must unblock every
    // worker within the bound.
    timeout(Duration::from_secs(2), session.shutdown())
        .await
        .expect("shutdown should join all workers");
}

#[tokio::test]
async fn clean_close_ends_the_read_side() {
    let (server, mut client) = common::ws_pair().await;
    let router = Arc::new(Router::builder(resolver()).build());
    let mut session = Session::start(server, router, &GatewayConfig::default());

    client.close(None).await.unwrap();

    timeout(Duration::from_secs(2), session.closed())
        .await
        .expect("reader should observe the close");
    session.shutdown().await;
}
