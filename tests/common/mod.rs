//! Shared utilities for integration testing.

use tokio::io::DuplexStream;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;

/// Build an in-process WebSocket pair: the server side is handed to the
/// session under test, the client side plays the event gateway.
pub async fn ws_pair() -> (
    WebSocketStream<DuplexStream>,
    WebSocketStream<DuplexStream>,
) {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    (server, client)
}

/// A private message event frame from `user_id`.
#[allow(dead_code)]
pub fn message_frame(user_id: i64, text: &str) -> String {
    serde_json::json!({
        "post_type": "message",
        "message_type": "private",
        "self_id": 12345,
        "user_id": user_id,
        "message": text,
    })
    .to_string()
}

/// An API response frame answering echo id `echo`.
#[allow(dead_code)]
pub fn response_frame(echo: u64, message_id: i64) -> String {
    serde_json::json!({
        "status": "ok",
        "retcode": 0,
        "data": {"message_id": message_id},
        "echo": echo,
    })
    .to_string()
}
