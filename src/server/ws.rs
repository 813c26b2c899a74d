use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, warn};

use crate::server::ServeState;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/ws", get(websocket_handler))
}

#[derive(Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    kind: String,
}

async fn websocket_handler(
    State(state): State<ServeState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        handle_socket(socket, state).await;
    })
}

async fn handle_socket(mut socket: WebSocket, state: ServeState) {
    let mut events = BroadcastStream::new(state.subscribe());

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        debug!(target: "ws", "client went away");
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(target: "ws", skipped, "websocket client lagging, events dropped");
                }
                None => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if reply_to(&mut socket, &text).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = socket.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(target: "ws", ?frame, "WebSocket closed by client");
                    break;
                }
                Some(Ok(Message::Binary(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Err(err)) => {
                    error!(?err, "WebSocket error");
                    break;
                }
                None => break,
            },
        }
    }
}

/// `{"type": "ping"}` gets a pong, anything else is echoed back
async fn reply_to(socket: &mut WebSocket, text: &str) -> Result<(), axum::Error> {
    let reply = match serde_json::from_str::<ClientMessage>(text) {
        Ok(request) if request.kind.eq_ignore_ascii_case("ping") => json!({"type": "pong"}),
        _ => json!({"type": "echo", "message": text}),
    };
    socket.send(Message::Text(reply.to_string())).await
}
