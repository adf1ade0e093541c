use crate::relay::RelayServer;
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use parley_core::{ClientEvent, ConnectionId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub fn router(relay: Arc<RelayServer>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(relay)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(relay): State<Arc<RelayServer>>,
) -> impl IntoResponse {
    // The connection id is minted here, server side, like a socket id.
    let id = ConnectionId::new();
    ws.on_upgrade(move |socket| handle_socket(socket, id, relay))
}

async fn handle_socket(socket: WebSocket, id: ConnectionId, relay: Arc<RelayServer>) {
    info!(%id, "new signaling connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    relay.connect(id, tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!(%id, "failed to serialize server event: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let relay = relay.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => relay.handle_event(id, event),
                        Err(e) => warn!(%id, "invalid client event: {e}"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    relay.disconnect(id);
    info!(%id, "signaling connection closed");
}
