use crate::AppState;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    Json,
};
use futures::{stream::StreamExt, SinkExt};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use tally_common::PollBatch;
use tokio::sync::broadcast::error::RecvError;

mod hub;
pub use hub::*;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.hub.client_count(),
    }))
}

pub async fn live_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(state, socket))
}

async fn handle_ws(state: AppState, socket: WebSocket) {
    let mut events = state.hub.subscribe();
    let connected = state.hub.client_connected();
    info!("Live WS connected ({connected} clients)");

    let (mut ws_tx, mut ws_rx) = socket.split();

    tokio::select! {
        // Server → Browser: forward published events as JSON text frames
        _ = async {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Live WS client lagged, skipped {skipped} events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("failed to encode {}: {e}", event.name());
                        continue;
                    }
                };
                if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
        } => {},
        // Browser → Server: nothing to act on, just notice the close
        _ = async {
            while let Some(Ok(msg)) = ws_rx.next().await {
                if let WsMessage::Close(_) = msg {
                    break;
                }
            }
        } => {},
    }

    let remaining = state.hub.client_disconnected();
    info!("Live WS disconnected ({remaining} clients)");
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    /// Cursor from the previous response; absent for the handshake
    pub after: Option<u64>,
    pub wait_ms: Option<u64>,
}

pub async fn poll(State(state): State<AppState>, Query(query): Query<PollQuery>) -> Json<PollBatch> {
    let Some(after) = query.after else {
        return Json(PollBatch {
            cursor: state.hub.cursor().await,
            events: Vec::new(),
        });
    };
    let window = state.args.poll_window();
    let wait = query
        .wait_ms
        .map(std::time::Duration::from_millis)
        .map_or(window, |w| w.min(window));
    Json(state.hub.wait_since(after, wait).await)
}
