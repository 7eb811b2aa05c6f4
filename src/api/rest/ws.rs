use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::rest::extract::Query;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WatchQuery {
    pub order_id: Option<Uuid>,
}

/// Streams order events as JSON, optionally for a single order.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WatchQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.order_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, order_id: Option<Uuid>) {
    let (sender, receiver) = socket.split();

    info!(order_id = ?order_id, "websocket client connected");
    relay_events(sender, receiver, state, order_id).await;
    info!("websocket client disconnected");
}

/// Forwards matching events until either side closes. Returns only after
/// both tasks are gone, so the broadcast subscription is released.
async fn relay_events<S, R>(
    mut sender: S,
    mut receiver: R,
    state: Arc<AppState>,
    order_id: Option<Uuid>,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin + Send + 'static,
{
    let mut events = BroadcastStream::new(state.events_tx.subscribe());

    let mut send_task = tokio::spawn(async move {
        while let Some(next) = events.next().await {
            let event = match next {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket subscriber lagged behind order events");
                    continue;
                }
            };

            if order_id.is_some_and(|id| id != event.order_id) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize order event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }
}
