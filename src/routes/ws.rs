// WebSocket handler: pushes every ProgressView change to the client

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::ProgressView;

pub(super) async fn ws_progress(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.poller.subscribe();
    let ping_interval = Duration::from_secs(state.config.publishing.ws_ping_interval_secs);
    let send_timeout = Duration::from_secs(state.config.publishing.ws_send_timeout_secs);
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_progress(socket, rx, ping_interval, send_timeout).await {
            tracing::info!("Progress stream error: {}", e);
        }
    })
}

/// Sends `msg`; false when the client is gone or too slow.
async fn send_or_drop(socket: &mut WebSocket, msg: Message, send_timeout: Duration) -> bool {
    matches!(timeout(send_timeout, socket.send(msg)).await, Ok(Ok(())))
}

async fn stream_progress(
    mut socket: WebSocket,
    mut rx: watch::Receiver<ProgressView>,
    ping_interval: Duration,
    send_timeout: Duration,
) -> anyhow::Result<()> {
    tracing::info!("Client connected to progress stream");

    let initial = serde_json::to_string(&*rx.borrow_and_update())?;
    if !send_or_drop(&mut socket, Message::Text(initial.into()), send_timeout).await {
        return Ok(());
    }

    let mut ping_tick = tokio::time::interval(ping_interval);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping_tick.tick().await;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    // Poller shut down.
                    break;
                }
                let json = serde_json::to_string(&*rx.borrow_and_update())?;
                if !send_or_drop(&mut socket, Message::Text(json.into()), send_timeout).await {
                    break;
                }
            }
            _ = ping_tick.tick() => {
                if !send_or_drop(&mut socket, Message::Ping(Bytes::new()), send_timeout).await {
                    break;
                }
            }
        }
    }
    tracing::info!("Client disconnected from progress stream");
    Ok(())
}
