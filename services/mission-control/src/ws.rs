//! WebSocket endpoint for live point cloud updates.
//!
//! Each connection gets its own subscription. The current snapshot (if any)
//! is sent right after the upgrade, followed by every newly loaded snapshot
//! as a JSON text frame. The subscription is removed when the socket closes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use missionctl_stream::{PointCloudService, PointCloudSnapshot, Subscription};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn pointcloud_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let service = Arc::clone(&state.pointcloud);
    ws.on_upgrade(move |socket| stream_point_clouds(socket, service))
}

async fn stream_point_clouds(socket: WebSocket, service: Arc<PointCloudService>) {
    let (mut subscription, current) = service.subscribe_with_current().await;
    let subscriber_id = subscription.id();

    info!(subscriber_id, "Point cloud WebSocket connected");

    if let Err(e) = forward_updates(socket, &mut subscription, current).await {
        warn!(subscriber_id, error = %e, "Point cloud WebSocket closed with error");
    }

    service.unsubscribe(subscriber_id).await;

    info!(subscriber_id, "Point cloud WebSocket disconnected");
}

async fn forward_updates(
    socket: WebSocket,
    subscription: &mut Subscription,
    current: Option<Arc<PointCloudSnapshot>>,
) -> Result<(), axum::Error> {
    let subscriber_id = subscription.id();
    let (mut sender, mut receiver) = socket.split();

    if let Some(current) = current {
        send_snapshot(&mut sender, &current).await?;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Text(text))) => {
                    debug!(subscriber_id, %text, "Ignoring client message");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
            },

            update = subscription.recv() => match update {
                Some(snapshot) => send_snapshot(&mut sender, &snapshot).await?,
                None => break,
            },
        }
    }

    Ok(())
}

async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    snapshot: &PointCloudSnapshot,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(snapshot).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}
