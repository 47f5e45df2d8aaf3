//! Server-sent event stream of live event updates
//!
//! Every connection subscribes to `event:{id}`. The first frame is a
//! `connected` message, then each broadcast becomes one `data:` frame. The
//! subscription lives inside the response stream, so a client disconnect
//! drops it and unsubscribes.

use crate::error::ApiResult;
use crate::extractors::ClientIp;
use crate::services::live;
use crate::AppState;
use axum::{
    extract::{OriginalUri, Path, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use gamescore_core::{ApiResponse, StreamMessage};
use serde::Serialize;
use std::convert::Infallible;
use tracing::{debug, warn};

fn to_sse(message: &StreamMessage) -> SseEvent {
    SseEvent::default().json_data(message).unwrap_or_else(|e| {
        warn!("Failed to encode stream message: {}", e);
        SseEvent::default().comment("unencodable message")
    })
}

pub async fn stream(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    ClientIp(ip): ClientIp,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    state.check_rate_limit(&ip, uri.path(), state.config.rate_limit.stream())?;

    let (rx, subscription) = live::subscribe_event(&state.live, &event_id);
    debug!("Stream opened for event {} from {}", event_id, ip);

    let connected = StreamMessage::Connected {
        event_id: event_id.clone(),
    };
    let updates = stream::unfold((rx, subscription), |(mut rx, subscription)| async move {
        let message = rx.recv().await?;
        Some((message, (rx, subscription)))
    });

    let frames = stream::once(async move { connected })
        .chain(updates)
        .map(|message| Ok(to_sse(&message)));

    let keep_alive = KeepAlive::new()
        .interval(state.config.keepalive())
        .text("keepalive");

    Ok(Sse::new(frames).keep_alive(keep_alive))
}

#[derive(Debug, Serialize)]
pub struct ListenerInfo {
    channel: String,
    has_subscribers: bool,
    subscribers: usize,
}

pub async fn listeners(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Json<ApiResponse<ListenerInfo>> {
    let channel = live::event_channel(&event_id);
    let subscribers = state.live.subscriber_count(&channel);

    Json(ApiResponse::ok(ListenerInfo {
        channel,
        has_subscribers: subscribers > 0,
        subscribers,
    }))
}
