use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use medlink_types::events::{ClientEvent, ErrorCode, ServerEvent};

use crate::registry::{ConnectionRegistry, Identity};
use crate::router::{send_error, RelayRouter};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one WebSocket connection: admit it into the registry, pump outbound
/// events and heartbeats, feed inbound events to the router in arrival
/// order, and evict exactly once on the way out.
pub async fn handle_connection(
    socket: WebSocket,
    registry: ConnectionRegistry,
    router: RelayRouter,
    identity: Identity,
) {
    let (mut sender, mut receiver) = socket.split();
    let user_id = identity.user_id.clone();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let conn_id = registry.admit(&user_id, tx.clone()).await;
    info!(
        "{} ({}) connected [{}], {} active connection(s)",
        user_id,
        identity.role,
        conn_id,
        registry.group_size(&user_id).await
    );

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Outbound: registry deliveries and direct replies share one channel, so
    // everything addressed to this connection leaves in queue order.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("failed to encode outbound event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Inbound: events are handled to completion before the next one is read,
    // preserving per-connection order. A bad event earns an error reply and
    // the loop carries on.
    let recv_user_id = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        router.handle(&recv_user_id, event, &tx).await;
                    }
                    Err(e) => {
                        warn!(
                            "{} bad event: {} -- raw: {}",
                            recv_user_id,
                            e,
                            truncate_for_log(&text, 200)
                        );
                        send_error(&tx, ErrorCode::BadEvent, &e.to_string());
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either side to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.evict(&user_id, conn_id).await;
    info!("{} ({}) disconnected [{}]", user_id, identity.role, conn_id);
}

/// Cap a raw client payload for logging without splitting a multi-byte
/// character.
fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_for_log_respects_char_boundaries() {
        let short = "hello";
        assert_eq!(truncate_for_log(short, 200), "hello");

        // '€' is 3 bytes; byte 200 falls inside a character.
        let garbage = "€".repeat(100);
        let cut = truncate_for_log(&garbage, 200);
        assert_eq!(cut.len(), 198);
        assert!(garbage.starts_with(cut));

        let exact = "a".repeat(200) + "€";
        assert_eq!(truncate_for_log(&exact, 200).len(), 200);
    }
}
