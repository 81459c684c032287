use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use medlink_store::ConversationStore;
use medlink_types::events::{ClientEvent, ErrorCode, ServerEvent};
use medlink_types::models::{conversation_key, MessageRecord};

use crate::registry::ConnectionRegistry;

/// Applies the per-event persist/forward policy:
///
/// - `send_message`  — append to history, then fan out to the recipient
/// - `get_history`   — read snapshot, reply to the requesting connection
/// - `call_offer` / `call_answer` / `ice_candidate` — forward only
///
/// Stateless across events; the only cross-event input is the sender id
/// fixed at admission time.
#[derive(Clone)]
pub struct RelayRouter {
    registry: ConnectionRegistry,
    store: Arc<dyn ConversationStore>,
}

impl RelayRouter {
    pub fn new(registry: ConnectionRegistry, store: Arc<dyn ConversationStore>) -> Self {
        Self { registry, store }
    }

    /// Handle one inbound event from `sender_id`. Replies that target the
    /// originating connection (history, errors) go through `reply`; anything
    /// addressed to another user goes through the registry. Never returns an
    /// error: every failure is reported to the sender as an `error` event so
    /// one connection's trouble stays its own.
    pub async fn handle(
        &self,
        sender_id: &str,
        event: ClientEvent,
        reply: &mpsc::UnboundedSender<ServerEvent>,
    ) {
        if event.recipient().is_empty() {
            send_error(reply, ErrorCode::EmptyRecipient, "toUserId must not be empty");
            return;
        }

        match event {
            ClientEvent::SendMessage { to_user_id, message } => {
                let record = MessageRecord::new(sender_id, &to_user_id, message);
                let key = conversation_key(sender_id, &to_user_id);

                // Persist before forwarding: a delivered message is always
                // also recorded. Recipient offline does not roll this back.
                if let Err(e) = self.store.append(&key, &record).await {
                    warn!("{} send_message append failed: {}", sender_id, e);
                    send_error(reply, ErrorCode::PersistenceUnavailable, &e.to_string());
                    return;
                }

                let delivered = self
                    .registry
                    .deliver_to_user(
                        &to_user_id,
                        ServerEvent::ReceiveMessage {
                            sender: sender_id.to_string(),
                            content: record.content,
                        },
                    )
                    .await;
                debug!(
                    "{} -> message to {} ({} connection(s))",
                    sender_id, to_user_id, delivered
                );
            }

            ClientEvent::GetHistory { to_user_id, limit } => {
                // Storage is directional, the conversation view is not: read
                // both keys and merge by timestamp so either party sees the
                // whole exchange. The last N of the merge is a subset of the
                // last N of each side, so the limit pushes down to the store.
                let sent = self
                    .store
                    .read_all(&conversation_key(sender_id, &to_user_id), limit)
                    .await;
                let received = self
                    .store
                    .read_all(&conversation_key(&to_user_id, sender_id), limit)
                    .await;
                match (sent, received) {
                    (Ok(sent), Ok(received)) => {
                        let mut records: Vec<MessageRecord> =
                            sent.into_iter().chain(received).collect();
                        records.sort_by_key(|r| r.timestamp);
                        if let Some(n) = limit {
                            let cut = records.len().saturating_sub(n);
                            records.drain(..cut);
                        }
                        let _ = reply.send(ServerEvent::History(records));
                    }
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("{} get_history read failed: {}", sender_id, e);
                        send_error(reply, ErrorCode::PersistenceUnavailable, &e.to_string());
                    }
                }
            }

            // Signaling is fire-and-forget: no persistence, no payload
            // validation, silently dropped when the recipient is offline.
            ClientEvent::CallOffer { to_user_id, offer } => {
                debug!("{} -> call offer to {}", sender_id, to_user_id);
                self.registry
                    .deliver_to_user(
                        &to_user_id,
                        ServerEvent::CallOffer {
                            from_user_id: sender_id.to_string(),
                            offer,
                        },
                    )
                    .await;
            }

            ClientEvent::CallAnswer { to_user_id, answer } => {
                debug!("{} -> call answer to {}", sender_id, to_user_id);
                self.registry
                    .deliver_to_user(
                        &to_user_id,
                        ServerEvent::CallAnswer {
                            from_user_id: sender_id.to_string(),
                            answer,
                        },
                    )
                    .await;
            }

            ClientEvent::IceCandidate { to_user_id, candidate } => {
                self.registry
                    .deliver_to_user(
                        &to_user_id,
                        ServerEvent::IceCandidate {
                            from_user_id: sender_id.to_string(),
                            candidate,
                        },
                    )
                    .await;
            }
        }
    }
}

/// Report a rejected event back to its sender only.
pub fn send_error(reply: &mpsc::UnboundedSender<ServerEvent>, code: ErrorCode, message: &str) {
    let _ = reply.send(ServerEvent::Error {
        code,
        message: message.to_string(),
    });
}
