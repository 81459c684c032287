use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use medlink_gateway::connection;
use medlink_gateway::registry::{ConnectionRegistry, Identity};
use medlink_gateway::router::RelayRouter;
use medlink_store::ConversationStore;

#[derive(Clone)]
pub struct ServerState {
    registry: ConnectionRegistry,
    router: RelayRouter,
}

/// Handshake metadata on the upgrade request: `/ws?userId=...&role=...`.
/// The relay trusts this identity as-is; authentication lives upstream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeQuery {
    user_id: String,
    #[serde(default)]
    role: String,
}

/// Build the relay's HTTP surface over the given history store.
pub fn build_app(store: Arc<dyn ConversationStore>) -> Router {
    let registry = ConnectionRegistry::new();
    let router = RelayRouter::new(registry.clone(), store);
    let state = ServerState { registry, router };

    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_upgrade(
    State(state): State<ServerState>,
    Query(params): Query<HandshakeQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if params.user_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "userId must not be empty").into_response();
    }
    let identity = Identity {
        user_id: params.user_id,
        role: params.role,
    };
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.registry, state.router, identity)
    })
    .into_response()
}
