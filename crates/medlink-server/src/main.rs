use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use medlink_store::{ConversationStore, MemoryStore, RedisStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medlink=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("MEDLINK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MEDLINK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let store_kind = std::env::var("MEDLINK_STORE").unwrap_or_else(|_| "redis".into());
    let redis_url =
        std::env::var("MEDLINK_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());

    // History store. An unreachable redis is fatal here: the relay must not
    // start accepting connections without somewhere to put messages.
    let store: Arc<dyn ConversationStore> = match store_kind.as_str() {
        "redis" => Arc::new(RedisStore::connect(&redis_url).await?),
        "memory" => {
            warn!("using in-memory history store; messages will not survive a restart");
            Arc::new(MemoryStore::new())
        }
        other => anyhow::bail!("unknown MEDLINK_STORE '{}' (expected redis or memory)", other),
    };

    let app = medlink_server::build_app(store);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("medlink relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
