use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpListener;

use crate::{cache::ServerCache, config::ServerConfig, handlers::create_app};

pub async fn start_server(config: ServerConfig) -> Result<()> {
    let cache = ServerCache::connect(config.redis_url.as_deref()).await?;
    let app = create_app(cache, config.default_timezone, config.cache_ttl)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!(
        "Active ICS Server starting on {} (calendar cache ttl {}s)",
        addr,
        config.cache_ttl.as_secs()
    );

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
