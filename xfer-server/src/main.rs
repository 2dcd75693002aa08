use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use xfer_blob::S3CompatibleStore;
use xfer_coordinator::Coordinator;
use xfer_core::AppConfig;
use xfer_http::state::AppState;
use xfer_meta::RedisFieldStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = Arc::new(AppConfig::from_env());

    let blob = Arc::new(
        S3CompatibleStore::from_env(
            config.s3.bucket.clone(),
            config.s3.region.as_deref(),
            config.s3.endpoint.as_deref(),
            config.s3.path_style,
        )
        .await,
    );
    let meta = Arc::new(RedisFieldStore::connect(&config.redis.url).await?);

    let coordinator = Arc::new(Coordinator::new(blob, meta, config.clone()));
    let state = AppState {
        coordinator,
        config: config.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "transfer coordinator listening");

    let app = xfer_http::build(state);
    axum::serve(listener, app).await?;

    Ok(())
}
