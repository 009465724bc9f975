use anyhow::Context;

use storegate_api::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storegate_observability::init();

    let config = ServerConfig::from_env()?;
    let app = storegate_api::app::build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
