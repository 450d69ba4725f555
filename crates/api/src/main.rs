use anyhow::Context;

use stockroom_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = stockroom_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
