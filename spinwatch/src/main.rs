use anyhow::Context;
use spinclient::SpinClient;
use spinwatch::config::Config;
use spinwatch::publisher::SpinPublisher;
use spinwatch::supervisor::Supervisor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    info!(
        proxy = %config.proxy_base_url,
        exchange = %config.exchange,
        routing_key = %config.routing_key,
        "Starting spinwatch"
    );

    let client = Arc::new(
        SpinClient::builder()
            .proxy_base(&config.proxy_base_url)
            .primary_base(&config.primary_api_url)
            .primary_api_key(&config.primary_api_key)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build spin client")?,
    );

    let publisher = Arc::new(SpinPublisher::new(config.publisher_config()));

    let shutdown = CancellationToken::new();
    let supervisor = Supervisor::new(
        client,
        publisher,
        config.listener_config(),
        config.scheduler_config(),
        shutdown.clone(),
    )
    .context("Failed to build supervisor")?;

    let supervisor_handle = tokio::spawn(supervisor.run());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    shutdown.cancel();
    supervisor_handle
        .await
        .context("Supervisor task panicked")?;

    info!("spinwatch stopped");
    Ok(())
}
