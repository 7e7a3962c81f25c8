use std::sync::Arc;

use dispatch_bus::RedisBus;
use dispatcher::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    tracing::info!(host = %config.host, port = config.port, "starting device session dispatcher");

    let bus = RedisBus::connect(&config.bus_url)
        .await
        .expect("failed to connect to the shared bus");

    if let Err(error) = dispatcher::run(config, Arc::new(bus)).await {
        tracing::error!(%error, "dispatcher exited with an error");
        std::process::exit(1);
    }
}
