use std::sync::Arc;

use servius::app::TimesApi;
use servius::config::Config;
use servius::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let handler = Arc::new(TimesApi::new(cfg.agilefant.base_url.clone()));

    tokio::select! {
        res = server::listener::run(&cfg, handler) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
