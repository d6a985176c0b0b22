use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::http::handler::Handler;

/// Accepts connections forever, one task per client.
pub async fn run<H: Handler>(cfg: &Config, handler: Arc<H>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    let settings = ConnectionSettings::from_config(&cfg.server);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept connection");
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let conn = Connection::new(socket, handler.clone(), settings.clone())
            .with_span(tracing::info_span!("conn", %peer));
        tokio::spawn(conn.run());
    }
}
