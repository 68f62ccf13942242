//! Authorization server binary entry point.

use anyhow::{Context, Result};
use tracing::info;
use ultrafast_mcp_authserver::{AuthServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env().context("loading authorization server configuration")?;
    let cleanup_interval = config.cleanup_interval_secs;
    let host = std::env::var("AUTHSERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("AUTHSERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    info!("UltraFast MCP Authorization Server");
    info!("issuer: {}", config.issuer);
    info!("backend: {}", config.backend_url.as_deref().unwrap_or("(none, local-only)"));

    let server = AuthServer::new(config).context("constructing authorization server")?;
    server.spawn_cleanup_task(cleanup_interval);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, server.router().into_make_service())
        .await
        .context("authorization server exited")?;

    Ok(())
}
