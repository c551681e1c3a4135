//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that open the
//! database, build the reconciler, and hand it to the MCP tool handler.

use anyhow::Result;
use habitus::config::HabitusConfig;
use habitus::Reconciler;
use rmcp::ServiceExt;
use std::sync::Arc;

use crate::cli;
use crate::tools::HabitusTools;

/// Shared setup: open DB, warn on a threshold change, build the reconciler.
fn setup_shared_state(config: &HabitusConfig) -> Result<Arc<Reconciler>> {
    let reconciler = cli::open_reconciler(config)?;
    tracing::info!(
        db = %config.resolved_db_path().display(),
        utc_offset_minutes = config.calendar.utc_offset_minutes,
        "database ready"
    );
    Ok(Arc::new(reconciler))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: HabitusConfig) -> Result<()> {
    tracing::info!("starting habitus MCP server on stdio");

    let reconciler = setup_shared_state(&config)?;
    let tools = HabitusTools::new(reconciler, config.reconcile.leaderboard_size);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: HabitusConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting habitus MCP server on HTTP");

    let reconciler = setup_shared_state(&config)?;
    let leaderboard_size = config.reconcile.leaderboard_size;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(HabitusTools::new(reconciler.clone(), leaderboard_size)),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
