//! REST server startup and configuration

use anyhow::Result;
use axum::serve;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::server::routing::create_router;
use crate::server::AppState;

/// Start the REST server and serve until `shutdown` resolves
#[cfg(not(tarpaulin_include))]
pub async fn start_server<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<()>
where
  F: Future<Output = ()> + Send + 'static,
{
  tracing::info!(%addr, "starting brainstorm REST server");

  let app = create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(addr).await?;
  tracing::info!(%addr, "server listening");

  serve(listener, app)
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

  tracing::info!("server shut down gracefully");
  Ok(())
}
