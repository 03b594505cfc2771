//! Axum-based RPC server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use subledger_engine::SubscriptionEngine;

use crate::error::RpcError;
use crate::handlers;

/// Build the router over a shared engine.
pub fn router(engine: Arc<SubscriptionEngine>) -> Router {
    Router::new()
        .route("/config", get(handlers::get_config))
        .route("/accounts/:account", get(handlers::get_account))
        .route("/subscriptions", post(handlers::create_subscription))
        .route("/subscriptions/increase", post(handlers::increase_subscription))
        .route("/withdrawals", post(handlers::withdraw_all))
        .with_state(engine)
}

pub struct RpcServer {
    pub addr: SocketAddr,
    engine: Arc<SubscriptionEngine>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, engine: Arc<SubscriptionEngine>) -> Self {
        Self { addr, engine }
    }

    /// Serve until Ctrl-C.
    pub async fn start(self) -> Result<(), RpcError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {}: {e}", self.addr)))?;
        tracing::info!(addr = %self.addr, "RPC server listening");
        axum::serve(listener, router(self.engine))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        tracing::info!("RPC server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
    }
}
