//! HTTP surface for payhub.
//!
//! Handlers are thin: they extract, hand off to the [`dispatch::Dispatcher`],
//! and map [`error::ApiError`] to status codes.

pub mod agent;
pub mod bootstrap;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod invoices;
pub mod links;
pub mod mode;
pub mod state;
pub mod toolkit;

use std::future::IntoFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

use crate::bootstrap::Application;
use crate::state::AppState;

/// The full API router. When `static_dir` is set, unmatched paths are served
/// from it with `index.html` as the single-page fallback.
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .merge(health::router())
        .merge(agent::router())
        .merge(mode::router())
        .merge(invoices::router())
        .merge(links::router())
        .merge(toolkit::router());

    if let Some(dir) = static_dir {
        router = router
            .fallback_service(ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

pub async fn serve(application: Application) -> Result<()> {
    let Application { config, state } = application;
    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        current_mode = %state.snapshot().current_mode,
        "payhub-server listening"
    );

    let router = app(state, config.server.static_dir.as_deref());
    let drain = Duration::from_secs(config.server.graceful_shutdown_secs);
    let stopping = Arc::new(Notify::new());

    let server = axum::serve(listener, router).with_graceful_shutdown({
        let stopping = Arc::clone(&stopping);
        async move {
            wait_for_shutdown().await;
            stopping.notify_one();
        }
    });

    tokio::select! {
        result = server.into_future() => result?,
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(drain).await;
        } => {
            warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                drain_secs = drain.as_secs(),
                "in-flight requests did not finish in time; exiting"
            );
        }
    }

    info!(event_name = "system.server.stopped", correlation_id = "shutdown", "payhub-server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(cause) = tokio::signal::ctrl_c().await {
        error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %cause,
            "could not listen for ctrl-c"
        );
        std::future::pending::<()>().await;
    }
    info!(event_name = "system.server.stopping", correlation_id = "shutdown", "shutdown requested");
}
