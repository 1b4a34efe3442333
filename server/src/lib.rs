//! HTTP task-tracking service backed by SQLite.
//!
//! # Overview
//! `app` builds the axum router around an injected [`TaskStore`]; `run`
//! serves it on a listener until Ctrl-C. Requests flow through schema
//! validation ([`schema`]), a single store call ([`store`]) and a JSON
//! response, with every failure expressed as an [`ApiError`].

pub mod config;
pub mod error;
pub mod routes;
pub mod schema;
pub mod store;
pub mod task;

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use routes::{DeletedTask, PageMeta, TaskEnvelope, TaskPage};
pub use store::{StoreError, TaskStore};
pub use task::{Task, TaskStatus};

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: TaskStore,
}

pub fn app(store: TaskStore) -> Router {
    routes::router()
        .with_state(AppState { store })
        .layer(TraceLayer::new_for_http())
}

/// Serve until the process receives Ctrl-C.
pub async fn run(listener: TcpListener, store: TaskStore) -> Result<(), std::io::Error> {
    run_until(listener, store, shutdown_signal()).await
}

/// Serve until `shutdown` resolves, then drain in-flight requests. The store
/// is dropped, closing the database, once the server returns.
pub async fn run_until<F>(
    listener: TcpListener,
    store: TaskStore,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(store))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
