//! Web server setup and routing

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api;
use crate::state::AppState;

/// Run the web server until shutdown
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = Router::new()
        .route("/api/devices", get(api::list_devices))
        .route("/api/printers", get(api::list_printers))
        .route("/api/interfaces", get(api::list_interfaces))
        .route("/api/config", get(api::get_config))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, "starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}
