//! STOCKROOM Server — axum REST API over the inventory core.
//!
//! Exposed as a library so integration tests can build the full
//! router against an embedded in-memory store.

pub mod auth_middleware;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod upload;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;

use crate::auth_middleware::auth_middleware;
use crate::state::AppState;

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok"}))
}

/// Build the complete application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", handlers::auth::routes())
        .nest("/products", handlers::products::routes())
        .nest("/product-models", handlers::product_models::routes())
        .nest("/dispatch-guides", handlers::dispatch_guides::routes())
        .nest(
            "/external-decommission-acts",
            handlers::external_acts::routes(),
        )
        .nest("/users", handlers::users::routes())
        .nest("/directory", handlers::directory::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
