pub mod routes;

use crate::state::AppState;
use axum::routing::get;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// JSON API over the pricer and grid evaluator.
pub fn router(state: Arc<AppState>) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .route("/api/price", get(routes::get_price))
        .route("/api/heatmap", get(routes::get_heatmap))
        .route("/api/pnl", get(routes::get_pnl))
        .route("/api/counters", get(routes::get_counters))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}
