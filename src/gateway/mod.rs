pub mod client;
pub mod routes;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use client::GatewayClient;

/// The public-facing router: validation in front of `client`'s upstream.
pub fn router(client: GatewayClient) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(client)
}
