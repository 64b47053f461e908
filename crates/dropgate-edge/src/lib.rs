//! Edge server for the delivery marketplace front-end.
//!
//! Every incoming request passes through the gatekeeper middleware before it
//! is forwarded to the page origin. Redirect decisions are answered directly
//! by the edge; rotated credentials are attached to whichever response goes
//! back to the browser.

pub mod middleware;
pub mod proxy;
pub mod state;

use std::sync::Arc;

use axum::{routing::any, Router};

pub use state::EdgeState;

/// Build the edge router: gate first, then forward to the page origin.
pub fn router(state: Arc<EdgeState>) -> Router {
    Router::new()
        .route("/", any(proxy::forward_to_pages))
        .route("/*path", any(proxy::forward_to_pages))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::gate_requests,
        ))
        .with_state(state)
}
