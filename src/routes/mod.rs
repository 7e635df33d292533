use axum::Router;

use crate::state::SharedState;

/// Swagger UI.
pub mod docs;
/// Round lifecycle mutations.
pub mod games;
/// Health check route.
pub mod health;
/// Read-only projections.
pub mod public;
/// Per-game event stream.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sse::router())
        .merge(games::router())
        .merge(public::router())
        .merge(docs::router())
        .with_state(state)
}
