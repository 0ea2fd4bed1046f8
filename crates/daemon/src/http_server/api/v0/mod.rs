use axum::routing::get;
use axum::Router;

pub mod share;
pub mod stats;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/share", share::router(state.clone()))
        .route("/stats", get(stats::handler))
        .with_state(state)
}
