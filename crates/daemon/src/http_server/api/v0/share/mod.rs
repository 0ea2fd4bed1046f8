use axum::routing::{get, post};
use axum::Router;

pub mod delete_share;
pub mod download;
pub mod info;
pub mod upload;

// Re-export for convenience
pub use delete_share::DeleteShareRequest;
pub use info::InfoRequest;
pub use upload::UploadRequest;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(upload::handler))
        .route(
            "/:id",
            get(download::handler).delete(delete_share::handler),
        )
        .route("/:id/info", get(info::handler))
        .with_state(state)
}
