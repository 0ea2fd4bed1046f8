use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http_server::api::client::ApiRequest;
use crate::ledger::LedgerError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteShareRequest {
    /// Share ID to delete
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteShareResponse {
    pub id: Uuid,
    /// Whether this request made the transition. `false` means the share was
    /// already gone; repeating a delete is never an error.
    pub deleted: bool,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, DeleteShareError> {
    let deleted = state.ledger().delete(id).await?;

    Ok((
        http::StatusCode::OK,
        Json(DeleteShareResponse { id, deleted }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteShareError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for DeleteShareError {
    fn into_response(self) -> Response {
        let DeleteShareError::Ledger(e) = self;
        tracing::error!(error = %e, "manual delete failed");
        (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "delete failed"})),
        )
            .into_response()
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for DeleteShareRequest {
    type Response = DeleteShareResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join(&format!("/api/v0/share/{}", self.id))
            .unwrap();
        client.delete(full_url)
    }
}
