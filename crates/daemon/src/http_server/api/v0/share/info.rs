use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::http_server::api::client::ApiRequest;
use crate::ledger::LedgerError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoRequest {
    /// Share ID to inspect
    pub id: Uuid,
}

/// Non-sensitive metadata about a live share. Reading it never consumes a
/// download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub id: Uuid,
    pub display_name: String,
    pub byte_size: i64,
    pub mime_hint: String,
    pub remaining_downloads: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, InfoError> {
    let record = state.ledger().info(id).await?;

    Ok((
        http::StatusCode::OK,
        Json(InfoResponse {
            id: *record.id,
            remaining_downloads: record.remaining_downloads(),
            display_name: record.display_name,
            byte_size: record.byte_size,
            mime_hint: record.mime_hint,
            expires_at: record.expires_at,
            created_at: record.created_at,
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum InfoError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for InfoError {
    fn into_response(self) -> Response {
        let InfoError::Ledger(err) = self;
        match err {
            LedgerError::NotFound => (
                http::StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "share not found"})),
            )
                .into_response(),
            LedgerError::Expired => (
                http::StatusCode::GONE,
                Json(serde_json::json!({"error": "share expired"})),
            )
                .into_response(),
            LedgerError::LimitReached => (
                http::StatusCode::GONE,
                Json(serde_json::json!({"error": "download limit reached"})),
            )
                .into_response(),
            e => {
                tracing::error!(error = %e, "info lookup failed");
                (
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "info lookup failed"})),
                )
                    .into_response()
            }
        }
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for InfoRequest {
    type Response = InfoResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join(&format!("/api/v0/share/{}/info", self.id))
            .unwrap();
        client.get(full_url)
    }
}
