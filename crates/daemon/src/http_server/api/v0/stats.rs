use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::http_server::api::client::ApiRequest;
use crate::ledger::LedgerError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRequest;

/// Aggregate operational counters. Read-only, no side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub active_shares: i64,
    pub deleted_shares: i64,
    pub total_shares: i64,
    pub active_bytes: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_upload_at: Option<OffsetDateTime>,
}

pub async fn handler(State(state): State<ServiceState>) -> Result<impl IntoResponse, StatsError> {
    let stats = state.ledger().stats().await?;

    Ok((
        http::StatusCode::OK,
        Json(StatsResponse {
            active_shares: stats.active_count,
            deleted_shares: stats.deleted_count,
            total_shares: stats.total_count,
            active_bytes: stats.active_bytes,
            last_upload_at: stats.last_upload_at,
        }),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        let StatsError::Ledger(e) = self;
        tracing::error!(error = %e, "stats query failed");
        (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "stats query failed"})),
        )
            .into_response()
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for StatsRequest {
    type Response = StatsResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/v0/stats").unwrap();
        client.get(full_url)
    }
}
