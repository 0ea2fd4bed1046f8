use axum::extract::{Path, State};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::ledger::LedgerError;
use crate::ServiceState;

/// Serve the ciphertext for a share, consuming one unit of its download
/// allowance. The body is the opaque envelope exactly as uploaded; the
/// receiver decrypts locally with the key from the link fragment.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<Response, DownloadError> {
    let delivery = state.ledger().fetch(id).await?;
    let record = delivery.record;

    let disposition = format!("attachment; filename=\"{}\"", record.display_name);

    Ok((
        http::StatusCode::OK,
        AppendHeaders([
            ("content-type", record.mime_hint.clone()),
            ("content-disposition", disposition),
            (
                "x-remaining-downloads",
                record.remaining_downloads().to_string(),
            ),
        ]),
        delivery.bytes,
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        let DownloadError::Ledger(err) = self;
        // Expired and limit-reached are distinguishable on purpose: the
        // receiver deserves to know why the file is gone.
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
                tracing::error!(error = %e, "download failed");
                (
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "download failed"})),
                )
                    .into_response()
            }
        }
    }
}
