//! Handlers for the `/api/reservations` endpoints.

use super::document::{RecordPayload, ReservationDocument};
use super::service::{ReservationService, StoreError};
use crate::config::Config;
use crate::remote::RemoteFileGateway;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

/// Error body: `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body of a successful create: `{"status": "ok"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Body of a successful delete: `{"message": "Reservation deleted"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

impl From<StoreError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: StoreError) -> Self {
        error!("Reservation storage failed: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Internal server error")),
        )
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

/// Application state shared by the reservation handlers.
#[derive(Clone)]
pub struct AppState<G> {
    pub service: ReservationService<G>,
}

impl<G> AppState<G> {
    pub fn new(service: ReservationService<G>) -> Self {
        Self { service }
    }
}

/// Creates the router for the reservation endpoints, to be nested under `/api`.
pub fn routes<G>() -> Router<AppState<G>>
where
    G: RemoteFileGateway,
{
    Router::new()
        .route("/reservations", get(list::<G>).post(create::<G>))
        .route("/reservations/delete", post(delete::<G>))
}

/// Return the whole reservation document.
///
/// GET /api/reservations
pub async fn list<G>(State(state): State<AppState<G>>) -> impl IntoResponse
where
    G: RemoteFileGateway,
{
    match state.service.load().await {
        Ok(loaded) => {
            info!(count = loaded.document.len(), "Returning reservations");
            (StatusCode::OK, Json::<ReservationDocument>(loaded.document)).into_response()
        }
        Err(e) => <(StatusCode, Json<ErrorResponse>)>::from(e).into_response(),
    }
}

/// Append one reservation, or a list of them.
///
/// POST /api/reservations
pub async fn create<G>(State(state): State<AppState<G>>, body: Bytes) -> impl IntoResponse
where
    G: RemoteFileGateway,
{
    let Some(payload) = RecordPayload::from_slice(&body) else {
        return bad_request("Invalid JSON").into_response();
    };

    match state
        .service
        .apply(|document| document.add_records(payload))
        .await
    {
        Ok((added, _)) => {
            info!(added, "Reservations added");
            (
                StatusCode::CREATED,
                Json(StatusResponse {
                    status: "ok".to_owned(),
                }),
            )
                .into_response()
        }
        Err(e) => <(StatusCode, Json<ErrorResponse>)>::from(e).into_response(),
    }
}

/// Delete every reservation whose date or recurrence group matches `id`.
///
/// POST /api/reservations/delete with `{"senha": "...", "id": ...}`
pub async fn delete<G>(
    State(state): State<AppState<G>>,
    Extension(config): Extension<Config>,
    body: Bytes,
) -> impl IntoResponse
where
    G: RemoteFileGateway,
{
    let request: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return bad_request("Invalid request").into_response(),
    };
    if request.is_empty() {
        return bad_request("Invalid request").into_response();
    }

    let password = request.get("senha").and_then(Value::as_str);
    if password != Some(config.admin_password()) {
        info!("Rejected reservation delete with a wrong password");
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Incorrect password")),
        )
            .into_response();
    }

    let identifier = match request.get("id") {
        Some(Value::Null) | None => return bad_request("Invalid request").into_response(),
        Some(identifier) => identifier.clone(),
    };

    match state
        .service
        .apply(|document| document.delete_by_identifier(&identifier))
        .await
    {
        Ok((removed, _)) => {
            info!(removed, id = %identifier, "Reservations deleted");
            (
                StatusCode::OK,
                Json(DeleteResponse {
                    message: "Reservation deleted".to_owned(),
                }),
            )
                .into_response()
        }
        Err(e) => <(StatusCode, Json<ErrorResponse>)>::from(e).into_response(),
    }
}
