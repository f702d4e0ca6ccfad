//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clients::ClientError;
use provisioning::ProvisioningError;
use rooms::RoomError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Provisioning saga error.
    Provisioning(ProvisioningError),
    /// Room lifecycle error.
    Room(RoomError),
    /// Store/client error outside the two cores.
    Client(ClientError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => simple(StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => simple(StatusCode::BAD_REQUEST, msg),
            ApiError::Provisioning(err) => provisioning_error_to_response(err),
            ApiError::Room(err) => room_error_to_response(err),
            ApiError::Client(err) => {
                tracing::error!(error = %err, "client error");
                simple(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

fn simple(status: StatusCode, message: String) -> Response {
    let body = serde_json::json!({ "error": message });
    (status, axum::Json(body)).into_response()
}

fn provisioning_error_to_response(err: ProvisioningError) -> Response {
    match &err {
        ProvisioningError::Validation(_) => simple(StatusCode::BAD_REQUEST, err.to_string()),
        ProvisioningError::Conflict(_) => simple(StatusCode::CONFLICT, err.to_string()),
        ProvisioningError::SagaFailed {
            failed_step,
            completed_steps,
            ..
        } => {
            // The structured failure is the caller's remediation handle.
            let body = serde_json::json!({
                "error": err.to_string(),
                "failed_step": failed_step,
                "completed_steps": completed_steps,
            });
            (StatusCode::BAD_GATEWAY, axum::Json(body)).into_response()
        }
    }
}

fn room_error_to_response(err: RoomError) -> Response {
    match &err {
        RoomError::NotBound(_)
        | RoomError::NoMessagingIdentity
        | RoomError::NotSupervisor(_) => simple(StatusCode::BAD_REQUEST, err.to_string()),
        RoomError::AlreadyAssigned(_) | RoomError::AlreadyAttached(_) => {
            simple(StatusCode::CONFLICT, err.to_string())
        }
        RoomError::NotAttached(_) => simple(StatusCode::NOT_FOUND, err.to_string()),
        RoomError::RoomCreation(_) => simple(StatusCode::BAD_GATEWAY, err.to_string()),
        RoomError::Client(_) => simple(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<ProvisioningError> for ApiError {
    fn from(err: ProvisioningError) -> Self {
        ApiError::Provisioning(err)
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        ApiError::Room(err)
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        ApiError::Client(err)
    }
}
