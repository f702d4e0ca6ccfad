//! Consultant provisioning endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use clients::RelationalStore;
use common::ConsultantId;
use domain::{Consultant, NewConsultant, Role};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateConsultantRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub roles: Vec<Role>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ConsultantResponse {
    pub id: String,
    pub provider_id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub legacy_chat_id: String,
    pub messaging_id: Option<String>,
    pub roles: Vec<Role>,
    pub status: String,
}

impl From<Consultant> for ConsultantResponse {
    fn from(c: Consultant) -> Self {
        Self {
            id: c.id.map(|id| id.to_string()).unwrap_or_default(),
            provider_id: c.provider_id.to_string(),
            username: c.username,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            legacy_chat_id: c.legacy_chat_id.to_string(),
            messaging_id: c.messaging_id.map(|id| id.to_string()),
            roles: c.roles,
            status: c.status.to_string(),
        }
    }
}

// -- Handlers --

/// POST /consultants — provision a new consultant across all systems.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RelationalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateConsultantRequest>,
) -> Result<(axum::http::StatusCode, Json<ConsultantResponse>), ApiError> {
    let input = NewConsultant {
        username: req.username,
        password: req.password,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        roles: req.roles,
    };

    let consultant = state.saga.provision(input).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ConsultantResponse::from(consultant)),
    ))
}

/// GET /consultants/:id — load a consultant record.
#[tracing::instrument(skip(state))]
pub async fn get<S: RelationalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ConsultantResponse>, ApiError> {
    let consultant_id = parse_consultant_id(&id)?;
    let consultant = state
        .store
        .find_consultant(&consultant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Consultant {id} not found")))?;

    Ok(Json(ConsultantResponse::from(consultant)))
}

pub(crate) fn parse_consultant_id(id: &str) -> Result<ConsultantId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid consultant id: {e}")))?;
    Ok(ConsultantId::from_uuid(uuid))
}
