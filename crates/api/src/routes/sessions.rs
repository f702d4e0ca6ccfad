//! Session and room lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use clients::RelationalStore;
use common::{AgencyId, SessionId};
use domain::{MessagingCredentials, ParticipantGrant, RoomBinding, Session};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::consultants::parse_consultant_id;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub id: i64,
    pub agency_id: Option<i64>,
    pub contact_messaging_id: Option<String>,
}

/// Optional login pair for acting on someone's behalf (auto-join).
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

impl CredentialsRequest {
    fn into_credentials(self) -> MessagingCredentials {
        MessagingCredentials::new(self.username, self.password)
    }
}

#[derive(Deserialize)]
pub struct HoldingRoomRequest {
    pub contact: Option<CredentialsRequest>,
}

#[derive(Deserialize)]
pub struct AssignRoomRequest {
    pub consultant_id: String,
    pub consultant: CredentialsRequest,
    pub contact: Option<CredentialsRequest>,
}

#[derive(Deserialize)]
pub struct AttachObserverRequest {
    pub observer_id: String,
    pub actor: CredentialsRequest,
    pub observer: Option<CredentialsRequest>,
}

#[derive(Deserialize)]
pub struct DetachObserverRequest {
    pub actor: CredentialsRequest,
}

// -- Response types --

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub agency_id: Option<i64>,
    pub contact_messaging_id: Option<String>,
}

#[derive(Serialize)]
pub struct RoomBindingResponse {
    pub session_id: i64,
    pub room_id: String,
    pub ownership: String,
}

impl From<RoomBinding> for RoomBindingResponse {
    fn from(b: RoomBinding) -> Self {
        Self {
            session_id: b.session_id.as_i64(),
            room_id: b.room_id.to_string(),
            ownership: b.ownership.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct GrantResponse {
    pub room_id: String,
    pub user_id: String,
    pub level: u32,
    pub active: bool,
}

impl From<ParticipantGrant> for GrantResponse {
    fn from(g: ParticipantGrant) -> Self {
        Self {
            room_id: g.room_id.to_string(),
            user_id: g.user_id.to_string(),
            level: g.level.as_u32(),
            active: g.active,
        }
    }
}

// -- Handlers --

/// POST /sessions — register a session.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RelationalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(axum::http::StatusCode, Json<SessionResponse>), ApiError> {
    let session = Session::new(
        SessionId::new(req.id),
        req.agency_id.map(AgencyId::new),
        req.contact_messaging_id.map(Into::into),
    );
    state.store.save_session(session.clone()).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(SessionResponse {
            id: session.id.as_i64(),
            agency_id: session.agency_id.map(|a| a.as_i64()),
            contact_messaging_id: session.contact_messaging_id.map(|m| m.to_string()),
        }),
    ))
}

/// POST /sessions/:id/holding-room — pre-provision an agency holding room.
#[tracing::instrument(skip(state, req))]
pub async fn holding_room<S: RelationalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<HoldingRoomRequest>,
) -> Result<Json<Option<RoomBindingResponse>>, ApiError> {
    let session = load_session(&state, id).await?;
    let contact_credentials = req.contact.map(CredentialsRequest::into_credentials);

    let binding = state
        .rooms
        .ensure_holding_room(&session, contact_credentials.as_ref())
        .await?;

    Ok(Json(binding.map(RoomBindingResponse::from)))
}

/// POST /sessions/:id/assign — bind a consultant-owned room to the session.
#[tracing::instrument(skip(state, req))]
pub async fn assign<S: RelationalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<AssignRoomRequest>,
) -> Result<Json<RoomBindingResponse>, ApiError> {
    let session = load_session(&state, id).await?;
    let consultant = load_consultant(&state, &req.consultant_id).await?;

    let consultant_credentials = req.consultant.into_credentials();
    let contact_credentials = req.contact.map(CredentialsRequest::into_credentials);

    let binding = state
        .rooms
        .assign_room(
            &session,
            &consultant,
            &consultant_credentials,
            contact_credentials.as_ref(),
        )
        .await?;

    Ok(Json(RoomBindingResponse::from(binding)))
}

/// POST /sessions/:id/observers — attach a supervisor as read-only observer.
#[tracing::instrument(skip(state, req))]
pub async fn attach_observer<S: RelationalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<AttachObserverRequest>,
) -> Result<(axum::http::StatusCode, Json<GrantResponse>), ApiError> {
    let session = load_session(&state, id).await?;
    let observer = load_consultant(&state, &req.observer_id).await?;

    let actor_credentials = req.actor.into_credentials();
    let observer_credentials = req.observer.map(CredentialsRequest::into_credentials);

    let grant = state
        .rooms
        .attach_observer(
            &session,
            &observer,
            &actor_credentials,
            observer_credentials.as_ref(),
        )
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(GrantResponse::from(grant)),
    ))
}

/// DELETE /sessions/:id/observers/:observer_id — detach an observer.
#[tracing::instrument(skip(state, req))]
pub async fn detach_observer<S: RelationalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, observer_id)): Path<(i64, String)>,
    Json(req): Json<DetachObserverRequest>,
) -> Result<Json<GrantResponse>, ApiError> {
    let session = load_session(&state, id).await?;
    let observer = load_consultant(&state, &observer_id).await?;
    let actor_credentials = req.actor.into_credentials();

    let grant = state
        .rooms
        .detach_observer(&session, &observer, &actor_credentials)
        .await?;

    Ok(Json(GrantResponse::from(grant)))
}

async fn load_session<S: RelationalStore>(
    state: &AppState<S>,
    id: i64,
) -> Result<Session, ApiError> {
    state
        .store
        .find_session(SessionId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session {id} not found")))
}

async fn load_consultant<S: RelationalStore>(
    state: &AppState<S>,
    id: &str,
) -> Result<domain::Consultant, ApiError> {
    let consultant_id = parse_consultant_id(id)?;
    state
        .store
        .find_consultant(&consultant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Consultant {id} not found")))
}
