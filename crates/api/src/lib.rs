//! HTTP surface for the provisioning service.
//!
//! The controllers here are deliberately thin: request/response mapping
//! only. Provisioning behavior lives in the `provisioning` crate, room
//! behavior in `rooms`; both are wired against the session's store and the
//! in-memory reference clients by [`create_default_state`].

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use clients::{
    InMemoryIdentityClient, InMemoryLegacyChatClient, InMemoryMessagingClient,
    InMemorySchedulingClient, RelationalStore, TokenCache,
};
use metrics_exporter_prometheus::PrometheusHandle;
use provisioning::ProvisioningSaga;
use rooms::{InMemoryAgencyDirectory, RoomLifecycleManager};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: RelationalStore> {
    pub saga: ProvisioningSaga<
        InMemoryIdentityClient,
        InMemoryLegacyChatClient,
        InMemoryMessagingClient,
        S,
        InMemorySchedulingClient,
    >,
    pub rooms: RoomLifecycleManager<InMemoryMessagingClient, S, InMemoryAgencyDirectory>,
    pub store: S,
    pub messaging: InMemoryMessagingClient,
    pub agencies: InMemoryAgencyDirectory,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RelationalStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/consultants", post(routes::consultants::create::<S>))
        .route("/consultants/{id}", get(routes::consultants::get::<S>))
        .route("/sessions", post(routes::sessions::create::<S>))
        .route(
            "/sessions/{id}/holding-room",
            post(routes::sessions::holding_room::<S>),
        )
        .route("/sessions/{id}/assign", post(routes::sessions::assign::<S>))
        .route(
            "/sessions/{id}/observers",
            post(routes::sessions::attach_observer::<S>),
        )
        .route(
            "/sessions/{id}/observers/{observer_id}",
            delete(routes::sessions::detach_observer::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over a store, with in-memory
/// reference clients for the remote systems and a shared token cache.
pub fn create_default_state<S: RelationalStore + Clone + 'static>(
    store: S,
    scheduling_enabled: bool,
) -> Arc<AppState<S>> {
    let identity = InMemoryIdentityClient::new();
    let legacy = InMemoryLegacyChatClient::new();
    let messaging = InMemoryMessagingClient::new();
    let scheduling = InMemorySchedulingClient::new();
    let agencies = InMemoryAgencyDirectory::new();
    let tokens = TokenCache::with_default_ttl();

    let saga = ProvisioningSaga::new(
        identity,
        legacy,
        messaging.clone(),
        store.clone(),
        scheduling,
    )
    .with_scheduling(scheduling_enabled);

    let rooms = RoomLifecycleManager::new(messaging.clone(), store.clone(), agencies.clone())
        .with_token_cache(tokens);

    Arc::new(AppState {
        saga,
        rooms,
        store,
        messaging,
        agencies,
    })
}
