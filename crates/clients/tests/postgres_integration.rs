//! PostgreSQL store integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p clients --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use clients::{ClientError, PostgresStore, RelationalStore};
use common::{AgencyId, MessagingUserId, RoomId, SessionId};
use domain::{
    Consultant, ConsultantStatus, ParticipantGrant, PermissionLevel, RoomBinding, Role, Session,
    encode_username,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_provisioning_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE participant_grants, room_bindings, sessions, consultants")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn make_consultant(username: &str) -> Consultant {
    Consultant {
        id: None,
        provider_id: "idp-0001".into(),
        username: encode_username(username),
        first_name: "Erika".to_string(),
        last_name: "Mustermann".to_string(),
        email: "erika@example.org".to_string(),
        legacy_chat_id: common::ChatUserId::unknown(),
        messaging_id: None,
        roles: vec![Role::Consultant, Role::Supervisor],
        status: ConsultantStatus::Created,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn save_and_find_consultant() {
    let store = get_test_store().await;

    let saved = store
        .save_consultant(make_consultant("erika.m"))
        .await
        .unwrap();
    let id = saved.id.expect("id assigned on save");

    let found = store.find_consultant(&id).await.unwrap().unwrap();
    assert_eq!(found.username, encode_username("erika.m"));
    assert_eq!(found.roles, vec![Role::Consultant, Role::Supervisor]);
    assert_eq!(found.status, ConsultantStatus::Created);
    assert!(found.legacy_chat_id.is_unknown());
    assert!(found.messaging_id.is_none());
}

#[tokio::test]
async fn duplicate_username_is_a_constraint_violation() {
    let store = get_test_store().await;

    store
        .save_consultant(make_consultant("erika.m"))
        .await
        .unwrap();

    let result = store.save_consultant(make_consultant("erika.m")).await;
    assert!(matches!(result, Err(ClientError::ConstraintViolation(_))));
}

#[tokio::test]
async fn delete_consultant_removes_record() {
    let store = get_test_store().await;

    let saved = store
        .save_consultant(make_consultant("erika.m"))
        .await
        .unwrap();
    let id = saved.id.unwrap();

    store.delete_consultant(&id).await.unwrap();
    assert!(store.find_consultant(&id).await.unwrap().is_none());

    let result = store.delete_consultant(&id).await;
    assert!(matches!(result, Err(ClientError::NotFound(_))));
}

#[tokio::test]
async fn missing_messaging_id_query_finds_the_gap() {
    let store = get_test_store().await;

    store
        .save_consultant(make_consultant("erika.m"))
        .await
        .unwrap();

    let mut healed = make_consultant("max.m");
    healed.messaging_id = Some(MessagingUserId::new("@max.m:chat.example.test"));
    store.save_consultant(healed).await.unwrap();

    let missing = store.consultants_missing_messaging_id().await.unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].username, encode_username("erika.m"));
}

#[tokio::test]
async fn session_roundtrip() {
    let store = get_test_store().await;

    let session = Session::new(
        SessionId::new(42),
        Some(AgencyId::new(7)),
        Some(MessagingUserId::new("@contact:chat.example.test")),
    );
    store.save_session(session.clone()).await.unwrap();

    let found = store.find_session(SessionId::new(42)).await.unwrap();
    assert_eq!(found, Some(session));
}

#[tokio::test]
async fn binding_upsert_replaces_existing() {
    let store = get_test_store().await;

    let session = Session::new(SessionId::new(1), None, None);
    store.save_session(session).await.unwrap();

    store
        .save_binding(RoomBinding::holding(SessionId::new(1), RoomId::new("!r1")))
        .await
        .unwrap();
    store
        .save_binding(RoomBinding::assigned(SessionId::new(1), RoomId::new("!r2")))
        .await
        .unwrap();

    let binding = store
        .binding_for_session(SessionId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(binding.room_id, RoomId::new("!r2"));
    assert!(!binding.is_holding());
}

#[tokio::test]
async fn grant_deactivation_records_removal() {
    let store = get_test_store().await;

    let room = RoomId::new("!r1");
    let user = MessagingUserId::new("@sup:chat.example.test");

    store
        .save_grant(ParticipantGrant::new(
            room.clone(),
            user.clone(),
            PermissionLevel::OBSERVER,
        ))
        .await
        .unwrap();

    let active = store.active_grant(&room, &user).await.unwrap().unwrap();
    assert_eq!(active.level, PermissionLevel::OBSERVER);

    let revoked = store.deactivate_grant(&room, &user).await.unwrap().unwrap();
    assert!(!revoked.active);
    assert!(revoked.removed_at.is_some());

    assert!(store.active_grant(&room, &user).await.unwrap().is_none());
    assert!(store.deactivate_grant(&room, &user).await.unwrap().is_none());
}
