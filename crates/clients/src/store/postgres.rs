//! PostgreSQL-backed relational store.

use async_trait::async_trait;
use common::{ConsultantId, MessagingUserId, RoomId, SessionId};
use domain::{
    Consultant, ConsultantStatus, ParticipantGrant, PermissionLevel, RoomBinding, RoomOwnership,
    Session,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::ClientError;
use crate::store::RelationalStore;

/// PostgreSQL store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_consultant(row: PgRow) -> Result<Consultant, ClientError> {
        let roles_json: serde_json::Value = row.try_get("roles")?;
        let roles = serde_json::from_value(roles_json)?;
        let status_str: String = row.try_get("status")?;
        let status: ConsultantStatus =
            serde_json::from_value(serde_json::Value::String(status_str))?;

        Ok(Consultant {
            id: Some(ConsultantId::from_uuid(row.try_get::<Uuid, _>("id")?)),
            provider_id: row.try_get::<String, _>("provider_id")?.into(),
            username: row.try_get("username")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            legacy_chat_id: row.try_get::<String, _>("legacy_chat_id")?.into(),
            messaging_id: row
                .try_get::<Option<String>, _>("messaging_id")?
                .map(Into::into),
            roles,
            status,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_binding(row: PgRow) -> Result<RoomBinding, ClientError> {
        let ownership_str: String = row.try_get("ownership")?;
        let ownership = match ownership_str.as_str() {
            "Holding" => RoomOwnership::Holding,
            _ => RoomOwnership::Assigned,
        };

        Ok(RoomBinding {
            session_id: SessionId::new(row.try_get("session_id")?),
            room_id: row.try_get::<String, _>("room_id")?.into(),
            ownership,
            bound_at: row.try_get("bound_at")?,
        })
    }

    fn row_to_grant(row: PgRow) -> Result<ParticipantGrant, ClientError> {
        Ok(ParticipantGrant {
            room_id: row.try_get::<String, _>("room_id")?.into(),
            user_id: row.try_get::<String, _>("user_id")?.into(),
            level: PermissionLevel::new(row.try_get::<i32, _>("level")? as u32),
            granted_at: row.try_get("granted_at")?,
            removed_at: row.try_get("removed_at")?,
            active: row.try_get("active")?,
        })
    }
}

#[async_trait]
impl RelationalStore for PostgresStore {
    async fn save_consultant(&self, mut consultant: Consultant) -> Result<Consultant, ClientError> {
        let id = consultant.id.unwrap_or_else(ConsultantId::new);
        consultant.id = Some(id);

        let roles_json = serde_json::to_value(&consultant.roles)?;

        sqlx::query(
            r#"
            INSERT INTO consultants
                (id, provider_id, username, first_name, last_name, email,
                 legacy_chat_id, messaging_id, roles, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                provider_id = EXCLUDED.provider_id,
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                email = EXCLUDED.email,
                legacy_chat_id = EXCLUDED.legacy_chat_id,
                messaging_id = EXCLUDED.messaging_id,
                roles = EXCLUDED.roles,
                status = EXCLUDED.status
            "#,
        )
        .bind(id.as_uuid())
        .bind(consultant.provider_id.as_str())
        .bind(&consultant.username)
        .bind(&consultant.first_name)
        .bind(&consultant.last_name)
        .bind(&consultant.email)
        .bind(consultant.legacy_chat_id.as_str())
        .bind(consultant.messaging_id.as_ref().map(|m| m.as_str()))
        .bind(roles_json)
        .bind(consultant.status.as_str())
        .bind(consultant.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // The unique username index rejects duplicate records.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("consultants_username_key")
            {
                return ClientError::ConstraintViolation(format!(
                    "username '{}' already stored",
                    consultant.username
                ));
            }
            ClientError::Database(e)
        })?;

        Ok(consultant)
    }

    async fn delete_consultant(&self, id: &ConsultantId) -> Result<(), ClientError> {
        let result = sqlx::query("DELETE FROM consultants WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ClientError::NotFound(format!("consultant {id}")));
        }
        Ok(())
    }

    async fn find_consultant(&self, id: &ConsultantId) -> Result<Option<Consultant>, ClientError> {
        let row = sqlx::query("SELECT * FROM consultants WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_consultant).transpose()
    }

    async fn consultants_missing_messaging_id(&self) -> Result<Vec<Consultant>, ClientError> {
        let rows = sqlx::query(
            "SELECT * FROM consultants WHERE messaging_id IS NULL ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_consultant).collect()
    }

    async fn save_session(&self, session: Session) -> Result<(), ClientError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, agency_id, contact_messaging_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                agency_id = EXCLUDED.agency_id,
                contact_messaging_id = EXCLUDED.contact_messaging_id
            "#,
        )
        .bind(session.id.as_i64())
        .bind(session.agency_id.map(|a| a.as_i64()))
        .bind(session.contact_messaging_id.as_ref().map(|m| m.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, id: SessionId) -> Result<Option<Session>, ClientError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(|row| -> Result<Session, ClientError> {
                Ok(Session {
                    id: SessionId::new(row.try_get("id")?),
                    agency_id: row
                        .try_get::<Option<i64>, _>("agency_id")?
                        .map(common::AgencyId::new),
                    contact_messaging_id: row
                        .try_get::<Option<String>, _>("contact_messaging_id")?
                        .map(Into::into),
                })
            })
            .transpose()?)
    }

    async fn save_binding(&self, binding: RoomBinding) -> Result<(), ClientError> {
        sqlx::query(
            r#"
            INSERT INTO room_bindings (session_id, room_id, ownership, bound_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id) DO UPDATE SET
                room_id = EXCLUDED.room_id,
                ownership = EXCLUDED.ownership,
                bound_at = EXCLUDED.bound_at
            "#,
        )
        .bind(binding.session_id.as_i64())
        .bind(binding.room_id.as_str())
        .bind(binding.ownership.as_str())
        .bind(binding.bound_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn binding_for_session(&self, id: SessionId) -> Result<Option<RoomBinding>, ClientError> {
        let row = sqlx::query("SELECT * FROM room_bindings WHERE session_id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_binding).transpose()
    }

    async fn save_grant(&self, grant: ParticipantGrant) -> Result<(), ClientError> {
        sqlx::query(
            r#"
            INSERT INTO participant_grants
                (room_id, user_id, level, granted_at, removed_at, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(grant.room_id.as_str())
        .bind(grant.user_id.as_str())
        .bind(grant.level.as_u32() as i32)
        .bind(grant.granted_at)
        .bind(grant.removed_at)
        .bind(grant.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_grant(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
    ) -> Result<Option<ParticipantGrant>, ClientError> {
        let row = sqlx::query(
            "SELECT * FROM participant_grants WHERE room_id = $1 AND user_id = $2 AND active",
        )
        .bind(room.as_str())
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_grant).transpose()
    }

    async fn deactivate_grant(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
    ) -> Result<Option<ParticipantGrant>, ClientError> {
        let row = sqlx::query(
            r#"
            UPDATE participant_grants
            SET active = FALSE, removed_at = NOW()
            WHERE room_id = $1 AND user_id = $2 AND active
            RETURNING *
            "#,
        )
        .bind(room.as_str())
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_grant).transpose()
    }
}
