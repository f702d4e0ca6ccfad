//! Relational store client.
//!
//! The store is the system of record for consultants, sessions, room
//! bindings, and participant grants. It assigns the local consultant id on
//! save; everything before that point lives only in the other backing
//! systems and in the saga's ledger.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use common::{ConsultantId, MessagingUserId, RoomId, SessionId};
use domain::{Consultant, ParticipantGrant, RoomBinding, Session};

use crate::error::ClientError;

/// Trait for relational store operations.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Persists a consultant, assigning a local id if it has none.
    /// Returns the stored record.
    async fn save_consultant(&self, consultant: Consultant) -> Result<Consultant, ClientError>;

    /// Deletes a consultant record. Only the provisioning rollback and
    /// explicit deactivation call this.
    async fn delete_consultant(&self, id: &ConsultantId) -> Result<(), ClientError>;

    /// Loads a consultant by local id.
    async fn find_consultant(&self, id: &ConsultantId) -> Result<Option<Consultant>, ClientError>;

    /// Lists consultants provisioned without a messaging identity — the
    /// query a reconciliation job would poll to heal the gap.
    async fn consultants_missing_messaging_id(&self) -> Result<Vec<Consultant>, ClientError>;

    /// Persists a session (upsert).
    async fn save_session(&self, session: Session) -> Result<(), ClientError>;

    /// Loads a session by id.
    async fn find_session(&self, id: SessionId) -> Result<Option<Session>, ClientError>;

    /// Persists a session's room binding. A session has at most one
    /// binding; saving replaces any existing one.
    async fn save_binding(&self, binding: RoomBinding) -> Result<(), ClientError>;

    /// Loads the room binding for a session, if any.
    async fn binding_for_session(&self, id: SessionId) -> Result<Option<RoomBinding>, ClientError>;

    /// Records a participant grant.
    async fn save_grant(&self, grant: ParticipantGrant) -> Result<(), ClientError>;

    /// Returns the active grant for a user in a room, if any.
    async fn active_grant(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
    ) -> Result<Option<ParticipantGrant>, ClientError>;

    /// Deactivates the active grant for a user in a room, recording the
    /// removal time. Returns the updated grant, or `None` if there was no
    /// active grant.
    async fn deactivate_grant(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
    ) -> Result<Option<ParticipantGrant>, ClientError>;
}
