//! In-memory relational store for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{ConsultantId, MessagingUserId, RoomId, SessionId};
use domain::{Consultant, ParticipantGrant, RoomBinding, Session};
use tokio::sync::RwLock;

use crate::error::ClientError;
use crate::store::RelationalStore;

#[derive(Debug, Default)]
struct InMemoryStoreState {
    consultants: HashMap<ConsultantId, Consultant>,
    sessions: HashMap<SessionId, Session>,
    bindings: HashMap<SessionId, RoomBinding>,
    grants: Vec<ParticipantGrant>,
    fail_on_save_consultant: bool,
    fail_on_save_binding: bool,
}

/// In-memory store implementation with the same interface as the
/// PostgreSQL one.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail consultant saves.
    pub async fn set_fail_on_save_consultant(&self, fail: bool) {
        self.state.write().await.fail_on_save_consultant = fail;
    }

    /// Configures the store to fail binding saves.
    pub async fn set_fail_on_save_binding(&self, fail: bool) {
        self.state.write().await.fail_on_save_binding = fail;
    }

    /// Returns the number of consultant records.
    pub async fn consultant_count(&self) -> usize {
        self.state.read().await.consultants.len()
    }

    /// Returns the number of room bindings.
    pub async fn binding_count(&self) -> usize {
        self.state.read().await.bindings.len()
    }

    /// Returns the number of grants ever recorded, active or not.
    pub async fn grant_count(&self) -> usize {
        self.state.read().await.grants.len()
    }
}

#[async_trait]
impl RelationalStore for InMemoryStore {
    async fn save_consultant(&self, mut consultant: Consultant) -> Result<Consultant, ClientError> {
        let mut state = self.state.write().await;

        if state.fail_on_save_consultant {
            return Err(ClientError::Unavailable("store down".to_string()));
        }

        let duplicate = state.consultants.values().any(|c| {
            c.username == consultant.username && c.id != consultant.id
        });
        if duplicate {
            return Err(ClientError::ConstraintViolation(format!(
                "username '{}' already stored",
                consultant.username
            )));
        }

        let id = consultant.id.unwrap_or_else(ConsultantId::new);
        consultant.id = Some(id);
        state.consultants.insert(id, consultant.clone());

        Ok(consultant)
    }

    async fn delete_consultant(&self, id: &ConsultantId) -> Result<(), ClientError> {
        let mut state = self.state.write().await;
        state
            .consultants
            .remove(id)
            .ok_or_else(|| ClientError::NotFound(format!("consultant {id}")))?;
        Ok(())
    }

    async fn find_consultant(&self, id: &ConsultantId) -> Result<Option<Consultant>, ClientError> {
        Ok(self.state.read().await.consultants.get(id).cloned())
    }

    async fn consultants_missing_messaging_id(&self) -> Result<Vec<Consultant>, ClientError> {
        Ok(self
            .state
            .read()
            .await
            .consultants
            .values()
            .filter(|c| c.messaging_id.is_none())
            .cloned()
            .collect())
    }

    async fn save_session(&self, session: Session) -> Result<(), ClientError> {
        self.state
            .write()
            .await
            .sessions
            .insert(session.id, session);
        Ok(())
    }

    async fn find_session(&self, id: SessionId) -> Result<Option<Session>, ClientError> {
        Ok(self.state.read().await.sessions.get(&id).cloned())
    }

    async fn save_binding(&self, binding: RoomBinding) -> Result<(), ClientError> {
        let mut state = self.state.write().await;

        if state.fail_on_save_binding {
            return Err(ClientError::Unavailable("store down".to_string()));
        }

        state.bindings.insert(binding.session_id, binding);
        Ok(())
    }

    async fn binding_for_session(&self, id: SessionId) -> Result<Option<RoomBinding>, ClientError> {
        Ok(self.state.read().await.bindings.get(&id).cloned())
    }

    async fn save_grant(&self, grant: ParticipantGrant) -> Result<(), ClientError> {
        self.state.write().await.grants.push(grant);
        Ok(())
    }

    async fn active_grant(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
    ) -> Result<Option<ParticipantGrant>, ClientError> {
        Ok(self
            .state
            .read()
            .await
            .grants
            .iter()
            .find(|g| g.active && &g.room_id == room && &g.user_id == user)
            .cloned())
    }

    async fn deactivate_grant(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
    ) -> Result<Option<ParticipantGrant>, ClientError> {
        let mut state = self.state.write().await;
        let grant = state
            .grants
            .iter_mut()
            .find(|g| g.active && &g.room_id == room && &g.user_id == user);

        Ok(grant.map(|g| {
            g.active = false;
            g.removed_at = Some(Utc::now());
            g.clone()
        }))
    }
}
