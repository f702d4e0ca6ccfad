//! Legacy group-chat client trait and in-memory implementation.
//!
//! The legacy system is being phased out. Account creation is optional by
//! policy: the saga substitutes the `unknown` sentinel when this client
//! fails rather than aborting provisioning.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ChatUserId;

use crate::error::ClientError;

/// Trait for the legacy group-chat system.
#[async_trait]
pub trait LegacyChatClient: Send + Sync {
    /// Creates an account and returns its id.
    async fn create_account(&self, username: &str, secret: &str)
    -> Result<ChatUserId, ClientError>;

    /// Deletes an account. Deleting the sentinel id is a caller bug.
    async fn delete_account(&self, id: &ChatUserId) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
struct InMemoryLegacyChatState {
    accounts: HashMap<ChatUserId, String>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory legacy chat system for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLegacyChatClient {
    state: Arc<RwLock<InMemoryLegacyChatState>>,
}

impl InMemoryLegacyChatClient {
    /// Creates a new in-memory legacy chat client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the client to fail account creation, simulating the
    /// legacy system being down.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of accounts currently present.
    pub fn account_count(&self) -> usize {
        self.state.read().unwrap().accounts.len()
    }

    /// Returns true if an account exists with the given id.
    pub fn has_account(&self, id: &ChatUserId) -> bool {
        self.state.read().unwrap().accounts.contains_key(id)
    }
}

#[async_trait]
impl LegacyChatClient for InMemoryLegacyChatClient {
    async fn create_account(
        &self,
        username: &str,
        _secret: &str,
    ) -> Result<ChatUserId, ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(ClientError::Unavailable("legacy chat down".to_string()));
        }

        state.next_id += 1;
        let id = ChatUserId::new(format!("rc-{:04}", state.next_id));
        state.accounts.insert(id.clone(), username.to_string());
        Ok(id)
    }

    async fn delete_account(&self, id: &ChatUserId) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();
        state
            .accounts
            .remove(id)
            .ok_or_else(|| ClientError::NotFound(format!("legacy account {id}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_delete_account() {
        let client = InMemoryLegacyChatClient::new();
        let id = client.create_account("erika.m", "pw").await.unwrap();

        assert!(client.has_account(&id));
        assert!(!id.is_unknown());

        client.delete_account(&id).await.unwrap();
        assert_eq!(client.account_count(), 0);
    }

    #[tokio::test]
    async fn create_fails_when_system_down() {
        let client = InMemoryLegacyChatClient::new();
        client.set_fail_on_create(true);

        let result = client.create_account("erika.m", "pw").await;
        assert!(matches!(result, Err(ClientError::Unavailable(_))));
        assert_eq!(client.account_count(), 0);
    }
}
