//! Identity provider client trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ProviderUserId;
use domain::Role;

use crate::error::ClientError;

/// Profile data sent to the identity provider on account creation.
#[derive(Debug, Clone)]
pub struct IdentityProfile {
    /// Plain username; the provider rejects encoded forms.
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Trait for identity provider operations.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Creates an identity and returns the provider-assigned id.
    ///
    /// Fails with [`ClientError::Conflict`] if the username is taken.
    async fn create_identity(&self, profile: &IdentityProfile)
    -> Result<ProviderUserId, ClientError>;

    /// Sets the credential on an existing identity.
    async fn set_credential(&self, id: &ProviderUserId, secret: &str) -> Result<(), ClientError>;

    /// Assigns a role to an existing identity.
    async fn assign_role(&self, id: &ProviderUserId, role: Role) -> Result<(), ClientError>;

    /// Deletes an identity, removing its credential and roles with it.
    async fn delete_identity(&self, id: &ProviderUserId) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
struct IdentityRecord {
    username: String,
    credential: Option<String>,
    roles: Vec<Role>,
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    identities: HashMap<ProviderUserId, IdentityRecord>,
    next_id: u32,
    fail_on_create: bool,
    fail_on_set_credential: bool,
    fail_on_assign_role: bool,
}

/// In-memory identity provider for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityClient {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityClient {
    /// Creates a new in-memory identity provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to fail identity creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the provider to fail credential updates.
    pub fn set_fail_on_set_credential(&self, fail: bool) {
        self.state.write().unwrap().fail_on_set_credential = fail;
    }

    /// Configures the provider to fail role assignment.
    pub fn set_fail_on_assign_role(&self, fail: bool) {
        self.state.write().unwrap().fail_on_assign_role = fail;
    }

    /// Returns the number of identities currently present.
    pub fn identity_count(&self) -> usize {
        self.state.read().unwrap().identities.len()
    }

    /// Returns true if an identity exists with the given id.
    pub fn has_identity(&self, id: &ProviderUserId) -> bool {
        self.state.read().unwrap().identities.contains_key(id)
    }

    /// Returns the roles assigned to an identity.
    pub fn roles_of(&self, id: &ProviderUserId) -> Vec<Role> {
        self.state
            .read()
            .unwrap()
            .identities
            .get(id)
            .map(|r| r.roles.clone())
            .unwrap_or_default()
    }

    /// Returns true if the identity has a credential set.
    pub fn has_credential(&self, id: &ProviderUserId) -> bool {
        self.state
            .read()
            .unwrap()
            .identities
            .get(id)
            .is_some_and(|r| r.credential.is_some())
    }
}

#[async_trait]
impl IdentityClient for InMemoryIdentityClient {
    async fn create_identity(
        &self,
        profile: &IdentityProfile,
    ) -> Result<ProviderUserId, ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(ClientError::Unavailable(
                "identity provider down".to_string(),
            ));
        }

        if state
            .identities
            .values()
            .any(|r| r.username == profile.username)
        {
            return Err(ClientError::Conflict(format!(
                "username '{}' already exists",
                profile.username
            )));
        }

        state.next_id += 1;
        let id = ProviderUserId::new(format!("idp-{:04}", state.next_id));
        state.identities.insert(
            id.clone(),
            IdentityRecord {
                username: profile.username.clone(),
                credential: None,
                roles: Vec::new(),
            },
        );

        Ok(id)
    }

    async fn set_credential(&self, id: &ProviderUserId, secret: &str) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_set_credential {
            return Err(ClientError::Unavailable(
                "identity provider down".to_string(),
            ));
        }

        let record = state
            .identities
            .get_mut(id)
            .ok_or_else(|| ClientError::NotFound(format!("identity {id}")))?;
        record.credential = Some(secret.to_string());
        Ok(())
    }

    async fn assign_role(&self, id: &ProviderUserId, role: Role) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_assign_role {
            return Err(ClientError::Unavailable(
                "identity provider down".to_string(),
            ));
        }

        let record = state
            .identities
            .get_mut(id)
            .ok_or_else(|| ClientError::NotFound(format!("identity {id}")))?;
        if !record.roles.contains(&role) {
            record.roles.push(role);
        }
        Ok(())
    }

    async fn delete_identity(&self, id: &ProviderUserId) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();
        state
            .identities
            .remove(id)
            .ok_or_else(|| ClientError::NotFound(format!("identity {id}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: &str) -> IdentityProfile {
        IdentityProfile {
            username: username.to_string(),
            first_name: "Erika".to_string(),
            last_name: "Mustermann".to_string(),
            email: "erika@example.org".to_string(),
        }
    }

    #[tokio::test]
    async fn create_set_credential_assign_role() {
        let client = InMemoryIdentityClient::new();
        let id = client.create_identity(&profile("erika.m")).await.unwrap();

        client.set_credential(&id, "pw").await.unwrap();
        client.assign_role(&id, Role::Consultant).await.unwrap();

        assert!(client.has_identity(&id));
        assert!(client.has_credential(&id));
        assert_eq!(client.roles_of(&id), vec![Role::Consultant]);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let client = InMemoryIdentityClient::new();
        client.create_identity(&profile("erika.m")).await.unwrap();

        let result = client.create_identity(&profile("erika.m")).await;
        assert!(matches!(result, Err(ClientError::Conflict(_))));
        assert_eq!(client.identity_count(), 1);
    }

    #[tokio::test]
    async fn delete_removes_identity() {
        let client = InMemoryIdentityClient::new();
        let id = client.create_identity(&profile("erika.m")).await.unwrap();

        client.delete_identity(&id).await.unwrap();
        assert!(!client.has_identity(&id));
        assert_eq!(client.identity_count(), 0);
    }

    #[tokio::test]
    async fn assign_role_is_idempotent() {
        let client = InMemoryIdentityClient::new();
        let id = client.create_identity(&profile("erika.m")).await.unwrap();

        client.assign_role(&id, Role::Consultant).await.unwrap();
        client.assign_role(&id, Role::Consultant).await.unwrap();
        assert_eq!(client.roles_of(&id).len(), 1);
    }
}
