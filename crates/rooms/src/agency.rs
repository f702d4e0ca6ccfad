//! Agency service-account lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use clients::ClientError;
use common::{AgencyId, MessagingUserId};
use domain::MessagingCredentials;

/// Messaging service-account credentials configured for an agency.
///
/// Not every agency has one; absence means the agency simply never
/// pre-provisions holding rooms.
#[derive(Clone)]
pub struct ServiceAccount {
    pub messaging_id: MessagingUserId,
    password: String,
}

impl ServiceAccount {
    /// Creates a service account record.
    pub fn new(messaging_id: MessagingUserId, password: impl Into<String>) -> Self {
        Self {
            messaging_id,
            password: password.into(),
        }
    }

    /// Returns the login credentials for this account.
    pub fn credentials(&self) -> MessagingCredentials {
        MessagingCredentials::for_user(&self.messaging_id, self.password.clone())
    }
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("messaging_id", &self.messaging_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Trait for looking up agency messaging service accounts.
#[async_trait]
pub trait AgencyDirectory: Send + Sync {
    /// Returns the agency's service account, or `None` if the agency has
    /// none configured.
    async fn service_account(
        &self,
        agency: AgencyId,
    ) -> Result<Option<ServiceAccount>, ClientError>;
}

#[derive(Default)]
struct InMemoryAgencyState {
    accounts: HashMap<AgencyId, ServiceAccount>,
    fail_on_lookup: bool,
}

/// In-memory agency directory for testing.
#[derive(Clone, Default)]
pub struct InMemoryAgencyDirectory {
    state: Arc<RwLock<InMemoryAgencyState>>,
}

impl InMemoryAgencyDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures a service account for an agency.
    pub fn set_service_account(&self, agency: AgencyId, account: ServiceAccount) {
        self.state.write().unwrap().accounts.insert(agency, account);
    }

    /// Removes an agency's service account.
    pub fn remove_service_account(&self, agency: AgencyId) {
        self.state.write().unwrap().accounts.remove(&agency);
    }

    /// Configures the directory to fail lookups.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().unwrap().fail_on_lookup = fail;
    }
}

#[async_trait]
impl AgencyDirectory for InMemoryAgencyDirectory {
    async fn service_account(
        &self,
        agency: AgencyId,
    ) -> Result<Option<ServiceAccount>, ClientError> {
        let state = self.state.read().unwrap();
        if state.fail_on_lookup {
            return Err(ClientError::Unavailable("agency service down".to_string()));
        }
        Ok(state.accounts.get(&agency).cloned())
    }
}
