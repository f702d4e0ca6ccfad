//! Scheduling/appointment service client trait and in-memory implementation.
//!
//! Registration here is a go/no-go gate for consultant classes that take
//! appointments: the saga treats a failure as fatal and unwinds everything,
//! including the already-persisted store record.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ProviderUserId;
use domain::Consultant;

use crate::error::ClientError;

/// Trait for the external scheduling service.
#[async_trait]
pub trait SchedulingClient: Send + Sync {
    /// Registers a consultant with the scheduling service.
    async fn register_consultant(&self, consultant: &Consultant) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
struct InMemorySchedulingState {
    registered: HashSet<ProviderUserId>,
    fail_on_register: bool,
}

/// In-memory scheduling service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchedulingClient {
    state: Arc<RwLock<InMemorySchedulingState>>,
}

impl InMemorySchedulingClient {
    /// Creates a new in-memory scheduling service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail registration.
    pub fn set_fail_on_register(&self, fail: bool) {
        self.state.write().unwrap().fail_on_register = fail;
    }

    /// Returns the number of registered consultants.
    pub fn registered_count(&self) -> usize {
        self.state.read().unwrap().registered.len()
    }
}

#[async_trait]
impl SchedulingClient for InMemorySchedulingClient {
    async fn register_consultant(&self, consultant: &Consultant) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_register {
            return Err(ClientError::Unavailable(
                "scheduling service down".to_string(),
            ));
        }

        state.registered.insert(consultant.provider_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{ConsultantStatus, Role, encode_username};

    fn consultant() -> Consultant {
        Consultant {
            id: None,
            provider_id: "idp-0001".into(),
            username: encode_username("erika.m"),
            first_name: "Erika".to_string(),
            last_name: "Mustermann".to_string(),
            email: "erika@example.org".to_string(),
            legacy_chat_id: common::ChatUserId::unknown(),
            messaging_id: None,
            roles: vec![Role::Consultant],
            status: ConsultantStatus::Created,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn register_records_consultant() {
        let client = InMemorySchedulingClient::new();
        client.register_consultant(&consultant()).await.unwrap();
        assert_eq!(client.registered_count(), 1);
    }

    #[tokio::test]
    async fn register_fails_when_down() {
        let client = InMemorySchedulingClient::new();
        client.set_fail_on_register(true);

        let result = client.register_consultant(&consultant()).await;
        assert!(matches!(result, Err(ClientError::Unavailable(_))));
        assert_eq!(client.registered_count(), 0);
    }
}
