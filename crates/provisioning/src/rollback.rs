//! Best-effort compensation of partially-provisioned consultants.

use clients::{IdentityClient, LegacyChatClient, RelationalStore};

use crate::ledger::StepLedger;
use crate::policy::{self, Compensation};

/// Walks a ledger's completed steps in reverse and issues the compensating
/// calls the policy table defines.
///
/// Every compensation is individually guarded: one failing does not stop
/// the walk, and `rollback` itself never fails. This is the only place that
/// deletes provider-side state outside of explicit deactivation.
pub struct RollbackExecutor<'a, I, L, S> {
    identity: &'a I,
    legacy: &'a L,
    store: &'a S,
}

impl<'a, I, L, S> RollbackExecutor<'a, I, L, S>
where
    I: IdentityClient,
    L: LegacyChatClient,
    S: RelationalStore,
{
    /// Creates a rollback executor over the given clients.
    pub fn new(identity: &'a I, legacy: &'a L, store: &'a S) -> Self {
        Self {
            identity,
            legacy,
            store,
        }
    }

    /// Compensates every completed step that has a compensating action, in
    /// reverse order. Returns the number of compensations issued.
    #[tracing::instrument(skip(self, ledger), fields(operation = ledger.operation()))]
    pub async fn rollback(&self, ledger: &StepLedger) -> usize {
        let mut issued = 0;

        for step in ledger.completed_steps().iter().rev() {
            let Some(compensation) = policy::compensation(step) else {
                continue;
            };
            if self.apply(compensation, ledger).await {
                issued += 1;
            }
        }

        tracing::info!(issued, "rollback finished");
        issued
    }

    async fn apply(&self, compensation: Compensation, ledger: &StepLedger) -> bool {
        match compensation {
            Compensation::DeleteIdentity => {
                let Some(provider_id) = ledger.provider_id() else {
                    return false;
                };
                match self.identity.delete_identity(provider_id).await {
                    Ok(()) => {
                        tracing::info!(%provider_id, "compensated: deleted identity");
                        true
                    }
                    Err(e) => {
                        tracing::error!(%provider_id, error = %e, "failed to delete identity during rollback");
                        true
                    }
                }
            }
            Compensation::DeleteLegacyAccount => {
                // The sentinel marks "no account was created"; nothing to do.
                let Some(chat_id) = ledger.legacy_chat_id().filter(|id| !id.is_unknown()) else {
                    return false;
                };
                match self.legacy.delete_account(chat_id).await {
                    Ok(()) => {
                        tracing::info!(%chat_id, "compensated: deleted legacy chat account");
                        true
                    }
                    Err(e) => {
                        tracing::error!(%chat_id, error = %e, "failed to delete legacy account during rollback");
                        true
                    }
                }
            }
            Compensation::DeleteRecord => {
                let Some(record_id) = ledger.record_id() else {
                    return false;
                };
                match self.store.delete_consultant(record_id).await {
                    Ok(()) => {
                        tracing::info!(%record_id, "compensated: deleted store record");
                        true
                    }
                    Err(e) => {
                        tracing::error!(%record_id, error = %e, "failed to delete store record during rollback");
                        true
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clients::{
        IdentityProfile, InMemoryIdentityClient, InMemoryLegacyChatClient, InMemoryStore,
    };
    use common::ChatUserId;

    use crate::steps::*;

    async fn seeded_identity(client: &InMemoryIdentityClient) -> common::ProviderUserId {
        client
            .create_identity(&IdentityProfile {
                username: "erika.m".to_string(),
                first_name: "Erika".to_string(),
                last_name: "Mustermann".to_string(),
                email: "erika@example.org".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn compensates_identity_only_when_only_identity_completed() {
        let identity = InMemoryIdentityClient::new();
        let legacy = InMemoryLegacyChatClient::new();
        let store = InMemoryStore::new();

        let provider_id = seeded_identity(&identity).await;

        let mut ledger = StepLedger::new(OPERATION_CREATE_CONSULTANT);
        ledger.record_provider_id(provider_id);
        ledger.record_completed(STEP_CREATE_IDENTITY);
        ledger.record_failed(STEP_SET_CREDENTIAL, "provider down");

        let executor = RollbackExecutor::new(&identity, &legacy, &store);
        let issued = executor.rollback(&ledger).await;

        assert_eq!(issued, 1);
        assert_eq!(identity.identity_count(), 0);
    }

    #[tokio::test]
    async fn sentinel_legacy_id_is_not_compensated() {
        let identity = InMemoryIdentityClient::new();
        let legacy = InMemoryLegacyChatClient::new();
        let store = InMemoryStore::new();

        let provider_id = seeded_identity(&identity).await;

        let mut ledger = StepLedger::new(OPERATION_CREATE_CONSULTANT);
        ledger.record_provider_id(provider_id);
        ledger.record_completed(STEP_CREATE_IDENTITY);
        ledger.record_completed(STEP_SET_CREDENTIAL);
        ledger.record_completed(STEP_ASSIGN_ROLES);
        ledger.record_legacy_chat_id(ChatUserId::unknown());
        ledger.record_completed(STEP_CREATE_LEGACY_ACCOUNT);
        ledger.record_failed(STEP_PERSIST_RECORD, "store down");

        let executor = RollbackExecutor::new(&identity, &legacy, &store);
        let issued = executor.rollback(&ledger).await;

        // Only the identity deletion; the sentinel has nothing behind it.
        assert_eq!(issued, 1);
        assert_eq!(identity.identity_count(), 0);
        assert_eq!(legacy.account_count(), 0);
    }

    #[tokio::test]
    async fn real_legacy_account_is_deleted() {
        let identity = InMemoryIdentityClient::new();
        let legacy = InMemoryLegacyChatClient::new();
        let store = InMemoryStore::new();

        let provider_id = seeded_identity(&identity).await;
        let chat_id = legacy.create_account("erika.m", "pw").await.unwrap();

        let mut ledger = StepLedger::new(OPERATION_CREATE_CONSULTANT);
        ledger.record_provider_id(provider_id);
        ledger.record_completed(STEP_CREATE_IDENTITY);
        ledger.record_legacy_chat_id(chat_id);
        ledger.record_completed(STEP_CREATE_LEGACY_ACCOUNT);
        ledger.record_failed(STEP_PERSIST_RECORD, "store down");

        let executor = RollbackExecutor::new(&identity, &legacy, &store);
        let issued = executor.rollback(&ledger).await;

        assert_eq!(issued, 2);
        assert_eq!(identity.identity_count(), 0);
        assert_eq!(legacy.account_count(), 0);
    }

    #[tokio::test]
    async fn one_failing_compensation_does_not_stop_the_walk() {
        let identity = InMemoryIdentityClient::new();
        let legacy = InMemoryLegacyChatClient::new();
        let store = InMemoryStore::new();

        let provider_id = seeded_identity(&identity).await;

        let mut ledger = StepLedger::new(OPERATION_CREATE_CONSULTANT);
        ledger.record_provider_id(provider_id);
        ledger.record_completed(STEP_CREATE_IDENTITY);
        // A legacy id that was never actually created: deletion will fail.
        ledger.record_legacy_chat_id(ChatUserId::new("rc-gone"));
        ledger.record_completed(STEP_CREATE_LEGACY_ACCOUNT);
        ledger.record_failed(STEP_PERSIST_RECORD, "store down");

        let executor = RollbackExecutor::new(&identity, &legacy, &store);
        let issued = executor.rollback(&ledger).await;

        // Both compensations attempted; the identity one still lands.
        assert_eq!(issued, 2);
        assert_eq!(identity.identity_count(), 0);
    }

    #[tokio::test]
    async fn empty_ledger_issues_nothing() {
        let identity = InMemoryIdentityClient::new();
        let legacy = InMemoryLegacyChatClient::new();
        let store = InMemoryStore::new();

        let ledger = StepLedger::new(OPERATION_CREATE_CONSULTANT);
        let executor = RollbackExecutor::new(&identity, &legacy, &store);
        assert_eq!(executor.rollback(&ledger).await, 0);
    }
}
