//! The provisioning saga orchestrator.

use chrono::Utc;
use clients::{
    ClientError, IdentityClient, IdentityProfile, LegacyChatClient, MessagingClient,
    RelationalStore, SchedulingClient,
};
use common::ChatUserId;
use domain::{Consultant, ConsultantStatus, NewConsultant};

use crate::error::ProvisioningError;
use crate::ledger::StepLedger;
use crate::rollback::RollbackExecutor;
use crate::steps;

/// Orchestrates consultant creation across the identity provider, the
/// messaging system, the legacy chat system, the relational store, and
/// optionally the scheduling service.
///
/// Steps run strictly in order on the calling task; each step may depend on
/// an identifier produced by the one before it. On a fatal step failure the
/// rollback executor runs synchronously before the error is returned, so a
/// caller never observes a half-created consultant as success.
pub struct ProvisioningSaga<I, L, M, S, A>
where
    I: IdentityClient,
    L: LegacyChatClient,
    M: MessagingClient,
    S: RelationalStore,
    A: SchedulingClient,
{
    identity: I,
    legacy: L,
    messaging: M,
    store: S,
    scheduling: A,
    scheduling_enabled: bool,
}

impl<I, L, M, S, A> ProvisioningSaga<I, L, M, S, A>
where
    I: IdentityClient,
    L: LegacyChatClient,
    M: MessagingClient,
    S: RelationalStore,
    A: SchedulingClient,
{
    /// Creates a new saga over the given clients. Scheduling registration
    /// is disabled until enabled explicitly.
    pub fn new(identity: I, legacy: L, messaging: M, store: S, scheduling: A) -> Self {
        Self {
            identity,
            legacy,
            messaging,
            store,
            scheduling,
            scheduling_enabled: false,
        }
    }

    /// Enables or disables the scheduling go/no-go gate (step 7).
    pub fn with_scheduling(mut self, enabled: bool) -> Self {
        self.scheduling_enabled = enabled;
        self
    }

    /// Provisions a new consultant.
    ///
    /// The input carries the plain username and password; the plain forms
    /// go to the identity provider and the messaging system, the store only
    /// ever sees the encoded username, and the password is dropped when
    /// this returns.
    #[tracing::instrument(skip(self, input), fields(username = %input.username))]
    pub async fn provision(&self, input: NewConsultant) -> Result<Consultant, ProvisioningError> {
        if input.password.is_empty() {
            return Err(ProvisioningError::Validation(
                "a credential is required".to_string(),
            ));
        }
        if input.roles.is_empty() {
            return Err(ProvisioningError::Validation(
                "at least one role must be assigned".to_string(),
            ));
        }

        metrics::counter!("provisioning_total").increment(1);
        let started = std::time::Instant::now();

        let mut ledger = StepLedger::new(steps::OPERATION_CREATE_CONSULTANT);

        // 1. Create the identity. A conflict is surfaced verbatim: nothing
        // exists yet, so there is nothing to compensate and no retry here.
        let profile = IdentityProfile {
            username: input.username.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
        };
        let provider_id = match self.identity.create_identity(&profile).await {
            Ok(id) => id,
            Err(e) if e.is_conflict() => {
                tracing::warn!(username = %input.username, "identity already exists");
                return Err(ProvisioningError::Conflict(e.to_string()));
            }
            Err(e) => {
                ledger.record_failed(steps::STEP_CREATE_IDENTITY, e.to_string());
                return Err(self.fail(&ledger, steps::STEP_CREATE_IDENTITY, e).await);
            }
        };
        ledger.record_provider_id(provider_id.clone());
        ledger.record_completed(steps::STEP_CREATE_IDENTITY);

        // 2. Set the credential.
        if let Err(e) = self
            .identity
            .set_credential(&provider_id, &input.password)
            .await
        {
            ledger.record_failed(steps::STEP_SET_CREDENTIAL, e.to_string());
            return Err(self.fail(&ledger, steps::STEP_SET_CREDENTIAL, e).await);
        }
        ledger.record_completed(steps::STEP_SET_CREDENTIAL);

        // 3. Assign roles.
        for role in &input.roles {
            if let Err(e) = self.identity.assign_role(&provider_id, *role).await {
                ledger.record_failed(steps::STEP_ASSIGN_ROLES, e.to_string());
                return Err(self.fail(&ledger, steps::STEP_ASSIGN_ROLES, e).await);
            }
        }
        ledger.record_completed(steps::STEP_ASSIGN_ROLES);

        // 4. Messaging account, best-effort with the plain username
        // captured before the store encoding. A consultant without a
        // messaging identity is provisioned anyway and healed out-of-band.
        let messaging_id = match self
            .messaging
            .create_account(&input.username, &input.password, &input.display_name())
            .await
        {
            Ok(id) => {
                ledger.record_messaging_id(id.clone());
                ledger.record_completed(steps::STEP_CREATE_MESSAGING_ACCOUNT);
                Some(id)
            }
            Err(e) => {
                tracing::warn!(username = %input.username, error = %e,
                    "messaging account creation failed, continuing without messaging identity");
                metrics::counter!("provisioning_degraded").increment(1);
                None
            }
        };

        // 5. Legacy chat account; the phased-out system must not block
        // provisioning, so failure substitutes the sentinel.
        let legacy_chat_id = match self
            .legacy
            .create_account(&input.username, &input.password)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(username = %input.username, error = %e,
                    "legacy chat account creation failed, substituting sentinel id");
                ChatUserId::unknown()
            }
        };
        ledger.record_legacy_chat_id(legacy_chat_id.clone());
        ledger.record_completed(steps::STEP_CREATE_LEGACY_ACCOUNT);

        // 6. Persist the record; the store assigns the local id.
        let consultant = Consultant {
            id: None,
            provider_id: provider_id.clone(),
            username: input.encoded_username(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
            legacy_chat_id,
            messaging_id,
            roles: input.roles.clone(),
            status: ConsultantStatus::Created,
            created_at: Utc::now(),
        };
        let saved = match self.store.save_consultant(consultant).await {
            Ok(saved) => saved,
            Err(e) => {
                ledger.record_failed(steps::STEP_PERSIST_RECORD, e.to_string());
                return Err(self.fail(&ledger, steps::STEP_PERSIST_RECORD, e).await);
            }
        };
        if let Some(id) = saved.id {
            ledger.record_record_id(id);
        }
        ledger.record_completed(steps::STEP_PERSIST_RECORD);

        // 7. Scheduling registration is a go/no-go gate: failure unwinds
        // the whole chain, store record included.
        if self.scheduling_enabled {
            if let Err(e) = self.scheduling.register_consultant(&saved).await {
                ledger.record_failed(steps::STEP_REGISTER_SCHEDULING, e.to_string());
                return Err(self.fail(&ledger, steps::STEP_REGISTER_SCHEDULING, e).await);
            }
            ledger.record_completed(steps::STEP_REGISTER_SCHEDULING);
        }

        metrics::histogram!("provisioning_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        metrics::counter!("provisioning_completed").increment(1);
        tracing::info!(
            provider_id = %provider_id,
            record_id = ?saved.id,
            has_messaging = saved.messaging_id.is_some(),
            "consultant provisioned"
        );

        Ok(saved)
    }

    /// Runs the rollback executor over the ledger and builds the failure
    /// the caller sees. Compensation failures are logged, never merged
    /// into the returned error.
    async fn fail(
        &self,
        ledger: &StepLedger,
        failed_step: &str,
        source: ClientError,
    ) -> ProvisioningError {
        tracing::warn!(
            step = failed_step,
            completed = ?ledger.completed_steps(),
            "provisioning step failed, compensating"
        );

        RollbackExecutor::new(&self.identity, &self.legacy, &self.store)
            .rollback(ledger)
            .await;

        metrics::counter!("provisioning_failed").increment(1);
        ProvisioningError::saga_failed(ledger, failed_step, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clients::{
        InMemoryIdentityClient, InMemoryLegacyChatClient, InMemoryMessagingClient,
        InMemorySchedulingClient, InMemoryStore,
    };
    use domain::Role;

    type TestSaga = ProvisioningSaga<
        InMemoryIdentityClient,
        InMemoryLegacyChatClient,
        InMemoryMessagingClient,
        InMemoryStore,
        InMemorySchedulingClient,
    >;

    struct Harness {
        saga: TestSaga,
        identity: InMemoryIdentityClient,
        legacy: InMemoryLegacyChatClient,
        messaging: InMemoryMessagingClient,
        store: InMemoryStore,
        scheduling: InMemorySchedulingClient,
    }

    fn setup(scheduling_enabled: bool) -> Harness {
        let identity = InMemoryIdentityClient::new();
        let legacy = InMemoryLegacyChatClient::new();
        let messaging = InMemoryMessagingClient::new();
        let store = InMemoryStore::new();
        let scheduling = InMemorySchedulingClient::new();

        let saga = ProvisioningSaga::new(
            identity.clone(),
            legacy.clone(),
            messaging.clone(),
            store.clone(),
            scheduling.clone(),
        )
        .with_scheduling(scheduling_enabled);

        Harness {
            saga,
            identity,
            legacy,
            messaging,
            store,
            scheduling,
        }
    }

    fn input() -> NewConsultant {
        NewConsultant {
            username: "erika.m".to_string(),
            password: "s3cret!".to_string(),
            first_name: "Erika".to_string(),
            last_name: "Mustermann".to_string(),
            email: "erika@example.org".to_string(),
            roles: vec![Role::Consultant],
        }
    }

    #[tokio::test]
    async fn happy_path_provisions_everywhere() {
        let h = setup(false);

        let consultant = h.saga.provision(input()).await.unwrap();

        assert!(consultant.id.is_some());
        assert!(consultant.messaging_id.is_some());
        assert!(!consultant.legacy_chat_id.is_unknown());
        assert_eq!(consultant.username, domain::encode_username("erika.m"));
        assert_eq!(consultant.status, ConsultantStatus::Created);

        assert_eq!(h.identity.identity_count(), 1);
        assert!(h.identity.has_credential(&consultant.provider_id));
        assert_eq!(
            h.identity.roles_of(&consultant.provider_id),
            vec![Role::Consultant]
        );
        assert_eq!(h.legacy.account_count(), 1);
        assert_eq!(h.messaging.account_count(), 1);
        assert_eq!(h.store.consultant_count().await, 1);
    }

    #[tokio::test]
    async fn empty_password_is_rejected_before_any_call() {
        let h = setup(false);
        let mut bad = input();
        bad.password.clear();

        let result = h.saga.provision(bad).await;
        assert!(matches!(result, Err(ProvisioningError::Validation(_))));
        assert_eq!(h.identity.identity_count(), 0);
    }

    #[tokio::test]
    async fn empty_roles_are_rejected_before_any_call() {
        let h = setup(false);
        let mut bad = input();
        bad.roles.clear();

        let result = h.saga.provision(bad).await;
        assert!(matches!(result, Err(ProvisioningError::Validation(_))));
        assert_eq!(h.identity.identity_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_identity_is_a_conflict_with_zero_compensations() {
        let h = setup(false);
        h.saga.provision(input()).await.unwrap();

        let mut second = input();
        second.email = "other@example.org".to_string();
        let result = h.saga.provision(second).await;

        assert!(matches!(result, Err(ProvisioningError::Conflict(_))));
        // First consultant untouched, no store write for the second.
        assert_eq!(h.identity.identity_count(), 1);
        assert_eq!(h.store.consultant_count().await, 1);
    }

    #[tokio::test]
    async fn credential_failure_compensates_the_identity() {
        let h = setup(false);
        h.identity.set_fail_on_set_credential(true);

        let result = h.saga.provision(input()).await;

        match result {
            Err(ProvisioningError::SagaFailed {
                failed_step,
                completed_steps,
                ..
            }) => {
                assert_eq!(failed_step, steps::STEP_SET_CREDENTIAL);
                assert_eq!(completed_steps, vec![steps::STEP_CREATE_IDENTITY]);
            }
            other => panic!("expected SagaFailed, got {other:?}"),
        }

        assert_eq!(h.identity.identity_count(), 0);
        assert_eq!(h.legacy.account_count(), 0);
        assert_eq!(h.messaging.account_count(), 0);
        assert_eq!(h.store.consultant_count().await, 0);
    }

    #[tokio::test]
    async fn role_failure_compensates_the_identity() {
        let h = setup(false);
        h.identity.set_fail_on_assign_role(true);

        let result = h.saga.provision(input()).await;

        match result {
            Err(ProvisioningError::SagaFailed {
                failed_step,
                completed_steps,
                ..
            }) => {
                assert_eq!(failed_step, steps::STEP_ASSIGN_ROLES);
                assert_eq!(
                    completed_steps,
                    vec![steps::STEP_CREATE_IDENTITY, steps::STEP_SET_CREDENTIAL]
                );
            }
            other => panic!("expected SagaFailed, got {other:?}"),
        }
        assert_eq!(h.identity.identity_count(), 0);
    }

    #[tokio::test]
    async fn messaging_failure_is_non_fatal() {
        let h = setup(false);
        h.messaging.set_fail_on_create_account(true);

        let consultant = h.saga.provision(input()).await.unwrap();

        assert!(consultant.id.is_some());
        assert!(consultant.messaging_id.is_none());
        // No rollback happened.
        assert_eq!(h.identity.identity_count(), 1);
        assert_eq!(h.store.consultant_count().await, 1);

        // The gap is visible to a reconciliation query.
        let missing = h.store.consultants_missing_messaging_id().await.unwrap();
        assert_eq!(missing.len(), 1);
    }

    #[tokio::test]
    async fn legacy_failure_substitutes_the_sentinel() {
        let h = setup(false);
        h.legacy.set_fail_on_create(true);

        let consultant = h.saga.provision(input()).await.unwrap();

        assert!(consultant.legacy_chat_id.is_unknown());
        assert!(consultant.id.is_some());
        assert_eq!(h.legacy.account_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_unwinds_provider_side_state() {
        let h = setup(false);
        h.store.set_fail_on_save_consultant(true).await;

        let result = h.saga.provision(input()).await;

        match result {
            Err(ProvisioningError::SagaFailed {
                failed_step,
                completed_steps,
                ..
            }) => {
                assert_eq!(failed_step, steps::STEP_PERSIST_RECORD);
                assert_eq!(
                    completed_steps,
                    vec![
                        steps::STEP_CREATE_IDENTITY,
                        steps::STEP_SET_CREDENTIAL,
                        steps::STEP_ASSIGN_ROLES,
                        steps::STEP_CREATE_MESSAGING_ACCOUNT,
                        steps::STEP_CREATE_LEGACY_ACCOUNT,
                    ]
                );
            }
            other => panic!("expected SagaFailed, got {other:?}"),
        }

        assert_eq!(h.identity.identity_count(), 0);
        assert_eq!(h.legacy.account_count(), 0);
        assert_eq!(h.store.consultant_count().await, 0);
    }

    #[tokio::test]
    async fn scheduling_failure_unwinds_everything_including_the_record() {
        let h = setup(true);
        h.scheduling.set_fail_on_register(true);

        let result = h.saga.provision(input()).await;

        match result {
            Err(ProvisioningError::SagaFailed {
                failed_step,
                completed_steps,
                ..
            }) => {
                assert_eq!(failed_step, steps::STEP_REGISTER_SCHEDULING);
                assert!(completed_steps.contains(&steps::STEP_PERSIST_RECORD.to_string()));
            }
            other => panic!("expected SagaFailed, got {other:?}"),
        }

        assert_eq!(h.identity.identity_count(), 0);
        assert_eq!(h.legacy.account_count(), 0);
        assert_eq!(h.store.consultant_count().await, 0);
        assert_eq!(h.scheduling.registered_count(), 0);
    }

    #[tokio::test]
    async fn scheduling_success_completes_the_saga() {
        let h = setup(true);

        let consultant = h.saga.provision(input()).await.unwrap();
        assert!(consultant.id.is_some());
        assert_eq!(h.scheduling.registered_count(), 1);
    }
}
