//! The step ledger: the single source of truth for what to compensate.

use chrono::{DateTime, Utc};
use common::{ChatUserId, ConsultantId, MessagingUserId, ProviderUserId};
use serde::{Deserialize, Serialize};

use crate::steps;

/// Outcome recorded for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// The step completed; its compensation applies on rollback.
    Completed,

    /// The step failed; recorded for the failure snapshot.
    Failed,
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub step: String,
    pub status: StepStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Per-execution record of completed provisioning steps.
///
/// Every saga execution owns its own ledger; nothing is shared across
/// concurrent executions. Besides the completed steps, the ledger
/// accumulates the identifiers the steps produced, which is all the
/// [`RollbackExecutor`](crate::RollbackExecutor) needs to compute the exact
/// compensation set.
///
/// Steps are strictly ordered: a completion that would land out of order is
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepLedger {
    operation: String,
    entries: Vec<LedgerEntry>,
    provider_id: Option<ProviderUserId>,
    legacy_chat_id: Option<ChatUserId>,
    messaging_id: Option<MessagingUserId>,
    record_id: Option<ConsultantId>,
    failed_step: Option<String>,
    failure_reason: Option<String>,
}

impl StepLedger {
    /// Creates an empty ledger for the named operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    /// Records a step as completed. Returns false (and records nothing) if
    /// the step is unknown or would complete out of order.
    pub fn record_completed(&mut self, step: &str) -> bool {
        let Some(position) = steps::position(step) else {
            tracing::warn!(step, "refusing to record unknown step");
            return false;
        };

        let last_position = self
            .completed_steps()
            .last()
            .and_then(|s| steps::position(s));
        if let Some(last) = last_position
            && position <= last
        {
            tracing::warn!(step, "refusing to record step completion out of order");
            return false;
        }

        self.entries.push(LedgerEntry {
            step: step.to_string(),
            status: StepStatus::Completed,
            recorded_at: Utc::now(),
        });
        true
    }

    /// Records the failing step and its reason.
    pub fn record_failed(&mut self, step: &str, reason: impl Into<String>) {
        self.entries.push(LedgerEntry {
            step: step.to_string(),
            status: StepStatus::Failed,
            recorded_at: Utc::now(),
        });
        self.failed_step = Some(step.to_string());
        self.failure_reason = Some(reason.into());
    }

    /// Records the identity-provider id produced by step 1.
    pub fn record_provider_id(&mut self, id: ProviderUserId) {
        self.provider_id = Some(id);
    }

    /// Records the legacy chat id produced by step 5 (possibly the
    /// sentinel).
    pub fn record_legacy_chat_id(&mut self, id: ChatUserId) {
        self.legacy_chat_id = Some(id);
    }

    /// Records the messaging id produced by step 4.
    pub fn record_messaging_id(&mut self, id: MessagingUserId) {
        self.messaging_id = Some(id);
    }

    /// Records the store id assigned in step 6.
    pub fn record_record_id(&mut self, id: ConsultantId) {
        self.record_id = Some(id);
    }

    /// Returns the operation this ledger belongs to.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the completed step names in execution order.
    pub fn completed_steps(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.status == StepStatus::Completed)
            .map(|e| e.step.as_str())
            .collect()
    }

    /// Returns all entries in recording order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Returns the provider id, if step 1 completed.
    pub fn provider_id(&self) -> Option<&ProviderUserId> {
        self.provider_id.as_ref()
    }

    /// Returns the legacy chat id, if step 5 ran.
    pub fn legacy_chat_id(&self) -> Option<&ChatUserId> {
        self.legacy_chat_id.as_ref()
    }

    /// Returns the messaging id, if step 4 completed.
    pub fn messaging_id(&self) -> Option<&MessagingUserId> {
        self.messaging_id.as_ref()
    }

    /// Returns the store record id, if step 6 completed.
    pub fn record_id(&self) -> Option<&ConsultantId> {
        self.record_id.as_ref()
    }

    /// Returns the failed step, if any.
    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    /// Returns the failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}
