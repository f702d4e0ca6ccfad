//! Provisioning error types.

use clients::ClientError;
use thiserror::Error;

use crate::ledger::StepLedger;

/// Errors returned by the provisioning saga.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Input was rejected before any external call was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested unique name is already taken. Not retryable with the
    /// same name; nothing was created, nothing was compensated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A required step failed after partial completion. Compensation has
    /// already been attempted when this is returned.
    #[error("Operation '{operation}' failed at step '{failed_step}': {source}")]
    SagaFailed {
        operation: String,
        failed_step: String,
        completed_steps: Vec<String>,
        #[source]
        source: ClientError,
    },
}

impl ProvisioningError {
    /// Builds a saga failure from the ledger snapshot at the moment of
    /// failure. This is the only way a `SagaFailed` is constructed, which
    /// keeps the error and the ledger in agreement.
    pub fn saga_failed(ledger: &StepLedger, failed_step: &str, source: ClientError) -> Self {
        ProvisioningError::SagaFailed {
            operation: ledger.operation().to_string(),
            failed_step: failed_step.to_string(),
            completed_steps: ledger
                .completed_steps()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            source,
        }
    }
}

/// Convenience type alias for provisioning results.
pub type Result<T> = std::result::Result<T, ProvisioningError>;
