//! Consultant provisioning saga with compensating rollback.
//!
//! Provisioning touches four independent systems with no shared
//! transaction. The saga drives them in a strict order:
//! 1. Create identity in the identity provider
//! 2. Set the credential
//! 3. Assign roles
//! 4. Create messaging account (best-effort, non-fatal)
//! 5. Create legacy chat account (sentinel on failure)
//! 6. Persist the consultant record
//! 7. Register with the scheduling service (optional go/no-go gate)
//!
//! Each successful step lands in the [`StepLedger`]; on a fatal failure the
//! [`RollbackExecutor`] replays the ledger in reverse, issuing whatever
//! compensations the [`policy`] table defines, and the caller receives a
//! [`ProvisioningError::SagaFailed`] naming the failed step and everything
//! that had completed.

pub mod error;
pub mod ledger;
pub mod policy;
pub mod rollback;
pub mod saga;
pub mod steps;

pub use error::ProvisioningError;
pub use ledger::{LedgerEntry, StepLedger, StepStatus};
pub use policy::{Compensation, FailurePolicy};
pub use rollback::RollbackExecutor;
pub use saga::ProvisioningSaga;
