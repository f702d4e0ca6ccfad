//! Per-step failure policy and compensation table.
//!
//! The saga consults this table instead of hard-coding decisions at each
//! call site, so the policy can be tested without touching any client.

use crate::steps;

/// What the saga does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort, compensate completed steps, surface the failure.
    Fatal,

    /// Log and continue without the step's output; healed out-of-band.
    Degraded,

    /// Substitute the sentinel id and continue.
    Sentinel,
}

/// The compensating action defined for a completed step.
///
/// Credential and role steps have none: deleting the identity subsumes
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Delete the identity from the identity provider.
    DeleteIdentity,

    /// Delete the legacy chat account, unless the sentinel was recorded.
    DeleteLegacyAccount,

    /// Delete the consultant record from the relational store.
    DeleteRecord,
}

/// Returns how the saga reacts to a failure of the given step.
pub fn failure_policy(step: &str) -> FailurePolicy {
    match step {
        steps::STEP_CREATE_MESSAGING_ACCOUNT => FailurePolicy::Degraded,
        steps::STEP_CREATE_LEGACY_ACCOUNT => FailurePolicy::Sentinel,
        _ => FailurePolicy::Fatal,
    }
}

/// Returns the compensating action defined for a completed step, if any.
pub fn compensation(step: &str) -> Option<Compensation> {
    match step {
        steps::STEP_CREATE_IDENTITY => Some(Compensation::DeleteIdentity),
        steps::STEP_CREATE_LEGACY_ACCOUNT => Some(Compensation::DeleteLegacyAccount),
        steps::STEP_PERSIST_RECORD => Some(Compensation::DeleteRecord),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::*;

    #[test]
    fn required_steps_are_fatal() {
        assert_eq!(failure_policy(STEP_CREATE_IDENTITY), FailurePolicy::Fatal);
        assert_eq!(failure_policy(STEP_SET_CREDENTIAL), FailurePolicy::Fatal);
        assert_eq!(failure_policy(STEP_ASSIGN_ROLES), FailurePolicy::Fatal);
        assert_eq!(failure_policy(STEP_PERSIST_RECORD), FailurePolicy::Fatal);
        assert_eq!(
            failure_policy(STEP_REGISTER_SCHEDULING),
            FailurePolicy::Fatal
        );
    }

    #[test]
    fn best_effort_steps_do_not_abort() {
        assert_eq!(
            failure_policy(STEP_CREATE_MESSAGING_ACCOUNT),
            FailurePolicy::Degraded
        );
        assert_eq!(
            failure_policy(STEP_CREATE_LEGACY_ACCOUNT),
            FailurePolicy::Sentinel
        );
    }

    #[test]
    fn credential_and_role_steps_have_no_compensation() {
        // Identity deletion subsumes both.
        assert_eq!(compensation(STEP_SET_CREDENTIAL), None);
        assert_eq!(compensation(STEP_ASSIGN_ROLES), None);
        assert_eq!(compensation(STEP_CREATE_MESSAGING_ACCOUNT), None);
        assert_eq!(compensation(STEP_REGISTER_SCHEDULING), None);
    }

    #[test]
    fn compensated_steps() {
        assert_eq!(
            compensation(STEP_CREATE_IDENTITY),
            Some(Compensation::DeleteIdentity)
        );
        assert_eq!(
            compensation(STEP_CREATE_LEGACY_ACCOUNT),
            Some(Compensation::DeleteLegacyAccount)
        );
        assert_eq!(
            compensation(STEP_PERSIST_RECORD),
            Some(Compensation::DeleteRecord)
        );
    }
}
