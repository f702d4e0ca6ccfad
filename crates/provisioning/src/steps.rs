//! Provisioning saga step names.

/// The operation name carried by ledger snapshots and saga failures.
pub const OPERATION_CREATE_CONSULTANT: &str = "create_consultant";

/// Step name: create the identity in the identity provider.
pub const STEP_CREATE_IDENTITY: &str = "create_identity";

/// Step name: set the credential on the new identity.
pub const STEP_SET_CREDENTIAL: &str = "set_credential";

/// Step name: assign the requested roles.
pub const STEP_ASSIGN_ROLES: &str = "assign_roles";

/// Step name: create the messaging-system account.
pub const STEP_CREATE_MESSAGING_ACCOUNT: &str = "create_messaging_account";

/// Step name: create the legacy group-chat account.
pub const STEP_CREATE_LEGACY_ACCOUNT: &str = "create_legacy_account";

/// Step name: persist the consultant in the relational store.
pub const STEP_PERSIST_RECORD: &str = "persist_record";

/// Step name: register with the external scheduling service.
pub const STEP_REGISTER_SCHEDULING: &str = "register_scheduling";

/// All steps in execution order.
pub const ORDERED: [&str; 7] = [
    STEP_CREATE_IDENTITY,
    STEP_SET_CREDENTIAL,
    STEP_ASSIGN_ROLES,
    STEP_CREATE_MESSAGING_ACCOUNT,
    STEP_CREATE_LEGACY_ACCOUNT,
    STEP_PERSIST_RECORD,
    STEP_REGISTER_SCHEDULING,
];

/// Returns the position of a step in the execution order.
pub fn position(step: &str) -> Option<usize> {
    ORDERED.iter().position(|s| *s == step)
}
