//! The consultant model and its provisioning input.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use common::{ChatUserId, ConsultantId, MessagingUserId, ProviderUserId};
use serde::{Deserialize, Serialize};

/// Prefix marking a username as stored in its encoded form.
const ENCODED_PREFIX: &str = "enc.";

/// Encodes a plain username into the form the relational store persists.
///
/// The store never sees the plain username; the identity provider and the
/// messaging system do. Already-encoded input is returned unchanged.
pub fn encode_username(plain: &str) -> String {
    if plain.starts_with(ENCODED_PREFIX) {
        return plain.to_string();
    }
    format!("{ENCODED_PREFIX}{}", URL_SAFE_NO_PAD.encode(plain))
}

/// Decodes a stored username back to its plain form.
///
/// Returns `None` if the input is not in the encoded form or does not decode
/// to valid UTF-8.
pub fn decode_username(encoded: &str) -> Option<String> {
    let payload = encoded.strip_prefix(ENCODED_PREFIX)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    String::from_utf8(bytes).ok()
}

/// A capability assigned to a consultant in the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Regular counseling consultant.
    Consultant,

    /// Consultant allowed to moderate group chats.
    GroupChatConsultant,

    /// Consultant allowed to observe other consultants' sessions read-only.
    Supervisor,
}

impl Role {
    /// Returns the role name as known to the identity provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consultant => "consultant",
            Role::GroupChatConsultant => "group-chat-consultant",
            Role::Supervisor => "supervisor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a consultant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConsultantStatus {
    /// Provisioned across the backing systems, not yet activated.
    #[default]
    Created,

    /// Active and available for assignment.
    Active,

    /// Deactivated by an administrator.
    Deactivated,
}

impl ConsultantStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultantStatus::Created => "Created",
            ConsultantStatus::Active => "Active",
            ConsultantStatus::Deactivated => "Deactivated",
        }
    }
}

impl std::fmt::Display for ConsultantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A consultant as it exists across the backing systems.
///
/// `id` is assigned by the relational store on save. `legacy_chat_id` may be
/// the `unknown` sentinel and `messaging_id` may be absent — both systems
/// are provisioned best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultant {
    /// Local record identifier; `None` until persisted.
    pub id: Option<ConsultantId>,
    /// Identifier in the identity provider.
    pub provider_id: ProviderUserId,
    /// Username in the encoded form the store persists.
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Legacy group-chat account, or the sentinel if that system was down.
    pub legacy_chat_id: ChatUserId,
    /// Messaging-system account, if creation succeeded.
    pub messaging_id: Option<MessagingUserId>,
    /// Roles assigned in the identity provider.
    pub roles: Vec<Role>,
    pub status: ConsultantStatus,
    pub created_at: DateTime<Utc>,
}

impl Consultant {
    /// Returns the display name used toward the messaging system.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Returns true if this consultant may be attached to sessions as a
    /// read-only observer.
    pub fn is_supervisor(&self) -> bool {
        self.roles.contains(&Role::Supervisor)
    }
}

/// Input for provisioning a new consultant.
///
/// Carries the plain credential material for the one saga execution it is
/// used in; the plain username/password go to the identity provider and the
/// messaging system, while only the encoded username reaches the store.
#[derive(Clone, Serialize, Deserialize)]
pub struct NewConsultant {
    /// Plain username as entered.
    pub username: String,
    /// Plain one-time credential; used during provisioning, never persisted.
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl NewConsultant {
    /// Returns the encoded form of the username for the store record.
    pub fn encoded_username(&self) -> String {
        encode_username(&self.username)
    }

    /// Returns the display name used toward the messaging system.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl std::fmt::Debug for NewConsultant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewConsultant")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .finish()
    }
}
