use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local identifier of a consultant record in the relational store.
///
/// Assigned by the store on save; a consultant that has not been persisted
/// yet has no `ConsultantId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsultantId(Uuid);

impl ConsultantId {
    /// Creates a new random consultant ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a consultant ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConsultantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConsultantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConsultantId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ConsultantId> for Uuid {
    fn from(id: ConsultantId) -> Self {
        id.0
    }
}

/// Identifier of a counseling session (the case a room is bound to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(i64);

impl SessionId {
    /// Creates a session ID from a raw numeric value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of an agency (the organizational unit that may own a
/// messaging service account).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgencyId(i64);

impl AgencyId {
    /// Creates an agency ID from a raw numeric value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for AgencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AgencyId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderUserId(String);

impl ProviderUserId {
    /// Creates a provider user ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderUserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProviderUserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProviderUserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Account identifier in the legacy group-chat system.
///
/// The legacy system is being phased out and may be unavailable; an account
/// that could not be created is represented by the `unknown` sentinel rather
/// than by a missing value, matching what the store persists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatUserId(String);

const UNKNOWN_CHAT_ID: &str = "unknown";

impl ChatUserId {
    /// Creates a chat user ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the sentinel ID standing in for an account that could not
    /// be created.
    pub fn unknown() -> Self {
        Self(UNKNOWN_CHAT_ID.to_string())
    }

    /// Returns true if this is the sentinel ID.
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CHAT_ID
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatUserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChatUserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChatUserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Fully-qualified user identifier in the messaging system, e.g.
/// `@erika.m:chat.example.org`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessagingUserId(String);

impl MessagingUserId {
    /// Creates a messaging user ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts the local part of the ID, which is what login expects:
    /// `@erika.m:chat.example.org` becomes `erika.m`.
    pub fn localpart(&self) -> &str {
        let without_sigil = self.0.strip_prefix('@').unwrap_or(&self.0);
        match without_sigil.find(':') {
            Some(idx) if idx > 0 => &without_sigil[..idx],
            _ => without_sigil,
        }
    }
}

impl std::fmt::Display for MessagingUserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessagingUserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessagingUserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a conversation room in the messaging system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consultant_id_new_creates_unique_ids() {
        let id1 = ConsultantId::new();
        let id2 = ConsultantId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn consultant_id_serialization_roundtrip() {
        let id = ConsultantId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ConsultantId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn chat_user_id_sentinel() {
        let id = ChatUserId::unknown();
        assert!(id.is_unknown());
        assert_eq!(id.as_str(), "unknown");

        let real: ChatUserId = "rc-4711".into();
        assert!(!real.is_unknown());
    }

    #[test]
    fn messaging_user_id_localpart() {
        let id = MessagingUserId::new("@erika.m:chat.example.org");
        assert_eq!(id.localpart(), "erika.m");

        let bare = MessagingUserId::new("erika.m");
        assert_eq!(bare.localpart(), "erika.m");

        let no_domain = MessagingUserId::new("@erika.m");
        assert_eq!(no_domain.localpart(), "erika.m");
    }

    #[test]
    fn session_id_display() {
        assert_eq!(SessionId::new(42).to_string(), "42");
        assert_eq!(AgencyId::new(7).as_i64(), 7);
    }
}
