//! Short-lived messaging login credentials.

use common::MessagingUserId;

/// A messaging-system login pair, valid for the duration of one operation.
///
/// Constructed by the caller at the request boundary and passed explicitly
/// into the saga or room manager; never stored, never serialized. The
/// username is the local part expected by login, not the fully-qualified id.
#[derive(Clone)]
pub struct MessagingCredentials {
    username: String,
    password: String,
}

impl MessagingCredentials {
    /// Creates credentials from a login username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates credentials for a fully-qualified messaging id, extracting
    /// the local part for login.
    pub fn for_user(user_id: &MessagingUserId, password: impl Into<String>) -> Self {
        Self {
            username: user_id.localpart().to_string(),
            password: password.into(),
        }
    }

    /// Returns the login username (local part).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for MessagingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
