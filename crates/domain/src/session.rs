//! The counseling session (the case a room is bound to).

use common::{AgencyId, MessagingUserId, SessionId};
use serde::{Deserialize, Serialize};

/// A counseling session as persisted in the relational store.
///
/// The contact is the person who opened the case; their messaging id is
/// recorded so room invitations can be issued, but their credentials are
/// not — callers pass those transiently when an auto-join is wanted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Agency the case belongs to; sessions without one never get a
    /// holding room.
    pub agency_id: Option<AgencyId>,
    /// Messaging identity of the case's primary contact, if they have one.
    pub contact_messaging_id: Option<MessagingUserId>,
}

impl Session {
    /// Creates a session.
    pub fn new(
        id: SessionId,
        agency_id: Option<AgencyId>,
        contact_messaging_id: Option<MessagingUserId>,
    ) -> Self {
        Self {
            id,
            agency_id,
            contact_messaging_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_roundtrip() {
        let session = Session::new(
            SessionId::new(12),
            Some(AgencyId::new(3)),
            Some(MessagingUserId::new("@contact:chat.example.org")),
        );
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session, back);
    }
}
