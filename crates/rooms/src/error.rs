//! Room lifecycle error types.

use clients::ClientError;
use common::{MessagingUserId, SessionId};
use thiserror::Error;

/// Errors returned by the room lifecycle manager.
#[derive(Debug, Error)]
pub enum RoomError {
    /// The session has no room binding yet.
    #[error("Session {0} has no conversation room")]
    NotBound(SessionId),

    /// The session's room was already handed off to a consultant; the
    /// transition happens exactly once.
    #[error("Session {0} already has an assigned room")]
    AlreadyAssigned(SessionId),

    /// The consultant has no messaging identity to operate with.
    #[error("Consultant has no messaging identity")]
    NoMessagingIdentity,

    /// Only supervisors may be attached as observers.
    #[error("Consultant '{0}' does not hold the supervisor role")]
    NotSupervisor(String),

    /// The observer already has an active grant on this room.
    #[error("'{0}' is already observing this room")]
    AlreadyAttached(MessagingUserId),

    /// No active observer grant exists for this user and room.
    #[error("'{0}' is not observing this room")]
    NotAttached(MessagingUserId),

    /// The room-creation call itself failed; no usable room could be
    /// produced on any path.
    #[error("Could not create conversation room: {0}")]
    RoomCreation(#[source] ClientError),

    /// Any other client failure.
    #[error(transparent)]
    Client(#[from] ClientError),
}
