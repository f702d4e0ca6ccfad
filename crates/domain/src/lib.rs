//! Domain model for the user provisioning service.
//!
//! The types here span the four backing systems: a [`Consultant`] carries
//! the identifiers each system assigned to one person, a [`Session`] is the
//! case a conversation room gets bound to, and [`RoomBinding`] /
//! [`ParticipantGrant`] describe that room's ownership and membership.
//!
//! Credential material is deliberately kept out of the persisted types;
//! [`MessagingCredentials`] is the short-lived value callers thread through
//! a single provisioning or room operation.

pub mod consultant;
pub mod credentials;
pub mod room;
pub mod session;

pub use consultant::{
    Consultant, ConsultantStatus, NewConsultant, Role, decode_username, encode_username,
};
pub use credentials::MessagingCredentials;
pub use room::{ParticipantGrant, PermissionLevel, RoomBinding, RoomOwnership};
pub use session::Session;
