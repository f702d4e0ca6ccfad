//! Shared identifier types used across the provisioning service.
//!
//! Each backing system hands out its own kind of identifier; wrapping them
//! in newtypes keeps a provider id from ever being passed where a messaging
//! id is expected.

mod types;

pub use types::{
    AgencyId, ChatUserId, ConsultantId, MessagingUserId, ProviderUserId, RoomId, SessionId,
};
