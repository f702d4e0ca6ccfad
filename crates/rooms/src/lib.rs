//! Conversation room lifecycle management.
//!
//! A session's room moves through at most three states: no room, a holding
//! room owned by an agency service account, and an assigned room owned by a
//! consultant. The preferred assignment path hands the holding room over to
//! the consultant so the conversation history survives; when that is not
//! possible the manager falls back to a fresh room rather than leaving the
//! session without one.
//!
//! Supervisors can be attached to an assigned room as read-only observers
//! and detached again; neither operation touches the room itself.

pub mod agency;
pub mod error;
pub mod manager;

pub use agency::{AgencyDirectory, InMemoryAgencyDirectory, ServiceAccount};
pub use error::RoomError;
pub use manager::RoomLifecycleManager;
