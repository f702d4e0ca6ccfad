//! Room bindings, ownership states, and participant grants.

use chrono::{DateTime, Utc};
use common::{MessagingUserId, RoomId, SessionId};
use serde::{Deserialize, Serialize};

/// Who owns a session's conversation room.
///
/// State transitions:
/// ```text
/// (no binding) ──► Holding ──► Assigned
///        └────────────────────────┘
/// ```
/// `Holding` means an agency service account created the room before a
/// consultant was assigned; `Assigned` means a consultant owns it. The
/// transition to `Assigned` happens at most once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomOwnership {
    /// Room is owned by an agency service account awaiting assignment.
    Holding,

    /// Room is owned by the assigned consultant (terminal for normal flow).
    Assigned,
}

impl RoomOwnership {
    /// Returns true if ownership can still be handed off to a consultant.
    pub fn can_hand_off(&self) -> bool {
        matches!(self, RoomOwnership::Holding)
    }

    /// Returns true if this is the terminal state of the normal flow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoomOwnership::Assigned)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomOwnership::Holding => "Holding",
            RoomOwnership::Assigned => "Assigned",
        }
    }
}

impl std::fmt::Display for RoomOwnership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binds a session to its conversation room.
///
/// A session has at most one active binding. The room itself is never
/// deleted through this binding; replacing a binding (fresh-room fallback)
/// orphans the old room but keeps its history on the messaging system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomBinding {
    pub session_id: SessionId,
    pub room_id: RoomId,
    pub ownership: RoomOwnership,
    pub bound_at: DateTime<Utc>,
}

impl RoomBinding {
    /// Creates a binding for a room held by an agency service account.
    pub fn holding(session_id: SessionId, room_id: RoomId) -> Self {
        Self {
            session_id,
            room_id,
            ownership: RoomOwnership::Holding,
            bound_at: Utc::now(),
        }
    }

    /// Creates a binding for a room owned by an assigned consultant.
    pub fn assigned(session_id: SessionId, room_id: RoomId) -> Self {
        Self {
            session_id,
            room_id,
            ownership: RoomOwnership::Assigned,
            bound_at: Utc::now(),
        }
    }

    /// Marks the handoff from holding account to consultant. The room id is
    /// unchanged, which is what preserves the conversation history.
    pub fn promote(&mut self) {
        self.ownership = RoomOwnership::Assigned;
    }

    /// Returns true if the room is still held by the agency account.
    pub fn is_holding(&self) -> bool {
        self.ownership == RoomOwnership::Holding
    }
}

/// Power level granted to a room participant.
///
/// The numeric scale follows the messaging system: room owners sit at 100,
/// ordinary participants at the write threshold, observers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionLevel(u32);

impl PermissionLevel {
    /// Full room owner: may invite, kick, and change power levels.
    pub const OWNER: PermissionLevel = PermissionLevel(100);

    /// Ordinary participant with write access.
    pub const PARTICIPANT: PermissionLevel = PermissionLevel(50);

    /// Read-only observer level used for supervisors.
    pub const OBSERVER: PermissionLevel = PermissionLevel(10);

    /// Levels at or above this value can post to the room.
    pub const WRITE_THRESHOLD: u32 = 50;

    /// Creates a permission level from a raw value.
    pub fn new(level: u32) -> Self {
        Self(level)
    }

    /// Returns the raw numeric level.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns true if this level permits posting to the room.
    pub fn is_write_capable(&self) -> bool {
        self.0 >= Self::WRITE_THRESHOLD
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Records that a participant was granted access to a room at a given level.
///
/// Revoking a grant removes the participant but never touches the room's
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantGrant {
    pub room_id: RoomId,
    pub user_id: MessagingUserId,
    pub level: PermissionLevel,
    pub granted_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl ParticipantGrant {
    /// Creates an active grant.
    pub fn new(room_id: RoomId, user_id: MessagingUserId, level: PermissionLevel) -> Self {
        Self {
            room_id,
            user_id,
            level,
            granted_at: Utc::now(),
            removed_at: None,
            active: true,
        }
    }

    /// Deactivates the grant, recording when it was removed.
    pub fn revoke(&mut self) {
        self.active = false;
        self.removed_at = Some(Utc::now());
    }
}
