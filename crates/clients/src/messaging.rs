//! Messaging system client trait and in-memory implementation.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{MessagingUserId, RoomId};
use domain::PermissionLevel;

use crate::error::ClientError;

/// An access token obtained from the messaging system's login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates an access token from a string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Trait for messaging system operations.
///
/// None of these calls are transactional with each other; the room manager
/// decides per call whether a failure aborts, degrades, or falls back.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Creates an account and returns the fully-qualified user id.
    async fn create_account(
        &self,
        username: &str,
        secret: &str,
        display_name: &str,
    ) -> Result<MessagingUserId, ClientError>;

    /// Logs a user in and returns an access token.
    async fn login(&self, username: &str, secret: &str) -> Result<AccessToken, ClientError>;

    /// Creates a private room owned by the token's user.
    async fn create_room(
        &self,
        name: &str,
        alias: &str,
        owner: &AccessToken,
    ) -> Result<RoomId, ClientError>;

    /// Invites a user to a room on behalf of the acting user.
    async fn invite(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
        actor: &AccessToken,
    ) -> Result<(), ClientError>;

    /// Joins a room on behalf of the token's user.
    ///
    /// Returns `true` on success, including the already-in-the-room case;
    /// `false` if the join was rejected.
    async fn join(&self, room: &RoomId, token: &AccessToken) -> Result<bool, ClientError>;

    /// Sets a participant's permission level. Returns `false` if the level
    /// could not be applied.
    async fn set_permission_level(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
        level: PermissionLevel,
        actor: &AccessToken,
    ) -> Result<bool, ClientError>;

    /// Removes a participant from a room. Room history is untouched.
    /// Returns `false` if the user was not a participant.
    async fn remove_participant(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
        actor: &AccessToken,
    ) -> Result<bool, ClientError>;
}

const HOMESERVER: &str = "chat.example.test";

#[derive(Debug)]
struct Account {
    password: String,
    display_name: String,
    user_id: MessagingUserId,
}

#[derive(Debug, Default)]
struct Room {
    name: String,
    alias: String,
    members: HashSet<MessagingUserId>,
    invited: HashSet<MessagingUserId>,
    levels: HashMap<MessagingUserId, PermissionLevel>,
}

#[derive(Debug, Default)]
struct InMemoryMessagingState {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>,
    rooms: HashMap<RoomId, Room>,
    next_token: u32,
    next_room: u32,
    login_count: u32,
    fail_on_create_account: bool,
    fail_on_create_room: bool,
    fail_on_invite: bool,
    fail_on_set_level: bool,
    denied_logins: HashSet<String>,
}

/// In-memory messaging system for testing.
///
/// Models accounts, tokens, rooms with members/invites/levels, and lets
/// tests inject failures per operation or deny login for one user.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessagingClient {
    state: Arc<RwLock<InMemoryMessagingState>>,
}

impl InMemoryMessagingClient {
    /// Creates a new in-memory messaging system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the system to fail account creation.
    pub fn set_fail_on_create_account(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_account = fail;
    }

    /// Configures the system to fail room creation.
    pub fn set_fail_on_create_room(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_room = fail;
    }

    /// Configures the system to fail invitations.
    pub fn set_fail_on_invite(&self, fail: bool) {
        self.state.write().unwrap().fail_on_invite = fail;
    }

    /// Configures the system to reject permission-level changes.
    pub fn set_fail_on_set_level(&self, fail: bool) {
        self.state.write().unwrap().fail_on_set_level = fail;
    }

    /// Denies (or re-allows) login for one username.
    pub fn deny_login_for(&self, username: &str, deny: bool) {
        let mut state = self.state.write().unwrap();
        if deny {
            state.denied_logins.insert(username.to_string());
        } else {
            state.denied_logins.remove(username);
        }
    }

    /// Returns the number of accounts.
    pub fn account_count(&self) -> usize {
        self.state.read().unwrap().accounts.len()
    }

    /// Returns the number of rooms ever created.
    pub fn room_count(&self) -> usize {
        self.state.read().unwrap().rooms.len()
    }

    /// Returns the number of successful logins so far.
    pub fn login_count(&self) -> u32 {
        self.state.read().unwrap().login_count
    }

    /// Returns the user id registered for a username, if any.
    pub fn user_id_for(&self, username: &str) -> Option<MessagingUserId> {
        self.state
            .read()
            .unwrap()
            .accounts
            .get(username)
            .map(|a| a.user_id.clone())
    }

    /// Returns the display name registered for a username, if any.
    pub fn display_name_of(&self, username: &str) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .accounts
            .get(username)
            .map(|a| a.display_name.clone())
    }

    /// Returns a room's (name, alias) pair, if the room exists.
    pub fn room_info(&self, room: &RoomId) -> Option<(String, String)> {
        self.state
            .read()
            .unwrap()
            .rooms
            .get(room)
            .map(|r| (r.name.clone(), r.alias.clone()))
    }

    /// Returns true if the user has joined the room.
    pub fn is_member(&self, room: &RoomId, user: &MessagingUserId) -> bool {
        self.state
            .read()
            .unwrap()
            .rooms
            .get(room)
            .is_some_and(|r| r.members.contains(user))
    }

    /// Returns true if the user has a pending invitation to the room.
    pub fn is_invited(&self, room: &RoomId, user: &MessagingUserId) -> bool {
        self.state
            .read()
            .unwrap()
            .rooms
            .get(room)
            .is_some_and(|r| r.invited.contains(user))
    }

    /// Returns the permission level recorded for a user in a room.
    pub fn member_level(&self, room: &RoomId, user: &MessagingUserId) -> Option<PermissionLevel> {
        self.state
            .read()
            .unwrap()
            .rooms
            .get(room)
            .and_then(|r| r.levels.get(user).copied())
    }

    fn username_for(
        state: &InMemoryMessagingState,
        token: &AccessToken,
    ) -> Result<String, ClientError> {
        state
            .tokens
            .get(token.as_str())
            .cloned()
            .ok_or_else(|| ClientError::Unauthorized("unknown access token".to_string()))
    }

    fn user_id_of(
        state: &InMemoryMessagingState,
        username: &str,
    ) -> Result<MessagingUserId, ClientError> {
        state
            .accounts
            .get(username)
            .map(|a| a.user_id.clone())
            .ok_or_else(|| ClientError::NotFound(format!("account {username}")))
    }
}

#[async_trait]
impl MessagingClient for InMemoryMessagingClient {
    async fn create_account(
        &self,
        username: &str,
        secret: &str,
        display_name: &str,
    ) -> Result<MessagingUserId, ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create_account {
            return Err(ClientError::Unavailable(
                "messaging system down".to_string(),
            ));
        }

        if state.accounts.contains_key(username) {
            return Err(ClientError::Conflict(format!(
                "account '{username}' already exists"
            )));
        }

        let user_id = MessagingUserId::new(format!("@{username}:{HOMESERVER}"));
        state.accounts.insert(
            username.to_string(),
            Account {
                password: secret.to_string(),
                display_name: display_name.to_string(),
                user_id: user_id.clone(),
            },
        );

        Ok(user_id)
    }

    async fn login(&self, username: &str, secret: &str) -> Result<AccessToken, ClientError> {
        let mut state = self.state.write().unwrap();

        if state.denied_logins.contains(username) {
            return Err(ClientError::Unauthorized(format!(
                "login denied for {username}"
            )));
        }

        let account = state
            .accounts
            .get(username)
            .ok_or_else(|| ClientError::Unauthorized(format!("unknown account {username}")))?;
        if account.password != secret {
            return Err(ClientError::Unauthorized(format!(
                "invalid credentials for {username}"
            )));
        }

        state.next_token += 1;
        state.login_count += 1;
        let token = format!("tok-{:04}", state.next_token);
        state.tokens.insert(token.clone(), username.to_string());

        Ok(AccessToken::new(token))
    }

    async fn create_room(
        &self,
        name: &str,
        alias: &str,
        owner: &AccessToken,
    ) -> Result<RoomId, ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create_room {
            return Err(ClientError::Unavailable(
                "messaging system down".to_string(),
            ));
        }

        let owner_name = Self::username_for(&state, owner)?;
        let owner_id = Self::user_id_of(&state, &owner_name)?;

        state.next_room += 1;
        let room_id = RoomId::new(format!("!room-{:04}:{HOMESERVER}", state.next_room));

        let mut room = Room {
            name: name.to_string(),
            alias: alias.to_string(),
            ..Room::default()
        };
        room.members.insert(owner_id.clone());
        room.levels.insert(owner_id, PermissionLevel::OWNER);
        state.rooms.insert(room_id.clone(), room);

        Ok(room_id)
    }

    async fn invite(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
        actor: &AccessToken,
    ) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_invite {
            return Err(ClientError::Unavailable(
                "messaging system down".to_string(),
            ));
        }

        Self::username_for(&state, actor)?;
        let room_state = state
            .rooms
            .get_mut(room)
            .ok_or_else(|| ClientError::NotFound(format!("room {room}")))?;

        if !room_state.members.contains(user) {
            room_state.invited.insert(user.clone());
        }
        Ok(())
    }

    async fn join(&self, room: &RoomId, token: &AccessToken) -> Result<bool, ClientError> {
        let mut state = self.state.write().unwrap();

        let username = Self::username_for(&state, token)?;
        let user_id = Self::user_id_of(&state, &username)?;
        let room_state = state
            .rooms
            .get_mut(room)
            .ok_or_else(|| ClientError::NotFound(format!("room {room}")))?;

        // Already in the room counts as a successful join.
        if room_state.members.contains(&user_id) {
            return Ok(true);
        }

        if room_state.invited.remove(&user_id) {
            room_state.members.insert(user_id.clone());
            room_state
                .levels
                .entry(user_id)
                .or_insert(PermissionLevel::PARTICIPANT);
            return Ok(true);
        }

        Ok(false)
    }

    async fn set_permission_level(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
        level: PermissionLevel,
        actor: &AccessToken,
    ) -> Result<bool, ClientError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_set_level {
            return Ok(false);
        }

        Self::username_for(&state, actor)?;
        let room_state = state
            .rooms
            .get_mut(room)
            .ok_or_else(|| ClientError::NotFound(format!("room {room}")))?;

        room_state.levels.insert(user.clone(), level);
        Ok(true)
    }

    async fn remove_participant(
        &self,
        room: &RoomId,
        user: &MessagingUserId,
        actor: &AccessToken,
    ) -> Result<bool, ClientError> {
        let mut state = self.state.write().unwrap();

        Self::username_for(&state, actor)?;
        let room_state = state
            .rooms
            .get_mut(room)
            .ok_or_else(|| ClientError::NotFound(format!("room {room}")))?;

        let was_member = room_state.members.remove(user);
        let was_invited = room_state.invited.remove(user);
        room_state.levels.remove(user);

        Ok(was_member || was_invited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn account(client: &InMemoryMessagingClient, name: &str) -> MessagingUserId {
        client.create_account(name, "pw", name).await.unwrap()
    }

    #[tokio::test]
    async fn create_login_create_room() {
        let client = InMemoryMessagingClient::new();
        let owner = account(&client, "agency-1").await;

        let token = client.login("agency-1", "pw").await.unwrap();
        let room = client
            .create_room("Session 1", "session-1", &token)
            .await
            .unwrap();

        assert!(client.is_member(&room, &owner));
        assert_eq!(
            client.member_level(&room, &owner),
            Some(PermissionLevel::OWNER)
        );
        assert_eq!(client.display_name_of("agency-1").as_deref(), Some("agency-1"));
        assert_eq!(
            client.room_info(&room),
            Some(("Session 1".to_string(), "session-1".to_string()))
        );
    }

    #[tokio::test]
    async fn invite_then_join() {
        let client = InMemoryMessagingClient::new();
        account(&client, "agency-1").await;
        let guest = account(&client, "erika.m").await;

        let owner_token = client.login("agency-1", "pw").await.unwrap();
        let room = client
            .create_room("Session 1", "session-1", &owner_token)
            .await
            .unwrap();

        client.invite(&room, &guest, &owner_token).await.unwrap();
        assert!(client.is_invited(&room, &guest));

        let guest_token = client.login("erika.m", "pw").await.unwrap();
        assert!(client.join(&room, &guest_token).await.unwrap());
        assert!(client.is_member(&room, &guest));

        // Joining again is fine.
        assert!(client.join(&room, &guest_token).await.unwrap());
    }

    #[tokio::test]
    async fn join_without_invite_is_rejected() {
        let client = InMemoryMessagingClient::new();
        account(&client, "agency-1").await;
        account(&client, "erika.m").await;

        let owner_token = client.login("agency-1", "pw").await.unwrap();
        let room = client
            .create_room("Session 1", "session-1", &owner_token)
            .await
            .unwrap();

        let guest_token = client.login("erika.m", "pw").await.unwrap();
        assert!(!client.join(&room, &guest_token).await.unwrap());
    }

    #[tokio::test]
    async fn remove_participant_keeps_room() {
        let client = InMemoryMessagingClient::new();
        account(&client, "agency-1").await;
        let guest = account(&client, "erika.m").await;

        let owner_token = client.login("agency-1", "pw").await.unwrap();
        let room = client
            .create_room("Session 1", "session-1", &owner_token)
            .await
            .unwrap();
        client.invite(&room, &guest, &owner_token).await.unwrap();
        let guest_token = client.login("erika.m", "pw").await.unwrap();
        client.join(&room, &guest_token).await.unwrap();

        assert!(
            client
                .remove_participant(&room, &guest, &owner_token)
                .await
                .unwrap()
        );
        assert!(!client.is_member(&room, &guest));
        assert_eq!(client.room_count(), 1);

        // Removing again reports nothing to do.
        assert!(
            !client
                .remove_participant(&room, &guest, &owner_token)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn login_rejects_bad_password() {
        let client = InMemoryMessagingClient::new();
        account(&client, "erika.m").await;

        let result = client.login("erika.m", "wrong").await;
        assert!(matches!(result, Err(ClientError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn denied_login_is_unauthorized() {
        let client = InMemoryMessagingClient::new();
        account(&client, "agency-1").await;
        client.deny_login_for("agency-1", true);

        let result = client.login("agency-1", "pw").await;
        assert!(matches!(result, Err(ClientError::Unauthorized(_))));

        client.deny_login_for("agency-1", false);
        assert!(client.login("agency-1", "pw").await.is_ok());
    }
}
