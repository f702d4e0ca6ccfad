//! The room lifecycle manager.

use clients::{MessagingClient, RelationalStore, TokenCache};
use common::{MessagingUserId, RoomId, SessionId};
use domain::{
    Consultant, MessagingCredentials, ParticipantGrant, PermissionLevel, RoomBinding, Session,
};

use crate::agency::AgencyDirectory;
use crate::error::RoomError;

/// Drives a session's room through its lifecycle: pre-provisioned holding
/// room, handoff to the assigned consultant, fresh-room fallback, and
/// observer attachment.
///
/// Non-essential messaging calls (permission levels, auto-joins, holding
/// account removal) are wrapped so their failure degrades convenience but
/// never aborts a transition. Only the room-creation call can make an
/// assignment fail outright.
pub struct RoomLifecycleManager<M, S, A>
where
    M: MessagingClient,
    S: RelationalStore,
    A: AgencyDirectory,
{
    messaging: M,
    store: S,
    agencies: A,
    tokens: TokenCache,
}

impl<M, S, A> RoomLifecycleManager<M, S, A>
where
    M: MessagingClient,
    S: RelationalStore,
    A: AgencyDirectory,
{
    /// Creates a manager with a default service-account token cache.
    pub fn new(messaging: M, store: S, agencies: A) -> Self {
        Self {
            messaging,
            store,
            agencies,
            tokens: TokenCache::with_default_ttl(),
        }
    }

    /// Replaces the token cache (shared across managers in production).
    pub fn with_token_cache(mut self, tokens: TokenCache) -> Self {
        self.tokens = tokens;
        self
    }

    /// Pre-provisions a holding room for a freshly opened session.
    ///
    /// Skip-not-error end to end: an existing binding, a session without an
    /// agency, an agency without a service account, a contact without a
    /// messaging identity, and a failed room creation all leave the session
    /// in its current state with a log entry. Returns the binding when one
    /// exists afterwards.
    #[tracing::instrument(skip(self, session, contact_credentials), fields(session = %session.id))]
    pub async fn ensure_holding_room(
        &self,
        session: &Session,
        contact_credentials: Option<&MessagingCredentials>,
    ) -> Result<Option<RoomBinding>, RoomError> {
        if let Some(existing) = self.store.binding_for_session(session.id).await? {
            tracing::debug!(room = %existing.room_id, "session already has a room, skipping");
            return Ok(Some(existing));
        }

        let Some(agency_id) = session.agency_id else {
            tracing::debug!("session has no agency, skipping holding room");
            return Ok(None);
        };

        let Some(contact_id) = &session.contact_messaging_id else {
            tracing::warn!("contact has no messaging identity, skipping holding room");
            return Ok(None);
        };

        let account = match self.agencies.service_account(agency_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::debug!(%agency_id, "agency has no service account, skipping holding room");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(%agency_id, error = %e, "agency lookup failed, skipping holding room");
                return Ok(None);
            }
        };

        let agency_token = match self.tokens.token(&self.messaging, &account.credentials()).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(%agency_id, error = %e, "service account login failed, skipping holding room");
                return Ok(None);
            }
        };

        let alias = holding_alias(session.id);
        let name = format!("Agency {} pre-assignment #{}", account.messaging_id, session.id);
        let room_id = match self.messaging.create_room(&name, &alias, &agency_token).await {
            Ok(room_id) => room_id,
            Err(e) => {
                tracing::error!(error = %e, "could not create holding room");
                return Ok(None);
            }
        };

        // Invite the contact and accept on their behalf so the room is
        // usable immediately; a manual accept still works if this degrades.
        match self.messaging.invite(&room_id, contact_id, &agency_token).await {
            Ok(()) => {
                if let Some(credentials) = contact_credentials {
                    self.login_and_join(&room_id, credentials, "contact").await;
                }
            }
            Err(e) => {
                tracing::warn!(room = %room_id, error = %e, "failed to invite contact to holding room");
            }
        }

        let binding = RoomBinding::holding(session.id, room_id);
        self.store.save_binding(binding.clone()).await?;

        tracing::info!(room = %binding.room_id, %agency_id, "configured holding room");
        Ok(Some(binding))
    }

    /// Binds a room owned by the consultant to the session.
    ///
    /// If a holding room exists, ownership is handed off in place so the
    /// history survives; if the handoff cannot go through, a fresh room is
    /// created instead. The session always ends up with a usable room
    /// unless room creation itself fails.
    #[tracing::instrument(skip_all, fields(session = %session.id))]
    pub async fn assign_room(
        &self,
        session: &Session,
        consultant: &Consultant,
        consultant_credentials: &MessagingCredentials,
        contact_credentials: Option<&MessagingCredentials>,
    ) -> Result<RoomBinding, RoomError> {
        let consultant_id = consultant
            .messaging_id
            .clone()
            .ok_or(RoomError::NoMessagingIdentity)?;

        if let Some(binding) = self.store.binding_for_session(session.id).await? {
            if !binding.is_holding() {
                return Err(RoomError::AlreadyAssigned(session.id));
            }

            if let Some(handed_off) = self
                .hand_off(session, &binding, &consultant_id, consultant_credentials)
                .await?
            {
                return Ok(handed_off);
            }

            metrics::counter!("room_assignment_fallback_total").increment(1);
            tracing::warn!(
                room = %binding.room_id,
                "holding room handoff failed, falling back to a fresh room"
            );
        }

        self.create_assigned_room(
            session,
            consultant,
            &consultant_id,
            consultant_credentials,
            contact_credentials,
        )
        .await
    }

    /// Attaches a supervisor to the session's room as a read-only
    /// observer. The invite is essential; the permission level and the
    /// auto-join degrade gracefully.
    #[tracing::instrument(skip_all, fields(session = %session.id))]
    pub async fn attach_observer(
        &self,
        session: &Session,
        observer: &Consultant,
        actor_credentials: &MessagingCredentials,
        observer_credentials: Option<&MessagingCredentials>,
    ) -> Result<ParticipantGrant, RoomError> {
        if !observer.is_supervisor() {
            return Err(RoomError::NotSupervisor(observer.display_name()));
        }
        let observer_id = observer
            .messaging_id
            .clone()
            .ok_or(RoomError::NoMessagingIdentity)?;

        let binding = self
            .store
            .binding_for_session(session.id)
            .await?
            .ok_or(RoomError::NotBound(session.id))?;

        if self
            .store
            .active_grant(&binding.room_id, &observer_id)
            .await?
            .is_some()
        {
            return Err(RoomError::AlreadyAttached(observer_id));
        }

        let actor_token = self
            .messaging
            .login(actor_credentials.username(), actor_credentials.password())
            .await?;

        self.messaging
            .invite(&binding.room_id, &observer_id, &actor_token)
            .await?;

        match self
            .messaging
            .set_permission_level(
                &binding.room_id,
                &observer_id,
                PermissionLevel::OBSERVER,
                &actor_token,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(room = %binding.room_id, observer = %observer_id,
                    "could not set observer permission level, continuing");
            }
            Err(e) => {
                tracing::warn!(room = %binding.room_id, observer = %observer_id, error = %e,
                    "could not set observer permission level, continuing");
            }
        }

        if let Some(credentials) = observer_credentials {
            self.login_and_join(&binding.room_id, credentials, "observer")
                .await;
        }

        let grant = ParticipantGrant::new(
            binding.room_id.clone(),
            observer_id,
            PermissionLevel::OBSERVER,
        );
        debug_assert!(!grant.level.is_write_capable());
        self.store.save_grant(grant.clone()).await?;

        tracing::info!(room = %binding.room_id, observer = %grant.user_id, "observer attached");
        Ok(grant)
    }

    /// Detaches an observer: removes them from the room (best-effort) and
    /// deactivates the grant. The room and its history stay intact.
    #[tracing::instrument(skip_all, fields(session = %session.id))]
    pub async fn detach_observer(
        &self,
        session: &Session,
        observer: &Consultant,
        actor_credentials: &MessagingCredentials,
    ) -> Result<ParticipantGrant, RoomError> {
        let observer_id = observer
            .messaging_id
            .clone()
            .ok_or(RoomError::NoMessagingIdentity)?;

        let binding = self
            .store
            .binding_for_session(session.id)
            .await?
            .ok_or(RoomError::NotBound(session.id))?;

        self.store
            .active_grant(&binding.room_id, &observer_id)
            .await?
            .ok_or_else(|| RoomError::NotAttached(observer_id.clone()))?;

        match self
            .messaging
            .login(actor_credentials.username(), actor_credentials.password())
            .await
        {
            Ok(actor_token) => {
                match self
                    .messaging
                    .remove_participant(&binding.room_id, &observer_id, &actor_token)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(room = %binding.room_id, observer = %observer_id,
                            "observer was not a room participant");
                    }
                    Err(e) => {
                        tracing::warn!(room = %binding.room_id, observer = %observer_id, error = %e,
                            "failed to remove observer from room, revoking grant anyway");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "actor login failed, revoking grant without room removal");
            }
        }

        let revoked = self
            .store
            .deactivate_grant(&binding.room_id, &observer_id)
            .await?
            .ok_or(RoomError::NotAttached(observer_id))?;

        tracing::info!(room = %binding.room_id, observer = %revoked.user_id, "observer detached");
        Ok(revoked)
    }

    /// The preferred assignment path: hand the holding room over to the
    /// consultant in place. Returns `Ok(None)` when the fallback should
    /// run; store failures propagate.
    async fn hand_off(
        &self,
        session: &Session,
        binding: &RoomBinding,
        consultant_id: &MessagingUserId,
        consultant_credentials: &MessagingCredentials,
    ) -> Result<Option<RoomBinding>, RoomError> {
        let Some(agency_id) = session.agency_id else {
            tracing::warn!("holding room without an agency on the session");
            return Ok(None);
        };

        let account = match self.agencies.service_account(agency_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::warn!(%agency_id, "agency service account vanished");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(%agency_id, error = %e, "agency lookup failed");
                return Ok(None);
            }
        };

        let agency_token = match self.tokens.token(&self.messaging, &account.credentials()).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(%agency_id, error = %e, "service account login failed");
                return Ok(None);
            }
        };

        // The consultant may already be invited; a failure here is not
        // what decides the handoff.
        if let Err(e) = self
            .messaging
            .invite(&binding.room_id, consultant_id, &agency_token)
            .await
        {
            tracing::warn!(room = %binding.room_id, error = %e,
                "failed to invite consultant to holding room, continuing");
        }

        match self
            .messaging
            .set_permission_level(
                &binding.room_id,
                consultant_id,
                PermissionLevel::OWNER,
                &agency_token,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(room = %binding.room_id, "could not grant owner level, continuing");
            }
            Err(e) => {
                tracing::warn!(room = %binding.room_id, error = %e,
                    "could not grant owner level, continuing");
            }
        }

        // The consultant must actually end up in the room; anything less
        // falls back to a fresh one.
        let consultant_token = match self
            .messaging
            .login(
                consultant_credentials.username(),
                consultant_credentials.password(),
            )
            .await
        {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "consultant login failed");
                return Ok(None);
            }
        };
        match self.messaging.join(&binding.room_id, &consultant_token).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(room = %binding.room_id, "consultant could not join holding room");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(room = %binding.room_id, error = %e, "consultant join failed");
                return Ok(None);
            }
        }

        match self
            .messaging
            .remove_participant(&binding.room_id, &account.messaging_id, &agency_token)
            .await
        {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                tracing::warn!(room = %binding.room_id, holding = %account.messaging_id,
                    "could not remove holding account, continuing");
            }
        }

        let mut updated = binding.clone();
        updated.promote();
        self.store.save_binding(updated.clone()).await?;

        tracing::info!(
            room = %updated.room_id,
            consultant = %consultant_id,
            "room handed off, history preserved"
        );
        Ok(Some(updated))
    }

    /// The fallback path: a brand-new room owned by the consultant. Only
    /// the room-creation call itself is fatal here.
    async fn create_assigned_room(
        &self,
        session: &Session,
        consultant: &Consultant,
        consultant_id: &MessagingUserId,
        consultant_credentials: &MessagingCredentials,
        contact_credentials: Option<&MessagingCredentials>,
    ) -> Result<RoomBinding, RoomError> {
        let consultant_token = self
            .messaging
            .login(
                consultant_credentials.username(),
                consultant_credentials.password(),
            )
            .await?;

        let name = format!("Session {} - {}", session.id, consultant.display_name());
        let alias = format!("session-{}", session.id);
        let room_id = self
            .messaging
            .create_room(&name, &alias, &consultant_token)
            .await
            .map_err(RoomError::RoomCreation)?;

        if let Some(contact_id) = &session.contact_messaging_id {
            match self
                .messaging
                .invite(&room_id, contact_id, &consultant_token)
                .await
            {
                Ok(()) => {
                    if let Some(credentials) = contact_credentials {
                        self.login_and_join(&room_id, credentials, "contact").await;
                    }
                }
                Err(e) => {
                    tracing::warn!(room = %room_id, error = %e,
                        "failed to invite contact to fresh room");
                }
            }
        }

        // The creator is already a member; this only confirms it.
        if let Ok(false) | Err(_) = self.messaging.join(&room_id, &consultant_token).await {
            tracing::warn!(room = %room_id, "consultant join confirmation failed");
        }

        let binding = RoomBinding::assigned(session.id, room_id);
        self.store.save_binding(binding.clone()).await?;

        tracing::info!(
            room = %binding.room_id,
            consultant = %consultant_id,
            "created fresh assigned room"
        );
        Ok(binding)
    }

    /// Logs a participant in and accepts the invitation on their behalf.
    /// Purely a convenience: failure leaves the invitation pending.
    async fn login_and_join(&self, room_id: &RoomId, credentials: &MessagingCredentials, who: &str) {
        match self
            .messaging
            .login(credentials.username(), credentials.password())
            .await
        {
            Ok(token) => match self.messaging.join(room_id, &token).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(room = %room_id, who, "auto-join rejected, invitation stays pending");
                }
                Err(e) => {
                    tracing::warn!(room = %room_id, who, error = %e, "auto-join failed");
                }
            },
            Err(e) => {
                tracing::warn!(room = %room_id, who, error = %e, "auto-join login failed");
            }
        }
    }
}

/// Builds the alias of a holding room. The random suffix keeps aliases of
/// re-opened sessions from colliding.
fn holding_alias(session: SessionId) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("agency-hold-{}-{}", session, &suffix[..8])
}
