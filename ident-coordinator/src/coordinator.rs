//! Intent dispatch and event fan-out.
//!
//! The coordinator is the single entry point for client requests: it
//! routes each [`Intent`] to the owning engine, then computes which
//! sessions must hear about the resulting state change and pushes one
//! [`Event`] to each through the transport.
//!
//! State commits before fan-out, and fan-out never fails the request:
//! a session that misses a push catches up through message sync.

use crate::store::{MessageStore, StoredMessage};
use crate::transport::EventTransport;
use crate::Config;
use ident_core::{
    render_typing, DeviceSessionRegistry, GroupAuthorizationEngine, PresenceAggregator, TokenVault,
};
use ident_types::{
    ConversationId, DeviceInfo, DeviceSession, Event, GroupId, IdentityError, Intent, IssuedToken,
    SessionId, TokenId, TokenPurpose, TokenSubject, UserId,
};
use std::sync::Arc;
use std::time::Duration;

/// Who is asking, established by the transport before dispatch.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The authenticated user.
    pub user: UserId,
    /// The session the request arrived on. `None` only for requests
    /// from a device that has no session yet (pairing verification).
    pub session: Option<SessionId>,
}

impl RequestContext {
    /// Context for a request from an established session.
    pub fn new(user: UserId, session: SessionId) -> Self {
        Self {
            user,
            session: Some(session),
        }
    }

    /// Context for a not-yet-linked device redeeming a pairing token.
    pub fn pairing(user: UserId) -> Self {
        Self {
            user,
            session: None,
        }
    }
}

/// Direct response to a dispatched intent.
///
/// Everything else an intent causes arrives as [`Event`] pushes.
#[derive(Debug)]
pub enum Outcome {
    /// A capability token was issued to the caller.
    Token(IssuedToken),
    /// A new session was linked for the caller.
    Paired(DeviceSession),
    /// The caller's sessions, most recently active first.
    Devices(Vec<DeviceSession>),
    /// A group the request created or joined.
    Group(GroupId),
    /// Message records for a catch-up sync.
    Messages {
        /// Records newer than the requested watermark, oldest first.
        messages: Vec<StoredMessage>,
        /// Watermark for the next sync request. At least as new as the
        /// newest returned record.
        next_since: ident_types::Timestamp,
    },
    /// The intent succeeded and has no direct payload.
    Done,
}

/// Routes intents to engines and fans resulting events out to sessions.
pub struct SyncCoordinator {
    vault: Arc<TokenVault>,
    devices: Arc<DeviceSessionRegistry>,
    groups: Arc<GroupAuthorizationEngine>,
    presence: Arc<PresenceAggregator>,
    transport: Arc<dyn EventTransport>,
    store: Arc<dyn MessageStore>,
    pairing_ttl: Duration,
}

impl SyncCoordinator {
    /// Build a coordinator with fresh in-memory engines tuned by `config`.
    pub fn new(
        config: &Config,
        transport: Arc<dyn EventTransport>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let vault = Arc::new(TokenVault::in_memory());
        let devices = Arc::new(DeviceSessionRegistry::new(Arc::clone(&vault)));
        let groups = Arc::new(
            GroupAuthorizationEngine::new(Arc::clone(&vault), config.policy.promotion)
                .with_invitation_ttl(config.tokens.invitation_ttl()),
        );
        let presence = Arc::new(PresenceAggregator::with_window(
            config.presence.typing_window(),
        ));
        Self::with_engines(
            vault,
            devices,
            groups,
            presence,
            transport,
            store,
            config.tokens.pairing_ttl(),
        )
    }

    /// Build a coordinator over externally constructed engines.
    ///
    /// The engines are plain values handed in at construction, so tests
    /// and embedders can pre-seed or share them.
    #[allow(clippy::too_many_arguments)]
    pub fn with_engines(
        vault: Arc<TokenVault>,
        devices: Arc<DeviceSessionRegistry>,
        groups: Arc<GroupAuthorizationEngine>,
        presence: Arc<PresenceAggregator>,
        transport: Arc<dyn EventTransport>,
        store: Arc<dyn MessageStore>,
        pairing_ttl: Duration,
    ) -> Self {
        Self {
            vault,
            devices,
            groups,
            presence,
            transport,
            store,
            pairing_ttl,
        }
    }

    /// The token vault, shared with the sweep task.
    pub fn vault(&self) -> &Arc<TokenVault> {
        &self.vault
    }

    /// The session registry.
    pub fn devices(&self) -> &Arc<DeviceSessionRegistry> {
        &self.devices
    }

    /// The group engine.
    pub fn groups(&self) -> &Arc<GroupAuthorizationEngine> {
        &self.groups
    }

    /// The typing aggregator, shared with the sweep task.
    pub fn presence(&self) -> &Arc<PresenceAggregator> {
        &self.presence
    }

    /// Create the initial session at primary login.
    ///
    /// Login itself is authenticated upstream; once the product accepts
    /// the credentials it registers the session here.
    pub fn register_primary(&self, user: UserId, device: DeviceInfo) -> DeviceSession {
        self.devices.register_primary(user, device)
    }

    /// Dispatch one intent on behalf of `ctx`.
    ///
    /// The acting session's activity clock is touched whether or not
    /// the intent succeeds.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        intent: Intent,
    ) -> Result<Outcome, IdentityError> {
        if let Some(session) = ctx.session {
            self.devices.touch(&ctx.user, session);
        }

        match intent {
            Intent::GeneratePairingToken => {
                let token = self.vault.issue(
                    TokenSubject::User {
                        user: ctx.user.clone(),
                    },
                    TokenPurpose::DevicePairing,
                    None,
                    self.pairing_ttl,
                );
                Ok(Outcome::Token(token))
            }

            Intent::VerifyPairingToken { token, device } => {
                let id = TokenId::from_text(&token).ok_or(IdentityError::NotFound)?;
                let session = self.devices.link_secondary(ctx.user.clone(), device, &id)?;
                self.fan_out_user(
                    &ctx.user,
                    Some(session.id),
                    &Event::NewDevicePaired {
                        session: session.clone(),
                    },
                )
                .await;
                self.deliver_one(
                    &ctx.user,
                    session.id,
                    &Event::DevicePaired {
                        session: session.clone(),
                    },
                )
                .await;
                Ok(Outcome::Paired(session))
            }

            Intent::ListDevices => Ok(Outcome::Devices(self.devices.list_devices(&ctx.user))),

            Intent::RemoveDevice { device } => {
                self.devices.remove_device(&ctx.user, device)?;
                self.fan_out_user(&ctx.user, ctx.session, &Event::DeviceRemoved { session: device })
                    .await;
                Ok(Outcome::Done)
            }

            Intent::CreateGroup { name } => {
                let group = self.groups.create_group(ctx.user.clone(), &name)?;
                let name = self.groups.group_name(group).unwrap_or_default();
                self.fan_out_user(&ctx.user, ctx.session, &Event::GroupCreated { group, name })
                    .await;
                Ok(Outcome::Group(group))
            }

            Intent::PromoteToAdmin {
                group,
                target,
                elevated,
            } => {
                let granted = self.groups.promote(&ctx.user, group, &target, elevated)?;
                self.fan_out_members(
                    group,
                    &Event::UserPromoted {
                        group,
                        user: target,
                        elevated: granted,
                    },
                )
                .await;
                Ok(Outcome::Done)
            }

            Intent::DemoteAdmin { group, target } => {
                self.groups.demote(&ctx.user, group, &target)?;
                self.fan_out_members(group, &Event::UserDemoted { group, user: target })
                    .await;
                Ok(Outcome::Done)
            }

            Intent::AddGroupMember { group, target } => {
                self.groups.add_member(&ctx.user, group, target.clone())?;
                self.fan_out_members(group, &Event::MemberAdded { group, user: target })
                    .await;
                Ok(Outcome::Done)
            }

            Intent::RemoveGroupMember { group, target } => {
                self.groups.remove_member(&ctx.user, group, &target)?;
                // Remaining members first, then the removed user's own
                // sessions, which are no longer in the member set.
                self.fan_out_members(
                    group,
                    &Event::MemberRemoved {
                        group,
                        user: target.clone(),
                    },
                )
                .await;
                self.fan_out_user(&target, None, &Event::RemovedFromGroup { group })
                    .await;
                Ok(Outcome::Done)
            }

            Intent::EditGroup { group, name } => {
                let name = self.groups.edit_group(&ctx.user, group, &name)?;
                self.fan_out_members(group, &Event::GroupEdited { group, name })
                    .await;
                Ok(Outcome::Done)
            }

            Intent::CreateGroupInvitation { group, invitee } => {
                let token = self
                    .groups
                    .create_invitation(&ctx.user, group, invitee.clone())?;
                self.fan_out_user(
                    &invitee,
                    None,
                    &Event::InvitationCreated {
                        group,
                        invitee: invitee.clone(),
                        token: token.id.to_string(),
                        expires_at: token.expires_at,
                    },
                )
                .await;
                Ok(Outcome::Token(token))
            }

            Intent::AcceptGroupInvitation { token } => {
                let id = TokenId::from_text(&token).ok_or(IdentityError::InvalidInvitation)?;
                let group = self.groups.accept_invitation(&ctx.user, &id)?;
                self.fan_out_members(
                    group,
                    &Event::MemberJoined {
                        group,
                        user: ctx.user.clone(),
                    },
                )
                .await;
                Ok(Outcome::Group(group))
            }

            Intent::DeclineGroupInvitation { token } => {
                let id = TokenId::from_text(&token).ok_or(IdentityError::InvalidInvitation)?;
                let group = self.groups.decline_invitation(&ctx.user, &id)?;
                self.fan_out_members(
                    group,
                    &Event::InvitationDeclined {
                        group,
                        user: ctx.user.clone(),
                    },
                )
                .await;
                Ok(Outcome::Done)
            }

            Intent::StartTyping { conversation } => {
                let users = self
                    .presence
                    .start_typing(conversation.clone(), ctx.user.clone());
                let rendered = render_typing(&users);
                let event = Event::UserTyping {
                    conversation: conversation.clone(),
                    users,
                    rendered,
                };
                self.fan_out_participants(&conversation, &ctx.user, &event)
                    .await;
                Ok(Outcome::Done)
            }

            Intent::StopTyping { conversation } => {
                let users = self.presence.stop_typing(&conversation, &ctx.user);
                let rendered = render_typing(&users);
                let event = Event::UserStoppedTyping {
                    conversation: conversation.clone(),
                    users,
                    rendered,
                };
                self.fan_out_participants(&conversation, &ctx.user, &event)
                    .await;
                Ok(Outcome::Done)
            }

            Intent::SendMessage { conversation, body } => {
                self.check_may_send(&ctx.user, &conversation)?;
                let stored = self
                    .store
                    .append(&conversation, &ctx.user, &body)
                    .await
                    .map_err(|e| IdentityError::Store(e.to_string()))?;
                let event = Event::MessageReceived {
                    conversation: stored.conversation.clone(),
                    sender: stored.sender.clone(),
                    body: stored.body.clone(),
                    timestamp: stored.timestamp,
                };
                // Every participant session except the one that sent it;
                // the sender's other devices stay in sync through this.
                for user in self.participants(&conversation) {
                    self.fan_out_user(&user, ctx.session, &event).await;
                }
                Ok(Outcome::Done)
            }

            Intent::SyncMessages { since } => {
                let messages = self
                    .store
                    .messages_since(&ctx.user, since)
                    .await
                    .map_err(|e| IdentityError::Store(e.to_string()))?;
                let next_since = messages
                    .iter()
                    .map(|m| m.timestamp)
                    .max()
                    .unwrap_or(since);
                Ok(Outcome::Messages {
                    messages,
                    next_since,
                })
            }
        }
    }

    fn check_may_send(
        &self,
        sender: &UserId,
        conversation: &ConversationId,
    ) -> Result<(), IdentityError> {
        match conversation {
            ConversationId::Direct { a, b } => {
                if sender == a || sender == b {
                    Ok(())
                } else {
                    Err(IdentityError::Forbidden)
                }
            }
            ConversationId::Group { group } => {
                let membership = self
                    .groups
                    .membership(*group, sender)
                    .ok_or(IdentityError::NotMember)?;
                if membership.permissions.send_messages {
                    Ok(())
                } else {
                    Err(IdentityError::Forbidden)
                }
            }
        }
    }

    fn participants(&self, conversation: &ConversationId) -> Vec<UserId> {
        match conversation {
            ConversationId::Direct { a, b } => vec![a.clone(), b.clone()],
            ConversationId::Group { group } => self
                .groups
                .members(*group)
                .into_iter()
                .map(|m| m.user)
                .collect(),
        }
    }

    /// Push `event` to one session; a failure is logged and swallowed.
    async fn deliver_one(&self, user: &UserId, session: SessionId, event: &Event) {
        if let Err(e) = self.transport.deliver(user, session, event).await {
            tracing::debug!("Delivery to session {} failed: {}", session, e);
        }
    }

    /// Push `event` to every active session of `user`, minus `exclude`.
    async fn fan_out_user(&self, user: &UserId, exclude: Option<SessionId>, event: &Event) {
        for session in self.devices.active_sessions(user) {
            if Some(session.id) == exclude {
                continue;
            }
            self.deliver_one(user, session.id, event).await;
        }
    }

    /// Push `event` to every active session of every current member.
    async fn fan_out_members(&self, group: GroupId, event: &Event) {
        for member in self.groups.members(group) {
            self.fan_out_user(&member.user, None, event).await;
        }
    }

    /// Push `event` to every participant of `conversation` except `skip`.
    async fn fan_out_participants(
        &self,
        conversation: &ConversationId,
        skip: &UserId,
        event: &Event,
    ) {
        for user in self.participants(conversation) {
            if &user == skip {
                continue;
            }
            self.fan_out_user(&user, None, event).await;
        }
    }
}
