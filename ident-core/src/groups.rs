//! Group role and permission engine.
//!
//! Maintains per-group membership state (role, elevation, permission
//! bits) and evaluates every administrative action against it. The role
//! state machine is `member → admin` with `admin → member` as its
//! inverse; `creator` is fixed at group creation and unreachable by
//! transition. Attempts to demote or remove the creator fail with
//! `CreatorProtected` regardless of who asks.
//!
//! Each group is one map entry, so a promote/demote pair on the same
//! membership serializes on the shard lock; groups never lock each
//! other.

use crate::tokens::{TokenVault, INVITATION_TOKEN_TTL};
use dashmap::DashMap;
use ident_types::{
    GroupId, GroupMembership, GroupRole, IdentityError, IssuedToken, Permissions, Timestamp,
    TokenId, TokenPurpose, TokenStatus, TokenSubject, UserId,
};
use serde::Deserialize;
use std::sync::Arc;

/// Who may promote and demote admins.
///
/// The original product was ambiguous here (sometimes creator-only,
/// sometimes any admin), so the rule is configuration rather than code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromotionPolicy {
    /// Only the creator may promote or demote.
    CreatorOnly,
    /// The creator, or admins holding the elevated tier.
    #[default]
    CreatorOrElevatedAdmin,
}

#[derive(Debug, Clone)]
struct GroupState {
    name: String,
    members: Vec<GroupMembership>,
}

impl GroupState {
    fn membership(&self, user: &UserId) -> Option<&GroupMembership> {
        self.members.iter().find(|m| &m.user == user)
    }

    fn membership_mut(&mut self, user: &UserId) -> Option<&mut GroupMembership> {
        self.members.iter_mut().find(|m| &m.user == user)
    }
}

/// Evaluates and applies group administrative actions.
pub struct GroupAuthorizationEngine {
    groups: DashMap<GroupId, GroupState>,
    vault: Arc<TokenVault>,
    policy: PromotionPolicy,
    invitation_ttl: std::time::Duration,
}

impl std::fmt::Debug for GroupAuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupAuthorizationEngine")
            .field("groups", &self.groups.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GroupAuthorizationEngine {
    /// Create an engine issuing invitations against `vault`.
    pub fn new(vault: Arc<TokenVault>, policy: PromotionPolicy) -> Self {
        Self {
            groups: DashMap::new(),
            vault,
            policy,
            invitation_ttl: INVITATION_TOKEN_TTL,
        }
    }

    /// Override the invitation token lifetime (defaults to 7 days).
    #[must_use]
    pub fn with_invitation_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.invitation_ttl = ttl;
        self
    }

    /// Create a group. The acting user becomes its creator, with all
    /// permission bits set — an assignment that is immutable for the
    /// life of the group.
    pub fn create_group(&self, creator: UserId, name: &str) -> Result<GroupId, IdentityError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::InvalidName);
        }

        let group = GroupId::new();
        self.groups.insert(
            group,
            GroupState {
                name: name.to_string(),
                members: vec![GroupMembership {
                    user: creator.clone(),
                    role: GroupRole::Creator,
                    elevated: false,
                    permissions: Permissions::all(),
                    joined_at: Timestamp::now(),
                }],
            },
        );

        tracing::info!("Group {} ({:?}) created by {}", group, name, creator);
        Ok(group)
    }

    /// Promote a member to admin.
    ///
    /// The elevated tier is granted only when the actor is the creator;
    /// an elevated admin's promotions produce ordinary admins.
    pub fn promote(
        &self,
        actor: &UserId,
        group: GroupId,
        target: &UserId,
        elevated: bool,
    ) -> Result<bool, IdentityError> {
        let mut state = self.groups.get_mut(&group).ok_or(IdentityError::NotFound)?;

        let actor_role = state.membership(actor).ok_or(IdentityError::Forbidden)?;
        if !self.may_manage_roles(actor_role) {
            return Err(IdentityError::Forbidden);
        }
        let grant_elevated = elevated && actor_role.role == GroupRole::Creator;

        let membership = state
            .membership_mut(target)
            .ok_or(IdentityError::NotMember)?;
        match membership.role {
            GroupRole::Admin | GroupRole::Creator => return Err(IdentityError::AlreadyAdmin),
            GroupRole::Member => {}
        }

        membership.role = GroupRole::Admin;
        membership.elevated = grant_elevated;
        membership.permissions = Permissions::all();

        tracing::info!(
            "{} promoted {} in {} (elevated: {})",
            actor,
            target,
            group,
            grant_elevated
        );
        Ok(grant_elevated)
    }

    /// Demote an admin back to member.
    pub fn demote(
        &self,
        actor: &UserId,
        group: GroupId,
        target: &UserId,
    ) -> Result<(), IdentityError> {
        let mut state = self.groups.get_mut(&group).ok_or(IdentityError::NotFound)?;

        // Creator protection comes before any authority check
        if let Some(m) = state.membership(target) {
            if m.role == GroupRole::Creator {
                return Err(IdentityError::CreatorProtected);
            }
        }

        let actor_role = state.membership(actor).ok_or(IdentityError::Forbidden)?;
        if !self.may_manage_roles(actor_role) {
            return Err(IdentityError::Forbidden);
        }

        let membership = state
            .membership_mut(target)
            .ok_or(IdentityError::NotAdmin)?;
        if membership.role != GroupRole::Admin {
            return Err(IdentityError::NotAdmin);
        }

        membership.role = GroupRole::Member;
        membership.elevated = false;
        membership.permissions = Permissions::member_default();

        tracing::info!("{} demoted {} in {}", actor, target, group);
        Ok(())
    }

    /// Add a user to the group directly.
    pub fn add_member(
        &self,
        actor: &UserId,
        group: GroupId,
        target: UserId,
    ) -> Result<(), IdentityError> {
        let mut state = self.groups.get_mut(&group).ok_or(IdentityError::NotFound)?;

        let actor_membership = state.membership(actor).ok_or(IdentityError::Forbidden)?;
        if !actor_membership.permissions.add_members {
            return Err(IdentityError::Forbidden);
        }
        if state.membership(&target).is_some() {
            return Err(IdentityError::AlreadyMember);
        }

        state.members.push(member_entry(target.clone()));
        tracing::info!("{} added {} to {}", actor, target, group);
        Ok(())
    }

    /// Remove a user from the group.
    pub fn remove_member(
        &self,
        actor: &UserId,
        group: GroupId,
        target: &UserId,
    ) -> Result<(), IdentityError> {
        let mut state = self.groups.get_mut(&group).ok_or(IdentityError::NotFound)?;

        if let Some(m) = state.membership(target) {
            if m.role == GroupRole::Creator {
                return Err(IdentityError::CreatorProtected);
            }
        }

        let actor_membership = state.membership(actor).ok_or(IdentityError::Forbidden)?;
        if !actor_membership.permissions.remove_members {
            return Err(IdentityError::Forbidden);
        }

        let before = state.members.len();
        state.members.retain(|m| &m.user != target);
        if state.members.len() == before {
            return Err(IdentityError::NotMember);
        }

        tracing::info!("{} removed {} from {}", actor, target, group);
        Ok(())
    }

    /// Rename the group.
    pub fn edit_group(
        &self,
        actor: &UserId,
        group: GroupId,
        new_name: &str,
    ) -> Result<String, IdentityError> {
        let mut state = self.groups.get_mut(&group).ok_or(IdentityError::NotFound)?;

        let actor_membership = state.membership(actor).ok_or(IdentityError::Forbidden)?;
        if !actor_membership.permissions.edit_group {
            return Err(IdentityError::Forbidden);
        }

        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(IdentityError::InvalidName);
        }

        state.name = new_name.to_string();
        Ok(new_name.to_string())
    }

    /// Issue a 7-day invitation token. Any current member may invite.
    pub fn create_invitation(
        &self,
        actor: &UserId,
        group: GroupId,
        invitee: UserId,
    ) -> Result<IssuedToken, IdentityError> {
        let state = self.groups.get(&group).ok_or(IdentityError::NotFound)?;
        if state.membership(actor).is_none() {
            return Err(IdentityError::NotMember);
        }
        drop(state);

        Ok(self.vault.issue(
            TokenSubject::Group { group },
            TokenPurpose::GroupInvitation,
            Some(invitee),
            self.invitation_ttl,
        ))
    }

    /// Accept an invitation token, joining the group as a member with
    /// default permission bits.
    pub fn accept_invitation(
        &self,
        user: &UserId,
        token: &TokenId,
    ) -> Result<GroupId, IdentityError> {
        self.check_invitee(user, token)?;

        let redeemed = self
            .vault
            .redeem(token, TokenPurpose::GroupInvitation)
            .map_err(map_invitation_error)?;

        if redeemed.target.as_ref() != Some(user) {
            return Err(IdentityError::WrongInvitee);
        }
        let group = match redeemed.subject {
            TokenSubject::Group { group } => group,
            TokenSubject::User { .. } => return Err(IdentityError::InvalidInvitation),
        };

        let mut state = self
            .groups
            .get_mut(&group)
            .ok_or(IdentityError::InvalidInvitation)?;
        if state.membership(user).is_some() {
            return Err(IdentityError::AlreadyMember);
        }

        state.members.push(member_entry(user.clone()));
        tracing::info!("{} joined {} by invitation", user, group);
        Ok(group)
    }

    /// Decline an invitation token, marking it rejected.
    pub fn decline_invitation(
        &self,
        user: &UserId,
        token: &TokenId,
    ) -> Result<GroupId, IdentityError> {
        // Invitations only: a pairing token cannot be declined
        match self.vault.get(token) {
            Some(record) if record.purpose == TokenPurpose::GroupInvitation => {}
            Some(_) | None => return Err(IdentityError::InvalidInvitation),
        }
        self.check_invitee(user, token)?;

        let rejected = self.vault.reject(token).map_err(map_invitation_error)?;
        if rejected.target.as_ref() != Some(user) {
            return Err(IdentityError::WrongInvitee);
        }
        match rejected.subject {
            TokenSubject::Group { group } => Ok(group),
            TokenSubject::User { .. } => Err(IdentityError::InvalidInvitation),
        }
    }

    /// Current membership list, in join order.
    pub fn members(&self, group: GroupId) -> Vec<GroupMembership> {
        self.groups
            .get(&group)
            .map(|state| state.members.clone())
            .unwrap_or_default()
    }

    /// One user's membership, if any.
    pub fn membership(&self, group: GroupId, user: &UserId) -> Option<GroupMembership> {
        self.groups
            .get(&group)
            .and_then(|state| state.membership(user).cloned())
    }

    /// The group's display name, if the group exists.
    pub fn group_name(&self, group: GroupId) -> Option<String> {
        self.groups.get(&group).map(|state| state.name.clone())
    }

    /// Refuse a wrong invitee before the vault transitions the token.
    ///
    /// A mismatched accept or decline must leave the invitation
    /// redeemable by its real target, so the check runs on a peek;
    /// the redeem or reject that follows is still the atomic step.
    fn check_invitee(&self, user: &UserId, token: &TokenId) -> Result<(), IdentityError> {
        if let Some(record) = self.vault.get(token) {
            if record.purpose == TokenPurpose::GroupInvitation
                && record.status == TokenStatus::Pending
                && record.target.as_ref() != Some(user)
            {
                return Err(IdentityError::WrongInvitee);
            }
        }
        Ok(())
    }

    fn may_manage_roles(&self, membership: &GroupMembership) -> bool {
        match membership.role {
            GroupRole::Creator => true,
            GroupRole::Admin => {
                self.policy == PromotionPolicy::CreatorOrElevatedAdmin && membership.elevated
            }
            GroupRole::Member => false,
        }
    }
}

fn member_entry(user: UserId) -> GroupMembership {
    GroupMembership {
        user,
        role: GroupRole::Member,
        elevated: false,
        permissions: Permissions::member_default(),
        joined_at: Timestamp::now(),
    }
}

/// Collapse vault errors into the invitation-facing pair.
fn map_invitation_error(e: IdentityError) -> IdentityError {
    match e {
        IdentityError::Expired => IdentityError::InvitationExpired,
        IdentityError::NotFound
        | IdentityError::WrongPurpose
        | IdentityError::AlreadyConsumed => IdentityError::InvalidInvitation,
        other => other,
    }
}
