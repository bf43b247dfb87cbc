//! Co-ownership: invitations, joining, removal and leaving.

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::engine::{best_effort, require, EngineError, EngineResult, PetEngine};
use crate::api::{PetId, UserId};
use crate::db::{token_digest, RepositoryError};
use crate::models::pet::{OwnerRole, Ownership, PetView};
use crate::models::social::{Invitation, InvitationStatus, NewInvitation, NotificationKind, Priority};
use crate::models::user::normalize_email;
use crate::realtime::{MessageType, ServerEvent};

/// Returned to the inviter. `token` is shown exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationCreated {
    pub invitation: Invitation,
    pub token: String,
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

impl PetEngine {
    /// Invite `email` to co-own a pet.
    pub async fn invite(
        &self,
        user_id: UserId,
        pet_id: PetId,
        email: &str,
        role: OwnerRole,
        message: Option<String>,
    ) -> EngineResult<InvitationCreated> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(EngineError::Validation("Invalid email address".to_string()));
        }
        if role == OwnerRole::Owner {
            return Err(EngineError::Validation(
                "Invitations can only grant the co-owner role".to_string(),
            ));
        }
        let pet = self.load_for_member(pet_id, user_id).await?;
        require(&pet, user_id, |p| p.can_invite_others, "invite others to")?;
        if pet.ownerships.len() >= self.config.max_owners_per_pet {
            return Err(EngineError::Conflict(format!(
                "A pet can have at most {} owners",
                self.config.max_owners_per_pet
            )));
        }
        let invitee = self.repo.find_user_by_email(&email).await?;
        if invitee.as_ref().is_some_and(|u| pet.is_member(u.id)) {
            return Err(EngineError::Conflict(
                "User is already an owner of this pet".to_string(),
            ));
        }

        let now = Utc::now();
        for stale in self
            .repo
            .list_invitations_for_pet(pet_id)
            .await?
            .into_iter()
            .filter(|i| i.is_pending() && i.is_expired_at(now))
        {
            self.expire_invitation(stale).await?;
        }

        let token = new_token();
        let invitation = self
            .repo
            .insert_invitation(NewInvitation {
                pet_id,
                inviter_id: user_id,
                invitee_email: email,
                role,
                message,
                token_hash: token_digest(&token),
                created_at: now,
                expires_at: now + Duration::days(self.config.invitation_expiry_days),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict { message, .. } => EngineError::Conflict(message),
                other => other.into(),
            })?;
        info!(pet_id = %pet_id, invitation_id = %invitation.id, "Invitation created");

        if let Some(invitee) = invitee {
            self.notify(
                invitee.id,
                NotificationKind::InviteReceived,
                "Pet invitation".to_string(),
                format!("You were invited to co-own {}", pet.name),
                Priority::High,
                Some(pet_id),
            )
            .await;
        }
        Ok(InvitationCreated { invitation, token })
    }

    async fn expire_invitation(&self, mut invitation: Invitation) -> EngineResult<()> {
        invitation.status = InvitationStatus::Expired;
        self.repo.update_invitation(&invitation).await?;
        Ok(())
    }

    /// Look up a pending invitation addressed to `user_id`.
    async fn pending_invitation_for(&self, user_id: UserId, token: &str) -> EngineResult<Invitation> {
        let invitation = self
            .repo
            .find_invitation_by_token_hash(&token_digest(token))
            .await?
            .ok_or_else(|| EngineError::NotFound("Invitation".to_string()))?;
        let user = self.repo.get_user(user_id).await?;
        if normalize_email(&user.email) != invitation.invitee_email {
            return Err(EngineError::Forbidden(
                "This invitation was sent to a different email".to_string(),
            ));
        }
        if !invitation.is_pending() {
            return Err(EngineError::Conflict(format!(
                "Invitation is already {}",
                serde_json::json!(invitation.status).as_str().unwrap_or("closed")
            )));
        }
        if invitation.is_expired_at(Utc::now()) {
            self.expire_invitation(invitation).await?;
            return Err(EngineError::Validation("Invitation has expired".to_string()));
        }
        Ok(invitation)
    }

    pub async fn accept_invitation(&self, user_id: UserId, token: &str) -> EngineResult<PetView> {
        let mut invitation = self.pending_invitation_for(user_id, token).await?;
        let max_owners = self.config.max_owners_per_pet;
        let role = invitation.role;

        let committed = self
            .mutate_pet_as_system(invitation.pet_id, |pet| {
                if pet.is_member(user_id) {
                    return Err(EngineError::Conflict(
                        "You are already an owner of this pet".to_string(),
                    ));
                }
                if pet.ownerships.len() >= max_owners {
                    return Err(EngineError::Conflict(format!(
                        "A pet can have at most {max_owners} owners"
                    )));
                }
                pet.ownerships.push(Ownership::new(user_id, role, Utc::now()));
                Ok(())
            })
            .await?;
        let pet = &committed.pet;

        invitation.status = InvitationStatus::Accepted;
        invitation.responded_at = Some(Utc::now());
        best_effort(self.repo.update_invitation(&invitation).await, "invitation update");
        info!(pet_id = %pet.id, user_id = %user_id, "Co-owner joined");

        self.record_activity(
            pet,
            user_id,
            "owner_added",
            serde_json::json!({ "invited_by": invitation.inviter_id }),
            Default::default(),
        )
        .await;
        self.broadcast(
            pet,
            MessageType::OwnerAdded,
            serde_json::json!({ "user_id": user_id, "role": role }),
        );
        self.publish(&committed);
        self.notify(
            invitation.inviter_id,
            NotificationKind::System,
            "Invitation accepted".to_string(),
            format!("{} has a new co-owner", pet.name),
            Priority::Normal,
            Some(pet.id),
        )
        .await;
        self.evaluate_achievements(user_id, pet.id).await;
        self.evaluate_achievements(invitation.inviter_id, pet.id).await;
        Ok(pet.view())
    }

    pub async fn decline_invitation(&self, user_id: UserId, token: &str) -> EngineResult<Invitation> {
        let mut invitation = self.pending_invitation_for(user_id, token).await?;
        invitation.status = InvitationStatus::Declined;
        invitation.responded_at = Some(Utc::now());
        self.repo.update_invitation(&invitation).await?;
        Ok(invitation)
    }

    /// Invitations sent for a pet, newest first.
    pub async fn list_invitations(&self, user_id: UserId, pet_id: PetId) -> EngineResult<Vec<Invitation>> {
        self.load_for_member(pet_id, user_id).await?;
        let mut invitations = self.repo.list_invitations_for_pet(pet_id).await?;
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    /// Owner removes a co-owner. The removed user's connections leave the room.
    pub async fn remove_co_owner(
        &self,
        user_id: UserId,
        pet_id: PetId,
        target: UserId,
        expected_version: Option<u64>,
    ) -> EngineResult<PetView> {
        let committed = self
            .mutate_pet(pet_id, user_id, expected_version, |pet| {
                if pet.owner_id() != Some(user_id) {
                    return Err(EngineError::Forbidden(
                        "Only the owner can remove co-owners".to_string(),
                    ));
                }
                let removed = pet
                    .ownership(target)
                    .ok_or_else(|| EngineError::NotFound("Co-owner".to_string()))?;
                if removed.role == OwnerRole::Owner {
                    return Err(EngineError::Forbidden("Cannot remove the owner".to_string()));
                }
                pet.ownerships.retain(|o| o.user_id != target);
                for task in pet.tasks.iter_mut() {
                    task.assignees.retain(|u| *u != target);
                }
                Ok(())
            })
            .await?;
        let pet = &committed.pet;
        info!(pet_id = %pet_id, removed = %target, "Co-owner removed");

        self.hub.kick_user_from_room(target, pet_id);
        self.hub.send_to_user(
            target,
            ServerEvent::for_pet(
                MessageType::OwnerRemoved,
                pet_id,
                pet.version,
                serde_json::json!({ "removed_user_id": target, "removed_by": user_id }),
            ),
        );
        self.broadcast(
            pet,
            MessageType::OwnerRemoved,
            serde_json::json!({ "removed_user_id": target, "removed_by": user_id }),
        );
        self.publish(&committed);
        Ok(pet.view())
    }

    /// A co-owner leaves a pet. The owner cannot leave.
    pub async fn leave_pet(&self, user_id: UserId, pet_id: PetId) -> EngineResult<()> {
        let committed = self
            .mutate_pet(pet_id, user_id, None, |pet| {
                if pet.owner_id() == Some(user_id) {
                    return Err(EngineError::Forbidden(
                        "The owner cannot leave their own pet".to_string(),
                    ));
                }
                pet.ownerships.retain(|o| o.user_id != user_id);
                for task in pet.tasks.iter_mut() {
                    task.assignees.retain(|u| *u != user_id);
                }
                Ok(())
            })
            .await?;
        self.hub.kick_user_from_room(user_id, pet_id);
        self.broadcast(
            &committed.pet,
            MessageType::OwnerRemoved,
            serde_json::json!({ "removed_user_id": user_id, "removed_by": user_id }),
        );
        self.publish(&committed);
        Ok(())
    }
}
