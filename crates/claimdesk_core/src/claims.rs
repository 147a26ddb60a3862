//! Claim lifecycle: `pending → approved | rejected`.
//!
//! There is no transaction spanning the profile, business and claim writes.
//! Guards run before the first write; after that, failures of secondary
//! writes are logged and audited rather than rolled back. The final claim
//! status write is conditional on the claim still being pending, so a
//! concurrent reviewer gets `Conflict` and no side effects are sent twice.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditTrail, NewAuditEntry, TargetType};
use crate::config::{ClaimWriteMode, EngineConfig, TierLimits};
use crate::error::AdminError;
use crate::gate::{AdminContext, AuthorizationGate};
use crate::ports::{AssignmentStore, BusinessStore, ClaimStore, Ports, ProfileStore};
use crate::schema_drift::write_with_drift_retry;
use crate::side_effects::{Email, Notification, SideEffects};
use crate::types::{BusinessId, Claim, ClaimDecision, Profile, Role, UserId};
use crate::writes::ClaimReviewWrite;

/// Result of keeping `businesses.user_id` in step with the approved claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerSync {
    Ok,
    Failed,
    /// Rejections never touch the owner.
    NotApplicable,
}

impl OwnerSync {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::NotApplicable => "not_applicable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub claim_id: Uuid,
    pub business_id: BusinessId,
    pub decision: ClaimDecision,
    pub owner_sync: OwnerSync,
    /// Columns shed by the drift guard on the final status write.
    pub recovered_columns: Vec<&'static str>,
}

impl ClaimOutcome {
    pub fn message(&self) -> String {
        let verb = match self.decision {
            ClaimDecision::Approved => "approved",
            ClaimDecision::Rejected => "rejected",
        };
        let mut message = if self.recovered_columns.is_empty() {
            format!("Claim {verb} successfully for business {}.", self.business_id)
        } else {
            format!("Claim {verb} successfully.")
        };
        if self.owner_sync == OwnerSync::Failed {
            message.push_str(
                " Warning: the business owner could not be updated and must be reconciled.",
            );
        }
        message
    }
}

#[derive(Clone)]
pub struct ClaimTransitionEngine {
    gate: AuthorizationGate,
    profiles: Arc<dyn ProfileStore>,
    businesses: Arc<dyn BusinessStore>,
    assignments: Arc<dyn AssignmentStore>,
    claims: Arc<dyn ClaimStore>,
    effects: SideEffects,
    audit: AuditTrail,
    limits: TierLimits,
    mode: ClaimWriteMode,
}

impl ClaimTransitionEngine {
    pub fn new(ports: &Ports, config: &EngineConfig) -> Self {
        Self {
            gate: AuthorizationGate::new(ports.profiles.clone()),
            profiles: ports.profiles.clone(),
            businesses: ports.businesses.clone(),
            assignments: ports.assignments.clone(),
            claims: ports.claims.clone(),
            effects: SideEffects::new(
                ports.notifier.clone(),
                ports.mailer.clone(),
                ports.cache.clone(),
            ),
            audit: AuditTrail::new(ports.audit.clone()),
            limits: config.tier_limits,
            mode: config.claim_write_mode,
        }
    }

    pub async fn transition(
        &self,
        ctx: &AdminContext,
        claim_id: Uuid,
        decision: ClaimDecision,
        reason: Option<String>,
    ) -> Result<ClaimOutcome, AdminError> {
        match decision {
            ClaimDecision::Approved => self.approve(ctx, claim_id).await,
            ClaimDecision::Rejected => self.reject(ctx, claim_id, reason).await,
        }
    }

    pub async fn approve(&self, ctx: &AdminContext, claim_id: Uuid) -> Result<ClaimOutcome, AdminError> {
        let claim = self.load_pending(claim_id).await?;
        let user_id = claim
            .user_id
            .ok_or_else(|| AdminError::Invalid("This claim has no associated user.".into()))?;

        let profile = self
            .profiles
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AdminError::NotFound("Claimant profile not found.".into()))?;

        if !profile.is_admin() {
            self.check_ownership_limit(&profile, &claim.business_id).await?;
        }

        let business = self
            .businesses
            .get_business(&claim.business_id)
            .await?
            .ok_or_else(|| AdminError::NotFound("Business not found.".into()))?;
        if let Some(owner) = business.owner_user_id {
            if owner != user_id {
                return Err(AdminError::Conflict(
                    "This business is already managed by another user.".into(),
                ));
            }
        }

        self.gate.recheck(ctx).await?;

        // Admin claimants keep their role.
        let role = if profile.is_admin() { Role::Admin } else { Role::Pro };
        self.profiles
            .assign_primary_business(user_id, &claim.business_id, role)
            .await?;

        let owner_sync = self.sync_owner(&claim, user_id).await;

        let requested = claim.requested_updates();
        let mut requested_applied = false;
        if !requested.is_empty() {
            match self
                .businesses
                .apply_requested_updates(&claim.business_id, &requested)
                .await
            {
                Ok(_) => requested_applied = true,
                Err(e) => tracing::warn!(
                    claim_id = %claim_id,
                    business_id = %claim.business_id,
                    error = %e,
                    "requested business updates not applied"
                ),
            }
        }

        self.verify_profile(user_id, &claim.business_id, role).await?;

        let write = ClaimReviewWrite::new(ClaimDecision::Approved, ctx.admin_id, Utc::now(), None);
        let recovered_columns = self.persist_review(claim_id, write).await?;

        if let Some(to) = non_empty(&claim.email) {
            self.effects
                .email(Email::ClaimApproved {
                    to: to.to_string(),
                    full_name: claim.full_name.clone(),
                    business_name: claim
                        .business_name
                        .clone()
                        .unwrap_or_else(|| business.name.clone()),
                })
                .await;
        }
        self.effects
            .notify(Notification::claim_approved(user_id, claim.display_business_name()))
            .await;

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                AuditAction::ApproveClaim,
                TargetType::Claim,
                claim_id.to_string(),
                json!({
                    "business_id": claim.business_id,
                    "user_id": user_id,
                    "owner_sync": owner_sync.as_str(),
                    "requested_updates_applied": requested_applied,
                    "recovered_columns": recovered_columns,
                }),
            ))
            .await;
        self.effects.invalidate_claim_paths(&claim.business_id).await;

        tracing::info!(claim_id = %claim_id, user_id = %user_id, business_id = %claim.business_id, "claim approved");
        Ok(ClaimOutcome {
            claim_id,
            business_id: claim.business_id,
            decision: ClaimDecision::Approved,
            owner_sync,
            recovered_columns,
        })
    }

    pub async fn reject(
        &self,
        ctx: &AdminContext,
        claim_id: Uuid,
        reason: Option<String>,
    ) -> Result<ClaimOutcome, AdminError> {
        let claim = self.load_pending(claim_id).await?;
        self.gate.recheck(ctx).await?;

        let write = ClaimReviewWrite::new(
            ClaimDecision::Rejected,
            ctx.admin_id,
            Utc::now(),
            reason.clone(),
        );
        let reason = write.rejection_reason.as_written().cloned().flatten();
        let recovered_columns = self.persist_review(claim_id, write).await?;

        let business_name = claim.display_business_name().to_string();
        if let Some(to) = non_empty(&claim.email) {
            self.effects
                .email(Email::ClaimRejected {
                    to: to.to_string(),
                    full_name: claim.full_name.clone(),
                    business_name: business_name.clone(),
                    reason: reason.clone(),
                })
                .await;
        }
        if let Some(user_id) = claim.user_id {
            self.effects
                .notify(Notification::claim_rejected(
                    user_id,
                    &business_name,
                    reason.as_deref(),
                ))
                .await;
        }

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                AuditAction::RejectClaim,
                TargetType::Claim,
                claim_id.to_string(),
                json!({
                    "business_id": claim.business_id,
                    "user_id": claim.user_id,
                    "reason": reason,
                    "recovered_columns": recovered_columns,
                }),
            ))
            .await;
        self.effects.invalidate_claim_paths(&claim.business_id).await;

        tracing::info!(claim_id = %claim_id, business_id = %claim.business_id, "claim rejected");
        Ok(ClaimOutcome {
            claim_id,
            business_id: claim.business_id,
            decision: ClaimDecision::Rejected,
            owner_sync: OwnerSync::NotApplicable,
            recovered_columns,
        })
    }

    // ── Steps ─────────────────────────────────────────────────

    async fn load_pending(&self, claim_id: Uuid) -> Result<Claim, AdminError> {
        let claim = self
            .claims
            .get_claim(claim_id)
            .await?
            .ok_or_else(|| AdminError::NotFound("Claim not found.".into()))?;
        if claim.status.is_terminal() {
            return Err(AdminError::Conflict(format!(
                "This claim has already been {}.",
                claim.status
            )));
        }
        Ok(claim)
    }

    /// Controlled businesses: primary ∪ approved claims ∪ assignments, not
    /// counting the business being claimed.
    async fn check_ownership_limit(
        &self,
        profile: &Profile,
        business_id: &str,
    ) -> Result<(), AdminError> {
        let mut controlled: BTreeSet<BusinessId> = BTreeSet::new();
        if let Some(primary) = &profile.business_id {
            controlled.insert(primary.clone());
        }
        controlled.extend(self.claims.approved_business_ids_for_user(profile.id).await?);
        controlled.extend(self.assignments.business_ids_for_user(profile.id).await?);
        controlled.remove(business_id);

        let max = self.limits.max_for(profile.effective_tier());
        if controlled.len() >= max {
            tracing::info!(
                user_id = %profile.id,
                current = controlled.len(),
                max,
                "claim approval blocked by ownership limit"
            );
            return Err(AdminError::LimitExceeded {
                max,
                current: controlled.len(),
            });
        }
        Ok(())
    }

    async fn sync_owner(&self, claim: &Claim, user_id: UserId) -> OwnerSync {
        match self
            .businesses
            .set_owner_if_unclaimed(&claim.business_id, user_id)
            .await
        {
            Ok(n) if n > 0 => OwnerSync::Ok,
            Ok(_) => {
                tracing::error!(
                    claim_id = %claim.id,
                    business_id = %claim.business_id,
                    "business owner not set: owned by another user at write time"
                );
                OwnerSync::Failed
            }
            Err(e) => {
                tracing::error!(
                    claim_id = %claim.id,
                    business_id = %claim.business_id,
                    error = %e,
                    "business owner update failed after profile update"
                );
                OwnerSync::Failed
            }
        }
    }

    async fn verify_profile(
        &self,
        user_id: UserId,
        business_id: &str,
        role: Role,
    ) -> Result<(), AdminError> {
        let updated = self.profiles.get_profile(user_id).await.map_err(|e| {
            AdminError::VerificationFailed(format!("Profile update could not be verified: {e}"))
        })?;
        match updated {
            Some(p) if p.business_id.as_deref() == Some(business_id) && p.role == role => Ok(()),
            _ => Err(AdminError::VerificationFailed(
                "Profile update could not be verified.".into(),
            )),
        }
    }

    async fn persist_review(
        &self,
        claim_id: Uuid,
        write: ClaimReviewWrite,
    ) -> Result<Vec<&'static str>, AdminError> {
        let write = match self.mode {
            ClaimWriteMode::Resilient => write.resilient(),
            ClaimWriteMode::Strict => write,
        };
        let claims = &self.claims;
        let outcome = write_with_drift_retry(write, |w: ClaimReviewWrite| async move {
            claims.write_review(claim_id, &w).await
        })
        .await?;

        if outcome.value == 0 {
            return Err(AdminError::Conflict(
                "This claim was already processed by another administrator.".into(),
            ));
        }
        if outcome.recovered() {
            tracing::warn!(
                claim_id = %claim_id,
                stripped = ?outcome.stripped,
                "claim status persisted with reduced payload"
            );
        }
        Ok(outcome.stripped)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
