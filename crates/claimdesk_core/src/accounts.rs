//! Account administration: direct premium toggles, role changes,
//! suspension, and the premium expiry sweep.

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serde_json::json;

use crate::audit::{AuditAction, AuditTrail, NewAuditEntry, TargetType};
use crate::bulk::{denied, summary_message};
use crate::entitlement::{EntitlementRequest, EntitlementSync};
use crate::error::AdminError;
use crate::gate::{AdminContext, AuthorizationGate};
use crate::ports::{Ports, ProfileStore};
use crate::side_effects::{SideEffects, PATH_ADMIN_USERS};
use crate::types::{BulkOperationResult, Profile, Role, Tier, UserId};

#[derive(Clone)]
pub struct AccountAdministration {
    gate: AuthorizationGate,
    profiles: Arc<dyn ProfileStore>,
    entitlement: EntitlementSync,
    effects: SideEffects,
    audit: AuditTrail,
}

impl AccountAdministration {
    pub fn new(ports: &Ports) -> Self {
        Self {
            gate: AuthorizationGate::new(ports.profiles.clone()),
            profiles: ports.profiles.clone(),
            entitlement: EntitlementSync::new(ports.entitlements.clone()),
            effects: SideEffects::new(
                ports.notifier.clone(),
                ports.mailer.clone(),
                ports.cache.clone(),
            ),
            audit: AuditTrail::new(ports.audit.clone()),
        }
    }

    /// Grants `tier` (optionally for `period_months`) or revokes when `tier`
    /// is standard.
    pub async fn toggle_premium(
        &self,
        ctx: &AdminContext,
        user_id: UserId,
        tier: Tier,
        period_months: Option<u32>,
    ) -> Result<String, AdminError> {
        self.require_profile(user_id).await?;
        self.gate.recheck(ctx).await?;

        let now = Utc::now();
        let expires_at = match period_months {
            Some(months) if months > 0 && tier.is_paid() => {
                Some(now.checked_add_months(Months::new(months)).ok_or_else(|| {
                    AdminError::Invalid("Premium period is out of range.".into())
                })?)
            }
            _ => None,
        };
        let request = EntitlementRequest::grant(user_id, tier, now, expires_at);
        let receipt = self.entitlement.toggle(&request).await?;

        let action = if request.is_premium {
            AuditAction::GrantedPremium
        } else {
            AuditAction::RevokedPremium
        };
        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                action,
                TargetType::Profile,
                user_id.to_string(),
                json!({
                    "tier": tier,
                    "is_premium": request.is_premium,
                    "period_months": period_months,
                    "expires_at": expires_at,
                    "businesses_updated": receipt.businesses_updated,
                    "business_ids": receipt.business_ids,
                }),
            ))
            .await;
        self.effects.invalidate([PATH_ADMIN_USERS]).await;

        Ok(if request.is_premium {
            format!(
                "{} plan activated ({} business(es) updated).",
                tier.as_str().to_uppercase(),
                receipt.businesses_updated
            )
        } else {
            "Premium status removed.".to_string()
        })
    }

    /// An admin cannot move themselves off the admin role.
    pub async fn change_user_role(
        &self,
        ctx: &AdminContext,
        user_id: UserId,
        role: Role,
    ) -> Result<String, AdminError> {
        if user_id == ctx.admin_id && role != Role::Admin {
            return Err(AdminError::Conflict("You cannot change your own role.".into()));
        }
        let previous = self.require_profile(user_id).await?.role;
        self.gate.recheck(ctx).await?;

        if self.profiles.set_role(user_id, role).await? == 0 {
            return Err(AdminError::NotFound("User not found.".into()));
        }

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                AuditAction::UpdateRole,
                TargetType::Profile,
                user_id.to_string(),
                json!({ "new_role": role, "previous_role": previous }),
            ))
            .await;
        self.effects.invalidate([PATH_ADMIN_USERS]).await;

        tracing::info!(user_id = %user_id, role = role.as_str(), "role changed");
        Ok(format!("Role changed to \"{role}\"."))
    }

    /// Not on oneself, and not on another admin.
    pub async fn set_user_suspension(
        &self,
        ctx: &AdminContext,
        user_id: UserId,
        suspend: bool,
    ) -> Result<String, AdminError> {
        if user_id == ctx.admin_id {
            return Err(AdminError::Conflict(
                "You cannot suspend your own account.".into(),
            ));
        }
        let target = self.require_profile(user_id).await?;
        if target.is_admin() {
            return Err(AdminError::Conflict(
                "An administrator cannot be suspended.".into(),
            ));
        }
        self.gate.recheck(ctx).await?;

        if self.profiles.set_suspension(user_id, suspend).await? == 0 {
            return Err(AdminError::NotFound("User not found.".into()));
        }

        let action = if suspend {
            AuditAction::SuspendUser
        } else {
            AuditAction::UnsuspendUser
        };
        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                action,
                TargetType::Profile,
                user_id.to_string(),
                serde_json::Value::Null,
            ))
            .await;
        self.effects.invalidate([PATH_ADMIN_USERS]).await;

        Ok(if suspend {
            "Account suspended.".to_string()
        } else {
            "Account reactivated.".to_string()
        })
    }

    /// Revokes every lapsed premium account, one entitlement call per user.
    pub async fn expire_premium_accounts(
        &self,
        ctx: &AdminContext,
        now: DateTime<Utc>,
    ) -> BulkOperationResult {
        if let Err(e) = self.gate.recheck(ctx).await {
            return denied(e);
        }

        let expired = match self.profiles.list_expired_premium(now).await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::error!(error = %e, "could not list expired premium profiles");
                return BulkOperationResult::failure(
                    "Could not list expired premium accounts.",
                    0,
                    vec![e.to_string()],
                );
            }
        };
        if expired.is_empty() {
            return BulkOperationResult::empty("No expired premium accounts found.");
        }

        let mut processed = 0;
        let mut businesses_updated = 0;
        let mut errors = Vec::new();
        for profile in &expired {
            match self
                .entitlement
                .toggle(&EntitlementRequest::revoke(profile.id))
                .await
            {
                Ok(receipt) => {
                    processed += 1;
                    businesses_updated += receipt.businesses_updated;
                }
                Err(e) => errors.push(format!("Profile {}: {}", profile.id, e.user_message())),
            }
        }
        let failed = errors.len();
        let ids: Vec<UserId> = expired.iter().map(|p| p.id).collect();

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                AuditAction::ExpirePremium,
                TargetType::Profile,
                format!("{} profiles", ids.len()),
                json!({
                    "profile_ids": ids,
                    "as_of": now,
                    "processed": processed,
                    "failed": failed,
                    "errors": errors,
                    "businesses_updated": businesses_updated,
                }),
            ))
            .await;
        self.effects.invalidate([PATH_ADMIN_USERS]).await;

        tracing::info!(processed, failed, businesses_updated, "premium expiry sweep finished");
        BulkOperationResult {
            success: true,
            processed,
            failed,
            errors,
            message: summary_message("profiles", processed, failed),
        }
    }

    async fn require_profile(&self, user_id: UserId) -> Result<Profile, AdminError> {
        self.profiles
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AdminError::NotFound("User not found.".into()))
    }
}
