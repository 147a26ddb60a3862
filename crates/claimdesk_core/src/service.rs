//! AdminService: the admin action surface.
//!
//! Every method takes the caller's `Session` explicitly, runs the
//! authorization gate for the permission the action needs, then hands the
//! resulting `AdminContext` to the engine. Single actions return
//! `ActionOutcome` or an `AdminError`; bulk actions always return a
//! `BulkOperationResult`, with authorization failures folded into it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::accounts::AccountAdministration;
use crate::bulk::{denied, BulkOperationRunner};
use crate::claims::ClaimTransitionEngine;
use crate::config::EngineConfig;
use crate::error::AdminError;
use crate::gate::{AdminContext, AuthorizationGate, Session};
use crate::payments::{ManualPayment, PaymentSubmission, PaymentVerificationEngine};
use crate::ports::Ports;
use crate::rbac::Permission;
use crate::types::{
    ActionOutcome, BulkOperationResult, BusinessId, ClaimDecision, ReviewId, Role, Tier, UserId,
};
use crate::writes::{BusinessPatch, ReportResolution, ReviewModeration};

pub type Result<T> = std::result::Result<T, AdminError>;

// ── AdminService trait ────────────────────────────────────────

#[async_trait]
pub trait AdminService: Send + Sync {
    async fn approve_claim(&self, session: Option<&Session>, claim_id: Uuid)
        -> Result<ActionOutcome>;

    async fn reject_claim(
        &self,
        session: Option<&Session>,
        claim_id: Uuid,
        reason: Option<String>,
    ) -> Result<ActionOutcome>;

    /// `identifier` is a payment id or a payment reference.
    async fn verify_payment(
        &self,
        session: Option<&Session>,
        identifier: &str,
        reason: Option<String>,
    ) -> Result<ActionOutcome>;

    async fn reject_payment(
        &self,
        session: Option<&Session>,
        identifier: &str,
        reason: Option<String>,
    ) -> Result<ActionOutcome>;

    async fn add_manual_payment(
        &self,
        session: Option<&Session>,
        payment: ManualPayment,
    ) -> Result<ActionOutcome>;

    /// User-facing; needs a session but no admin role.
    async fn submit_payment(
        &self,
        session: Option<&Session>,
        submission: PaymentSubmission,
    ) -> Result<ActionOutcome>;

    async fn bulk_update_reviews(
        &self,
        session: Option<&Session>,
        ids: &[ReviewId],
        moderation: &ReviewModeration,
    ) -> BulkOperationResult;

    async fn bulk_delete_reviews(
        &self,
        session: Option<&Session>,
        ids: &[ReviewId],
    ) -> BulkOperationResult;

    async fn bulk_update_businesses(
        &self,
        session: Option<&Session>,
        ids: &[BusinessId],
        patch: &BusinessPatch,
    ) -> BulkOperationResult;

    async fn bulk_delete_businesses(
        &self,
        session: Option<&Session>,
        ids: &[BusinessId],
    ) -> BulkOperationResult;

    async fn bulk_update_review_reports(
        &self,
        session: Option<&Session>,
        ids: &[Uuid],
        resolution: ReportResolution,
    ) -> BulkOperationResult;

    async fn bulk_update_claims(
        &self,
        session: Option<&Session>,
        ids: &[Uuid],
        decision: ClaimDecision,
        reason: Option<String>,
    ) -> BulkOperationResult;

    async fn toggle_premium(
        &self,
        session: Option<&Session>,
        user_id: UserId,
        tier: Tier,
        period_months: Option<u32>,
    ) -> Result<ActionOutcome>;

    async fn change_user_role(
        &self,
        session: Option<&Session>,
        user_id: UserId,
        role: Role,
    ) -> Result<ActionOutcome>;

    async fn set_user_suspension(
        &self,
        session: Option<&Session>,
        user_id: UserId,
        suspend: bool,
    ) -> Result<ActionOutcome>;

    async fn expire_premium_accounts(
        &self,
        session: Option<&Session>,
        now: DateTime<Utc>,
    ) -> BulkOperationResult;
}

// ── AdminServiceImpl ──────────────────────────────────────────

pub struct AdminServiceImpl {
    gate: AuthorizationGate,
    claims: ClaimTransitionEngine,
    payments: PaymentVerificationEngine,
    bulk: BulkOperationRunner,
    accounts: AccountAdministration,
}

impl AdminServiceImpl {
    pub fn new(ports: Ports, config: EngineConfig) -> Self {
        let claims = ClaimTransitionEngine::new(&ports, &config);
        Self {
            gate: AuthorizationGate::new(ports.profiles.clone()),
            payments: PaymentVerificationEngine::new(&ports, &config),
            bulk: BulkOperationRunner::new(&ports, claims.clone()),
            accounts: AccountAdministration::new(&ports),
            claims,
        }
    }

    async fn authorize(
        &self,
        session: Option<&Session>,
        permission: Permission,
    ) -> Result<AdminContext> {
        self.gate.authorize(session, permission).await.inspect_err(|e| {
            tracing::debug!(permission = permission.key(), error = %e, "admin action refused");
        })
    }

    /// Authorization for bulk runs: a refusal becomes a failed result.
    async fn authorize_bulk(
        &self,
        session: Option<&Session>,
        permission: Permission,
    ) -> std::result::Result<AdminContext, BulkOperationResult> {
        self.authorize(session, permission).await.map_err(denied)
    }
}

#[async_trait]
impl AdminService for AdminServiceImpl {
    async fn approve_claim(
        &self,
        session: Option<&Session>,
        claim_id: Uuid,
    ) -> Result<ActionOutcome> {
        let ctx = self.authorize(session, Permission::ClaimReview).await?;
        let outcome = self.claims.approve(&ctx, claim_id).await?;
        Ok(ActionOutcome::success(outcome.message()))
    }

    async fn reject_claim(
        &self,
        session: Option<&Session>,
        claim_id: Uuid,
        reason: Option<String>,
    ) -> Result<ActionOutcome> {
        let ctx = self.authorize(session, Permission::ClaimReview).await?;
        let outcome = self.claims.reject(&ctx, claim_id, reason).await?;
        Ok(ActionOutcome::success(outcome.message()))
    }

    async fn verify_payment(
        &self,
        session: Option<&Session>,
        identifier: &str,
        reason: Option<String>,
    ) -> Result<ActionOutcome> {
        let ctx = self.authorize(session, Permission::PaymentVerify).await?;
        let outcome = self.payments.verify(&ctx, identifier, reason).await?;
        Ok(ActionOutcome::success(outcome.message))
    }

    async fn reject_payment(
        &self,
        session: Option<&Session>,
        identifier: &str,
        reason: Option<String>,
    ) -> Result<ActionOutcome> {
        let ctx = self.authorize(session, Permission::PaymentVerify).await?;
        let outcome = self.payments.reject(&ctx, identifier, reason).await?;
        Ok(ActionOutcome::success(outcome.message))
    }

    async fn add_manual_payment(
        &self,
        session: Option<&Session>,
        payment: ManualPayment,
    ) -> Result<ActionOutcome> {
        let ctx = self.authorize(session, Permission::PaymentVerify).await?;
        let outcome = self.payments.add_manual_payment(&ctx, payment).await?;
        Ok(ActionOutcome::success(outcome.message))
    }

    async fn submit_payment(
        &self,
        session: Option<&Session>,
        submission: PaymentSubmission,
    ) -> Result<ActionOutcome> {
        let outcome = self.payments.submit_payment(session, submission).await?;
        Ok(ActionOutcome::success(outcome.message))
    }

    async fn bulk_update_reviews(
        &self,
        session: Option<&Session>,
        ids: &[ReviewId],
        moderation: &ReviewModeration,
    ) -> BulkOperationResult {
        match self.authorize_bulk(session, Permission::ReviewBulk).await {
            Ok(ctx) => self.bulk.update_reviews(&ctx, ids, moderation).await,
            Err(refused) => refused,
        }
    }

    async fn bulk_delete_reviews(
        &self,
        session: Option<&Session>,
        ids: &[ReviewId],
    ) -> BulkOperationResult {
        match self.authorize_bulk(session, Permission::ReviewBulk).await {
            Ok(ctx) => self.bulk.delete_reviews(&ctx, ids).await,
            Err(refused) => refused,
        }
    }

    async fn bulk_update_businesses(
        &self,
        session: Option<&Session>,
        ids: &[BusinessId],
        patch: &BusinessPatch,
    ) -> BulkOperationResult {
        match self.authorize_bulk(session, Permission::BusinessBulk).await {
            Ok(ctx) => self.bulk.update_businesses(&ctx, ids, patch).await,
            Err(refused) => refused,
        }
    }

    async fn bulk_delete_businesses(
        &self,
        session: Option<&Session>,
        ids: &[BusinessId],
    ) -> BulkOperationResult {
        match self.authorize_bulk(session, Permission::BusinessDelete).await {
            Ok(ctx) => self.bulk.delete_businesses(&ctx, ids).await,
            Err(refused) => refused,
        }
    }

    async fn bulk_update_review_reports(
        &self,
        session: Option<&Session>,
        ids: &[Uuid],
        resolution: ReportResolution,
    ) -> BulkOperationResult {
        match self.authorize_bulk(session, Permission::ReportBulk).await {
            Ok(ctx) => self.bulk.update_review_reports(&ctx, ids, resolution).await,
            Err(refused) => refused,
        }
    }

    async fn bulk_update_claims(
        &self,
        session: Option<&Session>,
        ids: &[Uuid],
        decision: ClaimDecision,
        reason: Option<String>,
    ) -> BulkOperationResult {
        match self.authorize_bulk(session, Permission::ClaimBulk).await {
            Ok(ctx) => self.bulk.update_claims(&ctx, ids, decision, reason).await,
            Err(refused) => refused,
        }
    }

    async fn toggle_premium(
        &self,
        session: Option<&Session>,
        user_id: UserId,
        tier: Tier,
        period_months: Option<u32>,
    ) -> Result<ActionOutcome> {
        let ctx = self.authorize(session, Permission::PremiumManage).await?;
        let message = self
            .accounts
            .toggle_premium(&ctx, user_id, tier, period_months)
            .await?;
        Ok(ActionOutcome::success(message))
    }

    async fn change_user_role(
        &self,
        session: Option<&Session>,
        user_id: UserId,
        role: Role,
    ) -> Result<ActionOutcome> {
        let ctx = self.authorize(session, Permission::UserRoleManage).await?;
        let message = self.accounts.change_user_role(&ctx, user_id, role).await?;
        Ok(ActionOutcome::success(message))
    }

    async fn set_user_suspension(
        &self,
        session: Option<&Session>,
        user_id: UserId,
        suspend: bool,
    ) -> Result<ActionOutcome> {
        let ctx = self.authorize(session, Permission::UserSuspend).await?;
        let message = self
            .accounts
            .set_user_suspension(&ctx, user_id, suspend)
            .await?;
        Ok(ActionOutcome::success(message))
    }

    async fn expire_premium_accounts(
        &self,
        session: Option<&Session>,
        now: DateTime<Utc>,
    ) -> BulkOperationResult {
        match self.authorize_bulk(session, Permission::PremiumManage).await {
            Ok(ctx) => self.accounts.expire_premium_accounts(&ctx, now).await,
            Err(refused) => refused,
        }
    }
}
