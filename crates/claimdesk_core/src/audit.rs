//! Append-only audit trail of admin mutations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ports::AuditStore;
use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ApproveClaim,
    RejectClaim,
    VerifyPayment,
    RejectPayment,
    ManualPayment,
    GrantedPremium,
    RevokedPremium,
    UpdateRole,
    SuspendUser,
    UnsuspendUser,
    ExpirePremium,
    BulkUpdateReviews,
    BulkDeleteReviews,
    BulkUpdateBusinesses,
    BulkDeleteBusinesses,
    BulkUpdateReviewReports,
    BulkUpdateClaims,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApproveClaim => "approve_claim",
            Self::RejectClaim => "reject_claim",
            Self::VerifyPayment => "verify_payment",
            Self::RejectPayment => "reject_payment",
            Self::ManualPayment => "manual_payment",
            Self::GrantedPremium => "granted_premium",
            Self::RevokedPremium => "revoked_premium",
            Self::UpdateRole => "update_role",
            Self::SuspendUser => "suspend_user",
            Self::UnsuspendUser => "unsuspend_user",
            Self::ExpirePremium => "expire_premium",
            Self::BulkUpdateReviews => "bulk_update_reviews",
            Self::BulkDeleteReviews => "bulk_delete_reviews",
            Self::BulkUpdateBusinesses => "bulk_update_businesses",
            Self::BulkDeleteBusinesses => "bulk_delete_businesses",
            Self::BulkUpdateReviewReports => "bulk_update_review_reports",
            Self::BulkUpdateClaims => "bulk_update_claims",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Claim,
    Payment,
    Profile,
    Review,
    Business,
    ReviewReport,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Payment => "payment",
            Self::Profile => "profile",
            Self::Review => "review",
            Self::Business => "business",
            Self::ReviewReport => "review_report",
        }
    }
}

/// Entry to append. `created_at` is stamped by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub admin_id: UserId,
    pub action: AuditAction,
    pub target_type: TargetType,
    pub target_id: String,
    pub details: serde_json::Value,
}

impl NewAuditEntry {
    pub fn new(
        admin_id: UserId,
        action: AuditAction,
        target_type: TargetType,
        target_id: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            admin_id,
            action,
            target_type,
            target_id: target_id.into(),
            details,
        }
    }
}

#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Appends an entry. A failed append is logged as a consistency gap; the
    /// mutation it describes has already happened.
    pub async fn record(&self, entry: NewAuditEntry) {
        match self.store.append(&entry).await {
            Ok(()) => tracing::debug!(
                action = entry.action.as_str(),
                target_id = %entry.target_id,
                "audit entry recorded"
            ),
            Err(e) => tracing::error!(
                admin_id = %entry.admin_id,
                action = entry.action.as_str(),
                target_id = %entry.target_id,
                error = %e,
                "audit entry could not be written"
            ),
        }
    }
}
