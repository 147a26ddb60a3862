//! Write payloads handed to the store ports.
//!
//! Payloads that may hit schema drift implement [`DriftTolerant`]; their
//! drift-prone columns are [`Column`]s so an adapter only names the columns
//! that are still written.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema_drift::{Column, DriftTolerant};
use crate::types::{
    BusinessId, BusinessStatus, ClaimDecision, ClaimStatus, PaymentStatus, ReportStatus,
    ReviewStatus, Tier, UserId,
};

// ── Claims ────────────────────────────────────────────────────

/// Final status write on a claim. Always conditional on `status = pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimReviewWrite {
    pub status: ClaimStatus,
    pub reviewed_at: Column<DateTime<Utc>>,
    pub reviewed_by: Column<UserId>,
    pub rejection_reason: Column<Option<String>>,
    pub admin_notes: Column<Option<String>>,
    /// Whether drift-prone columns may be shed on a schema-cache miss.
    pub resilient: bool,
}

const CLAIM_OPTIONAL_COLUMNS: &[&str] = &["reviewed_by", "rejection_reason", "reviewed_at"];

impl ClaimReviewWrite {
    pub fn new(
        decision: ClaimDecision,
        reviewer: UserId,
        at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Self {
        let reason = match decision {
            ClaimDecision::Approved => None,
            ClaimDecision::Rejected => reason.filter(|r| !r.trim().is_empty()),
        };
        Self {
            status: decision.status(),
            reviewed_at: Column::Write(at),
            reviewed_by: Column::Write(reviewer),
            rejection_reason: Column::Write(reason),
            admin_notes: Column::Omitted,
            resilient: false,
        }
    }

    pub fn resilient(mut self) -> Self {
        self.resilient = true;
        self
    }
}

impl DriftTolerant for ClaimReviewWrite {
    fn table(&self) -> &'static str {
        "business_claims"
    }

    fn optional_columns(&self) -> &'static [&'static str] {
        if self.resilient {
            CLAIM_OPTIONAL_COLUMNS
        } else {
            &[]
        }
    }

    fn strip_column(&mut self, column: &str) -> bool {
        if !self.resilient {
            return false;
        }
        match column {
            "reviewed_by" => self.reviewed_by.omit(),
            "reviewed_at" => self.reviewed_at.omit(),
            "rejection_reason" => {
                // The reason survives in admin_notes.
                if let Column::Write(reason) = std::mem::take(&mut self.rejection_reason) {
                    if reason.is_some() {
                        self.admin_notes = Column::Write(reason);
                    }
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }
}

// ── Payments ──────────────────────────────────────────────────

/// Status transition on a pending payment. Conditional on `status = pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentStatusWrite {
    pub status: PaymentStatus,
    pub verified_by: UserId,
    pub verified_at: DateTime<Utc>,
    pub notes: Column<Option<String>>,
    pub expires_at: Column<DateTime<Utc>>,
}

impl PaymentStatusWrite {
    pub fn verified(by: UserId, at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            status: PaymentStatus::Verified,
            verified_by: by,
            verified_at: at,
            notes: Column::Omitted,
            expires_at: Column::Write(expires_at),
        }
    }

    pub fn rejected(by: UserId, at: DateTime<Utc>, reason: Option<String>) -> Self {
        Self {
            status: PaymentStatus::Rejected,
            verified_by: by,
            verified_at: at,
            notes: Column::Write(reason),
            expires_at: Column::Omitted,
        }
    }
}

impl DriftTolerant for PaymentStatusWrite {
    fn table(&self) -> &'static str {
        "premium_payments"
    }

    fn optional_columns(&self) -> &'static [&'static str] {
        &["expires_at"]
    }

    fn strip_column(&mut self, column: &str) -> bool {
        match column {
            "expires_at" => self.expires_at.omit(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub id: Uuid,
    pub user_id: UserId,
    pub business_id: Option<BusinessId>,
    pub reference: String,
    pub method: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub target_tier: Tier,
    pub notes: Option<String>,
    pub expires_at: Column<DateTime<Utc>>,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl DriftTolerant for NewPayment {
    fn table(&self) -> &'static str {
        "premium_payments"
    }

    fn optional_columns(&self) -> &'static [&'static str] {
        &["expires_at"]
    }

    fn strip_column(&mut self, column: &str) -> bool {
        match column {
            "expires_at" => self.expires_at.omit(),
            _ => false,
        }
    }
}

// ── Bulk patches ──────────────────────────────────────────────

/// Fields accepted by the bulk business update. Premium state is not one of
/// them: it only changes through the entitlement procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusinessPatch {
    pub status: Option<BusinessStatus>,
    #[serde(alias = "featured")]
    pub is_featured: Option<bool>,
}

impl BusinessPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.is_featured.is_none()
    }
}

/// Bulk review moderation. A reason also stamps the moderator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewModeration {
    pub status: ReviewStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModerationStamp {
    pub by: UserId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportResolution {
    Resolved,
    Dismissed,
}

impl ReportResolution {
    pub fn status(&self) -> ReportStatus {
        match self {
            Self::Resolved => ReportStatus::Resolved,
            Self::Dismissed => ReportStatus::Dismissed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_clears_rejection_reason() {
        let w = ClaimReviewWrite::new(
            ClaimDecision::Approved,
            Uuid::new_v4(),
            Utc::now(),
            Some("ignored".into()),
        );
        assert_eq!(w.status, ClaimStatus::Approved);
        assert_eq!(w.rejection_reason, Column::Write(None));
    }

    #[test]
    fn strict_claim_write_sheds_nothing() {
        let mut w = ClaimReviewWrite::new(ClaimDecision::Rejected, Uuid::new_v4(), Utc::now(), None);
        assert!(w.optional_columns().is_empty());
        assert!(!w.strip_column("reviewed_by"));
        assert!(w.reviewed_by.is_written());
    }

    #[test]
    fn stripping_rejection_reason_moves_it_to_admin_notes() {
        let mut w = ClaimReviewWrite::new(
            ClaimDecision::Rejected,
            Uuid::new_v4(),
            Utc::now(),
            Some("documents illegible".into()),
        )
        .resilient();
        assert!(w.strip_column("rejection_reason"));
        assert_eq!(w.rejection_reason, Column::Omitted);
        assert_eq!(
            w.admin_notes,
            Column::Write(Some("documents illegible".to_string()))
        );
        assert!(!w.strip_column("rejection_reason"));
        assert!(!w.strip_column("status"));
    }

    #[test]
    fn blank_rejection_reason_is_null() {
        let w = ClaimReviewWrite::new(
            ClaimDecision::Rejected,
            Uuid::new_v4(),
            Utc::now(),
            Some("   ".into()),
        );
        assert_eq!(w.rejection_reason, Column::Write(None));
    }

    #[test]
    fn business_patch_rejects_premium_field() {
        let err = serde_json::from_value::<BusinessPatch>(serde_json::json!({
            "status": "suspended",
            "is_premium": true
        }));
        assert!(err.is_err());

        let ok: BusinessPatch =
            serde_json::from_value(serde_json::json!({ "featured": true })).unwrap();
        assert_eq!(ok.is_featured, Some(true));
    }
}
