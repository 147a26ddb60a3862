//! Storage and collaborator port traits.
//! Implemented by claimdesk_postgres and by the in-memory backend; the engines
//! depend only on these traits.
//!
//! Single-row reads return `Ok(None)` when nothing matches, except the payment
//! lookups, which surface "no rows" and "invalid id" as classified
//! `StoreError`s so the dual-key resolver can fall back on them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::audit::NewAuditEntry;
use crate::entitlement::{EntitlementReceipt, EntitlementRequest};
use crate::error::{SideEffectError, StoreError};
use crate::rbac::AdminAccess;
use crate::side_effects::{Email, Notification};
use crate::types::{
    Business, BusinessId, Claim, Payment, Profile, RequestedUpdates, ReviewId, Role, UserId,
};
use crate::writes::{
    BusinessPatch, ClaimReviewWrite, ModerationStamp, NewPayment, PaymentStatusWrite,
    ReportResolution, ReviewModeration,
};

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>>;

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>>;

    /// Role plus the fine-grained admin columns. Fails with a missing-column
    /// error when the store does not know `admin_access_level` or
    /// `admin_permissions` yet.
    async fn admin_access(&self, user_id: UserId) -> Result<Option<AdminAccess>>;

    /// Sets the primary business and role in one row write.
    /// Returns the number of rows affected.
    async fn assign_primary_business(
        &self,
        user_id: UserId,
        business_id: &str,
        role: Role,
    ) -> Result<u64>;

    async fn set_role(&self, user_id: UserId, role: Role) -> Result<u64>;

    async fn set_suspension(&self, user_id: UserId, suspended: bool) -> Result<u64>;

    /// Profiles on a paid tier (or the legacy premium flag) whose premium
    /// expiry is strictly before `now`.
    async fn list_expired_premium(&self, now: DateTime<Utc>) -> Result<Vec<Profile>>;
}

#[async_trait]
pub trait BusinessStore: Send + Sync {
    async fn get_business(&self, business_id: &str) -> Result<Option<Business>>;

    /// Sets the owner only when the business is unowned or already owned by
    /// `user_id`. Zero rows means another owner won.
    async fn set_owner_if_unclaimed(&self, business_id: &str, user_id: UserId) -> Result<u64>;

    async fn apply_requested_updates(
        &self,
        business_id: &str,
        updates: &RequestedUpdates,
    ) -> Result<u64>;

    /// Single set-based update. Returns the ids actually updated.
    async fn bulk_update(
        &self,
        ids: &[BusinessId],
        patch: &BusinessPatch,
    ) -> Result<Vec<BusinessId>>;

    async fn bulk_soft_delete(
        &self,
        ids: &[BusinessId],
        stamp: &ModerationStamp,
    ) -> Result<Vec<BusinessId>>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn business_ids_for_user(&self, user_id: UserId) -> Result<Vec<BusinessId>>;
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn get_claim(&self, claim_id: Uuid) -> Result<Option<Claim>>;

    async fn approved_business_ids_for_user(&self, user_id: UserId) -> Result<Vec<BusinessId>>;

    /// Final status write, applied only while the claim is still pending.
    /// Zero rows means another reviewer got there first.
    async fn write_review(&self, claim_id: Uuid, write: &ClaimReviewWrite) -> Result<u64>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Lookup by primary key. A malformed id is an `InvalidId` error and a
    /// miss is a `NoRows` error.
    async fn get_payment_by_id(&self, id: &str) -> Result<Payment>;

    /// Lookup by the human-entered reference. A miss is a `NoRows` error.
    async fn get_payment_by_reference(&self, reference: &str) -> Result<Payment>;

    async fn has_pending_payment(&self, user_id: UserId) -> Result<bool>;

    /// Status transition applied only while the payment is still pending.
    async fn update_payment_status(&self, id: Uuid, write: &PaymentStatusWrite) -> Result<u64>;

    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn bulk_moderate(
        &self,
        ids: &[ReviewId],
        moderation: &ReviewModeration,
        stamp: Option<&ModerationStamp>,
    ) -> Result<Vec<ReviewId>>;

    async fn bulk_soft_delete(
        &self,
        ids: &[ReviewId],
        stamp: &ModerationStamp,
    ) -> Result<Vec<ReviewId>>;

    async fn bulk_set_report_status(
        &self,
        ids: &[Uuid],
        resolution: ReportResolution,
        at: DateTime<Utc>,
    ) -> Result<Vec<Uuid>>;
}

/// The single atomic entitlement procedure.
#[async_trait]
pub trait EntitlementProcedure: Send + Sync {
    async fn toggle_user_premium(&self, request: &EntitlementRequest)
        -> Result<EntitlementReceipt>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &NewAuditEntry) -> Result<()>;
}

// ── Side-effect collaborators ─────────────────────────────────

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> std::result::Result<(), SideEffectError>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> std::result::Result<(), SideEffectError>;
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, path: &str) -> std::result::Result<(), SideEffectError>;
}

/// Every port the engines need, bundled for construction.
#[derive(Clone)]
pub struct Ports {
    pub profiles: Arc<dyn ProfileStore>,
    pub businesses: Arc<dyn BusinessStore>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub claims: Arc<dyn ClaimStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub entitlements: Arc<dyn EntitlementProcedure>,
    pub audit: Arc<dyn AuditStore>,
    pub notifier: Arc<dyn Notifier>,
    pub mailer: Arc<dyn Mailer>,
    pub cache: Arc<dyn CacheInvalidator>,
}

impl Ports {
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
