//! In-memory backend implementing every port.
//!
//! Used by the test suites and by the server when no database URL is
//! configured. State lives behind one `tokio::sync::RwLock`; the entitlement
//! procedure stages its changes on a copy and commits them in one swap, so it
//! is all-or-nothing like the stored procedure it stands in for.
//!
//! A [`FaultPlan`] injects the failures the engines have to survive: columns
//! missing from the schema cache, an entitlement call dying half-way,
//! failing side effects, failing batch statements.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::NewAuditEntry;
use crate::entitlement::{EntitlementReceipt, EntitlementRequest};
use crate::error::{SideEffectError, StoreError};
use crate::ports::{
    AssignmentStore, AuditStore, BusinessStore, CacheInvalidator, ClaimStore,
    EntitlementProcedure, Mailer, Notifier, PaymentStore, Ports, ProfileStore, ReviewStore,
    Result,
};
use crate::rbac::AdminAccess;
use crate::side_effects::{Email, Notification};
use crate::types::{
    Assignment, AuditLogEntry, Business, BusinessId, BusinessStatus, Claim, ClaimStatus, Payment,
    PaymentStatus, Profile, RequestedUpdates, Review, ReviewId, ReviewReport, ReviewStatus, Role,
    UserId,
};
use crate::writes::{
    BusinessPatch, ClaimReviewWrite, ModerationStamp, NewPayment, PaymentStatusWrite,
    ReportResolution, ReviewModeration,
};

// ── Faults ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    missing_columns: HashSet<(String, String)>,
    entitlement_fail_after: Option<usize>,
    entitlement_reject: Option<String>,
    fail_side_effects: bool,
    fail_batch_writes: bool,
    fail_audit: bool,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// The schema cache does not know `table.column`.
    pub fn missing_column(mut self, table: &str, column: &str) -> Self {
        self.missing_columns
            .insert((table.to_string(), column.to_string()));
        self
    }

    /// The entitlement procedure dies after updating `n` businesses.
    pub fn entitlement_fails_after(mut self, n: usize) -> Self {
        self.entitlement_fail_after = Some(n);
        self
    }

    /// The entitlement procedure answers `success = false`.
    pub fn entitlement_rejects(mut self, reason: &str) -> Self {
        self.entitlement_reject = Some(reason.to_string());
        self
    }

    pub fn failing_side_effects(mut self) -> Self {
        self.fail_side_effects = true;
        self
    }

    pub fn failing_batch_writes(mut self) -> Self {
        self.fail_batch_writes = true;
        self
    }

    pub fn failing_audit(mut self) -> Self {
        self.fail_audit = true;
        self
    }

    fn check_columns(&self, table: &'static str, columns: &[&'static str]) -> Result<()> {
        match columns
            .iter()
            .find(|c| self.missing_columns.contains(&(table.to_string(), c.to_string())))
        {
            Some(column) => Err(StoreError::missing_column(table, column)),
            None => Ok(()),
        }
    }
}

/// Columns named by one write statement, in the order they were attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAttempt {
    pub table: &'static str,
    pub columns: Vec<&'static str>,
}

// ── State ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct State {
    profiles: HashMap<UserId, Profile>,
    admin_levels: HashMap<UserId, (Option<String>, Vec<String>)>,
    businesses: HashMap<BusinessId, Business>,
    business_deletions: HashMap<BusinessId, ModerationStamp>,
    assignments: Vec<Assignment>,
    claims: HashMap<Uuid, Claim>,
    payments: HashMap<Uuid, Payment>,
    reviews: HashMap<ReviewId, Review>,
    reports: HashMap<Uuid, ReviewReport>,
    audit: Vec<AuditLogEntry>,
    notifications: Vec<Notification>,
    emails: Vec<Email>,
    invalidated: Vec<String>,
    write_attempts: Vec<WriteAttempt>,
    entitlement_calls: Vec<EntitlementRequest>,
    faults: FaultPlan,
}

impl State {
    fn attempt(&mut self, table: &'static str, columns: Vec<&'static str>) -> Result<()> {
        let checked = self.faults.check_columns(table, &columns);
        self.write_attempts.push(WriteAttempt { table, columns });
        checked
    }

    fn batch_guard(&self, table: &str) -> Result<()> {
        if self.faults.fail_batch_writes {
            return Err(StoreError::backend(format!(
                "canceling statement due to statement timeout on {table}"
            )));
        }
        Ok(())
    }

    /// Owner column ∪ primary business ∪ assignments, existing rows only.
    fn owned_business_ids(&self, user_id: UserId) -> BTreeSet<BusinessId> {
        let mut ids: BTreeSet<BusinessId> = self
            .businesses
            .values()
            .filter(|b| b.owner_user_id == Some(user_id))
            .map(|b| b.id.clone())
            .collect();
        if let Some(primary) = self.profiles.get(&user_id).and_then(|p| p.business_id.clone()) {
            ids.insert(primary);
        }
        ids.extend(
            self.assignments
                .iter()
                .filter(|a| a.user_id == user_id)
                .map(|a| a.business_id.clone()),
        );
        ids.retain(|id| self.businesses.contains_key(id));
        ids
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every port backed by this store.
    pub fn ports(self: &Arc<Self>) -> Ports {
        Ports {
            profiles: self.clone(),
            businesses: self.clone(),
            assignments: self.clone(),
            claims: self.clone(),
            payments: self.clone(),
            reviews: self.clone(),
            entitlements: self.clone(),
            audit: self.clone(),
            notifier: self.clone(),
            mailer: self.clone(),
            cache: self.clone(),
        }
    }

    pub async fn set_faults(&self, faults: FaultPlan) {
        self.state.write().await.faults = faults;
    }

    // ── Seeding ───────────────────────────────────────────────

    pub async fn insert_profile(&self, profile: Profile) {
        self.state.write().await.profiles.insert(profile.id, profile);
    }

    pub async fn set_admin_access(&self, user_id: UserId, level: Option<&str>, extra: &[&str]) {
        self.state.write().await.admin_levels.insert(
            user_id,
            (
                level.map(str::to_string),
                extra.iter().map(|s| s.to_string()).collect(),
            ),
        );
    }

    pub async fn insert_business(&self, business: Business) {
        self.state
            .write()
            .await
            .businesses
            .insert(business.id.clone(), business);
    }

    pub async fn insert_assignment(&self, assignment: Assignment) {
        self.state.write().await.assignments.push(assignment);
    }

    pub async fn insert_claim(&self, claim: Claim) {
        self.state.write().await.claims.insert(claim.id, claim);
    }

    pub async fn insert_payment_row(&self, payment: Payment) {
        self.state.write().await.payments.insert(payment.id, payment);
    }

    pub async fn insert_review(&self, review: Review) {
        self.state.write().await.reviews.insert(review.id, review);
    }

    pub async fn insert_report(&self, report: ReviewReport) {
        self.state.write().await.reports.insert(report.id, report);
    }

    // ── Inspection ────────────────────────────────────────────

    pub async fn profile(&self, id: UserId) -> Option<Profile> {
        self.state.read().await.profiles.get(&id).cloned()
    }

    pub async fn business(&self, id: &str) -> Option<Business> {
        self.state.read().await.businesses.get(id).cloned()
    }

    pub async fn claim(&self, id: Uuid) -> Option<Claim> {
        self.state.read().await.claims.get(&id).cloned()
    }

    pub async fn payment(&self, id: Uuid) -> Option<Payment> {
        self.state.read().await.payments.get(&id).cloned()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.read().await.payments.values().cloned().collect()
    }

    pub async fn review(&self, id: ReviewId) -> Option<Review> {
        self.state.read().await.reviews.get(&id).cloned()
    }

    pub async fn report(&self, id: Uuid) -> Option<ReviewReport> {
        self.state.read().await.reports.get(&id).cloned()
    }

    pub async fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.state.read().await.audit.clone()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }

    pub async fn emails(&self) -> Vec<Email> {
        self.state.read().await.emails.clone()
    }

    pub async fn invalidated_paths(&self) -> Vec<String> {
        self.state.read().await.invalidated.clone()
    }

    pub async fn write_attempts(&self, table: &str) -> Vec<WriteAttempt> {
        self.state
            .read()
            .await
            .write_attempts
            .iter()
            .filter(|a| a.table == table)
            .cloned()
            .collect()
    }

    pub async fn entitlement_calls(&self) -> Vec<EntitlementRequest> {
        self.state.read().await.entitlement_calls.clone()
    }
}

// ── Stores ────────────────────────────────────────────────────

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        Ok(self.state.read().await.profiles.get(&user_id).cloned())
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .values()
            .find(|p| {
                p.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn admin_access(&self, user_id: UserId) -> Result<Option<AdminAccess>> {
        let state = self.state.read().await;
        state
            .faults
            .check_columns("profiles", &["admin_access_level", "admin_permissions"])?;
        let Some(profile) = state.profiles.get(&user_id) else {
            return Ok(None);
        };
        let (level, extra) = state.admin_levels.get(&user_id).cloned().unwrap_or_default();
        Ok(Some(AdminAccess {
            role: Some(profile.role),
            access_level: level,
            extra_permissions: extra,
        }))
    }

    async fn assign_primary_business(
        &self,
        user_id: UserId,
        business_id: &str,
        role: Role,
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        state.attempt("profiles", vec!["business_id", "role"])?;
        match state.profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.business_id = Some(business_id.to_string());
                profile.role = role;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn set_role(&self, user_id: UserId, role: Role) -> Result<u64> {
        let mut state = self.state.write().await;
        state.attempt("profiles", vec!["role"])?;
        match state.profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.role = role;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn set_suspension(&self, user_id: UserId, suspended: bool) -> Result<u64> {
        let mut state = self.state.write().await;
        state.attempt("profiles", vec!["suspended", "suspended_at"])?;
        match state.profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.suspended = suspended;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_expired_premium(&self, now: DateTime<Utc>) -> Result<Vec<Profile>> {
        let state = self.state.read().await;
        let mut expired: Vec<Profile> = state
            .profiles
            .values()
            .filter(|p| p.tier.is_some_and(|t| t.is_paid()) || p.is_premium)
            .filter(|p| p.premium_expires_at.is_some_and(|at| at < now))
            .cloned()
            .collect();
        expired.sort_by_key(|p| p.id);
        Ok(expired)
    }
}

#[async_trait]
impl BusinessStore for MemoryStore {
    async fn get_business(&self, business_id: &str) -> Result<Option<Business>> {
        Ok(self.state.read().await.businesses.get(business_id).cloned())
    }

    async fn set_owner_if_unclaimed(&self, business_id: &str, user_id: UserId) -> Result<u64> {
        let mut state = self.state.write().await;
        state.attempt("businesses", vec!["user_id"])?;
        match state.businesses.get_mut(business_id) {
            Some(b) if b.owner_user_id.is_none() || b.owner_user_id == Some(user_id) => {
                b.owner_user_id = Some(user_id);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn apply_requested_updates(
        &self,
        business_id: &str,
        updates: &RequestedUpdates,
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut columns = Vec::new();
        for (column, present) in [
            ("name", updates.name.is_some()),
            ("description", updates.description.is_some()),
            ("phone", updates.phone.is_some()),
            ("website", updates.website.is_some()),
            ("address", updates.address.is_some()),
            ("city", updates.city.is_some()),
        ] {
            if present {
                columns.push(column);
            }
        }
        state.attempt("businesses", columns)?;
        let Some(b) = state.businesses.get_mut(business_id) else {
            return Ok(0);
        };
        if let Some(v) = &updates.name {
            b.name = v.clone();
        }
        if let Some(v) = &updates.description {
            b.description = Some(v.clone());
        }
        if let Some(v) = &updates.phone {
            b.phone = Some(v.clone());
        }
        if let Some(v) = &updates.website {
            b.website = Some(v.clone());
        }
        if let Some(v) = &updates.address {
            b.address = Some(v.clone());
        }
        if let Some(v) = &updates.city {
            b.city = Some(v.clone());
        }
        Ok(1)
    }

    async fn bulk_update(
        &self,
        ids: &[BusinessId],
        patch: &BusinessPatch,
    ) -> Result<Vec<BusinessId>> {
        let mut state = self.state.write().await;
        state.batch_guard("businesses")?;
        let mut affected = Vec::new();
        for id in ids {
            if let Some(b) = state.businesses.get_mut(id) {
                if let Some(status) = patch.status {
                    b.status = status;
                }
                if let Some(featured) = patch.is_featured {
                    b.is_featured = featured;
                }
                affected.push(id.clone());
            }
        }
        Ok(affected)
    }

    async fn bulk_soft_delete(
        &self,
        ids: &[BusinessId],
        stamp: &ModerationStamp,
    ) -> Result<Vec<BusinessId>> {
        let mut state = self.state.write().await;
        state.batch_guard("businesses")?;
        let mut affected = Vec::new();
        for id in ids {
            if let Some(b) = state.businesses.get_mut(id) {
                b.status = BusinessStatus::Deleted;
                affected.push(id.clone());
            }
        }
        for id in &affected {
            state.business_deletions.insert(id.clone(), stamp.clone());
        }
        Ok(affected)
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn business_ids_for_user(&self, user_id: UserId) -> Result<Vec<BusinessId>> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.business_id.clone())
            .collect())
    }
}

#[async_trait]
impl ClaimStore for MemoryStore {
    async fn get_claim(&self, claim_id: Uuid) -> Result<Option<Claim>> {
        Ok(self.state.read().await.claims.get(&claim_id).cloned())
    }

    async fn approved_business_ids_for_user(&self, user_id: UserId) -> Result<Vec<BusinessId>> {
        Ok(self
            .state
            .read()
            .await
            .claims
            .values()
            .filter(|c| c.user_id == Some(user_id) && c.status == ClaimStatus::Approved)
            .map(|c| c.business_id.clone())
            .collect())
    }

    async fn write_review(&self, claim_id: Uuid, write: &ClaimReviewWrite) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut columns = vec!["status"];
        if write.reviewed_at.is_written() {
            columns.push("reviewed_at");
        }
        if write.reviewed_by.is_written() {
            columns.push("reviewed_by");
        }
        if write.rejection_reason.is_written() {
            columns.push("rejection_reason");
        }
        if write.admin_notes.is_written() {
            columns.push("admin_notes");
        }
        state.attempt("business_claims", columns)?;

        match state.claims.get_mut(&claim_id) {
            Some(claim) if claim.status == ClaimStatus::Pending => {
                claim.status = write.status;
                if let Some(at) = write.reviewed_at.as_written() {
                    claim.reviewed_at = Some(*at);
                }
                if let Some(by) = write.reviewed_by.as_written() {
                    claim.reviewed_by = Some(*by);
                }
                if let Some(reason) = write.rejection_reason.as_written() {
                    claim.rejection_reason = reason.clone();
                }
                if let Some(notes) = write.admin_notes.as_written() {
                    claim.admin_notes = notes.clone();
                }
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn get_payment_by_id(&self, id: &str) -> Result<Payment> {
        let parsed = Uuid::parse_str(id).map_err(|_| StoreError::invalid_id(id))?;
        self.state
            .read()
            .await
            .payments
            .get(&parsed)
            .cloned()
            .ok_or_else(|| StoreError::no_rows("premium_payments"))
    }

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Payment> {
        self.state
            .read()
            .await
            .payments
            .values()
            .find(|p| p.reference == reference)
            .cloned()
            .ok_or_else(|| StoreError::no_rows("premium_payments"))
    }

    async fn has_pending_payment(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .payments
            .values()
            .any(|p| p.user_id == user_id && p.status == PaymentStatus::Pending))
    }

    async fn update_payment_status(&self, id: Uuid, write: &PaymentStatusWrite) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut columns = vec!["status", "verified_by", "verified_at"];
        if write.notes.is_written() {
            columns.push("notes");
        }
        if write.expires_at.is_written() {
            columns.push("expires_at");
        }
        state.attempt("premium_payments", columns)?;

        match state.payments.get_mut(&id) {
            Some(p) if p.status == PaymentStatus::Pending => {
                p.status = write.status;
                p.verified_by = Some(write.verified_by);
                p.verified_at = Some(write.verified_at);
                if let Some(notes) = write.notes.as_written() {
                    p.notes = notes.clone();
                }
                if let Some(expires_at) = write.expires_at.as_written() {
                    p.expires_at = Some(*expires_at);
                }
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment> {
        let mut state = self.state.write().await;
        let mut columns = vec![
            "id",
            "user_id",
            "business_id",
            "payment_reference",
            "payment_method",
            "amount_usd",
            "status",
            "target_tier",
            "notes",
            "verified_by",
            "verified_at",
        ];
        if payment.expires_at.is_written() {
            columns.push("expires_at");
        }
        state.attempt("premium_payments", columns)?;

        let row = Payment {
            id: payment.id,
            user_id: payment.user_id,
            business_id: payment.business_id.clone(),
            reference: payment.reference.clone(),
            method: payment.method.clone(),
            amount: payment.amount,
            status: payment.status,
            target_tier: payment.target_tier,
            notes: payment.notes.clone(),
            expires_at: payment.expires_at.as_written().copied(),
            verified_by: payment.verified_by,
            verified_at: payment.verified_at,
        };
        state.payments.insert(row.id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn bulk_moderate(
        &self,
        ids: &[ReviewId],
        moderation: &ReviewModeration,
        stamp: Option<&ModerationStamp>,
    ) -> Result<Vec<ReviewId>> {
        let mut state = self.state.write().await;
        state.batch_guard("reviews")?;
        let mut affected = Vec::new();
        for id in ids {
            if let Some(r) = state.reviews.get_mut(id) {
                r.status = moderation.status;
                if let Some(stamp) = stamp {
                    r.moderation_reason = moderation.reason.clone();
                    r.moderated_by = Some(stamp.by);
                    r.moderated_at = Some(stamp.at);
                }
                affected.push(*id);
            }
        }
        Ok(affected)
    }

    async fn bulk_soft_delete(
        &self,
        ids: &[ReviewId],
        stamp: &ModerationStamp,
    ) -> Result<Vec<ReviewId>> {
        let mut state = self.state.write().await;
        state.batch_guard("reviews")?;
        let mut affected = Vec::new();
        for id in ids {
            if let Some(r) = state.reviews.get_mut(id) {
                r.status = ReviewStatus::Deleted;
                r.deleted_by = Some(stamp.by);
                r.deleted_at = Some(stamp.at);
                affected.push(*id);
            }
        }
        Ok(affected)
    }

    async fn bulk_set_report_status(
        &self,
        ids: &[Uuid],
        resolution: ReportResolution,
        at: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        let mut state = self.state.write().await;
        state.batch_guard("review_reports")?;
        let mut affected = Vec::new();
        for id in ids {
            if let Some(r) = state.reports.get_mut(id) {
                r.status = resolution.status();
                r.resolved_at = Some(at);
                affected.push(*id);
            }
        }
        Ok(affected)
    }
}

#[async_trait]
impl EntitlementProcedure for MemoryStore {
    async fn toggle_user_premium(
        &self,
        request: &EntitlementRequest,
    ) -> Result<EntitlementReceipt> {
        let mut state = self.state.write().await;
        state.entitlement_calls.push(request.clone());

        if let Some(reason) = state.faults.entitlement_reject.clone() {
            return Ok(EntitlementReceipt {
                success: false,
                error: Some(reason),
                ..Default::default()
            });
        }
        if !state.profiles.contains_key(&request.user_id) {
            return Ok(EntitlementReceipt {
                success: false,
                error: Some("User not found".into()),
                ..Default::default()
            });
        }

        // Staged copy; committed only if every row succeeds.
        let mut staged_profiles = state.profiles.clone();
        let mut staged_businesses = state.businesses.clone();
        let owned = state.owned_business_ids(request.user_id);

        if let Some(profile) = staged_profiles.get_mut(&request.user_id) {
            profile.tier = Some(request.tier);
            profile.is_premium = request.is_premium;
            profile.premium_expires_at = request.expires_at;
        }
        let mut updated = Vec::new();
        for id in &owned {
            if state.faults.entitlement_fail_after == Some(updated.len()) {
                return Err(StoreError::backend(format!(
                    "toggle_user_premium aborted while updating business {id}"
                )));
            }
            if let Some(b) = staged_businesses.get_mut(id) {
                b.is_premium = request.is_premium;
                b.tier = request.tier;
                updated.push(id.clone());
            }
        }

        state.profiles = staged_profiles;
        state.businesses = staged_businesses;
        Ok(EntitlementReceipt {
            success: true,
            businesses_updated: updated.len() as u64,
            business_ids: updated,
            error: None,
        })
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: &NewAuditEntry) -> Result<()> {
        let mut state = self.state.write().await;
        if state.faults.fail_audit {
            return Err(StoreError::unavailable("audit log unavailable"));
        }
        state.audit.push(AuditLogEntry {
            admin_id: entry.admin_id,
            action: entry.action.as_str().to_string(),
            target_type: entry.target_type.as_str().to_string(),
            target_id: entry.target_id.clone(),
            details: entry.details.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

// ── Side effects ──────────────────────────────────────────────

#[async_trait]
impl Notifier for MemoryStore {
    async fn notify(&self, notification: &Notification) -> std::result::Result<(), SideEffectError> {
        let mut state = self.state.write().await;
        if state.faults.fail_side_effects {
            return Err(SideEffectError::Notification("notifications table unavailable".into()));
        }
        state.notifications.push(notification.clone());
        Ok(())
    }
}

#[async_trait]
impl Mailer for MemoryStore {
    async fn send(&self, email: &Email) -> std::result::Result<(), SideEffectError> {
        let mut state = self.state.write().await;
        if state.faults.fail_side_effects {
            return Err(SideEffectError::Email("smtp connection refused".into()));
        }
        state.emails.push(email.clone());
        Ok(())
    }
}

#[async_trait]
impl CacheInvalidator for MemoryStore {
    async fn invalidate(&self, path: &str) -> std::result::Result<(), SideEffectError> {
        let mut state = self.state.write().await;
        if state.faults.fail_side_effects {
            return Err(SideEffectError::CacheInvalidation {
                path: path.to_string(),
                reason: "revalidation endpoint unreachable".into(),
            });
        }
        state.invalidated.push(path.to_string());
        Ok(())
    }
}
