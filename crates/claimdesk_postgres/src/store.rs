//! Postgres implementations of the claimdesk_core storage ports.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) so the crate builds without a database.
//! Conditional status writes carry their guard in the WHERE clause and
//! report the rows they touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use claimdesk_core::audit::NewAuditEntry;
use claimdesk_core::entitlement::{EntitlementReceipt, EntitlementRequest};
use claimdesk_core::error::StoreError;
use claimdesk_core::ports::{
    AssignmentStore, AuditStore, BusinessStore, ClaimStore, EntitlementProcedure, PaymentStore,
    ProfileStore, Result, ReviewStore,
};
use claimdesk_core::rbac::AdminAccess;
use claimdesk_core::schema_drift::Column;
use claimdesk_core::types::{
    Business, BusinessId, Claim, Payment, Profile, RequestedUpdates, ReviewId, Role, UserId,
};
use claimdesk_core::writes::{
    BusinessPatch, ClaimReviewWrite, ModerationStamp, NewPayment, PaymentStatusWrite,
    ReportResolution, ReviewModeration,
};

use crate::error::map_sqlx;
use crate::rows::{
    AdminAccessRow, BusinessRow, ClaimRow, PaymentRow, ProfileRow, BUSINESS_COLUMNS,
    CLAIM_COLUMNS, PAYMENT_COLUMNS, PROFILE_COLUMNS,
};

// ── PgProfileStore ────────────────────────────────────────────

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "profiles"))?;
        row.map(Profile::try_from).transpose()
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE lower(email) = lower($1) LIMIT 1"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "profiles"))?;
        row.map(Profile::try_from).transpose()
    }

    async fn admin_access(&self, user_id: UserId) -> Result<Option<AdminAccess>> {
        let row = sqlx::query_as::<_, AdminAccessRow>(
            r#"
            SELECT role, admin_access_level, admin_permissions
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "profiles"))?;
        Ok(row.map(AdminAccess::from))
    }

    async fn assign_primary_business(
        &self,
        user_id: UserId,
        business_id: &str,
        role: Role,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE profiles SET business_id = $2, role = $3 WHERE id = $1")
            .bind(user_id)
            .bind(business_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "profiles"))?;
        Ok(result.rows_affected())
    }

    async fn set_role(&self, user_id: UserId, role: Role) -> Result<u64> {
        let result = sqlx::query("UPDATE profiles SET role = $2 WHERE id = $1")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "profiles"))?;
        Ok(result.rows_affected())
    }

    async fn set_suspension(&self, user_id: UserId, suspended: bool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET is_suspended = $2,
                suspended_at = CASE WHEN $2 THEN now() ELSE NULL END
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(suspended)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "profiles"))?;
        Ok(result.rows_affected())
    }

    async fn list_expired_premium(&self, now: DateTime<Utc>) -> Result<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            WHERE (subscription_tier IN ('growth', 'gold') OR is_premium)
              AND premium_expires_at < $1
            ORDER BY id
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "profiles"))?;
        rows.into_iter().map(Profile::try_from).collect()
    }
}

// ── PgBusinessStore ───────────────────────────────────────────

pub struct PgBusinessStore {
    pool: PgPool,
}

impl PgBusinessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BusinessStore for PgBusinessStore {
    async fn get_business(&self, business_id: &str) -> Result<Option<Business>> {
        let row = sqlx::query_as::<_, BusinessRow>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = $1"
        ))
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "businesses"))?;
        row.map(Business::try_from).transpose()
    }

    async fn set_owner_if_unclaimed(&self, business_id: &str, user_id: UserId) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE businesses
            SET user_id = $2, updated_at = now()
            WHERE id = $1 AND (user_id IS NULL OR user_id = $2)
            "#,
        )
        .bind(business_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "businesses"))?;
        Ok(result.rows_affected())
    }

    async fn apply_requested_updates(
        &self,
        business_id: &str,
        updates: &RequestedUpdates,
    ) -> Result<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE businesses SET updated_at = now()");
        for (column, value) in [
            ("name", &updates.name),
            ("description", &updates.description),
            ("phone", &updates.phone),
            ("website", &updates.website),
            ("address", &updates.address),
            ("city", &updates.city),
        ] {
            if let Some(v) = value {
                qb.push(format!(", {column} = ")).push_bind(v.clone());
            }
        }
        qb.push(" WHERE id = ").push_bind(business_id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "businesses"))?;
        Ok(result.rows_affected())
    }

    async fn bulk_update(
        &self,
        ids: &[BusinessId],
        patch: &BusinessPatch,
    ) -> Result<Vec<BusinessId>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE businesses SET updated_at = now()");
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(featured) = patch.is_featured {
            qb.push(", is_featured = ").push_bind(featured);
        }
        qb.push(" WHERE id = ANY(")
            .push_bind(ids.to_vec())
            .push(") RETURNING id");

        qb.build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "businesses"))
    }

    async fn bulk_soft_delete(
        &self,
        ids: &[BusinessId],
        stamp: &ModerationStamp,
    ) -> Result<Vec<BusinessId>> {
        sqlx::query_scalar::<_, String>(
            r#"
            UPDATE businesses
            SET status = 'deleted', deleted_by = $2, deleted_at = $3, updated_at = now()
            WHERE id = ANY($1)
            RETURNING id
            "#,
        )
        .bind(ids)
        .bind(stamp.by)
        .bind(stamp.at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "businesses"))
    }
}

// ── PgAssignmentStore ─────────────────────────────────────────

pub struct PgAssignmentStore {
    pool: PgPool,
}

impl PgAssignmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn business_ids_for_user(&self, user_id: UserId) -> Result<Vec<BusinessId>> {
        sqlx::query_scalar::<_, String>(
            "SELECT business_id FROM user_businesses WHERE user_id = $1 ORDER BY business_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "user_businesses"))
    }
}

// ── PgClaimStore ──────────────────────────────────────────────

pub struct PgClaimStore {
    pool: PgPool,
}

impl PgClaimStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClaimStore for PgClaimStore {
    async fn get_claim(&self, claim_id: Uuid) -> Result<Option<Claim>> {
        let row = sqlx::query_as::<_, ClaimRow>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM business_claims WHERE id = $1"
        ))
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "business_claims"))?;
        row.map(Claim::try_from).transpose()
    }

    async fn approved_business_ids_for_user(&self, user_id: UserId) -> Result<Vec<BusinessId>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT business_id
            FROM business_claims
            WHERE user_id = $1 AND status = 'approved'
            ORDER BY business_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "business_claims"))
    }

    async fn write_review(&self, claim_id: Uuid, write: &ClaimReviewWrite) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE business_claims SET status = ");
        qb.push_bind(write.status.as_str());
        if let Column::Write(at) = &write.reviewed_at {
            qb.push(", reviewed_at = ").push_bind(*at);
        }
        if let Column::Write(by) = &write.reviewed_by {
            qb.push(", reviewed_by = ").push_bind(*by);
        }
        if let Column::Write(reason) = &write.rejection_reason {
            qb.push(", rejection_reason = ").push_bind(reason.clone());
        }
        if let Column::Write(notes) = &write.admin_notes {
            qb.push(", admin_notes = ").push_bind(notes.clone());
        }
        qb.push(" WHERE id = ")
            .push_bind(claim_id)
            .push(" AND status = 'pending'");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "business_claims"))?;
        Ok(result.rows_affected())
    }
}

// ── PgPaymentStore ────────────────────────────────────────────

pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn get_payment_by_id(&self, id: &str) -> Result<Payment> {
        // The cast happens server-side so a malformed id surfaces as 22P02.
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM premium_payments WHERE id = $1::uuid"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "premium_payments"))?;
        Payment::try_from(row)
    }

    async fn get_payment_by_reference(&self, reference: &str) -> Result<Payment> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM premium_payments
            WHERE payment_reference = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(reference)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "premium_payments"))?;
        Payment::try_from(row)
    }

    async fn has_pending_payment(&self, user_id: UserId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM premium_payments WHERE user_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "premium_payments"))
    }

    async fn update_payment_status(&self, id: Uuid, write: &PaymentStatusWrite) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE premium_payments SET status = ");
        qb.push_bind(write.status.as_str())
            .push(", verified_by = ")
            .push_bind(write.verified_by)
            .push(", verified_at = ")
            .push_bind(write.verified_at);
        if let Column::Write(notes) = &write.notes {
            qb.push(", notes = ").push_bind(notes.clone());
        }
        if let Column::Write(expires_at) = &write.expires_at {
            qb.push(", expires_at = ").push_bind(*expires_at);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND status = 'pending'");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "premium_payments"))?;
        Ok(result.rows_affected())
    }

    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO premium_payments (id, user_id, business_id, payment_reference, \
             payment_method, amount_usd, status, target_tier, notes, verified_by, verified_at",
        );
        if payment.expires_at.is_written() {
            qb.push(", expires_at");
        }
        qb.push(") VALUES (");
        {
            let mut values = qb.separated(", ");
            values
                .push_bind(payment.id)
                .push_bind(payment.user_id)
                .push_bind(payment.business_id.clone())
                .push_bind(payment.reference.clone())
                .push_bind(payment.method.clone())
                .push_bind(payment.amount)
                .push_bind(payment.status.as_str())
                .push_bind(payment.target_tier.as_str())
                .push_bind(payment.notes.clone())
                .push_bind(payment.verified_by)
                .push_bind(payment.verified_at);
            if let Column::Write(expires_at) = &payment.expires_at {
                values.push_bind(*expires_at);
            }
        }
        qb.push(format!(") RETURNING {PAYMENT_COLUMNS}"));

        let row = qb
            .build_query_as::<PaymentRow>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "premium_payments"))?;
        Payment::try_from(row)
    }
}

// ── PgReviewStore ─────────────────────────────────────────────

pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn bulk_moderate(
        &self,
        ids: &[ReviewId],
        moderation: &ReviewModeration,
        stamp: Option<&ModerationStamp>,
    ) -> Result<Vec<ReviewId>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE reviews SET status = ");
        qb.push_bind(moderation.status.as_str());
        if let Some(stamp) = stamp {
            qb.push(", moderation_reason = ")
                .push_bind(moderation.reason.clone())
                .push(", moderated_by = ")
                .push_bind(stamp.by)
                .push(", moderated_at = ")
                .push_bind(stamp.at);
        }
        qb.push(" WHERE id = ANY(")
            .push_bind(ids.to_vec())
            .push(") RETURNING id");

        qb.build_query_scalar::<i64>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx(e, "reviews"))
    }

    async fn bulk_soft_delete(
        &self,
        ids: &[ReviewId],
        stamp: &ModerationStamp,
    ) -> Result<Vec<ReviewId>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE reviews
            SET status = 'deleted', deleted_by = $2, deleted_at = $3
            WHERE id = ANY($1)
            RETURNING id
            "#,
        )
        .bind(ids)
        .bind(stamp.by)
        .bind(stamp.at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "reviews"))
    }

    async fn bulk_set_report_status(
        &self,
        ids: &[Uuid],
        resolution: ReportResolution,
        at: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE review_reports
            SET status = $2, resolved_at = $3
            WHERE id = ANY($1)
            RETURNING id
            "#,
        )
        .bind(ids)
        .bind(resolution.status().as_str())
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "review_reports"))
    }
}

// ── PgEntitlementProcedure ────────────────────────────────────

/// Calls the `toggle_user_premium` database function, which updates the
/// profile and every controlled business in one transaction.
pub struct PgEntitlementProcedure {
    pool: PgPool,
}

impl PgEntitlementProcedure {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementProcedure for PgEntitlementProcedure {
    async fn toggle_user_premium(
        &self,
        request: &EntitlementRequest,
    ) -> Result<EntitlementReceipt> {
        let value = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT result FROM toggle_user_premium($1, $2, $3, $4, $5) AS result",
        )
        .bind(request.user_id)
        .bind(request.tier.as_str())
        .bind(request.is_premium)
        .bind(request.granted_at)
        .bind(request.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "profiles"))?;

        serde_json::from_value(value)
            .map_err(|e| StoreError::decode(format!("toggle_user_premium result: {e}")))
    }
}

// ── PgAuditStore ──────────────────────────────────────────────

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: &NewAuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (admin_id, action, target_type, target_id, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.admin_id)
        .bind(entry.action.as_str())
        .bind(entry.target_type.as_str())
        .bind(&entry.target_id)
        .bind(&entry.details)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx(e, "audit_logs"))?;
        Ok(())
    }
}
