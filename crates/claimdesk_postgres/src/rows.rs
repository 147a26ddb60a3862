//! Row shapes read back from Postgres and their conversion into the core
//! records. Unknown enum text is a decode error, never a silent default.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use claimdesk_core::error::StoreError;
use claimdesk_core::rbac::AdminAccess;
use claimdesk_core::types::{
    Business, BusinessStatus, Claim, ClaimStatus, Payment, PaymentStatus, Profile, Role, Tier,
};

pub(crate) const PROFILE_COLUMNS: &str = "id, email, full_name, role, business_id, \
     subscription_tier, is_premium, premium_expires_at, is_suspended";

pub(crate) const BUSINESS_COLUMNS: &str = "id, name, user_id, subscription_tier, is_premium, \
     is_featured, status, description, phone, website, address, city";

pub(crate) const CLAIM_COLUMNS: &str = "id, business_id, business_name, user_id, email, \
     full_name, status, proof_data, reviewed_by, reviewed_at, rejection_reason, admin_notes";

pub(crate) const PAYMENT_COLUMNS: &str = "id, user_id, business_id, payment_reference, \
     payment_method, amount_usd, status, target_tier, notes, expires_at, verified_by, verified_at";

fn unknown(field: &str, value: &str) -> StoreError {
    StoreError::decode(format!("unknown {field} '{value}'"))
}

fn parse_tier(value: &str) -> Result<Tier, StoreError> {
    Tier::from_str(value).ok_or_else(|| unknown("subscription_tier", value))
}

// ── Profiles ──────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProfileRow {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub business_id: Option<String>,
    pub subscription_tier: Option<String>,
    pub is_premium: bool,
    pub premium_expires_at: Option<DateTime<Utc>>,
    pub is_suspended: bool,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: Role::from_str(&row.role).ok_or_else(|| unknown("role", &row.role))?,
            business_id: row.business_id,
            tier: row.subscription_tier.as_deref().map(parse_tier).transpose()?,
            is_premium: row.is_premium,
            premium_expires_at: row.premium_expires_at,
            suspended: row.is_suspended,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AdminAccessRow {
    pub role: String,
    pub admin_access_level: Option<String>,
    pub admin_permissions: Option<Vec<String>>,
}

impl From<AdminAccessRow> for AdminAccess {
    fn from(row: AdminAccessRow) -> Self {
        AdminAccess {
            role: Role::from_str(&row.role),
            access_level: row.admin_access_level,
            extra_permissions: row.admin_permissions.unwrap_or_default(),
        }
    }
}

// ── Businesses ────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BusinessRow {
    pub id: String,
    pub name: String,
    pub user_id: Option<Uuid>,
    pub subscription_tier: String,
    pub is_premium: bool,
    pub is_featured: bool,
    pub status: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

impl TryFrom<BusinessRow> for Business {
    type Error = StoreError;

    fn try_from(row: BusinessRow) -> Result<Self, Self::Error> {
        Ok(Business {
            tier: parse_tier(&row.subscription_tier)?,
            status: BusinessStatus::from_str(&row.status)
                .ok_or_else(|| unknown("business status", &row.status))?,
            id: row.id,
            name: row.name,
            owner_user_id: row.user_id,
            is_premium: row.is_premium,
            is_featured: row.is_featured,
            description: row.description,
            phone: row.phone,
            website: row.website,
            address: row.address,
            city: row.city,
        })
    }
}

// ── Claims ────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ClaimRow {
    pub id: Uuid,
    pub business_id: String,
    pub business_name: Option<String>,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub full_name: String,
    pub status: String,
    pub proof_data: serde_json::Value,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub admin_notes: Option<String>,
}

impl TryFrom<ClaimRow> for Claim {
    type Error = StoreError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        Ok(Claim {
            status: ClaimStatus::from_str(&row.status)
                .ok_or_else(|| unknown("claim status", &row.status))?,
            id: row.id,
            business_id: row.business_id,
            business_name: row.business_name,
            user_id: row.user_id,
            email: row.email,
            full_name: row.full_name,
            proof_data: row.proof_data,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            rejection_reason: row.rejection_reason,
            admin_notes: row.admin_notes,
        })
    }
}

// ── Payments ──────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PaymentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Option<String>,
    pub payment_reference: String,
    pub payment_method: String,
    pub amount_usd: Decimal,
    pub status: String,
    pub target_tier: String,
    pub notes: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            status: PaymentStatus::from_str(&row.status)
                .ok_or_else(|| unknown("payment status", &row.status))?,
            target_tier: parse_tier(&row.target_tier)?,
            id: row.id,
            user_id: row.user_id,
            business_id: row.business_id,
            reference: row.payment_reference,
            method: row.payment_method,
            amount: row.amount_usd,
            notes: row.notes,
            expires_at: row.expires_at,
            verified_by: row.verified_by,
            verified_at: row.verified_at,
        })
    }
}
