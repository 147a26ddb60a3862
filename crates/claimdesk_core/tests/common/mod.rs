//! Shared fixtures for the claimdesk_core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use claimdesk_core::memory::MemoryStore;
use claimdesk_core::types::{
    Business, BusinessStatus, Claim, ClaimStatus, Payment, PaymentStatus, Profile, Review,
    ReviewStatus, Role, Tier, UserId,
};
use claimdesk_core::{AdminServiceImpl, EngineConfig, Session};
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub service: AdminServiceImpl,
    pub admin: Session,
}

impl Fixture {
    pub fn session(&self) -> Option<&Session> {
        Some(&self.admin)
    }
}

/// Store seeded with one super admin, service on the default config.
pub async fn fixture() -> Fixture {
    fixture_with(EngineConfig::default()).await
}

pub async fn fixture_with(config: EngineConfig) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let admin_id = Uuid::new_v4();
    store
        .insert_profile(Profile {
            email: Some("ops@claimdesk.test".into()),
            full_name: Some("Ops Admin".into()),
            ..profile(admin_id, Role::Admin)
        })
        .await;
    let service = AdminServiceImpl::new(store.ports(), config);
    Fixture {
        store,
        service,
        admin: Session::new(admin_id),
    }
}

pub fn profile(id: UserId, role: Role) -> Profile {
    Profile {
        id,
        email: None,
        full_name: None,
        role,
        business_id: None,
        tier: None,
        is_premium: false,
        premium_expires_at: None,
        suspended: false,
    }
}

pub fn user(id: UserId, email: &str, name: &str) -> Profile {
    Profile {
        email: Some(email.into()),
        full_name: Some(name.into()),
        ..profile(id, Role::User)
    }
}

pub fn business(id: &str, name: &str) -> Business {
    Business {
        id: id.into(),
        name: name.into(),
        owner_user_id: None,
        tier: Tier::Standard,
        is_premium: false,
        is_featured: false,
        status: BusinessStatus::Active,
        description: None,
        phone: None,
        website: None,
        address: None,
        city: None,
    }
}

pub fn claim(id: Uuid, business_id: &str, user_id: UserId) -> Claim {
    Claim {
        id,
        business_id: business_id.into(),
        business_name: Some("Cafe Atlas".into()),
        user_id: Some(user_id),
        email: "owner@cafe-atlas.test".into(),
        full_name: "Amina Tazi".into(),
        status: ClaimStatus::Pending,
        proof_data: serde_json::json!({}),
        reviewed_by: None,
        reviewed_at: None,
        rejection_reason: None,
        admin_notes: None,
    }
}

pub fn payment(id: Uuid, user_id: UserId, reference: &str, tier: Tier) -> Payment {
    Payment {
        id,
        user_id,
        business_id: None,
        reference: reference.into(),
        method: "bank_transfer".into(),
        amount: Decimal::new(49900, 2),
        status: PaymentStatus::Pending,
        target_tier: tier,
        notes: None,
        expires_at: None,
        verified_by: None,
        verified_at: None,
    }
}

pub fn review(id: i64, business_id: &str) -> Review {
    Review {
        id,
        business_id: business_id.into(),
        status: ReviewStatus::Pending,
        moderation_reason: None,
        moderated_by: None,
        moderated_at: None,
        deleted_by: None,
        deleted_at: None,
    }
}
