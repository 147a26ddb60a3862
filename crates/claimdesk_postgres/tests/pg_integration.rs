//! Adapter tests against a real PostgreSQL.
//!
//! Run with: DATABASE_URL="postgresql:///claimdesk_test" cargo test -p claimdesk_postgres --test pg_integration -- --ignored

use std::sync::Arc;

use chrono::Utc;
use claimdesk_core::entitlement::EntitlementRequest;
use claimdesk_core::error::StoreErrorKind;
use claimdesk_core::ports::{
    BusinessStore, ClaimStore, EntitlementProcedure, PaymentStore, ProfileStore,
};
use claimdesk_core::schema_drift::Column;
use claimdesk_core::types::{BusinessStatus, ClaimDecision, ClaimStatus, Role, Tier};
use claimdesk_core::writes::{BusinessPatch, ClaimReviewWrite, PaymentStatusWrite};
use claimdesk_postgres::{
    apply_schema, connect, PgBusinessStore, PgClaimStore, PgEntitlementProcedure, PgPaymentStore,
    PgProfileStore,
};
use sqlx::PgPool;
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for pg tests");
    let pool = connect(&url, 4).await.expect("connect");
    apply_schema(&pool).await.expect("schema");
    pool
}

async fn seed_user(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO profiles (id, email, full_name, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("{id}@claimdesk.test"))
        .bind("Amina Tazi")
        .bind(role)
        .execute(pool)
        .await
        .expect("seed profile");
    id
}

async fn seed_business(pool: &PgPool, owner: Option<Uuid>) -> String {
    let id = format!("biz-{}", Uuid::new_v4());
    sqlx::query("INSERT INTO businesses (id, name, user_id) VALUES ($1, $2, $3)")
        .bind(&id)
        .bind("Cafe Atlas")
        .bind(owner)
        .execute(pool)
        .await
        .expect("seed business");
    id
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn profile_round_trip_and_admin_access() {
    let pool = pool().await;
    let id = seed_user(&pool, "admin").await;
    sqlx::query("UPDATE profiles SET admin_access_level = 'moderator', admin_permissions = '{payment.verify}' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let store = PgProfileStore::new(pool.clone());
    let profile = store.get_profile(id).await.unwrap().unwrap();
    assert_eq!(profile.role, Role::Admin);
    assert_eq!(profile.tier, None);

    let by_email = store
        .find_profile_by_email(&format!("{}@CLAIMDESK.test", id))
        .await
        .unwrap();
    assert_eq!(by_email.map(|p| p.id), Some(id));

    let access = store.admin_access(id).await.unwrap().unwrap();
    assert_eq!(access.access_level.as_deref(), Some("moderator"));
    assert_eq!(access.extra_permissions, vec!["payment.verify".to_string()]);

    assert_eq!(store.set_role(id, Role::Pro).await.unwrap(), 1);
    assert_eq!(store.set_role(Uuid::new_v4(), Role::Pro).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn claim_review_is_conditional_on_pending() {
    let pool = pool().await;
    let user = seed_user(&pool, "user").await;
    let business = seed_business(&pool, None).await;
    let claim_id: Uuid = sqlx::query_scalar(
        "INSERT INTO business_claims (business_id, user_id, email, full_name) VALUES ($1, $2, 'a@b.c', 'A') RETURNING id",
    )
    .bind(&business)
    .bind(user)
    .fetch_one(&pool)
    .await
    .unwrap();

    let store = PgClaimStore::new(pool.clone());
    let write = ClaimReviewWrite::new(ClaimDecision::Approved, user, Utc::now(), None);
    assert_eq!(store.write_review(claim_id, &write).await.unwrap(), 1);
    assert_eq!(store.write_review(claim_id, &write).await.unwrap(), 0);

    let claim = store.get_claim(claim_id).await.unwrap().unwrap();
    assert_eq!(claim.status, ClaimStatus::Approved);
    assert_eq!(claim.reviewed_by, Some(user));
    assert_eq!(
        store.approved_business_ids_for_user(user).await.unwrap(),
        vec![business]
    );
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn payment_lookups_classify_misses() {
    let pool = pool().await;
    let store = PgPaymentStore::new(pool.clone());

    let err = store.get_payment_by_id("REF-9").await.unwrap_err();
    assert_eq!(err.kind, StoreErrorKind::InvalidId);

    let err = store
        .get_payment_by_id(&Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(err.is_no_rows());

    let err = store
        .get_payment_by_reference(&format!("REF-{}", Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(err.is_no_rows());
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn payment_status_write_applies_once() {
    let pool = pool().await;
    let user = seed_user(&pool, "user").await;
    let reference = format!("REF-{}", Uuid::new_v4());
    let payment_id: Uuid = sqlx::query_scalar(
        "INSERT INTO premium_payments (user_id, payment_reference, amount_usd) VALUES ($1, $2, 499.00) RETURNING id",
    )
    .bind(user)
    .bind(&reference)
    .fetch_one(&pool)
    .await
    .unwrap();

    let store = PgPaymentStore::new(pool.clone());
    assert!(store.has_pending_payment(user).await.unwrap());

    let now = Utc::now();
    let mut write = PaymentStatusWrite::verified(user, now, now + chrono::Duration::days(365));
    write.expires_at = Column::Omitted;
    assert_eq!(store.update_payment_status(payment_id, &write).await.unwrap(), 1);
    assert_eq!(store.update_payment_status(payment_id, &write).await.unwrap(), 0);

    let payment = store.get_payment_by_reference(&reference).await.unwrap();
    assert_eq!(payment.id, payment_id);
    assert_eq!(payment.expires_at, None);
    assert!(!store.has_pending_payment(user).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn entitlement_procedure_reaches_every_controlled_business() {
    let pool = pool().await;
    let user = seed_user(&pool, "pro").await;
    let owned = seed_business(&pool, Some(user)).await;
    let primary = seed_business(&pool, None).await;
    let assigned = seed_business(&pool, None).await;
    sqlx::query("UPDATE profiles SET business_id = $2 WHERE id = $1")
        .bind(user)
        .bind(&primary)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO user_businesses (user_id, business_id) VALUES ($1, $2)")
        .bind(user)
        .bind(&assigned)
        .execute(&pool)
        .await
        .unwrap();

    let procedure = PgEntitlementProcedure::new(pool.clone());
    let receipt = procedure
        .toggle_user_premium(&EntitlementRequest::grant(user, Tier::Gold, Utc::now(), None))
        .await
        .unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.businesses_updated, 3);

    let businesses = PgBusinessStore::new(pool.clone());
    for id in [&owned, &primary, &assigned] {
        let b = businesses.get_business(id).await.unwrap().unwrap();
        assert_eq!(b.tier, Tier::Gold);
        assert!(b.is_premium);
    }

    let missing = procedure
        .toggle_user_premium(&EntitlementRequest::revoke(Uuid::new_v4()))
        .await
        .unwrap();
    assert!(!missing.success);
    assert_eq!(missing.error.as_deref(), Some("User not found"));
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL"]
async fn bulk_business_update_returns_touched_ids() {
    let pool = pool().await;
    let a = seed_business(&pool, None).await;
    let b = seed_business(&pool, None).await;
    let store: Arc<dyn BusinessStore> = Arc::new(PgBusinessStore::new(pool.clone()));

    let patch = BusinessPatch {
        status: Some(BusinessStatus::Suspended),
        is_featured: None,
    };
    let mut updated = store
        .bulk_update(&[a.clone(), b.clone(), "biz-missing".into()], &patch)
        .await
        .unwrap();
    updated.sort();
    let mut expected = vec![a.clone(), b];
    expected.sort();
    assert_eq!(updated, expected);

    let business = store.get_business(&a).await.unwrap().unwrap();
    assert_eq!(business.status, BusinessStatus::Suspended);
}
