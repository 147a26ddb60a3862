//! HTTP-level tests of the admin server over the in-memory backend.
//!
//! They pin the transport contract: bearer authentication, the
//! `{status, message}` bodies and status codes, and bulk results.

use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use claimdesk_core::types::{
    Business, BusinessStatus, Claim, ClaimStatus, Payment, PaymentStatus, Profile, Review,
    ReviewStatus, Role, Tier,
};
use claimdesk_core::{AdminServiceImpl, EngineConfig, MemoryStore};
use claimdesk_server::middleware::jwt::JwtConfig;
use claimdesk_server::router::build_router;

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    exp: u64,
}

fn make_jwt(user_id: Uuid) -> String {
    let claims = TestClaims {
        sub: user_id.to_string(),
        exp: jsonwebtoken::get_current_timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .expect("failed to encode test JWT")
}

// ── Fixtures ───────────────────────────────────────────────────

struct TestApp {
    store: Arc<MemoryStore>,
    app: axum::Router,
    admin: Uuid,
}

fn profile(id: Uuid, role: Role, email: &str) -> Profile {
    Profile {
        id,
        email: Some(email.into()),
        full_name: Some("Amina Tazi".into()),
        role,
        business_id: None,
        tier: None,
        is_premium: false,
        premium_expires_at: None,
        suspended: false,
    }
}

fn business(id: &str, owner: Option<Uuid>) -> Business {
    Business {
        id: id.into(),
        name: "Cafe Atlas".into(),
        owner_user_id: owner,
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

fn claim(id: Uuid, business_id: &str, user_id: Uuid) -> Claim {
    Claim {
        id,
        business_id: business_id.into(),
        business_name: Some("Cafe Atlas".into()),
        user_id: Some(user_id),
        email: "owner@cafe-atlas.test".into(),
        full_name: "Amina Tazi".into(),
        status: ClaimStatus::Pending,
        proof_data: json!({}),
        reviewed_by: None,
        reviewed_at: None,
        rejection_reason: None,
        admin_notes: None,
    }
}

fn review(id: i64) -> Review {
    Review {
        id,
        business_id: "b1".into(),
        status: ReviewStatus::Pending,
        moderation_reason: None,
        moderated_by: None,
        moderated_at: None,
        deleted_by: None,
        deleted_at: None,
    }
}

async fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let admin = Uuid::new_v4();
    store
        .insert_profile(profile(admin, Role::Admin, "ops@claimdesk.test"))
        .await;
    let service = Arc::new(AdminServiceImpl::new(store.ports(), EngineConfig::default()));
    let app = build_router(service, JwtConfig::from_secret(TEST_JWT_SECRET));
    TestApp { store, app, admin }
}

async fn seed_user(t: &TestApp, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    t.store
        .insert_profile(profile(id, role, "owner@cafe-atlas.test"))
        .await;
    id
}

async fn post(app: &axum::Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ── Tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let t = build_test_app().await;
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_unauthenticated() {
    let t = build_test_app().await;
    let uri = format!("/admin/claims/{}/approve", Uuid::new_v4());
    let (status, body) = post(&t.app, &uri, None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn invalid_token_is_rejected_by_the_middleware() {
    let t = build_test_app().await;
    let uri = format!("/admin/claims/{}/approve", Uuid::new_v4());
    let (status, body) = post(&t.app, &uri, Some("not-a-jwt"), json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn non_admin_is_forbidden() {
    let t = build_test_app().await;
    let pro = seed_user(&t, Role::Pro).await;
    let uri = format!("/admin/claims/{}/approve", Uuid::new_v4());
    let (status, body) = post(&t.app, &uri, Some(&make_jwt(pro)), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn claim_approval_then_conflict() {
    let t = build_test_app().await;
    let u1 = seed_user(&t, Role::User).await;
    let c1 = Uuid::new_v4();
    t.store.insert_business(business("b1", None)).await;
    t.store.insert_claim(claim(c1, "b1", u1)).await;
    let token = make_jwt(t.admin);

    let uri = format!("/admin/claims/{c1}/approve");
    let (status, body) = post(&t.app, &uri, Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(t.store.claim(c1).await.unwrap().status, ClaimStatus::Approved);
    assert_eq!(t.store.business("b1").await.unwrap().owner_user_id, Some(u1));

    let (status, body) = post(&t.app, &uri, Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn claim_rejection_without_body() {
    let t = build_test_app().await;
    let u1 = seed_user(&t, Role::User).await;
    let c1 = Uuid::new_v4();
    t.store.insert_business(business("b1", None)).await;
    t.store.insert_claim(claim(c1, "b1", u1)).await;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/admin/claims/{c1}/reject"))
        .header("authorization", format!("Bearer {}", make_jwt(t.admin)))
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(t.store.claim(c1).await.unwrap().status, ClaimStatus::Rejected);
}

#[tokio::test]
async fn malformed_claim_id_is_invalid() {
    let t = build_test_app().await;
    let (status, body) = post(
        &t.app,
        "/admin/claims/not-a-uuid/approve",
        Some(&make_jwt(t.admin)),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid claim id.");
}

#[tokio::test]
async fn payment_verified_by_reference() {
    let t = build_test_app().await;
    let u1 = seed_user(&t, Role::Pro).await;
    t.store.insert_business(business("b1", Some(u1))).await;
    let p1 = Uuid::new_v4();
    t.store
        .insert_payment_row(Payment {
            id: p1,
            user_id: u1,
            business_id: Some("b1".into()),
            reference: "REF-9".into(),
            method: "bank_transfer".into(),
            amount: Decimal::new(49900, 2),
            status: PaymentStatus::Pending,
            target_tier: Tier::Gold,
            notes: None,
            expires_at: None,
            verified_by: None,
            verified_at: None,
        })
        .await;

    let (status, body) = post(
        &t.app,
        "/admin/payments/REF-9/verify",
        Some(&make_jwt(t.admin)),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(
        t.store.payment(p1).await.unwrap().status,
        PaymentStatus::Verified
    );
    assert!(t.store.business("b1").await.unwrap().is_premium);

    let (status, _) = post(
        &t.app,
        "/admin/payments/REF-404/verify",
        Some(&make_jwt(t.admin)),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_submission_is_user_facing_and_single_pending() {
    let t = build_test_app().await;
    let u1 = seed_user(&t, Role::User).await;
    let token = make_jwt(u1);
    let body = json!({ "reference": "VIR-2291" });

    let (status, first) = post(&t.app, "/payments", Some(&token), body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "success");

    let (status, second) = post(&t.app, "/payments", Some(&token), body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(second["status"], "error");
}

#[tokio::test]
async fn bulk_reviews_report_missing_ids() {
    let t = build_test_app().await;
    t.store.insert_review(review(1)).await;

    let (status, body) = post(
        &t.app,
        "/admin/reviews/bulk-update",
        Some(&make_jwt(t.admin)),
        json!({ "ids": [1, 99], "status": "rejected" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["errors"], json!(["Review 99: not found"]));
    assert_eq!(
        t.store.review(1).await.unwrap().status,
        ReviewStatus::Rejected
    );
}

#[tokio::test]
async fn bulk_refusal_is_still_a_result_body() {
    let t = build_test_app().await;
    let (status, body) = post(
        &t.app,
        "/admin/reviews/bulk-delete",
        None,
        json!({ "ids": [1] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["processed"], 0);
}

#[tokio::test]
async fn business_patch_cannot_touch_premium() {
    let t = build_test_app().await;
    t.store.insert_business(business("b1", None)).await;
    let (status, body) = post(
        &t.app,
        "/admin/businesses/bulk-update",
        Some(&make_jwt(t.admin)),
        json!({ "ids": ["b1"], "updates": { "is_premium": true } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(!t.store.business("b1").await.unwrap().is_premium);
}

#[tokio::test]
async fn self_demotion_is_a_conflict() {
    let t = build_test_app().await;
    let uri = format!("/admin/users/{}/role", t.admin);
    let (status, body) = post(
        &t.app,
        &uri,
        Some(&make_jwt(t.admin)),
        json!({ "role": "user" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "You cannot change your own role.");
}

#[tokio::test]
async fn premium_toggle_over_http() {
    let t = build_test_app().await;
    let u1 = seed_user(&t, Role::Pro).await;
    t.store.insert_business(business("b1", Some(u1))).await;

    let uri = format!("/admin/users/{u1}/premium");
    let (status, body) = post(
        &t.app,
        &uri,
        Some(&make_jwt(t.admin)),
        json!({ "tier": "gold", "period_months": 12 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "GOLD plan activated (1 business(es) updated).");
    assert!(t.store.business("b1").await.unwrap().is_premium);
}
