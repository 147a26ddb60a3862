//! Claim approval and rejection through the service over the in-memory store.

mod common;

use claimdesk_core::memory::FaultPlan;
use claimdesk_core::service::AdminService;
use claimdesk_core::types::{Assignment, ClaimStatus, Role, Tier};
use claimdesk_core::{AdminError, ClaimWriteMode, EngineConfig, TierLimits};
use common::*;
use uuid::Uuid;

async fn seed_claim(f: &Fixture, claim_id: Uuid, user_id: Uuid, business_id: &str) {
    f.store
        .insert_profile(user(user_id, "owner@cafe-atlas.test", "Amina Tazi"))
        .await;
    f.store.insert_business(business(business_id, "Cafe Atlas")).await;
    f.store.insert_claim(claim(claim_id, business_id, user_id)).await;
}

#[tokio::test]
async fn approval_assigns_business_owner_and_claim_status() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;

    let outcome = f.service.approve_claim(f.session(), c1).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.message, "Claim approved successfully for business b1.");

    let profile = f.store.profile(u1).await.unwrap();
    assert_eq!(profile.business_id.as_deref(), Some("b1"));
    assert_eq!(profile.role, Role::Pro);
    assert_eq!(f.store.business("b1").await.unwrap().owner_user_id, Some(u1));

    let claim = f.store.claim(c1).await.unwrap();
    assert_eq!(claim.status, ClaimStatus::Approved);
    assert_eq!(claim.reviewed_by, Some(f.admin.user_id));
    assert!(claim.reviewed_at.is_some());

    assert_eq!(f.store.emails().await.len(), 1);
    assert_eq!(f.store.notifications().await.len(), 1);
    let audit = f.store.audit_entries().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "approve_claim");
    assert_eq!(audit[0].details["owner_sync"], "ok");
    let paths = f.store.invalidated_paths().await;
    assert!(paths.contains(&"/businesses/b1".to_string()));
    assert!(paths.contains(&"/admin/revendications".to_string()));
}

#[tokio::test]
async fn terminal_claim_is_a_conflict_without_mutation() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    f.service.approve_claim(f.session(), c1).await.unwrap();
    let before = f.store.claim(c1).await.unwrap();

    let again = f.service.approve_claim(f.session(), c1).await.unwrap_err();
    assert!(matches!(again, AdminError::Conflict(_)));
    assert_eq!(again.http_status(), 409);
    let reject = f
        .service
        .reject_claim(f.session(), c1, Some("late".into()))
        .await
        .unwrap_err();
    assert!(matches!(reject, AdminError::Conflict(_)));

    assert_eq!(f.store.claim(c1).await.unwrap(), before);
    assert_eq!(f.store.audit_entries().await.len(), 1);
    assert_eq!(f.store.emails().await.len(), 1);
}

#[tokio::test]
async fn unknown_claim_is_not_found() {
    let f = fixture().await;
    let err = f
        .service
        .approve_claim(f.session(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::NotFound(_)));
}

#[tokio::test]
async fn user_at_ownership_limit_is_refused() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    f.store.insert_business(business("b0", "Riad Nour")).await;
    f.store
        .insert_assignment(Assignment {
            user_id: u1,
            business_id: "b0".into(),
            role: "owner".into(),
            is_primary: false,
        })
        .await;

    let err = f.service.approve_claim(f.session(), c1).await.unwrap_err();
    assert!(matches!(err, AdminError::LimitExceeded { max: 1, current: 1 }));
    assert_eq!(f.store.business("b1").await.unwrap().owner_user_id, None);
    assert_eq!(f.store.claim(c1).await.unwrap().status, ClaimStatus::Pending);
    assert!(f.store.profile(u1).await.unwrap().business_id.is_none());
}

#[tokio::test]
async fn paid_tier_raises_the_limit() {
    let f = fixture_with(EngineConfig {
        tier_limits: TierLimits {
            standard: 1,
            growth: 3,
            gold: 5,
        },
        ..EngineConfig::default()
    })
    .await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    let mut p = f.store.profile(u1).await.unwrap();
    p.tier = Some(Tier::Growth);
    p.business_id = Some("b0".into());
    f.store.insert_profile(p).await;
    f.store.insert_business(business("b0", "Riad Nour")).await;

    let outcome = f.service.approve_claim(f.session(), c1).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn business_owned_by_someone_else_is_a_conflict() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    let mut b = f.store.business("b1").await.unwrap();
    b.owner_user_id = Some(Uuid::new_v4());
    f.store.insert_business(b).await;

    let err = f.service.approve_claim(f.session(), c1).await.unwrap_err();
    assert!(matches!(err, AdminError::Conflict(_)));
    assert_eq!(f.store.claim(c1).await.unwrap().status, ClaimStatus::Pending);
}

#[tokio::test]
async fn admin_claimant_keeps_admin_role() {
    let f = fixture().await;
    let c1 = Uuid::new_v4();
    f.store.insert_business(business("b1", "Cafe Atlas")).await;
    f.store.insert_claim(claim(c1, "b1", f.admin.user_id)).await;

    f.service.approve_claim(f.session(), c1).await.unwrap();
    let admin = f.store.profile(f.admin.user_id).await.unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(admin.business_id.as_deref(), Some("b1"));
}

#[tokio::test]
async fn requested_listing_updates_are_applied() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    let mut c = f.store.claim(c1).await.unwrap();
    c.proof_data = serde_json::json!({
        "requested_updates": { "phone": "+212 600 000 000", "city": "Fes" }
    });
    f.store.insert_claim(c).await;

    f.service.approve_claim(f.session(), c1).await.unwrap();
    let b = f.store.business("b1").await.unwrap();
    assert_eq!(b.phone.as_deref(), Some("+212 600 000 000"));
    assert_eq!(b.city.as_deref(), Some("Fes"));
    assert_eq!(
        f.store.audit_entries().await[0].details["requested_updates_applied"],
        true
    );
}

#[tokio::test]
async fn drift_on_reviewed_by_is_recovered_once() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    f.store
        .set_faults(FaultPlan::new().missing_column("business_claims", "reviewed_by"))
        .await;

    let outcome = f.service.approve_claim(f.session(), c1).await.unwrap();
    assert_eq!(outcome.message, "Claim approved successfully.");

    let attempts = f.store.write_attempts("business_claims").await;
    assert_eq!(attempts.len(), 2);
    assert!(attempts[0].columns.contains(&"reviewed_by"));
    assert!(!attempts[1].columns.contains(&"reviewed_by"));

    let claim = f.store.claim(c1).await.unwrap();
    assert_eq!(claim.status, ClaimStatus::Approved);
    assert_eq!(claim.reviewed_by, None);
}

#[tokio::test]
async fn strict_mode_surfaces_the_original_drift_error() {
    let f = fixture_with(EngineConfig {
        claim_write_mode: ClaimWriteMode::Strict,
        ..EngineConfig::default()
    })
    .await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    f.store
        .set_faults(FaultPlan::new().missing_column("business_claims", "reviewed_by"))
        .await;

    let err = f.service.approve_claim(f.session(), c1).await.unwrap_err();
    match err {
        AdminError::Store(e) => assert_eq!(e.column.as_deref(), Some("reviewed_by")),
        other => panic!("expected store error, got {other:?}"),
    }
    assert_eq!(f.store.write_attempts("business_claims").await.len(), 1);
    assert_eq!(f.store.claim(c1).await.unwrap().status, ClaimStatus::Pending);
    assert!(f.store.emails().await.is_empty());
}

#[tokio::test]
async fn rejection_reason_moves_to_admin_notes_under_drift() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    f.store
        .set_faults(FaultPlan::new().missing_column("business_claims", "rejection_reason"))
        .await;

    let outcome = f
        .service
        .reject_claim(f.session(), c1, Some("Proof does not match the listing".into()))
        .await
        .unwrap();
    assert_eq!(outcome.message, "Claim rejected successfully.");

    let claim = f.store.claim(c1).await.unwrap();
    assert_eq!(claim.status, ClaimStatus::Rejected);
    assert_eq!(claim.rejection_reason, None);
    assert_eq!(
        claim.admin_notes.as_deref(),
        Some("Proof does not match the listing")
    );
    let notes = f.store.notifications().await;
    assert!(notes[0].message.contains("Proof does not match the listing"));
}

#[tokio::test]
async fn failing_side_effects_do_not_change_the_outcome() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    f.store
        .set_faults(FaultPlan::new().failing_side_effects())
        .await;

    let outcome = f.service.approve_claim(f.session(), c1).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(f.store.claim(c1).await.unwrap().status, ClaimStatus::Approved);
    assert!(f.store.emails().await.is_empty());
    assert!(f.store.invalidated_paths().await.is_empty());
    assert_eq!(f.store.audit_entries().await.len(), 1);
}

#[tokio::test]
async fn failing_audit_log_does_not_change_the_outcome() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;
    f.store.set_faults(FaultPlan::new().failing_audit()).await;

    let outcome = f
        .service
        .reject_claim(f.session(), c1, None)
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert!(f.store.audit_entries().await.is_empty());
}

#[tokio::test]
async fn concurrent_approvals_apply_side_effects_once() {
    let f = fixture().await;
    let (c1, u1) = (Uuid::new_v4(), Uuid::new_v4());
    seed_claim(&f, c1, u1, "b1").await;

    let (first, second) = tokio::join!(
        f.service.approve_claim(f.session(), c1),
        f.service.approve_claim(f.session(), c1),
    );
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AdminError::Conflict(_)))));

    assert_eq!(f.store.claim(c1).await.unwrap().status, ClaimStatus::Approved);
    assert_eq!(f.store.business("b1").await.unwrap().owner_user_id, Some(u1));
    assert_eq!(f.store.emails().await.len(), 1);
    assert_eq!(f.store.notifications().await.len(), 1);
    let approvals = f
        .store
        .audit_entries()
        .await
        .into_iter()
        .filter(|e| e.action == "approve_claim")
        .count();
    assert_eq!(approvals, 1);
}
