//! Bulk admin operations.
//!
//! Set-based runs issue one statement over the requested ids and derive the
//! counts from the ids the store reports as affected. Claim runs go through
//! the claim engine one id at a time. Either way each id has its own failure
//! boundary, and each run writes exactly one audit entry.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditTrail, NewAuditEntry, TargetType};
use crate::claims::ClaimTransitionEngine;
use crate::error::{AdminError, StoreError};
use crate::gate::{AdminContext, AuthorizationGate};
use crate::ports::{BusinessStore, Ports, ReviewStore};
use crate::side_effects::{
    SideEffects, PATH_ADMIN_BUSINESSES, PATH_ADMIN_CLAIMS, PATH_ADMIN_REPORTS, PATH_ADMIN_REVIEWS,
};
use crate::types::{BulkOperationResult, BusinessId, ClaimDecision, ReviewId};
use crate::writes::{BusinessPatch, ModerationStamp, ReportResolution, ReviewModeration};

/// Removes repeated ids, keeping first occurrences in order.
pub fn dedup_ids<I: Clone + Eq + Hash>(ids: &[I]) -> Vec<I> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert((*id).clone())).cloned().collect()
}

/// Splits `requested` into processed ids and per-id "not found" errors.
pub fn tally<I: Eq + Hash + Display>(
    requested: &[I],
    affected: &[I],
    entity: &str,
) -> (usize, Vec<String>) {
    let affected: HashSet<&I> = affected.iter().collect();
    let mut processed = 0;
    let mut errors = Vec::new();
    for id in requested {
        if affected.contains(id) {
            processed += 1;
        } else {
            errors.push(format!("{entity} {id}: not found"));
        }
    }
    (processed, errors)
}

pub fn summary_message(plural: &str, processed: usize, failed: usize) -> String {
    format!("{processed} {plural} processed, {failed} failed")
}

/// Labels and side effects of one kind of set-based run.
struct RunKind {
    entity: &'static str,
    plural: &'static str,
    action: AuditAction,
    target_type: TargetType,
    ids_key: &'static str,
    path: &'static str,
}

const REVIEW_UPDATE: RunKind = RunKind {
    entity: "Review",
    plural: "reviews",
    action: AuditAction::BulkUpdateReviews,
    target_type: TargetType::Review,
    ids_key: "review_ids",
    path: PATH_ADMIN_REVIEWS,
};

const REVIEW_DELETE: RunKind = RunKind {
    action: AuditAction::BulkDeleteReviews,
    ..REVIEW_UPDATE
};

const BUSINESS_UPDATE: RunKind = RunKind {
    entity: "Business",
    plural: "businesses",
    action: AuditAction::BulkUpdateBusinesses,
    target_type: TargetType::Business,
    ids_key: "business_ids",
    path: PATH_ADMIN_BUSINESSES,
};

const BUSINESS_DELETE: RunKind = RunKind {
    action: AuditAction::BulkDeleteBusinesses,
    ..BUSINESS_UPDATE
};

const REPORT_UPDATE: RunKind = RunKind {
    entity: "Report",
    plural: "reports",
    action: AuditAction::BulkUpdateReviewReports,
    target_type: TargetType::ReviewReport,
    ids_key: "report_ids",
    path: PATH_ADMIN_REPORTS,
};

#[derive(Clone)]
pub struct BulkOperationRunner {
    gate: AuthorizationGate,
    reviews: Arc<dyn ReviewStore>,
    businesses: Arc<dyn BusinessStore>,
    claims: ClaimTransitionEngine,
    effects: SideEffects,
    audit: AuditTrail,
}

impl BulkOperationRunner {
    pub fn new(ports: &Ports, claims: ClaimTransitionEngine) -> Self {
        Self {
            gate: AuthorizationGate::new(ports.profiles.clone()),
            reviews: ports.reviews.clone(),
            businesses: ports.businesses.clone(),
            claims,
            effects: SideEffects::new(
                ports.notifier.clone(),
                ports.mailer.clone(),
                ports.cache.clone(),
            ),
            audit: AuditTrail::new(ports.audit.clone()),
        }
    }

    pub async fn update_reviews(
        &self,
        ctx: &AdminContext,
        ids: &[ReviewId],
        moderation: &ReviewModeration,
    ) -> BulkOperationResult {
        let stamp = moderation
            .reason
            .as_ref()
            .filter(|r| !r.trim().is_empty())
            .map(|_| ModerationStamp {
                by: ctx.admin_id,
                at: Utc::now(),
            });
        let reviews = &self.reviews;
        self.run_set_based(ctx, &REVIEW_UPDATE, ids, json!(moderation), |ids| async move {
            reviews.bulk_moderate(&ids, moderation, stamp.as_ref()).await
        })
        .await
    }

    pub async fn delete_reviews(&self, ctx: &AdminContext, ids: &[ReviewId]) -> BulkOperationResult {
        let stamp = ModerationStamp {
            by: ctx.admin_id,
            at: Utc::now(),
        };
        let reviews = &self.reviews;
        self.run_set_based(ctx, &REVIEW_DELETE, ids, serde_json::Value::Null, |ids| async move {
            reviews.bulk_soft_delete(&ids, &stamp).await
        })
        .await
    }

    pub async fn update_businesses(
        &self,
        ctx: &AdminContext,
        ids: &[BusinessId],
        patch: &BusinessPatch,
    ) -> BulkOperationResult {
        if patch.is_empty() {
            return BulkOperationResult::failure(
                "No update fields provided.",
                0,
                vec!["empty update".into()],
            );
        }
        let businesses = &self.businesses;
        self.run_set_based(ctx, &BUSINESS_UPDATE, ids, json!(patch), |ids| async move {
            businesses.bulk_update(&ids, patch).await
        })
        .await
    }

    pub async fn delete_businesses(
        &self,
        ctx: &AdminContext,
        ids: &[BusinessId],
    ) -> BulkOperationResult {
        let stamp = ModerationStamp {
            by: ctx.admin_id,
            at: Utc::now(),
        };
        let businesses = &self.businesses;
        self.run_set_based(ctx, &BUSINESS_DELETE, ids, serde_json::Value::Null, |ids| async move {
            businesses.bulk_soft_delete(&ids, &stamp).await
        })
        .await
    }

    pub async fn update_review_reports(
        &self,
        ctx: &AdminContext,
        ids: &[Uuid],
        resolution: ReportResolution,
    ) -> BulkOperationResult {
        let reviews = &self.reviews;
        let at = Utc::now();
        self.run_set_based(
            ctx,
            &REPORT_UPDATE,
            ids,
            json!({ "status": resolution }),
            |ids| async move { reviews.bulk_set_report_status(&ids, resolution, at).await },
        )
        .await
    }

    /// Sequential claim transitions; each failure is reported under its id.
    pub async fn update_claims(
        &self,
        ctx: &AdminContext,
        ids: &[Uuid],
        decision: ClaimDecision,
        reason: Option<String>,
    ) -> BulkOperationResult {
        let ids = dedup_ids(ids);
        if ids.is_empty() {
            return BulkOperationResult::empty("No claims selected.");
        }

        let mut processed = 0;
        let mut errors = Vec::new();
        for id in &ids {
            match self.claims.transition(ctx, *id, decision, reason.clone()).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    tracing::warn!(claim_id = %id, error = %e, "bulk claim transition failed");
                    errors.push(format!("Claim {id}: {}", e.user_message()));
                }
            }
        }
        let failed = errors.len();

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                AuditAction::BulkUpdateClaims,
                TargetType::Claim,
                format!("{} claims", ids.len()),
                json!({
                    "claim_ids": ids,
                    "update_data": { "status": decision, "reason": reason },
                    "processed": processed,
                    "failed": failed,
                    "errors": errors,
                }),
            ))
            .await;
        self.effects.invalidate([PATH_ADMIN_CLAIMS]).await;

        BulkOperationResult {
            success: true,
            processed,
            failed,
            errors,
            message: summary_message("claims", processed, failed),
        }
    }

    async fn run_set_based<I, F, Fut>(
        &self,
        ctx: &AdminContext,
        kind: &RunKind,
        ids: &[I],
        update_data: serde_json::Value,
        apply: F,
    ) -> BulkOperationResult
    where
        I: Clone + Eq + Hash + Display + Serialize,
        F: FnOnce(Vec<I>) -> Fut,
        Fut: Future<Output = Result<Vec<I>, StoreError>>,
    {
        let ids = dedup_ids(ids);
        if ids.is_empty() {
            return BulkOperationResult::empty(format!("No {} selected.", kind.plural));
        }

        if let Err(e) = self.gate.recheck(ctx).await {
            return denied(e);
        }

        let affected = match apply(ids.clone()).await {
            Ok(affected) => affected,
            Err(e) => {
                tracing::error!(
                    action = kind.action.as_str(),
                    count = ids.len(),
                    error = %e,
                    "bulk statement failed"
                );
                let errors = vec![format!("Bulk {} operation failed: {}", kind.plural, e)];
                self.audit
                    .record(NewAuditEntry::new(
                        ctx.admin_id,
                        kind.action,
                        kind.target_type,
                        format!("{} {}", ids.len(), kind.plural),
                        json!({
                            kind.ids_key: ids,
                            "update_data": update_data,
                            "processed": 0,
                            "failed": ids.len(),
                            "errors": errors,
                        }),
                    ))
                    .await;
                return BulkOperationResult::failure(
                    format!("Bulk {} operation failed.", kind.plural),
                    ids.len(),
                    errors,
                );
            }
        };

        let (processed, errors) = tally(&ids, &affected, kind.entity);
        let failed = errors.len();

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                kind.action,
                kind.target_type,
                format!("{} {}", ids.len(), kind.plural),
                json!({
                    kind.ids_key: ids,
                    "update_data": update_data,
                    "processed": processed,
                    "failed": failed,
                    "errors": errors,
                }),
            ))
            .await;
        self.effects.invalidate([kind.path]).await;

        tracing::info!(action = kind.action.as_str(), processed, failed, "bulk run finished");
        BulkOperationResult {
            success: true,
            processed,
            failed,
            errors,
            message: summary_message(kind.plural, processed, failed),
        }
    }
}

/// Total failure before anything was applied.
pub fn denied(e: AdminError) -> BulkOperationResult {
    let message = e.user_message();
    BulkOperationResult::failure(message.clone(), 0, vec![message])
}
