//! Claim review handlers.
//!
//! POST /admin/claims/:id/approve
//! POST /admin/claims/:id/reject    body: {reason?}
//! POST /admin/claims/bulk          body: {ids, decision, reason?}

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use claimdesk_core::types::ClaimDecision;
use claimdesk_core::{ActionOutcome, AdminService, BulkOperationResult};

use super::{parse_uuid, session, Caller, ReasonBody};
use crate::error::AppError;

pub async fn approve(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    Path(id): Path<String>,
) -> Result<Json<ActionOutcome>, AppError> {
    let claim_id = parse_uuid(&id, "claim")?;
    let outcome = service.approve_claim(session(&caller), claim_id).await?;
    Ok(Json(outcome))
}

pub async fn reject(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    Path(id): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Result<Json<ActionOutcome>, AppError> {
    let claim_id = parse_uuid(&id, "claim")?;
    let reason = body.and_then(|Json(b)| b.reason);
    let outcome = service
        .reject_claim(session(&caller), claim_id, reason)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct BulkClaimsBody {
    pub ids: Vec<Uuid>,
    pub decision: ClaimDecision,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn bulk(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    payload: Result<Json<BulkClaimsBody>, JsonRejection>,
) -> Result<Json<BulkOperationResult>, AppError> {
    let Json(body) = payload?;
    let result = service
        .bulk_update_claims(session(&caller), &body.ids, body.decision, body.reason)
        .await;
    Ok(Json(result))
}
