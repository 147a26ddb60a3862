//! Premium entitlement handlers.
//!
//! POST /admin/users/:id/premium   body: {tier, period_months?}
//! POST /admin/premium/expire      body: {now?}

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use claimdesk_core::types::Tier;
use claimdesk_core::{ActionOutcome, AdminService, BulkOperationResult};

use super::{parse_uuid, session, Caller};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PremiumToggle {
    pub tier: Tier,
    #[serde(default)]
    pub period_months: Option<u32>,
}

pub async fn toggle(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    Path(id): Path<String>,
    payload: Result<Json<PremiumToggle>, JsonRejection>,
) -> Result<Json<ActionOutcome>, AppError> {
    let user_id = parse_uuid(&id, "user")?;
    let Json(body) = payload?;
    let outcome = service
        .toggle_premium(session(&caller), user_id, body.tier, body.period_months)
        .await?;
    Ok(Json(outcome))
}

/// Sweep reference time; defaults to the current time.
#[derive(Debug, Default, Deserialize)]
pub struct ExpireSweep {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

pub async fn expire(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    body: Option<Json<ExpireSweep>>,
) -> Json<BulkOperationResult> {
    let now = body.and_then(|Json(b)| b.now).unwrap_or_else(Utc::now);
    Json(service.expire_premium_accounts(session(&caller), now).await)
}
