//! Payment handlers.
//!
//! POST /admin/payments/:identifier/verify   identifier: payment id or reference
//! POST /admin/payments/:identifier/reject   body: {reason?}
//! POST /admin/payments/manual               body: ManualPayment
//! POST /payments                            user-facing submission

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::{Extension, Json};

use claimdesk_core::payments::{ManualPayment, PaymentSubmission};
use claimdesk_core::{ActionOutcome, AdminService};

use super::{session, Caller, ReasonBody};
use crate::error::AppError;

pub async fn verify(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    Path(identifier): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Result<Json<ActionOutcome>, AppError> {
    let reason = body.and_then(|Json(b)| b.reason);
    let outcome = service
        .verify_payment(session(&caller), &identifier, reason)
        .await?;
    Ok(Json(outcome))
}

pub async fn reject(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    Path(identifier): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Result<Json<ActionOutcome>, AppError> {
    let reason = body.and_then(|Json(b)| b.reason);
    let outcome = service
        .reject_payment(session(&caller), &identifier, reason)
        .await?;
    Ok(Json(outcome))
}

pub async fn manual(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    payload: Result<Json<ManualPayment>, JsonRejection>,
) -> Result<Json<ActionOutcome>, AppError> {
    let Json(payment) = payload?;
    let outcome = service
        .add_manual_payment(session(&caller), payment)
        .await?;
    Ok(Json(outcome))
}

pub async fn submit(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    payload: Result<Json<PaymentSubmission>, JsonRejection>,
) -> Result<Json<ActionOutcome>, AppError> {
    let Json(submission) = payload?;
    let outcome = service
        .submit_payment(session(&caller), submission)
        .await?;
    Ok(Json(outcome))
}
