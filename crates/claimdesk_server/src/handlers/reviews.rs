//! POST /admin/reviews/bulk-update   body: {ids, status, reason?}
//! POST /admin/reviews/bulk-delete   body: {ids}

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use serde::Deserialize;

use claimdesk_core::types::ReviewId;
use claimdesk_core::writes::ReviewModeration;
use claimdesk_core::{AdminService, BulkOperationResult};

use super::{session, Caller};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct BulkReviewUpdate {
    pub ids: Vec<ReviewId>,
    #[serde(flatten)]
    pub moderation: ReviewModeration,
}

#[derive(Debug, Deserialize)]
pub struct BulkReviewDelete {
    pub ids: Vec<ReviewId>,
}

pub async fn bulk_update(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    payload: Result<Json<BulkReviewUpdate>, JsonRejection>,
) -> Result<Json<BulkOperationResult>, AppError> {
    let Json(body) = payload?;
    Ok(Json(
        service
            .bulk_update_reviews(session(&caller), &body.ids, &body.moderation)
            .await,
    ))
}

pub async fn bulk_delete(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    payload: Result<Json<BulkReviewDelete>, JsonRejection>,
) -> Result<Json<BulkOperationResult>, AppError> {
    let Json(body) = payload?;
    Ok(Json(
        service
            .bulk_delete_reviews(session(&caller), &body.ids)
            .await,
    ))
}
