//! POST /admin/review-reports/bulk   body: {ids, status: resolved|dismissed}

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use claimdesk_core::writes::ReportResolution;
use claimdesk_core::{AdminService, BulkOperationResult};

use super::{session, Caller};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct BulkReportUpdate {
    pub ids: Vec<Uuid>,
    pub status: ReportResolution,
}

pub async fn bulk(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    payload: Result<Json<BulkReportUpdate>, JsonRejection>,
) -> Result<Json<BulkOperationResult>, AppError> {
    let Json(body) = payload?;
    Ok(Json(
        service
            .bulk_update_review_reports(session(&caller), &body.ids, body.status)
            .await,
    ))
}
