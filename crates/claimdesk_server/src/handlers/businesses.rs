//! POST /admin/businesses/bulk-update   body: {ids, updates: {status?, is_featured?}}
//! POST /admin/businesses/bulk-delete   body: {ids}
//!
//! `updates` rejects unknown fields, so premium state cannot be patched here.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use serde::Deserialize;

use claimdesk_core::types::BusinessId;
use claimdesk_core::writes::BusinessPatch;
use claimdesk_core::{AdminService, BulkOperationResult};

use super::{session, Caller};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct BulkBusinessUpdate {
    pub ids: Vec<BusinessId>,
    pub updates: BusinessPatch,
}

#[derive(Debug, Deserialize)]
pub struct BulkBusinessDelete {
    pub ids: Vec<BusinessId>,
}

pub async fn bulk_update(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    payload: Result<Json<BulkBusinessUpdate>, JsonRejection>,
) -> Result<Json<BulkOperationResult>, AppError> {
    let Json(body) = payload?;
    Ok(Json(
        service
            .bulk_update_businesses(session(&caller), &body.ids, &body.updates)
            .await,
    ))
}

pub async fn bulk_delete(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    payload: Result<Json<BulkBusinessDelete>, JsonRejection>,
) -> Result<Json<BulkOperationResult>, AppError> {
    let Json(body) = payload?;
    Ok(Json(
        service
            .bulk_delete_businesses(session(&caller), &body.ids)
            .await,
    ))
}
