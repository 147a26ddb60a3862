//! POST /admin/users/:id/role         body: {role}
//! POST /admin/users/:id/suspension   body: {suspended}

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::{Extension, Json};
use serde::Deserialize;

use claimdesk_core::types::Role;
use claimdesk_core::{ActionOutcome, AdminService};

use super::{parse_uuid, session, Caller};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SuspensionChange {
    #[serde(alias = "suspend")]
    pub suspended: bool,
}

pub async fn change_role(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    Path(id): Path<String>,
    payload: Result<Json<RoleChange>, JsonRejection>,
) -> Result<Json<ActionOutcome>, AppError> {
    let user_id = parse_uuid(&id, "user")?;
    let Json(body) = payload?;
    let outcome = service
        .change_user_role(session(&caller), user_id, body.role)
        .await?;
    Ok(Json(outcome))
}

pub async fn set_suspension(
    caller: Caller,
    Extension(service): Extension<Arc<dyn AdminService>>,
    Path(id): Path<String>,
    payload: Result<Json<SuspensionChange>, JsonRejection>,
) -> Result<Json<ActionOutcome>, AppError> {
    let user_id = parse_uuid(&id, "user")?;
    let Json(body) = payload?;
    let outcome = service
        .set_user_suspension(session(&caller), user_id, body.suspended)
        .await?;
    Ok(Json(outcome))
}
