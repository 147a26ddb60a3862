//! Admin authorization.
//!
//! Identity is always explicit: a [`Session`] comes in from the transport
//! boundary, an [`AdminContext`] goes out and is threaded through every
//! engine call. The stored role is re-read on every check; nothing is
//! cached across requests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AdminError;
use crate::ports::ProfileStore;
use crate::rbac::{Permission, PermissionSet};
use crate::schema_drift::is_missing_column_error;
use crate::types::UserId;

/// Authenticated caller, as established by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Verified admin identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    pub admin_id: UserId,
}

const FINE_GRAINED_COLUMNS: &[&str] = &["admin_access_level", "admin_permissions"];

#[derive(Clone)]
pub struct AuthorizationGate {
    profiles: Arc<dyn ProfileStore>,
}

impl AuthorizationGate {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// `Unauthenticated` without a session; `Forbidden` unless the stored
    /// role is admin and the account is not suspended.
    pub async fn verify_admin(&self, session: Option<&Session>) -> Result<AdminContext, AdminError> {
        let session = session.ok_or(AdminError::Unauthenticated)?;
        self.require_active_admin(session.user_id).await?;
        Ok(AdminContext {
            admin_id: session.user_id,
        })
    }

    /// Checks one fine-grained permission. When the store does not know the
    /// fine-grained columns yet, the coarse admin check stands in.
    pub async fn enforce_permission(
        &self,
        ctx: &AdminContext,
        permission: Permission,
    ) -> Result<(), AdminError> {
        match self.profiles.admin_access(ctx.admin_id).await {
            Ok(Some(access)) => {
                if PermissionSet::resolve(&access).allows(permission) {
                    Ok(())
                } else {
                    Err(AdminError::Forbidden(format!(
                        "Missing admin permission: {permission}"
                    )))
                }
            }
            Ok(None) => Err(AdminError::Forbidden("Admin access required".into())),
            Err(e)
                if FINE_GRAINED_COLUMNS
                    .iter()
                    .any(|c| is_missing_column_error(&e, c, Some("profiles"))) =>
            {
                tracing::warn!(
                    admin_id = %ctx.admin_id,
                    permission = permission.key(),
                    error = %e,
                    "fine-grained admin columns unavailable, using coarse admin check"
                );
                self.require_active_admin(ctx.admin_id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `verify_admin` followed by `enforce_permission`.
    pub async fn authorize(
        &self,
        session: Option<&Session>,
        permission: Permission,
    ) -> Result<AdminContext, AdminError> {
        let ctx = self.verify_admin(session).await?;
        self.enforce_permission(&ctx, permission).await?;
        Ok(ctx)
    }

    /// Re-reads the caller's role right before a mutating write.
    pub async fn recheck(&self, ctx: &AdminContext) -> Result<(), AdminError> {
        self.require_active_admin(ctx.admin_id).await
    }

    async fn require_active_admin(&self, user_id: UserId) -> Result<(), AdminError> {
        let profile = self
            .profiles
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AdminError::Forbidden("Admin access required".into()))?;
        if !profile.is_admin() {
            return Err(AdminError::Forbidden("Admin access required".into()));
        }
        if profile.suspended {
            return Err(AdminError::Forbidden("Admin account is suspended".into()));
        }
        Ok(())
    }
}
