//! Subscription entitlement synchronization.
//!
//! The profile tier, the legacy premium flag, the expiry and the premium
//! flag of every business the user controls change together in one atomic
//! procedure call. No other code path writes these fields.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AdminError;
use crate::ports::EntitlementProcedure;
use crate::types::{BusinessId, Tier, UserId};

/// Arguments of `toggle_user_premium`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementRequest {
    pub user_id: UserId,
    pub tier: Tier,
    pub is_premium: bool,
    pub granted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl EntitlementRequest {
    /// A paid tier switches the premium flag on; `standard` is a revoke.
    pub fn grant(
        user_id: UserId,
        tier: Tier,
        granted_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        if !tier.is_paid() {
            return Self::revoke(user_id);
        }
        Self {
            user_id,
            tier,
            is_premium: true,
            granted_at: Some(granted_at),
            expires_at,
        }
    }

    pub fn revoke(user_id: UserId) -> Self {
        Self {
            user_id,
            tier: Tier::Standard,
            is_premium: false,
            granted_at: None,
            expires_at: None,
        }
    }
}

/// JSON result of the procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementReceipt {
    pub success: bool,
    #[serde(default)]
    pub businesses_updated: u64,
    #[serde(default)]
    pub business_ids: Vec<BusinessId>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct EntitlementSync {
    procedure: Arc<dyn EntitlementProcedure>,
}

impl EntitlementSync {
    pub fn new(procedure: Arc<dyn EntitlementProcedure>) -> Self {
        Self { procedure }
    }

    /// One procedure call. A transport error or `success = false` is a hard
    /// failure of the calling operation.
    pub async fn toggle(&self, request: &EntitlementRequest) -> Result<EntitlementReceipt, AdminError> {
        let receipt = self
            .procedure
            .toggle_user_premium(request)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %request.user_id, error = %e, "entitlement procedure call failed");
                AdminError::EntitlementSync(e.message.clone())
            })?;

        if !receipt.success {
            let reason = receipt
                .error
                .clone()
                .unwrap_or_else(|| "procedure reported failure".to_string());
            tracing::error!(user_id = %request.user_id, reason = %reason, "entitlement procedure rejected the change");
            return Err(AdminError::EntitlementSync(reason));
        }

        tracing::info!(
            user_id = %request.user_id,
            tier = request.tier.as_str(),
            is_premium = request.is_premium,
            businesses_updated = receipt.businesses_updated,
            "entitlement synchronized"
        );
        Ok(receipt)
    }
}
