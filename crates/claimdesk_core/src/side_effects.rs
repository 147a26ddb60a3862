//! Best-effort collaborators: in-app notifications, emails, cache paths.
//! A failure here is logged and never changes the outcome of the operation
//! that triggered it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::{CacheInvalidator, Mailer, Notifier};
use crate::types::{BusinessId, Tier, UserId};

// ── Cache paths ───────────────────────────────────────────────

pub const PATH_HOME: &str = "/";
pub const PATH_ADMIN_CLAIMS: &str = "/admin/revendications";
pub const PATH_ADMIN_PAYMENTS: &str = "/admin/paiements";
pub const PATH_ADMIN_REVIEWS: &str = "/admin/avis";
pub const PATH_ADMIN_BUSINESSES: &str = "/admin/etablissements";
pub const PATH_ADMIN_REPORTS: &str = "/admin/avis-signalements";
pub const PATH_ADMIN_USERS: &str = "/admin/utilisateurs";

pub fn business_path(business_id: &str) -> String {
    format!("/businesses/{business_id}")
}

// ── Messages ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ClaimApproved,
    ClaimRejected,
    PaymentVerified,
    PaymentRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaimApproved => "claim_approved",
            Self::ClaimRejected => "claim_rejected",
            Self::PaymentVerified => "payment_verified",
            Self::PaymentRejected => "payment_rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: String,
}

impl Notification {
    pub fn claim_approved(user_id: UserId, business_name: &str) -> Self {
        Self {
            user_id,
            kind: NotificationKind::ClaimApproved,
            title: "Claim approved".into(),
            message: format!("Congratulations! Your claim for {business_name} has been approved."),
            link: "/dashboard".into(),
        }
    }

    pub fn claim_rejected(user_id: UserId, business_name: &str, reason: Option<&str>) -> Self {
        let mut message = format!("Your claim for {business_name} has been declined.");
        if let Some(reason) = reason {
            message.push_str(&format!(" Reason: {reason}"));
        }
        Self {
            user_id,
            kind: NotificationKind::ClaimRejected,
            title: "Claim declined".into(),
            message,
            link: "/dashboard/pending".into(),
        }
    }

    pub fn payment_verified(user_id: UserId, reference: &str, tier: Tier) -> Self {
        Self {
            user_id,
            kind: NotificationKind::PaymentVerified,
            title: "Payment verified".into(),
            message: format!(
                "Your payment {reference} has been verified. Your {} plan is active.",
                tier.as_str().to_uppercase()
            ),
            link: "/dashboard/premium".into(),
        }
    }

    pub fn subscription_activated(user_id: UserId, tier: Tier) -> Self {
        Self {
            user_id,
            kind: NotificationKind::PaymentVerified,
            title: "Subscription activated".into(),
            message: format!(
                "Your {} plan has been activated by an administrator.",
                tier.as_str().to_uppercase()
            ),
            link: "/dashboard/premium".into(),
        }
    }

    pub fn payment_rejected(user_id: UserId, reference: &str, reason: Option<&str>) -> Self {
        let message = match reason {
            Some(reason) => format!("Your payment {reference} was rejected: {reason}"),
            None => format!("Your payment {reference} was rejected."),
        };
        Self {
            user_id,
            kind: NotificationKind::PaymentRejected,
            title: "Payment rejected".into(),
            message,
            link: "/dashboard/premium".into(),
        }
    }
}

/// Outbound email. Rendering is the mailer's concern; these carry the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Email {
    ClaimApproved {
        to: String,
        full_name: String,
        business_name: String,
    },
    ClaimRejected {
        to: String,
        full_name: String,
        business_name: String,
        reason: Option<String>,
    },
    PremiumActivated {
        to: String,
        full_name: String,
        tier: Tier,
        expires_at: DateTime<Utc>,
    },
    PaymentRejected {
        to: String,
        full_name: String,
        reason: Option<String>,
    },
}

impl Email {
    pub fn recipient(&self) -> &str {
        match self {
            Self::ClaimApproved { to, .. }
            | Self::ClaimRejected { to, .. }
            | Self::PremiumActivated { to, .. }
            | Self::PaymentRejected { to, .. } => to,
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Self::ClaimApproved { .. } => "claim_approved",
            Self::ClaimRejected { .. } => "claim_rejected",
            Self::PremiumActivated { .. } => "premium_activated",
            Self::PaymentRejected { .. } => "payment_rejected",
        }
    }
}

// ── Dispatcher ────────────────────────────────────────────────

#[derive(Clone)]
pub struct SideEffects {
    notifier: Arc<dyn Notifier>,
    mailer: Arc<dyn Mailer>,
    cache: Arc<dyn CacheInvalidator>,
}

impl SideEffects {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        mailer: Arc<dyn Mailer>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            notifier,
            mailer,
            cache,
        }
    }

    pub async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            tracing::warn!(
                user_id = %notification.user_id,
                kind = notification.kind.as_str(),
                error = %e,
                "notification not delivered"
            );
        }
    }

    pub async fn email(&self, email: Email) {
        if let Err(e) = self.mailer.send(&email).await {
            tracing::warn!(
                template = email.template(),
                error = %e,
                "email not delivered"
            );
        }
    }

    pub async fn invalidate<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = path.as_ref();
            if let Err(e) = self.cache.invalidate(path).await {
                tracing::warn!(path, error = %e, "cache invalidation failed");
            }
        }
    }

    /// Paths touched by any claim transition on `business_id`.
    pub async fn invalidate_claim_paths(&self, business_id: &BusinessId) {
        self.invalidate([
            business_path(business_id),
            PATH_ADMIN_CLAIMS.to_string(),
            PATH_HOME.to_string(),
        ])
        .await;
    }
}
