//! Fine-grained admin permissions.
//!
//! An admin profile carries an access level and optional extra grants.
//! Levels expand to fixed permission sets; `*` grants everything.
//!
//! | level | permissions |
//! |-------|-------------|
//! | super_admin | all |
//! | admin_ops | panel, settings, user.suspend, business.delete, all bulk moderation, payment.verify, premium.manage, claim.review |
//! | moderator | panel, review/report/claim bulk moderation, claim.review |
//! | analyst | panel |
//! | support | panel, user.suspend, report bulk moderation |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Role;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAccessLevel {
    SuperAdmin,
    AdminOps,
    Moderator,
    Analyst,
    Support,
}

impl AdminAccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::AdminOps => "admin_ops",
            Self::Moderator => "moderator",
            Self::Analyst => "analyst",
            Self::Support => "support",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "super_admin" => Some(Self::SuperAdmin),
            "admin_ops" => Some(Self::AdminOps),
            "moderator" => Some(Self::Moderator),
            "analyst" => Some(Self::Analyst),
            "support" => Some(Self::Support),
            _ => None,
        }
    }

    /// Unknown or missing levels predate the column and are full admins.
    pub fn normalize(value: Option<&str>) -> Self {
        value.and_then(Self::from_str).unwrap_or(Self::SuperAdmin)
    }

    pub fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Self::SuperAdmin => Permission::ALL,
            Self::AdminOps => &[
                PanelAccess,
                SettingsWrite,
                MaintenanceToggle,
                UserSuspend,
                BusinessDelete,
                ReviewBulk,
                BusinessBulk,
                ReportBulk,
                ClaimBulk,
                PaymentVerify,
                PremiumManage,
                ClaimReview,
            ],
            Self::Moderator => &[PanelAccess, ReviewBulk, ReportBulk, ClaimBulk, ClaimReview],
            Self::Analyst => &[PanelAccess],
            Self::Support => &[PanelAccess, UserSuspend, ReportBulk],
        }
    }
}

impl std::fmt::Display for AdminAccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "admin.panel.access")]
    PanelAccess,
    #[serde(rename = "settings.write")]
    SettingsWrite,
    #[serde(rename = "settings.maintenance.toggle")]
    MaintenanceToggle,
    #[serde(rename = "user.role.manage")]
    UserRoleManage,
    #[serde(rename = "user.suspend")]
    UserSuspend,
    #[serde(rename = "user.delete")]
    UserDelete,
    #[serde(rename = "business.delete")]
    BusinessDelete,
    #[serde(rename = "moderation.review.bulk")]
    ReviewBulk,
    #[serde(rename = "moderation.business.bulk")]
    BusinessBulk,
    #[serde(rename = "moderation.report.bulk")]
    ReportBulk,
    #[serde(rename = "moderation.claim.bulk")]
    ClaimBulk,
    #[serde(rename = "payment.verify")]
    PaymentVerify,
    #[serde(rename = "premium.manage")]
    PremiumManage,
    #[serde(rename = "claim.review")]
    ClaimReview,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Self::PanelAccess,
        Self::SettingsWrite,
        Self::MaintenanceToggle,
        Self::UserRoleManage,
        Self::UserSuspend,
        Self::UserDelete,
        Self::BusinessDelete,
        Self::ReviewBulk,
        Self::BusinessBulk,
        Self::ReportBulk,
        Self::ClaimBulk,
        Self::PaymentVerify,
        Self::PremiumManage,
        Self::ClaimReview,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::PanelAccess => "admin.panel.access",
            Self::SettingsWrite => "settings.write",
            Self::MaintenanceToggle => "settings.maintenance.toggle",
            Self::UserRoleManage => "user.role.manage",
            Self::UserSuspend => "user.suspend",
            Self::UserDelete => "user.delete",
            Self::BusinessDelete => "business.delete",
            Self::ReviewBulk => "moderation.review.bulk",
            Self::BusinessBulk => "moderation.business.bulk",
            Self::ReportBulk => "moderation.report.bulk",
            Self::ClaimBulk => "moderation.claim.bulk",
            Self::PaymentVerify => "payment.verify",
            Self::PremiumManage => "premium.manage",
            Self::ClaimReview => "claim.review",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.key() == key)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Stored fine-grained admin columns of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAccess {
    pub role: Option<Role>,
    pub access_level: Option<String>,
    pub extra_permissions: Vec<String>,
}

/// Resolved permission set. Keys are kept as strings so grants unknown to
/// this build (and the wildcard) survive resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    keys: BTreeSet<String>,
}

impl PermissionSet {
    /// Non-admins resolve to the empty set.
    pub fn resolve(access: &AdminAccess) -> Self {
        let mut keys = BTreeSet::new();
        if access.role != Some(Role::Admin) {
            return Self { keys };
        }
        let level = AdminAccessLevel::normalize(access.access_level.as_deref());
        keys.extend(level.permissions().iter().map(|p| p.key().to_string()));
        keys.extend(
            access
                .extra_permissions
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        );
        Self { keys }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.keys.contains(WILDCARD) || self.keys.contains(permission.key())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
