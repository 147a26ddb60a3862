//! Engine tunables. Read once at startup and passed to `AdminService::new`.

use serde::{Deserialize, Serialize};

use crate::types::Tier;

/// Maximum number of businesses a non-admin may control, per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierLimits {
    pub standard: usize,
    pub growth: usize,
    pub gold: usize,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            standard: 1,
            growth: 1,
            gold: 1,
        }
    }
}

impl TierLimits {
    pub fn max_for(&self, tier: Tier) -> usize {
        match tier {
            Tier::Standard => self.standard,
            Tier::Growth => self.growth,
            Tier::Gold => self.gold,
        }
    }
}

/// How the final claim status write reacts to schema drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimWriteMode {
    /// Drift on a review column fails the transition.
    Strict,
    /// Review columns are shed on drift and the transition still completes.
    #[default]
    Resilient,
}

impl ClaimWriteMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "resilient" => Some(Self::Resilient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tier_limits: TierLimits,
    pub claim_write_mode: ClaimWriteMode,
    /// Validity of a verified payment without its own expiry.
    pub payment_validity_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tier_limits: TierLimits::default(),
            claim_write_mode: ClaimWriteMode::default(),
            payment_validity_months: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_one_business_per_tier() {
        let limits = TierLimits::default();
        assert_eq!(limits.max_for(Tier::Standard), 1);
        assert_eq!(limits.max_for(Tier::Gold), 1);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: EngineConfig = serde_json::from_value(serde_json::json!({
            "tier_limits": { "gold": 5 },
            "claim_write_mode": "strict"
        }))
        .unwrap();
        assert_eq!(cfg.tier_limits.gold, 5);
        assert_eq!(cfg.tier_limits.growth, 1);
        assert_eq!(cfg.claim_write_mode, ClaimWriteMode::Strict);
        assert_eq!(cfg.payment_validity_months, 12);
    }
}
