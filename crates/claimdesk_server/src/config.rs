//! Server configuration, read once from the environment at startup.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CLAIMDESK_DATABASE_URL` | unset: in-memory backend |
//! | `CLAIMDESK_JWT_SECRET` | required |
//! | `CLAIMDESK_BIND_ADDR` | `0.0.0.0:4200` |
//! | `CLAIMDESK_MAX_CONNECTIONS` | `10` |
//! | `CLAIMDESK_REVALIDATE_URL` | unset: invalidations are only logged |
//! | `CLAIMDESK_CLAIM_WRITE_MODE` | `resilient` |
//! | `CLAIMDESK_MAX_BUSINESSES_{STANDARD,GROWTH,GOLD}` | `1` |

use claimdesk_core::{ClaimWriteMode, EngineConfig};
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4200";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub revalidate_url: Option<String>,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret =
            get("CLAIMDESK_JWT_SECRET").ok_or(ConfigError::Missing("CLAIMDESK_JWT_SECRET"))?;

        let mut engine = EngineConfig::default();
        if let Some(mode) = get("CLAIMDESK_CLAIM_WRITE_MODE") {
            engine.claim_write_mode =
                ClaimWriteMode::from_str(&mode).ok_or(ConfigError::Invalid {
                    var: "CLAIMDESK_CLAIM_WRITE_MODE",
                    value: mode,
                })?;
        }
        if let Some(n) = parse(&get, "CLAIMDESK_MAX_BUSINESSES_STANDARD")? {
            engine.tier_limits.standard = n;
        }
        if let Some(n) = parse(&get, "CLAIMDESK_MAX_BUSINESSES_GROWTH")? {
            engine.tier_limits.growth = n;
        }
        if let Some(n) = parse(&get, "CLAIMDESK_MAX_BUSINESSES_GOLD")? {
            engine.tier_limits.gold = n;
        }

        Ok(Self {
            database_url: get("CLAIMDESK_DATABASE_URL"),
            jwt_secret,
            bind_addr: get("CLAIMDESK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            max_connections: parse(&get, "CLAIMDESK_MAX_CONNECTIONS")?
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            revalidate_url: get("CLAIMDESK_REVALIDATE_URL"),
            engine,
        })
    }
}

fn parse<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn secret_is_required() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::Missing("CLAIMDESK_JWT_SECRET")
        );
        assert!(config(&[("CLAIMDESK_JWT_SECRET", "  ")]).is_err());
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("CLAIMDESK_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.revalidate_url, None);
        assert_eq!(cfg.engine, EngineConfig::default());
    }

    #[test]
    fn engine_overrides() {
        let cfg = config(&[
            ("CLAIMDESK_JWT_SECRET", "s3cret"),
            ("CLAIMDESK_CLAIM_WRITE_MODE", "Strict"),
            ("CLAIMDESK_MAX_BUSINESSES_GOLD", "5"),
            ("CLAIMDESK_MAX_CONNECTIONS", "20"),
        ])
        .unwrap();
        assert_eq!(cfg.engine.claim_write_mode, ClaimWriteMode::Strict);
        assert_eq!(cfg.engine.tier_limits.gold, 5);
        assert_eq!(cfg.engine.tier_limits.growth, 1);
        assert_eq!(cfg.max_connections, 20);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = config(&[
            ("CLAIMDESK_JWT_SECRET", "s3cret"),
            ("CLAIMDESK_MAX_BUSINESSES_GROWTH", "many"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "CLAIMDESK_MAX_BUSINESSES_GROWTH",
                value: "many".into()
            }
        );
    }
}
