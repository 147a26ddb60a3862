//! claimdesk_postgres: PostgreSQL adapters for the claimdesk_core ports.

pub mod error;
pub mod outbox;
mod rows;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use claimdesk_core::ports::{CacheInvalidator, Ports};

pub use outbox::{PgEmailOutbox, PgNotifier};
pub use store::{
    PgAssignmentStore, PgAuditStore, PgBusinessStore, PgClaimStore, PgEntitlementProcedure,
    PgPaymentStore, PgProfileStore, PgReviewStore,
};

/// Schema, including the `toggle_user_premium` function.
pub const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")
}

/// Applies [`INIT_SQL`]. Every statement is idempotent.
pub async fn apply_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::raw_sql(INIT_SQL)
        .execute(pool)
        .await
        .context("failed to apply claimdesk schema")?;
    Ok(())
}

/// Every Postgres adapter over one pool.
#[derive(Clone)]
pub struct PgStores {
    pool: PgPool,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cache invalidation is not a database concern; the caller supplies it.
    pub fn into_ports(self, cache: Arc<dyn CacheInvalidator>) -> Ports {
        let pool = self.pool;
        Ports {
            profiles: Arc::new(PgProfileStore::new(pool.clone())),
            businesses: Arc::new(PgBusinessStore::new(pool.clone())),
            assignments: Arc::new(PgAssignmentStore::new(pool.clone())),
            claims: Arc::new(PgClaimStore::new(pool.clone())),
            payments: Arc::new(PgPaymentStore::new(pool.clone())),
            reviews: Arc::new(PgReviewStore::new(pool.clone())),
            entitlements: Arc::new(PgEntitlementProcedure::new(pool.clone())),
            audit: Arc::new(PgAuditStore::new(pool.clone())),
            notifier: Arc::new(PgNotifier::new(pool.clone())),
            mailer: Arc::new(PgEmailOutbox::new(pool)),
            cache,
        }
    }
}
