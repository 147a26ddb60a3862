//! Table-backed notification and email collaborators.
//!
//! In-app notifications land in `notifications`; emails are queued in
//! `email_outbox` for a delivery worker outside this process.

use async_trait::async_trait;
use sqlx::PgPool;

use claimdesk_core::error::SideEffectError;
use claimdesk_core::ports::{Mailer, Notifier};
use claimdesk_core::side_effects::{Email, Notification};

pub struct PgNotifier {
    pool: PgPool,
}

impl PgNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), SideEffectError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, type, title, message, link)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.link)
        .execute(&self.pool)
        .await
        .map_err(|e| SideEffectError::Notification(e.to_string()))?;
        Ok(())
    }
}

pub struct PgEmailOutbox {
    pool: PgPool,
}

impl PgEmailOutbox {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Mailer for PgEmailOutbox {
    async fn send(&self, email: &Email) -> Result<(), SideEffectError> {
        let payload =
            serde_json::to_value(email).map_err(|e| SideEffectError::Email(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO email_outbox (template, recipient, payload)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(email.template())
        .bind(email.recipient())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| SideEffectError::Email(e.to_string()))?;
        tracing::debug!(template = email.template(), "email queued");
        Ok(())
    }
}
