//! Offline premium payments: resolution, verification, rejection, manual
//! entry and user submission.
//!
//! Verification writes the payment row first and then synchronizes the
//! entitlement. There is no transaction across the two: when the entitlement
//! call fails after the payment is marked verified, the gap is recorded in
//! the audit trail (`entitlement_sync: "failed"`) and the operation fails.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, Months, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditTrail, NewAuditEntry, TargetType};
use crate::config::EngineConfig;
use crate::entitlement::{EntitlementRequest, EntitlementSync};
use crate::error::{AdminError, StoreError};
use crate::gate::{AdminContext, AuthorizationGate, Session};
use crate::ports::{PaymentStore, Ports, ProfileStore};
use crate::schema_drift::{write_with_drift_retry, Column};
use crate::side_effects::{Email, Notification, SideEffects, PATH_ADMIN_PAYMENTS};
use crate::types::{BusinessId, Payment, PaymentStatus, Profile, Tier, UserId};
use crate::writes::{NewPayment, PaymentStatusWrite};

/// Version 1-5 UUID with the RFC 4122 variant.
static UUID_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("static regex")
});

pub fn is_uuid_like(identifier: &str) -> bool {
    UUID_LIKE.is_match(identifier)
}

/// Errors that mean "try the other key".
fn is_lookup_miss(err: &StoreError) -> bool {
    err.is_no_rows() || err.is_invalid_id()
}

/// Admin-entered payment that is verified on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPayment {
    pub user_email: String,
    pub amount: Decimal,
    pub reference: String,
    pub method: String,
    pub expiration_date: DateTime<Utc>,
    pub tier: Tier,
    #[serde(default)]
    pub notes: Option<String>,
}

/// User-submitted payment awaiting verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSubmission {
    pub reference: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub business_id: Option<BusinessId>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub target_tier: Option<Tier>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub payment_id: Uuid,
    pub user_id: UserId,
    pub message: String,
}

#[derive(Clone)]
pub struct PaymentVerificationEngine {
    gate: AuthorizationGate,
    payments: Arc<dyn PaymentStore>,
    profiles: Arc<dyn ProfileStore>,
    entitlement: EntitlementSync,
    effects: SideEffects,
    audit: AuditTrail,
    validity_months: u32,
}

impl PaymentVerificationEngine {
    pub fn new(ports: &Ports, config: &EngineConfig) -> Self {
        Self {
            gate: AuthorizationGate::new(ports.profiles.clone()),
            payments: ports.payments.clone(),
            profiles: ports.profiles.clone(),
            entitlement: EntitlementSync::new(ports.entitlements.clone()),
            effects: SideEffects::new(
                ports.notifier.clone(),
                ports.mailer.clone(),
                ports.cache.clone(),
            ),
            audit: AuditTrail::new(ports.audit.clone()),
            validity_months: config.payment_validity_months,
        }
    }

    /// Looks a payment up by id or by reference, whichever the identifier
    /// looks like first. `Ok(None)` when neither key matches.
    pub async fn resolve_payment(&self, identifier: &str) -> Result<Option<Payment>, AdminError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AdminError::Invalid("Payment identifier is required.".into()));
        }

        let by_id_first = is_uuid_like(identifier);
        let primary = if by_id_first {
            self.payments.get_payment_by_id(identifier).await
        } else {
            self.payments.get_payment_by_reference(identifier).await
        };
        match primary {
            Ok(payment) => return Ok(Some(payment)),
            Err(e) if is_lookup_miss(&e) => {}
            Err(e) => return Err(e.into()),
        }

        let secondary = if by_id_first {
            self.payments.get_payment_by_reference(identifier).await
        } else {
            self.payments.get_payment_by_id(identifier).await
        };
        match secondary {
            Ok(payment) => Ok(Some(payment)),
            Err(e) if is_lookup_miss(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn verify(
        &self,
        ctx: &AdminContext,
        identifier: &str,
        reason: Option<String>,
    ) -> Result<PaymentOutcome, AdminError> {
        let payment = self.load_pending(identifier).await?;
        let payer = self.load_payer(&payment).await?;
        let now = Utc::now();
        let expires_at = payment
            .expires_at
            .unwrap_or_else(|| self.default_expiry(now));

        self.gate.recheck(ctx).await?;

        let write = PaymentStatusWrite::verified(ctx.admin_id, now, expires_at);
        let recovered = self.write_status(payment.id, write).await?;

        let tier = payment.target_tier;
        let request = EntitlementRequest::grant(payment.user_id, tier, now, Some(expires_at));
        let receipt = match self.entitlement.toggle(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.audit
                    .record(NewAuditEntry::new(
                        ctx.admin_id,
                        AuditAction::VerifyPayment,
                        TargetType::Payment,
                        payment.id.to_string(),
                        json!({
                            "user_id": payment.user_id,
                            "reference": payment.reference,
                            "tier": tier,
                            "entitlement_sync": "failed",
                            "error": e.to_string(),
                        }),
                    ))
                    .await;
                return Err(e);
            }
        };

        if let Some((to, full_name)) = contact_of(&payer) {
            self.effects
                .email(Email::PremiumActivated {
                    to,
                    full_name,
                    tier,
                    expires_at,
                })
                .await;
        }
        self.effects
            .notify(Notification::payment_verified(
                payment.user_id,
                &payment.reference,
                tier,
            ))
            .await;

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                AuditAction::VerifyPayment,
                TargetType::Payment,
                payment.id.to_string(),
                json!({
                    "user_id": payment.user_id,
                    "business_id": payment.business_id,
                    "reference": payment.reference,
                    "tier": tier,
                    "expiration": expires_at,
                    "reason": reason,
                    "entitlement_sync": "ok",
                    "businesses_updated": receipt.businesses_updated,
                    "business_ids": receipt.business_ids,
                    "recovered_columns": recovered,
                }),
            ))
            .await;

        tracing::info!(payment_id = %payment.id, user_id = %payment.user_id, tier = tier.as_str(), "payment verified");
        Ok(PaymentOutcome {
            payment_id: payment.id,
            user_id: payment.user_id,
            message: "Payment verified and premium access granted.".into(),
        })
    }

    pub async fn reject(
        &self,
        ctx: &AdminContext,
        identifier: &str,
        reason: Option<String>,
    ) -> Result<PaymentOutcome, AdminError> {
        let payment = self.load_pending(identifier).await?;
        let payer = self.load_payer(&payment).await?;
        let reason = reason.filter(|r| !r.trim().is_empty());

        self.gate.recheck(ctx).await?;

        let write = PaymentStatusWrite::rejected(ctx.admin_id, Utc::now(), reason.clone());
        self.write_status(payment.id, write).await?;

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                AuditAction::RejectPayment,
                TargetType::Payment,
                payment.id.to_string(),
                json!({
                    "user_id": payment.user_id,
                    "reference": payment.reference,
                    "reason": reason,
                }),
            ))
            .await;

        if let Some((to, full_name)) = contact_of(&payer) {
            self.effects
                .email(Email::PaymentRejected {
                    to,
                    full_name,
                    reason: reason.clone(),
                })
                .await;
        }
        self.effects
            .notify(Notification::payment_rejected(
                payment.user_id,
                &payment.reference,
                reason.as_deref(),
            ))
            .await;

        tracing::info!(payment_id = %payment.id, "payment rejected");
        Ok(PaymentOutcome {
            payment_id: payment.id,
            user_id: payment.user_id,
            message: "Payment rejected.".into(),
        })
    }

    pub async fn add_manual_payment(
        &self,
        ctx: &AdminContext,
        input: ManualPayment,
    ) -> Result<PaymentOutcome, AdminError> {
        let email = input.user_email.trim();
        let reference = input.reference.trim();
        if email.is_empty() {
            return Err(AdminError::Invalid("User email is required.".into()));
        }
        if reference.is_empty() {
            return Err(AdminError::Invalid("Payment reference is required.".into()));
        }
        if input.amount.is_sign_negative() {
            return Err(AdminError::Invalid("Amount cannot be negative.".into()));
        }
        if !input.tier.is_paid() {
            return Err(AdminError::Invalid("A manual payment needs a paid tier.".into()));
        }

        let profile = self
            .profiles
            .find_profile_by_email(email)
            .await?
            .ok_or_else(|| AdminError::NotFound("No user found with this email.".into()))?;

        self.gate.recheck(ctx).await?;

        let now = Utc::now();
        let new_payment = NewPayment {
            id: Uuid::new_v4(),
            user_id: profile.id,
            business_id: profile.business_id.clone(),
            reference: reference.to_string(),
            method: non_blank(&input.method).unwrap_or("offline").to_string(),
            amount: input.amount,
            status: PaymentStatus::Verified,
            target_tier: input.tier,
            notes: input.notes.clone(),
            expires_at: Column::Write(input.expiration_date),
            verified_by: Some(ctx.admin_id),
            verified_at: Some(now),
        };
        let payments = &self.payments;
        let inserted = write_with_drift_retry(new_payment, |p: NewPayment| async move {
            payments.insert_payment(&p).await
        })
        .await?;
        let payment = inserted.value;

        let request =
            EntitlementRequest::grant(profile.id, input.tier, now, Some(input.expiration_date));
        let receipt = match self.entitlement.toggle(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.audit
                    .record(NewAuditEntry::new(
                        ctx.admin_id,
                        AuditAction::ManualPayment,
                        TargetType::Payment,
                        payment.id.to_string(),
                        json!({
                            "user_email": email,
                            "reference": reference,
                            "entitlement_sync": "failed",
                            "error": e.to_string(),
                        }),
                    ))
                    .await;
                return Err(e);
            }
        };

        self.audit
            .record(NewAuditEntry::new(
                ctx.admin_id,
                AuditAction::ManualPayment,
                TargetType::Payment,
                payment.id.to_string(),
                json!({
                    "user_email": email,
                    "amount": input.amount,
                    "reference": reference,
                    "tier": input.tier,
                    "expiration": input.expiration_date,
                    "entitlement_sync": "ok",
                    "businesses_updated": receipt.businesses_updated,
                    "recovered_columns": inserted.stripped,
                }),
            ))
            .await;

        self.effects
            .email(Email::PremiumActivated {
                to: email.to_string(),
                full_name: profile.display_name().to_string(),
                tier: input.tier,
                expires_at: input.expiration_date,
            })
            .await;
        self.effects
            .notify(Notification::subscription_activated(profile.id, input.tier))
            .await;
        self.effects.invalidate([PATH_ADMIN_PAYMENTS]).await;

        tracing::info!(payment_id = %payment.id, user_id = %profile.id, "manual payment recorded");
        Ok(PaymentOutcome {
            payment_id: payment.id,
            user_id: profile.id,
            message: format!(
                "Payment recorded and {} activated for {} until {}.",
                input.tier.as_str().to_uppercase(),
                profile.full_name.as_deref().unwrap_or(email),
                input.expiration_date.format("%d/%m/%Y")
            ),
        })
    }

    /// User-facing submission. One pending payment per user.
    pub async fn submit_payment(
        &self,
        session: Option<&Session>,
        input: PaymentSubmission,
    ) -> Result<PaymentOutcome, AdminError> {
        let session = session.ok_or(AdminError::Unauthenticated)?;
        let reference = input.reference.trim();
        if reference.is_empty() {
            return Err(AdminError::Invalid("Payment reference is required.".into()));
        }
        let target_tier = input.target_tier.unwrap_or(Tier::Gold);
        if !target_tier.is_paid() {
            return Err(AdminError::Invalid("The target tier must be a paid tier.".into()));
        }
        let amount = input.amount.unwrap_or(Decimal::ZERO);
        if amount.is_sign_negative() {
            return Err(AdminError::Invalid("Amount cannot be negative.".into()));
        }

        if self.payments.has_pending_payment(session.user_id).await? {
            return Err(AdminError::Conflict(
                "You already have a payment awaiting verification.".into(),
            ));
        }

        let new_payment = NewPayment {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            business_id: input.business_id.filter(|b| !b.trim().is_empty()),
            reference: reference.to_string(),
            method: input
                .method
                .as_deref()
                .and_then(non_blank)
                .unwrap_or("offline")
                .to_string(),
            amount,
            status: PaymentStatus::Pending,
            target_tier,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            expires_at: Column::Omitted,
            verified_by: None,
            verified_at: None,
        };
        let payment = self.payments.insert_payment(&new_payment).await?;

        tracing::info!(payment_id = %payment.id, user_id = %session.user_id, "payment submitted");
        Ok(PaymentOutcome {
            payment_id: payment.id,
            user_id: session.user_id,
            message: "Your payment reference has been submitted. An administrator will verify it shortly."
                .into(),
        })
    }

    // ── Helpers ───────────────────────────────────────────────

    async fn load_pending(&self, identifier: &str) -> Result<Payment, AdminError> {
        let payment = self
            .resolve_payment(identifier)
            .await
            .map_err(|e| match e {
                AdminError::Store(s) => AdminError::Invalid(format!("Could not read payment: {s}")),
                other => other,
            })?
            .ok_or_else(|| AdminError::NotFound("Payment not found.".into()))?;
        if payment.status != PaymentStatus::Pending {
            return Err(AdminError::Conflict(format!(
                "This payment has already been {}.",
                payment.status
            )));
        }
        Ok(payment)
    }

    async fn write_status(
        &self,
        payment_id: Uuid,
        write: PaymentStatusWrite,
    ) -> Result<Vec<&'static str>, AdminError> {
        let payments = &self.payments;
        let outcome = write_with_drift_retry(write, |w: PaymentStatusWrite| async move {
            payments.update_payment_status(payment_id, &w).await
        })
        .await?;
        if outcome.value == 0 {
            return Err(AdminError::Conflict(
                "This payment was already processed by another administrator.".into(),
            ));
        }
        Ok(outcome.stripped)
    }

    fn default_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_months(Months::new(self.validity_months))
            .unwrap_or_else(|| now + Duration::days(365))
    }

    /// The profile the payment belongs to. Missing means the entitlement
    /// grant cannot land, so nothing is written.
    async fn load_payer(&self, payment: &Payment) -> Result<Profile, AdminError> {
        self.profiles
            .get_profile(payment.user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(payment_id = %payment.id, user_id = %payment.user_id, "payment owner has no profile");
                AdminError::NotFound("The user behind this payment no longer exists.".into())
            })
    }
}

/// Email and display name for best-effort messages.
fn contact_of(profile: &Profile) -> Option<(String, String)> {
    let email = profile.email.as_deref().and_then(non_blank)?.to_string();
    Some((email, profile.display_name().to_string()))
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_like_requires_version_and_variant() {
        assert!(is_uuid_like("6f1c2b8e-3d4a-4b5c-8d9e-0a1b2c3d4e5f"));
        assert!(is_uuid_like("6F1C2B8E-3D4A-4B5C-9D9E-0A1B2C3D4E5F"));
        // version 0
        assert!(!is_uuid_like("6f1c2b8e-3d4a-0b5c-8d9e-0a1b2c3d4e5f"));
        // variant c
        assert!(!is_uuid_like("6f1c2b8e-3d4a-4b5c-cd9e-0a1b2c3d4e5f"));
        assert!(!is_uuid_like("REF-9"));
        assert!(!is_uuid_like(""));
    }

    #[test]
    fn lookup_miss_classes() {
        assert!(is_lookup_miss(&StoreError::no_rows("premium_payments")));
        assert!(is_lookup_miss(&StoreError::invalid_id("REF-9")));
        assert!(!is_lookup_miss(&StoreError::unavailable("pool timed out")));
    }

    #[test]
    fn submission_defaults_deserialize() {
        let sub: PaymentSubmission =
            serde_json::from_value(serde_json::json!({ "reference": "VIR-2291" })).unwrap();
        assert_eq!(sub.target_tier, None);
        assert_eq!(sub.amount, None);
    }
}
