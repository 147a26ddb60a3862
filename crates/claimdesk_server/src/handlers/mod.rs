pub mod businesses;
pub mod claims;
pub mod health;
pub mod payments;
pub mod premium;
pub mod reports;
pub mod reviews;
pub mod users;

use axum::Extension;
use serde::Deserialize;
use uuid::Uuid;

use claimdesk_core::{AdminError, Session};

/// Session established by the JWT middleware, if any.
pub type Caller = Option<Extension<Session>>;

pub(crate) fn session(caller: &Caller) -> Option<&Session> {
    caller.as_ref().map(|Extension(s)| s)
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, AdminError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AdminError::Invalid(format!("Invalid {what} id.")))
}

/// Optional free-text reason carried by reject endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: Option<String>,
}
