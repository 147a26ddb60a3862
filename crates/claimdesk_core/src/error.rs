use thiserror::Error;

/// Domain error taxonomy for every admin-facing operation.
///
/// Authorization and validation variants short-circuit before any write.
/// Recovered schema drift never surfaces here; a failed recovery surfaces the
/// original `StoreError`. Side-effect failures are logged, never returned.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("ownership limit reached: {current} of {max} business(es)")]
    LimitExceeded { max: usize, current: usize },

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("entitlement sync failed: {0}")]
    EntitlementSync(String),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl AdminError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden(_) => 403,
            Self::Invalid(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::LimitExceeded { .. } => 409,
            Self::VerificationFailed(_) => 500,
            Self::EntitlementSync(_) => 500,
            Self::Store(e) if e.kind == StoreErrorKind::Unavailable => 503,
            Self::Store(_) => 500,
        }
    }

    /// Message suitable for the `{status: "error", message}` contract.
    /// Store internals are not echoed back to callers.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Authentication required".into(),
            Self::Forbidden(msg)
            | Self::Invalid(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::VerificationFailed(msg) => msg.clone(),
            Self::LimitExceeded { max, .. } => format!(
                "This user already manages the maximum number of businesses allowed by their plan ({max})."
            ),
            Self::EntitlementSync(reason) => {
                format!("Failed to synchronize the subscription: {reason}")
            }
            Self::Store(_) => "A database error occurred. Please try again.".into(),
        }
    }
}

// ── StoreError ─────────────────────────────────────────────────

/// Classification of a backend failure, decided at the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Single-row read matched nothing.
    NoRows,
    /// Identifier could not be parsed by the backend (e.g. malformed uuid).
    InvalidId,
    /// Column unknown to the backend's schema cache.
    MissingColumn,
    /// Row returned but could not be mapped into a domain record.
    Decode,
    /// Backend unreachable or the pool timed out.
    Unavailable,
    Backend,
}

/// Structured backend error. `code` carries the backend's own error code
/// (`PGRST116`, SQLSTATE `42703`, ...) when one is known.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub code: Option<String>,
    pub message: String,
    pub table: Option<String>,
    pub column: Option<String>,
}

pub const NO_ROWS_CODE: &str = "PGRST116";
pub const INVALID_TEXT_REPRESENTATION: &str = "22P02";

impl StoreError {
    fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            table: None,
            column: None,
        }
    }

    pub fn no_rows(table: &str) -> Self {
        let mut e = Self::new(
            StoreErrorKind::NoRows,
            "JSON object requested, multiple (or no) rows returned",
        );
        e.code = Some(NO_ROWS_CODE.into());
        e.table = Some(table.into());
        e
    }

    pub fn invalid_id(value: &str) -> Self {
        let mut e = Self::new(
            StoreErrorKind::InvalidId,
            format!("invalid input syntax for type uuid: \"{value}\""),
        );
        e.code = Some(INVALID_TEXT_REPRESENTATION.into());
        e
    }

    /// Drift error in the shape the REST gateway reports it.
    pub fn missing_column(table: &str, column: &str) -> Self {
        Self {
            kind: StoreErrorKind::MissingColumn,
            code: Some(crate::schema_drift::PGRST_MISSING_COLUMN.into()),
            message: format!(
                "Could not find the '{column}' column of '{table}' in the schema cache"
            ),
            table: Some(table.into()),
            column: Some(column.into()),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Decode, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Backend, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// "No rows" class: by kind, by code, or by message for untyped backends.
    pub fn is_no_rows(&self) -> bool {
        self.kind == StoreErrorKind::NoRows
            || self.code.as_deref() == Some(NO_ROWS_CODE)
            || self.message.to_ascii_lowercase().contains("no rows")
    }

    /// "Invalid identifier format" class.
    pub fn is_invalid_id(&self) -> bool {
        self.kind == StoreErrorKind::InvalidId
            || self.code.as_deref() == Some(INVALID_TEXT_REPRESENTATION)
            || self
                .message
                .to_ascii_lowercase()
                .contains("invalid input syntax for type uuid")
    }
}

/// Failure of a best-effort collaborator (email, in-app notification, cache
/// invalidation). Logged by the caller and never returned to the admin.
#[derive(Debug, Error)]
pub enum SideEffectError {
    #[error("email delivery failed: {0}")]
    Email(String),

    #[error("notification insert failed: {0}")]
    Notification(String),

    #[error("cache invalidation failed for {path}: {reason}")]
    CacheInvalidation { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── http_status ──────────────────────────────────────────────

    #[test]
    fn http_status_unauthenticated() {
        assert_eq!(AdminError::Unauthenticated.http_status(), 401);
    }

    #[test]
    fn http_status_forbidden() {
        assert_eq!(AdminError::Forbidden("x".into()).http_status(), 403);
    }

    #[test]
    fn http_status_invalid() {
        assert_eq!(AdminError::Invalid("x".into()).http_status(), 400);
    }

    #[test]
    fn http_status_not_found() {
        assert_eq!(AdminError::NotFound("x".into()).http_status(), 404);
    }

    #[test]
    fn http_status_conflict_and_limit() {
        assert_eq!(AdminError::Conflict("x".into()).http_status(), 409);
        let limit = AdminError::LimitExceeded { max: 1, current: 1 };
        assert_eq!(limit.http_status(), 409);
    }

    #[test]
    fn http_status_hard_failures() {
        assert_eq!(AdminError::VerificationFailed("x".into()).http_status(), 500);
        assert_eq!(AdminError::EntitlementSync("x".into()).http_status(), 500);
        let store: AdminError = StoreError::backend("boom").into();
        assert_eq!(store.http_status(), 500);
        let down: AdminError = StoreError::unavailable("pool timed out").into();
        assert_eq!(down.http_status(), 503);
    }

    // ── Display / user_message ───────────────────────────────────

    #[test]
    fn display_limit_exceeded() {
        let e = AdminError::LimitExceeded { max: 1, current: 2 };
        assert_eq!(e.to_string(), "ownership limit reached: 2 of 1 business(es)");
    }

    #[test]
    fn store_errors_are_not_echoed() {
        let e: AdminError = StoreError::backend("relation \"profiles\" is locked").into();
        assert!(!e.user_message().contains("profiles"));
    }

    #[test]
    fn entitlement_message_carries_reason() {
        let e = AdminError::EntitlementSync("profile not found".into());
        assert!(e.user_message().contains("profile not found"));
    }

    // ── StoreError classes ───────────────────────────────────────

    #[test]
    fn no_rows_by_code_or_message() {
        assert!(StoreError::no_rows("premium_payments").is_no_rows());
        assert!(StoreError::backend("x").with_code("PGRST116").is_no_rows());
        assert!(StoreError::backend("query returned no rows").is_no_rows());
        assert!(!StoreError::backend("timeout").is_no_rows());
    }

    #[test]
    fn invalid_id_by_code_or_message() {
        assert!(StoreError::invalid_id("REF-9").is_invalid_id());
        assert!(StoreError::backend("x").with_code("22P02").is_invalid_id());
        assert!(StoreError::backend("invalid input syntax for type uuid: \"abc\"").is_invalid_id());
        assert!(!StoreError::no_rows("t").is_invalid_id());
    }

    #[test]
    fn missing_column_message_shape() {
        let e = StoreError::missing_column("premium_payments", "expires_at");
        assert_eq!(
            e.to_string(),
            "Could not find the 'expires_at' column of 'premium_payments' in the schema cache"
        );
        assert_eq!(e.column.as_deref(), Some("expires_at"));
    }
}
