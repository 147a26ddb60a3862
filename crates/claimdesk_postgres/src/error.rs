//! sqlx error classification at the adapter boundary.

use std::sync::LazyLock;

use regex::Regex;

use claimdesk_core::error::{StoreError, StoreErrorKind, INVALID_TEXT_REPRESENTATION};
use claimdesk_core::schema_drift::UNDEFINED_COLUMN;

static UNDEFINED_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"column "([^"]+)"(?: of relation "([^"]+)")?"#)
        .expect("valid regex")
});

/// Maps a sqlx error raised while touching `table` into a classified
/// `StoreError`.
pub fn map_sqlx(err: sqlx::Error, table: &str) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::no_rows(table),
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned());
            let message = db.message().to_string();
            match code.as_deref() {
                Some(UNDEFINED_COLUMN) => undefined_column(&message, table),
                Some(INVALID_TEXT_REPRESENTATION) => StoreError {
                    kind: StoreErrorKind::InvalidId,
                    code,
                    message,
                    table: Some(table.to_string()),
                    column: None,
                },
                Some(c) => StoreError::backend(message).with_code(c),
                None => StoreError::backend(message),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::unavailable(err.to_string())
        }
        sqlx::Error::Decode(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_) => StoreError::decode(err.to_string()),
        other => StoreError::backend(other.to_string()),
    }
}

/// `column "x" of relation "t" does not exist`, or just `column "x" does
/// not exist` for reads. The relation falls back to the table queried.
fn undefined_column(message: &str, table: &str) -> StoreError {
    let (column, relation) = match UNDEFINED_COLUMN_RE.captures(message) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().to_string()),
            caps.get(2).map(|m| m.as_str().to_string()),
        ),
        None => (None, None),
    };
    StoreError {
        kind: StoreErrorKind::MissingColumn,
        code: Some(UNDEFINED_COLUMN.to_string()),
        message: message.to_string(),
        table: Some(relation.unwrap_or_else(|| table.to_string())),
        column,
    }
}
