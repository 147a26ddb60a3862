//! Schema drift guard.
//!
//! The backing store's schema cache can lag behind the real schema, so a write
//! naming a freshly added column may fail with "column not found". This module
//! classifies that failure and retries the write with a reduced payload.
//!
//! | Step | Behaviour |
//! |------|-----------|
//! | classify | structured code (`PGRST204`, SQLSTATE `42703`) + column/table fields first, message fallback |
//! | strip | only columns the payload declares optional, each at most once |
//! | retry | until success or no strippable column remains |
//! | fail | the ORIGINAL error propagates, never a retry's |

use std::future::Future;

use crate::error::{StoreError, StoreErrorKind};

/// REST gateway code for a column missing from its schema cache.
pub const PGRST_MISSING_COLUMN: &str = "PGRST204";
/// Postgres SQLSTATE `undefined_column`.
pub const UNDEFINED_COLUMN: &str = "42703";

// ── Pure predicates ───────────────────────────────────────────

pub fn has_schema_cache_signal(message: &str) -> bool {
    message.to_lowercase().contains("schema cache")
}

/// True when the message quotes the column, in underscored or hyphenated form.
pub fn mentions_column(message: &str, column: &str) -> bool {
    let message = message.to_lowercase();
    let column = column.to_lowercase();
    let hyphenated = column.replace('_', "-");
    [column.as_str(), hyphenated.as_str()].iter().any(|c| {
        message.contains(&format!("\"{c}\"")) || message.contains(&format!("'{c}'"))
    })
}

/// True when no table is given, or the message mentions it.
pub fn mentions_table(message: &str, table: Option<&str>) -> bool {
    match table {
        None | Some("") => true,
        Some(t) => message.to_lowercase().contains(&t.to_lowercase()),
    }
}

fn has_drift_code(err: &StoreError) -> bool {
    err.kind == StoreErrorKind::MissingColumn
        || matches!(
            err.code.as_deref(),
            Some(PGRST_MISSING_COLUMN) | Some(UNDEFINED_COLUMN)
        )
}

/// Classifies `err` as "column `column` (of `table`) is missing".
pub fn is_missing_column_error(err: &StoreError, column: &str, table: Option<&str>) -> bool {
    if has_drift_code(err) {
        if let Some(found) = err.column.as_deref() {
            let table_matches = match (table, err.table.as_deref()) {
                (Some(want), Some(got)) => want.eq_ignore_ascii_case(got),
                _ => true,
            };
            return found.eq_ignore_ascii_case(column) && table_matches;
        }
        // Coded but unstructured: Postgres phrases it as
        // `column "x" of relation "t" does not exist`.
        return mentions_column(&err.message, column) && mentions_table(&err.message, table);
    }

    has_schema_cache_signal(&err.message)
        && mentions_column(&err.message, column)
        && mentions_table(&err.message, table)
}

// ── Payload contract ──────────────────────────────────────────

/// A single column of a write payload: either written (possibly with NULL
/// via `Write(None)` on an `Option` type) or left out of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column<T> {
    Write(T),
    Omitted,
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Self::Omitted
    }
}

impl<T> Column<T> {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Write(_))
    }

    pub fn as_written(&self) -> Option<&T> {
        match self {
            Self::Write(v) => Some(v),
            Self::Omitted => None,
        }
    }

    /// Drops the column, returning whether it was present.
    pub fn omit(&mut self) -> bool {
        let was_written = self.is_written();
        *self = Self::Omitted;
        was_written
    }
}

/// Write payload that can shed optional columns when the store reports them
/// missing.
pub trait DriftTolerant {
    fn table(&self) -> &'static str;

    fn optional_columns(&self) -> &'static [&'static str];

    /// Removes an optional column from the payload. Returns false when the
    /// column is required or already absent.
    fn strip_column(&mut self, column: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriftOutcome<T> {
    pub value: T,
    /// Columns removed before the write succeeded, in strip order.
    pub stripped: Vec<&'static str>,
}

impl<T> DriftOutcome<T> {
    pub fn recovered(&self) -> bool {
        !self.stripped.is_empty()
    }
}

/// Runs `write` with the full payload, then with optional columns stripped
/// one at a time for as long as the store keeps reporting them missing.
pub async fn write_with_drift_retry<P, T, F, Fut>(
    payload: P,
    mut write: F,
) -> Result<DriftOutcome<T>, StoreError>
where
    P: DriftTolerant + Clone,
    F: FnMut(P) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let original = match write(payload.clone()).await {
        Ok(value) => {
            return Ok(DriftOutcome {
                value,
                stripped: Vec::new(),
            })
        }
        Err(e) => e,
    };

    let table = payload.table();
    let mut current = payload;
    let mut stripped: Vec<&'static str> = Vec::new();
    let mut last = original.clone();

    loop {
        let candidate = current
            .optional_columns()
            .iter()
            .copied()
            .filter(|c| !stripped.contains(c))
            .find(|c| is_missing_column_error(&last, c, Some(table)));

        let Some(column) = candidate else {
            return Err(original);
        };
        if !current.strip_column(column) {
            return Err(original);
        }
        stripped.push(column);

        tracing::warn!(
            table,
            column,
            error = %last,
            "column missing from schema cache, retrying write without it"
        );

        match write(current.clone()).await {
            Ok(value) => return Ok(DriftOutcome { value, stripped }),
            Err(e) => last = e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct DraftWrite {
        required: Column<i32>,
        extra: Column<i32>,
        note: Column<i32>,
    }

    impl DriftTolerant for DraftWrite {
        fn table(&self) -> &'static str {
            "drafts"
        }
        fn optional_columns(&self) -> &'static [&'static str] {
            &["extra", "note"]
        }
        fn strip_column(&mut self, column: &str) -> bool {
            match column {
                "extra" => self.extra.omit(),
                "note" => self.note.omit(),
                _ => false,
            }
        }
    }

    fn draft() -> DraftWrite {
        DraftWrite {
            required: Column::Write(1),
            extra: Column::Write(2),
            note: Column::Write(3),
        }
    }

    #[test]
    fn message_fallback_needs_all_signals() {
        let msg = "Could not find the 'expires_at' column of 'premium_payments' in the schema cache";
        let err = StoreError::backend(msg);
        assert!(is_missing_column_error(&err, "expires_at", Some("premium_payments")));
        assert!(is_missing_column_error(&err, "expires_at", None));
        assert!(!is_missing_column_error(&err, "expires_at", Some("profiles")));
        assert!(!is_missing_column_error(&err, "verified_at", None));

        let no_cache = StoreError::backend("column 'expires_at' is read-only");
        assert!(!is_missing_column_error(&no_cache, "expires_at", None));
    }

    #[test]
    fn hyphenated_column_matches() {
        let err = StoreError::backend("Could not find the \"expires-at\" column in the schema cache");
        assert!(is_missing_column_error(&err, "expires_at", None));
    }

    #[test]
    fn structured_fields_win_over_message() {
        let mut err = StoreError::missing_column("business_claims", "reviewed_by");
        err.message = "unrelated text".into();
        assert!(is_missing_column_error(&err, "reviewed_by", Some("business_claims")));
        assert!(!is_missing_column_error(&err, "rejection_reason", Some("business_claims")));
        assert!(!is_missing_column_error(&err, "reviewed_by", Some("profiles")));
    }

    #[test]
    fn sqlstate_without_fields_reads_postgres_phrasing() {
        let err = StoreError::backend(
            "column \"admin_access_level\" of relation \"profiles\" does not exist",
        )
        .with_code(UNDEFINED_COLUMN);
        assert!(is_missing_column_error(&err, "admin_access_level", Some("profiles")));
    }

    #[tokio::test]
    async fn success_first_try_strips_nothing() {
        let out = write_with_drift_retry(draft(), |_p| async { Ok::<_, StoreError>(7) })
            .await
            .unwrap();
        assert_eq!(out.value, 7);
        assert!(!out.recovered());
    }

    #[tokio::test]
    async fn strips_reported_column_once_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let out = write_with_drift_retry(draft(), |p: DraftWrite| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if p.extra.is_written() {
                    Err(StoreError::missing_column("drafts", "extra"))
                } else {
                    Ok(p.note.as_written().copied())
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.stripped, vec!["extra"]);
        assert_eq!(out.value, Some(3));
    }

    #[tokio::test]
    async fn failing_retry_returns_original_error() {
        let calls = AtomicUsize::new(0);
        let err = write_with_drift_retry(draft(), |p: DraftWrite| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err::<(), _>(StoreError::missing_column("drafts", "extra"))
                } else {
                    let _ = p;
                    Err(StoreError::backend("connection reset"))
                }
            }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.column.as_deref(), Some("extra"));
    }

    #[tokio::test]
    async fn required_column_is_never_stripped() {
        let calls = AtomicUsize::new(0);
        let err = write_with_drift_retry(draft(), |p: DraftWrite| {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = p.required;
            async { Err::<(), _>(StoreError::missing_column("drafts", "required")) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.column.as_deref(), Some("required"));
    }

    #[tokio::test]
    async fn each_optional_column_stripped_at_most_once() {
        let calls = AtomicUsize::new(0);
        let result = write_with_drift_retry(draft(), |p: DraftWrite| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if p.extra.is_written() {
                    Err::<(), _>(StoreError::missing_column("drafts", "extra"))
                } else {
                    Err(StoreError::missing_column("drafts", "note"))
                }
            }
        })
        .await;
        // full payload, without extra, without extra+note
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn classifier_never_matches_without_cache_signal(
            column in "[a-z]{1,8}(_[a-z]{1,8}){0,2}",
            noise in "[a-z ]{0,30}",
        ) {
            prop_assume!(!noise.contains("schema cache"));
            let err = StoreError::backend(format!("{noise} '{column}' {noise}"));
            prop_assert!(!is_missing_column_error(&err, &column, None));
        }

        #[test]
        fn classifier_matches_either_quote_and_form(
            column in "[a-z]{1,8}(_[a-z]{1,8}){0,2}",
            double in any::<bool>(),
            hyphen in any::<bool>(),
        ) {
            let shown = if hyphen { column.replace('_', "-") } else { column.clone() };
            let quoted = if double { format!("\"{shown}\"") } else { format!("'{shown}'") };
            let err = StoreError::backend(format!(
                "Could not find the {quoted} column of 'things' in the schema cache"
            ));
            prop_assert!(is_missing_column_error(&err, &column, Some("things")));
        }
    }
}
