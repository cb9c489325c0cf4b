//! Error types for the inventory store.
//!
//! All errors are strongly typed using thiserror. Callers branch on
//! [`StoreError::kind`] (or the `is_*` helpers) rather than on message text,
//! and bulk imports keep every per-item failure inside [`BulkImportError`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Product fields that validation can reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    /// `id`
    Id,
    /// `name`
    Name,
    /// `price`
    Price,
    /// `quantity`
    Quantity,
}

impl ProductField {
    /// Wire/display name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Price => "price",
            Self::Quantity => "quantity",
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The offending value carried by an [`StoreError::Invalid`] error.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A string field (`id`, `name`).
    Text(String),
    /// `price`
    Number(f64),
    /// `quantity`
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Integer(n) => write!(f, "{n}"),
        }
    }
}

/// Discriminant of a [`StoreError`], for matching independent of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorKind {
    NotFound,
    Invalid,
    Duplicate,
    Cancelled,
    DeadlineExceeded,
    Io,
    Corrupt,
    Decode,
    Encode,
    Config,
    Bulk,
    Poisoned,
}

/// Errors produced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id.
    #[error("product not found: id={id}")]
    NotFound {
        /// The requested id.
        id: String,
    },

    /// A field failed validation. Only the first violation is reported.
    #[error("invalid product: field={field}, reason={reason}, value={value}")]
    Invalid {
        /// The offending field.
        field: ProductField,
        /// Why it was rejected.
        reason: String,
        /// The rejected value.
        value: FieldValue,
    },

    /// A record with this id already exists.
    #[error("duplicate product: id={id} already exists")]
    Duplicate {
        /// The conflicting id.
        id: String,
    },

    /// The context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The context's deadline passed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// Reading, writing or renaming a store file failed.
    #[error("storage I/O error at {}: {source}", .path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store file exists but is not a JSON array of products.
    #[error("malformed store file {}: {source}", .path.display())]
    Corrupt {
        /// The store file.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Import input is not valid JSON in a supported shape.
    #[error("cannot decode import input{}: {source}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Decode {
        /// 1-based line for line-oriented input.
        line: Option<usize>,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Products could not be serialized.
    #[error("cannot encode products: {source}")]
    Encode {
        /// Serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration or command input.
    #[error("configuration error: {message}")]
    Config {
        /// What is wrong.
        message: String,
    },

    /// A bulk import did not fully succeed.
    #[error("{0}")]
    Bulk(BulkImportError),

    /// A thread panicked while holding a store lock.
    #[error("poisoned lock: {context}")]
    Poisoned {
        /// Which lock.
        context: &'static str,
    },
}

impl StoreError {
    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub(crate) fn duplicate(id: impl Into<String>) -> Self {
        Self::Duplicate { id: id.into() }
    }

    pub(crate) fn invalid(field: ProductField, reason: impl Into<String>, value: FieldValue) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
            value,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    ///
    /// An interrupted bulk import reports its interruption kind, so
    /// cancellation wins over the per-item failures collected before it.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Invalid { .. } => ErrorKind::Invalid,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Io { .. } => ErrorKind::Io,
            Self::Corrupt { .. } => ErrorKind::Corrupt,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::Config { .. } => ErrorKind::Config,
            Self::Bulk(bulk) => match bulk.interrupted() {
                Some(Interruption::Cancelled) => ErrorKind::Cancelled,
                Some(Interruption::DeadlineExceeded) => ErrorKind::DeadlineExceeded,
                None => ErrorKind::Bulk,
            },
            Self::Poisoned { .. } => ErrorKind::Poisoned,
        }
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.kind() == ErrorKind::Invalid
    }

    /// Returns true if this is a duplicate-id error.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::Duplicate
    }

    /// Returns true if the operation stopped because its context was
    /// cancelled or its deadline passed.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled | ErrorKind::DeadlineExceeded)
    }

    /// Returns the aggregated bulk-import error, if this is one.
    #[must_use]
    pub fn as_bulk(&self) -> Option<&BulkImportError> {
        match self {
            Self::Bulk(bulk) => Some(bulk),
            _ => None,
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Why a bulk import stopped before every record was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// The context was cancelled.
    Cancelled,
    /// The context's deadline passed.
    DeadlineExceeded,
}

/// A record of a bulk import that was rejected.
#[derive(Debug)]
pub struct ItemFailure {
    /// Position of the record in the submitted batch.
    pub index: usize,
    /// Id of the rejected record (may be empty when the id itself was invalid).
    pub id: String,
    /// Why the record was rejected.
    pub error: StoreError,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={}: {}", self.id, self.error)
    }
}

/// Aggregated outcome of a bulk import that did not fully succeed.
///
/// The batch is not atomic: `imported()` records were committed even though
/// this error was returned.
#[derive(Debug, Default)]
pub struct BulkImportError {
    failures: Vec<ItemFailure>,
    imported: usize,
    skipped: usize,
    interrupted: Option<Interruption>,
    persist: Option<Box<StoreError>>,
}

impl BulkImportError {
    pub(crate) fn new(
        mut failures: Vec<ItemFailure>,
        imported: usize,
        skipped: usize,
        interrupted: Option<Interruption>,
        persist: Option<StoreError>,
    ) -> Self {
        failures.sort_by_key(|f| f.index);
        Self {
            failures,
            imported,
            skipped,
            interrupted,
            persist: persist.map(Box::new),
        }
    }

    /// Per-record failures, in batch order.
    #[must_use]
    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    /// Number of records committed to the store.
    #[must_use]
    pub const fn imported(&self) -> usize {
        self.imported
    }

    /// Number of records never processed because the import was interrupted.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Why the import stopped early, if it did.
    #[must_use]
    pub const fn interrupted(&self) -> Option<Interruption> {
        self.interrupted
    }

    /// The error raised while saving the batch, if any.
    #[must_use]
    pub fn persist_error(&self) -> Option<&StoreError> {
        self.persist.as_deref()
    }

    /// Number of per-record failures of the given kind.
    #[must_use]
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.failures.iter().filter(|f| f.error.kind() == kind).count()
    }
}

impl fmt::Display for BulkImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.interrupted {
            Some(Interruption::Cancelled) => f.write_str("bulk import cancelled")?,
            Some(Interruption::DeadlineExceeded) => f.write_str("bulk import deadline exceeded")?,
            None => f.write_str("bulk import failed")?,
        }
        write!(
            f,
            " ({} imported, {} failed, {} not processed)",
            self.imported,
            self.failures.len(),
            self.skipped
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{failure}")?;
        }
        if let Some(persist) = &self.persist {
            write!(f, "; save failed: {persist}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BulkImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.persist
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = StoreError::not_found("prod-123");
        assert_eq!(err.to_string(), "product not found: id=prod-123");
        assert!(err.is_not_found());
        assert!(!err.is_duplicate());
    }

    #[test]
    fn test_invalid_message() {
        let err = StoreError::invalid(ProductField::Price, "must be non-negative", FieldValue::Number(-10.5));
        assert_eq!(
            err.to_string(),
            "invalid product: field=price, reason=must be non-negative, value=-10.5"
        );
        let StoreError::Invalid { field, reason, .. } = &err else {
            panic!("expected Invalid, got {err:?}");
        };
        assert_eq!(*field, ProductField::Price);
        assert_eq!(reason, "must be non-negative");
    }

    #[test]
    fn test_duplicate_message() {
        let err = StoreError::duplicate("prod-001");
        assert_eq!(err.to_string(), "duplicate product: id=prod-001 already exists");
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn test_kinds_are_not_confused() {
        let errs = [
            StoreError::not_found("a"),
            StoreError::invalid(ProductField::Name, "cannot be empty", FieldValue::Text(String::new())),
            StoreError::duplicate("b"),
        ];
        let kinds: Vec<_> = errs.iter().map(StoreError::kind).collect();
        assert_eq!(kinds, vec![ErrorKind::NotFound, ErrorKind::Invalid, ErrorKind::Duplicate]);
        assert!(!errs[0].is_invalid() && !errs[0].is_duplicate());
        assert!(!errs[1].is_not_found() && !errs[1].is_duplicate());
        assert!(!errs[2].is_not_found() && !errs[2].is_invalid());
    }

    #[test]
    fn test_decode_message_includes_line() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::Decode { line: Some(3), source };
        assert!(err.to_string().contains("at line 3"));
    }

    #[test]
    fn test_bulk_error_keeps_every_failure() {
        let bulk = BulkImportError::new(
            vec![
                ItemFailure { index: 4, id: "x".into(), error: StoreError::duplicate("x") },
                ItemFailure {
                    index: 1,
                    id: "y".into(),
                    error: StoreError::invalid(ProductField::Quantity, "must be non-negative", FieldValue::Integer(-1)),
                },
            ],
            3,
            0,
            None,
            None,
        );
        assert_eq!(bulk.failures()[0].index, 1);
        assert_eq!(bulk.count(ErrorKind::Duplicate), 1);
        assert_eq!(bulk.count(ErrorKind::Invalid), 1);

        let err = StoreError::Bulk(bulk);
        assert_eq!(err.kind(), ErrorKind::Bulk);
        let msg = err.to_string();
        assert!(msg.contains("3 imported, 2 failed"));
        assert!(msg.contains("id=x: duplicate product"));
    }

    #[test]
    fn test_interrupted_bulk_reports_cancellation_kind() {
        let bulk = BulkImportError::new(
            vec![ItemFailure { index: 0, id: "x".into(), error: StoreError::duplicate("x") }],
            0,
            7,
            Some(Interruption::Cancelled),
            None,
        );
        let err = StoreError::Bulk(bulk);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.is_cancellation());
        assert_eq!(err.as_bulk().unwrap().count(ErrorKind::Duplicate), 1);
        assert!(err.to_string().starts_with("bulk import cancelled"));
    }
}
