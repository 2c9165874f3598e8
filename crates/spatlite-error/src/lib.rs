use thiserror::Error;

/// Primary error type for spatlite operations.
///
/// Structured variants for the conditions callers branch on; a diagnostic
/// string only where the condition originates in the host storage engine.
/// Malformed geometry BLOBs are deliberately NOT represented here: the
/// codec returns "no value" for those, and callers translate that into an
/// absent/null result.
#[derive(Error, Debug)]
pub enum SpatError {
    /// The owning table does not exist.
    #[error("no such table: {name}")]
    NoSuchTable { name: String },

    /// The (table, column) pair is not registered in the geometry-columns
    /// catalog.
    #[error("column {table}.{column} is not a registered geometry column")]
    ColumnNotRegistered { table: String, column: String },

    /// The metadata catalog does not match any supported dialect, so
    /// maintenance operations refuse to proceed rather than guess.
    #[error("spatial metadata layout is unknown or ambiguous")]
    DialectUnknown,

    /// The detected dialect does not support the requested operation.
    #[error("operation not supported under the {dialect} metadata layout")]
    DialectUnsupported { dialect: &'static str },

    /// EnableIndexing on a column that already carries an index.
    #[error("spatial index already enabled for {table}.{column}")]
    AlreadyIndexed { table: String, column: String },

    /// An index operation on a column with no index enabled.
    #[error("no spatial index enabled for {table}.{column}")]
    NotIndexed { table: String, column: String },

    /// The host storage engine failed during a scan or rewrite. Surfaced
    /// distinctly from a real mismatch; any open transaction is aborted.
    #[error("storage error: {detail}")]
    Storage { detail: String },

    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SpatError {
    /// Create a storage error.
    pub fn storage(detail: impl Into<String>) -> Self {
        Self::Storage {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error originated in the host storage engine, as opposed
    /// to a precondition the caller violated.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Result type alias using [`SpatError`].
pub type Result<T> = std::result::Result<T, SpatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = SpatError::NoSuchTable {
            name: "roads".to_owned(),
        };
        assert_eq!(err.to_string(), "no such table: roads");

        let err = SpatError::ColumnNotRegistered {
            table: "roads".to_owned(),
            column: "geom".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "column roads.geom is not a registered geometry column"
        );

        let err = SpatError::storage("disk I/O error");
        assert_eq!(err.to_string(), "storage error: disk I/O error");
    }

    #[test]
    fn storage_classification() {
        assert!(SpatError::storage("x").is_storage());
        assert!(!SpatError::DialectUnknown.is_storage());
        assert!(!SpatError::internal("bug").is_storage());
    }
}
