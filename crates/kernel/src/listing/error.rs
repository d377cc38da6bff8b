//! Listing pipeline errors.

use thiserror::Error;

/// Errors raised while building, executing, or shaping a listing.
///
/// Every variant aborts the whole pipeline call; nothing is recovered
/// internally and no partial page is returned.
#[derive(Debug, Error)]
pub enum ListError {
    /// The `sort` parameter does not parse as `<field>|<direction>`.
    #[error("malformed sort directive: '{0}'")]
    MalformedSort(String),

    /// An edit rule targets a derived (formula-backed) field.
    #[error("cannot edit derived field '{0}'")]
    DerivedFieldEdit(String),

    /// An add rule targets a field already occupied by a value or a loaded relation.
    #[error("column '{0}' already exists")]
    ColumnAlreadyExists(String),

    /// A table or column name is not safe to interpolate into SQL.
    #[error("unsafe identifier: '{0}'")]
    UnsafeIdentifier(String),

    /// The storage layer has no column by this name.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Query execution failed in the storage layer.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A row returned by the storage layer could not be decoded.
    #[error("failed to decode row")]
    Decode(#[from] serde_json::Error),
}

impl ListError {
    /// Whether the error was caused by the inbound request rather than
    /// server configuration or storage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedSort(_) | Self::UnsafeIdentifier(_) | Self::UnknownField(_)
        )
    }
}
