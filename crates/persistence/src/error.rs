//! Mapping from `sqlx` errors to domain store errors.

use domain::errors::StoreError;

/// Converts a database error into a [`StoreError`].
///
/// Unique violations (`23505`) become `Conflict`, which the alert lifecycle
/// relies on when the open-alert index rejects a duplicate. Foreign key
/// violations (`23503`) become `NotFound`.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".into()),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") => StoreError::Conflict(db_err.message().to_string()),
            Some("23503") => StoreError::NotFound(db_err.message().to_string()),
            _ => StoreError::Database(db_err.to_string()),
        },
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::InvalidData(format!("column {}: {}", index, source))
        }
        sqlx::Error::Decode(source) => StoreError::InvalidData(source.to_string()),
        other => StoreError::Database(other.to_string()),
    }
}
