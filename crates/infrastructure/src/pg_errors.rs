use scolaris_core::AppError;

/// Maps an insert error, turning unique-constraint violations into
/// `Conflict` and everything else into `Internal`.
pub(crate) fn map_insert_error(error: sqlx::Error, conflict_message: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.is_unique_violation()
    {
        return AppError::Conflict(conflict_message.to_owned());
    }

    AppError::Internal(format!("database insert failed: {error}"))
}

/// Maps a general query error into `Internal` with context.
pub(crate) fn map_query_error(error: sqlx::Error, context: &str) -> AppError {
    AppError::Internal(format!("{context}: {error}"))
}

/// Error for a version-checked update that matched no row: the row was
/// either removed or modified concurrently since it was loaded.
pub(crate) fn stale_write(entity: &str) -> AppError {
    AppError::ConcurrencyConflict(format!("{entity} was modified concurrently"))
}
