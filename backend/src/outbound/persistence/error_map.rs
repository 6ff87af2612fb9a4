//! Shared translation from pool and Diesel errors into port error types.
//!
//! Every port error enum exposes `connection` and `query` constructors, so the
//! adapters hand those in and share one classification of what counts as a
//! connection failure versus a query failure.

use diesel::result::Error as DieselError;

use super::pool::PoolError;

/// Map a pool error into a port connection error.
pub(crate) fn map_pool_error<E>(error: PoolError, connection: fn(String) -> E) -> E {
    tracing::debug!(%error, "database pool error");
    connection(error.to_string())
}

/// Map a Diesel execution error into a port error.
///
/// Connection-level failures become connection errors; everything else,
/// including `NotFound` leaking past an `.optional()`, is a query error.
pub(crate) fn map_diesel_error<E>(
    error: DieselError,
    query: fn(String) -> E,
    connection: fn(String) -> E,
) -> E {
    tracing::debug!(%error, "diesel execution error");
    match error {
        DieselError::BrokenTransactionManager | DieselError::AlreadyInTransaction => {
            connection(error.to_string())
        }
        DieselError::DatabaseError(diesel::result::DatabaseErrorKind::ClosedConnection, info) => {
            connection(info.message().to_owned())
        }
        other => query(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::CourseStoreError;

    #[rstest]
    fn pool_errors_map_to_connection() {
        let mapped = map_pool_error(
            PoolError::checkout("timed out"),
            CourseStoreError::connection,
        );
        assert!(matches!(mapped, CourseStoreError::Connection { .. }));
    }

    #[rstest]
    fn not_found_maps_to_query() {
        let mapped = map_diesel_error(
            DieselError::NotFound,
            CourseStoreError::query,
            CourseStoreError::connection,
        );
        assert!(matches!(mapped, CourseStoreError::Query { .. }));
    }

    #[rstest]
    fn broken_transaction_maps_to_connection() {
        let mapped = map_diesel_error(
            DieselError::BrokenTransactionManager,
            CourseStoreError::query,
            CourseStoreError::connection,
        );
        assert!(matches!(mapped, CourseStoreError::Connection { .. }));
    }
}
