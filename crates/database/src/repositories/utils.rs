use services::common::RepositoryError;
use tokio_postgres::error::{DbError, SqlState};
use tracing::debug;

/// Translate a tokio_postgres error into the repository error taxonomy.
pub fn map_db_error(err: tokio_postgres::Error) -> RepositoryError {
    if err.is_closed() {
        return RepositoryError::ConnectionFailed("connection closed unexpectedly".to_string());
    }

    match err.as_db_error() {
        Some(db_err) => map_sql_state(db_err),
        None => RepositoryError::DatabaseError(err.into()),
    }
}

fn map_sql_state(db_err: &DbError) -> RepositoryError {
    let message = db_err.message().to_string();

    match db_err.code() {
        &SqlState::UNIQUE_VIOLATION => {
            // Both the pending-email partial index and the token column land
            // here; the constraint name tells them apart in the logs.
            debug!(
                constraint = db_err.constraint().unwrap_or("unknown"),
                "Unique constraint violated"
            );
            RepositoryError::AlreadyExists
        }
        &SqlState::FOREIGN_KEY_VIOLATION => RepositoryError::ForeignKeyViolation(message),
        &SqlState::NOT_NULL_VIOLATION => RepositoryError::RequiredFieldMissing(message),
        &SqlState::CHECK_VIOLATION => RepositoryError::ValidationFailed(message),
        &SqlState::RESTRICT_VIOLATION => RepositoryError::DependencyExists(message),

        &SqlState::T_R_SERIALIZATION_FAILURE | &SqlState::T_R_DEADLOCK_DETECTED => {
            RepositoryError::TransactionConflict
        }

        &SqlState::INVALID_PASSWORD | &SqlState::INVALID_AUTHORIZATION_SPECIFICATION => {
            RepositoryError::AuthenticationFailed
        }
        &SqlState::CONNECTION_EXCEPTION
        | &SqlState::CONNECTION_DOES_NOT_EXIST
        | &SqlState::CONNECTION_FAILURE
        | &SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
        | &SqlState::ADMIN_SHUTDOWN
        | &SqlState::CANNOT_CONNECT_NOW => RepositoryError::ConnectionFailed(message),

        code => RepositoryError::DatabaseError(anyhow::anyhow!(
            "unhandled sql state {}: {}",
            code.code(),
            message
        )),
    }
}
