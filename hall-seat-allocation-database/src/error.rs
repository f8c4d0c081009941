use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool;
use hall_seat_allocation_core::{HallError, StorageError};
use thiserror::Error;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to create database pool {0}")]
    PoolBuild(#[from] deadpool::BuildError),
    #[error("Database pool failed {0}")]
    Pool(#[from] deadpool::PoolError),
    #[error("Database query failed {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Database row is inconsistent: {0}")]
    Corrupt(String),
}

// SQLSTATE 22001, which diesel reports without a kind of its own
const VALUE_TOO_LONG: &str = "value too long";

/// Statements rejected because of what the caller sent, not because storage failed.
fn rejected_input(error: &DieselError) -> Option<String> {
    match error {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::ForeignKeyViolation
            | DatabaseErrorKind::CheckViolation
            | DatabaseErrorKind::NotNullViolation,
            info,
        ) => Some(info.message().to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::Unknown, info)
            if info.message().starts_with(VALUE_TOO_LONG) =>
        {
            Some(info.message().to_owned())
        }
        _ => None,
    }
}

impl From<DatabaseError> for HallError {
    fn from(value: DatabaseError) -> Self {
        if let DatabaseError::Database(error) = &value {
            if let Some(message) = rejected_input(error) {
                return Self::Validation(message);
            }
        }
        match value {
            // no statement was sent
            DatabaseError::PoolBuild(_) | DatabaseError::Pool(_) => {
                Self::Storage(StorageError::unreachable(value))
            }
            DatabaseError::Database(_) | DatabaseError::Corrupt(_) => {
                Self::Storage(StorageError::new(value))
            }
        }
    }
}

/// Error of a transaction body: domain errors roll back just like database errors.
#[derive(Error, Debug)]
pub(crate) enum TransactionError {
    #[error(transparent)]
    Domain(HallError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<DieselError> for TransactionError {
    fn from(value: DieselError) -> Self {
        Self::Database(value.into())
    }
}

impl From<TransactionError> for HallError {
    fn from(value: TransactionError) -> Self {
        match value {
            TransactionError::Domain(err) => err,
            TransactionError::Database(err) => err.into(),
        }
    }
}
