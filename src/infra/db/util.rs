use crate::application::repos::{RepoError, StoreError};

/// SQLSTATE for `insufficient_privilege`, raised by missing grants and
/// row-level security policies.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("invalid input syntax") => {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

pub fn map_store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code();
            match code.as_deref() {
                Some(INSUFFICIENT_PRIVILEGE) => StoreError::PermissionDenied {
                    message: db.message().to_string(),
                },
                other => StoreError::classify(other, db.message()),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::unavailable(err.to_string())
        }
        other => StoreError::classify(None, other.to_string()),
    }
}
