use sea_orm::{DbBackend, DbErr, RuntimeErr};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PublishError {
    /// Store unreachable or a statement failed
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Lesson {0} not found")]
    LessonNotFound(Uuid),

    #[error("Term {0} not found")]
    TermNotFound(Uuid),

    /// Lesson row breaks a content rule and cannot go live
    #[error("Lesson {lesson_id} cannot be published: {reason}")]
    InvalidLesson { lesson_id: Uuid, reason: String },
}

impl PublishError {
    /// The store refused a lock held by a concurrent transaction
    pub fn is_lock_contention(&self, backend: DbBackend) -> bool {
        match self {
            PublishError::Database(e) => is_lock_contention(e, backend),
            _ => false,
        }
    }
}

/// SQLite `BUSY` or `LOCKED` (any extended code), or a serialization failure,
/// deadlock or lock timeout on the server backends
pub fn is_lock_contention(e: &DbErr, backend: DbBackend) -> bool {
    let runtime = match e {
        DbErr::Conn(r) | DbErr::Exec(r) | DbErr::Query(r) => r,
        _ => return false,
    };
    let RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)) = runtime else {
        return false;
    };
    let Some(code) = db_err.code() else {
        return false;
    };

    match backend {
        DbBackend::Sqlite => code
            .parse::<i32>()
            .is_ok_and(|code| matches!(code & 0xff, 5 | 6)),
        DbBackend::Postgres => matches!(code.as_ref(), "40001" | "40P01" | "55P03"),
        DbBackend::MySql => code == "40001",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_contention() {
        let err = PublishError::LessonNotFound(Uuid::new_v4());
        assert!(!err.is_lock_contention(DbBackend::Sqlite));

        let err = PublishError::Database(DbErr::Custom("database is locked".to_string()));
        assert!(!err.is_lock_contention(DbBackend::Sqlite));
    }
}
