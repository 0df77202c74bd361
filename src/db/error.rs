use thiserror::Error;
use uuid::Uuid;

pub type DbResult<T> = Result<T, DatabaseError>;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Escalation entry {0} is no longer pending")]
    StaleEntry(Uuid),

    #[error("Conflicting state: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl DatabaseError {
    /// Maps unique-constraint violations to `Duplicate`, everything else to `Sqlx`.
    pub fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::Duplicate(what.to_string())
            }
            _ => DatabaseError::Sqlx(err),
        }
    }

    /// True for errors caused by another actor winning a race.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DatabaseError::Duplicate(_) | DatabaseError::StaleEntry(_) | DatabaseError::Conflict(_)
        )
    }
}
