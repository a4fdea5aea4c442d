use rusqlite::ffi;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

/// Storage errors. Constraint failures raised by the engine are classified
/// so callers can tell a bad request from a broken database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("unique constraint failed: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint failed: {0}")]
    ForeignKeyViolation(String),

    #[error("not null constraint failed: {0}")]
    NotNullViolation(String),

    #[error("invalid {column}: {reason}")]
    Validation { column: &'static str, reason: String },

    #[error("remote database error: {0}")]
    Remote(String),

    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),
}

impl DbError {
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            Self::UniqueViolation(_) | Self::ForeignKeyViolation(_) | Self::NotNullViolation(_)
        )
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        let rusqlite::Error::SqliteFailure(code, message) = &err else {
            return Self::Sqlite(err);
        };
        let detail = message.clone().unwrap_or_else(|| code.to_string());
        match code.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                Self::UniqueViolation(detail)
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKeyViolation(detail),
            ffi::SQLITE_CONSTRAINT_NOTNULL => Self::NotNullViolation(detail),
            _ => Self::Sqlite(err),
        }
    }
}
