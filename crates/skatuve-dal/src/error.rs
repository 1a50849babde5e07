use crate::update::UpdateError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Cannot connect to database: {0}")]
    ConnectionError(#[source] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(#[from] UpdateError),

    #[error("Updated document is not valid: {0}")]
    InvalidDocument(String),

    #[error("Field {0} cannot be modified")]
    ImmutableField(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Stored document is corrupted: {0}")]
    CorruptedDocument(#[from] serde_json::Error),
}

impl From<garde::Report> for Error {
    fn from(report: garde::Report) -> Self {
        Error::ValidationError(report.to_string())
    }
}

// primary SQLite result codes meaning the database file itself is unusable
const SQLITE_IOERR: i32 = 10;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_NOTADB: i32 = 26;

fn is_store_unreachable(err: &dyn sqlx::error::DatabaseError) -> bool {
    err.code()
        .and_then(|code| code.parse::<i32>().ok())
        // extended codes carry the primary code in the low byte
        .is_some_and(|code| matches!(code & 0xff, SQLITE_IOERR | SQLITE_CANTOPEN | SQLITE_NOTADB))
}

impl Error {
    /// Errors after which the cached pool should not be trusted anymore.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::ConnectionError(_) => true,
            Error::DatabaseError(sqlx::Error::Database(db)) => is_store_unreachable(&**db),
            Error::DatabaseError(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }

    /// Failure to open the pool. A malformed connection string stays a
    /// configuration problem.
    pub(crate) fn into_connection_error(self) -> Self {
        match self {
            Error::DatabaseError(e) if !matches!(e, sqlx::Error::Configuration(_)) => {
                Error::ConnectionError(e)
            }
            other => other,
        }
    }

    /// Errors caused by the caller's input rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ValidationError(_)
                | Error::InvalidUpdate(_)
                | Error::InvalidDocument(_)
                | Error::ImmutableField(_)
        )
    }
}
