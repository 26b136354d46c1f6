use std::fmt;
use std::future::Future;
use std::time::Duration;

#[derive(Debug)]
pub enum RepositoryError {
    NotFound(String),
    AlreadyExists(String),
    ValidationError(String),
    DatabaseError(String),
    ConnectionError(String),
    Timeout(String),
    /// Write conflict inside a transaction; the whole unit may be retried.
    Transient(String),
    SerializationError(String),
    /// Generic error that wraps any error implementing std::error::Error
    Generic(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RepositoryError::AlreadyExists(msg) => write!(f, "Already Exists: {}", msg),
            RepositoryError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            RepositoryError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            RepositoryError::ConnectionError(msg) => write!(f, "Connection Error: {}", msg),
            RepositoryError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            RepositoryError::Transient(msg) => write!(f, "Transient: {}", msg),
            RepositoryError::SerializationError(msg) => write!(f, "Serialization Error: {}", msg),
            RepositoryError::Generic(err) => write!(f, "Repository Error: {}", err),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::Generic(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

// Convenient constructors
impl RepositoryError {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        RepositoryError::NotFound(msg.into())
    }

    pub fn already_exists<T: Into<String>>(msg: T) -> Self {
        RepositoryError::AlreadyExists(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        RepositoryError::ValidationError(msg.into())
    }

    pub fn database<T: Into<String>>(msg: T) -> Self {
        RepositoryError::DatabaseError(msg.into())
    }

    pub fn connection<T: Into<String>>(msg: T) -> Self {
        RepositoryError::ConnectionError(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        RepositoryError::Timeout(msg.into())
    }

    pub fn transient<T: Into<String>>(msg: T) -> Self {
        RepositoryError::Transient(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        RepositoryError::SerializationError(msg.into())
    }

    pub fn generic<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepositoryError::Generic(Box::new(err))
    }

    /// Connection failures, timeouts and transaction write conflicts may succeed on retry;
    /// constraint violations never do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RepositoryError::ConnectionError(_) | RepositoryError::Timeout(_) | RepositoryError::Transient(_)
        )
    }
}

/// Runs a storage future with an upper bound on its duration.
pub async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::timeout(format!(
            "{} did not complete within {}ms",
            operation,
            limit.as_millis()
        ))),
    }
}

// MongoDB-specific conversions
const DUPLICATE_KEY: i32 = 11000;
const WRITE_CONFLICT: i32 = 112;

/// Maps a server-side failure by its error code. The message is only consulted when the
/// server did not report a code.
pub(crate) fn classify_server_error(code: Option<i32>, transient: bool, detail: String) -> RepositoryError {
    match code {
        Some(DUPLICATE_KEY) => RepositoryError::AlreadyExists(format!("Duplicate key: {}", detail)),
        Some(WRITE_CONFLICT) => RepositoryError::Transient(format!("Write conflict: {}", detail)),
        _ if transient => RepositoryError::Transient(format!("Transient transaction error: {}", detail)),
        None if detail.contains("E11000") => RepositoryError::AlreadyExists(format!("Duplicate key: {}", detail)),
        _ => RepositoryError::DatabaseError(format!("Write error: {}", detail)),
    }
}

impl From<mongodb::error::Error> for RepositoryError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR};

        let transient = err.contains_label(TRANSIENT_TRANSACTION_ERROR);
        match err.kind.as_ref() {
            ErrorKind::Command(command) => classify_server_error(Some(command.code), transient, err.to_string()),
            ErrorKind::Write(WriteFailure::WriteError(write)) => {
                classify_server_error(Some(write.code), transient, err.to_string())
            }
            ErrorKind::Write(_) => classify_server_error(None, transient, err.to_string()),
            ErrorKind::Authentication { .. } => {
                RepositoryError::ConnectionError(format!("Authentication failed: {}", err))
            }
            ErrorKind::ServerSelection { .. } => {
                RepositoryError::ConnectionError(format!("Server selection failed: {}", err))
            }
            ErrorKind::InvalidArgument { .. } => {
                RepositoryError::ValidationError(format!("Invalid argument: {}", err))
            }
            ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } => {
                RepositoryError::ConnectionError(format!("IO error: {}", err))
            }
            _ if transient => RepositoryError::Transient(format!("Transient transaction error: {}", err)),
            _ => RepositoryError::Generic(Box::new(err)),
        }
    }
}

// BSON serialization errors

impl From<bson::ser::Error> for RepositoryError {
    fn from(err: bson::ser::Error) -> Self {
        RepositoryError::SerializationError(format!("BSON serialization error: {}", err))
    }
}

impl From<bson::de::Error> for RepositoryError {
    fn from(err: bson::de::Error) -> Self {
        RepositoryError::SerializationError(format!("BSON deserialization error: {}", err))
    }
}

// Result type alias for convenience
pub type RepositoryResult<T> = Result<T, RepositoryError>;
