use std::fmt;

/// Errors that can occur during object storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// The requested object was not found.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The identifier does not name an object of this store.
    InvalidIdentifier(String),
    /// The folder or file name offered for a new object is unusable.
    InvalidName(String),
    /// The object exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// The remote backend rejected or failed the request.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "object not found: {id}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidIdentifier(msg) => write!(f, "invalid object identifier: {msg}"),
            Self::InvalidName(msg) => write!(f, "invalid object name: {msg}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "object exceeds size limit ({actual} > {limit} bytes)")
            }
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
