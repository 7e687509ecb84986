use thiserror::Error;

/// Basic library error type
#[derive(Debug, Error)]
pub enum Error {
    /// IO error (missing or unreadable file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Allocation failure while loading a resource
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Malformed configuration content
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration value of the wrong shape
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging bootstrap error
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Error result type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify an error raised while reading `path` from disk
    pub(crate) fn from_read(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::OutOfMemory => {
                Error::ResourceExhausted(format!("{}: {}", path.display(), err))
            },
            kind => Error::Io(std::io::Error::new(
                kind,
                format!("{}: {}", path.display(), err),
            )),
        }
    }
}
