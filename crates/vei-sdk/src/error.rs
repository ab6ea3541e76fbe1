use std::fmt;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The SDK-level error surface: a thin wrapper around `vei_runtime::Error`
/// plus the two failure modes specific to this facade (a scenario file
/// that can't be found, and inputs the caller passed that don't parse).
#[derive(Debug)]
pub enum Error {
    /// A scenario or trace file path did not exist or could not be read.
    NotFound(String),
    /// Invalid input parameters (e.g. a malformed `vei.inject` payload).
    InvalidInput(String),
    /// Error from the underlying runtime layer.
    Runtime(vei_runtime::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "not found: {msg}"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::Runtime(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Runtime(err) => Some(err),
            Error::NotFound(_) | Error::InvalidInput(_) => None,
        }
    }
}

impl From<vei_runtime::Error> for Error {
    fn from(err: vei_runtime::Error) -> Self {
        Error::Runtime(err)
    }
}
