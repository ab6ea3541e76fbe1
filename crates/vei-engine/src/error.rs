use std::fmt;

/// Errors from the store/trace/registry layer (section 7, AMBIENT error
/// hierarchy: "`vei_engine::Error` (wraps `vei_types::Error`,
/// `vei_providers::Error`) — store/trace/registry failures").
#[derive(Debug)]
pub enum Error {
    Types(vei_types::Error),
    Protocol(vei_providers::McpError),
    /// A scenario source file failed to parse (section 10, scenario
    /// compiler detail).
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Types(err) => write!(f, "{err}"),
            Error::Protocol(err) => write!(f, "{err}"),
            Error::Config(msg) => write!(f, "scenario source error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Types(err) => Some(err),
            Error::Protocol(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

impl From<vei_types::Error> for Error {
    fn from(err: vei_types::Error) -> Self {
        Error::Types(err)
    }
}

impl From<vei_providers::McpError> for Error {
    fn from(err: vei_providers::McpError) -> Self {
        Error::Protocol(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
