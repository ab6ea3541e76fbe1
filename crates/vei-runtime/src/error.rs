use std::fmt;

/// Result type for vei-runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The router-level error surface (section 7, AMBIENT error hierarchy:
/// "`vei_runtime::Error` (wraps `vei_engine::Error`, `vei_providers::Error`,
/// adds `Config`, `NotInitialized`)"). `vei-sdk` re-exports this type.
#[derive(Debug)]
pub enum Error {
    /// Engine-layer failure (store, trace, registry, drift, scorer).
    Engine(vei_engine::Error),
    /// A provider raised a typed protocol error outside a normal call
    /// dispatch (e.g. during scenario construction).
    Provider(vei_providers::McpError),
    /// IO operation failed.
    Io(std::io::Error),
    /// Configuration failed to load, parse, or resolve.
    Config(String),
    /// The router was used before `Router::new` finished constructing its
    /// providers and registry.
    NotInitialized(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Engine(err) => write!(f, "engine error: {err}"),
            Error::Provider(err) => write!(f, "provider error: {err}"),
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::NotInitialized(msg) => write!(f, "runtime not initialized: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Engine(err) => Some(err),
            Error::Provider(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Config(_) | Error::NotInitialized(_) => None,
        }
    }
}

impl From<vei_engine::Error> for Error {
    fn from(err: vei_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<vei_providers::McpError> for Error {
    fn from(err: vei_providers::McpError) -> Self {
        Error::Provider(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Reports a best-effort I/O failure to stderr without panicking or
/// bubbling the error up (section 6, AMBIENT Logging: "a single `fn warn`
/// helper ... prints to stderr, never panics, never bubbles up").
pub fn warn(ctx: &str, err: &dyn std::error::Error) {
    eprintln!("vei-runtime: {ctx}: {err}");
}
