use std::fmt;

/// A typed protocol-level error (section 4.6, "MUST raise a typed
/// `MCPError(code, message)` for protocol violations"; section 7's full
/// taxonomy of protocol/resource/fault/identity/service-desk error codes).
/// Domain errors never become an `McpError` — they are returned inline as
/// `DomainError` values wrapped in `Ok(..)`.
#[derive(Debug, Clone)]
pub struct McpError {
    pub code: String,
    pub message: String,
}

impl McpError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unknown_tool(tool: &str) -> Self {
        Self::new("unknown_tool", format!("no such tool: {tool}"))
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new("invalid_args", message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new("permission_denied", message)
    }

    pub fn unsupported_tool(tool: &str) -> Self {
        Self::new("unsupported_tool", format!("tool not supported here: {tool}"))
    }

    pub fn unknown_channel(channel: &str) -> Self {
        Self::new("unknown_channel", format!("no such channel: {channel}"))
    }

    pub fn unknown_message(ts: &str) -> Self {
        Self::new("unknown_message", format!("no such message: {ts}"))
    }

    pub fn invalid_action(message: impl Into<String>) -> Self {
        Self::new("invalid_action", message)
    }

    pub fn fault_injected() -> Self {
        Self::new("fault.injected", "simulated fault injected")
    }

    pub fn okta_user_not_found(id: &str) -> Self {
        Self::new("okta.user_not_found", format!("no such user: {id}"))
    }

    pub fn okta_invalid_state(message: impl Into<String>) -> Self {
        Self::new("okta.invalid_state", message)
    }

    pub fn okta_group_not_found(id: &str) -> Self {
        Self::new("okta.group_not_found", format!("no such group: {id}"))
    }

    pub fn okta_app_not_found(id: &str) -> Self {
        Self::new("okta.app_not_found", format!("no such application: {id}"))
    }

    pub fn servicedesk_incident_not_found(id: &str) -> Self {
        Self::new("servicedesk.incident_not_found", format!("no such incident: {id}"))
    }

    pub fn servicedesk_request_not_found(id: &str) -> Self {
        Self::new("servicedesk.request_not_found", format!("no such request: {id}"))
    }
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for McpError {}

impl From<vei_types::Error> for McpError {
    fn from(err: vei_types::Error) -> Self {
        McpError::new("internal_error", err.to_string())
    }
}
