use std::path::PathBuf;

/// Top-level error type for modelgate.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate provider name: {0}")]
    DuplicateProvider(String),
}

/// Failure of a single provider call.
///
/// These are recorded into the provider's `last_error` by the dispatcher and
/// the health prober; they never escape a dispatch walk on their own.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network failure or provider-side timeout.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Non-2xx response. The body is kept verbatim.
    #[error("API error ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transport is closed")]
    TransportClosed,

    #[error("not configured")]
    NotConfigured,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::MalformedResponse(e.to_string())
        } else if e.is_timeout() {
            ProviderError::Unavailable(format!("timed out: {e}"))
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }
}

/// Errors surfaced by [`crate::Dispatcher::dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No providers configured")]
    NotConfigured,

    #[error("All providers exhausted (last error: {})", last_error.as_deref().unwrap_or("none"))]
    AllProvidersExhausted { last_error: Option<String> },

    #[error("Router is closed")]
    Closed,
}

impl DispatchError {
    /// Whether the fallback responder may stand in for this error.
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            DispatchError::AllProvidersExhausted { .. } | DispatchError::NotConfigured
        )
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_display_with_and_without_error() {
        let e = DispatchError::AllProvidersExhausted {
            last_error: Some("API error (500): boom".into()),
        };
        assert_eq!(
            e.to_string(),
            "All providers exhausted (last error: API error (500): boom)"
        );

        let e = DispatchError::AllProvidersExhausted { last_error: None };
        assert_eq!(e.to_string(), "All providers exhausted (last error: none)");
    }

    #[test]
    fn test_is_exhaustion() {
        assert!(DispatchError::NotConfigured.is_exhaustion());
        assert!(DispatchError::AllProvidersExhausted { last_error: None }.is_exhaustion());
        assert!(!DispatchError::InvalidRequest("x".into()).is_exhaustion());
        assert!(!DispatchError::Closed.is_exhaustion());
    }

    #[test]
    fn test_gateway_error_from_dispatch() {
        let e: GatewayError = DispatchError::NotConfigured.into();
        assert!(matches!(e, GatewayError::Dispatch(DispatchError::NotConfigured)));
        assert_eq!(e.to_string(), "Dispatch error: No providers configured");
    }

    #[test]
    fn test_not_configured_provider_text() {
        assert_eq!(ProviderError::NotConfigured.to_string(), "not configured");
    }
}
