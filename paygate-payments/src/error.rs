//! Error types for gateway operations

use std::fmt;
use thiserror::Error;

/// Maximum number of bytes of a raw provider payload kept on a protocol error.
const FRAGMENT_LIMIT: usize = 512;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Request rejected before any network I/O
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The adapter does not implement the operation
    #[error("Operation {operation} is not supported by {gateway}")]
    Unsupported {
        gateway: &'static str,
        operation: &'static str,
    },

    /// Network, TLS or cancellation failure
    #[error("Transport error ({cause}): {message}")]
    Transport {
        cause: TransportCause,
        message: String,
    },

    /// The provider answered with a well-formed failure
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// The response could not be parsed or violated the telegram catalog
    #[error("Protocol error: {message}")]
    Protocol { message: String, fragment: String },
}

impl GatewayError {
    /// Build a protocol error, keeping a bounded slice of the raw payload.
    pub fn protocol(message: impl Into<String>, raw: &str) -> Self {
        Self::Protocol {
            message: message.into(),
            fragment: fragment(raw),
        }
    }

    /// Build a transport error.
    pub fn transport(cause: TransportCause, message: impl Into<String>) -> Self {
        Self::Transport {
            cause,
            message: message.into(),
        }
    }

    /// Build a provider error, classifying the code.
    pub fn provider(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Provider(ProviderError::new(code, detail))
    }

    /// The provider reported that the referenced object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Provider(e) if e.kind == ProviderErrorKind::NotFound)
    }

    /// Provider code, if this error came from the provider.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            Self::Provider(e) => Some(&e.code),
            _ => None,
        }
    }

    /// Whether a surrounding layer may reasonably retry the call.
    ///
    /// The adapters themselves never retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { cause, .. } => {
                matches!(cause, TransportCause::Connect | TransportCause::Timeout)
            }
            Self::Provider(e) => e.kind == ProviderErrorKind::RateLimited,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            TransportCause::Timeout
        } else if err.is_connect() {
            TransportCause::Connect
        } else {
            TransportCause::Other
        };
        GatewayError::transport(cause, err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Protocol {
            message: format!("JSON decoding failed: {}", err),
            fragment: String::new(),
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Why a transport error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCause {
    Connect,
    Timeout,
    Cancelled,
    Tls,
    Io,
    Other,
}

impl fmt::Display for TransportCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Tls => "tls",
            Self::Io => "io",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Failure reported by a provider, code and detail kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: String,
    pub detail: String,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            kind: ProviderErrorKind::classify(&code),
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.detail)
    }
}

/// Coarse classification of provider codes shared by all adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Issuer or provider declined the card
    Declined,
    /// Referenced charge, customer or card does not exist
    NotFound,
    /// Provider rejected the request parameters
    InvalidRequest,
    /// Credentials were refused
    Authentication,
    /// Too many requests
    RateLimited,
    /// Anything else
    Other,
}

impl ProviderErrorKind {
    /// Classify a provider code.
    ///
    /// Stripe reports snake_case codes and error types; the telegram adapter
    /// synthesizes `not_found` itself because the provider has no dedicated code.
    pub fn classify(code: &str) -> Self {
        match code.to_lowercase().as_str() {
            "card_declined" | "expired_card" | "incorrect_cvc" | "incorrect_number"
            | "insufficient_funds" | "processing_error" | "card_error" | "lost_card"
            | "stolen_card" | "fraudulent" => Self::Declined,
            "resource_missing" | "not_found" => Self::NotFound,
            "invalid_request_error" | "parameter_missing" | "parameter_invalid_integer"
            | "amount_too_small" | "amount_too_large" => Self::InvalidRequest,
            "authentication_error" | "api_key_expired" => Self::Authentication,
            "rate_limit" | "rate_limit_error" => Self::RateLimited,
            _ => Self::Other,
        }
    }
}

fn fragment(raw: &str) -> String {
    if raw.len() <= FRAGMENT_LIMIT {
        return raw.to_string();
    }
    let mut end = FRAGMENT_LIMIT;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    raw[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_codes() {
        assert_eq!(ProviderErrorKind::classify("card_declined"), ProviderErrorKind::Declined);
        assert_eq!(ProviderErrorKind::classify("resource_missing"), ProviderErrorKind::NotFound);
        assert_eq!(ProviderErrorKind::classify("RATE_LIMIT"), ProviderErrorKind::RateLimited);
        assert_eq!(ProviderErrorKind::classify("P011"), ProviderErrorKind::Other);
    }

    #[test]
    fn test_provider_error_keeps_code_and_detail() {
        let err = GatewayError::provider("P011", "card number invalid");
        assert_eq!(err.provider_code(), Some("P011"));
        assert_eq!(err.to_string(), "Provider error: [P011] card number invalid");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_protocol_fragment_is_bounded() {
        let raw = "é".repeat(600);
        match GatewayError::protocol("bad", &raw) {
            GatewayError::Protocol { fragment, .. } => {
                assert!(fragment.len() <= FRAGMENT_LIMIT);
                assert!(raw.starts_with(&fragment));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_retryable() {
        assert!(GatewayError::transport(TransportCause::Timeout, "slow").is_retryable());
        assert!(!GatewayError::transport(TransportCause::Cancelled, "stop").is_retryable());
        assert!(!GatewayError::InvalidRequest("x".into()).is_retryable());
    }
}
