//! Error taxonomy for the auth flow. `ApiError` is produced at the HTTP boundary;
//! `FlowError` is what controllers surface, and its `Display` is the exact text the
//! UI shows. None of these errors carries secrets.

use thiserror::Error;

pub const NETWORK_ERROR: &str = "Network error";
pub const RATE_LIMITED: &str = "Too many login attempts. Please wait a minute and try again.";
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

/// Transport-level failures of a single request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("unable to reach the server: {0}")]
    Transport(reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported URL scheme: {0}")]
    Scheme(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

/// User-facing outcome of a failed controller operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Rejected locally before any request was issued.
    #[error("{0}")]
    Validation(String),
    /// Reported by the remote API.
    #[error("{0}")]
    Domain(String),
    #[error("{}", RATE_LIMITED)]
    RateLimited,
    #[error("{}", SESSION_EXPIRED)]
    SessionExpired,
    /// Transport, timeout or malformed body; the flow state is left untouched.
    #[error("{}", NETWORK_ERROR)]
    Network,
    #[error("{operation} is not available while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl From<ApiError> for FlowError {
    fn from(_: ApiError) -> Self {
        Self::Network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_user_facing_text() {
        assert_eq!(FlowError::Network.to_string(), "Network error");
        assert_eq!(
            FlowError::Validation("passwords do not match".to_string()).to_string(),
            "passwords do not match"
        );
        assert_eq!(FlowError::RateLimited.to_string(), RATE_LIMITED);
        assert_eq!(
            FlowError::InvalidState {
                operation: "verification",
                state: "anonymous"
            }
            .to_string(),
            "verification is not available while anonymous"
        );
    }

    #[test]
    fn api_errors_collapse_to_network() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(FlowError::from(ApiError::from(decode)), FlowError::Network);
        assert_eq!(FlowError::from(ApiError::Timeout), FlowError::Network);
    }
}
