// Error handling module
// Defines token acquisition and API client error types

use std::fmt;

use thiserror::Error;

/// Which step of the token protocol an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStage {
    /// Credential grant for a long-lived token
    LongToken,
    /// Long token exchanged for a short-lived bearer token
    ShortToken,
    /// Short token revocation
    Revoke,
}

impl fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExchangeStage::LongToken => "long token exchange",
            ExchangeStage::ShortToken => "short token exchange",
            ExchangeStage::Revoke => "token revocation",
        };
        f.write_str(name)
    }
}

/// Errors raised while acquiring or managing tokens
#[derive(Error, Debug)]
pub enum AuthError {
    /// The auth endpoint could not be reached
    #[error("Transport failure during {stage}: {source}")]
    Transport {
        stage: ExchangeStage,
        #[source]
        source: reqwest::Error,
    },

    /// The auth endpoint answered, but not with a usable token
    #[error("Authentication failed during {stage}: {reason}")]
    Authentication {
        stage: ExchangeStage,
        /// HTTP status when the failure was a non-success response
        status: Option<u16>,
        reason: String,
    },
}

impl AuthError {
    pub(crate) fn rejected(stage: ExchangeStage, status: u16, body: &str) -> Self {
        AuthError::Authentication {
            stage,
            status: Some(status),
            reason: format!("HTTP {} - {}", status, body),
        }
    }

    pub(crate) fn invalid(stage: ExchangeStage, reason: impl Into<String>) -> Self {
        AuthError::Authentication {
            stage,
            status: None,
            reason: reason.into(),
        }
    }

    /// Stage the error belongs to
    pub fn stage(&self) -> ExchangeStage {
        match self {
            AuthError::Transport { stage, .. } | AuthError::Authentication { stage, .. } => *stage,
        }
    }

    /// True when the server explicitly refused the presented credential (401/403)
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::Authentication {
                status: Some(401 | 403),
                ..
            }
        )
    }
}

/// Errors raised by the API client
#[derive(Error, Debug)]
pub enum ClientError {
    /// No bearer token could be obtained
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Error response from the C2M API
    #[error("C2M API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Network failure talking to the C2M API
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for API client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuthError::rejected(ExchangeStage::LongToken, 401, "bad secret");
        assert_eq!(
            err.to_string(),
            "Authentication failed during long token exchange: HTTP 401 - bad secret"
        );

        let err = AuthError::invalid(ExchangeStage::ShortToken, "missing expires_at");
        assert_eq!(
            err.to_string(),
            "Authentication failed during short token exchange: missing expires_at"
        );

        let err = ClientError::Api {
            status: 429,
            message: "Rate limit exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "C2M API error: 429 - Rate limit exceeded");
    }

    #[test]
    fn test_auth_error_is_transparent_in_client_error() {
        let err: ClientError = AuthError::invalid(ExchangeStage::Revoke, "nope").into();
        assert_eq!(err.to_string(), "Authentication failed during token revocation: nope");
    }

    #[test]
    fn test_is_rejection() {
        assert!(AuthError::rejected(ExchangeStage::ShortToken, 401, "").is_rejection());
        assert!(AuthError::rejected(ExchangeStage::ShortToken, 403, "").is_rejection());
        assert!(!AuthError::rejected(ExchangeStage::ShortToken, 500, "").is_rejection());
        assert!(!AuthError::invalid(ExchangeStage::ShortToken, "bad json").is_rejection());
    }

    #[test]
    fn test_stage() {
        let err = AuthError::rejected(ExchangeStage::Revoke, 404, "");
        assert_eq!(err.stage(), ExchangeStage::Revoke);
    }

    #[test]
    fn test_internal_error_message() {
        let err = ClientError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }
}
