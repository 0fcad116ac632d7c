// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client credential used for the long-token grant
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    client_id: String,
    client_secret: String,
}

impl Credential {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Long-lived token authorizing short token requests
#[derive(Clone, PartialEq, Eq)]
pub struct LongToken {
    pub access_token: String,
    /// Server-side identifier, used for logging only
    pub token_id: Option<String>,
}

impl fmt::Debug for LongToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongToken")
            .field("access_token", &redact(&self.access_token))
            .field("token_id", &self.token_id)
            .finish()
    }
}

/// Short-lived bearer token presented to the API
#[derive(Clone, PartialEq, Eq)]
pub struct ShortToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    /// Server-side identifier, needed for revocation
    pub token_id: Option<String>,
}

impl ShortToken {
    /// True once `now` is inside the refresh margin before expiry (boundary included).
    /// A margin reaching past the representable range always asks for a refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(margin)
            .map_or(true, |refresh_at| now >= refresh_at)
    }

    pub fn as_str(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for ShortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortToken")
            .field("access_token", &redact(&self.access_token))
            .field("expires_at", &self.expires_at)
            .field("token_id", &self.token_id)
            .finish()
    }
}

/// Show only the head of a token
fn redact(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    format!("{}...", head)
}

pub const DEFAULT_LONG_TOKEN_TTL_SECONDS: u64 = 2_592_000; // 30 days
pub const DEFAULT_REFRESH_MARGIN_SECONDS: i64 = 60;

/// Scopes, lifetimes and refresh behavior for the token protocol
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPolicy {
    pub long_scopes: Vec<String>,
    pub long_ttl_seconds: u64,
    pub short_scopes: Vec<String>,
    /// Lead time before expiry at which a short token is no longer handed out
    pub refresh_margin: Duration,
    /// Re-acquire the long token once when the short endpoint rejects it
    pub reacquire_on_rejection: bool,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            long_scopes: vec![
                "jobs:submit".to_string(),
                "jobs:read".to_string(),
                "templates:read".to_string(),
            ],
            long_ttl_seconds: DEFAULT_LONG_TOKEN_TTL_SECONDS,
            short_scopes: vec!["jobs:submit".to_string()],
            refresh_margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECONDS),
            reacquire_on_rejection: false,
        }
    }
}

/// Long token request body
#[derive(Serialize)]
pub struct LongTokenRequest<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub scopes: &'a [String],
    pub ttl_seconds: u64,
}

/// Short token request body
#[derive(Serialize)]
pub struct ShortTokenRequest<'a> {
    pub scopes: &'a [String],
}

/// Token endpoint response; unknown fields are ignored
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_id: Option<String>,
    pub expires_at: Option<String>,
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn refresh_iff_remaining_within_margin(remaining in -7200i64..7200, margin in 0i64..600) {
            let now = Utc::now();
            let token = ShortToken {
                access_token: "t".to_string(),
                expires_at: now + Duration::seconds(remaining),
                token_id: None,
            };
            prop_assert_eq!(
                token.needs_refresh(now, Duration::seconds(margin)),
                remaining <= margin
            );
        }
    }
}
