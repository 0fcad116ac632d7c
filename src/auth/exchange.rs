// Token exchange requests against the C2M auth endpoints

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, Response};

use super::types::{
    Credential, LongToken, LongTokenRequest, ShortToken, ShortTokenRequest, TokenPolicy,
    TokenResponse,
};
use crate::error::{AuthError, ExchangeStage};

fn long_token_url(auth_url: &str) -> String {
    format!("{}/auth/tokens/long", auth_url.trim_end_matches('/'))
}

fn short_token_url(auth_url: &str) -> String {
    format!("{}/auth/tokens/short", auth_url.trim_end_matches('/'))
}

fn revoke_url(auth_url: &str, token_id: &str) -> String {
    format!(
        "{}/auth/tokens/{}/revoke",
        auth_url.trim_end_matches('/'),
        token_id
    )
}

/// Obtain a long-lived token with the client credential grant
pub async fn request_long_token(
    client: &Client,
    auth_url: &str,
    credential: &Credential,
    policy: &TokenPolicy,
) -> Result<LongToken, AuthError> {
    let stage = ExchangeStage::LongToken;
    tracing::info!("Requesting long-term token for client {}", credential.client_id());

    let request = LongTokenRequest {
        grant_type: "client_credentials",
        client_id: credential.client_id(),
        client_secret: credential.client_secret(),
        scopes: &policy.long_scopes,
        ttl_seconds: policy.long_ttl_seconds,
    };

    let response = client
        .post(long_token_url(auth_url))
        .json(&request)
        .send()
        .await
        .map_err(|source| AuthError::Transport { stage, source })?;

    let data = read_token_response(stage, response).await?;
    let access_token = require_access_token(stage, data.access_token)?;

    tracing::info!(
        token_id = data.token_id.as_deref().unwrap_or("unknown"),
        "Long-term token obtained"
    );

    Ok(LongToken {
        access_token,
        token_id: data.token_id,
    })
}

/// Exchange a long token for a short-lived bearer token
pub async fn request_short_token(
    client: &Client,
    auth_url: &str,
    long_token: &LongToken,
    policy: &TokenPolicy,
) -> Result<ShortToken, AuthError> {
    let stage = ExchangeStage::ShortToken;
    tracing::debug!("Exchanging long-term token for short-term token...");

    let request = ShortTokenRequest {
        scopes: &policy.short_scopes,
    };

    let response = client
        .post(short_token_url(auth_url))
        .bearer_auth(&long_token.access_token)
        .json(&request)
        .send()
        .await
        .map_err(|source| AuthError::Transport { stage, source })?;

    let data = read_token_response(stage, response).await?;
    let access_token = require_access_token(stage, data.access_token)?;

    let raw_expiry = data
        .expires_at
        .ok_or_else(|| AuthError::invalid(stage, "response does not contain expires_at"))?;
    let expires_at = parse_datetime(&raw_expiry).map_err(|e| {
        AuthError::invalid(stage, format!("invalid expires_at '{}': {}", raw_expiry, e))
    })?;

    tracing::info!(
        token_id = data.token_id.as_deref().unwrap_or("unknown"),
        expires_at = %expires_at.to_rfc3339(),
        "Short-term token obtained"
    );

    Ok(ShortToken {
        access_token,
        expires_at,
        token_id: data.token_id,
    })
}

/// Revoke a short token on the server
pub async fn revoke_token(
    client: &Client,
    auth_url: &str,
    token: &ShortToken,
) -> Result<(), AuthError> {
    let stage = ExchangeStage::Revoke;
    let token_id = token
        .token_id
        .as_deref()
        .ok_or_else(|| AuthError::invalid(stage, "token has no token_id to revoke"))?;

    let response = client
        .post(revoke_url(auth_url, token_id))
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|source| AuthError::Transport { stage, source })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %error_text, "Token revocation failed");
        return Err(AuthError::rejected(stage, status.as_u16(), &error_text));
    }

    tracing::info!(token_id = token_id, "Token revoked");
    Ok(())
}

/// Check the status and decode the body of a token endpoint response
async fn read_token_response(
    stage: ExchangeStage,
    response: Response,
) -> Result<TokenResponse, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            status = %status,
            body = %error_text,
            "{} failed",
            stage
        );
        return Err(AuthError::rejected(stage, status.as_u16(), &error_text));
    }

    let body = response
        .text()
        .await
        .map_err(|source| AuthError::Transport { stage, source })?;

    serde_json::from_str(&body)
        .map_err(|e| AuthError::invalid(stage, format!("malformed response body: {}", e)))
}

fn require_access_token(
    stage: ExchangeStage,
    access_token: Option<String>,
) -> Result<String, AuthError> {
    match access_token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::invalid(
            stage,
            "response does not contain access_token",
        )),
    }
}

/// Parse an ISO 8601 timestamp; values without an offset are taken as UTC
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(e) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        // Z suffix
        let dt = parse_datetime("2025-01-12T10:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-12T10:30:00+00:00");

        // Explicit offset
        let dt = parse_datetime("2025-01-12T12:30:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-12T10:30:00+00:00");

        // Fractional seconds
        let dt = parse_datetime("2025-01-12T10:30:00.250Z").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_datetime_without_offset() {
        let dt = parse_datetime("2025-01-12T10:30:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-12T10:30:00+00:00");
    }

    #[test]
    fn test_parse_datetime_invalid() {
        assert!(parse_datetime("tomorrow").is_err());
        assert!(parse_datetime("").is_err());
        assert!(parse_datetime("2025-13-45T99:00:00Z").is_err());
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        assert_eq!(
            long_token_url("https://api.c2m.com/v2/"),
            "https://api.c2m.com/v2/auth/tokens/long"
        );
        assert_eq!(
            short_token_url("https://api.c2m.com/v2"),
            "https://api.c2m.com/v2/auth/tokens/short"
        );
        assert_eq!(
            revoke_url("http://localhost:4010", "tok-9"),
            "http://localhost:4010/auth/tokens/tok-9/revoke"
        );
    }

    #[test]
    fn test_require_access_token() {
        let stage = ExchangeStage::LongToken;
        assert_eq!(
            require_access_token(stage, Some("LT1".to_string())).unwrap(),
            "LT1"
        );
        assert!(require_access_token(stage, Some(String::new())).is_err());
        assert!(require_access_token(stage, None).is_err());
    }
}
