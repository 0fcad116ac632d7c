use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::clock::{Clock, SystemClock};
use super::exchange;
use super::types::{Credential, LongToken, ShortToken, TokenPolicy};
use crate::error::AuthError;

/// Cached tokens, guarded together so a refresh is a single critical section
#[derive(Debug, Default)]
struct TokenState {
    long_token: Option<LongToken>,
    short_token: Option<ShortToken>,
}

/// Token manager
/// Owns the long/short token lifecycle for one credential. The cache lock is
/// held across a refresh, so at most one refresh is in flight per manager.
pub struct TokenManager {
    credential: Credential,

    /// Base URL of the auth endpoints
    auth_url: String,

    policy: TokenPolicy,

    /// HTTP client for token requests
    client: Client,

    clock: Arc<dyn Clock>,

    state: Mutex<TokenState>,
}

impl TokenManager {
    /// Create a token manager with its own HTTP client (30s request timeout)
    pub fn new(
        credential: Credential,
        auth_url: impl Into<String>,
        policy: TokenPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_client(credential, auth_url, policy, client))
    }

    /// Create a token manager sharing an existing HTTP client
    pub fn with_client(
        credential: Credential,
        auth_url: impl Into<String>,
        policy: TokenPolicy,
        client: Client,
    ) -> Self {
        Self {
            credential,
            auth_url: auth_url.into(),
            policy,
            client,
            clock: Arc::new(SystemClock),
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Replace the time source used for expiry checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get a short token valid for at least the refresh margin, refreshing if necessary
    pub async fn get_valid_token(&self) -> Result<ShortToken, AuthError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        match state.short_token.as_ref() {
            Some(token) if !token.needs_refresh(now, self.policy.refresh_margin) => {
                tracing::debug!(
                    expires_at = %token.expires_at.to_rfc3339(),
                    "Using cached short-term token"
                );
                return Ok(token.clone());
            }
            Some(token) => {
                tracing::debug!(
                    expires_at = %token.expires_at.to_rfc3339(),
                    "Short-term token expiring soon, refreshing..."
                );
            }
            None => tracing::debug!("No short-term token cached"),
        }

        self.refresh_locked(&mut state).await
    }

    /// Exchange for a new short token regardless of the cached one's expiry
    pub async fn force_refresh(&self) -> Result<ShortToken, AuthError> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Drop the cached short token so the next call performs an exchange
    pub async fn invalidate_short_token(&self) {
        let mut state = self.state.lock().await;
        if state.short_token.take().is_some() {
            tracing::debug!("Short-term token invalidated");
        }
    }

    /// Revoke the cached short token on the server and drop it locally.
    /// Returns false when no short token is cached.
    pub async fn revoke_short_token(&self) -> Result<bool, AuthError> {
        let mut state = self.state.lock().await;
        let Some(token) = state.short_token.clone() else {
            tracing::debug!("No short-term token to revoke");
            return Ok(false);
        };

        exchange::revoke_token(&self.client, &self.auth_url, &token).await?;
        state.short_token = None;
        Ok(true)
    }

    pub async fn has_long_token(&self) -> bool {
        self.state.lock().await.long_token.is_some()
    }

    /// Cached short token, whether or not it is still usable
    pub async fn cached_short_token(&self) -> Option<ShortToken> {
        self.state.lock().await.short_token.clone()
    }

    /// Run the refresh protocol with the state lock held.
    /// Cached state only changes after a successful exchange.
    async fn refresh_locked(&self, state: &mut TokenState) -> Result<ShortToken, AuthError> {
        let long_token = self.ensure_long_token(state).await?;

        let result =
            exchange::request_short_token(&self.client, &self.auth_url, &long_token, &self.policy)
                .await;

        let short_token = match result {
            Ok(token) => token,
            Err(e) if e.is_rejection() && self.policy.reacquire_on_rejection => {
                tracing::warn!("Long-term token rejected ({}), re-acquiring once...", e);
                // The rejected token stays cached until a replacement is issued
                let long_token = exchange::request_long_token(
                    &self.client,
                    &self.auth_url,
                    &self.credential,
                    &self.policy,
                )
                .await
                .inspect_err(|e| tracing::error!("Long-term token re-acquisition failed: {}", e))?;
                state.long_token = Some(long_token.clone());
                exchange::request_short_token(
                    &self.client,
                    &self.auth_url,
                    &long_token,
                    &self.policy,
                )
                .await?
            }
            Err(e) => {
                tracing::error!("Short-term token refresh failed: {}", e);
                return Err(e);
            }
        };

        if short_token.needs_refresh(self.clock.now(), self.policy.refresh_margin) {
            tracing::warn!(
                expires_at = %short_token.expires_at.to_rfc3339(),
                "Server issued a short-term token that is already inside the refresh margin"
            );
        }

        state.short_token = Some(short_token.clone());
        Ok(short_token)
    }

    async fn ensure_long_token(&self, state: &mut TokenState) -> Result<LongToken, AuthError> {
        if let Some(ref token) = state.long_token {
            return Ok(token.clone());
        }

        let token = exchange::request_long_token(
            &self.client,
            &self.auth_url,
            &self.credential,
            &self.policy,
        )
        .await
        .inspect_err(|e| tracing::error!("Long-term token request failed: {}", e))?;

        state.long_token = Some(token.clone());
        Ok(token)
    }
}
