// ABOUTME: OAuth access token cache owned by a provider adapter instance
// ABOUTME: Reuses the current token and refreshes it shortly before expiry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Cache
//!
//! Client-credential tokens are reused across calls made by one adapter.
//! The lock is held while refreshing so concurrent callers wait for the same
//! refresh instead of each fetching a token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::AppResult;

/// Tokens expiring within this margin are refreshed before use
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Issuer-reported lifetimes are capped at one day
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Access token with its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Bearer token value
    pub value: String,
    /// Lifetime reported by the issuer
    pub expires_in: Duration,
}

/// Issues fresh access tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Request a new token from the issuer
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` when the token endpoint fails
    async fn fetch_token(&self) -> AppResult<AccessToken>;
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Token cache bound to one token source
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    current: Mutex<Option<CachedToken>>,
    refresh_margin: Duration,
}

impl TokenCache {
    /// Create an empty cache using [`DEFAULT_REFRESH_MARGIN`]
    #[must_use]
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self::with_refresh_margin(source, DEFAULT_REFRESH_MARGIN)
    }

    /// Create an empty cache with a custom refresh margin
    #[must_use]
    pub fn with_refresh_margin(source: Arc<dyn TokenSource>, refresh_margin: Duration) -> Self {
        Self {
            source,
            current: Mutex::new(None),
            refresh_margin,
        }
    }

    /// Return a token valid for at least the refresh margin
    ///
    /// # Errors
    ///
    /// Propagates the token source error when a refresh fails; the previous
    /// token is discarded in that case
    pub async fn get_valid_token(&self) -> AppResult<String> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            let fresh_enough = Instant::now()
                .checked_add(self.refresh_margin)
                .is_some_and(|deadline| deadline < token.expires_at);
            if fresh_enough {
                return Ok(token.value.clone());
            }
        }

        *current = None;
        debug!("refreshing access token");
        let fresh = self.source.fetch_token().await?;
        let value = fresh.value.clone();
        let now = Instant::now();
        let lifetime = fresh.expires_in.min(MAX_TOKEN_LIFETIME);
        *current = Some(CachedToken {
            value: fresh.value,
            expires_at: now.checked_add(lifetime).unwrap_or(now),
        });
        drop(current);
        Ok(value)
    }

    /// Forget the cached token, forcing a refresh on next use
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
