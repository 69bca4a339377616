// ABOUTME: FatSecret platform adapter for nutrition database search
// ABOUTME: Uses OAuth2 client credentials with a per-instance token cache
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! `FatSecret` platform food search
//!
//! API reference: <https://platform.fatsecret.com/docs/v1/foods.search>
//!
//! Search results carry nutrients only inside `food_description`, a summary
//! string such as `"Per 100g - Calories: 52kcal | Fat: 0.17g | Carbs: 13.81g | Protein: 0.26g"`.
//! The string is kept verbatim in the candidate and parsed during normalization.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::http_client::{build_client, ensure_success, read_json, transport_error};
use super::token_cache::{AccessToken, TokenCache, TokenSource};
use super::NutritionDatabase;
use crate::config::FatSecretConfig;
use crate::constants::provider_names;
use crate::errors::{AppResult, PipelineError};
use crate::models::ProviderCandidate;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Body of a `foods.search` call
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    foods: Option<FoodsEnvelope>,
    error: Option<ApiError>,
}

impl SearchResponse {
    /// Whether the body reports an invalid or expired access token
    #[must_use]
    pub fn invalidates_token(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|error| matches!(error.code, Some(13 | 14)))
    }
}

#[derive(Debug, Deserialize)]
struct FoodsEnvelope {
    // A single hit is returned as an object rather than a one-element array
    food: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: Option<String>,
}

/// Turn a search body into candidates keyed by `food_id`
///
/// # Errors
///
/// Returns `ProviderUnavailable` for an error envelope; `FatSecret` reports
/// API errors with HTTP 200
pub fn candidates_from_response(body: SearchResponse) -> AppResult<Vec<ProviderCandidate>> {
    let provider = provider_names::FATSECRET;
    if let Some(error) = body.error {
        return Err(PipelineError::provider_unavailable(
            provider,
            format!(
                "error {}: {}",
                error.code.unwrap_or_default(),
                error.message.unwrap_or_default()
            ),
        ));
    }

    let foods = match body.foods.and_then(|f| f.food) {
        Some(Value::Array(items)) => items,
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    };

    Ok(foods
        .into_iter()
        .filter_map(|food| match food {
            Value::Object(mut map) => {
                if let Some(id) = map.get("food_id").cloned() {
                    map.insert("id".to_owned(), id);
                }
                Some(ProviderCandidate::new(provider, Value::Object(map)))
            }
            _ => None,
        })
        .collect())
}

/// Client-credentials token source for the `FatSecret` OAuth endpoint
struct FatSecretTokenSource {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

#[async_trait]
impl TokenSource for FatSecretTokenSource {
    async fn fetch_token(&self) -> AppResult<AccessToken> {
        let provider = provider_names::FATSECRET;
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "basic")])
            .send()
            .await
            .map_err(|e| transport_error(provider, &e))?;

        let response = ensure_success(provider, response)?;
        let token: TokenResponse = read_json(provider, response).await?;
        Ok(AccessToken {
            value: token.access_token,
            expires_in: Duration::from_secs(token.expires_in),
        })
    }
}

/// `FatSecret` nutrition database
pub struct FatSecretClient {
    config: FatSecretConfig,
    http_client: Client,
    tokens: TokenCache,
}

impl FatSecretClient {
    /// Create a `FatSecret` adapter with its own token cache
    ///
    /// # Errors
    ///
    /// Returns a configuration error when credentials are missing or the
    /// HTTP client cannot be built
    pub fn new(config: FatSecretConfig) -> AppResult<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(PipelineError::config(
                "FATSECRET_CLIENT_ID and FATSECRET_CLIENT_SECRET are required",
            ));
        }
        let http_client = build_client(config.timeout)?;
        let source = FatSecretTokenSource {
            http_client: http_client.clone(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        };
        Ok(Self {
            config,
            http_client,
            tokens: TokenCache::new(Arc::new(source)),
        })
    }
}

#[async_trait]
impl NutritionDatabase for FatSecretClient {
    fn name(&self) -> &'static str {
        provider_names::FATSECRET
    }

    #[instrument(skip(self))]
    async fn search(&self, phrase: &str) -> AppResult<Vec<ProviderCandidate>> {
        let provider = self.name();
        let token = self.tokens.get_valid_token().await?;

        let response = self
            .http_client
            .get(&self.config.api_url)
            .bearer_auth(token)
            .query(&[
                ("method", "foods.search"),
                ("search_expression", phrase),
                ("format", "json"),
                ("max_results", &self.config.max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(provider, &e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        let response = ensure_success(provider, response)?;
        let body: SearchResponse = read_json(provider, response).await?;

        if body.invalidates_token() {
            self.tokens.invalidate().await;
        }
        let candidates = candidates_from_response(body)?;

        debug!(results = candidates.len(), "fatsecret search complete");
        Ok(candidates)
    }
}
