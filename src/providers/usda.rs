// ABOUTME: USDA FoodData Central adapter for nutrition database search
// ABOUTME: Implements food search with abridged nutrients and client-side rate limiting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! USDA `FoodData` Central API Client
//!
//! The API is free and requires no authentication beyond an API key.
//!
//! # Features
//! - Food search returning per-100 g nutrients for each hit
//! - Rate limiting (30 requests per minute by default)
//!
//! # API Reference
//! USDA `FoodData` Central API: <https://fdc.nal.usda.gov/api-guide.html>
//!
//! # Example
//! ```rust,no_run
//! use nutriscan::config::UsdaClientConfig;
//! use nutriscan::providers::{NutritionDatabase, UsdaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UsdaClientConfig {
//!     api_key: "your_api_key".to_owned(),
//!     ..UsdaClientConfig::default()
//! };
//!
//! let client = UsdaClient::new(config)?;
//! let candidates = client.search("apple").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, instrument};

use super::http_client::{build_client, ensure_success, read_json, transport_error};
use super::NutritionDatabase;
use crate::config::UsdaClientConfig;
use crate::constants::provider_names;
use crate::errors::{AppResult, PipelineError};
use crate::models::ProviderCandidate;

/// USDA food search hit as kept in candidate payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSearchResult {
    /// `FoodData` Central ID
    pub fdc_id: u64,
    /// Food description
    pub description: String,
    /// Data type (e.g., "Survey (FNDDS)", "Foundation", "Branded")
    #[serde(default)]
    pub data_type: Option<String>,
    /// Brand owner (for branded foods)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_owner: Option<String>,
    /// Brand name (for branded foods)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    /// Household serving size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<f64>,
    /// Unit of the household serving size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size_unit: Option<String>,
    /// Nutrients per 100 g
    #[serde(default)]
    pub food_nutrients: Vec<SearchNutrient>,
}

/// Abridged nutrient entry from the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNutrient {
    /// Nutrient ID (e.g. 1008 energy, 1003 protein)
    pub nutrient_id: u32,
    /// Nutrient name
    #[serde(default)]
    pub nutrient_name: Option<String>,
    /// Unit (e.g. "KCAL", "kJ", "G", "MG")
    #[serde(default)]
    pub unit_name: Option<String>,
    /// Amount per 100 g
    #[serde(default)]
    pub value: Option<f64>,
}

/// USDA API search response
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// Search hits in relevance order
    #[serde(default)]
    pub foods: Vec<FoodSearchResult>,
}

/// Turn search hits into candidates whose `id` is the `fdcId`
///
/// # Errors
///
/// Returns `ProviderUnavailable` if a hit cannot be re-encoded as JSON
pub fn candidates_from_search(response: SearchResponse) -> AppResult<Vec<ProviderCandidate>> {
    let provider = provider_names::USDA;
    let mut candidates = Vec::with_capacity(response.foods.len());
    for food in response.foods {
        let mut payload = serde_json::to_value(&food).map_err(|e| {
            PipelineError::provider_unavailable(provider, format!("payload encode error: {e}"))
        })?;
        if let Some(map) = payload.as_object_mut() {
            map.insert("id".to_owned(), food.fdc_id.into());
        }
        candidates.push(ProviderCandidate::new(provider, payload));
    }
    Ok(candidates)
}

/// Rate limiter for API requests
#[derive(Debug)]
struct RateLimiter {
    requests: Vec<Instant>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    const fn new(limit: u32, window: Duration) -> Self {
        Self {
            requests: Vec::new(),
            limit,
            window,
        }
    }

    /// Check if a request can be made, removing expired entries
    fn can_request(&mut self) -> bool {
        let now = Instant::now();
        self.requests
            .retain(|&t| now.duration_since(t) < self.window);
        self.requests.len() < self.limit as usize
    }

    /// Record a new request
    fn record_request(&mut self) {
        self.requests.push(Instant::now());
    }

    /// Wait until a request can be made
    async fn wait_if_needed(&mut self) {
        while !self.can_request() {
            sleep(Duration::from_secs(1)).await;
        }
    }
}

/// USDA `FoodData` Central API Client
pub struct UsdaClient {
    config: UsdaClientConfig,
    http_client: Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl UsdaClient {
    /// Create a new USDA API client
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is missing, the page
    /// size is outside 1..=200, or the HTTP client cannot be built
    pub fn new(config: UsdaClientConfig) -> AppResult<Self> {
        if config.api_key.is_empty() {
            return Err(PipelineError::config("USDA_API_KEY is required"));
        }
        if config.page_size == 0 || config.page_size > 200 {
            return Err(PipelineError::config(
                "USDA page size must be between 1 and 200",
            ));
        }
        let rate_limiter = RateLimiter::new(config.rate_limit_per_minute, Duration::from_secs(60));
        let http_client = build_client(config.timeout)?;

        Ok(Self {
            config,
            http_client,
            rate_limiter: Arc::new(Mutex::new(rate_limiter)),
        })
    }
}

#[async_trait]
impl NutritionDatabase for UsdaClient {
    fn name(&self) -> &'static str {
        provider_names::USDA
    }

    #[instrument(skip(self))]
    async fn search(&self, phrase: &str) -> AppResult<Vec<ProviderCandidate>> {
        let provider = self.name();

        {
            let mut limiter = self.rate_limiter.lock().await;
            limiter.wait_if_needed().await;
            limiter.record_request();
        }

        let url = format!("{}/foods/search", self.config.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("query", phrase),
                ("pageSize", &self.config.page_size.to_string()),
                ("pageNumber", "1"),
                ("api_key", &self.config.api_key),
            ])
            .send()
            .await
            .map_err(|e| transport_error(provider, &e))?;

        let response = ensure_success(provider, response)?;
        let search_response: SearchResponse = read_json(provider, response).await?;

        let candidates = candidates_from_search(search_response)?;

        debug!(results = candidates.len(), "usda search complete");
        Ok(candidates)
    }
}
