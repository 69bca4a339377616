// ABOUTME: Environment-based configuration for provider credentials and pipeline tuning
// ABOUTME: Each provider adapter gets its own config struct with sensible defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pipeline Configuration
//!
//! Configuration is read from environment variables only. Credentials for a
//! provider are required only when that provider is selected.

use std::env;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::constants::http::{DEFAULT_TIMEOUT_SECS, MAX_TIMEOUT_SECS};
use crate::constants::resolution::{MAX_SEARCH_CACHE_TTL_SECS, SEARCH_CACHE_TTL};
use crate::errors::{AppResult, PipelineError};

/// Clarifai food recognition settings
#[derive(Debug, Clone)]
pub struct ClarifaiConfig {
    /// Personal access token
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Model identifier
    pub model_id: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClarifaiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.clarifai.com/v2".to_owned(),
            model_id: "food-item-recognition".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Open Food Facts barcode lookup settings
#[derive(Debug, Clone)]
pub struct OpenFoodFactsConfig {
    /// API base URL
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for OpenFoodFactsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://world.openfoodfacts.org".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// `FatSecret` platform API settings
#[derive(Debug, Clone)]
pub struct FatSecretConfig {
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Token endpoint
    pub token_url: String,
    /// REST endpoint
    pub api_url: String,
    /// Results requested per search
    pub max_results: u32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for FatSecretConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "https://oauth.fatsecret.com/connect/token".to_owned(),
            api_url: "https://platform.fatsecret.com/rest/server.api".to_owned(),
            max_results: 10,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// USDA `FoodData` Central settings
#[derive(Debug, Clone)]
pub struct UsdaClientConfig {
    /// USDA API key (free from <https://fdc.nal.usda.gov/api-key-signup.html>)
    pub api_key: String,
    /// Base URL for USDA API (default: <https://api.nal.usda.gov/fdc/v1>)
    pub base_url: String,
    /// Results requested per search
    pub page_size: u32,
    /// Rate limit per minute (default: 30)
    pub rate_limit_per_minute: u32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for UsdaClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_owned(),
            page_size: 10,
            rate_limit_per_minute: 30,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// OpenAI-compatible chat completion settings for query rewriting
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Bearer API key
    pub api_key: String,
    /// API base URL (chat completions live at `{base_url}/chat/completions`)
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Which nutrition database backs text search and vision enrichment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NutritionDatabaseKind {
    /// USDA `FoodData` Central
    #[default]
    Usda,
    /// `FatSecret` platform
    FatSecret,
}

impl NutritionDatabaseKind {
    /// Parse from an environment value (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown names
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "usda" => Ok(Self::Usda),
            "fatsecret" => Ok(Self::FatSecret),
            other => Err(PipelineError::config(format!(
                "NUTRITION_DATABASE must be 'usda' or 'fatsecret', got '{other}'"
            ))),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Vision provider
    pub clarifai: ClarifaiConfig,
    /// Barcode provider
    pub open_food_facts: OpenFoodFactsConfig,
    /// Selected nutrition database
    pub nutrition_database: NutritionDatabaseKind,
    /// `FatSecret` settings, used when selected
    pub fatsecret: FatSecretConfig,
    /// USDA settings, used when selected
    pub usda: UsdaClientConfig,
    /// Query rewriter; `None` disables rewriting
    pub llm: Option<LlmConfig>,
    /// Lifetime of cached text searches
    pub search_cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clarifai: ClarifaiConfig::default(),
            open_food_facts: OpenFoodFactsConfig::default(),
            nutrition_database: NutritionDatabaseKind::default(),
            fatsecret: FatSecretConfig::default(),
            usda: UsdaClientConfig::default(),
            llm: None,
            search_cache_ttl: SEARCH_CACHE_TTL,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when a numeric variable is malformed
    /// or the selected nutrition database has no credentials
    pub fn from_env() -> AppResult<Self> {
        let timeout = Duration::from_secs(parse_bounded_env(
            "PROVIDER_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
            1..=MAX_TIMEOUT_SECS,
        )?);
        let search_cache_ttl = Duration::from_secs(parse_bounded_env(
            "SEARCH_CACHE_TTL_SECS",
            SEARCH_CACHE_TTL.as_secs(),
            0..=MAX_SEARCH_CACHE_TTL_SECS,
        )?);

        let clarifai_defaults = ClarifaiConfig::default();
        let clarifai = ClarifaiConfig {
            api_key: env::var("CLARIFAI_PAT").unwrap_or_default(),
            base_url: env::var("CLARIFAI_BASE_URL").unwrap_or(clarifai_defaults.base_url),
            model_id: env::var("CLARIFAI_MODEL_ID").unwrap_or(clarifai_defaults.model_id),
            timeout,
        };

        let open_food_facts = OpenFoodFactsConfig {
            base_url: env::var("OPEN_FOOD_FACTS_BASE_URL")
                .unwrap_or_else(|_| OpenFoodFactsConfig::default().base_url),
            timeout,
        };

        let nutrition_database = env::var("NUTRITION_DATABASE")
            .ok()
            .map(|v| NutritionDatabaseKind::parse(&v))
            .transpose()?
            .unwrap_or_default();

        let fatsecret = FatSecretConfig {
            client_id: env::var("FATSECRET_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("FATSECRET_CLIENT_SECRET").unwrap_or_default(),
            timeout,
            ..FatSecretConfig::default()
        };

        let usda = UsdaClientConfig {
            api_key: env::var("USDA_API_KEY").unwrap_or_default(),
            timeout,
            ..UsdaClientConfig::default()
        };

        let llm = env::var("LLM_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| {
                let defaults = LlmConfig::default();
                LlmConfig {
                    api_key,
                    base_url: env::var("LLM_BASE_URL").unwrap_or(defaults.base_url),
                    model: env::var("LLM_MODEL").unwrap_or(defaults.model),
                    timeout,
                }
            });

        let config = Self {
            clarifai,
            open_food_facts,
            nutrition_database,
            fatsecret,
            usda,
            llm,
            search_cache_ttl,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the selected nutrition database has credentials
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] naming the missing variable
    pub fn validate(&self) -> AppResult<()> {
        match self.nutrition_database {
            NutritionDatabaseKind::Usda if self.usda.api_key.is_empty() => Err(
                PipelineError::config("USDA_API_KEY is required when NUTRITION_DATABASE=usda"),
            ),
            NutritionDatabaseKind::FatSecret
                if self.fatsecret.client_id.is_empty() || self.fatsecret.client_secret.is_empty() =>
            {
                Err(PipelineError::config(
                    "FATSECRET_CLIENT_ID and FATSECRET_CLIENT_SECRET are required when NUTRITION_DATABASE=fatsecret",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Whether the vision provider can be used
    #[must_use]
    pub fn vision_enabled(&self) -> bool {
        !self.clarifai.api_key.is_empty()
    }
}

fn parse_bounded_env(name: &str, default: u64, range: RangeInclusive<u64>) -> AppResult<u64> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| PipelineError::config(format!("{name} must be an integer: {e}")))?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(PipelineError::config(format!(
            "{name} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}
