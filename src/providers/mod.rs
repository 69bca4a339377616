// ABOUTME: Provider adapter traits for vision, barcode, nutrition database and query rewriting
// ABOUTME: Each third-party service is wrapped behind one async trait returning raw candidates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Food Data Provider System
//!
//! Every external service sits behind a trait so resolution can be exercised
//! against fakes and so adapters can be swapped by configuration.
//!
//! ## Architecture
//!
//! - `clarifai` - image recognition returning ranked concepts
//! - `open_food_facts` - barcode lookup
//! - `fatsecret` / `usda` - nutrition database search
//! - `query_rewriter` - AI expansion of free text into search phrases
//! - `token_cache` - OAuth token reuse owned by an adapter instance
//!
//! Adapters return [`ProviderCandidate`]s whose `raw_payload` keeps the
//! provider's own field names; turning those into canonical records is the
//! job of [`crate::normalization`].

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::ProviderCandidate;

/// Clarifai food recognition adapter
pub mod clarifai;
/// `FatSecret` platform search adapter
pub mod fatsecret;
/// Shared HTTP client construction and error mapping
pub mod http_client;
/// Open Food Facts barcode adapter
pub mod open_food_facts;
/// LLM-backed query rewriting
pub mod query_rewriter;
/// OAuth access token cache
pub mod token_cache;
/// USDA `FoodData` Central search adapter
pub mod usda;

pub use clarifai::ClarifaiVision;
pub use fatsecret::FatSecretClient;
pub use open_food_facts::OpenFoodFactsClient;
pub use query_rewriter::{extract_phrases, LlmQueryRewriter};
pub use token_cache::{AccessToken, TokenCache};
pub use usda::UsdaClient;

/// Image recognition provider
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Canonical provider name
    fn name(&self) -> &'static str;

    /// Recognize foods in a base64-encoded image
    ///
    /// Returns every concept the provider reported, each carrying its
    /// confidence. Ordering is not guaranteed.
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` on network or provider failure
    async fn recognize(&self, image_base64: &str) -> AppResult<Vec<ProviderCandidate>>;
}

/// Barcode lookup provider
#[async_trait]
pub trait BarcodeProvider: Send + Sync {
    /// Canonical provider name
    fn name(&self) -> &'static str;

    /// Look up a product; `Ok(None)` when the code is unknown
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` on network or provider failure
    async fn lookup(&self, code: &str) -> AppResult<Option<ProviderCandidate>>;
}

/// Nutrition database searched by food name
#[async_trait]
pub trait NutritionDatabase: Send + Sync {
    /// Canonical provider name
    fn name(&self) -> &'static str;

    /// Search foods matching a phrase, in the provider's relevance order
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable` on network or provider failure
    async fn search(&self, phrase: &str) -> AppResult<Vec<ProviderCandidate>>;
}

/// Rewrites free text into alternative search phrases
#[async_trait]
pub trait QueryRewriter: Send + Sync {
    /// Canonical provider name
    fn name(&self) -> &'static str;

    /// Produce alternative phrases for `query`
    ///
    /// Callers treat any error as "use the original query".
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or unusable model output
    async fn rewrite(&self, query: &str) -> AppResult<Vec<String>>;
}
