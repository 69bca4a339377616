// ABOUTME: Provider resolution dispatching food queries to vision, barcode or database providers
// ABOUTME: Applies confidence thresholds, best-effort query rewriting, merging and ordering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Provider Resolution
//!
//! - Photo: one vision call; concepts at or above the confidence threshold are
//!   kept, otherwise the top three concepts are kept regardless of confidence.
//! - Barcode: one lookup, exactly one candidate or `NotFound`.
//! - Text: optional AI rewrite, at most two concurrent database searches
//!   merged in phrase order, de-duplicated by provider food id, capped at ten.
//!
//! No retries happen here. The only state is the optional text search cache,
//! so overlapping calls are safe.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::cache::TtlCache;
use crate::constants::resolution::{
    MAX_SEARCH_PHRASES, MAX_TEXT_CANDIDATES, VISION_CONFIDENCE_THRESHOLD, VISION_FALLBACK_TOP_N,
};
use crate::errors::{AppResult, PipelineError};
use crate::models::{FoodQuery, ProviderCandidate};
use crate::providers::{BarcodeProvider, NutritionDatabase, QueryRewriter, VisionProvider};

/// Resolution output with the phrases actually searched
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Candidates in confidence order
    pub candidates: Vec<ProviderCandidate>,
    /// Phrases sent to the nutrition database (text queries only)
    pub phrases: Vec<String>,
    /// Whether the phrases came from the query rewriter
    pub rewritten: bool,
}

impl Resolution {
    fn direct(candidates: Vec<ProviderCandidate>) -> Self {
        Self {
            candidates,
            phrases: Vec::new(),
            rewritten: false,
        }
    }
}

/// Dispatches queries to the configured providers
pub struct Resolver {
    database: Arc<dyn NutritionDatabase>,
    vision: Option<Arc<dyn VisionProvider>>,
    barcode: Option<Arc<dyn BarcodeProvider>>,
    rewriter: Option<Arc<dyn QueryRewriter>>,
    search_cache: Option<TtlCache<String, Resolution>>,
}

impl Resolver {
    /// Resolver backed by a nutrition database; other providers are optional
    #[must_use]
    pub fn new(database: Arc<dyn NutritionDatabase>) -> Self {
        Self {
            database,
            vision: None,
            barcode: None,
            rewriter: None,
            search_cache: None,
        }
    }

    /// Enable photo queries
    #[must_use]
    pub fn with_vision(mut self, vision: Arc<dyn VisionProvider>) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Enable barcode queries
    #[must_use]
    pub fn with_barcode(mut self, barcode: Arc<dyn BarcodeProvider>) -> Self {
        self.barcode = Some(barcode);
        self
    }

    /// Enable AI query rewriting for text queries
    #[must_use]
    pub fn with_rewriter(mut self, rewriter: Arc<dyn QueryRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Cache text resolutions per lowercased query for `ttl`
    #[must_use]
    pub fn with_search_cache(mut self, ttl: Duration) -> Self {
        self.search_cache = Some(TtlCache::new(ttl));
        self
    }

    /// Nutrition database used for text search
    #[must_use]
    pub fn database(&self) -> &Arc<dyn NutritionDatabase> {
        &self.database
    }

    /// Resolve a query to ordered candidates
    ///
    /// # Errors
    ///
    /// - `ProviderUnavailable` when a provider call fails
    /// - `NoFoodDetected` when the vision provider reports no concepts
    /// - `NotFound` when a barcode is unknown
    /// - `Config` when the provider for the query kind is not configured
    pub async fn resolve(&self, query: &FoodQuery) -> AppResult<Vec<ProviderCandidate>> {
        self.resolve_detailed(query)
            .await
            .map(|resolution| resolution.candidates)
    }

    /// Resolve a query, also reporting which phrases were searched
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve`]
    #[instrument(skip(self, query), fields(kind = %query.kind()))]
    pub async fn resolve_detailed(&self, query: &FoodQuery) -> AppResult<Resolution> {
        match query {
            FoodQuery::Photo { image, .. } => {
                self.resolve_photo(image).await.map(Resolution::direct)
            }
            FoodQuery::Barcode { code } => self.resolve_barcode(code).await.map(Resolution::direct),
            FoodQuery::Text { query } => self.resolve_text(query).await,
        }
    }

    async fn resolve_photo(&self, image: &[u8]) -> AppResult<Vec<ProviderCandidate>> {
        let vision = self
            .vision
            .as_ref()
            .ok_or_else(|| PipelineError::config("No vision provider configured"))?;

        let encoded = BASE64_STANDARD.encode(image);
        let concepts = vision.recognize(&encoded).await?;
        if concepts.is_empty() {
            return Err(PipelineError::NoFoodDetected);
        }

        let mut confident: Vec<ProviderCandidate> = concepts
            .iter()
            .filter(|c| c.confidence.is_some_and(|v| v >= VISION_CONFIDENCE_THRESHOLD))
            .cloned()
            .collect();

        if confident.is_empty() {
            debug!(
                concepts = concepts.len(),
                "no concept above threshold, keeping top concepts"
            );
            let mut fallback = concepts;
            order_by_confidence(&mut fallback);
            fallback.truncate(VISION_FALLBACK_TOP_N);
            return Ok(fallback);
        }

        order_by_confidence(&mut confident);
        Ok(confident)
    }

    async fn resolve_barcode(&self, code: &str) -> AppResult<Vec<ProviderCandidate>> {
        let barcode = self
            .barcode
            .as_ref()
            .ok_or_else(|| PipelineError::config("No barcode provider configured"))?;

        match barcode.lookup(code).await? {
            Some(candidate) => Ok(vec![candidate]),
            None => Err(PipelineError::not_found(format!(
                "No product for barcode {code}"
            ))),
        }
    }

    async fn resolve_text(&self, query: &str) -> AppResult<Resolution> {
        let cache_key = query.to_lowercase();
        if let Some(cache) = &self.search_cache {
            if let Some(hit) = cache.get(&cache_key).await {
                debug!(query, "search cache hit");
                return Ok(hit);
            }
        }

        let (phrases, rewritten) = self.search_phrases(query).await;

        // join_all yields results in phrase order regardless of completion order
        let results = join_all(phrases.iter().map(|phrase| self.database.search(phrase))).await;

        let mut seen_ids = HashSet::new();
        let mut merged = Vec::new();
        for result in results {
            for candidate in result? {
                if merged.len() == MAX_TEXT_CANDIDATES {
                    break;
                }
                if let Some(id) = candidate.provider_food_id() {
                    if !seen_ids.insert(id) {
                        continue;
                    }
                }
                merged.push(candidate);
            }
        }
        order_by_confidence(&mut merged);

        info!(
            query,
            phrases = phrases.len(),
            rewritten,
            candidates = merged.len(),
            "text query resolved"
        );

        let resolution = Resolution {
            candidates: merged,
            phrases,
            rewritten,
        };
        // Empty results are not cached so a retry reaches the database again
        if let Some(cache) = &self.search_cache {
            if !resolution.candidates.is_empty() {
                cache.insert(cache_key, resolution.clone()).await;
            }
        }
        Ok(resolution)
    }

    /// Phrases to search; falls back to the original query on any rewrite problem
    async fn search_phrases(&self, query: &str) -> (Vec<String>, bool) {
        let original = || (vec![query.to_owned()], false);
        let Some(rewriter) = &self.rewriter else {
            return original();
        };

        match rewriter.rewrite(query).await {
            Ok(phrases) => {
                let mut seen = HashSet::new();
                let phrases: Vec<String> = phrases
                    .into_iter()
                    .map(|p| p.trim().to_owned())
                    .filter(|p| !p.is_empty() && seen.insert(p.to_lowercase()))
                    .take(MAX_SEARCH_PHRASES)
                    .collect();
                if phrases.is_empty() {
                    warn!(query, "query rewriter returned no usable phrases");
                    original()
                } else {
                    (phrases, true)
                }
            }
            Err(e) => {
                warn!(query, error = %e, "query rewrite failed, using original text");
                original()
            }
        }
    }
}

/// Sort by descending confidence; unranked candidates follow in their
/// original order
pub fn order_by_confidence(candidates: &mut [ProviderCandidate]) {
    candidates.sort_by(|a, b| match (a.confidence, b.confidence) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
