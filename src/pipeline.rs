// ABOUTME: End-to-end food identification combining capture, resolution and normalization
// ABOUTME: Enriches vision concepts with database nutrients and logs confirmed records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Food Pipeline
//!
//! ```text
//! RawCaptureInput -> capture -> FoodQuery -> resolution -> candidates
//!                 -> (vision enrichment) -> normalization -> NormalizedResult
//! ```
//!
//! Vision providers name foods without nutrients. Each retained concept is
//! looked up in the nutrition database and the first usable hit's nutrients
//! are embedded into the concept's payload, keeping the vision provider name
//! and its confidence.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::capture::{self, FsMediaReader, MediaReader, RawCaptureInput};
use crate::config::{NutritionDatabaseKind, PipelineConfig};
use crate::constants::provider_names;
use crate::errors::{AppResult, PipelineError};
use crate::meal_log::{EntryMethod, InMemoryMealLog, MealEntry, MealEntryRequest, MealLogStore};
use crate::models::{FoodQuery, NormalizedResult, NutritionRecord, ProviderCandidate, QueryKind};
use crate::normalization;
use crate::providers::{
    ClarifaiVision, FatSecretClient, LlmQueryRewriter, NutritionDatabase, OpenFoodFactsClient,
    UsdaClient,
};
use crate::resolution::Resolver;

/// Outcome of identifying one capture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    /// Kind of query that was resolved
    pub query_kind: QueryKind,
    /// Entry method to record if the user confirms
    pub entry_method: EntryMethod,
    /// Phrases searched for text queries
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phrases: Vec<String>,
    /// Best match and alternates
    pub result: NormalizedResult,
}

/// Capture, resolution, normalization and logging wired together
pub struct FoodPipeline {
    media: Arc<dyn MediaReader>,
    resolver: Resolver,
    store: Arc<dyn MealLogStore>,
}

impl FoodPipeline {
    /// Assemble a pipeline from its collaborators
    #[must_use]
    pub fn new(
        media: Arc<dyn MediaReader>,
        resolver: Resolver,
        store: Arc<dyn MealLogStore>,
    ) -> Self {
        Self {
            media,
            resolver,
            store,
        }
    }

    /// Build a pipeline with the real provider adapters, a filesystem media
    /// reader and an in-memory meal log
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the selected providers lack credentials
    pub fn from_config(config: &PipelineConfig) -> AppResult<Self> {
        config.validate()?;

        let database: Arc<dyn NutritionDatabase> = match config.nutrition_database {
            NutritionDatabaseKind::Usda => Arc::new(UsdaClient::new(config.usda.clone())?),
            NutritionDatabaseKind::FatSecret => {
                Arc::new(FatSecretClient::new(config.fatsecret.clone())?)
            }
        };

        let mut resolver = Resolver::new(database)
            .with_barcode(Arc::new(OpenFoodFactsClient::new(
                config.open_food_facts.clone(),
            )?))
            .with_search_cache(config.search_cache_ttl);

        if config.vision_enabled() {
            resolver = resolver.with_vision(Arc::new(ClarifaiVision::new(config.clarifai.clone())?));
        }
        if let Some(llm) = &config.llm {
            resolver = resolver.with_rewriter(Arc::new(LlmQueryRewriter::new(llm.clone())?));
        }

        Ok(Self::new(
            Arc::new(FsMediaReader::new()),
            resolver,
            Arc::new(InMemoryMealLog::new()),
        ))
    }

    /// Meal log this pipeline writes to
    #[must_use]
    pub fn store(&self) -> &Arc<dyn MealLogStore> {
        &self.store
    }

    /// Identify the food in a capture
    ///
    /// # Errors
    ///
    /// Every pipeline error kind reaches the caller unchanged; see
    /// [`PipelineError`]
    #[instrument(skip(self, input))]
    pub async fn identify(&self, input: RawCaptureInput) -> AppResult<Identification> {
        let query = capture::normalize(input, self.media.as_ref()).await?;
        let query_kind = query.kind();
        let resolution = self.resolver.resolve_detailed(&query).await?;

        let candidates = match query {
            FoodQuery::Photo { .. } => self.enrich_vision(resolution.candidates).await?,
            FoodQuery::Text { query } if resolution.candidates.is_empty() => {
                return Err(PipelineError::not_found(format!("No foods match '{query}'")));
            }
            FoodQuery::Barcode { .. } | FoodQuery::Text { .. } => resolution.candidates,
        };

        let result = normalization::normalize(&candidates)?;
        info!(
            kind = %query_kind,
            best = %result.best.food_name,
            alternates = result.alternates.len(),
            "food identified"
        );

        Ok(Identification {
            query_kind,
            entry_method: EntryMethod::for_query(query_kind, resolution.rewritten),
            phrases: resolution.phrases,
            result,
        })
    }

    /// Persist a confirmed record
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Storage`] when the meal log rejects the entry
    pub async fn confirm(
        &self,
        record: &NutritionRecord,
        request: MealEntryRequest,
    ) -> AppResult<MealEntry> {
        let entry = MealEntry::from_record(record, request);
        self.store.save_entry(&entry).await?;
        info!(
            id = %entry.id,
            meal_type = %entry.meal_type,
            calories = entry.calories,
            "meal entry logged"
        );
        Ok(entry)
    }

    /// Attach database nutrients to each vision concept, one lookup at a time
    async fn enrich_vision(
        &self,
        candidates: Vec<ProviderCandidate>,
    ) -> AppResult<Vec<ProviderCandidate>> {
        let database = self.resolver.database();
        let mut enriched = Vec::with_capacity(candidates.len());

        for mut candidate in candidates {
            if candidate.provider_name == provider_names::VISION {
                let name = candidate
                    .raw_payload
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_owned);

                if let Some(name) = name {
                    let hits = database.search(&name).await?;
                    match hits.iter().find_map(normalization::map_candidate) {
                        Some(record) => {
                            let nutrition = serde_json::to_value(&record).map_err(|e| {
                                PipelineError::provider_unavailable(
                                    database.name(),
                                    format!("nutrition encode error: {e}"),
                                )
                            })?;
                            if let Some(payload) = candidate.raw_payload.as_object_mut() {
                                payload.insert("nutrition".to_owned(), nutrition);
                            }
                        }
                        None => debug!(concept = %name, "no nutrition data for concept"),
                    }
                }
            }
            enriched.push(candidate);
        }
        Ok(enriched)
    }
}
