// ABOUTME: Shared test utilities and fake providers for integration tests
// ABOUTME: Fakes count their calls so tests can assert what reached the network
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `nutriscan`
//!
//! Provider fakes implement the adapter traits and never touch the network.

use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use nutriscan::capture::MediaReader;
use nutriscan::constants::provider_names;
use nutriscan::errors::{AppResult, PipelineError};
use nutriscan::meal_log::InMemoryMealLog;
use nutriscan::models::ProviderCandidate;
use nutriscan::pipeline::FoodPipeline;
use nutriscan::providers::{BarcodeProvider, NutritionDatabase, QueryRewriter, VisionProvider};
use nutriscan::resolution::Resolver;
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

// ============================================================================
// Candidate builders
// ============================================================================

/// Vision concept as the Clarifai adapter emits it
pub fn vision_concept(name: &str, value: f64) -> ProviderCandidate {
    ProviderCandidate::new(
        provider_names::VISION,
        json!({ "id": format!("ai_{}", name.replace(' ', "_")), "name": name, "value": value }),
    )
    .with_confidence(value)
}

/// USDA search hit with energy in kcal
pub fn usda_food(fdc_id: u64, description: &str, kcal: f64) -> ProviderCandidate {
    ProviderCandidate::new(
        provider_names::USDA,
        json!({
            "id": fdc_id,
            "fdcId": fdc_id,
            "description": description,
            "dataType": "Foundation",
            "foodNutrients": [
                { "nutrientId": 1008, "nutrientName": "Energy", "unitName": "KCAL", "value": kcal },
                { "nutrientId": 1003, "nutrientName": "Protein", "unitName": "G", "value": 31.0 },
                { "nutrientId": 1005, "nutrientName": "Carbohydrate, by difference", "unitName": "G", "value": 0.0 },
                { "nutrientId": 1004, "nutrientName": "Total lipid (fat)", "unitName": "G", "value": 3.6 },
                { "nutrientId": 1093, "nutrientName": "Sodium, Na", "unitName": "MG", "value": 74.0 }
            ]
        }),
    )
}

/// `FatSecret` search hit
pub fn fatsecret_food(id: &str, name: &str, description: &str) -> ProviderCandidate {
    ProviderCandidate::new(
        provider_names::FATSECRET,
        json!({
            "id": id,
            "food_id": id,
            "food_name": name,
            "food_type": "Generic",
            "food_description": description,
        }),
    )
}

/// Open Food Facts product with the given nutriments
pub fn off_product(code: &str, name: &str, nutriments: Value) -> ProviderCandidate {
    ProviderCandidate::new(
        provider_names::OPEN_FOOD_FACTS,
        json!({
            "id": code,
            "code": code,
            "product_name": name,
            "brands": "Acme Foods, Acme",
            "nutriments": nutriments,
        }),
    )
}

// ============================================================================
// Provider fakes
// ============================================================================

/// Vision fake returning a fixed concept list
pub struct FakeVision {
    result: AppResult<Vec<ProviderCandidate>>,
    pub calls: AtomicUsize,
}

impl FakeVision {
    pub fn returning(concepts: Vec<ProviderCandidate>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(concepts),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(PipelineError::provider_unavailable(
                provider_names::VISION,
                "connection refused",
            )),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionProvider for FakeVision {
    fn name(&self) -> &'static str {
        provider_names::VISION
    }

    async fn recognize(&self, image_base64: &str) -> AppResult<Vec<ProviderCandidate>> {
        assert!(!image_base64.is_empty(), "image must be encoded");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Barcode fake with a fixed product table
pub struct FakeBarcode {
    products: HashMap<String, ProviderCandidate>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeBarcode {
    pub fn with_products(products: Vec<ProviderCandidate>) -> Arc<Self> {
        let products = products
            .into_iter()
            .map(|p| (p.provider_food_id().unwrap(), p))
            .collect();
        Arc::new(Self {
            products,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            products: HashMap::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BarcodeProvider for FakeBarcode {
    fn name(&self) -> &'static str {
        provider_names::OPEN_FOOD_FACTS
    }

    async fn lookup(&self, code: &str) -> AppResult<Option<ProviderCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PipelineError::provider_unavailable(
                provider_names::OPEN_FOOD_FACTS,
                "HTTP 503",
            ));
        }
        Ok(self.products.get(code).cloned())
    }
}

/// Nutrition database fake keyed by lowercased phrase
pub struct FakeDatabase {
    results: HashMap<String, Vec<ProviderCandidate>>,
    delays: HashMap<String, Duration>,
    failing_phrases: Vec<String>,
    pub calls: AtomicUsize,
    pub phrases: Mutex<Vec<String>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            delays: HashMap::new(),
            failing_phrases: Vec::new(),
            calls: AtomicUsize::new(0),
            phrases: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, phrase: &str, candidates: Vec<ProviderCandidate>) -> Self {
        self.results.insert(phrase.to_lowercase(), candidates);
        self
    }

    pub fn with_delay(mut self, phrase: &str, delay: Duration) -> Self {
        self.delays.insert(phrase.to_lowercase(), delay);
        self
    }

    pub fn failing_on(mut self, phrase: &str) -> Self {
        self.failing_phrases.push(phrase.to_lowercase());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn searched_phrases(&self) -> Vec<String> {
        self.phrases.lock().unwrap().clone()
    }
}

#[async_trait]
impl NutritionDatabase for FakeDatabase {
    fn name(&self) -> &'static str {
        provider_names::USDA
    }

    async fn search(&self, phrase: &str) -> AppResult<Vec<ProviderCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.phrases.lock().unwrap().push(phrase.to_owned());
        let key = phrase.to_lowercase();
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_phrases.contains(&key) {
            return Err(PipelineError::provider_unavailable(
                provider_names::USDA,
                "request timed out",
            ));
        }
        Ok(self.results.get(&key).cloned().unwrap_or_default())
    }
}

/// Query rewriter fake
pub struct FakeRewriter {
    result: AppResult<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeRewriter {
    pub fn returning(phrases: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(phrases.iter().map(|p| (*p).to_owned()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(PipelineError::provider_unavailable(
                provider_names::QUERY_REWRITER,
                "HTTP 500",
            )),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryRewriter for FakeRewriter {
    fn name(&self) -> &'static str {
        provider_names::QUERY_REWRITER
    }

    async fn rewrite(&self, _query: &str) -> AppResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Media reader serving in-memory images by reference
pub struct FakeMedia {
    images: HashMap<String, Bytes>,
}

impl FakeMedia {
    pub fn with_image(image_ref: &str, content: &'static [u8]) -> Arc<Self> {
        let mut images = HashMap::new();
        images.insert(image_ref.to_owned(), Bytes::from_static(content));
        Arc::new(Self { images })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            images: HashMap::new(),
        })
    }
}

#[async_trait]
impl MediaReader for FakeMedia {
    async fn read(&self, image_ref: &str) -> AppResult<Bytes> {
        self.images
            .get(image_ref)
            .cloned()
            .ok_or_else(|| PipelineError::unreadable_media(format!("{image_ref} not found")))
    }
}

/// Pipeline over fakes with an in-memory meal log
pub fn create_test_pipeline(media: Arc<FakeMedia>, resolver: Resolver) -> FoodPipeline {
    init_test_logging();
    FoodPipeline::new(media, resolver, Arc::new(InMemoryMealLog::new()))
}
