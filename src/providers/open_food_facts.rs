// ABOUTME: Open Food Facts barcode lookup adapter
// ABOUTME: Returns the product payload for a barcode, or None when the product is unknown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Open Food Facts product lookup
//!
//! API reference: <https://openfoodfacts.github.io/openfoodfacts-server/api/>

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::http_client::{build_client, ensure_success, read_json, transport_error};
use super::BarcodeProvider;
use crate::config::OpenFoodFactsConfig;
use crate::constants::provider_names;
use crate::errors::AppResult;
use crate::models::ProviderCandidate;

/// Fields requested from the product endpoint
const PRODUCT_FIELDS: &str = "code,product_name,brands,serving_size,nutriments";

/// Body of a product lookup
#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    #[serde(default)]
    status: i64,
    product: Option<Value>,
}

/// Candidate for a found product, keyed by the barcode
///
/// Bodies with `status` other than 1 or without a product object describe
/// an unknown barcode and yield `None`.
#[must_use]
pub fn product_candidate(code: &str, body: ProductResponse) -> Option<ProviderCandidate> {
    match body.product {
        Some(Value::Object(mut product)) if body.status == 1 => {
            product.insert("id".to_owned(), Value::String(code.to_owned()));
            Some(ProviderCandidate::new(
                provider_names::OPEN_FOOD_FACTS,
                Value::Object(product),
            ))
        }
        _ => {
            debug!(status = body.status, "product not found");
            None
        }
    }
}

/// Open Food Facts barcode provider
pub struct OpenFoodFactsClient {
    config: OpenFoodFactsConfig,
    http_client: Client,
}

impl OpenFoodFactsClient {
    /// Create an Open Food Facts adapter
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn new(config: OpenFoodFactsConfig) -> AppResult<Self> {
        let http_client = build_client(config.timeout)?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl BarcodeProvider for OpenFoodFactsClient {
    fn name(&self) -> &'static str {
        provider_names::OPEN_FOOD_FACTS
    }

    #[instrument(skip(self))]
    async fn lookup(&self, code: &str) -> AppResult<Option<ProviderCandidate>> {
        let provider = self.name();
        let url = format!("{}/api/v2/product/{code}.json", self.config.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("fields", PRODUCT_FIELDS)])
            .send()
            .await
            .map_err(|e| transport_error(provider, &e))?;

        // v2 answers unknown products with 404 and status 0
        if response.status() == StatusCode::NOT_FOUND {
            debug!("product not found");
            return Ok(None);
        }

        let response = ensure_success(provider, response)?;
        let body: ProductResponse = read_json(provider, response).await?;

        Ok(product_candidate(code, body))
    }
}
