// ABOUTME: Clarifai food-item-recognition adapter for photo capture
// ABOUTME: Sends a base64 image and returns every reported concept with its confidence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Clarifai image recognition
//!
//! API reference: <https://docs.clarifai.com/api-guide/predict/images>

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use super::http_client::{build_client, ensure_success, read_json, transport_error};
use super::VisionProvider;
use crate::config::ClarifaiConfig;
use crate::constants::provider_names;
use crate::errors::{AppResult, PipelineError};
use crate::models::ProviderCandidate;

/// Status code Clarifai reports for a successful call
const CLARIFAI_SUCCESS: u32 = 10000;

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    inputs: [PredictInput<'a>; 1],
}

#[derive(Debug, Serialize)]
struct PredictInput<'a> {
    data: InputData<'a>,
}

#[derive(Debug, Serialize)]
struct InputData<'a> {
    image: ImageData<'a>,
}

#[derive(Debug, Serialize)]
struct ImageData<'a> {
    base64: &'a str,
}

/// Body of a model prediction call
#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    status: ApiStatus,
    #[serde(default)]
    outputs: Vec<Output>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Output {
    data: Option<OutputData>,
}

#[derive(Debug, Deserialize)]
struct OutputData {
    #[serde(default)]
    concepts: Vec<Concept>,
}

#[derive(Debug, Deserialize)]
struct Concept {
    #[serde(default)]
    id: Option<String>,
    name: String,
    value: f64,
}

/// Turn a prediction body into vision candidates, one per concept
///
/// # Errors
///
/// Returns `ProviderUnavailable` when the body carries a non-success status,
/// which Clarifai reports alongside HTTP 200
pub fn candidates_from_predict(predict: PredictResponse) -> AppResult<Vec<ProviderCandidate>> {
    let provider = provider_names::VISION;
    if predict.status.code != CLARIFAI_SUCCESS {
        return Err(PipelineError::provider_unavailable(
            provider,
            format!(
                "status {}: {}",
                predict.status.code, predict.status.description
            ),
        ));
    }

    Ok(predict
        .outputs
        .into_iter()
        .filter_map(|output| output.data)
        .flat_map(|data| data.concepts)
        .map(|concept| {
            ProviderCandidate::new(
                provider,
                json!({
                    "id": concept.id,
                    "name": concept.name,
                    "value": concept.value,
                }),
            )
            .with_confidence(concept.value)
        })
        .collect())
}

/// Clarifai vision provider
pub struct ClarifaiVision {
    config: ClarifaiConfig,
    http_client: Client,
}

impl ClarifaiVision {
    /// Create a Clarifai adapter
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no access token is set or the HTTP
    /// client cannot be built
    pub fn new(config: ClarifaiConfig) -> AppResult<Self> {
        if config.api_key.is_empty() {
            return Err(PipelineError::config(
                "CLARIFAI_PAT is required for photo recognition",
            ));
        }
        let http_client = build_client(config.timeout)?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl VisionProvider for ClarifaiVision {
    fn name(&self) -> &'static str {
        provider_names::VISION
    }

    #[instrument(skip(self, image_base64), fields(model = %self.config.model_id))]
    async fn recognize(&self, image_base64: &str) -> AppResult<Vec<ProviderCandidate>> {
        let provider = self.name();
        let url = format!(
            "{}/models/{}/outputs",
            self.config.base_url, self.config.model_id
        );
        let body = PredictRequest {
            inputs: [PredictInput {
                data: InputData {
                    image: ImageData {
                        base64: image_base64,
                    },
                },
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Key {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(provider, &e))?;

        let response = ensure_success(provider, response)?;
        let predict: PredictResponse = read_json(provider, response).await?;

        let candidates = candidates_from_predict(predict)?;
        debug!(concepts = candidates.len(), "vision recognition complete");
        Ok(candidates)
    }
}
