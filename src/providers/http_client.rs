// ABOUTME: Shared reqwest client construction and response error mapping for adapters
// ABOUTME: Converts transport and HTTP status failures into ProviderUnavailable errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::constants::http::USER_AGENT;
use crate::errors::{AppResult, PipelineError};

/// Build the HTTP client an adapter owns
///
/// # Errors
///
/// Returns a configuration error if the TLS backend cannot be initialized
pub fn build_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::config(format!("Failed to create HTTP client: {e}")))
}

/// Map a transport error to `ProviderUnavailable`
pub fn transport_error(provider: &str, error: &reqwest::Error) -> PipelineError {
    let reason = if error.is_timeout() {
        "request timed out".to_owned()
    } else {
        error.to_string()
    };
    PipelineError::provider_unavailable(provider, reason)
}

/// Fail with `ProviderUnavailable` unless the response status is a success
///
/// # Errors
///
/// Returns `ProviderUnavailable` carrying the HTTP status
pub fn ensure_success(provider: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PipelineError::provider_unavailable(
            provider,
            format!("request failed with HTTP {status}"),
        ))
    }
}

/// Decode a JSON body, mapping parse failures to `ProviderUnavailable`
///
/// # Errors
///
/// Returns `ProviderUnavailable` when the body is not the expected JSON shape
pub async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> AppResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PipelineError::provider_unavailable(provider, format!("JSON parse error: {e}")))
}
