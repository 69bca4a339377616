// ABOUTME: LLM-backed rewriting of free-text food queries into alternative search phrases
// ABOUTME: Extracts a JSON array from model output and keeps only valid string entries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! AI query rewriting
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. Model output
//! is free text; the first JSON array found in it is taken as the phrase list.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::http_client::{build_client, ensure_success, read_json, transport_error};
use super::QueryRewriter;
use crate::config::LlmConfig;
use crate::constants::provider_names;
use crate::constants::resolution::MAX_REWRITTEN_PHRASES;
use crate::errors::{AppResult, PipelineError};

const SYSTEM_PROMPT: &str = "You turn casual food descriptions into search terms for a nutrition \
database. Reply with a JSON array of 2 or 3 short, specific search phrases and nothing else.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Parse one JSON array starting at `text[0]`, ignoring anything after it
fn leading_array(text: &str) -> Option<Vec<Value>> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Vec<Value>>()
        .next()?
        .ok()
}

/// Pull search phrases out of model output
///
/// Finds the first JSON array in `text` and keeps each entry that is a
/// non-blank string; other entries are dropped individually. Returns `None`
/// when no array parses or no entry survives.
#[must_use]
pub fn extract_phrases(text: &str) -> Option<Vec<String>> {
    let array = text
        .match_indices('[')
        .find_map(|(start, _)| leading_array(&text[start..]))?;

    let phrases: Vec<String> = array
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            _ => None,
        })
        .take(MAX_REWRITTEN_PHRASES)
        .collect();

    (!phrases.is_empty()).then_some(phrases)
}

/// Query rewriter backed by a chat completion model
pub struct LlmQueryRewriter {
    config: LlmConfig,
    http_client: Client,
}

impl LlmQueryRewriter {
    /// Create a rewriter
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn new(config: LlmConfig) -> AppResult<Self> {
        let http_client = build_client(config.timeout)?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl QueryRewriter for LlmQueryRewriter {
    fn name(&self) -> &'static str {
        provider_names::QUERY_REWRITER
    }

    #[instrument(skip(self), fields(model = %self.config.model))]
    async fn rewrite(&self, query: &str) -> AppResult<Vec<String>> {
        let provider = self.name();
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            temperature: 0.2,
            max_tokens: 120,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(provider, &e))?;

        let response = ensure_success(provider, response)?;
        let chat: ChatResponse = read_json(provider, response).await?;

        let content = chat
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::provider_unavailable(provider, "empty completion"))?;

        let phrases = extract_phrases(&content).ok_or_else(|| {
            PipelineError::provider_unavailable(provider, "completion contained no phrase array")
        })?;
        debug!(count = phrases.len(), "query rewritten");
        Ok(phrases)
    }
}
