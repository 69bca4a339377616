// ABOUTME: Capture stage turning raw photo, barcode or text input into a FoodQuery
// ABOUTME: Validates input and resolves photo references through a MediaReader collaborator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Capture & Pre-normalize
//!
//! Validation happens here, before any provider is contacted. A text query
//! that is too short never reaches the network.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tracing::debug;

use crate::constants::capture::{MAX_IMAGE_BYTES, MIN_QUERY_CHARS};
use crate::errors::{AppResult, PipelineError};
use crate::models::FoodQuery;

/// Raw input as received from the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCaptureInput {
    /// Photo handle or URI
    Photo(String),
    /// Decoded barcode text
    Barcode(String),
    /// User-typed text
    Text(String),
}

/// Resolves a photo reference to its bytes
#[async_trait]
pub trait MediaReader: Send + Sync {
    /// Read the referenced image
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnreadableMedia`] when the reference cannot be read
    async fn read(&self, image_ref: &str) -> AppResult<Bytes>;
}

/// Reads photo references from the local filesystem
///
/// Accepts plain paths and `file://` URIs.
#[derive(Debug, Clone, Default)]
pub struct FsMediaReader {
    root: Option<PathBuf>,
}

impl FsMediaReader {
    /// Reader resolving paths as given
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None }
    }

    /// Reader resolving relative paths against `root`
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve_path(&self, image_ref: &str) -> PathBuf {
        let raw = image_ref.strip_prefix("file://").unwrap_or(image_ref);
        let path = PathBuf::from(raw);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl MediaReader for FsMediaReader {
    async fn read(&self, image_ref: &str) -> AppResult<Bytes> {
        let path = self.resolve_path(image_ref);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            PipelineError::unreadable_media(format!("{}: {e}", path.display()))
        })?;

        if !metadata.is_file() {
            return Err(PipelineError::unreadable_media(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if metadata.len() > MAX_IMAGE_BYTES as u64 {
            return Err(PipelineError::unreadable_media(format!(
                "{} exceeds {MAX_IMAGE_BYTES} bytes",
                path.display()
            )));
        }

        let content = tokio::fs::read(&path).await.map_err(|e| {
            PipelineError::unreadable_media(format!("{}: {e}", path.display()))
        })?;
        Ok(Bytes::from(content))
    }
}

/// Validate raw input and produce a [`FoodQuery`]
///
/// # Errors
///
/// - [`PipelineError::InvalidInput`] for a non-numeric barcode or a text query
///   shorter than two characters
/// - [`PipelineError::UnreadableMedia`] when the photo cannot be read or is empty
pub async fn normalize(input: RawCaptureInput, media: &dyn MediaReader) -> AppResult<FoodQuery> {
    match input {
        RawCaptureInput::Barcode(raw) => normalize_barcode(&raw),
        RawCaptureInput::Text(raw) => normalize_text(&raw),
        RawCaptureInput::Photo(image_ref) => {
            let image_ref = image_ref.trim().to_owned();
            if image_ref.is_empty() {
                return Err(PipelineError::unreadable_media("empty photo reference"));
            }
            let image = media.read(&image_ref).await?;
            if image.is_empty() {
                return Err(PipelineError::unreadable_media(format!(
                    "{image_ref} has no content"
                )));
            }
            debug!(image_ref = %image_ref, bytes = image.len(), "photo captured");
            Ok(FoodQuery::Photo { image_ref, image })
        }
    }
}

/// Validate a barcode; spaces and hyphens are ignored
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] unless the remaining characters are
/// a non-empty run of ASCII digits
pub fn normalize_barcode(raw: &str) -> AppResult<FoodQuery> {
    let code: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if code.is_empty() {
        return Err(PipelineError::invalid_input("Barcode cannot be empty"));
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(PipelineError::invalid_input(format!(
            "Barcode must be numeric, got '{raw}'"
        )));
    }
    Ok(FoodQuery::Barcode { code })
}

/// Validate a text query
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] when the trimmed text is shorter
/// than [`MIN_QUERY_CHARS`] characters
pub fn normalize_text(raw: &str) -> AppResult<FoodQuery> {
    let query = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if query.chars().count() < MIN_QUERY_CHARS {
        return Err(PipelineError::invalid_input(format!(
            "Search query must be at least {MIN_QUERY_CHARS} characters"
        )));
    }
    Ok(FoodQuery::Text { query })
}
