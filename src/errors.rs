// ABOUTME: Error taxonomy for the food identification pipeline
// ABOUTME: Stable error codes plus retryability so callers can pick a recovery path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pipeline Errors
//!
//! Every failure the pipeline can produce reaches the caller as a distinct
//! [`PipelineError`] variant. Nothing is folded into a zeroed nutrition record,
//! so the caller can choose between a retry button, a different search, or
//! manual entry.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result alias used across the crate
pub type AppResult<T> = Result<T, PipelineError>;

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Capture input was rejected
    InvalidInput,
    /// Photo reference could not be read
    UnreadableMedia,
    /// Provider call failed at the network or HTTP level
    ProviderUnavailable,
    /// Vision provider returned no concepts
    NoFoodDetected,
    /// Lookup succeeded but nothing matched
    ResourceNotFound,
    /// Every candidate lacked usable calorie data
    NoUsableNutritionData,
    /// Missing or invalid configuration
    ConfigError,
    /// Meal log collaborator failed
    StorageError,
}

impl ErrorCode {
    /// Wire representation of the code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::UnreadableMedia => "UNREADABLE_MEDIA",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::NoFoodDetected => "NO_FOOD_DETECTED",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::NoUsableNutritionData => "NO_USABLE_NUTRITION_DATA",
            Self::ConfigError => "CONFIG_ERROR",
            Self::StorageError => "STORAGE_ERROR",
        }
    }

    /// Short user-facing description of the code
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::UnreadableMedia => "The photo could not be read",
            Self::ProviderUnavailable => "A food data provider is unavailable, try again",
            Self::NoFoodDetected => "No food was detected in the photo",
            Self::ResourceNotFound => "No matching food was found",
            Self::NoUsableNutritionData => "No usable nutrition data, try a different search",
            Self::ConfigError => "Configuration error",
            Self::StorageError => "The meal log could not be updated",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by capture, resolution, normalization and logging
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Bad capture input; the user must correct it
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The capture collaborator could not produce image bytes
    #[error("Unreadable media: {0}")]
    UnreadableMedia(String),

    /// Network or provider-side failure; retryable by the caller
    #[error("Provider {provider} unavailable: {reason}")]
    ProviderUnavailable {
        /// Name of the failing provider
        provider: String,
        /// Underlying failure description
        reason: String,
    },

    /// The vision provider answered with zero concepts
    #[error("No food detected in image")]
    NoFoodDetected,

    /// The lookup answered but nothing matched
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every candidate was dropped during normalization
    #[error("No usable nutrition data in {candidates} candidate(s)")]
    NoUsableNutritionData {
        /// How many candidates were examined
        candidates: usize,
    },

    /// Configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Meal log collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an unreadable media error
    #[must_use]
    pub fn unreadable_media(message: impl Into<String>) -> Self {
        Self::UnreadableMedia(message.into())
    }

    /// Create a provider unavailable error for the named provider
    #[must_use]
    pub fn provider_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a storage error
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Stable error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::UnreadableMedia(_) => ErrorCode::UnreadableMedia,
            Self::ProviderUnavailable { .. } => ErrorCode::ProviderUnavailable,
            Self::NoFoodDetected => ErrorCode::NoFoodDetected,
            Self::NotFound(_) => ErrorCode::ResourceNotFound,
            Self::NoUsableNutritionData { .. } => ErrorCode::NoUsableNutritionData,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Storage(_) => ErrorCode::StorageError,
        }
    }

    /// Whether repeating the same request may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }

    /// Name of the failing provider, when the error came from one
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderUnavailable { provider, .. } => Some(provider),
            _ => None,
        }
    }
}
