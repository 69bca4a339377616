// ABOUTME: Core data types flowing through the food identification pipeline
// ABOUTME: Queries, raw provider candidates and the canonical nutrition record
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pipeline Models
//!
//! [`FoodQuery`] is what capture produces, [`ProviderCandidate`] is what
//! resolution produces, and [`NutritionRecord`] is the only shape handed to
//! the rest of the application.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Normalized query produced by the capture stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoodQuery {
    /// Photo whose bytes were already resolved by the media reader
    Photo {
        /// Opaque reference the photo came from
        image_ref: String,
        /// Image content
        image: Bytes,
    },
    /// Decoded barcode, digits only
    Barcode {
        /// Barcode digits
        code: String,
    },
    /// Free-text food description
    Text {
        /// Trimmed query text
        query: String,
    },
}

impl FoodQuery {
    /// Query kind label used in logs
    #[must_use]
    pub const fn kind(&self) -> QueryKind {
        match self {
            Self::Photo { .. } => QueryKind::Photo,
            Self::Barcode { .. } => QueryKind::Barcode,
            Self::Text { .. } => QueryKind::Text,
        }
    }
}

/// Discriminant of [`FoodQuery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Photo capture
    Photo,
    /// Barcode scan
    Barcode,
    /// Typed text
    Text,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photo => f.write_str("photo"),
            Self::Barcode => f.write_str("barcode"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// One provider's raw answer for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCandidate {
    /// Canonical provider name, selects the mapping function
    pub provider_name: String,
    /// Provider response fragment for this candidate
    pub raw_payload: Value,
    /// Recognition confidence in [0,1]; `None` means unranked
    pub confidence: Option<f64>,
}

impl ProviderCandidate {
    /// Create a candidate without confidence
    #[must_use]
    pub fn new(provider_name: impl Into<String>, raw_payload: Value) -> Self {
        Self {
            provider_name: provider_name.into(),
            raw_payload,
            confidence: None,
        }
    }

    /// Attach a confidence, clamped to [0,1]; non-finite values are discarded
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence
            .is_finite()
            .then(|| confidence.clamp(0.0, 1.0));
        self
    }

    /// Provider's own identifier for the food, used for de-duplication
    #[must_use]
    pub fn provider_food_id(&self) -> Option<String> {
        match self.raw_payload.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Canonical nutrition record
///
/// Macros are grams, sodium is milligrams and energy is kilocalories.
/// Values are never negative or non-finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionRecord {
    /// Display name of the food
    pub food_name: String,
    /// Brand, for packaged foods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    /// Serving the values refer to (e.g. "100 g", "1 cup")
    pub serving_description: String,
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein_grams: f64,
    /// Carbohydrates in grams
    pub carbs_grams: f64,
    /// Fat in grams
    pub fat_grams: f64,
    /// Dietary fiber in grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_grams: Option<f64>,
    /// Sugars in grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar_grams: Option<f64>,
    /// Sodium in milligrams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium_mg: Option<f64>,
    /// Provider the record was built from
    pub source_provider: String,
    /// Provider confidence in [0,1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_confidence: Option<f64>,
}

/// Output of nutrition normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Highest ranked usable record
    pub best: NutritionRecord,
    /// Remaining usable records in rank order
    pub alternates: Vec<NutritionRecord>,
}

impl NormalizedResult {
    /// Every record, best first
    pub fn records(&self) -> impl Iterator<Item = &NutritionRecord> {
        std::iter::once(&self.best).chain(self.alternates.iter())
    }
}
