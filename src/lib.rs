// ABOUTME: Main library entry point for the nutriscan food identification pipeline
// ABOUTME: Turns photos, barcodes and text into canonical nutrition records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Nutriscan
//!
//! Food identification and nutrition normalization for a fitness tracking
//! client. A capture (photo, barcode or typed text) is validated, resolved
//! against third-party providers, and normalized into one
//! [`models::NutritionRecord`] shape regardless of which provider answered.
//!
//! ## Architecture
//!
//! - **Capture**: input validation and photo loading ([`capture`])
//! - **Resolution**: provider dispatch, thresholds, merging ([`resolution`])
//! - **Normalization**: per-provider field mapping and unit conversion ([`normalization`])
//! - **Providers**: Clarifai, Open Food Facts, `FatSecret`, USDA and an LLM rewriter ([`providers`])
//! - **Meal log**: persistence contract for confirmed records ([`meal_log`])
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use nutriscan::capture::RawCaptureInput;
//! use nutriscan::config::PipelineConfig;
//! use nutriscan::errors::AppResult;
//! use nutriscan::pipeline::FoodPipeline;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let pipeline = FoodPipeline::from_config(&config)?;
//!
//!     let found = pipeline
//!         .identify(RawCaptureInput::Text("greek yogurt".to_owned()))
//!         .await?;
//!     println!("{} kcal", found.result.best.calories);
//!     Ok(())
//! }
//! ```

/// Short-lived response caching
pub mod cache;

/// Capture stage: raw input to `FoodQuery`
pub mod capture;

/// Environment-based configuration
pub mod config;

/// Pipeline thresholds and unit factors
pub mod constants;

/// Error taxonomy with stable codes
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Meal log persistence contract
pub mod meal_log;

/// Queries, candidates and the canonical nutrition record
pub mod models;

/// Provider payload mapping onto the canonical record
pub mod normalization;

/// End-to-end identification
pub mod pipeline;

/// Third-party provider adapters
pub mod providers;

/// Provider dispatch and candidate ordering
pub mod resolution;
