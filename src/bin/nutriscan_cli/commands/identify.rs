// ABOUTME: Identification commands for photo, barcode and text captures
// ABOUTME: Prints the normalized result as JSON and logs the best match on request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::{Context, Result};
use chrono::Local;
use nutriscan::capture::RawCaptureInput;
use nutriscan::errors::PipelineError;
use nutriscan::meal_log::{MealEntryRequest, MealType};
use nutriscan::pipeline::FoodPipeline;
use tracing::{error, info};

/// Identify the food in a photo
pub async fn photo(
    pipeline: &FoodPipeline,
    path: String,
    meal_type: Option<MealType>,
    category: String,
) -> Result<()> {
    run(pipeline, RawCaptureInput::Photo(path), meal_type, category).await
}

/// Look up a barcode
pub async fn barcode(
    pipeline: &FoodPipeline,
    code: String,
    meal_type: Option<MealType>,
    category: String,
) -> Result<()> {
    run(pipeline, RawCaptureInput::Barcode(code), meal_type, category).await
}

/// Search by text
pub async fn text(
    pipeline: &FoodPipeline,
    query: String,
    meal_type: Option<MealType>,
    category: String,
) -> Result<()> {
    run(pipeline, RawCaptureInput::Text(query), meal_type, category).await
}

async fn run(
    pipeline: &FoodPipeline,
    input: RawCaptureInput,
    meal_type: Option<MealType>,
    category: String,
) -> Result<()> {
    let identification = match pipeline.identify(input).await {
        Ok(found) => found,
        Err(e) => {
            report_failure(&e);
            return Err(e.into());
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&identification).context("encode result")?
    );

    let Some(meal_type) = meal_type else {
        return Ok(());
    };

    let now = Local::now();
    let request = MealEntryRequest {
        meal_type,
        date: now.date_naive(),
        time: now.time(),
        category,
        entry_method: identification.entry_method,
    };
    let entry = pipeline
        .confirm(&identification.result.best, request)
        .await?;
    info!(id = %entry.id, "logged {} for {}", entry.food_name, entry.meal_type);
    println!(
        "{}",
        serde_json::to_string_pretty(&entry).context("encode entry")?
    );
    Ok(())
}

fn report_failure(e: &PipelineError) {
    let code = e.code();
    if let Some(provider) = e.provider() {
        error!(%code, provider, retryable = e.is_retryable(), "{e}");
    } else {
        error!(%code, retryable = e.is_retryable(), "{e}");
    }
    eprintln!("{}: {}", code, code.description());
}
