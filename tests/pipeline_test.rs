// ABOUTME: End-to-end pipeline tests from raw capture to logged meal entry
// ABOUTME: Exercises vision enrichment, entry-method tagging and the in-memory meal log
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use common::{
    create_test_pipeline, off_product, usda_food, vision_concept, FakeBarcode, FakeDatabase,
    FakeMedia, FakeRewriter, FakeVision,
};
use nutriscan::capture::RawCaptureInput;
use nutriscan::errors::ErrorCode;
use nutriscan::meal_log::{
    daily_totals, EntryMethod, InMemoryMealLog, MealEntry, MealEntryRequest, MealLogStore,
    MealType,
};
use nutriscan::models::QueryKind;
use nutriscan::pipeline::FoodPipeline;
use nutriscan::resolution::Resolver;
use serde_json::json;

fn request(meal_type: MealType, entry_method: EntryMethod, hour: u32) -> MealEntryRequest {
    MealEntryRequest {
        meal_type,
        date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        time: NaiveTime::from_hms_opt(hour, 30, 0).unwrap(),
        category: "protein".to_owned(),
        entry_method,
    }
}

#[tokio::test]
async fn test_photo_identifies_enriched_vision_record() {
    let vision = FakeVision::returning(vec![
        vision_concept("grilled chicken", 0.91),
        vision_concept("rice", 0.82),
        vision_concept("plate", 0.3),
    ]);
    let database = Arc::new(
        FakeDatabase::new()
            .with("grilled chicken", vec![usda_food(171_077, "Chicken, grilled", 165.0)])
            .with("rice", vec![usda_food(169_756, "Rice, white, cooked", 130.0)]),
    );
    let resolver = Resolver::new(database.clone()).with_vision(vision.clone());
    let pipeline = create_test_pipeline(FakeMedia::with_image("dinner.jpg", b"jpeg"), resolver);

    let found = pipeline
        .identify(RawCaptureInput::Photo("dinner.jpg".to_owned()))
        .await
        .unwrap();

    assert_eq!(found.query_kind, QueryKind::Photo);
    assert_eq!(found.entry_method, EntryMethod::Photo);
    assert_eq!(found.result.best.food_name, "grilled chicken");
    assert_eq!(found.result.best.source_provider, "vision");
    assert_eq!(found.result.best.source_confidence, Some(0.91));
    assert!((found.result.best.calories - 165.0).abs() < 1e-9);
    assert_eq!(found.result.alternates.len(), 1);
    assert_eq!(found.result.alternates[0].food_name, "rice");
    assert_eq!(vision.call_count(), 1);
    assert_eq!(database.searched_phrases(), vec!["grilled chicken", "rice"]);
}

#[tokio::test]
async fn test_low_confidence_photo_still_identifies() {
    let vision = FakeVision::returning(vec![
        vision_concept("casserole", 0.45),
        vision_concept("lasagna", 0.62),
        vision_concept("gratin", 0.2),
        vision_concept("bread", 0.1),
    ]);
    let database = Arc::new(
        FakeDatabase::new()
            .with("lasagna", vec![usda_food(1, "Lasagna, meat", 135.0)])
            .with("gratin", vec![usda_food(2, "Potato gratin", 120.0)]),
    );
    let resolver = Resolver::new(database.clone()).with_vision(vision);
    let pipeline = create_test_pipeline(FakeMedia::with_image("tray.jpg", b"jpeg"), resolver);

    let found = pipeline
        .identify(RawCaptureInput::Photo("tray.jpg".to_owned()))
        .await
        .unwrap();

    assert_eq!(found.result.best.food_name, "lasagna");
    assert_eq!(found.result.alternates[0].food_name, "gratin");
    assert_eq!(
        database.searched_phrases(),
        vec!["lasagna", "casserole", "gratin"]
    );
}

#[tokio::test]
async fn test_photo_with_no_database_matches_is_no_usable_data() {
    let vision = FakeVision::returning(vec![vision_concept("mystery dish", 0.95)]);
    let resolver = Resolver::new(Arc::new(FakeDatabase::new())).with_vision(vision);
    let pipeline = create_test_pipeline(FakeMedia::with_image("x.jpg", b"jpeg"), resolver);

    let err = pipeline
        .identify(RawCaptureInput::Photo("x.jpg".to_owned()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::NoUsableNutritionData);
}

#[tokio::test]
async fn test_enrichment_database_failure_propagates() {
    let vision = FakeVision::returning(vec![vision_concept("soup", 0.9)]);
    let database = Arc::new(FakeDatabase::new().failing_on("soup"));
    let resolver = Resolver::new(database).with_vision(vision);
    let pipeline = create_test_pipeline(FakeMedia::with_image("s.jpg", b"jpeg"), resolver);

    let err = pipeline
        .identify(RawCaptureInput::Photo("s.jpg".to_owned()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderUnavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_barcode_identifies_packaged_food() {
    let barcode = FakeBarcode::with_products(vec![off_product(
        "3017624010701",
        "Hazelnut spread",
        json!({ "energy-kcal_100g": 539, "proteins_100g": 6.3, "sodium_100g": 0.0428 }),
    )]);
    let database = Arc::new(FakeDatabase::new());
    let resolver = Resolver::new(database.clone()).with_barcode(barcode);
    let pipeline = create_test_pipeline(FakeMedia::empty(), resolver);

    let found = pipeline
        .identify(RawCaptureInput::Barcode("3017624010701".to_owned()))
        .await
        .unwrap();

    assert_eq!(found.entry_method, EntryMethod::Barcode);
    assert_eq!(found.result.best.brand_name.as_deref(), Some("Acme Foods"));
    assert!((found.result.best.sodium_mg.unwrap() - 42.8).abs() < 1e-6);
    assert!(found.result.alternates.is_empty());
    assert!(found.phrases.is_empty());
    assert_eq!(database.call_count(), 0);
}

#[tokio::test]
async fn test_rewritten_text_is_ai_suggestion() {
    let database = Arc::new(
        FakeDatabase::new().with("scrambled eggs", vec![usda_food(9, "Egg, scrambled", 149.0)]),
    );
    let resolver =
        Resolver::new(database).with_rewriter(FakeRewriter::returning(&["scrambled eggs"]));
    let pipeline = create_test_pipeline(FakeMedia::empty(), resolver);

    let found = pipeline
        .identify(RawCaptureInput::Text("eggs how mom makes them".to_owned()))
        .await
        .unwrap();

    assert_eq!(found.entry_method, EntryMethod::AiSuggestion);
    assert_eq!(found.phrases, vec!["scrambled eggs"]);
}

#[tokio::test]
async fn test_plain_text_is_manual() {
    let database =
        Arc::new(FakeDatabase::new().with("banana", vec![usda_food(4, "Banana, raw", 89.0)]));
    let resolver = Resolver::new(database).with_rewriter(FakeRewriter::failing());
    let pipeline = create_test_pipeline(FakeMedia::empty(), resolver);

    let found = pipeline
        .identify(RawCaptureInput::Text("banana".to_owned()))
        .await
        .unwrap();

    assert_eq!(found.entry_method, EntryMethod::Manual);
    assert_eq!(found.result.best.food_name, "Banana, raw");
}

#[tokio::test]
async fn test_text_without_matches_is_not_found() {
    let database = Arc::new(FakeDatabase::new());
    let pipeline = create_test_pipeline(FakeMedia::empty(), Resolver::new(database.clone()));

    let err = pipeline
        .identify(RawCaptureInput::Text("unobtainium stew".to_owned()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ResourceNotFound);
    assert!(err.to_string().contains("unobtainium stew"));
    assert_eq!(database.call_count(), 1);
}

#[tokio::test]
async fn test_identification_serializes_for_callers() {
    let database =
        Arc::new(FakeDatabase::new().with("banana", vec![usda_food(4, "Banana, raw", 89.0)]));
    let pipeline = create_test_pipeline(FakeMedia::empty(), Resolver::new(database));

    let found = pipeline
        .identify(RawCaptureInput::Text("banana".to_owned()))
        .await
        .unwrap();
    let value = serde_json::to_value(&found).unwrap();

    assert_eq!(value["query_kind"], "text");
    assert_eq!(value["entry_method"], "manual");
    assert_eq!(value["result"]["best"]["foodName"], "Banana, raw");
}

#[tokio::test]
async fn test_confirm_logs_entry_and_totals_add_up() {
    let database = Arc::new(
        FakeDatabase::new()
            .with("chicken breast", vec![usda_food(1, "Chicken breast", 165.0)])
            .with("brown rice", vec![usda_food(2, "Brown rice", 123.0)]),
    );
    let pipeline = create_test_pipeline(FakeMedia::empty(), Resolver::new(database));

    let chicken = pipeline
        .identify(RawCaptureInput::Text("chicken breast".to_owned()))
        .await
        .unwrap();
    let rice = pipeline
        .identify(RawCaptureInput::Text("brown rice".to_owned()))
        .await
        .unwrap();

    let dinner = pipeline
        .confirm(
            &chicken.result.best,
            request(MealType::Dinner, chicken.entry_method, 19),
        )
        .await
        .unwrap();
    pipeline
        .confirm(
            &rice.result.best,
            request(MealType::Lunch, rice.entry_method, 12),
        )
        .await
        .unwrap();

    assert_eq!(dinner.food_name, "Chicken breast");
    assert_eq!(dinner.source_provider, "usda");
    assert_eq!(dinner.entry_method, EntryMethod::Manual);

    let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let entries = pipeline.store().list_entries_for_date(date).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].meal_type, MealType::Lunch);
    assert_eq!(entries[1].meal_type, MealType::Dinner);

    let totals = daily_totals(&entries);
    assert_eq!(totals.entries, 2);
    assert!((totals.calories - 288.0).abs() < 1e-9);
    assert!((totals.protein_grams - 62.0).abs() < 1e-9);
    assert!((totals.sodium_mg - 148.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_meal_log_rejects_duplicate_entry() {
    let store = InMemoryMealLog::new();
    let record = nutriscan::normalization::map_candidate(&usda_food(1, "Apple", 52.0)).unwrap();
    let entry = MealEntry::from_record(&record, request(MealType::Snack, EntryMethod::Manual, 15));

    store.save_entry(&entry).await.unwrap();
    let err = store.save_entry(&entry).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::StorageError);
}

#[tokio::test]
async fn test_meal_log_empty_day() {
    let store = InMemoryMealLog::new();
    let entries = store
        .list_entries_for_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert!(daily_totals(&entries).calories.abs() < f64::EPSILON);
}

#[test]
fn test_meal_type_parsing() {
    assert_eq!("Breakfast".parse::<MealType>().unwrap(), MealType::Breakfast);
    assert_eq!(" snack ".parse::<MealType>().unwrap(), MealType::Snack);
    let err = "brunch".parse::<MealType>().unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);
}

#[test]
fn test_entry_method_for_query() {
    assert_eq!(EntryMethod::for_query(QueryKind::Photo, false), EntryMethod::Photo);
    assert_eq!(EntryMethod::for_query(QueryKind::Barcode, false), EntryMethod::Barcode);
    assert_eq!(EntryMethod::for_query(QueryKind::Text, false), EntryMethod::Manual);
    assert_eq!(EntryMethod::for_query(QueryKind::Text, true), EntryMethod::AiSuggestion);
    assert_eq!(
        serde_json::to_value(EntryMethod::AiSuggestion).unwrap(),
        json!("ai-suggestion")
    );
}

#[test]
fn test_from_config_requires_database_credentials() {
    let config = nutriscan::config::PipelineConfig::default();
    let Err(err) = FoodPipeline::from_config(&config) else {
        panic!("pipeline built without credentials");
    };
    assert_eq!(err.code(), ErrorCode::ConfigError);
}
