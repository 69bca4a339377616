// ABOUTME: Meal log collaborator contract for persisting confirmed nutrition records
// ABOUTME: Meal entry model, entry-method tagging, daily totals and an in-memory store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Meal Log
//!
//! Once the user confirms a [`NutritionRecord`], it is turned into a
//! [`MealEntry`] and handed to a [`MealLogStore`]. The hosted store lives
//! outside this crate; [`InMemoryMealLog`] backs tests and the CLI.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppResult, PipelineError};
use crate::models::{NutritionRecord, QueryKind};

/// Meal slot in the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    /// Breakfast
    Breakfast,
    /// Lunch
    Lunch,
    /// Dinner
    Dinner,
    /// Snack
    Snack,
}

impl FromStr for MealType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            other => Err(PipelineError::invalid_input(format!(
                "Invalid meal type '{other}'. Must be one of: breakfast, lunch, dinner, snack"
            ))),
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        })
    }
}

/// How a logged record was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryMethod {
    /// Typed in by the user
    Manual,
    /// Recognized from a photo
    Photo,
    /// Looked up by barcode
    Barcode,
    /// Found through an AI-rewritten search
    AiSuggestion,
}

impl EntryMethod {
    /// Entry method implied by the query that produced a record
    #[must_use]
    pub const fn for_query(kind: QueryKind, rewritten: bool) -> Self {
        match kind {
            QueryKind::Photo => Self::Photo,
            QueryKind::Barcode => Self::Barcode,
            QueryKind::Text if rewritten => Self::AiSuggestion,
            QueryKind::Text => Self::Manual,
        }
    }
}

/// Persisted meal log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    /// Entry identifier
    pub id: Uuid,
    /// Meal slot
    pub meal_type: MealType,
    /// Day the meal was eaten
    pub date: NaiveDate,
    /// Time the meal was eaten
    pub time: NaiveTime,
    /// Food name shown in the log
    pub food_name: String,
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein_grams: f64,
    /// Carbohydrates in grams
    pub carbs_grams: f64,
    /// Fat in grams
    pub fat_grams: f64,
    /// Fiber in grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_grams: Option<f64>,
    /// Sugars in grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar_grams: Option<f64>,
    /// Sodium in milligrams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium_mg: Option<f64>,
    /// Free-form category tag (e.g. "protein", "fruit")
    pub category: String,
    /// How the record was produced
    pub entry_method: EntryMethod,
    /// Provider the nutrition data came from
    pub source_provider: String,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

/// Fields the user supplies when confirming a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealEntryRequest {
    /// Meal slot
    pub meal_type: MealType,
    /// Day eaten
    pub date: NaiveDate,
    /// Time eaten
    pub time: NaiveTime,
    /// Category tag
    pub category: String,
    /// How the record was produced
    pub entry_method: EntryMethod,
}

impl MealEntry {
    /// Build an entry from a confirmed record
    #[must_use]
    pub fn from_record(record: &NutritionRecord, request: MealEntryRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            meal_type: request.meal_type,
            date: request.date,
            time: request.time,
            food_name: record.food_name.clone(),
            calories: record.calories,
            protein_grams: record.protein_grams,
            carbs_grams: record.carbs_grams,
            fat_grams: record.fat_grams,
            fiber_grams: record.fiber_grams,
            sugar_grams: record.sugar_grams,
            sodium_mg: record.sodium_mg,
            category: request.category,
            entry_method: request.entry_method,
            source_provider: record.source_provider.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Summed nutrients for a set of entries
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DailyTotals {
    /// Number of entries summed
    pub entries: usize,
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein_grams: f64,
    /// Carbohydrates in grams
    pub carbs_grams: f64,
    /// Fat in grams
    pub fat_grams: f64,
    /// Fiber in grams, counting only entries that report it
    pub fiber_grams: f64,
    /// Sugars in grams, counting only entries that report it
    pub sugar_grams: f64,
    /// Sodium in milligrams, counting only entries that report it
    pub sodium_mg: f64,
}

/// Sum nutrients across entries
#[must_use]
pub fn daily_totals(entries: &[MealEntry]) -> DailyTotals {
    entries
        .iter()
        .fold(DailyTotals::default(), |mut totals, entry| {
            totals.entries += 1;
            totals.calories += entry.calories;
            totals.protein_grams += entry.protein_grams;
            totals.carbs_grams += entry.carbs_grams;
            totals.fat_grams += entry.fat_grams;
            totals.fiber_grams += entry.fiber_grams.unwrap_or(0.0);
            totals.sugar_grams += entry.sugar_grams.unwrap_or(0.0);
            totals.sodium_mg += entry.sodium_mg.unwrap_or(0.0);
            totals
        })
}

/// Storage collaborator for confirmed entries
#[async_trait]
pub trait MealLogStore: Send + Sync {
    /// Persist an entry
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Storage`] when the entry cannot be written
    async fn save_entry(&self, entry: &MealEntry) -> AppResult<()>;

    /// Entries for a day, ordered by time
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Storage`] when the log cannot be read
    async fn list_entries_for_date(&self, date: NaiveDate) -> AppResult<Vec<MealEntry>>;
}

/// Meal log kept in process memory, keyed by day
#[derive(Debug, Default)]
pub struct InMemoryMealLog {
    entries: DashMap<NaiveDate, Vec<MealEntry>>,
}

impl InMemoryMealLog {
    /// Empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MealLogStore for InMemoryMealLog {
    async fn save_entry(&self, entry: &MealEntry) -> AppResult<()> {
        let mut day = self.entries.entry(entry.date).or_default();
        if day.iter().any(|existing| existing.id == entry.id) {
            return Err(PipelineError::storage(format!(
                "Entry {} already logged",
                entry.id
            )));
        }
        day.push(entry.clone());
        drop(day);
        Ok(())
    }

    async fn list_entries_for_date(&self, date: NaiveDate) -> AppResult<Vec<MealEntry>> {
        let mut entries = self
            .entries
            .get(&date)
            .map(|day| day.value().clone())
            .unwrap_or_default();
        entries.sort_by_key(|entry| entry.time);
        Ok(entries)
    }
}
