// ABOUTME: Nutrition normalization mapping provider payloads onto the canonical record
// ABOUTME: One mapping function per provider name, with unit conversion and calorie filtering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Nutrition Normalization
//!
//! Candidates are mapped through a static table keyed by provider name.
//! There is no shape sniffing: a payload is only ever read with the field
//! names of the provider that produced it.
//!
//! A candidate without a positive calorie value is dropped rather than
//! zero-filled, because a zero-calorie entry cannot be told apart from water
//! and would skew daily totals. Other required fields default to zero and
//! optional ones to `None`.
//!
//! Normalization is a pure function of its input.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::provider_names;
use crate::constants::units::{KJ_PER_KCAL, MG_PER_GRAM};
use crate::errors::{AppResult, PipelineError};
use crate::models::{NormalizedResult, NutritionRecord, ProviderCandidate};

/// Maps one provider's candidate to a canonical record
pub type MappingFn = fn(&ProviderCandidate) -> Option<NutritionRecord>;

/// Provider name to mapping function
const MAPPINGS: &[(&str, MappingFn)] = &[
    (provider_names::VISION, map_vision),
    (provider_names::OPEN_FOOD_FACTS, map_open_food_facts),
    (provider_names::FATSECRET, map_fatsecret),
    (provider_names::USDA, map_usda),
];

/// Serving description used for per-100 g provider data
const PER_100_G: &str = "100 g";

/// Sodium makes up 1/2.5 of table salt by mass
const SALT_TO_SODIUM: f64 = 2.5;

/// Look up the mapping function for a provider
#[must_use]
pub fn mapping_for(provider_name: &str) -> Option<MappingFn> {
    MAPPINGS
        .iter()
        .find(|(name, _)| *name == provider_name)
        .map(|(_, mapping)| *mapping)
}

/// Provider names with a registered mapping
#[must_use]
pub fn supported_providers() -> Vec<&'static str> {
    MAPPINGS.iter().map(|(name, _)| *name).collect()
}

/// Map a single candidate, `None` when it has no usable calorie value or
/// its provider has no mapping
#[must_use]
pub fn map_candidate(candidate: &ProviderCandidate) -> Option<NutritionRecord> {
    let Some(mapping) = mapping_for(&candidate.provider_name) else {
        warn!(provider = %candidate.provider_name, "no nutrition mapping for provider");
        return None;
    };
    let record = mapping(candidate);
    if record.is_none() {
        debug!(
            provider = %candidate.provider_name,
            id = ?candidate.provider_food_id(),
            "candidate dropped: no usable calories"
        );
    }
    record
}

/// Normalize candidates into a best match plus alternates
///
/// Input order is preserved, so the confidence ordering produced by
/// resolution carries through.
///
/// # Errors
///
/// Returns [`PipelineError::NoUsableNutritionData`] when every candidate is dropped
pub fn normalize(candidates: &[ProviderCandidate]) -> AppResult<NormalizedResult> {
    let mut records = candidates.iter().filter_map(map_candidate);

    let best = records
        .next()
        .ok_or(PipelineError::NoUsableNutritionData {
            candidates: candidates.len(),
        })?;
    let alternates: Vec<NutritionRecord> = records.collect();

    debug!(
        examined = candidates.len(),
        usable = alternates.len() + 1,
        best = %best.food_name,
        "nutrition normalized"
    );
    Ok(NormalizedResult { best, alternates })
}

/// Convert kilojoules to kilocalories
#[must_use]
pub fn kj_to_kcal(kj: f64) -> f64 {
    kj / KJ_PER_KCAL
}

/// Read a non-negative finite number from a JSON number or numeric string
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn usable_calories(calories: Option<f64>) -> Option<f64> {
    calories.filter(|kcal| *kcal > 0.0)
}

fn confidence(candidate: &ProviderCandidate) -> Option<f64> {
    candidate
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
}

/// Vision concepts carry enrichment nutrients under `nutrition` in canonical
/// camelCase field names
fn map_vision(candidate: &ProviderCandidate) -> Option<NutritionRecord> {
    let payload = &candidate.raw_payload;
    let nutrition = payload.get("nutrition")?;

    let calories = number(nutrition.get("calories"))
        .or_else(|| number(nutrition.get("energyKj")).map(kj_to_kcal));

    Some(NutritionRecord {
        food_name: text(payload.get("name")).unwrap_or_else(|| "Unknown food".to_owned()),
        brand_name: text(nutrition.get("brandName")),
        serving_description: text(nutrition.get("servingDescription"))
            .unwrap_or_else(|| PER_100_G.to_owned()),
        calories: usable_calories(calories)?,
        protein_grams: number(nutrition.get("proteinGrams")).unwrap_or(0.0),
        carbs_grams: number(nutrition.get("carbsGrams")).unwrap_or(0.0),
        fat_grams: number(nutrition.get("fatGrams")).unwrap_or(0.0),
        fiber_grams: number(nutrition.get("fiberGrams")),
        sugar_grams: number(nutrition.get("sugarGrams")),
        sodium_mg: number(nutrition.get("sodiumMg")),
        source_provider: candidate.provider_name.clone(),
        source_confidence: confidence(candidate),
    })
}

/// Open Food Facts reports per-100 g values, energy in kcal and/or kJ and
/// sodium in grams
fn map_open_food_facts(candidate: &ProviderCandidate) -> Option<NutritionRecord> {
    let product = &candidate.raw_payload;
    let nutriments = product.get("nutriments").unwrap_or(&Value::Null);

    let calories = number(nutriments.get("energy-kcal_100g"))
        .or_else(|| number(nutriments.get("energy-kj_100g")).map(kj_to_kcal))
        .or_else(|| number(nutriments.get("energy_100g")).map(kj_to_kcal));

    let sodium_mg = number(nutriments.get("sodium_100g"))
        .or_else(|| number(nutriments.get("salt_100g")).map(|salt| salt / SALT_TO_SODIUM))
        .map(|grams| grams * MG_PER_GRAM);

    let brand_name = text(product.get("brands")).and_then(|brands| {
        brands
            .split(',')
            .map(str::trim)
            .find(|b| !b.is_empty())
            .map(str::to_owned)
    });

    Some(NutritionRecord {
        food_name: text(product.get("product_name"))
            .unwrap_or_else(|| "Unknown product".to_owned()),
        brand_name,
        serving_description: PER_100_G.to_owned(),
        calories: usable_calories(calories)?,
        protein_grams: number(nutriments.get("proteins_100g")).unwrap_or(0.0),
        carbs_grams: number(nutriments.get("carbohydrates_100g")).unwrap_or(0.0),
        fat_grams: number(nutriments.get("fat_100g")).unwrap_or(0.0),
        fiber_grams: number(nutriments.get("fiber_100g")),
        sugar_grams: number(nutriments.get("sugars_100g")),
        sodium_mg,
        source_provider: candidate.provider_name.clone(),
        source_confidence: confidence(candidate),
    })
}

fn description_patterns() -> Option<&'static DescriptionPatterns> {
    static PATTERNS: OnceLock<Option<DescriptionPatterns>> = OnceLock::new();
    PATTERNS.get_or_init(DescriptionPatterns::compile).as_ref()
}

struct DescriptionPatterns {
    serving: Regex,
    kcal: Regex,
    kj: Regex,
    fat: Regex,
    carbs: Regex,
    protein: Regex,
}

impl DescriptionPatterns {
    fn compile() -> Option<Self> {
        Some(Self {
            serving: Regex::new(r"(?i)^\s*per\s+(.+?)\s+-").ok()?,
            kcal: Regex::new(r"(?i)calories:\s*([\d.]+)\s*kcal").ok()?,
            kj: Regex::new(r"(?i)(?:calories|energy):\s*([\d.]+)\s*kj").ok()?,
            fat: Regex::new(r"(?i)fat:\s*([\d.]+)\s*g").ok()?,
            carbs: Regex::new(r"(?i)carbs:\s*([\d.]+)\s*g").ok()?,
            protein: Regex::new(r"(?i)protein:\s*([\d.]+)\s*g").ok()?,
        })
    }
}

fn capture_number(pattern: &Regex, haystack: &str) -> Option<f64> {
    let value = pattern.captures(haystack)?.get(1)?.as_str();
    number(Some(&Value::String(value.to_owned())))
}

/// `FatSecret` search hits summarize nutrients in `food_description`
fn map_fatsecret(candidate: &ProviderCandidate) -> Option<NutritionRecord> {
    let food = &candidate.raw_payload;
    let description = text(food.get("food_description"))?;
    let patterns = description_patterns()?;

    let calories = capture_number(&patterns.kcal, &description)
        .or_else(|| capture_number(&patterns.kj, &description).map(kj_to_kcal));

    let serving_description = patterns
        .serving
        .captures(&description)
        .and_then(|c| c.get(1))
        .map_or_else(|| PER_100_G.to_owned(), |m| m.as_str().trim().to_owned());

    Some(NutritionRecord {
        food_name: text(food.get("food_name")).unwrap_or_else(|| "Unknown food".to_owned()),
        brand_name: text(food.get("brand_name")),
        serving_description,
        calories: usable_calories(calories)?,
        protein_grams: capture_number(&patterns.protein, &description).unwrap_or(0.0),
        carbs_grams: capture_number(&patterns.carbs, &description).unwrap_or(0.0),
        fat_grams: capture_number(&patterns.fat, &description).unwrap_or(0.0),
        fiber_grams: None,
        sugar_grams: None,
        sodium_mg: None,
        source_provider: candidate.provider_name.clone(),
        source_confidence: confidence(candidate),
    })
}

/// USDA nutrient numbers
mod usda_nutrients {
    pub const PROTEIN: u64 = 1003;
    pub const FAT: u64 = 1004;
    pub const CARBS: u64 = 1005;
    pub const ENERGY: u64 = 1008;
    pub const ENERGY_KJ: u64 = 1062;
    pub const SUGARS_LEGACY: u64 = 1063;
    pub const FIBER: u64 = 1079;
    pub const SODIUM: u64 = 1093;
    pub const SUGARS: u64 = 2000;
    pub const ENERGY_ATWATER_GENERAL: u64 = 2047;
    pub const ENERGY_ATWATER_SPECIFIC: u64 = 2048;
}

struct UsdaNutrient<'a> {
    unit: &'a str,
    value: f64,
}

fn usda_nutrient(nutrients: &[Value], id: u64) -> Option<UsdaNutrient<'_>> {
    nutrients.iter().find_map(|n| {
        if n.get("nutrientId").and_then(Value::as_u64) != Some(id) {
            return None;
        }
        Some(UsdaNutrient {
            unit: n.get("unitName").and_then(Value::as_str).unwrap_or(""),
            value: number(n.get("value"))?,
        })
    })
}

fn usda_energy_kcal(nutrients: &[Value]) -> Option<f64> {
    [
        usda_nutrients::ENERGY,
        usda_nutrients::ENERGY_ATWATER_GENERAL,
        usda_nutrients::ENERGY_ATWATER_SPECIFIC,
        usda_nutrients::ENERGY_KJ,
    ]
    .into_iter()
    .find_map(|id| {
        let nutrient = usda_nutrient(nutrients, id)?;
        if nutrient.unit.eq_ignore_ascii_case("kj") {
            Some(kj_to_kcal(nutrient.value))
        } else if nutrient.unit.eq_ignore_ascii_case("kcal") {
            Some(nutrient.value)
        } else {
            None
        }
    })
}

fn usda_grams(nutrients: &[Value], id: u64) -> Option<f64> {
    let nutrient = usda_nutrient(nutrients, id)?;
    match nutrient.unit.to_ascii_lowercase().as_str() {
        "g" => Some(nutrient.value),
        "mg" => Some(nutrient.value / MG_PER_GRAM),
        "ug" | "µg" => Some(nutrient.value / (MG_PER_GRAM * MG_PER_GRAM)),
        _ => None,
    }
}

fn usda_milligrams(nutrients: &[Value], id: u64) -> Option<f64> {
    let nutrient = usda_nutrient(nutrients, id)?;
    match nutrient.unit.to_ascii_lowercase().as_str() {
        "mg" => Some(nutrient.value),
        "g" => Some(nutrient.value * MG_PER_GRAM),
        "ug" | "µg" => Some(nutrient.value / MG_PER_GRAM),
        _ => None,
    }
}

/// USDA search hits list per-100 g nutrients with explicit units
fn map_usda(candidate: &ProviderCandidate) -> Option<NutritionRecord> {
    let food = &candidate.raw_payload;
    let nutrients = food
        .get("foodNutrients")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);

    Some(NutritionRecord {
        food_name: text(food.get("description")).unwrap_or_else(|| "Unknown food".to_owned()),
        brand_name: text(food.get("brandName")).or_else(|| text(food.get("brandOwner"))),
        serving_description: PER_100_G.to_owned(),
        calories: usable_calories(usda_energy_kcal(nutrients))?,
        protein_grams: usda_grams(nutrients, usda_nutrients::PROTEIN).unwrap_or(0.0),
        carbs_grams: usda_grams(nutrients, usda_nutrients::CARBS).unwrap_or(0.0),
        fat_grams: usda_grams(nutrients, usda_nutrients::FAT).unwrap_or(0.0),
        fiber_grams: usda_grams(nutrients, usda_nutrients::FIBER),
        sugar_grams: usda_grams(nutrients, usda_nutrients::SUGARS)
            .or_else(|| usda_grams(nutrients, usda_nutrients::SUGARS_LEGACY)),
        sodium_mg: usda_milligrams(nutrients, usda_nutrients::SODIUM),
        source_provider: candidate.provider_name.clone(),
        source_confidence: confidence(candidate),
    })
}
