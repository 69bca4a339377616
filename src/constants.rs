// ABOUTME: Thresholds, caps and unit factors shared by the pipeline stages
// ABOUTME: Grouped by the stage that consumes them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Capture stage limits
pub mod capture {
    /// Minimum characters in a text query (matches the search debounce threshold)
    pub const MIN_QUERY_CHARS: usize = 2;
    /// Largest image accepted from the media reader (10 MiB)
    pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
}

/// Provider resolution policy
pub mod resolution {
    use std::time::Duration;

    /// Vision concepts at or above this confidence are kept outright
    pub const VISION_CONFIDENCE_THRESHOLD: f64 = 0.7;
    /// Concepts kept when none reach the threshold
    pub const VISION_FALLBACK_TOP_N: usize = 3;
    /// Phrases searched per text query
    pub const MAX_SEARCH_PHRASES: usize = 2;
    /// Phrases requested from the query rewriter
    pub const MAX_REWRITTEN_PHRASES: usize = 3;
    /// Candidates returned for a text query
    pub const MAX_TEXT_CANDIDATES: usize = 10;
    /// Lifetime of a cached text search
    pub const SEARCH_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
    /// Longest accepted search cache lifetime in seconds (one day)
    pub const MAX_SEARCH_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
}

/// Unit conversion factors
pub mod units {
    /// Kilojoules per kilocalorie
    pub const KJ_PER_KCAL: f64 = 4.184;
    /// Milligrams per gram
    pub const MG_PER_GRAM: f64 = 1000.0;
}

/// Canonical provider names carried in candidates and records
pub mod provider_names {
    /// Image recognition provider
    pub const VISION: &str = "vision";
    /// Barcode lookup provider
    pub const OPEN_FOOD_FACTS: &str = "open_food_facts";
    /// `FatSecret` platform nutrition database
    pub const FATSECRET: &str = "fatsecret";
    /// USDA `FoodData` Central nutrition database
    pub const USDA: &str = "usda";
    /// AI query rewriting step
    pub const QUERY_REWRITER: &str = "query_rewriter";
}

/// HTTP client defaults
pub mod http {
    /// User agent sent to every provider
    pub const USER_AGENT: &str = concat!("nutriscan/", env!("CARGO_PKG_VERSION"));
    /// Default per-request timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
    /// Longest accepted per-request timeout in seconds
    pub const MAX_TIMEOUT_SECS: u64 = 300;
}
