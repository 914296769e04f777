//! Six-category 1-5 quality scoring over a [`FinancialBundle`].
//!
//! The engine is a pure, synchronous pass over already-fetched data: no
//! I/O, no shared state, safe to call concurrently with distinct bundles.
//! Missing or invalid data propagates as None through metric, category and
//! global scores; an all-empty bundle is a valid all-None result, never an
//! error.

pub mod categories;
pub mod math;
pub mod thresholds;


use chrono::Utc;
use score_core::{Category, FinancialBundle, ScoreResult};

pub use categories::build_category;
pub use math::{average, percentage, year_over_year_growth};
pub use thresholds::score_by_threshold;

pub struct QualityScoreEngine;

impl QualityScoreEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run all six category scorers and average the scorable categories
    /// into the global score.
    pub fn compute_all_scores(&self, bundle: &FinancialBundle) -> ScoreResult {
        let categories: Vec<Category> = vec![
            categories::score_profitability(bundle),
            categories::score_management(bundle),
            categories::score_growth(bundle),
            categories::score_financial_health(bundle),
            categories::score_analyst_outlook(bundle),
            categories::score_valuation(bundle),
        ];

        let category_scores: Vec<Option<f64>> = categories.iter().map(|c| c.score).collect();
        let global_score = math::average(&category_scores);

        ScoreResult {
            symbol: bundle.symbol.clone(),
            computed_at: Utc::now(),
            global_score,
            categories,
        }
    }
}

impl Default for QualityScoreEngine {
    fn default() -> Self {
        Self::new()
    }
}
