use crate::model::{
    constants::{AA_SCORE, BELOW_EX_BAND_WIDTH, EX_BAND_WIDTH, EX_SCORE, PURE_MEMORY_SCORE},
    structures::chart_rating::ChartRating
};

/// Potential of a single play.
///
/// - `score >= 10,000,000`: `rating + 2.0`
/// - `9,800,000 <= score < 10,000,000`: `rating + 1.0 + (score - 9,800,000) / 200,000`
/// - otherwise: `max(0, rating + (score - 9,500,000) / 300,000)`
///
/// The result is rounded to 5 decimal places so that values written to and
/// read back from the cache compare equal.
pub fn potential(score: i32, rating: &ChartRating) -> f64 {
    let rating = rating.as_f64();
    let score = score as f64;

    let value = if score >= PURE_MEMORY_SCORE as f64 {
        rating + 2.0
    } else if score >= EX_SCORE as f64 {
        rating + 1.0 + (score - EX_SCORE as f64) / EX_BAND_WIDTH
    } else {
        (rating + (score - AA_SCORE as f64) / BELOW_EX_BAND_WIDTH).max(0.0)
    };

    round5(value)
}

pub fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}
