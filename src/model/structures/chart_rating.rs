use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Chart rating '{0}' is not a valid decimal")]
pub struct ParseChartRatingError(pub String);

/// The nominal difficulty rating of a chart, e.g. `"10.7"`.
///
/// The original string is kept verbatim (it is what the catalog and the
/// cache store), alongside an exact value in hundredths so that comparisons
/// never go through floating point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChartRating {
    nominal: String,
    hundredths: i32
}

impl ChartRating {
    pub fn parse(nominal: &str) -> Result<Self, ParseChartRatingError> {
        let trimmed = nominal.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, "")
        };

        let valid_whole = !whole.is_empty() && whole.bytes().all(|b| b.is_ascii_digit());
        let valid_fraction = fraction.len() <= 2 && fraction.bytes().all(|b| b.is_ascii_digit());
        if !valid_whole || !valid_fraction {
            return Err(ParseChartRatingError(nominal.to_string()));
        }

        let whole: i32 = whole.parse().map_err(|_| ParseChartRatingError(nominal.to_string()))?;
        let fraction: i32 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i32>().unwrap_or(0) * 10,
            _ => fraction.parse::<i32>().unwrap_or(0)
        };

        Ok(ChartRating {
            nominal: trimmed.to_string(),
            hundredths: whole * 100 + fraction
        })
    }

    /// Builds a rating from hundredths, formatting the nominal as `9.40`.
    pub fn from_hundredths(hundredths: i32) -> Self {
        ChartRating {
            nominal: format!("{}.{:02}", hundredths / 100, hundredths % 100),
            hundredths
        }
    }

    pub fn nominal(&self) -> &str {
        &self.nominal
    }

    pub fn hundredths(&self) -> i32 {
        self.hundredths
    }

    pub fn as_f64(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }
}

impl PartialEq for ChartRating {
    fn eq(&self, other: &Self) -> bool {
        self.hundredths == other.hundredths
    }
}

impl Eq for ChartRating {}

impl PartialOrd for ChartRating {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChartRating {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hundredths.cmp(&other.hundredths)
    }
}

impl FromStr for ChartRating {
    type Err = ParseChartRatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartRating::parse(s)
    }
}

impl TryFrom<String> for ChartRating {
    type Error = ParseChartRatingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ChartRating::parse(&value)
    }
}

impl From<ChartRating> for String {
    fn from(value: ChartRating) -> Self {
        value.nominal
    }
}

impl fmt::Display for ChartRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nominal)
    }
}
