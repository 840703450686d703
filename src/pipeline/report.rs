use crate::{
    catalog::SongCatalog,
    model::structures::{chart_rating::ChartRating, difficulty::Difficulty},
    pipeline::RenderJob
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Letter grade shown next to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "EX+")]
    ExPlus,
    #[serde(rename = "EX")]
    Ex,
    #[serde(rename = "AA")]
    Aa,
    A,
    B,
    C,
    D
}

impl Grade {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 9_900_000 => Grade::ExPlus,
            s if s >= 9_800_000 => Grade::Ex,
            s if s >= 9_500_000 => Grade::Aa,
            s if s >= 9_200_000 => Grade::A,
            s if s >= 8_900_000 => Grade::B,
            s if s >= 8_600_000 => Grade::C,
            _ => Grade::D
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::ExPlus => "EX+",
            Grade::Ex => "EX",
            Grade::Aa => "AA",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D"
        }
    }
}

/// Pads to eight digits and groups them as `09'912'345`
pub fn format_score(score: i32) -> String {
    let digits = format!("{:08}", score.max(0));
    let (head, rest) = digits.split_at(digits.len() - 6);
    let (mid, tail) = rest.split_at(3);

    format!("{}'{}'{}", head, mid, tail)
}

/// `123456789` -> `123 456 789`. Anything that is not nine characters is
/// returned unchanged.
pub fn format_user_code(code: &str) -> String {
    if code.len() != 9 || !code.is_ascii() {
        return code.to_string();
    }

    format!("{} {} {}", &code[..3], &code[3..6], &code[6..])
}

pub fn format_overall_rating(overall_rating: Option<i32>) -> String {
    match overall_rating {
        Some(r) => format!("{}.{:02}", r / 100, r % 100),
        None => "--".to_string()
    }
}

/// Frame tier of an overall rating (hundredths), `None` when hidden
pub fn rating_tier(overall_rating: Option<i32>) -> Option<u8> {
    let rating = overall_rating?;
    let tier = match rating {
        r if r >= 1300 => 7,
        r if r >= 1250 => 6,
        r if r >= 1200 => 5,
        r if r >= 1100 => 4,
        r if r >= 1000 => 3,
        r if r >= 700 => 2,
        r if r >= 350 => 1,
        _ => 0
    };

    Some(tier)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub rank: usize,
    pub song_id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub rating: ChartRating,
    pub score: i32,
    pub score_text: String,
    pub grade: Grade,
    pub clear_type: i32,
    pub potential: f64,
    pub played_at: Option<DateTime<Utc>>
}

/// Structured form of a finished ranking, written by the JSON sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub player_id: i32,
    pub display_name: String,
    pub user_code: Option<String>,
    pub overall_rating: String,
    pub rating_tier: Option<u8>,
    pub top30_average: f64,
    pub top10_average: f64,
    pub max_possible_average: f64,
    pub projected_overall_delta: Option<f64>,
    pub catalog_version: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ReportEntry>
}

impl RankingReport {
    pub fn build(job: &RenderJob, catalog: &SongCatalog) -> Self {
        let ranking = &job.ranking;
        let entries = ranking
            .entries
            .iter()
            .enumerate()
            .map(|(i, record)| ReportEntry {
                rank: i + 1,
                song_id: record.song_id.clone(),
                title: catalog
                    .title_of(&record.key())
                    .map(str::to_string)
                    .unwrap_or_else(|| record.song_id.clone()),
                difficulty: record.difficulty,
                rating: record.rating.clone(),
                score: record.score,
                score_text: format_score(record.score),
                grade: Grade::from_score(record.score),
                clear_type: record.clear_type,
                potential: record.potential,
                played_at: Utc.timestamp_millis_opt(record.played_at_millis).single()
            })
            .collect();

        RankingReport {
            player_id: ranking.player_id,
            display_name: job.profile.display_name.clone(),
            user_code: job.profile.user_code.as_deref().map(format_user_code),
            overall_rating: format_overall_rating(job.profile.overall_rating),
            rating_tier: rating_tier(job.profile.overall_rating),
            top30_average: ranking.top30_average(),
            top10_average: ranking.top10_average(),
            max_possible_average: ranking.max_possible_average(),
            projected_overall_delta: ranking.projected_overall_delta(job.profile.overall_rating_fraction()),
            catalog_version: catalog.version().to_string(),
            generated_at: job.generated_at,
            entries
        }
    }
}
