// Score thresholds
pub const PURE_MEMORY_SCORE: i32 = 10_000_000;
pub const EX_SCORE: i32 = 9_800_000;
pub const AA_SCORE: i32 = 9_500_000;
pub const EX_BAND_WIDTH: f64 = 200_000.0;
pub const BELOW_EX_BAND_WIDTH: f64 = 300_000.0;

// Ranking
pub const RANKING_CAPACITY: usize = 33;
pub const BEST_N: usize = 30;
pub const TOP_N: usize = 10;
/// Entries beyond the best 30 that count toward the maximum possible average
pub const MAX_AVERAGE_EXTRA: usize = 10;
/// Highest bonus any score can add on top of a chart rating, in hundredths
pub const MAX_BONUS_HUNDREDTHS: i64 = 200;

// Remote fetching
pub const DEFAULT_FETCH_DELAY_MS: u64 = 1000;
pub const FRIEND_RANK_LIMIT: u32 = 30;
