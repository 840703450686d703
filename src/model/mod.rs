pub mod bounded_ranking;
pub mod constants;
pub mod engine;
pub mod potential;
pub mod ranking_result;
pub mod structures;

pub use engine::{EngineConfig, RankingEngine, RefreshRequest, RefreshStats};
pub use potential::potential;
pub use ranking_result::RankingResult;
