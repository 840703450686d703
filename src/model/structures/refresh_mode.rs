use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What a refresh request should do with the catalog walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum RefreshMode {
    /// Bounded best-30 walk with early termination. Produces a ranking.
    #[value(name = "b30")]
    TopN,
    /// Walks the whole catalog and only populates the cache.
    #[value(name = "all")]
    FullRescan
}
