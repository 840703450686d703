use crate::{
    database::db_structs::ChartKey,
    error::ProcessorError,
    model::structures::{chart_rating::ChartRating, difficulty::Difficulty}
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};
use tracing::{info, warn};

/// One playable chart and its nominal rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub song_index: i32,
    pub song_id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub rating: ChartRating
}

impl CatalogEntry {
    pub fn key(&self) -> ChartKey {
        ChartKey {
            song_index: self.song_index,
            difficulty: self.difficulty
        }
    }
}

/// On-disk shape written by the rating importer
#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    version: String,
    value: Vec<CatalogFileEntry>
}

#[derive(Debug, Deserialize, Serialize)]
struct CatalogFileEntry {
    idx: i32,
    id: String,
    title: String,
    difficulty: i32,
    rating: String
}

/// Every rated chart, in the order supplied by the importer.
///
/// The ranking engine's early termination is only valid when this order is
/// non-increasing by rating. The importer owns that invariant; loading an
/// unsorted catalog is allowed but logged.
#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    version: String,
    entries: Vec<CatalogEntry>,
    titles: HashMap<ChartKey, String>
}

impl SongCatalog {
    pub fn new(version: impl Into<String>, entries: Vec<CatalogEntry>) -> Self {
        let titles = entries.iter().map(|e| (e.key(), e.title.clone())).collect();
        let catalog = SongCatalog {
            version: version.into(),
            entries,
            titles
        };

        if !catalog.is_sorted_descending() {
            warn!(
                "Catalog {} is not sorted by rating; best-30 pruning may stop early",
                catalog.version
            );
        }

        catalog
    }

    pub fn load(path: &Path) -> Result<Self, ProcessorError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ProcessorError::NotFound(format!("catalog {}: {}", path.display(), e)))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ProcessorError> {
        let file: CatalogFile =
            serde_json::from_str(content).map_err(|e| ProcessorError::InvalidInput(format!("catalog: {}", e)))?;

        let mut entries = Vec::with_capacity(file.value.len());
        for item in file.value {
            let difficulty = Difficulty::try_from(item.difficulty).map_err(|_| {
                ProcessorError::InvalidInput(format!("difficulty {} of song {} is out of range", item.difficulty, item.id))
            })?;
            let rating = ChartRating::parse(&item.rating).map_err(|e| ProcessorError::InvalidInput(e.to_string()))?;

            entries.push(CatalogEntry {
                song_index: item.idx,
                song_id: item.id,
                title: item.title,
                difficulty,
                rating
            });
        }

        info!("Loaded catalog version {} with {} charts", file.version, entries.len());
        Ok(Self::new(file.version, entries))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn title_of(&self, key: &ChartKey) -> Option<&str> {
        self.titles.get(key).map(String::as_str)
    }

    pub fn is_sorted_descending(&self) -> bool {
        self.entries.iter().tuple_windows().all(|(a, b)| a.rating >= b.rating)
    }
}
