use crate::{
    database::db_structs::{ChartKey, ScoreRecord},
    model::{constants::MAX_BONUS_HUNDREDTHS, structures::chart_rating::ChartRating}
};
use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap
};

/// Heap entry ordering: greater means ranked higher, per [`ScoreRecord::rank_cmp`]
#[derive(Debug, Clone)]
struct Ranked(ScoreRecord);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0).reverse()
    }
}

/// Fixed-capacity best-N set backed by a min-heap on potential.
///
/// Each chart appears at most once: pushing a record whose chart is already
/// held replaces the held record, so a chart seeded from the cache and later
/// re-pushed (fresh skip or refetch) is never counted twice.
#[derive(Debug)]
pub struct BoundedRanking {
    capacity: usize,
    heap: BinaryHeap<Reverse<Ranked>>
}

impl BoundedRanking {
    pub fn new(capacity: usize) -> Self {
        BoundedRanking {
            capacity,
            heap: BinaryHeap::with_capacity(capacity + 1)
        }
    }

    /// Pushes a record, returning whatever was evicted to stay within capacity.
    pub fn push(&mut self, record: ScoreRecord) -> Option<ScoreRecord> {
        let key = record.key();
        if self.contains(&key) {
            self.heap.retain(|Reverse(Ranked(held))| held.key() != key);
        }

        self.heap.push(Reverse(Ranked(record)));

        if self.heap.len() > self.capacity {
            return self.heap.pop().map(|Reverse(Ranked(evicted))| evicted);
        }

        None
    }

    pub fn contains(&self, key: &ChartKey) -> bool {
        self.heap.iter().any(|Reverse(Ranked(held))| held.key() == *key)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Lowest ranked record currently held
    pub fn minimum(&self) -> Option<&ScoreRecord> {
        self.heap.peek().map(|Reverse(Ranked(record))| record)
    }

    /// Lowest potential currently held
    pub fn min_potential(&self) -> Option<f64> {
        self.minimum().map(|record| record.potential)
    }

    /// The potential a new entry must beat to get in: the heap minimum once
    /// full, otherwise zero.
    pub fn threshold(&self) -> f64 {
        if self.is_full() {
            self.min_potential().unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Whether any play on a chart of this rating could still enter the set.
    ///
    /// Compared in whole hundredths: the chart ceiling (`rating + 2.0`) is
    /// exact, and the threshold is floored, so this never answers `false`
    /// for a chart that could beat the threshold. A ceiling equal to the
    /// threshold only loses the tie when the held minimum is rated higher;
    /// on an equally rated chart the chart key decides, so the walk goes on.
    pub fn can_improve(&self, rating: &ChartRating) -> bool {
        let ceiling = rating.hundredths() as i64 + MAX_BONUS_HUNDREDTHS;
        let threshold = (self.threshold() * 100.0 + 1e-6).floor() as i64;

        if ceiling != threshold {
            return ceiling > threshold;
        }

        self.is_full() && self.minimum().is_some_and(|minimum| minimum.rating.hundredths() == rating.hundredths())
    }

    /// Records ordered by potential, highest first
    pub fn into_sorted_vec(self) -> Vec<ScoreRecord> {
        // BinaryHeap::into_sorted_vec is ascending on Reverse, i.e. descending on potential
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(Ranked(record))| record)
            .collect()
    }
}
