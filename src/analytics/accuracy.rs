use serde::Serialize;

use crate::db::models::HistoricalRecord;

/// A champion ranked at or above this position counts as a top-3 hit.
pub const TOP_K: usize = 3;

/// Accuracy of the model over every season with known ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub exact_accuracy: f64,
    pub top3_accuracy: f64,
    pub correct_count: usize,
    pub top3_count: usize,
    pub total_count: usize,
    /// Evaluated seasons, oldest first
    pub series: Vec<HistoricalRecord>,
}

/// Fold per-season records into accuracy rates.
///
/// Seasons without a recorded champion are dropped before counting. With no
/// evaluated season both rates are 0.
pub fn aggregate_accuracy(records: impl IntoIterator<Item = HistoricalRecord>) -> AccuracySummary {
    let mut series: Vec<HistoricalRecord> = records
        .into_iter()
        .filter(|r| r.actual_champion.is_some())
        .collect();
    // Stable sort: equal seasons keep their input order.
    series.sort_by_key(|r| r.season);

    let total_count = series.len();
    let correct_count = series.iter().filter(|r| r.correct == Some(true)).count();
    let top3_count = series
        .iter()
        .filter(|r| r.actual_champion_rank.is_some_and(|rank| rank <= TOP_K))
        .count();

    AccuracySummary {
        exact_accuracy: rate(correct_count, total_count),
        top3_accuracy: rate(top3_count, total_count),
        correct_count,
        top3_count,
        total_count,
        series,
    }
}

fn rate(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
