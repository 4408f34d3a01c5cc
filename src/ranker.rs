//! Threshold-and-rank selection over one row of the correlation matrix.
//!
//! - Candidates are every item other than the query whose score is strictly
//!   greater than the threshold; the query is excluded by position, never by
//!   relying on its own score.
//! - `NaN` scores never qualify.
//! - Order is score descending, then item position ascending, then truncation to
//!   `limit`. No item clearing the threshold yields an empty list, not an error.

use std::cmp::Ordering;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationMatrix;
use crate::error::{RecError, Result};
use crate::utility::ProductIndex;

/// One ranked item with its correlation to the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: String,
    pub score: f64,
}

/// Descending by score, `NaN` last, ties by position ascending.
fn by_score_desc(a: (usize, f64), b: (usize, f64)) -> Ordering {
    match (a.1.is_nan(), b.1.is_nan()) {
        (true, true) => a.0.cmp(&b.0),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b
            .1
            .partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0)),
    }
}

fn query_row(
    item_id: &str,
    correlation: &CorrelationMatrix,
    index: &ProductIndex,
) -> Result<(usize, Vec<f64>)> {
    if index.len() != correlation.len() {
        return Err(RecError::DimensionMismatch {
            expected: correlation.len(),
            actual: index.len(),
        });
    }
    let pos = index.position(item_id)?;
    Ok((pos, correlation.row(pos)))
}

/// Items correlated above `threshold` with `item_id`, best first, at most `limit`.
pub fn rank_scored(
    item_id: &str,
    correlation: &CorrelationMatrix,
    index: &ProductIndex,
    threshold: f64,
    limit: usize,
) -> Result<Vec<ScoredItem>> {
    let (pos, row) = query_row(item_id, correlation, index)?;

    let mut selected: Vec<(usize, f64)> = row
        .iter()
        .copied()
        .enumerate()
        .filter(|&(j, score)| j != pos && score > threshold)
        .collect();
    trace!(
        "{} candidates above {} for `{}`",
        selected.len(),
        threshold,
        item_id
    );

    selected.sort_by(|&a, &b| by_score_desc(a, b));
    selected.truncate(limit);
    debug!(
        "Ranked {} recommendations for `{}` (threshold={}, limit={})",
        selected.len(),
        item_id,
        threshold,
        limit
    );

    Ok(selected
        .into_iter()
        .filter_map(|(j, score)| {
            index.get(j).map(|id| ScoredItem {
                item_id: id.to_string(),
                score,
            })
        })
        .collect())
}

/// Item identifiers only; see [`rank_scored`].
pub fn rank_recommendations(
    item_id: &str,
    correlation: &CorrelationMatrix,
    index: &ProductIndex,
    threshold: f64,
    limit: usize,
) -> Result<Vec<String>> {
    Ok(
        rank_scored(item_id, correlation, index, threshold, limit)?
            .into_iter()
            .map(|s| s.item_id)
            .collect(),
    )
}

/// Every item's correlation with `item_id` (itself included), sorted descending
/// with `NaN` last. No threshold, no limit.
pub fn rank_scores(
    item_id: &str,
    correlation: &CorrelationMatrix,
    index: &ProductIndex,
) -> Result<Vec<ScoredItem>> {
    let (_, row) = query_row(item_id, correlation, index)?;
    let mut all: Vec<(usize, f64)> = row.into_iter().enumerate().collect();
    all.sort_by(|&a, &b| by_score_desc(a, b));

    Ok(all
        .into_iter()
        .filter_map(|(j, score)| {
            index.get(j).map(|id| ScoredItem {
                item_id: id.to_string(),
                score,
            })
        })
        .collect())
}
