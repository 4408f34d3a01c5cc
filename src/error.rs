//! Error kinds surfaced by the recommendation pipeline.
//!
//! Every failure is returned to the caller; nothing is recovered or replaced by a
//! fallback item internally. Numeric degeneracies (zero-variance latent rows) are
//! not errors, they travel through the correlation matrix as `NaN`.

#[derive(thiserror::Error, Debug)]
pub enum RecError {
    #[error("recommender is not fitted: call `fit` first")]
    NotFitted,
    #[error("item `{item}` not found in product index")]
    NotFound { item: String },
    #[error("invalid rank: k={k} must satisfy 0 < k < min(rows={rows}, cols={cols})")]
    InvalidRank { k: usize, rows: usize, cols: usize },
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
    #[error("duplicate item label `{item}`")]
    DuplicateItem { item: String },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("duplicate rating for user `{user}` and item `{item}`")]
    DuplicateRating { user: String, item: String },
    #[error("non-finite rating {rating} for user `{user}` and item `{item}`")]
    NonFiniteRating {
        user: String,
        item: String,
        rating: f64,
    },
    #[error("non-finite value at ({row}, {col})")]
    NonFinite { row: usize, col: usize },
    #[error("decomposition failed: {0}")]
    Decomposition(String),
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl RecError {
    pub(crate) fn not_found(item: &str) -> Self {
        RecError::NotFound {
            item: item.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecError>;
