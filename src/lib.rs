//! # latentrec
//!
//! Item-to-item recommendations from a dimensionality-reduced user × item rating
//! matrix.
//!
//! Pipeline:
//!
//! ```text
//! observations → UtilityMatrix (users × items, 0 = unobserved)
//!              → ItemMatrix (transpose, items × users)
//!              → LatentMatrix (truncated SVD, items × k)
//!              → CorrelationMatrix (Pearson, items × items)
//!              → ranked item ids above a threshold
//! ```
//!
//! All four matrices share one [`utility::ProductIndex`] so item positions never
//! drift between stages. Configuration lives on each engine instance
//! ([`builder::RecommenderParams`]); there is no global state.
//!
//! ```
//! use latentrec::builder::RecommenderBuilder;
//! use latentrec::utility::ItemMatrix;
//!
//! let items = ItemMatrix::from_rows(
//!     vec!["a".into(), "b".into(), "c".into()],
//!     vec![
//!         vec![5.0, 4.0, 0.0, 1.0],
//!         vec![4.0, 4.0, 0.0, 1.0],
//!         vec![0.0, 1.0, 5.0, 4.0],
//!     ],
//! )
//! .unwrap();
//!
//! let mut engine = RecommenderBuilder::new().with_components(2).build();
//! engine.fit(&items).unwrap();
//! assert_eq!(engine.scores("a").unwrap().len(), 3);
//! assert!(!engine.recommend("a").unwrap().contains(&"a".to_string()));
//! ```

pub mod builder;
pub mod core;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod operators;
pub mod ranker;
pub mod reduction;
pub mod utility;

pub use crate::builder::{RecommenderBuilder, RecommenderParams};
pub use crate::core::Recommender;
pub use crate::error::{RecError, Result};

#[cfg(test)]
mod tests;
