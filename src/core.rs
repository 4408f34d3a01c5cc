//! Recommender: the fitted item-to-item collaborative filtering engine.
//!
//! The engine has two states. It starts `Unfitted`; a successful [`Recommender::fit`]
//! moves it to `Fitted`, holding the product index, the latent matrix and the
//! correlation matrix together. All three are computed before the state is
//! replaced, so a failing fit leaves the previous state untouched and a reader
//! never observes a partially fitted engine. Refitting discards the old model.
//!
//! Queries take `&self` and never mutate, so a fitted engine can be shared across
//! threads for concurrent `recommend`/`scores` calls.
//!
//! # Examples
//!
//! ```
//! use latentrec::builder::RecommenderBuilder;
//! use latentrec::dataset::Observation;
//!
//! let obs = vec![
//!     Observation::new("u1", "a", 5.0),
//!     Observation::new("u1", "b", 4.0),
//!     Observation::new("u2", "a", 3.0),
//!     Observation::new("u2", "c", 5.0),
//!     Observation::new("u3", "b", 2.0),
//!     Observation::new("u3", "c", 1.0),
//! ];
//! let mut engine = RecommenderBuilder::new().with_components(2).build();
//! engine.fit_observations(&obs).unwrap();
//!
//! let recs = engine.recommend("a").unwrap();
//! assert!(!recs.contains(&"a".to_string()));
//! ```

use log::{debug, info};

use crate::builder::RecommenderParams;
use crate::correlation::{correlate, CorrelationMatrix};
use crate::dataset::Observation;
use crate::error::{RecError, Result};
use crate::ranker::{rank_recommendations, rank_scored, rank_scores, ScoredItem};
use crate::reduction::{LatentMatrix, TruncatedSvd};
use crate::utility::{ItemMatrix, ProductIndex, UtilityMatrixBuilder};

/// Derived state produced by one fit.
#[derive(Clone, Debug)]
pub struct FittedModel {
    pub product_index: ProductIndex,
    pub latent: LatentMatrix,
    pub correlation: CorrelationMatrix,
}

#[derive(Clone, Debug, Default)]
enum EngineState {
    #[default]
    Unfitted,
    Fitted(Box<FittedModel>),
}

#[derive(Clone, Debug, Default)]
pub struct Recommender {
    params: RecommenderParams,
    state: EngineState,
}

impl Recommender {
    pub fn new(params: RecommenderParams) -> Self {
        Self {
            params,
            state: EngineState::Unfitted,
        }
    }

    pub fn params(&self) -> &RecommenderParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, EngineState::Fitted(_))
    }

    fn model(&self) -> Result<&FittedModel> {
        match &self.state {
            EngineState::Fitted(model) => Ok(model.as_ref()),
            EngineState::Unfitted => Err(RecError::NotFitted),
        }
    }

    /// Fit on an items × users matrix (the transposed utility matrix).
    pub fn fit(&mut self, items: &ItemMatrix) -> Result<&mut Self> {
        let (n_items, n_users) = items.shape();
        if n_items == 0 || n_users == 0 {
            return Err(RecError::EmptyInput("item matrix"));
        }
        info!("Fitting recommender on {} items x {} users", n_items, n_users);

        let latent = TruncatedSvd::new(self.params.svd_components)
            .with_solver(self.params.solver)
            .reduce(items.data())?;
        debug!(
            "Latent matrix {:?}, explained variance ratio {:?}",
            latent.shape(),
            latent.explained_variance_ratio()
        );

        let correlation = correlate(&latent)?;

        self.state = EngineState::Fitted(Box::new(FittedModel {
            product_index: items.product_index().clone(),
            latent,
            correlation,
        }));
        info!("Recommender fitted");
        Ok(self)
    }

    /// Pivot, transpose and fit in one step using the configured duplicate policy.
    pub fn fit_observations(&mut self, observations: &[Observation]) -> Result<&mut Self> {
        let utility = UtilityMatrixBuilder::new(self.params.duplicate_policy).build(observations)?;
        let items = utility.transpose();
        self.fit(&items)
    }

    pub fn product_index(&self) -> Result<&ProductIndex> {
        Ok(&self.model()?.product_index)
    }

    pub fn latent(&self) -> Result<&LatentMatrix> {
        Ok(&self.model()?.latent)
    }

    pub fn correlation(&self) -> Result<&CorrelationMatrix> {
        Ok(&self.model()?.correlation)
    }

    /// Recommend with the configured threshold and limit.
    pub fn recommend(&self, item_id: &str) -> Result<Vec<String>> {
        self.recommend_with(
            item_id,
            self.params.correlation_threshold,
            self.params.recommendation_limit,
        )
    }

    /// Recommend with an explicit threshold and limit for this query only.
    pub fn recommend_with(&self, item_id: &str, threshold: f64, limit: usize) -> Result<Vec<String>> {
        let model = self.model()?;
        info!("Recommending for `{}`", item_id);
        rank_recommendations(
            item_id,
            &model.correlation,
            &model.product_index,
            threshold,
            limit,
        )
    }

    /// Like [`Recommender::recommend`] but keeps each item's score.
    pub fn recommend_scored(&self, item_id: &str) -> Result<Vec<ScoredItem>> {
        let model = self.model()?;
        rank_scored(
            item_id,
            &model.correlation,
            &model.product_index,
            self.params.correlation_threshold,
            self.params.recommendation_limit,
        )
    }

    /// Every item's score against `item_id`, itself included, best first.
    pub fn scores(&self, item_id: &str) -> Result<Vec<ScoredItem>> {
        let model = self.model()?;
        rank_scores(item_id, &model.correlation, &model.product_index)
    }
}
