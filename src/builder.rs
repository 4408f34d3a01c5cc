use serde::{Deserialize, Serialize};

use crate::core::Recommender;
use crate::reduction::SvdSolver;
use crate::utility::DuplicatePolicy;

// Add logging
use log::{debug, info};

pub const DEFAULT_SVD_COMPONENTS: usize = 10;
pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.90;
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

/// Engine configuration. Every engine owns its own copy; nothing is global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderParams {
    pub svd_components: usize,
    pub correlation_threshold: f64,
    pub recommendation_limit: usize,
    pub solver: SvdSolver,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for RecommenderParams {
    fn default() -> Self {
        Self {
            svd_components: DEFAULT_SVD_COMPONENTS,
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
            recommendation_limit: DEFAULT_RECOMMENDATION_LIMIT,
            solver: SvdSolver::Exact,
            duplicate_policy: DuplicatePolicy::LastWins,
        }
    }
}

// Custom PartialEq implementation using approximate equality for floats
impl PartialEq for RecommenderParams {
    fn eq(&self, other: &Self) -> bool {
        self.svd_components == other.svd_components
            && approx::relative_eq!(self.correlation_threshold, other.correlation_threshold)
            && self.recommendation_limit == other.recommendation_limit
            && self.solver == other.solver
            && self.duplicate_policy == other.duplicate_policy
    }
}

pub struct RecommenderBuilder {
    params: RecommenderParams,
}

impl Default for RecommenderBuilder {
    fn default() -> Self {
        debug!("Creating RecommenderBuilder with default parameters");
        Self {
            params: RecommenderParams::default(),
        }
    }
}

impl RecommenderBuilder {
    pub fn new() -> Self {
        info!("Initializing new RecommenderBuilder");
        Self::default()
    }

    /// Start from an existing parameter set, e.g. one deserialised from a file.
    pub fn from_params(params: RecommenderParams) -> Self {
        Self { params }
    }

    /// Number of latent components kept by the truncated SVD.
    /// Must be below `min(items, users)` of the matrix passed to `fit`.
    pub fn with_components(mut self, k: usize) -> Self {
        info!("Setting svd components: {}", k);
        self.params.svd_components = k;
        self
    }

    /// Minimum correlation (exclusive) for an item to be recommended.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        info!("Setting correlation threshold: {}", threshold);
        self.params.correlation_threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        info!("Setting recommendation limit: {}", limit);
        self.params.recommendation_limit = limit;
        self
    }

    /// Randomized solvers carry their own seed, so fits stay reproducible.
    pub fn with_solver(mut self, solver: SvdSolver) -> Self {
        info!("Setting svd solver: {:?}", solver);
        self.params.solver = solver;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        info!("Setting duplicate policy: {:?}", policy);
        self.params.duplicate_policy = policy;
        self
    }

    pub fn params(&self) -> &RecommenderParams {
        &self.params
    }

    /// Returns an unfitted engine.
    pub fn build(self) -> Recommender {
        debug!("Build configuration: {:?}", self.params);
        Recommender::new(self.params)
    }
}
