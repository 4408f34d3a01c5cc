mod test_core;

use crate::builder::RecommenderParams;

pub const TEST_PARAMS: RecommenderParams = RecommenderParams {
    svd_components: 3,
    correlation_threshold: 0.9,
    recommendation_limit: 10,
    solver: crate::reduction::SvdSolver::Exact,
    duplicate_policy: crate::utility::DuplicatePolicy::LastWins,
};
