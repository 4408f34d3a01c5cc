use std::sync::Arc;

use approx::assert_abs_diff_eq;
use log::debug;

use crate::builder::RecommenderBuilder;
use crate::core::Recommender;
use crate::dataset::Observation;
use crate::error::RecError;
use crate::reduction::SvdSolver;
use crate::tests::test_data::{correlated_catalog, random_ratings, scenario_ratings};
use crate::tests::TEST_PARAMS;
use crate::utility::ItemMatrix;

fn fitted(seed: u64) -> Recommender {
    let mut engine = Recommender::new(TEST_PARAMS);
    engine.fit(&correlated_catalog(seed)).unwrap();
    engine
}

#[test]
fn test_queries_before_fit_fail() {
    let engine = RecommenderBuilder::new().build();
    assert!(!engine.is_fitted());
    assert!(matches!(engine.recommend("P0"), Err(RecError::NotFitted)));
    assert!(matches!(engine.scores("P0"), Err(RecError::NotFitted)));
    assert!(matches!(engine.recommend_scored("P0"), Err(RecError::NotFitted)));
    assert!(matches!(engine.product_index(), Err(RecError::NotFitted)));
    assert!(matches!(engine.correlation(), Err(RecError::NotFitted)));
    assert!(matches!(engine.latent(), Err(RecError::NotFitted)));
}

#[test]
fn test_fit_populates_all_derived_state() {
    let engine = fitted(42);
    assert!(engine.is_fitted());

    let idx = engine.product_index().unwrap();
    assert_eq!(idx.as_slice(), &["P0", "P1", "P2", "P3", "P4"]);
    assert_eq!(engine.latent().unwrap().shape(), (5, 3));
    assert_eq!(engine.correlation().unwrap().shape(), (5, 5));
}

#[test]
fn test_near_linear_items_recommended() {
    for seed in [1u64, 42, 2024] {
        let engine = fitted(seed);
        let recs = engine.recommend_with("P0", 0.9, 10).unwrap();
        debug!("seed {} recommendations: {:?}", seed, recs);

        assert!(recs.contains(&"P1".to_string()), "seed {}: {:?}", seed, recs);
        assert!(recs.contains(&"P2".to_string()), "seed {}: {:?}", seed, recs);
        assert!(!recs.contains(&"P0".to_string()));
    }
}

#[test]
fn test_unknown_item_not_found() {
    let engine = fitted(42);
    match engine.recommend("P99") {
        Err(RecError::NotFound { item }) => assert_eq!(item, "P99"),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(matches!(engine.scores("P99"), Err(RecError::NotFound { .. })));
}

#[test]
fn test_no_item_above_threshold_returns_empty() {
    let engine = fitted(42);
    let recs = engine.recommend_with("P0", 1.0, 10).unwrap();
    assert!(recs.is_empty());
}

#[test]
fn test_fit_and_recommend_deterministic() {
    let a = fitted(8);
    let b = fitted(8);
    for item in ["P0", "P1", "P2", "P3", "P4"] {
        let first = a.recommend_with(item, 0.0, 10).unwrap();
        assert_eq!(first, a.recommend_with(item, 0.0, 10).unwrap());
        assert_eq!(first, b.recommend_with(item, 0.0, 10).unwrap());
    }
}

#[test]
fn test_randomized_solver_deterministic() {
    let params = crate::builder::RecommenderParams {
        solver: SvdSolver::randomized(7),
        ..TEST_PARAMS
    };
    let items = correlated_catalog(5);
    let mut a = Recommender::new(params.clone());
    let mut b = Recommender::new(params);
    a.fit(&items).unwrap();
    b.fit(&items).unwrap();
    assert_eq!(
        a.recommend_with("P0", -1.0, 10).unwrap(),
        b.recommend_with("P0", -1.0, 10).unwrap()
    );
}

#[test]
fn test_threshold_monotonic_on_fitted_engine() {
    let engine = fitted(99);
    for item in ["P0", "P3"] {
        let mut previous = usize::MAX;
        for t in [-1.0, -0.5, 0.0, 0.5, 0.8, 0.9, 0.95, 0.999] {
            let n = engine.recommend_with(item, t, 10).unwrap().len();
            assert!(n <= previous);
            previous = n;
        }
    }
}

#[test]
fn test_correlation_invariants() {
    let engine = fitted(17);
    let c = engine.correlation().unwrap();
    for i in 0..c.len() {
        assert_abs_diff_eq!(c.get(i, i), 1.0, epsilon = 1e-9);
        for j in 0..c.len() {
            assert_abs_diff_eq!(c.get(i, j), c.get(j, i), epsilon = 1e-9);
        }
    }
}

#[test]
fn test_scores_include_query_first() {
    let engine = fitted(42);
    let scores = engine.scores("P0").unwrap();
    assert_eq!(scores.len(), 5);
    assert!(scores.iter().any(|s| s.item_id == "P0"));
    assert_abs_diff_eq!(scores[0].score, 1.0, epsilon = 1e-6);
    assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_configured_limit_applies() {
    let mut engine = RecommenderBuilder::new()
        .with_components(3)
        .with_threshold(-1.0)
        .with_limit(2)
        .build();
    engine.fit(&correlated_catalog(42)).unwrap();
    assert_eq!(engine.recommend("P0").unwrap().len(), 2);
    assert_eq!(engine.recommend_scored("P0").unwrap().len(), 2);
}

#[test]
fn test_invalid_rank_leaves_previous_model() {
    let mut engine = fitted(42);

    let small = ItemMatrix::from_rows(
        vec!["x".into(), "y".into(), "z".into()],
        vec![vec![1.0; 6], vec![2.0; 6], vec![0.5; 6]],
    )
    .unwrap();
    match engine.fit(&small) {
        Err(RecError::InvalidRank { k, rows, cols }) => assert_eq!((k, rows, cols), (3, 3, 6)),
        other => panic!("expected InvalidRank, got {:?}", other.map(|_| ())),
    }

    assert!(engine.is_fitted());
    assert_eq!(engine.product_index().unwrap().len(), 5);
    assert!(engine.recommend("P0").is_ok());
}

#[test]
fn test_refit_replaces_model() {
    let mut engine = Recommender::new(crate::builder::RecommenderParams {
        svd_components: 2,
        ..TEST_PARAMS
    });
    engine.fit(&correlated_catalog(42)).unwrap();
    assert!(engine.product_index().unwrap().contains("P4"));

    engine.fit_observations(&random_ratings(12, 6, 0.4, 3)).unwrap();
    let idx = engine.product_index().unwrap();
    assert!(!idx.contains("P4"));
    assert_eq!(idx.get(0), Some("I000"));
    assert_eq!(engine.correlation().unwrap().len(), idx.len());
    assert!(matches!(engine.recommend("P0"), Err(RecError::NotFound { .. })));
}

#[test]
fn test_fit_observations_pipeline() {
    let mut engine = RecommenderBuilder::new().with_components(2).build();
    engine.fit_observations(&scenario_ratings()).unwrap();

    assert_eq!(engine.product_index().unwrap().as_slice(), &["P1", "P2", "P3"]);
    let recs = engine.recommend_with("P1", -1.0, 10).unwrap();
    assert!(!recs.contains(&"P1".to_string()));
}

#[test]
fn test_fit_observations_empty_input() {
    let mut engine = RecommenderBuilder::new().build();
    assert!(matches!(
        engine.fit_observations(&[]),
        Err(RecError::EmptyInput(_))
    ));
    assert!(!engine.is_fitted());
}

#[test]
fn test_concurrent_queries_agree() {
    let engine = Arc::new(fitted(42));
    let expected = engine.recommend_with("P0", 0.0, 10).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let e = Arc::clone(&engine);
            std::thread::spawn(move || e.recommend_with("P0", 0.0, 10).unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}

#[test]
fn test_larger_catalog_self_exclusion() {
    let mut engine = RecommenderBuilder::new()
        .with_components(5)
        .with_threshold(0.5)
        .build();
    engine
        .fit_observations(&random_ratings(40, 25, 0.2, 11))
        .unwrap();

    let idx = engine.product_index().unwrap().clone();
    for item in idx.iter() {
        let recs = engine.recommend(item).unwrap();
        assert!(!recs.contains(item));
        assert!(recs.len() <= 10);
    }
}

#[test]
fn test_non_finite_rating_fails_without_fitting() {
    let mut obs = random_ratings(10, 6, 0.5, 1);
    obs.push(Observation::new("U000", "I000", f64::NAN));

    let mut engine = RecommenderBuilder::new().with_components(2).build();
    assert!(matches!(
        engine.fit_observations(&obs),
        Err(RecError::NonFiniteRating { .. })
    ));
    assert!(!engine.is_fitted());

    let mut engine = fitted(42);
    assert!(engine.fit_observations(&obs).is_err());
    assert_eq!(engine.product_index().unwrap().as_slice()[0], "P0");
    assert!(engine.recommend("P0").is_ok());
}

#[test]
fn test_fitted_index_matches_correlation() {
    let mut engine = RecommenderBuilder::new().with_components(3).build();
    engine
        .fit_observations(&random_ratings(20, 8, 0.3, 5))
        .unwrap();
    let n = engine.product_index().unwrap().len();
    assert_eq!(engine.correlation().unwrap().len(), n);
    assert_eq!(engine.latent().unwrap().shape().0, n);
}
