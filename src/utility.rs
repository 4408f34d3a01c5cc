//! Utility matrix: dense user × item ratings with `0.0` for unobserved pairs.
//!
//! Labels on both axes are sorted ascending, so the same observations always
//! produce the same layout regardless of input order. The item axis is carried
//! as one [`ProductIndex`] value that the transpose, the latent matrix and the
//! correlation matrix all share; no component re-derives item positions.
//!
//! # Examples
//!
//! ```
//! use latentrec::dataset::Observation;
//! use latentrec::utility::{DuplicatePolicy, UtilityMatrixBuilder};
//!
//! let obs = vec![
//!     Observation::new("A1", "P1", 5.0),
//!     Observation::new("A2", "P3", 5.0),
//! ];
//! let m = UtilityMatrixBuilder::new(DuplicatePolicy::LastWins).build(&obs).unwrap();
//! assert_eq!(m.shape(), (2, 2));
//! assert_eq!(m.get("A1", "P3").unwrap(), 0.0);
//! ```

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;
use sprs::{CsMat, TriMat};

use crate::dataset::Observation;
use crate::error::{RecError, Result};

/// How repeated `(user, item)` observations collapse into one cell.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Later observations overwrite earlier ones, in input order.
    #[default]
    LastWins,
    /// Arithmetic mean of all ratings for the pair.
    Mean,
    /// Fail with [`RecError::DuplicateRating`].
    Reject,
}

/// Canonical ordering of item identifiers shared by every derived matrix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductIndex {
    items: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ProductIndex {
    /// Builds an index in the given order; labels must be unique.
    pub fn new(items: Vec<String>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if positions.insert(item.clone(), i).is_some() {
                return Err(RecError::DuplicateItem { item: item.clone() });
            }
        }
        Ok(Self { items, positions })
    }

    /// Position of `item`, or `NotFound`.
    pub fn position(&self, item: &str) -> Result<usize> {
        self.positions
            .get(item)
            .copied()
            .ok_or_else(|| RecError::not_found(item))
    }

    pub fn contains(&self, item: &str) -> bool {
        self.positions.contains_key(item)
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.items.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.items.iter()
    }
}

/// Dense users × items rating table.
#[derive(Clone, Debug)]
pub struct UtilityMatrix {
    users: Vec<String>,
    user_positions: HashMap<String, usize>,
    products: ProductIndex,
    data: DenseMatrix<f64>,
}

impl UtilityMatrix {
    /// (n_users, n_items)
    pub fn shape(&self) -> (usize, usize) {
        (self.users.len(), self.products.len())
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn product_index(&self) -> &ProductIndex {
        &self.products
    }

    /// Users × items ratings, positioned by `users()` and `product_index()`.
    pub fn data(&self) -> &DenseMatrix<f64> {
        &self.data
    }

    /// Rating at `(user, item)` by label; `0.0` if the pair was never observed.
    pub fn get(&self, user: &str, item: &str) -> Result<f64> {
        let row = self
            .user_positions
            .get(user)
            .copied()
            .ok_or_else(|| RecError::not_found(user))?;
        let col = self.products.position(item)?;
        Ok(*self.data.get((row, col)))
    }

    /// Items × users view of the same ratings, keeping the product index.
    pub fn transpose(&self) -> ItemMatrix {
        let (n_users, n_items) = self.shape();
        debug!("Transposing utility matrix {}x{}", n_users, n_items);
        let mut flat = Vec::with_capacity(n_users * n_items);
        for item in 0..n_items {
            flat.extend((0..n_users).map(|user| *self.data.get((user, item))));
        }
        ItemMatrix {
            products: self.products.clone(),
            users: self.users.clone(),
            data: DenseMatrix::from_iterator(flat.into_iter(), n_items, n_users, 0),
        }
    }
}

/// Position of `item_id` among the utility matrix columns.
pub fn product_index(matrix: &UtilityMatrix, item_id: &str) -> Result<usize> {
    matrix.product_index().position(item_id)
}

/// Items × users matrix: the input of the latent factor reducer.
#[derive(Clone, Debug)]
pub struct ItemMatrix {
    products: ProductIndex,
    users: Vec<String>,
    data: DenseMatrix<f64>,
}

impl ItemMatrix {
    /// Builds directly from one row of user values per item, in the given order.
    /// User columns are labelled by position.
    pub fn from_rows(items: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(RecError::EmptyInput("item matrix has no rows"));
        }
        if items.len() != rows.len() {
            return Err(RecError::DimensionMismatch {
                expected: rows.len(),
                actual: items.len(),
            });
        }
        let n_users = rows[0].len();
        if n_users == 0 {
            return Err(RecError::EmptyInput("item matrix has no columns"));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != n_users) {
            return Err(RecError::DimensionMismatch {
                expected: n_users,
                actual: bad.len(),
            });
        }

        for (row, values) in rows.iter().enumerate() {
            if let Some(col) = values.iter().position(|v| !v.is_finite()) {
                return Err(RecError::NonFiniteRating {
                    user: col.to_string(),
                    item: items[row].clone(),
                    rating: values[col],
                });
            }
        }

        let products = ProductIndex::new(items)?;
        let n_items = rows.len();
        Ok(Self {
            products,
            users: (0..n_users).map(|u| u.to_string()).collect(),
            data: DenseMatrix::from_iterator(rows.into_iter().flatten(), n_items, n_users, 0),
        })
    }

    /// (n_items, n_users)
    pub fn shape(&self) -> (usize, usize) {
        (self.products.len(), self.users.len())
    }

    pub fn product_index(&self) -> &ProductIndex {
        &self.products
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    /// Items × users ratings, row `i` is `product_index().get(i)`.
    pub fn data(&self) -> &DenseMatrix<f64> {
        &self.data
    }

    /// Copy of one item's user ratings.
    pub fn item_row(&self, item: usize) -> Vec<f64> {
        self.data.get_row(item).iterator(0).copied().collect()
    }
}

/// Pivots observations into a [`UtilityMatrix`].
#[derive(Clone, Debug, Default)]
pub struct UtilityMatrixBuilder {
    policy: DuplicatePolicy,
}

impl UtilityMatrixBuilder {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy }
    }

    pub fn build(&self, observations: &[Observation]) -> Result<UtilityMatrix> {
        if observations.is_empty() {
            return Err(RecError::EmptyInput("no observations"));
        }
        info!(
            "Building utility matrix from {} observations ({:?})",
            observations.len(),
            self.policy
        );

        let users: Vec<String> = observations
            .iter()
            .map(|o| o.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let items: Vec<String> = observations
            .iter()
            .map(|o| o.item_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if let Some(bad) = observations.iter().find(|o| !o.rating.is_finite()) {
            return Err(RecError::NonFiniteRating {
                user: bad.user_id.clone(),
                item: bad.item_id.clone(),
                rating: bad.rating,
            });
        }

        let user_positions: HashMap<String, usize> = users
            .iter()
            .enumerate()
            .map(|(i, u)| (u.clone(), i))
            .collect();
        let products = ProductIndex::new(items)?;
        let (n_users, n_items) = (users.len(), products.len());
        debug!("Utility matrix shape: {} users x {} items", n_users, n_items);

        let cells: Vec<(usize, usize, f64)> = observations
            .iter()
            .map(|o| {
                // both labels were collected from `observations` above
                let u = user_positions[&o.user_id];
                let p = products.positions[&o.item_id];
                (u, p, o.rating)
            })
            .collect();

        let mut flat = vec![0.0; n_users * n_items];
        match self.policy {
            DuplicatePolicy::LastWins => {
                for &(u, p, r) in &cells {
                    flat[u * n_items + p] = r;
                }
            }
            DuplicatePolicy::Reject => {
                let mut seen = vec![false; n_users * n_items];
                for &(u, p, r) in &cells {
                    let at = u * n_items + p;
                    if seen[at] {
                        return Err(RecError::DuplicateRating {
                            user: users[u].clone(),
                            item: products.items[p].clone(),
                        });
                    }
                    seen[at] = true;
                    flat[at] = r;
                }
            }
            DuplicatePolicy::Mean => {
                // duplicate triplets are summed on CSR conversion
                let mut sums = TriMat::new((n_users, n_items));
                let mut counts = TriMat::new((n_users, n_items));
                for &(u, p, r) in &cells {
                    sums.add_triplet(u, p, r);
                    counts.add_triplet(u, p, 1.0);
                }
                let sums: CsMat<f64> = sums.to_csr();
                let counts: CsMat<f64> = counts.to_csr();
                for (&s, (u, p)) in sums.iter() {
                    let c = counts.get(u, p).copied().unwrap_or(1.0);
                    trace!("cell ({}, {}) mean of {} ratings", u, p, c);
                    flat[u * n_items + p] = s / c;
                }
            }
        }

        Ok(UtilityMatrix {
            users,
            user_positions,
            products,
            data: DenseMatrix::from_iterator(flat.into_iter(), n_users, n_items, 0),
        })
    }
}
