//! Rating dataset: the raw `(user, item, rating)` observations fed to the engine.
//!
//! Ingestion reads delimited files with a `UserId,ProductId,Rating` header (any
//! extra column such as `Timestamp` is ignored). Records with a missing or
//! unparseable field are dropped at load time, so every `Observation` that
//! reaches the utility builder is complete.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{RecError, Result};

/// One rating event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub user_id: String,
    pub item_id: String,
    pub rating: f64,
}

impl Observation {
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>, rating: f64) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            rating,
        }
    }
}

// On-disk shape; every field optional so incomplete rows can be skipped.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "UserId", default)]
    user_id: Option<String>,
    #[serde(rename = "ProductId", default)]
    item_id: Option<String>,
    #[serde(rename = "Rating", default)]
    rating: Option<String>,
}

impl RawRecord {
    fn into_observation(self) -> Option<Observation> {
        let user_id = self.user_id.filter(|s| !s.trim().is_empty())?;
        let item_id = self.item_id.filter(|s| !s.trim().is_empty())?;
        let rating = self.rating?.trim().parse::<f64>().ok()?;
        if !rating.is_finite() {
            return None;
        }
        Some(Observation::new(user_id.trim(), item_id.trim(), rating))
    }
}

/// Aggregate figures over a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub unique_users: usize,
    pub unique_items: usize,
    pub mean_rating: f64,
}

/// An ordered collection of observations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RatingDataset {
    observations: Vec<Observation>,
}

impl RatingDataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading ratings from {}", path.as_ref().display());
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Reads a headed CSV stream, dropping incomplete records.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut observations = Vec::new();
        let mut dropped = 0usize;
        for record in rdr.deserialize::<RawRecord>() {
            match record?.into_observation() {
                Some(obs) => observations.push(obs),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("Dropped {} incomplete rating records", dropped);
        }
        info!("Loaded {} rating records", observations.len());
        Ok(Self { observations })
    }

    /// Keeps only the first `n` records.
    pub fn head(&self, n: usize) -> Self {
        debug!("Sampling first {} of {} records", n, self.observations.len());
        Self {
            observations: self.observations.iter().take(n).cloned().collect(),
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Top `n` items by number of ratings, ties by item id ascending.
    pub fn popular_items(&self, n: usize) -> Result<Vec<(String, usize)>> {
        if self.observations.is_empty() {
            return Err(RecError::EmptyInput("rating dataset"));
        }
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for obs in &self.observations {
            *counts.entry(obs.item_id.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(item, c)| (item.to_string(), c))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        Ok(ranked)
    }

    pub fn summary(&self) -> Result<DatasetSummary> {
        if self.observations.is_empty() {
            return Err(RecError::EmptyInput("rating dataset"));
        }
        let users: BTreeSet<&str> = self.observations.iter().map(|o| o.user_id.as_str()).collect();
        let items: BTreeSet<&str> = self.observations.iter().map(|o| o.item_id.as_str()).collect();
        let total: f64 = self.observations.iter().map(|o| o.rating).sum();

        Ok(DatasetSummary {
            records: self.observations.len(),
            unique_users: users.len(),
            unique_items: items.len(),
            mean_rating: total / self.observations.len() as f64,
        })
    }
}

impl From<Vec<Observation>> for RatingDataset {
    fn from(observations: Vec<Observation>) -> Self {
        Self::new(observations)
    }
}
