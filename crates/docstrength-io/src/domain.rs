//! Domain types for docstrength-io.

use docstrength_core::{FeatureBorders, Pool};

use crate::IoError;

/// A document identifier.
///
/// Wraps a string parsed from the first column of the pool CSV.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocId(String);

impl DocId {
    /// Create a new document ID.
    pub(crate) fn new(id: String) -> Self {
        Self(id)
    }

    /// Return the document ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw documents read from a pool CSV, before binarization.
///
/// Produced by [`PoolReader`](crate::PoolReader). `doc_ids[i]`,
/// `targets[i]`, `weights[i]` and `features[i]` describe the same document.
#[derive(Debug)]
pub struct PoolDataset {
    doc_ids: Vec<DocId>,
    feature_names: Vec<String>,
    targets: Vec<f64>,
    weights: Option<Vec<f64>>,
    /// `features[doc][feature]`
    features: Vec<Vec<f64>>,
}

impl PoolDataset {
    pub(crate) fn new(
        doc_ids: Vec<DocId>,
        feature_names: Vec<String>,
        targets: Vec<f64>,
        weights: Option<Vec<f64>>,
        features: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            doc_ids,
            feature_names,
            targets,
            weights,
            features,
        }
    }

    /// Return the document IDs.
    #[must_use]
    pub fn doc_ids(&self) -> &[DocId] {
        &self.doc_ids
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the targets.
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Return the weights, if the CSV had a weight column.
    #[must_use]
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Return the raw feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the number of documents.
    #[must_use]
    pub fn n_docs(&self) -> usize {
        self.doc_ids.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Binarize the features with `borders` and build a scored pool.
    ///
    /// Missing weights default to 1.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Pool`] when the feature count does not match the
    /// borders.
    pub fn to_pool(&self, borders: &FeatureBorders) -> Result<Pool, IoError> {
        let features = borders.binarize(&self.features)?;
        let pool = match &self.weights {
            Some(weights) => Pool::with_weights(self.targets.clone(), weights.clone(), features)?,
            None => Pool::new(self.targets.clone(), features)?,
        };
        Ok(pool)
    }
}
