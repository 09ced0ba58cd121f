//! Scored documents: targets, weights and binarized features.

use crate::error::ImportanceError;

/// Largest number of borders per feature (bins must fit in a `u8`).
pub const MAX_BORDERS: usize = 255;

/// Column-major table of per-feature bin indices.
///
/// `bins[feature * n_docs + doc]` is the bin of `doc` for `feature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarizedFeatures {
    n_docs: usize,
    n_features: usize,
    bins: Vec<u8>,
}

impl BinarizedFeatures {
    /// Wrap column-major bins, `columns[feature][doc]`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportanceError::PoolSizeMismatch`] if the columns have different lengths.
    pub fn from_columns(columns: Vec<Vec<u8>>) -> Result<Self, ImportanceError> {
        let n_features = columns.len();
        let n_docs = columns.first().map_or(0, Vec::len);
        let mut bins = Vec::with_capacity(n_docs * n_features);
        for column in columns {
            if column.len() != n_docs {
                return Err(ImportanceError::PoolSizeMismatch {
                    what: "binarized feature column",
                    expected: n_docs,
                    got: column.len(),
                });
            }
            bins.extend(column);
        }
        Ok(Self {
            n_docs,
            n_features,
            bins,
        })
    }

    /// Return the bin of `doc` for `feature`.
    #[must_use]
    pub fn bin(&self, feature: usize, doc: usize) -> u8 {
        self.bins[feature * self.n_docs + doc]
    }

    /// Return all bins of one feature, indexed by document.
    #[must_use]
    pub fn column(&self, feature: usize) -> &[u8] {
        &self.bins[feature * self.n_docs..(feature + 1) * self.n_docs]
    }

    /// Return the number of documents.
    #[must_use]
    pub fn n_docs(&self) -> usize {
        self.n_docs
    }

    /// Return the number of binarized features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Per-feature split borders used to map raw values to bins.
///
/// A value `v` of feature `f` lands in bin `k`, the number of borders of `f`
/// strictly below `v`: values `<= borders[f][0]` go to bin 0, values in
/// `(borders[f][k-1], borders[f][k]]` go to bin `k`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureBorders {
    pub(crate) borders: Vec<Vec<f64>>,
}

impl FeatureBorders {
    /// Create borders from one sorted border list per feature.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                            |
    /// |--------------------------------------|-------------------------------------------------|
    /// | [`ImportanceError::TooManyBorders`]  | a feature has more than [`MAX_BORDERS`] borders |
    /// | [`ImportanceError::UnsortedBorders`] | borders are not finite and strictly increasing  |
    pub fn new(borders: Vec<Vec<f64>>) -> Result<Self, ImportanceError> {
        for (feature, feature_borders) in borders.iter().enumerate() {
            if feature_borders.len() > MAX_BORDERS {
                return Err(ImportanceError::TooManyBorders {
                    feature,
                    n_borders: feature_borders.len(),
                    max_borders: MAX_BORDERS,
                });
            }
            let sorted = feature_borders.iter().all(|b| b.is_finite())
                && feature_borders.windows(2).all(|w| w[0] < w[1]);
            if !sorted {
                return Err(ImportanceError::UnsortedBorders { feature });
            }
        }
        Ok(Self { borders })
    }

    /// Return the number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.borders.len()
    }

    /// Return the borders of `feature`.
    #[must_use]
    pub fn borders(&self, feature: usize) -> &[f64] {
        &self.borders[feature]
    }

    /// Return the bin of `value` for `feature`.
    #[must_use]
    pub fn bin_index(&self, feature: usize, value: f64) -> u8 {
        // At most MAX_BORDERS borders, so the count fits in a u8.
        self.borders[feature].partition_point(|&b| b < value) as u8
    }

    /// Binarize a row-major feature matrix, `features[doc][feature]`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportanceError::FeatureCountMismatch`] when a row's width
    /// differs from the number of features with borders.
    pub fn binarize(&self, features: &[Vec<f64>]) -> Result<BinarizedFeatures, ImportanceError> {
        let n_features = self.n_features();
        if let Some((doc, row)) = features
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_features)
        {
            return Err(ImportanceError::FeatureCountMismatch {
                doc,
                expected: n_features,
                got: row.len(),
            });
        }

        let columns = (0..n_features)
            .map(|feature| {
                features
                    .iter()
                    .map(|row| self.bin_index(feature, row[feature]))
                    .collect()
            })
            .collect();
        BinarizedFeatures::from_columns(columns)
    }
}

/// The documents being scored.
#[derive(Debug, Clone)]
pub struct Pool {
    targets: Vec<f64>,
    weights: Vec<f64>,
    features: BinarizedFeatures,
}

impl Pool {
    /// Create a pool of unit-weight documents.
    ///
    /// # Errors
    ///
    /// Returns [`ImportanceError::PoolSizeMismatch`] if `targets` and the
    /// binarized table disagree on the document count.
    pub fn new(targets: Vec<f64>, features: BinarizedFeatures) -> Result<Self, ImportanceError> {
        let weights = vec![1.0; targets.len()];
        Self::with_weights(targets, weights, features)
    }

    /// Create a pool with explicit per-document weights.
    ///
    /// # Errors
    ///
    /// Returns [`ImportanceError::PoolSizeMismatch`] if `targets`, `weights`
    /// and the binarized table disagree on the document count.
    pub fn with_weights(
        targets: Vec<f64>,
        weights: Vec<f64>,
        features: BinarizedFeatures,
    ) -> Result<Self, ImportanceError> {
        if weights.len() != targets.len() {
            return Err(ImportanceError::PoolSizeMismatch {
                what: "weights",
                expected: targets.len(),
                got: weights.len(),
            });
        }
        // A feature-less table carries no document count of its own.
        if features.n_features() > 0 && features.n_docs() != targets.len() {
            return Err(ImportanceError::PoolSizeMismatch {
                what: "binarized features",
                expected: targets.len(),
                got: features.n_docs(),
            });
        }
        Ok(Self {
            targets,
            weights,
            features,
        })
    }

    /// Return the number of documents.
    #[must_use]
    pub fn n_docs(&self) -> usize {
        self.targets.len()
    }

    /// Return the targets.
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Return the weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Return the binarized features.
    #[must_use]
    pub fn features(&self) -> &BinarizedFeatures {
        &self.features
    }
}
