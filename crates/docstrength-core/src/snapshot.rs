//! Model snapshot persistence via bincode.
//!
//! A snapshot bundles everything needed to evaluate document importances
//! without the training run: the ensemble, its per-tree statistics, the
//! feature borders used to binarize new pools and the training parameters.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::ImportanceConfig;
use crate::error::ImportanceError;
use crate::loss::{LeafEstimationMethod, LossFunction};
use crate::model::Ensemble;
use crate::pool::FeatureBorders;
use crate::statistics::TreeStatistics;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Training-run parameters the leaf-fitting recurrence depends on.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainingParams {
    /// Learning rate applied to every leaf update.
    pub learning_rate: f64,
    /// Leaf-estimation iterations per tree.
    pub leaves_estimation_iterations: usize,
    /// Loss the ensemble was fitted with.
    pub loss_function: LossFunction,
    /// Leaf-estimation method used during fitting.
    pub leaf_estimation_method: LeafEstimationMethod,
}

/// A fitted ensemble with the statistics needed to compute importances.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelSnapshot {
    pub(crate) ensemble: Ensemble,
    pub(crate) statistics: Vec<TreeStatistics>,
    pub(crate) borders: FeatureBorders,
    pub(crate) training: TrainingParams,
}

/// Versioned envelope for the serialized snapshot.
#[derive(serde::Serialize, serde::Deserialize)]
struct SnapshotEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of trees in the ensemble.
    n_trees: usize,
    /// Number of training documents covered by the statistics.
    n_train_docs: usize,
    /// The serialized snapshot.
    snapshot: ModelSnapshot,
}

impl ModelSnapshot {
    /// Bundle a fitted ensemble with its statistics, borders and training parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ImportanceError::StatisticsCountMismatch`] when there is not
    /// exactly one statistics entry per tree.
    pub fn new(
        ensemble: Ensemble,
        statistics: Vec<TreeStatistics>,
        borders: FeatureBorders,
        training: TrainingParams,
    ) -> Result<Self, ImportanceError> {
        if statistics.len() != ensemble.n_trees() {
            return Err(ImportanceError::StatisticsCountMismatch {
                trees: ensemble.n_trees(),
                statistics: statistics.len(),
            });
        }
        Ok(Self {
            ensemble,
            statistics,
            borders,
            training,
        })
    }

    /// Return the ensemble.
    #[must_use]
    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    /// Return the per-tree statistics.
    #[must_use]
    pub fn statistics(&self) -> &[TreeStatistics] {
        &self.statistics
    }

    /// Return the feature borders.
    #[must_use]
    pub fn borders(&self) -> &FeatureBorders {
        &self.borders
    }

    /// Return the training parameters.
    #[must_use]
    pub fn training(&self) -> &TrainingParams {
        &self.training
    }

    /// Return the number of training documents.
    #[must_use]
    pub fn n_train_docs(&self) -> usize {
        self.statistics.first().map_or(0, TreeStatistics::n_docs)
    }

    /// Build an importance config from the stored training parameters.
    ///
    /// Update method and thread count keep their defaults.
    ///
    /// # Errors
    ///
    /// Same as [`ImportanceConfig::new`].
    pub fn importance_config(&self) -> Result<ImportanceConfig, ImportanceError> {
        Ok(ImportanceConfig::new(
            self.training.learning_rate,
            self.training.leaves_estimation_iterations,
        )?
        .with_loss_function(self.training.loss_function)
        .with_leaf_estimation_method(self.training.leaf_estimation_method))
    }

    /// Save the snapshot to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ImportanceError::SerializeSnapshot`] | bincode encoding failed |
    /// | [`ImportanceError::WriteSnapshot`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImportanceError> {
        let path = path.as_ref();

        let envelope = SnapshotEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.ensemble.n_trees(),
            n_train_docs: self.n_train_docs(),
            snapshot: self.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| ImportanceError::SerializeSnapshot { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| ImportanceError::WriteSnapshot {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.ensemble.n_trees(),
            "snapshot saved"
        );

        Ok(())
    }

    /// Load a snapshot from a binary file.
    ///
    /// The ensemble and borders are re-validated; tree statistics are
    /// checked when the snapshot is evaluated.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ImportanceError::ReadSnapshot`] | file read failed |
    /// | [`ImportanceError::DeserializeSnapshot`] | bincode decoding failed |
    /// | [`ImportanceError::IncompatibleSnapshotVersion`] | format version mismatch |
    /// | model or border variants | the decoded ensemble or borders are invalid |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImportanceError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| ImportanceError::ReadSnapshot {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: SnapshotEnvelope =
            bincode::deserialize(&bytes).map_err(|e| ImportanceError::DeserializeSnapshot {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ImportanceError::IncompatibleSnapshotVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        let SnapshotEnvelope {
            n_trees,
            n_train_docs,
            snapshot,
            ..
        } = envelope;
        let snapshot = Self::new(
            Ensemble::new(snapshot.ensemble.trees)?,
            snapshot.statistics,
            FeatureBorders::new(snapshot.borders.borders)?,
            snapshot.training,
        )?;

        debug!(n_trees, n_train_docs, "snapshot loaded");

        Ok(snapshot)
    }
}
