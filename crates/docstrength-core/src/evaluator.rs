//! Document importance evaluation over a fitted ensemble.

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::importance_row;
use crate::config::ImportanceConfig;
use crate::error::ImportanceError;
use crate::final_derivatives::final_first_derivatives;
use crate::leaf_index::resolve_leaf_indices;
use crate::model::Ensemble;
use crate::pool::Pool;
use crate::result::DocumentImportances;
use crate::statistics::TreeStatistics;
use crate::updater::{LeafDerivatives, LeavesDerivativeUpdater};

/// Validated inputs of one importance evaluation.
///
/// Construction checks the config, ensemble and tree statistics against each
/// other; [`document_importances`](Self::document_importances) then only has
/// to check the scored pool.
#[derive(Debug)]
pub struct DocumentImportanceEvaluator<'a> {
    config: &'a ImportanceConfig,
    ensemble: &'a Ensemble,
    statistics: &'a [TreeStatistics],
    n_train_docs: usize,
}

impl<'a> DocumentImportanceEvaluator<'a> {
    /// Validate the inputs and create an evaluator.
    ///
    /// # Errors
    ///
    /// | Variant                                         | When                                                  |
    /// |-------------------------------------------------|-------------------------------------------------------|
    /// | configuration variants of [`ImportanceError`]   | the config is invalid for this ensemble               |
    /// | [`ImportanceError::StatisticsCountMismatch`]    | not one statistics entry per tree                     |
    /// | [`ImportanceError::LeafCountMismatch`]          | statistics leaf count differs from `2^depth`          |
    /// | [`ImportanceError::IterationCountMismatch`]     | a tree or its statistics disagree with the config     |
    /// | [`ImportanceError::TrainDocCountMismatch`]      | trees disagree on the training document count         |
    /// | [`ImportanceError::LeafIndexOutOfRange`]        | a training document's leaf id is out of range         |
    /// | [`ImportanceError::InconsistentLeafMembership`] | `leaves_doc_id` does not invert `leaf_indices`        |
    pub fn new(
        config: &'a ImportanceConfig,
        ensemble: &'a Ensemble,
        statistics: &'a [TreeStatistics],
    ) -> Result<Self, ImportanceError> {
        config.validate(ensemble)?;

        if statistics.len() != ensemble.n_trees() {
            return Err(ImportanceError::StatisticsCountMismatch {
                trees: ensemble.n_trees(),
                statistics: statistics.len(),
            });
        }

        let iterations = config.leaves_estimation_iterations();
        let n_train_docs = statistics.first().map_or(0, TreeStatistics::n_docs);

        for (tree_id, (tree, stats)) in ensemble.trees().iter().zip(statistics).enumerate() {
            if stats.leaf_count() != tree.leaf_count() {
                return Err(ImportanceError::LeafCountMismatch {
                    tree: tree_id,
                    what: "tree statistics",
                    expected: tree.leaf_count(),
                    got: stats.leaf_count(),
                });
            }
            if tree.n_iterations() != iterations {
                return Err(ImportanceError::IterationCountMismatch {
                    tree: tree_id,
                    what: "leaf_values",
                    expected: iterations,
                    got: tree.n_iterations(),
                });
            }
            stats.validate(tree_id, iterations)?;
            if stats.n_docs() != n_train_docs {
                return Err(ImportanceError::TrainDocCountMismatch {
                    tree: tree_id,
                    what: "leaf_indices",
                    expected: n_train_docs,
                    got: stats.n_docs(),
                });
            }
        }

        Ok(Self {
            config,
            ensemble,
            statistics,
            n_train_docs,
        })
    }

    /// Return the number of training documents (rows of the output).
    #[must_use]
    pub fn n_train_docs(&self) -> usize {
        self.n_train_docs
    }

    /// Compute the importance of every training document for every document
    /// of `pool`.
    ///
    /// Leaf indices and final derivatives are computed once; rows are then
    /// filled in parallel, one removed training document at a time, on a
    /// worker pool of `thread_count` threads. Output is identical for any
    /// thread count.
    ///
    /// # Errors
    ///
    /// | Variant                                      | When                                         |
    /// |----------------------------------------------|----------------------------------------------|
    /// | [`ImportanceError::SplitFeatureOutOfRange`]  | a split feature is missing from the pool     |
    /// | [`ImportanceError::ThreadPool`]              | the worker pool cannot be created            |
    #[instrument(skip_all, fields(
        n_trees = self.ensemble.n_trees(),
        n_train_docs = self.n_train_docs,
        n_scored_docs = pool.n_docs(),
        update_method = %self.config.update_method(),
    ))]
    pub fn document_importances(&self, pool: &Pool) -> Result<DocumentImportances, ImportanceError> {
        let n_features = pool.features().n_features();
        for (tree_id, tree) in self.ensemble.trees().iter().enumerate() {
            if let Some(split) = tree.splits().iter().find(|s| s.feature >= n_features) {
                return Err(ImportanceError::SplitFeatureOutOfRange {
                    tree: tree_id,
                    feature: split.feature,
                    n_features,
                });
            }
        }

        let thread_count = self.config.thread_count();
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .map_err(|source| ImportanceError::ThreadPool {
                thread_count,
                source,
            })?;

        let n_scored = pool.n_docs();
        let leaf_indices = workers.install(|| {
            resolve_leaf_indices(self.ensemble, pool.features(), n_scored)
        });
        let final_derivatives = final_first_derivatives(
            self.ensemble,
            &leaf_indices,
            pool,
            self.config.loss_function(),
            self.config.leaf_estimation_method(),
        );
        debug!(n_trees = leaf_indices.len(), "leaf indices and final derivatives ready");

        let mut values = vec![0.0; self.n_train_docs * n_scored];
        workers.install(|| {
            values
                .par_chunks_mut(n_scored.max(1))
                .enumerate()
                .for_each_init(
                    || {
                        (
                            LeavesDerivativeUpdater::new(
                                self.ensemble,
                                self.statistics,
                                self.config.learning_rate(),
                                self.config.update_method(),
                            ),
                            LeafDerivatives::zeros(self.ensemble),
                        )
                    },
                    |(updater, derivatives), (removed_doc, row)| {
                        updater.update(removed_doc, derivatives);
                        importance_row(derivatives, &leaf_indices, &final_derivatives, row);
                    },
                );
        });

        let importances = DocumentImportances::new(self.n_train_docs, n_scored, values);
        if !importances.is_finite() {
            let non_finite = importances.as_slice().iter().filter(|v| !v.is_finite()).count();
            warn!(non_finite, "importances contain non-finite values; check for zero denominators");
        }

        info!(
            n_train_docs = self.n_train_docs,
            n_scored_docs = n_scored,
            threads = thread_count,
            "document importances computed"
        );

        Ok(importances)
    }
}
