//! Configuration builder for document importance evaluation.

use std::fmt;
use std::str::FromStr;

use crate::error::ImportanceError;
use crate::loss::{LeafEstimationMethod, LossFunction};
use crate::model::Ensemble;
use crate::pool::Pool;
use crate::result::DocumentImportances;
use crate::statistics::TreeStatistics;

/// Which leaves are re-fitted when replaying a leaf-estimation iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UpdateMethod {
    /// Only the removed document's own leaf.
    SinglePoint,
    /// The `top_size` leaves with the largest aggregate jacobian magnitude.
    TopKLeaves {
        /// Number of leaves to re-fit per tree.
        top_size: usize,
    },
    /// Every leaf (exact replay).
    AllPoints,
}

impl fmt::Display for UpdateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePoint => f.write_str("SinglePoint"),
            Self::TopKLeaves { top_size } => write!(f, "TopKLeaves:top={top_size}"),
            Self::AllPoints => f.write_str("AllPoints"),
        }
    }
}

impl FromStr for UpdateMethod {
    type Err = ImportanceError;

    /// Parse `SinglePoint`, `AllPoints` or `TopKLeaves:top=<K>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ImportanceError::InvalidOption {
            option: "update method",
            value: s.to_string(),
            expected: "SinglePoint, AllPoints, TopKLeaves:top=<K>",
        };
        match s {
            "SinglePoint" => Ok(Self::SinglePoint),
            "AllPoints" => Ok(Self::AllPoints),
            other => {
                let top_size = other
                    .strip_prefix("TopKLeaves:top=")
                    .ok_or_else(invalid)?
                    .parse::<usize>()
                    .map_err(|_| invalid())?;
                Ok(Self::TopKLeaves { top_size })
            }
        }
    }
}

/// Configuration for document importance evaluation.
///
/// Construct via [`ImportanceConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter                | Default      |
/// |--------------------------|--------------|
/// | `loss_function`          | `Rmse`       |
/// | `leaf_estimation_method` | `Newton`     |
/// | `update_method`          | `AllPoints`  |
/// | `thread_count`           | 1            |
#[derive(Debug, Clone)]
pub struct ImportanceConfig {
    pub(crate) learning_rate: f64,
    pub(crate) leaves_estimation_iterations: usize,
    pub(crate) loss_function: LossFunction,
    pub(crate) leaf_estimation_method: LeafEstimationMethod,
    pub(crate) update_method: UpdateMethod,
    pub(crate) thread_count: usize,
}

impl ImportanceConfig {
    /// Create a new config with the training run's learning rate and number
    /// of leaf-estimation iterations per tree.
    ///
    /// # Errors
    ///
    /// | Variant                                     | When                                  |
    /// |---------------------------------------------|---------------------------------------|
    /// | [`ImportanceError::InvalidLearningRate`]    | `learning_rate` is not positive/finite |
    /// | [`ImportanceError::InvalidIterationCount`]  | `leaves_estimation_iterations` is zero |
    pub fn new(learning_rate: f64, leaves_estimation_iterations: usize) -> Result<Self, ImportanceError> {
        let config = Self {
            learning_rate,
            leaves_estimation_iterations,
            loss_function: LossFunction::Rmse,
            leaf_estimation_method: LeafEstimationMethod::Newton,
            update_method: UpdateMethod::AllPoints,
            thread_count: 1,
        };
        config.validate_scalars()?;
        Ok(config)
    }

    // --- Setters ---

    /// Set the loss the ensemble was trained with.
    #[must_use]
    pub fn with_loss_function(mut self, loss_function: LossFunction) -> Self {
        self.loss_function = loss_function;
        self
    }

    /// Set the leaf estimation method used during training.
    #[must_use]
    pub fn with_leaf_estimation_method(mut self, method: LeafEstimationMethod) -> Self {
        self.leaf_estimation_method = method;
        self
    }

    /// Set the leaf update policy.
    #[must_use]
    pub fn with_update_method(mut self, update_method: UpdateMethod) -> Self {
        self.update_method = update_method;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    // --- Getters ---

    /// Return the learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Return the number of leaf-estimation iterations per tree.
    #[must_use]
    pub fn leaves_estimation_iterations(&self) -> usize {
        self.leaves_estimation_iterations
    }

    /// Return the loss function.
    #[must_use]
    pub fn loss_function(&self) -> LossFunction {
        self.loss_function
    }

    /// Return the leaf estimation method.
    #[must_use]
    pub fn leaf_estimation_method(&self) -> LeafEstimationMethod {
        self.leaf_estimation_method
    }

    /// Return the leaf update policy.
    #[must_use]
    pub fn update_method(&self) -> UpdateMethod {
        self.update_method
    }

    /// Return the number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn validate_scalars(&self) -> Result<(), ImportanceError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ImportanceError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }
        if self.leaves_estimation_iterations == 0 {
            return Err(ImportanceError::InvalidIterationCount {
                iterations: self.leaves_estimation_iterations,
            });
        }
        if self.thread_count == 0 {
            return Err(ImportanceError::InvalidThreadCount {
                thread_count: self.thread_count,
            });
        }
        Ok(())
    }

    /// Validate the config against an ensemble.
    pub(crate) fn validate(&self, ensemble: &Ensemble) -> Result<(), ImportanceError> {
        self.validate_scalars()?;
        if let UpdateMethod::TopKLeaves { top_size } = self.update_method {
            let max_leaf_count = ensemble.max_leaf_count();
            if top_size == 0 || top_size > max_leaf_count {
                return Err(ImportanceError::InvalidTopSize {
                    top_size,
                    max_leaf_count,
                });
            }
        }
        Ok(())
    }

    /// Compute the importance of every training document for every pool document.
    ///
    /// # Errors
    ///
    /// Any configuration or inconsistent-state variant of [`ImportanceError`],
    /// reported before a single row is computed, or
    /// [`ImportanceError::ThreadPool`] if the worker pool cannot be created.
    pub fn evaluate(
        &self,
        ensemble: &Ensemble,
        statistics: &[TreeStatistics],
        pool: &Pool,
    ) -> Result<DocumentImportances, ImportanceError> {
        crate::evaluator::DocumentImportanceEvaluator::new(self, ensemble, statistics)?
            .document_importances(pool)
    }
}
