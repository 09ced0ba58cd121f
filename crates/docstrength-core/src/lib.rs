//! Document importances for oblivious tree ensembles.
//!
//! Estimates, for every training document, how removing it from the fit
//! would shift each scored document's prediction. The estimate replays the
//! leaf-fitting recurrence differentiated with respect to the removed
//! document's weight instead of retraining once per document. Rows are
//! computed in parallel via rayon; results do not depend on the thread count.

mod aggregate;
mod config;
mod error;
mod evaluator;
mod final_derivatives;
mod leaf_index;
mod loss;
mod model;
mod pool;
mod result;
mod selector;
mod snapshot;
mod statistics;
mod strength;
mod updater;

pub use config::{ImportanceConfig, UpdateMethod};
pub use error::ImportanceError;
pub use evaluator::DocumentImportanceEvaluator;
pub use loss::{LeafEstimationMethod, LossFunction, evaluate_derivatives};
pub use model::{Ensemble, MAX_TREE_DEPTH, ObliviousTree, TreeSplit};
pub use pool::{BinarizedFeatures, FeatureBorders, MAX_BORDERS, Pool};
pub use result::DocumentImportances;
pub use snapshot::{ModelSnapshot, TrainingParams};
pub use statistics::TreeStatistics;
pub use strength::{DocumentStrength, DocumentStrengthType, ImportanceValuesSign};
pub use updater::{Jacobian, LeafDerivatives, LeavesDerivativeUpdater};
