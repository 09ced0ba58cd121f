use std::path::PathBuf;

/// Errors from document importance evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ImportanceError {
    /// Returned when the learning rate is zero, negative, or not finite.
    #[error("learning_rate must be a positive finite number, got {learning_rate}")]
    InvalidLearningRate {
        /// The invalid learning rate provided.
        learning_rate: f64,
    },

    /// Returned when thread_count is zero.
    #[error("thread_count must be at least 1, got {thread_count}")]
    InvalidThreadCount {
        /// The invalid thread count provided.
        thread_count: usize,
    },

    /// Returned when leaves_estimation_iterations is zero.
    #[error("leaves_estimation_iterations must be at least 1, got {iterations}")]
    InvalidIterationCount {
        /// The invalid iteration count provided.
        iterations: usize,
    },

    /// Returned when a top-K update asks for zero leaves or more leaves than any tree has.
    #[error("top_size must be in [1, {max_leaf_count}], got {top_size}")]
    InvalidTopSize {
        /// The requested number of leaves.
        top_size: usize,
        /// The largest leaf count in the ensemble.
        max_leaf_count: usize,
    },

    /// Returned when a quantile level is not in (0.0, 1.0).
    #[error("quantile alpha must be in (0.0, 1.0), got {alpha}")]
    InvalidQuantileAlpha {
        /// The invalid alpha provided.
        alpha: f64,
    },

    /// Returned when a textual option cannot be parsed.
    #[error("invalid {option} \"{value}\": expected one of {expected}")]
    InvalidOption {
        /// Which option was being parsed.
        option: &'static str,
        /// The raw value that failed to parse.
        value: String,
        /// Human-readable list of accepted forms.
        expected: &'static str,
    },

    /// Returned when the ensemble has no trees.
    #[error("ensemble has no trees")]
    EmptyEnsemble,

    /// Returned when a tree is deeper than the supported maximum.
    #[error("tree {tree} has depth {depth}, maximum supported depth is {max_depth}")]
    TreeTooDeep {
        /// Zero-based tree index.
        tree: usize,
        /// The tree's depth.
        depth: usize,
        /// The supported maximum.
        max_depth: usize,
    },

    /// Returned when the number of per-tree statistics differs from the tree count.
    #[error("ensemble has {trees} trees but {statistics} tree statistics were provided")]
    StatisticsCountMismatch {
        /// Number of trees in the ensemble.
        trees: usize,
        /// Number of statistics entries provided.
        statistics: usize,
    },

    /// Returned when a leaf-indexed vector does not match the tree's leaf count.
    #[error("tree {tree}: {what} has {got} leaves, expected {expected}")]
    LeafCountMismatch {
        /// Zero-based tree index.
        tree: usize,
        /// Which vector is inconsistent.
        what: &'static str,
        /// Expected leaf count.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when a per-iteration collection has the wrong number of iterations.
    #[error("tree {tree}: {what} has {got} iterations, expected {expected}")]
    IterationCountMismatch {
        /// Zero-based tree index.
        tree: usize,
        /// Which collection is inconsistent.
        what: &'static str,
        /// Expected iteration count.
        expected: usize,
        /// Actual iteration count.
        got: usize,
    },

    /// Returned when a per-document vector of the tree statistics has the wrong length.
    #[error("tree {tree}: {what} covers {got} training documents, expected {expected}")]
    TrainDocCountMismatch {
        /// Zero-based tree index.
        tree: usize,
        /// Which vector is inconsistent.
        what: &'static str,
        /// Expected training document count.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when a leaf id falls outside `[0, leaf_count)`.
    #[error("tree {tree}: document {doc} assigned to leaf {leaf}, but the tree has {leaf_count} leaves")]
    LeafIndexOutOfRange {
        /// Zero-based tree index.
        tree: usize,
        /// Zero-based document index.
        doc: usize,
        /// The offending leaf id.
        leaf: usize,
        /// The tree's leaf count.
        leaf_count: usize,
    },

    /// Returned when a leaf's document list disagrees with the per-document leaf ids.
    #[error("tree {tree}: document list of leaf {leaf} does not match the leaf indices")]
    InconsistentLeafMembership {
        /// Zero-based tree index.
        tree: usize,
        /// The offending leaf.
        leaf: usize,
    },

    /// Returned when a split references a feature absent from the binarized table.
    #[error("tree {tree}: split on feature {feature}, but the pool has {n_features} features")]
    SplitFeatureOutOfRange {
        /// Zero-based tree index.
        tree: usize,
        /// The referenced feature.
        feature: usize,
        /// Number of binarized features available.
        n_features: usize,
    },

    /// Returned when the pool's per-document vectors disagree in length.
    #[error("pool {what} has {got} documents, expected {expected}")]
    PoolSizeMismatch {
        /// Which vector is inconsistent.
        what: &'static str,
        /// Expected document count.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when a feature has more borders than fit into a one-byte bin.
    #[error("feature {feature} has {n_borders} borders, at most {max_borders} are supported")]
    TooManyBorders {
        /// Zero-based feature index.
        feature: usize,
        /// Number of borders provided.
        n_borders: usize,
        /// The supported maximum.
        max_borders: usize,
    },

    /// Returned when borders are not strictly increasing finite values.
    #[error("borders of feature {feature} must be finite and strictly increasing")]
    UnsortedBorders {
        /// Zero-based feature index.
        feature: usize,
    },

    /// Returned when a raw feature row has the wrong width.
    #[error("document {doc} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// Zero-based document index.
        doc: usize,
        /// Expected feature count.
        expected: usize,
        /// Actual feature count.
        got: usize,
    },

    /// Returned when the worker pool cannot be created.
    #[error("failed to build worker pool with {thread_count} threads")]
    ThreadPool {
        /// Requested thread count.
        thread_count: usize,
        /// The underlying rayon error.
        source: rayon::ThreadPoolBuildError,
    },

    /// Returned when snapshot serialization fails.
    #[error("failed to serialize snapshot")]
    SerializeSnapshot {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when snapshot deserialization fails.
    #[error("failed to deserialize snapshot from {path}")]
    DeserializeSnapshot {
        /// Path to the snapshot file.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the snapshot file fails.
    #[error("failed to write snapshot to {path}")]
    WriteSnapshot {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the snapshot file fails.
    #[error("failed to read snapshot from {path}")]
    ReadSnapshot {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a snapshot with an incompatible format version.
    #[error("incompatible snapshot version in {path}: expected {expected}, found {found}")]
    IncompatibleSnapshotVersion {
        /// The format version this build expects.
        expected: u32,
        /// The format version found in the file.
        found: u32,
        /// Path to the snapshot file.
        path: PathBuf,
    },
}
