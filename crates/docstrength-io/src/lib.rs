//! Pool loading, validation, and result serialization for docstrength.

mod domain;
mod error;
mod pool_reader;
mod writer;

pub use domain::{DocId, ExperimentName, PoolDataset};
pub use error::IoError;
pub use pool_reader::PoolReader;
pub use writer::{ResultWriter, RunSettings};
