//! CSV pool reader with full input validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{DocId, PoolDataset};

/// Reads scored documents from a CSV file.
///
/// Expected CSV format:
/// - Header row required: `doc_id,target[,weight],feature1,...,featureN`
/// - A `weight` column is recognised only in third position
/// - One row per document, all rows with the same number of columns
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | Header doesn't start with `doc_id,target` |
/// | [`IoError::EmptyPool`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::NegativeWeight`] | A weight is below zero |
/// | [`IoError::DuplicateDocId`] | Same doc_id appears twice |
pub struct PoolReader {
    path: PathBuf,
}

impl PoolReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`PoolDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<PoolDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so our InconsistentRowLength check fires instead of a
        // low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();

        for (position, column) in ["doc_id", "target"].into_iter().enumerate() {
            if header.get(position) != Some(column) {
                return Err(IoError::MissingColumn {
                    path: self.path.clone(),
                    column,
                    position,
                });
            }
        }
        let has_weight = header.get(2) == Some("weight");
        let first_feature = if has_weight { 3 } else { 2 };
        let feature_names: Vec<String> = header.iter().skip(first_feature).map(String::from).collect();
        debug!(expected_cols, has_weight, n_features = feature_names.len(), "read CSV header");

        let mut doc_ids = Vec::new();
        let mut targets = Vec::new();
        let mut weights = Vec::new();
        let mut features = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            let doc_id = record.get(0).unwrap_or("").to_string();
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    doc_id,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            if let Some(&first_row) = seen.get(&doc_id) {
                return Err(IoError::DuplicateDocId {
                    path: self.path.clone(),
                    doc_id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(doc_id.clone(), row_index);

            let mut values = Vec::with_capacity(expected_cols - 1);
            for col_index in 1..expected_cols {
                let raw = record.get(col_index).unwrap_or("");
                values.push(self.parse_finite(raw, row_index, &header[col_index])?);
            }

            targets.push(values[0]);
            if has_weight {
                let weight = values[1];
                if weight < 0.0 {
                    return Err(IoError::NegativeWeight {
                        path: self.path.clone(),
                        row_index,
                        weight,
                    });
                }
                weights.push(weight);
            }
            features.push(values[first_feature - 1..].to_vec());
            doc_ids.push(DocId::new(doc_id));
        }

        if doc_ids.is_empty() {
            return Err(IoError::EmptyPool {
                path: self.path.clone(),
            });
        }

        info!(
            n_docs = doc_ids.len(),
            n_features = feature_names.len(),
            weighted = has_weight,
            "pool loaded"
        );

        Ok(PoolDataset::new(
            doc_ids,
            feature_names,
            targets,
            has_weight.then_some(weights),
            features,
        ))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn parse_finite(&self, raw: &str, row_index: usize, column: &str) -> Result<f64, IoError> {
        let non_finite = || IoError::NonFiniteValue {
            path: self.path.clone(),
            row_index,
            column: column.to_string(),
            raw: raw.to_string(),
        };
        let value: f64 = raw.parse().map_err(|_| non_finite())?;
        if !value.is_finite() {
            return Err(non_finite());
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_unweighted_pool() {
        let f = write_csv("doc_id,target,age,income\nd1,1.0,30,5.5\nd2,0.0,45,2.0\n");
        let ds = PoolReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_docs(), 2);
        assert_eq!(ds.feature_names(), &["age", "income"]);
        assert_eq!(ds.targets(), &[1.0, 0.0]);
        assert!(ds.weights().is_none());
        assert_eq!(ds.features()[1], vec![45.0, 2.0]);
        assert_eq!(ds.doc_ids()[0].as_str(), "d1");
    }

    #[test]
    fn read_weighted_pool() {
        let f = write_csv("doc_id,target,weight,x\nd1,1.0,2.0,0.5\nd2,0.0,0.5,-0.5\n");
        let ds = PoolReader::new(f.path()).read().unwrap();
        assert_eq!(ds.weights(), Some(&[2.0, 0.5][..]));
        assert_eq!(ds.n_features(), 1);
        assert_eq!(ds.features()[1], vec![-0.5]);
    }

    #[test]
    fn missing_target_column_error() {
        let f = write_csv("doc_id,x\nd1,1.0\n");
        let err = PoolReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { column: "target", position: 1, .. }));
    }

    #[test]
    fn empty_pool_error() {
        let f = write_csv("doc_id,target,x\n");
        let err = PoolReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyPool { .. }));
    }

    #[test]
    fn duplicate_doc_id_error() {
        let f = write_csv("doc_id,target,x\nd1,1.0,0.0\nd1,0.0,1.0\n");
        let err = PoolReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateDocId { first_row: 0, second_row: 1, .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_csv("doc_id,target,x,y\nd1,1.0,0.0,1.0\nd2,0.0,1.0\n");
        let err = PoolReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InconsistentRowLength { row_index: 1, .. }));
    }

    #[test]
    fn non_finite_value_error() {
        let f = write_csv("doc_id,target,x\nd1,1.0,inf\n");
        let err = PoolReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::NonFiniteValue { ref column, .. } if column == "x"));
    }

    #[test]
    fn negative_weight_error() {
        let f = write_csv("doc_id,target,weight,x\nd1,1.0,-1.0,0.0\n");
        let err = PoolReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::NegativeWeight { .. }));
    }

    #[test]
    fn nonexistent_file_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = PoolReader::new(&dir.path().join("missing.csv")).read().unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
