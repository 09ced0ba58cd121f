//! Importance matrix produced by the evaluator.

use crate::strength::{DocumentStrength, DocumentStrengthType, ImportanceValuesSign, document_strength};

/// Importance of every training document for every scored document.
///
/// Row-major: `get(i, j)` is the estimated effect of removing training
/// document `i` on scored document `j`'s prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentImportances {
    n_train_docs: usize,
    n_scored_docs: usize,
    values: Vec<f64>,
}

impl DocumentImportances {
    pub(crate) fn new(n_train_docs: usize, n_scored_docs: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), n_train_docs * n_scored_docs);
        Self {
            n_train_docs,
            n_scored_docs,
            values,
        }
    }

    /// Return `(training documents, scored documents)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_train_docs, self.n_scored_docs)
    }

    /// Return the number of training documents (rows).
    #[must_use]
    pub fn n_train_docs(&self) -> usize {
        self.n_train_docs
    }

    /// Return the number of scored documents (columns).
    #[must_use]
    pub fn n_scored_docs(&self) -> usize {
        self.n_scored_docs
    }

    /// Return the importance of training document `train_doc` for `scored_doc`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn get(&self, train_doc: usize, scored_doc: usize) -> f64 {
        assert!(scored_doc < self.n_scored_docs, "scored_doc out of range");
        self.values[train_doc * self.n_scored_docs + scored_doc]
    }

    /// Return the importances of training document `train_doc` for every scored document.
    #[must_use]
    pub fn row(&self, train_doc: usize) -> &[f64] {
        &self.values[train_doc * self.n_scored_docs..(train_doc + 1) * self.n_scored_docs]
    }

    /// Iterate over rows in training document order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_train_docs).map(|i| self.row(i))
    }

    /// Return the flat row-major values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Copy into nested rows, `[train_doc][scored_doc]`.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }

    /// Return `true` when every importance is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Rank training documents per scored document (or for the whole pool).
    ///
    /// See [`DocumentStrengthType`] and [`ImportanceValuesSign`]; `top_size`
    /// truncates every ranked list and is ignored for
    /// [`DocumentStrengthType::Raw`].
    #[must_use]
    pub fn strength(
        &self,
        strength_type: DocumentStrengthType,
        sign: ImportanceValuesSign,
        top_size: Option<usize>,
    ) -> DocumentStrength {
        document_strength(self, strength_type, sign, top_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_access() {
        let m = DocumentImportances::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.get(1, 0), 4.0);
        assert_eq!(m.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert!(m.is_finite());
    }

    #[test]
    fn zero_scored_documents() {
        let m = DocumentImportances::new(3, 0, vec![]);
        assert_eq!(m.shape(), (3, 0));
        assert_eq!(m.rows().count(), 3);
        assert!(m.row(2).is_empty());
    }

    #[test]
    fn non_finite_detected() {
        let m = DocumentImportances::new(1, 2, vec![1.0, f64::NAN]);
        assert!(!m.is_finite());
    }
}
