//! Per-tree leaf-fitting coefficients recorded during training.

use crate::error::ImportanceError;

/// Coefficients of the Newton leaf-value updates for one tree.
///
/// For every leaf-estimation iteration the leaf value was updated as
/// `-learning_rate * numerator / denominator`; differentiating that numerator
/// with respect to a training document's weight gives a per-document
/// multiplier on the propagated jacobian plus a per-document additive term.
///
/// `leaves_doc_id` is derived from `leaf_indices` on construction, so the two
/// mappings are always inverses of each other.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeStatistics {
    pub(crate) leaf_count: usize,
    pub(crate) leaf_indices: Vec<usize>,
    pub(crate) leaves_doc_id: Vec<Vec<usize>>,
    /// `[iteration][doc]`
    pub(crate) formula_numerator_multiplier: Vec<Vec<f64>>,
    /// `[iteration][doc]`
    pub(crate) formula_numerator_adding: Vec<Vec<f64>>,
    /// `[iteration][leaf]`
    pub(crate) formula_denominators: Vec<Vec<f64>>,
}

impl TreeStatistics {
    /// Build statistics from the training documents' leaf assignment and the
    /// per-iteration formula coefficients.
    ///
    /// # Errors
    ///
    /// | Variant                                     | When                                              |
    /// |---------------------------------------------|---------------------------------------------------|
    /// | [`ImportanceError::LeafIndexOutOfRange`]    | a leaf id is `>= leaf_count`                      |
    /// | [`ImportanceError::IterationCountMismatch`] | coefficient collections disagree on iterations    |
    /// | [`ImportanceError::TrainDocCountMismatch`]  | a per-document vector is not `leaf_indices.len()` |
    /// | [`ImportanceError::LeafCountMismatch`]      | a denominator vector is not `leaf_count` long     |
    ///
    /// Errors report tree index 0; the evaluator re-validates with real positions.
    pub fn new(
        leaf_count: usize,
        leaf_indices: Vec<usize>,
        formula_numerator_multiplier: Vec<Vec<f64>>,
        formula_numerator_adding: Vec<Vec<f64>>,
        formula_denominators: Vec<Vec<f64>>,
    ) -> Result<Self, ImportanceError> {
        let mut leaves_doc_id = vec![Vec::new(); leaf_count];
        for (doc, &leaf) in leaf_indices.iter().enumerate() {
            if leaf >= leaf_count {
                return Err(ImportanceError::LeafIndexOutOfRange {
                    tree: 0,
                    doc,
                    leaf,
                    leaf_count,
                });
            }
            leaves_doc_id[leaf].push(doc);
        }

        let stats = Self {
            leaf_count,
            leaf_indices,
            leaves_doc_id,
            formula_numerator_multiplier,
            formula_numerator_adding,
            formula_denominators,
        };
        stats.validate(0, stats.n_iterations())?;
        Ok(stats)
    }

    /// Check every vector against the tree's leaf count, the training document
    /// count and `iterations`.
    pub(crate) fn validate(&self, tree: usize, iterations: usize) -> Result<(), ImportanceError> {
        let n_docs = self.leaf_indices.len();

        if self.leaves_doc_id.len() != self.leaf_count {
            return Err(ImportanceError::LeafCountMismatch {
                tree,
                what: "leaves_doc_id",
                expected: self.leaf_count,
                got: self.leaves_doc_id.len(),
            });
        }
        for (doc, &leaf) in self.leaf_indices.iter().enumerate() {
            if leaf >= self.leaf_count {
                return Err(ImportanceError::LeafIndexOutOfRange {
                    tree,
                    doc,
                    leaf,
                    leaf_count: self.leaf_count,
                });
            }
        }
        let mut members = 0;
        for (leaf, docs) in self.leaves_doc_id.iter().enumerate() {
            let consistent = docs.windows(2).all(|w| w[0] < w[1])
                && docs
                    .iter()
                    .all(|&doc| self.leaf_indices.get(doc) == Some(&leaf));
            if !consistent {
                return Err(ImportanceError::InconsistentLeafMembership { tree, leaf });
            }
            members += docs.len();
        }
        if members != n_docs {
            // Some document is missing from its leaf's list; find which leaf.
            let leaf = (0..self.leaf_count)
                .find(|&leaf| {
                    self.leaf_indices.iter().filter(|&&l| l == leaf).count()
                        != self.leaves_doc_id[leaf].len()
                })
                .unwrap_or(0);
            return Err(ImportanceError::InconsistentLeafMembership { tree, leaf });
        }

        for (what, per_iteration) in [
            ("formula_numerator_multiplier", &self.formula_numerator_multiplier),
            ("formula_numerator_adding", &self.formula_numerator_adding),
            ("formula_denominators", &self.formula_denominators),
        ] {
            if per_iteration.len() != iterations {
                return Err(ImportanceError::IterationCountMismatch {
                    tree,
                    what,
                    expected: iterations,
                    got: per_iteration.len(),
                });
            }
        }

        for (what, per_iteration) in [
            ("formula_numerator_multiplier", &self.formula_numerator_multiplier),
            ("formula_numerator_adding", &self.formula_numerator_adding),
        ] {
            if let Some(bad) = per_iteration.iter().find(|v| v.len() != n_docs) {
                return Err(ImportanceError::TrainDocCountMismatch {
                    tree,
                    what,
                    expected: n_docs,
                    got: bad.len(),
                });
            }
        }

        if let Some(bad) = self
            .formula_denominators
            .iter()
            .find(|v| v.len() != self.leaf_count)
        {
            return Err(ImportanceError::LeafCountMismatch {
                tree,
                what: "formula_denominators",
                expected: self.leaf_count,
                got: bad.len(),
            });
        }

        Ok(())
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Return the number of training documents.
    #[must_use]
    pub fn n_docs(&self) -> usize {
        self.leaf_indices.len()
    }

    /// Return the number of leaf-estimation iterations recorded.
    #[must_use]
    pub fn n_iterations(&self) -> usize {
        self.formula_denominators.len()
    }

    /// Return the leaf of every training document.
    #[must_use]
    pub fn leaf_indices(&self) -> &[usize] {
        &self.leaf_indices
    }

    /// Return the training documents in `leaf`, in ascending document order.
    #[must_use]
    pub fn leaf_docs(&self, leaf: usize) -> &[usize] {
        &self.leaves_doc_id[leaf]
    }

    /// Return the numerator multipliers of `iteration`, indexed by document.
    #[must_use]
    pub fn numerator_multiplier(&self, iteration: usize) -> &[f64] {
        &self.formula_numerator_multiplier[iteration]
    }

    /// Return the numerator additive terms of `iteration`, indexed by document.
    #[must_use]
    pub fn numerator_adding(&self, iteration: usize) -> &[f64] {
        &self.formula_numerator_adding[iteration]
    }

    /// Return the denominators of `iteration`, indexed by leaf.
    #[must_use]
    pub fn denominators(&self, iteration: usize) -> &[f64] {
        &self.formula_denominators[iteration]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_doc_id_inverts_leaf_indices() {
        let stats = TreeStatistics::new(
            4,
            vec![2, 0, 2, 3, 0],
            vec![vec![0.0; 5]],
            vec![vec![0.0; 5]],
            vec![vec![1.0; 4]],
        )
        .unwrap();
        assert_eq!(stats.leaf_docs(0), &[1, 4]);
        assert_eq!(stats.leaf_docs(1), &[] as &[usize]);
        assert_eq!(stats.leaf_docs(2), &[0, 2]);
        assert_eq!(stats.leaf_docs(3), &[3]);
        for leaf in 0..4 {
            for &doc in stats.leaf_docs(leaf) {
                assert_eq!(stats.leaf_indices()[doc], leaf);
            }
        }
    }

    #[test]
    fn leaf_out_of_range_rejected() {
        let err = TreeStatistics::new(2, vec![0, 2], vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(
            err,
            ImportanceError::LeafIndexOutOfRange { doc: 1, leaf: 2, leaf_count: 2, .. }
        ));
    }

    #[test]
    fn short_multiplier_rejected() {
        let err = TreeStatistics::new(
            2,
            vec![0, 1, 1],
            vec![vec![0.0; 2]],
            vec![vec![0.0; 3]],
            vec![vec![1.0; 2]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ImportanceError::TrainDocCountMismatch { expected: 3, got: 2, .. }
        ));
    }

    #[test]
    fn mismatched_iterations_rejected() {
        let err = TreeStatistics::new(
            2,
            vec![0, 1],
            vec![vec![0.0; 2], vec![0.0; 2]],
            vec![vec![0.0; 2]],
            vec![vec![1.0; 2], vec![1.0; 2]],
        )
        .unwrap_err();
        assert!(matches!(err, ImportanceError::IterationCountMismatch { .. }));
    }

    #[test]
    fn tampered_membership_rejected() {
        let mut stats = TreeStatistics::new(
            2,
            vec![0, 1, 1],
            vec![vec![0.0; 3]],
            vec![vec![0.0; 3]],
            vec![vec![1.0; 2]],
        )
        .unwrap();
        stats.leaves_doc_id[1] = vec![1];
        assert!(matches!(
            stats.validate(4, 1),
            Err(ImportanceError::InconsistentLeafMembership { tree: 4, leaf: 1 })
        ));

        stats.leaves_doc_id[1] = vec![2, 1];
        assert!(matches!(
            stats.validate(4, 1),
            Err(ImportanceError::InconsistentLeafMembership { tree: 4, leaf: 1 })
        ));
    }

    #[test]
    fn short_denominators_rejected() {
        let err = TreeStatistics::new(
            2,
            vec![0, 1],
            vec![vec![0.0; 2]],
            vec![vec![0.0; 2]],
            vec![vec![1.0; 1]],
        )
        .unwrap_err();
        assert!(matches!(err, ImportanceError::LeafCountMismatch { .. }));
    }
}
