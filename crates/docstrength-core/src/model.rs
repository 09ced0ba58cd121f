//! Oblivious tree ensemble as consumed by the importance evaluator.

use crate::error::ImportanceError;

/// Deepest tree the evaluator accepts (leaf ids must fit comfortably in memory).
pub const MAX_TREE_DEPTH: usize = 16;

/// One level of an oblivious tree: documents whose bin for `feature` is
/// at least `border` take the "1" branch at that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TreeSplit {
    /// Zero-based binarized feature index.
    pub feature: usize,
    /// Bin threshold: `bin >= border` sets the level's bit.
    pub border: u8,
}

impl TreeSplit {
    /// Create a new split on `feature` at bin `border`.
    #[must_use]
    pub fn new(feature: usize, border: u8) -> Self {
        Self { feature, border }
    }
}

/// A fitted oblivious (symmetric) decision tree.
///
/// Every level applies the same split to all nodes, so the leaf id of a
/// document is the bit pattern of its split outcomes, level 0 being the
/// least significant bit.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObliviousTree {
    pub(crate) splits: Vec<TreeSplit>,
    /// `leaf_values[iteration][leaf]`, one vector per leaf-estimation step.
    pub(crate) leaf_values: Vec<Vec<f64>>,
}

impl ObliviousTree {
    /// Create a tree from its splits and per-iteration leaf values.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                       |
    /// |-----------------------------------------|--------------------------------------------|
    /// | [`ImportanceError::TreeTooDeep`]        | more than [`MAX_TREE_DEPTH`] splits        |
    /// | [`ImportanceError::LeafCountMismatch`]  | a leaf-value vector is not `2^depth` long  |
    ///
    /// The tree index reported in errors is 0; [`Ensemble::new`] re-validates
    /// with the real position.
    pub fn new(splits: Vec<TreeSplit>, leaf_values: Vec<Vec<f64>>) -> Result<Self, ImportanceError> {
        let tree = Self {
            splits,
            leaf_values,
        };
        tree.validate(0)?;
        Ok(tree)
    }

    fn validate(&self, tree: usize) -> Result<(), ImportanceError> {
        if self.splits.len() > MAX_TREE_DEPTH {
            return Err(ImportanceError::TreeTooDeep {
                tree,
                depth: self.splits.len(),
                max_depth: MAX_TREE_DEPTH,
            });
        }
        let leaf_count = self.leaf_count();
        for values in &self.leaf_values {
            if values.len() != leaf_count {
                return Err(ImportanceError::LeafCountMismatch {
                    tree,
                    what: "leaf_values",
                    expected: leaf_count,
                    got: values.len(),
                });
            }
        }
        Ok(())
    }

    /// Return the tree depth (number of split levels).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.splits.len()
    }

    /// Return the number of leaves, `2^depth`.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        1 << self.splits.len()
    }

    /// Return the splits, root level first.
    #[must_use]
    pub fn splits(&self) -> &[TreeSplit] {
        &self.splits
    }

    /// Return the number of leaf-estimation iterations stored for this tree.
    #[must_use]
    pub fn n_iterations(&self) -> usize {
        self.leaf_values.len()
    }

    /// Return the leaf values fitted at `iteration`.
    #[must_use]
    pub fn leaf_values(&self, iteration: usize) -> &[f64] {
        &self.leaf_values[iteration]
    }
}

/// An ordered additive ensemble of oblivious trees.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ensemble {
    pub(crate) trees: Vec<ObliviousTree>,
}

impl Ensemble {
    /// Create an ensemble from trees in fitting order.
    ///
    /// # Errors
    ///
    /// Returns [`ImportanceError::EmptyEnsemble`] when `trees` is empty, or the
    /// per-tree errors of [`ObliviousTree::new`] with the tree's position.
    pub fn new(trees: Vec<ObliviousTree>) -> Result<Self, ImportanceError> {
        if trees.is_empty() {
            return Err(ImportanceError::EmptyEnsemble);
        }
        for (idx, tree) in trees.iter().enumerate() {
            tree.validate(idx)?;
        }
        Ok(Self { trees })
    }

    /// Return the trees in fitting order.
    #[must_use]
    pub fn trees(&self) -> &[ObliviousTree] {
        &self.trees
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the largest leaf count of any tree.
    #[must_use]
    pub fn max_leaf_count(&self) -> usize {
        self.trees.iter().map(ObliviousTree::leaf_count).max().unwrap_or(0)
    }

    /// Return one past the largest feature index used by any split.
    #[must_use]
    pub fn n_used_features(&self) -> usize {
        self.trees
            .iter()
            .flat_map(|t| t.splits.iter())
            .map(|s| s.feature + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize) -> ObliviousTree {
        ObliviousTree::new(vec![TreeSplit::new(feature, 1)], vec![vec![0.5, -0.5]]).unwrap()
    }

    #[test]
    fn leaf_count_is_power_of_two() {
        let tree = ObliviousTree::new(
            vec![TreeSplit::new(0, 1), TreeSplit::new(1, 2), TreeSplit::new(0, 3)],
            vec![vec![0.0; 8]],
        )
        .unwrap();
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.leaf_count(), 8);
    }

    #[test]
    fn depth_zero_tree_has_one_leaf() {
        let tree = ObliviousTree::new(vec![], vec![vec![1.0], vec![0.5]]).unwrap();
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.n_iterations(), 2);
    }

    #[test]
    fn wrong_leaf_value_length_rejected() {
        let err = ObliviousTree::new(vec![TreeSplit::new(0, 1)], vec![vec![0.0; 3]]).unwrap_err();
        assert!(matches!(
            err,
            ImportanceError::LeafCountMismatch { expected: 2, got: 3, .. }
        ));
    }

    #[test]
    fn too_deep_tree_rejected() {
        let splits = vec![TreeSplit::new(0, 1); MAX_TREE_DEPTH + 1];
        let err = ObliviousTree::new(splits, vec![]).unwrap_err();
        assert!(matches!(err, ImportanceError::TreeTooDeep { .. }));
    }

    #[test]
    fn empty_ensemble_rejected() {
        assert!(matches!(
            Ensemble::new(vec![]).unwrap_err(),
            ImportanceError::EmptyEnsemble
        ));
    }

    #[test]
    fn ensemble_summaries() {
        let ensemble = Ensemble::new(vec![stump(0), stump(4)]).unwrap();
        assert_eq!(ensemble.n_trees(), 2);
        assert_eq!(ensemble.max_leaf_count(), 2);
        assert_eq!(ensemble.n_used_features(), 5);
    }
}
