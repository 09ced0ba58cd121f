//! Leaf index resolution for oblivious trees.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::model::{Ensemble, ObliviousTree};
use crate::pool::BinarizedFeatures;

/// Return the leaf of each of the first `n_docs` documents in `tree`.
///
/// Level `k` contributes bit `k` of the leaf id. Split features must be
/// present in `features`.
pub(crate) fn resolve_tree(tree: &ObliviousTree, features: &BinarizedFeatures, n_docs: usize) -> Vec<usize> {
    let mut leaves = vec![0usize; n_docs];
    for (level, split) in tree.splits().iter().enumerate() {
        let column = features.column(split.feature);
        for (leaf, &bin) in leaves.iter_mut().zip(column) {
            *leaf |= usize::from(bin >= split.border) << level;
        }
    }
    leaves
}

/// Resolve `leaf_indices[tree][doc]` for every tree, in parallel over trees
/// on the current rayon pool.
#[instrument(skip_all, fields(n_trees = ensemble.n_trees(), n_docs = n_docs))]
pub(crate) fn resolve_leaf_indices(
    ensemble: &Ensemble,
    features: &BinarizedFeatures,
    n_docs: usize,
) -> Vec<Vec<usize>> {
    let leaf_indices: Vec<Vec<usize>> = ensemble
        .trees()
        .into_par_iter()
        .map(|tree| resolve_tree(tree, features, n_docs))
        .collect();
    debug!("leaf indices resolved");
    leaf_indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeSplit;

    #[test]
    fn bits_follow_split_levels() {
        // feature 0 bins: [0, 2, 0, 3], feature 1 bins: [1, 1, 0, 0]
        let features =
            BinarizedFeatures::from_columns(vec![vec![0, 2, 0, 3], vec![1, 1, 0, 0]]).unwrap();
        let tree = ObliviousTree::new(
            vec![TreeSplit::new(0, 2), TreeSplit::new(1, 1)],
            vec![vec![0.0; 4]],
        )
        .unwrap();
        assert_eq!(resolve_tree(&tree, &features, 4), vec![2, 3, 0, 1]);
    }

    #[test]
    fn stump_without_splits_maps_everything_to_leaf_zero() {
        let features = BinarizedFeatures::from_columns(vec![]).unwrap();
        let tree = ObliviousTree::new(vec![], vec![vec![1.0]]).unwrap();
        assert_eq!(resolve_tree(&tree, &features, 3), vec![0, 0, 0]);
    }

    #[test]
    fn every_tree_resolved_in_order() {
        let features = BinarizedFeatures::from_columns(vec![vec![0, 1, 2]]).unwrap();
        let ensemble = Ensemble::new(vec![
            ObliviousTree::new(vec![TreeSplit::new(0, 1)], vec![vec![0.0; 2]]).unwrap(),
            ObliviousTree::new(vec![TreeSplit::new(0, 2)], vec![vec![0.0; 2]]).unwrap(),
        ])
        .unwrap();
        let leaves = resolve_leaf_indices(&ensemble, &features, 3);
        assert_eq!(leaves, vec![vec![0, 1, 1], vec![0, 0, 1]]);
    }
}
