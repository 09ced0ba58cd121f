//! Importance row of one removed training document.

use crate::updater::LeafDerivatives;

/// Write into `row` the importance of one removed training document for every
/// scored document.
///
/// The predicted prediction shift of scored document `j` is the sum, over
/// trees and iterations, of the leaf correction at `j`'s leaf; it is then
/// scaled by the loss derivative at `j`'s final prediction.
pub(crate) fn importance_row(
    derivatives: &LeafDerivatives,
    leaf_indices: &[Vec<usize>],
    final_first_derivatives: &[f64],
    row: &mut [f64],
) {
    row.fill(0.0);
    for (tree_id, tree_leaves) in leaf_indices.iter().enumerate() {
        for iteration in 0..derivatives.n_iterations(tree_id) {
            let corrections = derivatives.leaves(tree_id, iteration);
            for (shift, &leaf) in row.iter_mut().zip(tree_leaves) {
                *shift += corrections[leaf];
            }
        }
    }
    for (value, &der) in row.iter_mut().zip(final_first_derivatives) {
        *value *= der;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpdateMethod;
    use crate::model::{Ensemble, ObliviousTree, TreeSplit};
    use crate::statistics::TreeStatistics;
    use crate::updater::LeavesDerivativeUpdater;

    #[test]
    fn scored_docs_in_other_leaves_get_zero() {
        let ensemble = Ensemble::new(vec![
            ObliviousTree::new(vec![TreeSplit::new(0, 1)], vec![vec![0.0; 2]]).unwrap(),
        ])
        .unwrap();
        let stats = vec![
            TreeStatistics::new(
                2,
                vec![0, 1],
                vec![vec![1.0, 1.0]],
                vec![vec![3.0, 5.0]],
                vec![vec![2.0, 2.0]],
            )
            .unwrap(),
        ];
        let mut derivatives = LeafDerivatives::zeros(&ensemble);
        LeavesDerivativeUpdater::new(&ensemble, &stats, 0.5, UpdateMethod::AllPoints)
            .update(0, &mut derivatives);

        // Three scored documents: leaves 0, 1, 0.
        let leaf_indices = vec![vec![0, 1, 0]];
        let mut row = vec![f64::NAN; 3];
        importance_row(&derivatives, &leaf_indices, &[2.0, 7.0, -1.0], &mut row);

        let correction = 3.0 * (-0.5 / 2.0);
        assert_eq!(row, vec![correction * 2.0, 0.0, correction * -1.0]);
    }
}
