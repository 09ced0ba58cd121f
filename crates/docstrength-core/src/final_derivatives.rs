//! Loss derivatives at the fully accumulated ensemble prediction.

use tracing::{debug, instrument};

use crate::loss::{LeafEstimationMethod, LossFunction, evaluate_derivatives};
use crate::model::Ensemble;
use crate::pool::Pool;

/// Sum every tree's leaf values over all leaf-estimation iterations at each
/// document's resolved leaf.
pub(crate) fn final_approxes(ensemble: &Ensemble, leaf_indices: &[Vec<usize>], n_docs: usize) -> Vec<f64> {
    let mut approxes = vec![0.0f64; n_docs];
    for (tree, tree_leaves) in ensemble.trees().iter().zip(leaf_indices) {
        for iteration in 0..tree.n_iterations() {
            let values = tree.leaf_values(iteration);
            for (approx, &leaf) in approxes.iter_mut().zip(tree_leaves) {
                *approx += values[leaf];
            }
        }
    }
    approxes
}

/// Compute the first derivative of the loss at each pool document's final
/// prediction.
#[instrument(skip_all, fields(n_docs = pool.n_docs(), loss = %loss))]
pub(crate) fn final_first_derivatives(
    ensemble: &Ensemble,
    leaf_indices: &[Vec<usize>],
    pool: &Pool,
    loss: LossFunction,
    method: LeafEstimationMethod,
) -> Vec<f64> {
    let approxes = final_approxes(ensemble, leaf_indices, pool.n_docs());
    let mut first = vec![0.0f64; pool.n_docs()];
    evaluate_derivatives(
        loss,
        method,
        &approxes,
        pool.targets(),
        pool.weights(),
        &mut first,
        None,
    );
    debug!("final first derivatives computed");
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObliviousTree, TreeSplit};
    use crate::pool::BinarizedFeatures;

    fn two_tree_ensemble() -> Ensemble {
        Ensemble::new(vec![
            ObliviousTree::new(
                vec![TreeSplit::new(0, 1)],
                vec![vec![1.0, 2.0], vec![0.5, 0.25]],
            )
            .unwrap(),
            ObliviousTree::new(vec![], vec![vec![-1.0], vec![0.0]]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn approxes_sum_all_iterations() {
        let leaf_indices = vec![vec![0, 1], vec![0, 0]];
        let approxes = final_approxes(&two_tree_ensemble(), &leaf_indices, 2);
        assert_eq!(approxes, vec![1.0 + 0.5 - 1.0, 2.0 + 0.25 - 1.0]);
    }

    #[test]
    fn rmse_derivative_is_residual() {
        let bins = BinarizedFeatures::from_columns(vec![vec![0, 1]]).unwrap();
        let pool = Pool::new(vec![1.0, 0.0], bins).unwrap();
        let leaf_indices = vec![vec![0, 1], vec![0, 0]];
        let ders = final_first_derivatives(
            &two_tree_ensemble(),
            &leaf_indices,
            &pool,
            LossFunction::Rmse,
            LeafEstimationMethod::Newton,
        );
        assert_eq!(ders, vec![1.0 - 0.5, 0.0 - 1.25]);
    }
}
