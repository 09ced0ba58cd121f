//! Leaf-value derivatives with respect to one training document's weight.
//!
//! Replays every tree's leaf-estimation iterations in fitting order,
//! differentiated with respect to the removed document's weight. Each
//! iteration's correction depends on the jacobian accumulated by every
//! earlier iteration and tree, so the loop is a strictly sequential
//! recurrence; parallelism lives one level up, across removed documents.

use crate::config::UpdateMethod;
use crate::model::Ensemble;
use crate::selector::LeafSelector;
use crate::statistics::TreeStatistics;

/// Propagated first-order effect of one document's removal on every
/// training document's accumulated prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    values: Vec<f64>,
}

impl Jacobian {
    /// Create an all-zero jacobian over `n_docs` training documents.
    #[must_use]
    pub fn zeros(n_docs: usize) -> Self {
        Self {
            values: vec![0.0; n_docs],
        }
    }

    /// Return the per-document values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    fn reset(&mut self) {
        self.values.fill(0.0);
    }

    fn add(&mut self, docs: &[usize], delta: f64) {
        for &doc in docs {
            self.values[doc] += delta;
        }
    }
}

/// Leaf-value corrections, `[tree][iteration][leaf]`, for one removed document.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafDerivatives {
    per_tree: Vec<Vec<Vec<f64>>>,
}

impl LeafDerivatives {
    /// Allocate zeroed corrections shaped after `ensemble`.
    #[must_use]
    pub fn zeros(ensemble: &Ensemble) -> Self {
        let per_tree = ensemble
            .trees()
            .iter()
            .map(|tree| vec![vec![0.0; tree.leaf_count()]; tree.n_iterations()])
            .collect();
        Self { per_tree }
    }

    /// Return the corrections of `tree` at `iteration`, indexed by leaf.
    #[must_use]
    pub fn leaves(&self, tree: usize, iteration: usize) -> &[f64] {
        &self.per_tree[tree][iteration]
    }

    /// Return the number of trees covered.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.per_tree.len()
    }

    /// Return the number of iterations stored for `tree`.
    #[must_use]
    pub fn n_iterations(&self, tree: usize) -> usize {
        self.per_tree[tree].len()
    }
}

/// Computes [`LeafDerivatives`] for removed training documents.
///
/// Holds the shared read-only inputs plus scratch state; one instance per
/// worker thread, reused across the documents that worker processes.
#[derive(Debug)]
pub struct LeavesDerivativeUpdater<'a> {
    ensemble: &'a Ensemble,
    statistics: &'a [TreeStatistics],
    learning_rate: f64,
    selector: LeafSelector,
    jacobian: Jacobian,
}

impl<'a> LeavesDerivativeUpdater<'a> {
    /// Create an updater over validated inputs.
    ///
    /// `statistics` must hold one entry per tree, each consistent with its
    /// tree's leaf count and iteration count and with a common training
    /// document count.
    #[must_use]
    pub fn new(
        ensemble: &'a Ensemble,
        statistics: &'a [TreeStatistics],
        learning_rate: f64,
        update_method: UpdateMethod,
    ) -> Self {
        let n_docs = statistics.first().map_or(0, TreeStatistics::n_docs);
        Self {
            ensemble,
            statistics,
            learning_rate,
            selector: LeafSelector::new(update_method),
            jacobian: Jacobian::zeros(n_docs),
        }
    }

    /// Return the jacobian left by the most recent [`update`](Self::update).
    #[must_use]
    pub fn jacobian(&self) -> &Jacobian {
        &self.jacobian
    }

    /// Fill `derivatives` with the leaf corrections caused by removing
    /// training document `removed_doc`.
    pub fn update(&mut self, removed_doc: usize, derivatives: &mut LeafDerivatives) {
        self.jacobian.reset();
        for (tree_id, stats) in self.statistics.iter().enumerate() {
            for iteration in 0..self.ensemble.trees()[tree_id].n_iterations() {
                let leaf_derivatives = &mut derivatives.per_tree[tree_id][iteration];
                update_tree_iteration(
                    &mut self.selector,
                    &mut self.jacobian,
                    stats,
                    iteration,
                    removed_doc,
                    self.learning_rate,
                    leaf_derivatives,
                );
            }
        }
    }
}

/// One step of the recurrence: corrections for the selected leaves of one
/// tree at one iteration, then propagation into the jacobian.
fn update_tree_iteration(
    selector: &mut LeafSelector,
    jacobian: &mut Jacobian,
    stats: &TreeStatistics,
    iteration: usize,
    removed_doc: usize,
    learning_rate: f64,
    leaf_derivatives: &mut [f64],
) {
    let multiplier = stats.numerator_multiplier(iteration);
    let adding = stats.numerator_adding(iteration);
    let denominators = stats.denominators(iteration);
    let removed_leaf = stats.leaf_indices()[removed_doc];

    let selected = selector.select(stats, jacobian.as_slice());

    leaf_derivatives.fill(0.0);
    let mut removed_leaf_updated = false;
    for &leaf in selected {
        let mut numerator: f64 = stats
            .leaf_docs(leaf)
            .iter()
            .map(|&doc| multiplier[doc] * jacobian.values[doc])
            .sum();
        if leaf == removed_leaf {
            numerator += adding[removed_doc];
            removed_leaf_updated = true;
        }
        leaf_derivatives[leaf] = numerator * (-learning_rate / denominators[leaf]);
    }

    // The removed document always perturbs its own leaf, selected or not.
    if !removed_leaf_updated {
        let numerator = jacobian.values[removed_doc] * multiplier[removed_doc] + adding[removed_doc];
        leaf_derivatives[removed_leaf] = numerator * (-learning_rate / denominators[removed_leaf]);
    }

    for &leaf in selected {
        jacobian.add(stats.leaf_docs(leaf), leaf_derivatives[leaf]);
    }
    if !removed_leaf_updated {
        jacobian.values[removed_doc] += leaf_derivatives[removed_leaf];
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::model::{ObliviousTree, TreeSplit};

    fn stump(iterations: usize) -> ObliviousTree {
        ObliviousTree::new(vec![TreeSplit::new(0, 1)], vec![vec![0.0; 2]; iterations]).unwrap()
    }

    /// docs 0, 1 in leaf 0; doc 2 in leaf 1.
    fn stump_stats(iterations: usize) -> TreeStatistics {
        TreeStatistics::new(
            2,
            vec![0, 0, 1],
            vec![vec![0.5, 1.0, 2.0]; iterations],
            vec![vec![1.0, -2.0, 4.0]; iterations],
            vec![vec![2.0, 4.0]; iterations],
        )
        .unwrap()
    }

    #[test]
    fn first_iteration_only_touches_own_leaf() {
        let ensemble = Ensemble::new(vec![stump(1)]).unwrap();
        let stats = vec![stump_stats(1)];
        let mut updater = LeavesDerivativeUpdater::new(&ensemble, &stats, 0.1, UpdateMethod::AllPoints);
        let mut derivatives = LeafDerivatives::zeros(&ensemble);

        updater.update(0, &mut derivatives);
        // -0.1 / 2.0 * adding[0]
        assert_abs_diff_eq!(derivatives.leaves(0, 0)[0], -0.05, epsilon = 1e-15);
        assert_eq!(derivatives.leaves(0, 0)[1], 0.0);
        // Propagated to both documents of leaf 0.
        assert_abs_diff_eq!(updater.jacobian().as_slice()[0], -0.05, epsilon = 1e-15);
        assert_abs_diff_eq!(updater.jacobian().as_slice()[1], -0.05, epsilon = 1e-15);
        assert_eq!(updater.jacobian().as_slice()[2], 0.0);
    }

    #[test]
    fn second_iteration_uses_propagated_jacobian() {
        let ensemble = Ensemble::new(vec![stump(2)]).unwrap();
        let stats = vec![stump_stats(2)];
        let mut updater = LeavesDerivativeUpdater::new(&ensemble, &stats, 0.1, UpdateMethod::AllPoints);
        let mut derivatives = LeafDerivatives::zeros(&ensemble);

        updater.update(0, &mut derivatives);
        // iteration 1: jacobian = [-0.05, -0.05, 0]
        // numerator = 0.5 * -0.05 + 1.0 * -0.05 + adding[0] = -0.075 + 1.0
        let expected = (0.5 * -0.05 + 1.0 * -0.05 + 1.0) * (-0.1 / 2.0);
        assert_abs_diff_eq!(derivatives.leaves(0, 1)[0], expected, epsilon = 1e-15);
        assert_eq!(derivatives.leaves(0, 1)[1], 0.0);
    }

    #[test]
    fn single_point_applies_own_leaf_only() {
        let ensemble = Ensemble::new(vec![stump(2)]).unwrap();
        let stats = vec![stump_stats(2)];
        let mut updater =
            LeavesDerivativeUpdater::new(&ensemble, &stats, 0.1, UpdateMethod::SinglePoint);
        let mut derivatives = LeafDerivatives::zeros(&ensemble);

        updater.update(2, &mut derivatives);
        let first = 4.0 * (-0.1 / 4.0);
        assert_abs_diff_eq!(derivatives.leaves(0, 0)[1], first, epsilon = 1e-15);
        // Only the removed document's own jacobian entry moves.
        assert_eq!(updater.jacobian().as_slice()[..2], [0.0, 0.0]);
        let second = (first * 2.0 + 4.0) * (-0.1 / 4.0);
        assert_abs_diff_eq!(derivatives.leaves(0, 1)[1], second, epsilon = 1e-15);
        assert_abs_diff_eq!(updater.jacobian().as_slice()[2], first + second, epsilon = 1e-15);
    }

    #[test]
    fn updater_reuse_starts_from_zero() {
        let ensemble = Ensemble::new(vec![stump(2)]).unwrap();
        let stats = vec![stump_stats(2)];
        let mut updater = LeavesDerivativeUpdater::new(&ensemble, &stats, 0.1, UpdateMethod::AllPoints);

        let mut fresh = LeafDerivatives::zeros(&ensemble);
        updater.update(1, &mut fresh);

        let mut reused = LeafDerivatives::zeros(&ensemble);
        updater.update(2, &mut reused);
        updater.update(1, &mut reused);
        assert_eq!(fresh, reused);
    }
}
