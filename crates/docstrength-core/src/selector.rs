//! Choice of leaves to re-fit at one leaf-estimation iteration.

use crate::config::UpdateMethod;
use crate::statistics::TreeStatistics;

/// Picks the leaves whose values are recomputed under document removal.
///
/// Owns its scratch buffers so one instance can be reused for every tree and
/// iteration of a worker without reallocating.
#[derive(Debug, Clone)]
pub(crate) struct LeafSelector {
    update_method: UpdateMethod,
    leaf_jacobians: Vec<f64>,
    selected: Vec<usize>,
}

impl LeafSelector {
    pub(crate) fn new(update_method: UpdateMethod) -> Self {
        Self {
            update_method,
            leaf_jacobians: Vec::new(),
            selected: Vec::new(),
        }
    }

    /// Return the leaves of the tree described by `stats` to update, given
    /// the current per-training-document `jacobian`.
    ///
    /// Top-K ranks leaves by the summed absolute jacobian of their training
    /// documents. The sort is stable, so equal aggregates keep ascending leaf
    /// order and the lower leaf id wins a tie.
    pub(crate) fn select(&mut self, stats: &TreeStatistics, jacobian: &[f64]) -> &[usize] {
        let leaf_count = stats.leaf_count();
        self.selected.clear();

        match self.update_method {
            UpdateMethod::SinglePoint => {}
            UpdateMethod::AllPoints => self.selected.extend(0..leaf_count),
            UpdateMethod::TopKLeaves { top_size } => {
                self.leaf_jacobians.clear();
                self.leaf_jacobians.resize(leaf_count, 0.0);
                for (&leaf, &value) in stats.leaf_indices().iter().zip(jacobian) {
                    self.leaf_jacobians[leaf] += value.abs();
                }

                self.selected.extend(0..leaf_count);
                let leaf_jacobians = &self.leaf_jacobians;
                self.selected
                    .sort_by(|&a, &b| leaf_jacobians[b].total_cmp(&leaf_jacobians[a]));
                self.selected.truncate(top_size.min(leaf_count));
            }
        }

        &self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_leaf_stats() -> TreeStatistics {
        // leaf 0: docs 0, 1; leaf 1: doc 2; leaf 2: none; leaf 3: docs 3, 4
        TreeStatistics::new(
            4,
            vec![0, 0, 1, 3, 3],
            vec![vec![0.0; 5]],
            vec![vec![0.0; 5]],
            vec![vec![1.0; 4]],
        )
        .unwrap()
    }

    #[test]
    fn all_points_selects_every_leaf() {
        let mut selector = LeafSelector::new(UpdateMethod::AllPoints);
        assert_eq!(selector.select(&four_leaf_stats(), &[0.0; 5]), &[0, 1, 2, 3]);
    }

    #[test]
    fn single_point_selects_nothing() {
        let mut selector = LeafSelector::new(UpdateMethod::SinglePoint);
        assert!(selector.select(&four_leaf_stats(), &[1.0; 5]).is_empty());
    }

    #[test]
    fn top_k_ranks_by_absolute_jacobian() {
        let mut selector = LeafSelector::new(UpdateMethod::TopKLeaves { top_size: 2 });
        // leaf 0: |0.1| + |-0.1| = 0.2, leaf 1: 0.5, leaf 3: |-1.0| + 0 = 1.0
        let jacobian = [0.1, -0.1, 0.5, -1.0, 0.0];
        assert_eq!(selector.select(&four_leaf_stats(), &jacobian), &[3, 1]);
    }

    #[test]
    fn top_k_ties_prefer_lower_leaf() {
        let mut selector = LeafSelector::new(UpdateMethod::TopKLeaves { top_size: 3 });
        assert_eq!(selector.select(&four_leaf_stats(), &[0.0; 5]), &[0, 1, 2]);
    }

    #[test]
    fn top_k_clamped_to_leaf_count() {
        let stats = TreeStatistics::new(
            2,
            vec![0, 1],
            vec![vec![0.0; 2]],
            vec![vec![0.0; 2]],
            vec![vec![1.0; 2]],
        )
        .unwrap();
        let mut selector = LeafSelector::new(UpdateMethod::TopKLeaves { top_size: 4 });
        assert_eq!(selector.select(&stats, &[0.0, 2.0]), &[1, 0]);
    }
}
