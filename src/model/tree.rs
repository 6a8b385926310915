//! CART classification tree.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth (None = grow until leaves are pure).
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Features drawn at random for each split (None = all features).
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Class probabilities, indexed by class.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Binary classification tree split on Gini impurity.
///
/// Labels are class indices in `0..n_classes`; mapping to user labels is the
/// caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
    n_classes: usize,
    /// Total impurity decrease contributed by each feature, normalized to sum
    /// to one (all zeros for a single-leaf tree).
    importances: Vec<f64>,
}

/// Best split found for one node.
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Sum of `n * gini` over both children.
    weighted_impurity: f64,
}

/// Shared state while growing one tree.
struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    params: &'a TreeParams,
    total_samples: f64,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `samples` (duplicates allowed, as
    /// produced by bootstrap sampling).
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        samples: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let mut builder = Builder {
            x,
            y,
            n_classes,
            n_features,
            params,
            total_samples: samples.len().max(1) as f64,
            importances: vec![0.0; n_features],
        };

        let mut indices = samples.to_vec();
        let root = builder.grow(&mut indices, 0, rng);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in &mut importances {
                *value /= total;
            }
        }

        Self {
            root,
            n_classes,
            importances,
        }
    }

    /// Class probabilities for one row.
    pub fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Most probable class index for one row (lowest index on ties).
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(self.predict_proba(row))
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Depth of the deepest leaf (0 for a single leaf).
    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        fn leaves_of(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => leaves_of(left) + leaves_of(right),
            }
        }
        leaves_of(&self.root)
    }
}

impl Builder<'_> {
    fn grow(&mut self, indices: &mut [usize], depth: usize, rng: &mut StdRng) -> Node {
        let counts = self.class_counts(indices);
        let n = indices.len();
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);

        if pure || depth_reached || n < self.params.min_samples_split {
            return self.leaf(&counts, n);
        }

        let Some(split) = self.best_split(indices, rng) else {
            return self.leaf(&counts, n);
        };

        let parent_impurity = weighted_gini(&counts, n);
        self.importances[split.feature] +=
            (parent_impurity - split.weighted_impurity) / self.total_samples;

        let x = self.x;
        let mid = partition(indices, |&i| x[i][split.feature] <= split.threshold);
        let (left_idx, right_idx) = indices.split_at_mut(mid);
        let left = self.grow(left_idx, depth + 1, rng);
        let right = self.grow(right_idx, depth + 1, rng);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn leaf(&self, counts: &[usize], n: usize) -> Node {
        let total = n.max(1) as f64;
        Node::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / total).collect(),
        }
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Features to try at one node: a random subset of `max_features`
    /// (sorted), followed by the remaining features in random order.
    fn candidate_features(&self, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
        match self.params.max_features {
            Some(k) if k < self.n_features => {
                let mut order = index::sample(rng, self.n_features, self.n_features).into_vec();
                let rest = order.split_off(k.max(1));
                // Ties resolve by feature index, not draw order.
                order.sort_unstable();
                (order, rest)
            }
            _ => ((0..self.n_features).collect(), Vec::new()),
        }
    }

    /// Scan every distinct threshold of each candidate feature and keep the
    /// split with the lowest weighted Gini impurity. When none of the sampled
    /// features can split the node, the remaining features are tried one at a
    /// time until one can.
    fn best_split(&self, indices: &[usize], rng: &mut StdRng) -> Option<SplitCandidate> {
        let (sampled, rest) = self.candidate_features(rng);
        let mut best: Option<SplitCandidate> = None;
        let mut values: Vec<(f64, usize)> = Vec::with_capacity(indices.len());

        for feature in sampled {
            self.scan_feature(feature, indices, &mut values, &mut best);
        }
        for feature in rest {
            if best.is_some() {
                break;
            }
            self.scan_feature(feature, indices, &mut values, &mut best);
        }

        best
    }

    fn scan_feature(
        &self,
        feature: usize,
        indices: &[usize],
        values: &mut Vec<(f64, usize)>,
        best: &mut Option<SplitCandidate>,
    ) {
        let n = indices.len();
        let total_counts = self.class_counts(indices);

        values.clear();
        values.extend(indices.iter().map(|&i| (self.x[i][feature], self.y[i])));
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; self.n_classes];
        for pos in 1..n {
            left_counts[values[pos - 1].1] += 1;
            if values[pos - 1].0 >= values[pos].0 {
                continue;
            }

            let right_counts: Vec<usize> = total_counts
                .iter()
                .zip(&left_counts)
                .map(|(t, l)| t - l)
                .collect();
            let impurity = weighted_gini(&left_counts, pos) + weighted_gini(&right_counts, n - pos);

            if best
                .as_ref()
                .is_none_or(|b| impurity < b.weighted_impurity - 1e-12)
            {
                *best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(values[pos - 1].0, values[pos].0),
                    weighted_impurity: impurity,
                });
            }
        }
    }
}

/// `n * gini(counts)`, i.e. `n - sum(c^2) / n`.
fn weighted_gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64).powi(2)).sum();
    n - sum_sq / n
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low / 2.0 + high / 2.0;
    // Guard against rounding up to `high` for adjacent floats.
    if mid >= high { low } else { mid }
}

/// Reorder `items` so every element matching `pred` comes first; returns the
/// number of matching elements.
fn partition<T, F: Fn(&T) -> bool>(items: &mut [T], pred: F) -> usize {
    let mut mid = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

/// Index of the largest value, lowest index on ties.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Draw `n` row indices with replacement.
pub(crate) fn bootstrap(n: usize, rng: &mut StdRng) -> Vec<usize> {
    (0..n).map(|_| rng.random_range(0..n)).collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn fit(x: &[Vec<f64>], y: &[usize], params: &TreeParams) -> DecisionTree {
        let samples: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(0);
        DecisionTree::fit(x, y, 2, &samples, params, &mut rng)
    }

    #[test]
    fn test_single_threshold() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0], vec![10.0], vec![11.0], vec![12.0]];
        let y = vec![0, 0, 0, 1, 1, 1];
        let tree = fit(&x, &y, &TreeParams::default());

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&[2.5]), 0);
        assert_eq!(tree.predict(&[9.0]), 1);
        assert_eq!(tree.predict_proba(&[100.0]), &[0.0, 1.0]);
    }

    #[test]
    fn test_learns_xor() {
        let x = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let y = vec![0, 1, 1, 0];
        let tree = fit(&x, &y, &TreeParams::default());
        for (row, label) in x.iter().zip(&y) {
            assert_eq!(tree.predict(row), *label);
        }
    }

    #[test]
    fn test_depth_limit() {
        let x: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let y: Vec<usize> = (0..16).map(|i| i % 2).collect();
        let params = TreeParams {
            max_depth: Some(2),
            ..TreeParams::default()
        };
        let tree = fit(&x, &y, &params);
        assert!(tree.depth() <= 2);
        assert!(tree.leaf_count() <= 4);
    }

    #[test]
    fn test_min_samples_split() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0, 1, 0];
        let params = TreeParams {
            min_samples_split: 4,
            ..TreeParams::default()
        };
        let tree = fit(&x, &y, &params);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.predict(&[2.0]), 0);
    }

    #[test]
    fn test_importances_point_at_informative_feature() {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![(i % 3) as f64, if i < 10 { 0.0 } else { 1.0 }])
            .collect();
        let y: Vec<usize> = (0..20).map(|i| if i < 10 { 0 } else { 1 }).collect();
        let tree = fit(&x, &y, &TreeParams::default());

        let importances = tree.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[1] > 0.99);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = vec![vec![1.0], vec![5.0]];
        let y = vec![1, 1];
        let tree = fit(&x, &y, &TreeParams::default());
        assert_eq!(tree.leaf_count(), 1);
        assert!(tree.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_constant_sampled_features_fall_back_to_informative_one() {
        // Only the last of four features separates the classes.
        let x: Vec<Vec<f64>> = (0..12)
            .map(|i| vec![1.0, 2.0, 3.0, if i < 6 { 0.0 } else { 1.0 }])
            .collect();
        let y: Vec<usize> = (0..12).map(|i| usize::from(i >= 6)).collect();
        let samples: Vec<usize> = (0..x.len()).collect();
        let params = TreeParams {
            max_features: Some(1),
            ..TreeParams::default()
        };

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let tree = DecisionTree::fit(&x, &y, 2, &samples, &params, &mut rng);
            assert_eq!(tree.depth(), 1, "seed {seed} left a single leaf");
            assert_eq!(tree.predict(&[1.0, 2.0, 3.0, 1.0]), 1);
        }
    }

    #[test]
    fn test_argmax_ties() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.8]), 1);
    }
}
