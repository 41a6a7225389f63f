use super::linear::check_predict_shape;
use super::{Regressor, RegressionError, check_training_shape};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A regression tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

struct TreeBuilder<'a> {
    x: &'a DMatrix<f64>,
    y: &'a DVector<f64>,
    max_depth: Option<usize>,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn grow(mut self, samples: Vec<usize>) -> RegressionTree {
        self.build(samples, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let index = self.nodes.len();
        let mean = samples.iter().map(|&i| self.y[i]).sum::<f64>() / samples.len() as f64;
        self.nodes.push(Node::Leaf(mean));

        let depth_exhausted = self.max_depth.is_some_and(|max| depth >= max);
        if samples.len() < 2 || depth_exhausted {
            return index;
        }
        let Some((feature, threshold)) = self.best_split(&samples) else {
            return index;
        };
        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.x[(i, feature)] <= threshold);
        let left = self.build(left_samples, depth + 1);
        let right = self.build(right_samples, depth + 1);
        self.nodes[index] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        index
    }

    /// The split with the largest reduction in squared error, thresholded at the
    /// midpoint between adjacent distinct feature values.
    fn best_split(&self, samples: &[usize]) -> Option<(usize, f64)> {
        let n = samples.len() as f64;
        let total: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = samples.iter().map(|&i| self.y[i].powi(2)).sum();
        let parent_sse = total_sq - total * total / n;
        if parent_sse <= 1e-12 {
            return None;
        }

        let mut best: Option<(usize, f64, f64)> = None;
        let mut order = samples.to_vec();
        for feature in 0..self.x.ncols() {
            order.sort_by(|&a, &b| self.x[(a, feature)].total_cmp(&self.x[(b, feature)]));
            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for k in 0..order.len() - 1 {
                let yi = self.y[order[k]];
                left_sum += yi;
                left_sq += yi * yi;
                let here = self.x[(order[k], feature)];
                let next = self.x[(order[k + 1], feature)];
                if here == next {
                    continue;
                }
                let left_n = (k + 1) as f64;
                let right_n = n - left_n;
                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n)
                    + (right_sq - right_sum * right_sum / right_n);
                if best.is_none_or(|(_, _, best_sse)| sse < best_sse) {
                    best = Some((feature, (here + next) / 2.0, sse));
                }
            }
        }
        best.filter(|&(_, _, sse)| sse < parent_sse)
            .map(|(feature, threshold, _)| (feature, threshold))
    }
}

impl RegressionTree {
    fn predict_row(&self, x: &DMatrix<f64>, row: usize) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[(row, *feature)] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Bagged regression trees. Tree `t` draws its bootstrap sample from a generator
/// seeded with `seed + t`, so forests are reproducible regardless of threading.
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_estimators: usize,
    max_depth: Option<usize>,
    seed: u64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            seed,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    fn grow_tree(&self, x: &DMatrix<f64>, y: &DVector<f64>, tree: usize) -> RegressionTree {
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(tree as u64));
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        TreeBuilder {
            x,
            y,
            max_depth: self.max_depth,
            nodes: Vec::new(),
        }
        .grow(bootstrap)
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), RegressionError> {
        check_training_shape(x, y)?;

        #[cfg(feature = "parallel")]
        let trees: Vec<RegressionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| self.grow_tree(x, y, t))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let trees: Vec<RegressionTree> = (0..self.n_estimators)
            .map(|t| self.grow_tree(x, y, t))
            .collect();

        self.trees = trees;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, RegressionError> {
        if self.trees.is_empty() {
            return Err(RegressionError::NotFitted);
        }
        check_predict_shape(x, self.n_features)?;
        let count = self.trees.len() as f64;
        Ok(DVector::from_fn(x.nrows(), |row, _| {
            self.trees.iter().map(|t| t.predict_row(x, row)).sum::<f64>() / count
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (DMatrix<f64>, DVector<f64>) {
        let x = DMatrix::from_fn(40, 2, |i, j| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = DVector::from_fn(40, |i, _| if i < 20 { 1.0 } else { 5.0 });
        (x, y)
    }

    #[test]
    fn learns_a_step_function() {
        let (x, y) = step_data();
        let mut forest = RandomForest::new(25, None, 0);
        forest.fit(&x, &y).unwrap();
        let query = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 37.0, 1.0]);
        let predicted = forest.predict(&query).unwrap();
        assert!((predicted[0] - 1.0).abs() < 0.5);
        assert!((predicted[1] - 5.0).abs() < 0.5);
    }

    #[test]
    fn same_seed_gives_identical_forests() {
        let (x, y) = step_data();
        let mut a = RandomForest::new(10, Some(3), 42);
        let mut b = RandomForest::new(10, Some(3), 42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn depth_zero_trees_predict_bootstrap_means() {
        let (x, y) = step_data();
        let mut forest = RandomForest::new(5, Some(0), 1);
        forest.fit(&x, &y).unwrap();
        let predicted = forest.predict(&x).unwrap();
        assert!(predicted.iter().all(|&p| (p - predicted[0]).abs() < 1e-12));
    }
}
