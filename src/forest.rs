//! A seeded random forest of binary classification trees, grown only for their
//! mean-decrease-in-impurity feature importances.

use crate::validation::DataValidator;
use crate::PipelineError;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

// Two feature values closer than this are treated as equal when placing thresholds.
const FEATURE_THRESHOLD: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    n_trees: usize,
    seed: u64,
    max_depth: Option<usize>,
}

impl RandomForest {
    pub fn new(n_trees: usize, seed: u64, max_depth: Option<usize>) -> Self {
        Self { n_trees, seed, max_depth }
    }

    /// Fits the forest and returns one importance per feature column, normalized to sum
    /// to one. Each tree is grown on a bootstrap sample and considers `sqrt(n_features)`
    /// random candidate features per split. Tree `i` draws from stream `i` of the seeded
    /// generator, so the result does not depend on the order trees are fitted in.
    ///
    /// If no tree finds a single split (every label identical), importances are uniform.
    pub fn feature_importances(
        &self,
        rows: &[Vec<f64>],
        labels: &[u8],
    ) -> Result<Vec<f64>, PipelineError> {
        let validator = DataValidator::new(rows);
        validator.validate_input_data()?;
        validator.validate_aligned(labels.len(), "labels")?;
        let Some(first) = rows.first() else {
            return Err(PipelineError::DataUnavailable(String::from(
                "cannot rank features of an empty dataset",
            )));
        };
        let n_features = first.len();
        if n_features == 0 {
            return Err(PipelineError::DataUnavailable(String::from(
                "the dataset has no feature columns",
            )));
        }

        let per_tree = self.fit_trees(rows, labels, n_features);
        let grown: Vec<&Vec<f64>> = per_tree
            .iter()
            .filter(|importances| importances.iter().any(|&v| v > 0.0))
            .collect();
        if grown.is_empty() {
            return Ok(vec![1.0 / n_features as f64; n_features]);
        }

        let mut mean = vec![0.0; n_features];
        for importances in &grown {
            for (total, value) in mean.iter_mut().zip(importances.iter()) {
                *total += value;
            }
        }
        Ok(normalize(mean))
    }

    #[cfg(not(feature = "parallel"))]
    fn fit_trees(&self, rows: &[Vec<f64>], labels: &[u8], n_features: usize) -> Vec<Vec<f64>> {
        (0..self.n_trees)
            .map(|tree| self.fit_tree(tree, rows, labels, n_features))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn fit_trees(&self, rows: &[Vec<f64>], labels: &[u8], n_features: usize) -> Vec<Vec<f64>> {
        (0..self.n_trees)
            .into_par_iter()
            .map(|tree| self.fit_tree(tree, rows, labels, n_features))
            .collect()
    }

    fn fit_tree(&self, tree: usize, rows: &[Vec<f64>], labels: &[u8], n_features: usize) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(tree as u64);
        let n_samples = rows.len();
        let bootstrap: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

        let mut builder = TreeBuilder {
            rows,
            labels,
            max_features: max_features(n_features),
            max_depth: self.max_depth,
            importances: vec![0.0; n_features],
            rng,
        };
        builder.grow(bootstrap);
        normalize(builder.importances)
    }
}

fn max_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt() as usize).max(1)
}

fn normalize(mut values: Vec<f64>) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
    values
}

fn gini(n_fraud: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = n_fraud as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

struct Split {
    feature: usize,
    threshold: f64,
    // Weighted impurity decrease, not yet divided by the tree's sample count.
    decrease: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
    max_features: usize,
    max_depth: Option<usize>,
    importances: Vec<f64>,
    rng: ChaCha8Rng,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, root: Vec<usize>) {
        let n_root = root.len() as f64;
        let mut stack = vec![(root, 0_usize)];

        while let Some((samples, depth)) = stack.pop() {
            if self.max_depth.is_some_and(|max| depth >= max) || samples.len() < 2 {
                continue;
            }
            let n_fraud = self.count_fraud(&samples);
            if n_fraud == 0 || n_fraud == samples.len() {
                continue;
            }
            let Some(split) = self.best_split(&samples, n_fraud) else {
                continue;
            };
            self.importances[split.feature] += split.decrease / n_root;

            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&s| self.rows[s][split.feature] <= split.threshold);
            stack.push((right, depth + 1));
            stack.push((left, depth + 1));
        }
    }

    fn count_fraud(&self, samples: &[usize]) -> usize {
        samples.iter().filter(|&&s| self.labels[s] == crate::FRAUD).count()
    }

    fn best_split(&mut self, samples: &[usize], n_fraud: usize) -> Option<Split> {
        let n = samples.len();
        let parent = n as f64 * gini(n_fraud, n);

        let mut features: Vec<usize> = (0..self.importances.len()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<Split> = None;
        let mut visited = 0;
        let mut sorted = samples.to_vec();
        for feature in features {
            if visited >= self.max_features {
                break;
            }
            let value = |s: usize| self.rows[s][feature];
            sorted.sort_by(|&a, &b| value(a).total_cmp(&value(b)));
            if value(sorted[n - 1]) <= value(sorted[0]) + FEATURE_THRESHOLD {
                continue;
            }
            visited += 1;

            let mut left_fraud = 0;
            for i in 0..n - 1 {
                if self.labels[sorted[i]] == crate::FRAUD {
                    left_fraud += 1;
                }
                let (here, next) = (value(sorted[i]), value(sorted[i + 1]));
                if next <= here + FEATURE_THRESHOLD {
                    continue;
                }
                let n_left = i + 1;
                let n_right = n - n_left;
                let children = n_left as f64 * gini(left_fraud, n_left)
                    + n_right as f64 * gini(n_fraud - left_fraud, n_right);
                let decrease = parent - children;
                if best.as_ref().map_or(true, |b| decrease > b.decrease) {
                    best = Some(Split { feature, threshold: here + (next - here) / 2.0, decrease });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        // Column 1 separates the classes, columns 0 and 2 are noise.
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let noise = ((i * 37) % 11) as f64;
            let class = (i % 3 == 0) as u8;
            let signal = if class == 1 { 10.0 + (i % 5) as f64 } else { -((i % 7) as f64) };
            rows.push(vec![noise, signal, ((i * 13) % 7) as f64]);
            labels.push(class);
        }
        (rows, labels)
    }

    #[test]
    fn importances_sum_to_one() {
        let (rows, labels) = separable_data();
        let importances = RandomForest::new(20, 42, None).feature_importances(&rows, &labels).unwrap();
        assert_eq!(3, importances.len());
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn separating_feature_ranks_first() {
        let (rows, labels) = separable_data();
        let importances = RandomForest::new(30, 42, None).feature_importances(&rows, &labels).unwrap();
        assert!(importances[1] > importances[0]);
        assert!(importances[1] > importances[2]);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let (rows, labels) = separable_data();
        let forest = RandomForest::new(10, 7, Some(4));
        let first = forest.feature_importances(&rows, &labels).unwrap();
        let second = forest.feature_importances(&rows, &labels).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn single_class_gives_uniform_importances() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let labels = vec![0, 0, 0];
        let importances = RandomForest::new(5, 42, None).feature_importances(&rows, &labels).unwrap();
        assert_eq!(importances, vec![0.5, 0.5]);
    }

    #[test]
    fn misaligned_labels() {
        let rows = vec![vec![1.0], vec![2.0]];
        let result = RandomForest::new(5, 42, None).feature_importances(&rows, &[0]);
        assert!(matches!(result, Err(PipelineError::InvariantViolation(..))));
    }

    #[test]
    fn empty_rows() {
        let rows: Vec<Vec<f64>> = Vec::new();
        let result = RandomForest::new(5, 42, None).feature_importances(&rows, &[]);
        assert!(matches!(result, Err(PipelineError::DataUnavailable(..))));
    }
}
