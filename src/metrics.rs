//! Scores of a clustering against ground truth (purity) and against its own geometry
//! (silhouette coefficient, Calinski-Harabasz index).
//!
//! Noise (-1) counts as an ordinary cluster label throughout, so "at least two clusters"
//! means at least two distinct labels, noise included.

use crate::centers::{calc_centroids, calc_overall_mean};
use crate::distance::euclidean_distance;
use crate::validation::{validate_aligned, DataValidator};
use crate::{ClusteringResult, PipelineConfig, PipelineError};
use num_traits::Float;
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// A metric value, or the reason it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Score {
    Available { value: f64 },
    Unavailable { reason: String },
}

impl Score {
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Available { value } => Some(*value),
            Score::Unavailable { .. } => None,
        }
    }

    /// Formats the value with a fixed number of decimals, or `unavailable`.
    pub fn format(&self, decimals: usize) -> String {
        match self {
            Score::Available { value } => format!("{value:.decimals$}"),
            Score::Unavailable { .. } => String::from("unavailable"),
        }
    }

    /// Degenerate clusterings become `Unavailable`; every other error propagates.
    fn from_result(metric: &str, result: Result<f64, PipelineError>) -> Result<Self, PipelineError> {
        match result {
            Ok(value) => Ok(Score::Available { value }),
            Err(PipelineError::DegenerateClustering(reason)) => {
                warn!(metric, %reason, "Metric unavailable");
                Ok(Score::Unavailable { reason })
            }
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub purity: Score,
    pub silhouette: Score,
    pub calinski_harabasz: Score,
}

/// Fraction of points whose cluster's majority true label is their own.
///
/// # Returns
/// * A value in `[0, 1]`, 1 exactly when every cluster is label-pure.
pub fn purity_score(truth: &[u8], labels: &[i32]) -> Result<f64, PipelineError> {
    validate_aligned(labels.len(), truth.len(), "true labels")?;
    if labels.is_empty() {
        return Err(PipelineError::DegenerateClustering(String::from(
            "purity of an empty clustering is undefined",
        )));
    }
    let mut contingency: BTreeMap<i32, BTreeMap<u8, usize>> = BTreeMap::new();
    for (&label, &class) in labels.iter().zip(truth) {
        *contingency.entry(label).or_default().entry(class).or_default() += 1;
    }
    let majority: usize = contingency
        .values()
        .map(|counts| counts.values().copied().max().unwrap_or(0))
        .sum();
    Ok(majority as f64 / labels.len() as f64)
}

/// Mean silhouette coefficient over at most `sample_size` points, drawn without
/// replacement with a generator seeded by `seed` when there are more points than that.
///
/// A point alone in its cluster scores 0.
pub fn silhouette_score<T: Float + Send + Sync>(
    data: &[Vec<T>],
    labels: &[i32],
    sample_size: usize,
    seed: u64,
) -> Result<f64, PipelineError> {
    let validator = DataValidator::new(data);
    validator.validate_aligned(labels.len(), "cluster labels")?;
    validator.validate_input_data()?;

    let indices: Vec<usize> = if data.len() > sample_size {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        index::sample(&mut rng, data.len(), sample_size).into_vec()
    } else {
        (0..data.len()).collect()
    };
    let sample: Vec<&Vec<T>> = indices.iter().map(|&i| &data[i]).collect();

    let distinct: BTreeSet<i32> = indices.iter().map(|&i| labels[i]).collect();
    let n_labels = distinct.len();
    if n_labels < 2 || n_labels >= sample.len() {
        return Err(PipelineError::DegenerateClustering(format!(
            "silhouette needs between 2 and {} distinct labels, found {n_labels}",
            sample.len().saturating_sub(1)
        )));
    }
    // Dense ids so per-point sums fit in a vector.
    let dense: BTreeMap<i32, usize> = distinct.iter().enumerate().map(|(id, &l)| (l, id)).collect();
    let sample_labels: Vec<usize> = indices.iter().map(|&i| dense[&labels[i]]).collect();
    let mut counts = vec![0_usize; n_labels];
    sample_labels.iter().for_each(|&l| counts[l] += 1);

    let calculator = SilhouetteCalculator { sample: &sample, labels: &sample_labels, counts: &counts };
    let total = calculator.sum_coefficients();
    Ok(total / sample.len() as f64)
}

struct SilhouetteCalculator<'a, T> {
    sample: &'a [&'a Vec<T>],
    labels: &'a [usize],
    counts: &'a [usize],
}

impl<T: Float + Send + Sync> SilhouetteCalculator<'_, T> {
    #[cfg(not(feature = "parallel"))]
    fn sum_coefficients(&self) -> f64 {
        (0..self.sample.len()).map(|i| self.coefficient(i)).sum()
    }

    #[cfg(feature = "parallel")]
    fn sum_coefficients(&self) -> f64 {
        // Collect first so the summation order, and therefore the result, is fixed.
        let coefficients: Vec<f64> = (0..self.sample.len())
            .into_par_iter()
            .map(|i| self.coefficient(i))
            .collect();
        coefficients.iter().sum()
    }

    fn coefficient(&self, i: usize) -> f64 {
        let own = self.labels[i];
        if self.counts[own] < 2 {
            return 0.0;
        }
        let mut sums = vec![0.0_f64; self.counts.len()];
        for (j, other) in self.sample.iter().enumerate() {
            if i != j {
                let dist = euclidean_distance(self.sample[i], other).to_f64().unwrap_or(f64::NAN);
                sums[self.labels[j]] += dist;
            }
        }
        let a = sums[own] / (self.counts[own] - 1) as f64;
        let b = sums
            .iter()
            .zip(self.counts)
            .enumerate()
            .filter(|(label, _)| *label != own)
            .map(|(_, (sum, &count))| sum / count as f64)
            .fold(f64::INFINITY, f64::min);
        let denominator = a.max(b);
        if denominator > 0.0 {
            (b - a) / denominator
        } else {
            0.0
        }
    }
}

/// Ratio of between-cluster dispersion to within-cluster dispersion, each scaled by its
/// degrees of freedom. Equals 1 when every cluster collapses to a single point.
pub fn calinski_harabasz_score<T: Float>(data: &[Vec<T>], labels: &[i32]) -> Result<f64, PipelineError> {
    let validator = DataValidator::new(data);
    validator.validate_aligned(labels.len(), "cluster labels")?;
    validator.validate_input_data()?;

    let n_samples = data.len();
    let centroids = calc_centroids(data, labels);
    let n_labels = centroids.len();
    if n_labels < 2 || n_labels >= n_samples {
        return Err(PipelineError::DegenerateClustering(format!(
            "Calinski-Harabasz needs between 2 and {} distinct labels, found {n_labels}",
            n_samples.saturating_sub(1)
        )));
    }

    let mean = calc_overall_mean(data);
    let squared = |a: &[T], b: &[T]| {
        crate::distance::squared_euclidean(a, b).to_f64().unwrap_or(f64::NAN)
    };
    let extra_dispersion: f64 = centroids
        .values()
        .map(|c| c.count as f64 * squared(c.mean.as_slice(), mean.as_slice()))
        .sum();
    let intra_dispersion: f64 = data
        .iter()
        .zip(labels)
        .map(|(datapoint, label)| squared(datapoint.as_slice(), centroids[label].mean.as_slice()))
        .sum();

    if intra_dispersion == 0.0 {
        return Ok(1.0);
    }
    Ok(extra_dispersion * (n_samples - n_labels) as f64
        / (intra_dispersion * (n_labels - 1) as f64))
}

/// Scores one clustering. Purity, silhouette and Calinski-Harabasz are computed over the
/// same projection the clustering ran on.
#[derive(Debug, Clone)]
pub struct QualityEvaluator {
    silhouette_sample_size: usize,
    silhouette_seed: u64,
}

impl QualityEvaluator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            silhouette_sample_size: config.silhouette_sample_size,
            silhouette_seed: config.silhouette_seed,
        }
    }

    /// # Returns
    /// * The three scores. A degenerate clustering marks the affected scores unavailable
    ///   rather than failing; misaligned inputs are an `InvariantViolation`.
    pub fn evaluate<T: Float + Send + Sync>(
        &self,
        data: &[Vec<T>],
        clustering: &ClusteringResult,
        truth: &[u8],
    ) -> Result<QualityMetrics, PipelineError> {
        let labels = clustering.labels();
        validate_aligned(data.len(), labels.len(), "cluster labels")?;
        validate_aligned(data.len(), truth.len(), "true labels")?;
        info!(rows = data.len(), clusters = clustering.n_clusters(), "Scoring clustering");

        let purity = Score::from_result("purity", purity_score(truth, labels))?;
        let silhouette = Score::from_result(
            "silhouette",
            silhouette_score(data, labels, self.silhouette_sample_size, self.silhouette_seed),
        )?;
        let calinski_harabasz =
            Score::from_result("calinski_harabasz", calinski_harabasz_score(data, labels))?;
        Ok(QualityMetrics { purity, silhouette, calinski_harabasz })
    }
}
