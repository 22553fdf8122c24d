use crate::neighbours::{epsilon_neighbourhoods, NeighbourSearch};
use crate::validation::DataValidator;
use crate::{DbscanParams, PipelineError};
use num_traits::Float;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// Label given to points that belong to no cluster.
pub const NOISE: i32 = -1;

/// How a point takes part in a clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointRole {
    /// At least `min_points` points within `epsilon`.
    Core,
    /// Not core, but within `epsilon` of a core point of its cluster.
    Border,
    Noise,
}

/// The outcome of one DBSCAN run: a label per input row, the rows that are core points and
/// the hyper parameters that produced them. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringResult {
    labels: Vec<i32>,
    core_indices: Vec<usize>,
    params: DbscanParams,
}

impl ClusteringResult {
    /// Cluster labels in input row order. Clusters are numbered from 0 in discovery order,
    /// noise is -1.
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Row indices of the core points, ascending.
    pub fn core_indices(&self) -> &[usize] {
        &self.core_indices
    }

    pub fn params(&self) -> DbscanParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of clusters found, noise excluded.
    pub fn n_clusters(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&label| label != NOISE)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|&&label| label == NOISE).count()
    }

    /// The role of every row, in row order.
    pub fn roles(&self) -> Vec<PointRole> {
        let mut roles: Vec<PointRole> = self
            .labels
            .iter()
            .map(|&label| if label == NOISE { PointRole::Noise } else { PointRole::Border })
            .collect();
        self.core_indices.iter().for_each(|&i| roles[i] = PointRole::Core);
        roles
    }

    /// The core points themselves, taken from the data the clustering ran on.
    pub fn components<'d, T>(&self, data: &'d [Vec<T>]) -> Vec<&'d Vec<T>> {
        self.core_indices.iter().map(|&i| &data[i]).collect()
    }
}

/// Density-Based Spatial Clustering of Applications with Noise, over Euclidean distance.
/// Generic over floating point numeric types.
#[derive(Debug, Clone, PartialEq)]
pub struct Dbscan<'a, T> {
    data: &'a [Vec<T>],
    params: DbscanParams,
    search: NeighbourSearch,
}

impl<'a, T: Float + Send + Sync> Dbscan<'a, T> {
    /// Creates a DBSCAN clustering model.
    ///
    /// # Parameters
    /// * `data` - the points to cluster, all of the same dimensionality with finite
    ///            coordinates.
    /// * `params` - the neighbourhood radius and the minimum neighbourhood size.
    ///
    /// # Examples
    /// ```
    ///use fraudscan::{Dbscan, DbscanParams};
    ///
    ///let data: Vec<Vec<f64>> = vec![
    ///    vec![1.0, 1.0],
    ///    vec![1.1, 1.0],
    ///    vec![1.0, 1.1],
    ///    vec![5.0, 5.0],
    ///];
    ///let clusterer = Dbscan::new(&data, DbscanParams::new(0.2, 3));
    /// ```
    pub fn new(data: &'a [Vec<T>], params: DbscanParams) -> Self {
        Self { data, params, search: NeighbourSearch::Auto }
    }

    /// Sets the neighbourhood search algorithm. Defaults to Auto.
    pub fn with_search(mut self, search: NeighbourSearch) -> Self {
        self.search = search;
        self
    }

    /// Performs clustering on the points passed to the constructor.
    ///
    /// Rows are visited in order; each unlabelled core point starts a new cluster, which
    /// is expanded breadth first through the neighbourhoods of its core points. A border
    /// point reachable from several clusters keeps the first one to reach it.
    ///
    /// # Returns
    /// * A result that, if successful, contains the immutable clustering. Fewer rows than
    ///   `min_points` (an empty input included) make every row noise. An error is returned
    ///   for invalid parameters, mismatched dimensions or non-finite coordinates.
    ///
    /// # Examples
    /// ```
    ///use fraudscan::{Dbscan, DbscanParams};
    ///
    ///let data: Vec<Vec<f64>> = vec![
    ///    vec![1.0, 1.0],
    ///    vec![1.1, 1.0],
    ///    vec![1.0, 1.1],
    ///    vec![5.0, 5.0],
    ///    vec![5.1, 5.0],
    ///    vec![5.0, 5.1],
    ///    vec![9.0, 9.0],
    ///];
    ///let result = Dbscan::new(&data, DbscanParams::new(0.2, 3)).cluster().unwrap();
    ///assert_eq!(result.labels(), &[0, 0, 0, 1, 1, 1, -1]);
    /// ```
    pub fn cluster(&self) -> Result<ClusteringResult, PipelineError> {
        self.params.validate("clustering")?;
        DataValidator::new(self.data).validate_input_data()?;

        let n_samples = self.data.len();
        if n_samples < self.params.min_points {
            debug!(n_samples, min_points = self.params.min_points, "Too few points, all noise");
            return Ok(self.all_noise());
        }

        let epsilon = T::from(self.params.epsilon).ok_or_else(|| {
            PipelineError::Configuration(format!(
                "epsilon {} is not representable",
                self.params.epsilon
            ))
        })?;
        let neighbourhoods = epsilon_neighbourhoods(self.data, epsilon, self.search)?;
        let is_core: Vec<bool> = neighbourhoods
            .iter()
            .map(|hood| hood.len() >= self.params.min_points)
            .collect();
        let labels = self.label_data(&neighbourhoods, &is_core);
        let core_indices = (0..n_samples).filter(|&i| is_core[i]).collect();

        Ok(ClusteringResult { labels, core_indices, params: self.params })
    }

    fn all_noise(&self) -> ClusteringResult {
        ClusteringResult {
            labels: vec![NOISE; self.data.len()],
            core_indices: Vec::new(),
            params: self.params,
        }
    }

    fn label_data(&self, neighbourhoods: &[Vec<usize>], is_core: &[bool]) -> Vec<i32> {
        // Assume all data points are noise by default then label the ones in clusters
        let mut labels = vec![NOISE; neighbourhoods.len()];
        let mut current_cluster_id = 0;

        for seed in 0..neighbourhoods.len() {
            if labels[seed] != NOISE || !is_core[seed] {
                continue;
            }
            labels[seed] = current_cluster_id;
            let mut process_queue = VecDeque::from([seed]);
            while let Some(point) = process_queue.pop_front() {
                for &neighbour in &neighbourhoods[point] {
                    if labels[neighbour] != NOISE {
                        continue;
                    }
                    labels[neighbour] = current_cluster_id;
                    if is_core[neighbour] {
                        process_queue.push_back(neighbour);
                    }
                }
            }
            current_cluster_id += 1;
        }
        labels
    }
}
