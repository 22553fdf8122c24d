use crate::PipelineError;
use num_traits::Float;
use serde::Serialize;

#[cfg(feature = "parallel")]
pub(super) mod parallel;
#[cfg(not(feature = "parallel"))]
pub(super) mod serial;

// Under this many points, Auto computes every pairwise distance.
const BRUTE_FORCE_N_SAMPLES_LIMIT: usize = 2000;

/// The ε-neighbourhood search options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NeighbourSearch {
    /// Chosen internally based on the number of points
    Auto,
    /// Computes the distance between each point and all others
    BruteForce,
    /// K-dimensional tree range queries.
    KdTree,
}

/// Every point's ε-neighbourhood: indices, ascending, of all points within Euclidean
/// distance `epsilon`, the point itself included.
pub(crate) fn epsilon_neighbourhoods<T: Float + Send + Sync>(
    data: &[Vec<T>],
    epsilon: T,
    search: NeighbourSearch,
) -> Result<Vec<Vec<usize>>, PipelineError> {
    #[cfg(feature = "parallel")]
    let calculator = parallel::NeighbourhoodCalculatorPar::new(data, epsilon);
    #[cfg(not(feature = "parallel"))]
    let calculator = serial::NeighbourhoodCalculator::new(data, epsilon);

    let n_dims = data.first().map_or(0, Vec::len);
    match (search, data.len(), n_dims) {
        (_, 0, _) => Ok(Vec::new()),
        (_, _, 0) => Ok(calculator.brute_force()),
        (NeighbourSearch::Auto, 0..=BRUTE_FORCE_N_SAMPLES_LIMIT, _) => Ok(calculator.brute_force()),
        (NeighbourSearch::Auto, _, _) => calculator.kd_tree(),
        (NeighbourSearch::BruteForce, _, _) => Ok(calculator.brute_force()),
        (NeighbourSearch::KdTree, _, _) => calculator.kd_tree(),
    }
}

fn within<T: Float>(a: &[T], b: &[T], squared_radius: T) -> bool {
    crate::distance::squared_euclidean(a, b) <= squared_radius
}

fn build_kd_tree<T: Float>(data: &[Vec<T>]) -> Result<kdtree::KdTree<T, usize, &Vec<T>>, PipelineError> {
    let mut tree = kdtree::KdTree::new(data[0].len());
    for (n, datapoint) in data.iter().enumerate() {
        tree.add(datapoint, n).map_err(|err| {
            PipelineError::InvariantViolation(format!("cannot index {n}th point: {err:?}"))
        })?;
    }
    Ok(tree)
}

fn query_kd_tree<T: Float>(
    tree: &kdtree::KdTree<T, usize, &Vec<T>>,
    point: &[T],
    squared_radius: T,
) -> Result<Vec<usize>, PipelineError> {
    let found = tree
        .within(point, squared_radius, &crate::distance::squared_euclidean::<T>)
        .map_err(|err| PipelineError::InvariantViolation(format!("range query failed: {err:?}")))?;
    let mut indices: Vec<usize> = found.into_iter().map(|(_dist, &idx)| idx).collect();
    indices.sort_unstable();
    Ok(indices)
}
