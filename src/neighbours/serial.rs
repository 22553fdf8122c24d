use super::{build_kd_tree, query_kd_tree, within};
use crate::PipelineError;
use num_traits::Float;

pub(crate) struct NeighbourhoodCalculator<'a, T> {
    data: &'a [Vec<T>],
    squared_radius: T,
}

impl<'a, T: Float> NeighbourhoodCalculator<'a, T> {
    pub(crate) fn new(data: &'a [Vec<T>], epsilon: T) -> Self {
        Self { data, squared_radius: epsilon * epsilon }
    }

    pub(crate) fn brute_force(&self) -> Vec<Vec<usize>> {
        self.data
            .iter()
            .map(|point| {
                (0..self.data.len())
                    .filter(|&j| within(point, &self.data[j], self.squared_radius))
                    .collect()
            })
            .collect()
    }

    pub(crate) fn kd_tree(&self) -> Result<Vec<Vec<usize>>, PipelineError> {
        let tree = build_kd_tree(self.data)?;
        self.data
            .iter()
            .map(|point| query_kd_tree(&tree, point, self.squared_radius))
            .collect()
    }
}
