#![cfg(feature = "parallel")]
use super::{build_kd_tree, query_kd_tree, within};
use crate::PipelineError;
use num_traits::Float;
use rayon::prelude::*;

pub(crate) struct NeighbourhoodCalculatorPar<'a, T> {
    data: &'a [Vec<T>],
    squared_radius: T,
}

impl<'a, T: Float + Send + Sync> NeighbourhoodCalculatorPar<'a, T> {
    pub(crate) fn new(data: &'a [Vec<T>], epsilon: T) -> Self {
        Self { data, squared_radius: epsilon * epsilon }
    }

    pub(crate) fn brute_force(&self) -> Vec<Vec<usize>> {
        let chunk_size = (self.data.len() / rayon::current_num_threads()).max(100);
        self.data
            .par_chunks(chunk_size)
            .flat_map(|chunk| {
                chunk
                    .iter()
                    .map(|point| {
                        (0..self.data.len())
                            .filter(|&j| within(point, &self.data[j], self.squared_radius))
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub(crate) fn kd_tree(&self) -> Result<Vec<Vec<usize>>, PipelineError> {
        let tree = build_kd_tree(self.data)?;
        self.data
            .par_iter()
            .map(|point| query_kd_tree(&tree, point, self.squared_radius))
            .collect()
    }
}
