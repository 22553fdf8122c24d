use num_traits::Float;
use std::collections::BTreeMap;

/// A label's member count and the elementwise mean of its members. The output is not
/// guaranteed to be an observed data point.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Centroid<T> {
    pub(crate) count: usize,
    pub(crate) mean: Vec<T>,
}

/// Centroids of every distinct label, noise (-1) included as an ordinary label.
pub(crate) fn calc_centroids<T: Float>(data: &[Vec<T>], labels: &[i32]) -> BTreeMap<i32, Centroid<T>> {
    assert_eq!(data.len(), labels.len());
    let n_dims = data.first().map_or(0, Vec::len);

    let mut sums: BTreeMap<i32, Centroid<T>> = BTreeMap::new();
    for (datapoint, &label) in data.iter().zip(labels) {
        let entry = sums
            .entry(label)
            .or_insert_with(|| Centroid { count: 0, mean: vec![T::zero(); n_dims] });
        entry.count += 1;
        for (sum, &element) in entry.mean.iter_mut().zip(datapoint) {
            *sum = *sum + element;
        }
    }
    for centroid in sums.values_mut() {
        let count = T::from(centroid.count).unwrap_or_else(T::one);
        centroid.mean.iter_mut().for_each(|element| *element = *element / count);
    }
    sums
}

/// The elementwise mean of all data points.
pub(crate) fn calc_overall_mean<T: Float>(data: &[Vec<T>]) -> Vec<T> {
    let n_dims = data.first().map_or(0, Vec::len);
    let mut mean = vec![T::zero(); n_dims];
    for datapoint in data {
        for (sum, &element) in mean.iter_mut().zip(datapoint) {
            *sum = *sum + element;
        }
    }
    let count = T::from(data.len().max(1)).unwrap_or_else(T::one);
    mean.iter_mut().for_each(|element| *element = *element / count);
    mean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_centroids_per_label() {
        let data: Vec<Vec<f64>> = vec![
            vec![1.0, 1.0],
            vec![3.0, 1.0],
            vec![10.0, 10.0],
            vec![-4.0, 2.0],
        ];
        let labels = vec![0, 0, 1, -1];
        let centroids = calc_centroids(&data, &labels);
        assert_eq!(3, centroids.len());
        assert_eq!(centroids[&0], Centroid { count: 2, mean: vec![2.0, 1.0] });
        assert_eq!(centroids[&1].mean, vec![10.0, 10.0]);
        assert_eq!(centroids[&-1].count, 1);
        assert_eq!(calc_overall_mean(&data), vec![2.5, 3.5]);
    }
}
