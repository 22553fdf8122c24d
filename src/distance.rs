use num_traits::Float;

pub(crate) fn euclidean_distance<T: Float>(a: &[T], b: &[T]) -> T {
    squared_euclidean(a, b).sqrt()
}

/// Used for neighbourhood queries, compared against a squared radius.
pub(crate) fn squared_euclidean<T: Float>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| ((*x) - (*y)) * ((*x) - (*y)))
        .fold(T::zero(), std::ops::Add::add)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_four_five() {
        assert_eq!(5.0, euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]));
        assert_eq!(25.0_f32, squared_euclidean(&[1.0, 1.0], &[4.0, 5.0]));
    }
}
