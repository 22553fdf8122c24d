use crate::PipelineError;
use num_traits::Float;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataValidator<'a, T> {
    data: &'a [Vec<T>],
}

impl<'a, T: Float> DataValidator<'a, T> {
    pub(crate) fn new(data: &'a [Vec<T>]) -> Self {
        Self { data }
    }

    /// Every row must have the dimensionality of the first and contain only finite values.
    /// An empty input is valid here; callers decide what empty means for them.
    pub(crate) fn validate_input_data(&self) -> Result<(), PipelineError> {
        let Some(first) = self.data.first() else {
            return Ok(());
        };
        let dims_0th = first.len();
        for (n, datapoint) in self.data.iter().enumerate() {
            if datapoint.iter().any(|element| !element.is_finite()) {
                return Err(PipelineError::DataUnavailable(format!(
                    "{n}th vector contains non-finite element(s)"
                )));
            }
            let dims_nth = datapoint.len();
            if dims_nth != dims_0th {
                return Err(PipelineError::InvariantViolation(format!(
                    "0th data point has {dims_0th} dimensions, but {n}th has {dims_nth}"
                )));
            }
        }
        Ok(())
    }

    /// The rows and their per-row companion (labels, cluster assignments) must line up.
    pub(crate) fn validate_aligned(&self, n_other: usize, other: &str) -> Result<(), PipelineError> {
        validate_aligned(self.data.len(), n_other, other)
    }
}

pub(crate) fn validate_aligned(n_rows: usize, n_other: usize, other: &str) -> Result<(), PipelineError> {
    if n_rows != n_other {
        return Err(PipelineError::InvariantViolation(format!(
            "{n_rows} rows but {n_other} {other}"
        )));
    }
    Ok(())
}
