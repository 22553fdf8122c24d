use crate::validation::validate_aligned;
use crate::PipelineError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Members of one cluster label, and how many of them are fraudulent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContingencyRow {
    pub label: i32,
    pub total: usize,
    pub malicious: usize,
}

/// Cross-tabulates cluster assignment against the true label.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContingencyAnalyzer;

impl ContingencyAnalyzer {
    /// # Returns
    /// * One row per distinct cluster label, ascending, so noise (-1) comes first. The
    ///   totals sum to the number of rows. Labels and truth of different lengths are an
    ///   `InvariantViolation`.
    pub fn analyze(&self, labels: &[i32], truth: &[u8]) -> Result<Vec<ContingencyRow>, PipelineError> {
        validate_aligned(labels.len(), truth.len(), "true labels")?;
        let mut rows: BTreeMap<i32, ContingencyRow> = BTreeMap::new();
        for (&label, &class) in labels.iter().zip(truth) {
            let row = rows
                .entry(label)
                .or_insert(ContingencyRow { label, total: 0, malicious: 0 });
            row.total += 1;
            if class == crate::FRAUD {
                row.malicious += 1;
            }
        }
        Ok(rows.into_values().collect())
    }
}
