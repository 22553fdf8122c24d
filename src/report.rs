//! The numeric outputs handed to presentation collaborators, formatted the way they
//! display them.

use crate::{
    ContingencyRow, DbscanParams, FeatureSelection, ImportanceRanking, PointRole, QualityMetrics,
};
use serde::Serialize;

// Figures of the complete source dataset, reported as-is rather than recomputed from
// the sample.
pub const TOTAL_TRANSACTIONS: usize = 284_807;
pub const FRAUDULENT_TRANSACTIONS: usize = 492;
pub const LEGITIMATE_TRANSACTIONS: usize = 284_315;
pub const FRAUD_PERCENTAGE: &str = "0.172%";

const IMPORTANCE_DECIMALS: usize = 6;
const PERCENTAGE_DECIMALS: usize = 2;
const PURITY_DECIMALS: usize = 10;
const SILHOUETTE_DECIMALS: usize = 17;
const CALINSKI_DECIMALS: usize = 12;

/// Answer of the status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub total_transactions: usize,
    pub fraudulent: usize,
    pub legitimate: usize,
    pub fraud_percentage: String,
}

impl DatasetStats {
    pub fn reference() -> Self {
        Self {
            total_transactions: TOTAL_TRANSACTIONS,
            fraudulent: FRAUDULENT_TRANSACTIONS,
            legitimate: LEGITIMATE_TRANSACTIONS,
            fraud_percentage: FRAUD_PERCENTAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTableRow {
    /// 1-based position in the full ranking.
    pub rank: usize,
    pub feature: String,
    pub importance: String,
    pub percentage: String,
}

/// The allow-listed features among the `top_n` best ranked, keeping their ranks.
pub fn feature_table(ranking: &ImportanceRanking, top_n: usize, allow_list: &[String]) -> Vec<FeatureTableRow> {
    ranking
        .top(top_n)
        .iter()
        .enumerate()
        .filter(|(_, entry)| allow_list.contains(&entry.feature))
        .map(|(idx, entry)| FeatureTableRow {
            rank: idx + 1,
            feature: entry.feature.clone(),
            importance: format!("{:.IMPORTANCE_DECIMALS$}", entry.importance),
            percentage: format!("{:.PERCENTAGE_DECIMALS$}%", entry.importance * 100.0),
        })
        .collect()
}

/// Quality metrics as fixed-precision strings; unavailable metrics read `unavailable`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub purity: String,
    pub silhouette: String,
    pub calinski: String,
}

impl From<&QualityMetrics> for EvaluationSummary {
    fn from(metrics: &QualityMetrics) -> Self {
        Self {
            purity: metrics.purity.format(PURITY_DECIMALS),
            silhouette: metrics.silhouette.format(SILHOUETTE_DECIMALS),
            calinski: metrics.calinski_harabasz.format(CALINSKI_DECIMALS),
        }
    }
}

/// One row of the planar projection, as drawn by the scatter views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
    pub class: u8,
    pub label: i32,
    pub role: PointRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanarView {
    pub features: (String, String),
    pub params: DbscanParams,
    pub points: Vec<PlanarPoint>,
}

/// Composition of the sampled dataset the analysis actually ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleComposition {
    pub total: usize,
    pub fraud: usize,
    pub legitimate: usize,
}

/// Everything a presentation layer reads, computed once per process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisBundle {
    pub features_table: Vec<FeatureTableRow>,
    pub evaluation_metrics: EvaluationSummary,
    pub quality: QualityMetrics,
    pub cluster_analysis: Vec<ContingencyRow>,
    pub selected_features: FeatureSelection,
    pub full_params: DbscanParams,
    pub planar_view: PlanarView,
    pub sample: SampleComposition,
    pub stats: DatasetStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Score;

    fn ranking() -> ImportanceRanking {
        let names: Vec<String> = ["V14", "V3", "V17", "V1", "V16", "V18", "V15"]
            .iter()
            .map(|v| v.to_string())
            .collect();
        ImportanceRanking::from_scores(&names, &[0.3, 0.2, 0.15, 0.12, 0.11, 0.07, 0.05]).unwrap()
    }

    fn allow_list() -> Vec<String> {
        ["V14", "V15", "V16", "V17", "V18"].iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn table_keeps_allow_listed_ranks() {
        let table = feature_table(&ranking(), 6, &allow_list());
        let ranks: Vec<(usize, &str)> = table.iter().map(|r| (r.rank, r.feature.as_str())).collect();
        assert_eq!(ranks, vec![(1, "V14"), (3, "V17"), (5, "V16"), (6, "V18")]);
        assert_eq!("0.300000", table[0].importance);
        assert_eq!("30.00%", table[0].percentage);
    }

    #[test]
    fn table_percentages_descend_and_stay_below_one_hundred() {
        let table = feature_table(&ranking(), 10, &allow_list());
        let percentages: Vec<f64> = table
            .iter()
            .map(|r| r.percentage.trim_end_matches('%').parse().unwrap())
            .collect();
        assert!(percentages.windows(2).all(|w| w[0] > w[1]));
        assert!(percentages.iter().sum::<f64>() <= 100.0);
    }

    #[test]
    fn summary_precision() {
        let metrics = QualityMetrics {
            purity: Score::Available { value: 0.5 },
            silhouette: Score::Available { value: -0.25 },
            calinski_harabasz: Score::Unavailable { reason: String::from("one label") },
        };
        let summary = EvaluationSummary::from(&metrics);
        assert_eq!("0.5000000000", summary.purity);
        assert_eq!("-0.25000000000000000", summary.silhouette);
        assert_eq!("unavailable", summary.calinski);
    }

    #[test]
    fn reference_stats() {
        let stats = DatasetStats::reference();
        assert_eq!(stats.total_transactions, stats.fraudulent + stats.legitimate);
        assert_eq!("0.172%", stats.fraud_percentage);
    }
}
