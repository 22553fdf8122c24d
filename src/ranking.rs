use crate::forest::RandomForest;
use crate::{FeatureMatrix, PipelineConfig, PipelineError};
use serde::Serialize;
use tracing::info;

/// One feature and its share of the forest's total impurity decrease.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Features ordered by descending importance. Importances are non-negative and sum to one;
/// ties keep the column order of the feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportanceRanking {
    entries: Vec<FeatureImportance>,
}

impl ImportanceRanking {
    /// Ranks `importances`, given in the column order of `names`.
    pub fn from_scores(names: &[String], importances: &[f64]) -> Result<Self, PipelineError> {
        crate::validation::validate_aligned(names.len(), importances.len(), "importances")?;
        let mut entries: Vec<FeatureImportance> = names
            .iter()
            .zip(importances)
            .map(|(feature, &importance)| FeatureImportance { feature: feature.clone(), importance })
            .collect();
        // Stable, so equal scores keep their column order.
        entries.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[FeatureImportance] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self, n: usize) -> &[FeatureImportance] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn importance_of(&self, feature: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.feature == feature)
            .map(|e| e.importance)
    }
}

/// Ranks features by how well a tree ensemble predicts the label from them. The label is
/// used here only to choose features, never handed to the clustering.
#[derive(Debug, Clone)]
pub struct FeatureRanker {
    forest: RandomForest,
}

impl FeatureRanker {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            forest: RandomForest::new(config.forest_trees, config.forest_seed, config.forest_max_depth),
        }
    }

    pub fn rank(&self, matrix: &FeatureMatrix, labels: &[u8]) -> Result<ImportanceRanking, PipelineError> {
        info!(rows = matrix.rows.len(), features = matrix.names.len(), "Ranking features");
        let importances = self.forest.feature_importances(&matrix.rows, labels)?;
        let ranking = ImportanceRanking::from_scores(&matrix.names, &importances)?;
        if let Some(best) = ranking.entries().first() {
            info!(feature = %best.feature, importance = best.importance, "Features ranked");
        }
        Ok(ranking)
    }
}
