use crate::{ImportanceRanking, PipelineConfig, PipelineError};
use serde::Serialize;

/// The feature sets the two clustering runs project onto.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSelection {
    /// The `k` best ranked features, best first.
    pub top_k: Vec<String>,
    /// A fixed pair, independent of the ranking.
    pub planar: (String, String),
}

impl FeatureSelection {
    pub fn planar_names(&self) -> [&str; 2] {
        [&self.planar.0, &self.planar.1]
    }
}

#[derive(Debug, Clone)]
pub struct FeatureSelector {
    k: usize,
    planar: (String, String),
}

impl FeatureSelector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self { k: config.top_k, planar: config.planar_features.clone() }
    }

    /// # Returns
    /// * The selection, or a `Configuration` error if `k` exceeds the ranked feature count
    ///   or a planar feature is not among the ranked features.
    pub fn select(&self, ranking: &ImportanceRanking) -> Result<FeatureSelection, PipelineError> {
        if self.k > ranking.len() {
            return Err(PipelineError::Configuration(format!(
                "top_k ({}) exceeds the {} available features",
                self.k,
                ranking.len()
            )));
        }
        for name in [&self.planar.0, &self.planar.1] {
            if ranking.importance_of(name).is_none() {
                return Err(PipelineError::Configuration(format!(
                    "planar feature {name} is not a feature column"
                )));
            }
        }
        Ok(FeatureSelection {
            top_k: ranking.top(self.k).iter().map(|e| e.feature.clone()).collect(),
            planar: self.planar.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking() -> ImportanceRanking {
        let names: Vec<String> = ["V1", "V10", "V14", "V3"].iter().map(|v| v.to_string()).collect();
        ImportanceRanking::from_scores(&names, &[0.1, 0.2, 0.4, 0.3]).unwrap()
    }

    #[test]
    fn selects_top_k_and_fixed_pair() {
        let config = PipelineConfig::builder().top_k(2).build().unwrap();
        let selection = FeatureSelector::new(&config).select(&ranking()).unwrap();
        assert_eq!(selection.top_k, vec!["V14".to_string(), "V3".to_string()]);
        assert_eq!(selection.planar_names(), ["V10", "V14"]);
    }

    #[test]
    fn k_larger_than_feature_count() {
        let config = PipelineConfig::builder().top_k(5).build().unwrap();
        let result = FeatureSelector::new(&config).select(&ranking());
        assert!(matches!(result, Err(PipelineError::Configuration(..))));
    }

    #[test]
    fn unknown_planar_feature() {
        let config = PipelineConfig::builder()
            .top_k(2)
            .planar_features("V10", "V99")
            .build()
            .unwrap();
        let result = FeatureSelector::new(&config).select(&ranking());
        assert!(matches!(result, Err(PipelineError::Configuration(..))));
    }
}
