//! Wires the analysis stages together behind one process-wide result cache.
//!
//! Every stage is computed at most once and then served from the cache. Stages pull the
//! stages they depend on through the same cache, so asking for the bundle first computes
//! everything, while asking for one stage only computes what it needs.

use crate::report::{self, AnalysisBundle, DatasetStats, EvaluationSummary, FeatureTableRow, PlanarPoint, PlanarView, SampleComposition};
use crate::{
    ClusteringResult, ContingencyAnalyzer, ContingencyRow, Dataset, DatasetSampler, Dbscan, DbscanParams,
    FeatureRanker, FeatureSelection, FeatureSelector, ImportanceRanking, PipelineConfig, PipelineError,
    QualityEvaluator, QualityMetrics, ResultCache,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Cache key of every memoized stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Dataset,
    FeatureImportance,
    FeatureSelection,
    FullClustering,
    PlanarClustering,
    QualityMetrics,
    ClusterAnalysis,
    FeatureTable,
    Bundle,
}

/// A clustering together with the projection it ran on.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedClustering {
    pub features: Vec<String>,
    pub points: Vec<Vec<f64>>,
    pub result: ClusteringResult,
}

#[derive(Debug, Clone)]
enum DataSource {
    Csv(PathBuf),
    /// Rows that are already sampled and shuffled.
    Prepared(Dataset),
}

pub struct Pipeline {
    config: PipelineConfig,
    source: DataSource,
    cache: ResultCache<Stage>,
}

impl Pipeline {
    /// A pipeline that samples the CSV file at `path` on first use.
    pub fn new(path: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        Self { config, source: DataSource::Csv(path.into()), cache: ResultCache::new() }
    }

    /// A pipeline over rows that have already been sampled; sampling is skipped.
    pub fn with_dataset(dataset: Dataset, config: PipelineConfig) -> Self {
        Self { config, source: DataSource::Prepared(dataset), cache: ResultCache::new() }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// How many stage computations have been started so far.
    pub fn computations(&self) -> usize {
        self.cache.computations()
    }

    pub fn is_cached(&self, stage: Stage) -> bool {
        self.cache.contains(&stage)
    }

    pub fn dataset(&self) -> Result<Arc<Dataset>, PipelineError> {
        self.cache.get_or_compute(Stage::Dataset, || match &self.source {
            DataSource::Csv(path) => DatasetSampler::new(&self.config).sample_path(path),
            DataSource::Prepared(dataset) => Ok(dataset.clone()),
        })
    }

    pub fn feature_importance(&self) -> Result<Arc<ImportanceRanking>, PipelineError> {
        self.cache.get_or_compute(Stage::FeatureImportance, || {
            let dataset = self.dataset()?;
            FeatureRanker::new(&self.config).rank(&dataset.feature_matrix(), &dataset.labels())
        })
    }

    pub fn selected_features(&self) -> Result<Arc<FeatureSelection>, PipelineError> {
        self.cache.get_or_compute(Stage::FeatureSelection, || {
            let ranking = self.feature_importance()?;
            FeatureSelector::new(&self.config).select(&ranking)
        })
    }

    /// DBSCAN over the top-K projection.
    pub fn full_clustering(&self) -> Result<Arc<ProjectedClustering>, PipelineError> {
        self.cache.get_or_compute(Stage::FullClustering, || {
            let selection = self.selected_features()?;
            self.cluster_projection(&selection.top_k, self.config.full_params)
        })
    }

    /// DBSCAN over the fixed planar pair.
    pub fn planar_clustering(&self) -> Result<Arc<ProjectedClustering>, PipelineError> {
        self.cache.get_or_compute(Stage::PlanarClustering, || {
            let selection = self.selected_features()?;
            self.cluster_projection(&selection.planar_names(), self.config.planar_params)
        })
    }

    /// Scores of the top-K clustering, computed over the top-K projection.
    pub fn quality_metrics(&self) -> Result<Arc<QualityMetrics>, PipelineError> {
        self.cache.get_or_compute(Stage::QualityMetrics, || {
            let dataset = self.dataset()?;
            let clustering = self.full_clustering()?;
            QualityEvaluator::new(&self.config).evaluate(&clustering.points, &clustering.result, &dataset.labels())
        })
    }

    /// Contingency rows of the planar clustering.
    pub fn cluster_analysis(&self) -> Result<Arc<Vec<ContingencyRow>>, PipelineError> {
        self.cache.get_or_compute(Stage::ClusterAnalysis, || {
            let dataset = self.dataset()?;
            let clustering = self.planar_clustering()?;
            ContingencyAnalyzer.analyze(clustering.result.labels(), &dataset.labels())
        })
    }

    pub fn feature_table(&self) -> Result<Arc<Vec<FeatureTableRow>>, PipelineError> {
        self.cache.get_or_compute(Stage::FeatureTable, || {
            let ranking = self.feature_importance()?;
            Ok(report::feature_table(&ranking, self.config.table_top_n, &self.config.table_allow_list))
        })
    }

    pub fn bundle(&self) -> Result<Arc<AnalysisBundle>, PipelineError> {
        self.cache.get_or_compute(Stage::Bundle, || {
            let dataset = self.dataset()?;
            let selection = self.selected_features()?;
            let quality = self.quality_metrics()?;
            let full = self.full_clustering()?;
            let planar = self.planar_clustering()?;

            let points = planar
                .points
                .iter()
                .zip(dataset.records())
                .zip(planar.result.labels().iter().zip(planar.result.roles()))
                .map(|((point, record), (&label, role))| PlanarPoint {
                    x: point[0],
                    y: point[1],
                    class: record.class,
                    label,
                    role,
                })
                .collect();

            info!("Assembling analysis bundle");
            Ok(AnalysisBundle {
                features_table: self.feature_table()?.as_ref().clone(),
                evaluation_metrics: EvaluationSummary::from(quality.as_ref()),
                quality: quality.as_ref().clone(),
                cluster_analysis: self.cluster_analysis()?.as_ref().clone(),
                selected_features: selection.as_ref().clone(),
                full_params: full.result.params(),
                planar_view: PlanarView {
                    features: selection.planar.clone(),
                    params: planar.result.params(),
                    points,
                },
                sample: SampleComposition {
                    total: dataset.len(),
                    fraud: dataset.n_fraud(),
                    legitimate: dataset.n_legitimate(),
                },
                stats: DatasetStats::reference(),
            })
        })
    }

    /// Reference figures of the complete dataset. Never touches the data.
    pub fn stats(&self) -> DatasetStats {
        DatasetStats::reference()
    }

    fn cluster_projection<S: AsRef<str>>(
        &self,
        features: &[S],
        params: DbscanParams,
    ) -> Result<ProjectedClustering, PipelineError> {
        let dataset = self.dataset()?;
        let points = dataset.project(features)?;
        let result = Dbscan::new(&points, params)
            .with_search(self.config.neighbour_search)
            .cluster()?;
        info!(
            features = features.len(),
            clusters = result.n_clusters(),
            noise = result.n_noise(),
            "Clustered projection"
        );
        Ok(ProjectedClustering {
            features: features.iter().map(|f| f.as_ref().to_string()).collect(),
            points,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    fn dataset() -> Dataset {
        let names: Vec<String> = ["V1", "V2", "V3"].iter().map(|v| v.to_string()).collect();
        let records = (0..60)
            .map(|i| {
                let spread = (i % 5) as f64 * 0.01;
                if i % 3 == 0 {
                    Record { features: vec![5.0 + spread, -5.0 - spread, 0.5], class: crate::FRAUD }
                } else {
                    Record { features: vec![-5.0 - spread, 5.0 + spread, 0.5], class: crate::LEGITIMATE }
                }
            })
            .collect();
        Dataset::new(names, records).unwrap()
    }

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .forest_trees(5)
            .top_k(2)
            .planar_features("V1", "V2")
            .full_params(DbscanParams::new(0.5, 3))
            .planar_params(DbscanParams::new(0.5, 3))
            .table_allow_list(["V1", "V2"])
            .build()
            .unwrap()
    }

    #[test]
    fn stages_are_computed_once() {
        let pipeline = Pipeline::with_dataset(dataset(), config());
        let first = pipeline.cluster_analysis().unwrap();
        let computed = pipeline.computations();
        let second = pipeline.cluster_analysis().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(computed, pipeline.computations());
        assert!(pipeline.is_cached(Stage::PlanarClustering));
        assert!(!pipeline.is_cached(Stage::FullClustering));
    }

    #[test]
    fn separated_classes_form_pure_clusters() {
        let pipeline = Pipeline::with_dataset(dataset(), config());
        let rows = pipeline.cluster_analysis().unwrap();
        assert_eq!(
            rows.as_slice(),
            &[
                ContingencyRow { label: 0, total: 20, malicious: 20 },
                ContingencyRow { label: 1, total: 40, malicious: 0 },
            ]
        );
        assert_eq!(Some(1.0), pipeline.quality_metrics().unwrap().purity.value());
    }

    #[test]
    fn bundle_carries_both_runs() {
        let pipeline = Pipeline::with_dataset(dataset(), config());
        let bundle = pipeline.bundle().unwrap();
        assert_eq!(60, bundle.planar_view.points.len());
        assert_eq!(20, bundle.sample.fraud);
        assert_eq!(2, bundle.selected_features.top_k.len());
        assert_eq!(DbscanParams::new(0.5, 3), bundle.full_params);
        assert_eq!(pipeline.stats(), bundle.stats);
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let pipeline = Pipeline::new("does/not/exist.csv", config());
        assert!(matches!(pipeline.bundle(), Err(PipelineError::DataUnavailable(..))));
        assert!(!pipeline.is_cached(Stage::Dataset));
    }
}
