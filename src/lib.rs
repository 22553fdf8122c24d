//! Unsupervised, density-based analysis of labelled card transactions in Rust.
//!
//! Transactions are sampled so that fraud is far less rare than in the raw data, their
//! features are ranked by random forest importance, and DBSCAN is run twice: once over the
//! top ranked features and once over a fixed pair of features suited to plotting. The
//! clusterings are then scored against the true labels with purity, silhouette and
//! Calinski-Harabasz, and cross-tabulated against them per cluster.
//!
//! Every stage sits behind a process-wide, single-flight [`ResultCache`], so concurrent
//! readers of the [`Pipeline`] share one computation per stage.
//!
//! # Examples
//! ```
//!use fraudscan::{Dbscan, DbscanParams};
//!
//!let data: Vec<Vec<f64>> = vec![
//!    vec![1.0, 1.0],
//!    vec![1.1, 1.0],
//!    vec![1.0, 1.1],
//!    vec![4.0, 4.0],
//!    vec![4.1, 4.0],
//!    vec![4.0, 4.1],
//!    vec![9.0, 9.0],
//!];
//!let result = Dbscan::new(&data, DbscanParams::new(0.2, 3)).cluster().unwrap();
//!assert_eq!(result.labels(), &[0, 0, 0, 1, 1, 1, -1]);
//! ```
//!
//! # References
//! * [Ester, M.; Kriegel, H.-P.; Sander, J.; Xu, X. A density-based algorithm for discovering clusters in large spatial databases with noise.](https://dl.acm.org/doi/10.5555/3001460.3001507)
//! * [Breiman, L. Random Forests.](https://link.springer.com/article/10.1023/A:1010933404324)

pub use crate::cache::ResultCache;
pub use crate::config::{DbscanParams, PipelineConfig, PipelineConfigBuilder};
pub use crate::contingency::{ContingencyAnalyzer, ContingencyRow};
pub use crate::dataset::{Dataset, DatasetSampler, FeatureMatrix, Record, FRAUD, LEGITIMATE};
pub use crate::dbscan::{ClusteringResult, Dbscan, PointRole, NOISE};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::metrics::{
    calinski_harabasz_score, purity_score, silhouette_score, QualityEvaluator, QualityMetrics, Score,
};
pub use crate::neighbours::NeighbourSearch;
pub use crate::pipeline::{Pipeline, ProjectedClustering, Stage};
pub use crate::ranking::{FeatureImportance, FeatureRanker, ImportanceRanking};
pub use crate::report::{
    AnalysisBundle, DatasetStats, EvaluationSummary, FeatureTableRow, PlanarPoint, PlanarView,
    SampleComposition,
};
pub use crate::selection::{FeatureSelection, FeatureSelector};

mod cache;
mod centers;
mod config;
mod contingency;
mod dataset;
mod dbscan;
mod distance;
mod error;
mod forest;
mod metrics;
mod neighbours;
mod pipeline;
mod ranking;
pub mod report;
mod selection;
mod validation;
