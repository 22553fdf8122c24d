use crate::neighbours::NeighbourSearch;
use crate::PipelineError;
use serde::Serialize;

// Defaults for parameters
const LEGITIMATE_SAMPLE_SIZE_DEFAULT: usize = 5000;
const SAMPLE_SEED_DEFAULT: u64 = 42;
const LABEL_COLUMN_DEFAULT: &str = "Class";
const DROPPED_COLUMNS_DEFAULT: [&str; 2] = ["Time", "Amount"];
const FOREST_TREES_DEFAULT: usize = 50;
const FOREST_SEED_DEFAULT: u64 = 42;
const TOP_K_DEFAULT: usize = 7;
const PLANAR_FEATURES_DEFAULT: (&str, &str) = ("V10", "V14");
const FULL_EPSILON_DEFAULT: f64 = 0.70;
const FULL_MIN_POINTS_DEFAULT: usize = 25;
const PLANAR_EPSILON_DEFAULT: f64 = 0.15;
const PLANAR_MIN_POINTS_DEFAULT: usize = 13;
const SILHOUETTE_SAMPLE_SIZE_DEFAULT: usize = 10_000;
const SILHOUETTE_SEED_DEFAULT: u64 = 42;
const TABLE_TOP_N_DEFAULT: usize = 10;
const TABLE_ALLOW_LIST_DEFAULT: [&str; 5] = ["V14", "V15", "V16", "V17", "V18"];
const NEIGHBOUR_SEARCH_DEFAULT: NeighbourSearch = NeighbourSearch::Auto;

// Valid minimums of parameters
const MIN_POINTS_MINIMUM: usize = 1;
const SILHOUETTE_SAMPLE_SIZE_MINIMUM: usize = 2;

/// The two hyper parameters of one density-based clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DbscanParams {
    /// Neighbourhood radius, Euclidean.
    pub epsilon: f64,
    /// Points (the point itself included) required within `epsilon` to be a core point.
    pub min_points: usize,
}

impl DbscanParams {
    pub fn new(epsilon: f64, min_points: usize) -> Self {
        Self { epsilon, min_points }
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), PipelineError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(PipelineError::Configuration(format!(
                "{name} epsilon must be a positive finite number, got {}",
                self.epsilon
            )));
        }
        if self.min_points < MIN_POINTS_MINIMUM {
            return Err(PipelineError::Configuration(format!(
                "{name} min_points ({}) cannot be lower than {MIN_POINTS_MINIMUM}",
                self.min_points
            )));
        }
        Ok(())
    }
}

/// Every tunable constant of the analysis pipeline. Construct through
/// `PipelineConfig::builder()`, or take `PipelineConfig::default()` for the
/// reference configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub(crate) legitimate_sample_size: usize,
    pub(crate) sample_seed: u64,
    pub(crate) label_column: String,
    pub(crate) dropped_columns: Vec<String>,
    pub(crate) forest_trees: usize,
    pub(crate) forest_seed: u64,
    pub(crate) forest_max_depth: Option<usize>,
    pub(crate) top_k: usize,
    pub(crate) planar_features: (String, String),
    pub(crate) full_params: DbscanParams,
    pub(crate) planar_params: DbscanParams,
    pub(crate) silhouette_sample_size: usize,
    pub(crate) silhouette_seed: u64,
    pub(crate) table_top_n: usize,
    pub(crate) table_allow_list: Vec<String>,
    pub(crate) neighbour_search: NeighbourSearch,
}

/// Builder object to set a custom pipeline configuration.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    legitimate_sample_size: Option<usize>,
    sample_seed: Option<u64>,
    label_column: Option<String>,
    dropped_columns: Option<Vec<String>>,
    forest_trees: Option<usize>,
    forest_seed: Option<u64>,
    forest_max_depth: Option<usize>,
    top_k: Option<usize>,
    planar_features: Option<(String, String)>,
    full_params: Option<DbscanParams>,
    planar_params: Option<DbscanParams>,
    silhouette_sample_size: Option<usize>,
    silhouette_seed: Option<u64>,
    table_top_n: Option<usize>,
    table_allow_list: Option<Vec<String>>,
    neighbour_search: Option<NeighbourSearch>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder()
            .build()
            .unwrap_or_else(|_| unreachable!("default configuration is valid"))
    }
}

impl PipelineConfig {
    /// Enters the builder pattern, allowing custom parameters to be set using
    /// various setter methods.
    ///
    /// # Returns
    /// * the pipeline configuration builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn legitimate_sample_size(&self) -> usize {
        self.legitimate_sample_size
    }

    pub fn sample_seed(&self) -> u64 {
        self.sample_seed
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped_columns
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn planar_features(&self) -> (&str, &str) {
        (&self.planar_features.0, &self.planar_features.1)
    }

    pub fn full_params(&self) -> DbscanParams {
        self.full_params
    }

    pub fn planar_params(&self) -> DbscanParams {
        self.planar_params
    }

    pub fn neighbour_search(&self) -> NeighbourSearch {
        self.neighbour_search
    }
}

impl PipelineConfigBuilder {
    /// Sets how many legitimate rows are drawn from the source. Every fraudulent row is
    /// always kept. Defaults to 5000.
    pub fn legitimate_sample_size(mut self, size: usize) -> Self {
        self.legitimate_sample_size = Some(size);
        self
    }

    /// Sets the seed of the legitimate-row sample and of the final shuffle. Defaults to 42.
    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Sets the name of the binary target column. Defaults to `Class`.
    pub fn label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    /// Sets the non-predictive columns removed before modelling. Defaults to `Time` and
    /// `Amount`.
    pub fn dropped_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dropped_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the number of trees used to rank features. Defaults to 50.
    pub fn forest_trees(mut self, trees: usize) -> Self {
        self.forest_trees = Some(trees);
        self
    }

    pub fn forest_seed(mut self, seed: u64) -> Self {
        self.forest_seed = Some(seed);
        self
    }

    /// Caps the depth of each ranking tree. By default trees grow until their leaves are pure.
    pub fn forest_max_depth(mut self, depth: usize) -> Self {
        self.forest_max_depth = Some(depth);
        self
    }

    /// Sets how many of the best ranked features feed the high-dimensional clustering.
    /// Defaults to 7.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Sets the fixed feature pair used by the planar clustering and every 2-D view.
    /// Defaults to (`V10`, `V14`).
    pub fn planar_features(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.planar_features = Some((x.into(), y.into()));
        self
    }

    /// Defaults to epsilon 0.70 and 25 min points.
    pub fn full_params(mut self, params: DbscanParams) -> Self {
        self.full_params = Some(params);
        self
    }

    /// Defaults to epsilon 0.15 and 13 min points.
    pub fn planar_params(mut self, params: DbscanParams) -> Self {
        self.planar_params = Some(params);
        self
    }

    /// Sets the upper bound of points the silhouette coefficient is averaged over.
    /// Defaults to 10000.
    pub fn silhouette_sample_size(mut self, size: usize) -> Self {
        self.silhouette_sample_size = Some(size);
        self
    }

    pub fn silhouette_seed(mut self, seed: u64) -> Self {
        self.silhouette_seed = Some(seed);
        self
    }

    /// Sets how many top ranked features are considered for the importance table.
    pub fn table_top_n(mut self, n: usize) -> Self {
        self.table_top_n = Some(n);
        self
    }

    /// Sets the feature names allowed to surface in the importance table.
    pub fn table_allow_list<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_allow_list = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the neighbourhood search used by both clustering runs. The primary reason
    /// for changing this is performance: brute force computes every pairwise distance,
    /// which scales poorly on large projections. Defaults to Auto.
    pub fn neighbour_search(mut self, search: NeighbourSearch) -> Self {
        self.neighbour_search = Some(search);
        self
    }

    /// Finishes the building of the configuration, validating every field.
    ///
    /// # Returns
    /// * The completed configuration, or a `Configuration` error naming the bad field.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let config = PipelineConfig {
            legitimate_sample_size: self
                .legitimate_sample_size
                .unwrap_or(LEGITIMATE_SAMPLE_SIZE_DEFAULT),
            sample_seed: self.sample_seed.unwrap_or(SAMPLE_SEED_DEFAULT),
            label_column: self
                .label_column
                .unwrap_or_else(|| LABEL_COLUMN_DEFAULT.to_string()),
            dropped_columns: self
                .dropped_columns
                .unwrap_or_else(|| to_strings(&DROPPED_COLUMNS_DEFAULT)),
            forest_trees: self.forest_trees.unwrap_or(FOREST_TREES_DEFAULT),
            forest_seed: self.forest_seed.unwrap_or(FOREST_SEED_DEFAULT),
            forest_max_depth: self.forest_max_depth,
            top_k: self.top_k.unwrap_or(TOP_K_DEFAULT),
            planar_features: self.planar_features.unwrap_or_else(|| {
                (
                    PLANAR_FEATURES_DEFAULT.0.to_string(),
                    PLANAR_FEATURES_DEFAULT.1.to_string(),
                )
            }),
            full_params: self.full_params.unwrap_or(DbscanParams::new(
                FULL_EPSILON_DEFAULT,
                FULL_MIN_POINTS_DEFAULT,
            )),
            planar_params: self.planar_params.unwrap_or(DbscanParams::new(
                PLANAR_EPSILON_DEFAULT,
                PLANAR_MIN_POINTS_DEFAULT,
            )),
            silhouette_sample_size: self
                .silhouette_sample_size
                .unwrap_or(SILHOUETTE_SAMPLE_SIZE_DEFAULT),
            silhouette_seed: self.silhouette_seed.unwrap_or(SILHOUETTE_SEED_DEFAULT),
            table_top_n: self.table_top_n.unwrap_or(TABLE_TOP_N_DEFAULT),
            table_allow_list: self
                .table_allow_list
                .unwrap_or_else(|| to_strings(&TABLE_ALLOW_LIST_DEFAULT)),
            neighbour_search: self.neighbour_search.unwrap_or(NEIGHBOUR_SEARCH_DEFAULT),
        };
        config.validate()?;
        Ok(config)
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        validate_left_bound(self.legitimate_sample_size, 1, "legitimate_sample_size")?;
        validate_left_bound(self.forest_trees, 1, "forest_trees")?;
        validate_left_bound(self.top_k, 1, "top_k")?;
        validate_left_bound(
            self.silhouette_sample_size,
            SILHOUETTE_SAMPLE_SIZE_MINIMUM,
            "silhouette_sample_size",
        )?;
        if let Some(depth) = self.forest_max_depth {
            validate_left_bound(depth, 1, "forest_max_depth")?;
        }
        self.full_params.validate("full clustering")?;
        self.planar_params.validate("planar clustering")?;
        if self.planar_features.0 == self.planar_features.1 {
            return Err(PipelineError::Configuration(format!(
                "planar features must be distinct, got {} twice",
                self.planar_features.0
            )));
        }
        if self.dropped_columns.contains(&self.label_column) {
            return Err(PipelineError::Configuration(format!(
                "label column {} cannot also be dropped",
                self.label_column
            )));
        }
        Ok(())
    }
}

fn validate_left_bound(input: usize, left_bound: usize, param: &str) -> Result<(), PipelineError> {
    if input < left_bound {
        Err(PipelineError::Configuration(format!(
            "{param} ({input}) cannot be lower than {left_bound}"
        )))
    } else {
        Ok(())
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
