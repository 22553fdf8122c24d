use crate::{PipelineConfig, PipelineError};
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Label value marking a fraudulent transaction.
pub const FRAUD: u8 = 1;
/// Label value marking a legitimate transaction.
pub const LEGITIMATE: u8 = 0;

/// One transaction: its predictive feature values, in column order, and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub features: Vec<f64>,
    pub class: u8,
}

impl Record {
    pub fn is_fraud(&self) -> bool {
        self.class == FRAUD
    }
}

/// The sampled, shuffled transactions the whole pipeline is computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    records: Vec<Record>,
}

/// The numeric inputs of a dataset, one row per record, in dataset order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn new(feature_names: Vec<String>, records: Vec<Record>) -> Result<Self, PipelineError> {
        let n_features = feature_names.len();
        if let Some((n, record)) = records
            .iter()
            .enumerate()
            .find(|(_, record)| record.features.len() != n_features)
        {
            return Err(PipelineError::InvariantViolation(format!(
                "{n}th record has {} features but the dataset has {n_features} columns",
                record.features.len()
            )));
        }
        Ok(Self { feature_names, records })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn n_fraud(&self) -> usize {
        self.records.iter().filter(|r| r.is_fraud()).count()
    }

    pub fn n_legitimate(&self) -> usize {
        self.len() - self.n_fraud()
    }

    pub fn feature_matrix(&self) -> FeatureMatrix {
        FeatureMatrix {
            names: self.feature_names.clone(),
            rows: self.records.iter().map(|r| r.features.clone()).collect(),
        }
    }

    pub fn labels(&self) -> Vec<u8> {
        self.records.iter().map(|r| r.class).collect()
    }

    /// Projects every record onto the named features, in the order given.
    ///
    /// # Returns
    /// * One row per record, or a `Configuration` error if a name is not a feature column.
    pub fn project<S: AsRef<str>>(&self, features: &[S]) -> Result<Vec<Vec<f64>>, PipelineError> {
        let columns = features
            .iter()
            .map(|name| self.column_index(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .records
            .iter()
            .map(|r| columns.iter().map(|&c| r.features[c]).collect())
            .collect())
    }

    fn column_index(&self, name: &str) -> Result<usize, PipelineError> {
        self.feature_names
            .iter()
            .position(|f| f == name)
            .ok_or_else(|| PipelineError::Configuration(format!("unknown feature column {name}")))
    }
}

/// Loads raw transactions and reduces them to a deterministic, class-balanced sample:
/// all fraudulent rows plus a seeded random subset of legitimate rows, shuffled.
#[derive(Debug, Clone)]
pub struct DatasetSampler {
    legitimate_sample_size: usize,
    seed: u64,
    label_column: String,
    dropped_columns: Vec<String>,
}

impl DatasetSampler {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            legitimate_sample_size: config.legitimate_sample_size,
            seed: config.sample_seed,
            label_column: config.label_column.clone(),
            dropped_columns: config.dropped_columns.clone(),
        }
    }

    /// Reads a CSV file with a header row and samples it.
    pub fn sample_path(&self, path: &Path) -> Result<Dataset, PipelineError> {
        info!(path = %path.display(), "Loading transactions");
        let file = File::open(path).map_err(|err| {
            PipelineError::DataUnavailable(format!("cannot open {}: {err}", path.display()))
        })?;
        self.sample_reader(file)
    }

    /// Reads CSV content with a header row and samples it.
    pub fn sample_reader<R: Read>(&self, reader: R) -> Result<Dataset, PipelineError> {
        let source = self.read_source(reader)?;
        self.sample(source)
    }

    fn read_source<R: Read>(&self, reader: R) -> Result<Dataset, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let label_idx = find_column(&headers, &self.label_column)?;
        let dropped = self
            .dropped_columns
            .iter()
            .map(|name| find_column(&headers, name))
            .collect::<Result<Vec<_>, _>>()?;
        let feature_idx: Vec<usize> = (0..headers.len())
            .filter(|i| *i != label_idx && !dropped.contains(i))
            .collect();
        let feature_names = feature_idx.iter().map(|&i| headers[i].to_string()).collect();

        let mut records = Vec::new();
        for (n, row) in reader.records().enumerate() {
            let row = row?;
            let features = feature_idx
                .iter()
                .map(|&i| parse_field(&row, i, n, &headers))
                .collect::<Result<Vec<_>, _>>()?;
            let class = match parse_field(&row, label_idx, n, &headers)? {
                v if v == f64::from(FRAUD) => FRAUD,
                v if v == f64::from(LEGITIMATE) => LEGITIMATE,
                v => {
                    return Err(PipelineError::DataUnavailable(format!(
                        "row {n}: label {} must be 0 or 1, got {v}",
                        self.label_column
                    )))
                }
            };
            records.push(Record { features, class });
        }
        debug!(rows = records.len(), "Source read");
        Dataset::new(feature_names, records)
    }

    /// Keeps every fraudulent record, draws the configured number of legitimate records
    /// without replacement, then shuffles the concatenation. Both random steps are seeded
    /// with the same seed, so the result depends only on the source and the seed.
    pub fn sample(&self, source: Dataset) -> Result<Dataset, PipelineError> {
        let Dataset { feature_names, records } = source;
        let (fraud, legitimate): (Vec<Record>, Vec<Record>) =
            records.into_iter().partition(Record::is_fraud);

        if legitimate.len() < self.legitimate_sample_size {
            return Err(PipelineError::InsufficientData {
                requested: self.legitimate_sample_size,
                available: legitimate.len(),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let picked = index::sample(&mut rng, legitimate.len(), self.legitimate_sample_size);

        let mut sampled = fraud;
        sampled.extend(picked.iter().map(|i| legitimate[i].clone()));

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        sampled.shuffle(&mut rng);

        let dataset = Dataset::new(feature_names, sampled)?;
        info!(
            total = dataset.len(),
            fraud = dataset.n_fraud(),
            legitimate = dataset.n_legitimate(),
            "Dataset sampled"
        );
        Ok(dataset)
    }
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize, PipelineError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PipelineError::DataUnavailable(format!("missing required column {name}")))
}

fn parse_field(
    row: &csv::StringRecord,
    idx: usize,
    n: usize,
    headers: &csv::StringRecord,
) -> Result<f64, PipelineError> {
    let raw = row.get(idx).ok_or_else(|| {
        PipelineError::DataUnavailable(format!("row {n} is missing column {}", &headers[idx]))
    })?;
    raw.parse::<f64>().map_err(|_| {
        PipelineError::DataUnavailable(format!(
            "row {n}: column {} is not numeric ({raw:?})",
            &headers[idx]
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_csv(n_fraud: usize, n_legit: usize) -> String {
        let mut csv = String::from("Time,V1,V2,Amount,Class\n");
        for i in 0..n_fraud {
            csv.push_str(&format!("{i},{}.5,-1.0,10.0,1\n", i));
        }
        for i in 0..n_legit {
            csv.push_str(&format!("{i},{}.0,2.0,3.5,\"0\"\n", i));
        }
        csv
    }

    fn sampler(size: usize, seed: u64) -> DatasetSampler {
        let config = PipelineConfig::builder()
            .legitimate_sample_size(size)
            .sample_seed(seed)
            .build()
            .unwrap();
        DatasetSampler::new(&config)
    }

    #[test]
    fn keeps_all_fraud_and_samples_legitimate() {
        let data = source_csv(4, 50);
        let dataset = sampler(10, 42).sample_reader(data.as_bytes()).unwrap();
        assert_eq!(14, dataset.len());
        assert_eq!(4, dataset.n_fraud());
        assert_eq!(10, dataset.n_legitimate());
        assert_eq!(dataset.feature_names(), &["V1".to_string(), "V2".to_string()]);
    }

    #[test]
    fn same_seed_same_dataset() {
        let data = source_csv(5, 80);
        let first = sampler(20, 7).sample_reader(data.as_bytes()).unwrap();
        let second = sampler(20, 7).sample_reader(data.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_seed_different_order() {
        let data = source_csv(5, 80);
        let first = sampler(20, 7).sample_reader(data.as_bytes()).unwrap();
        let second = sampler(20, 8).sample_reader(data.as_bytes()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn sampled_rows_are_distinct() {
        let data = source_csv(0, 30);
        let dataset = sampler(30, 1).sample_reader(data.as_bytes()).unwrap();
        let mut firsts: Vec<f64> = dataset.records().iter().map(|r| r.features[0]).collect();
        firsts.sort_by(f64::total_cmp);
        firsts.dedup();
        assert_eq!(30, firsts.len());
    }

    #[test]
    fn too_few_legitimate_rows() {
        let data = source_csv(3, 5);
        let result = sampler(6, 42).sample_reader(data.as_bytes());
        assert_eq!(
            result,
            Err(PipelineError::InsufficientData { requested: 6, available: 5 })
        );
    }

    #[test]
    fn missing_label_column() {
        let data = "Time,V1,Amount\n0,1.0,2.0\n";
        let result = sampler(1, 42).sample_reader(data.as_bytes());
        assert!(matches!(result, Err(PipelineError::DataUnavailable(..))));
    }

    #[test]
    fn missing_dropped_column() {
        let data = "V1,Amount,Class\n1.0,2.0,0\n";
        let result = sampler(1, 42).sample_reader(data.as_bytes());
        assert!(matches!(result, Err(PipelineError::DataUnavailable(..))));
    }

    #[test]
    fn non_numeric_field() {
        let data = "Time,V1,Amount,Class\n0,abc,2.0,0\n";
        let result = sampler(1, 42).sample_reader(data.as_bytes());
        assert!(matches!(result, Err(PipelineError::DataUnavailable(..))));
    }

    #[test]
    fn missing_file() {
        let result = sampler(1, 42).sample_path(Path::new("does/not/exist.csv"));
        assert!(matches!(result, Err(PipelineError::DataUnavailable(..))));
    }

    #[test]
    fn projection_follows_requested_order() {
        let data = source_csv(1, 1);
        let dataset = sampler(1, 42).sample_reader(data.as_bytes()).unwrap();
        let projected = dataset.project(&["V2", "V1"]).unwrap();
        for (row, record) in projected.iter().zip(dataset.records()) {
            assert_eq!(row, &vec![record.features[1], record.features[0]]);
        }
        assert!(matches!(
            dataset.project(&["V99"]),
            Err(PipelineError::Configuration(..))
        ));
    }
}
