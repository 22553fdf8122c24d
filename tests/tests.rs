use fraudscan::{
    ContingencyRow, Dataset, DbscanParams, Pipeline, PipelineConfig, PipelineError, Record, Stage, FRAUD,
    LEGITIMATE,
};
use std::io::Write;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::NamedTempFile;

const HEADER: &str = "Time,V1,V10,V14,Amount,Class";

#[test]
fn tight_fraud_group_is_one_cluster() {
    let file = write_csv(&tight_fraud_with_dispersed_legitimate());
    let pipeline = Pipeline::new(file.path(), config(200));

    let rows = pipeline.cluster_analysis().unwrap();
    assert_eq!(
        rows.as_slice(),
        &[
            ContingencyRow { label: -1, total: 200, malicious: 0 },
            ContingencyRow { label: 0, total: 30, malicious: 30 },
        ]
    );
    let metrics = pipeline.quality_metrics().unwrap();
    assert_eq!(Some(1.0), metrics.purity.value());
    assert!(metrics.silhouette.value().is_some());
}

#[test]
fn stray_fraud_is_noise_between_two_dense_groups() {
    let names = vec![String::from("V1"), String::from("V10"), String::from("V14")];
    let mut records = Vec::new();
    for i in 0..499 {
        let jitter = (i % 10) as f64 * 0.005;
        records.push(Record { features: vec![0.0, -3.0 + jitter, -3.0 - jitter], class: FRAUD });
        if i == 250 {
            records.push(Record { features: vec![0.0, 20.0, 20.0], class: FRAUD });
        }
    }
    for i in 0..500 {
        let jitter = (i % 10) as f64 * 0.005;
        records.push(Record { features: vec![0.0, 3.0 + jitter, 3.0 - jitter], class: LEGITIMATE });
    }
    let dataset = Dataset::new(names, records).unwrap();
    let pipeline = Pipeline::with_dataset(dataset, config(500));

    let rows = pipeline.cluster_analysis().unwrap();
    assert_eq!(
        rows.as_slice(),
        &[
            ContingencyRow { label: -1, total: 1, malicious: 1 },
            ContingencyRow { label: 0, total: 499, malicious: 499 },
            ContingencyRow { label: 1, total: 500, malicious: 0 },
        ]
    );
    assert_eq!(1000, rows.iter().map(|r| r.total).sum::<usize>());
}

#[test]
fn concurrent_readers_share_each_stage() {
    let file = write_csv(&tight_fraud_with_dispersed_legitimate());
    let pipeline = Pipeline::new(file.path(), config(200));
    let barrier = Barrier::new(8);

    let bundles: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    pipeline.bundle().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(bundles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    // One computation per stage, whatever the interleaving.
    assert_eq!(9, pipeline.computations());
    assert!(pipeline.is_cached(Stage::Bundle));
}

#[test]
fn same_seed_same_analysis() {
    let file = write_csv(&tight_fraud_with_dispersed_legitimate());
    let first = Pipeline::new(file.path(), config(150)).bundle().unwrap();
    let second = Pipeline::new(file.path(), config(150)).bundle().unwrap();
    assert_eq!(first, second);
    assert_eq!(180, first.sample.total);
    assert_eq!(30, first.sample.fraud);
}

#[test]
fn bundle_is_consistent() {
    let file = write_csv(&tight_fraud_with_dispersed_legitimate());
    let pipeline = Pipeline::new(file.path(), config(200));
    let bundle = pipeline.bundle().unwrap();

    let percentages: Vec<f64> = bundle
        .features_table
        .iter()
        .map(|row| row.percentage.trim_end_matches('%').parse().unwrap())
        .collect();
    assert!(!percentages.is_empty());
    assert!(percentages.windows(2).all(|w| w[0] >= w[1]));
    assert!(percentages.iter().sum::<f64>() <= 100.0 + 1e-9);

    assert_eq!(
        bundle.sample.total,
        bundle.cluster_analysis.iter().map(|r| r.total).sum::<usize>()
    );
    assert_eq!(bundle.sample.total, bundle.planar_view.points.len());
    assert_eq!(
        30,
        bundle.planar_view.points.iter().filter(|p| p.class == FRAUD && p.label == 0).count()
    );
    assert_eq!("0.172%", bundle.stats.fraud_percentage);
    assert_eq!("1.0000000000", bundle.evaluation_metrics.purity);
}

#[test]
fn oversized_sample_is_insufficient_data() {
    let file = write_csv(&tight_fraud_with_dispersed_legitimate());
    let pipeline = Pipeline::new(file.path(), config(201));
    assert_eq!(
        Err(PipelineError::InsufficientData { requested: 201, available: 200 }),
        pipeline.quality_metrics().map(|_| ())
    );
    assert!(!pipeline.is_cached(Stage::Dataset));
}

#[test]
fn missing_label_column_is_data_unavailable() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Time,V1,V10,V14,Amount").unwrap();
    writeln!(file, "0,0,1,1,10").unwrap();
    let pipeline = Pipeline::new(file.path(), config(1));
    assert!(matches!(pipeline.feature_table(), Err(PipelineError::DataUnavailable(..))));
}

#[test]
fn stats_need_no_data() {
    let pipeline = Pipeline::new("nowhere.csv", PipelineConfig::default());
    let stats = pipeline.stats();
    assert_eq!(284_807, stats.total_transactions);
    assert_eq!(492, stats.fraudulent);
    assert_eq!(284_315, stats.legitimate);
    assert_eq!(0, pipeline.computations());
}

fn config(legitimate_sample_size: usize) -> PipelineConfig {
    PipelineConfig::builder()
        .legitimate_sample_size(legitimate_sample_size)
        .forest_trees(10)
        .top_k(2)
        .full_params(DbscanParams::new(0.15, 13))
        .planar_params(DbscanParams::new(0.15, 13))
        .table_allow_list(["V10", "V14"])
        .build()
        .unwrap()
}

/// 30 fraud rows packed around (-5, -8) and 200 legitimate rows on a unit grid far away.
fn tight_fraud_with_dispersed_legitimate() -> Vec<(f64, f64, u8)> {
    let mut rows = Vec::new();
    for i in 0..30 {
        let jitter = i as f64 * 0.001;
        rows.push((-5.0 + jitter, -8.0 + jitter, FRAUD));
    }
    for i in 0..200 {
        rows.push(((i % 20) as f64, 10.0 + (i / 20) as f64, LEGITIMATE));
    }
    rows
}

fn write_csv(rows: &[(f64, f64, u8)]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for (n, (v10, v14, class)) in rows.iter().enumerate() {
        writeln!(file, "{n},0,{v10},{v14},{}.5,{class}", n * 3).unwrap();
    }
    file.flush().unwrap();
    file
}
