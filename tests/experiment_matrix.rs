use approx::assert_relative_eq;
use linkcode::ecc::Algorithm;
use linkcode::experiment::{run_matrix, ExperimentConfig, Harness, CSV_FIELDS};

#[test]
fn test_streaming_sink_matches_collected_rows() {
    let config = ExperimentConfig {
        runs: 50,
        message_sizes: vec![32, 64],
        error_probabilities: vec![0.0, 0.01],
        block_sizes: vec![4, 11],
        seed: Some(2024),
    };
    let collected = run_matrix(&config).unwrap();

    let harness = Harness::new(config.clone()).unwrap();
    assert_eq!(harness.base_seed(), 2024);
    let mut streamed = Vec::new();
    harness.run(|row| streamed.push(row)).unwrap();

    assert_eq!(streamed, collected);
    assert_eq!(collected.len(), config.row_count());
}

#[test]
fn test_rows_are_well_formed() {
    let config = ExperimentConfig {
        runs: 30,
        message_sizes: vec![64],
        error_probabilities: vec![0.0, 0.05],
        block_sizes: vec![11],
        seed: None,
    };
    let rows = run_matrix(&config).unwrap();
    for row in &rows {
        assert_eq!(row.runs, 30);
        assert!((0.0..=1.0).contains(&row.ok_rate));
        assert!(row.corrected_avg >= 0.0);
        assert!(row.uncorrect_avg >= 0.0);
        if row.algo == Algorithm::Crc32 {
            assert_eq!(row.k, None);
            assert_relative_eq!(row.corrected_avg, 0.0);
        }
        assert_eq!(row.csv_record().split(',').count(), CSV_FIELDS.len());
    }
    assert_relative_eq!(rows[0].ok_rate, 1.0);
    assert_relative_eq!(rows[1].ok_rate, 1.0);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = ExperimentConfig {
        error_probabilities: vec![-0.5],
        ..ExperimentConfig::default()
    };
    assert!(run_matrix(&config).is_err());
}
