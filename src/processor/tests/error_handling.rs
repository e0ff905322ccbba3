//! Error handling integration tests

use super::{job_config, latin1, write_bronze_file};
use crate::constants::SUCCESS_MARKER;
use crate::error::RaisError;
use crate::processor::JobProcessor;
use crate::test_support::{RAIS_2020_HEADER, rais_file_contents, rais_row};
use std::fs;
use tempfile::TempDir;

/// A file cut down to its first 30 columns
fn write_truncated_file(temp_dir: &TempDir, name: &str) {
    let bronze = temp_dir.path().join("bronze");
    fs::create_dir_all(&bronze).unwrap();
    let row: Vec<String> = rais_row(&[]).into_iter().take(30).collect();
    let contents = rais_file_contents(&RAIS_2020_HEADER[..30], &[row]);
    fs::write(bronze.join(name), latin1(&contents)).unwrap();
}

#[tokio::test]
async fn test_nonexistent_source_path() {
    let temp_dir = TempDir::new().unwrap();
    let config = job_config(&temp_dir);
    let missing = config.source_path.clone();

    match JobProcessor::new(config).unwrap_err() {
        RaisError::SourceNotFound { path } => assert_eq!(path, missing),
        other => panic!("Expected SourceNotFound error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_bronze_directory() {
    let temp_dir = TempDir::new().unwrap();
    let config = job_config(&temp_dir);
    fs::create_dir_all(&config.source_path).unwrap();
    let output = config.output_path.clone();

    let result = JobProcessor::new(config)
        .unwrap()
        .with_progress(false)
        .process()
        .await;

    assert!(matches!(result, Err(RaisError::EmptySource { .. })));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_invalid_encoding_rejected_up_front() {
    let temp_dir = TempDir::new().unwrap();
    let config = job_config(&temp_dir).with_encoding("not-an-encoding");

    assert!(matches!(
        JobProcessor::new(config),
        Err(RaisError::Configuration { .. })
    ));
}

#[tokio::test]
async fn test_schema_drift_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    write_truncated_file(&temp_dir, "RAIS_VINC_PUB_SP.txt");

    let config = job_config(&temp_dir);
    let output = config.output_path.clone();
    let err = JobProcessor::new(config)
        .unwrap()
        .with_progress(false)
        .process()
        .await
        .unwrap_err();

    assert!(err.is_schema_drift());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_failure_keeps_previous_output() {
    let temp_dir = TempDir::new().unwrap();
    let config = job_config(&temp_dir);
    let output = config.output_path.clone();

    fs::create_dir_all(output.join("uf=35")).unwrap();
    fs::write(output.join(SUCCESS_MARKER), "").unwrap();

    // A good file is processed first, then the drifted one fails the run
    write_bronze_file(
        &temp_dir.path().join("bronze"),
        "RAIS_VINC_PUB_MG_ES_RJ.txt",
        &[rais_row(&[(25, "3304557")])],
    );
    write_truncated_file(&temp_dir, "RAIS_VINC_PUB_SP.txt");

    let result = JobProcessor::new(config)
        .unwrap()
        .with_progress(false)
        .process()
        .await;

    assert!(result.is_err());
    assert!(output.join("uf=35").exists());
    assert!(output.join(SUCCESS_MARKER).exists());
    assert!(!output.join("uf=33").exists());

    let leftovers: Vec<_> = fs::read_dir(output.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(leftovers, vec!["rais_2020".to_string()]);
}
