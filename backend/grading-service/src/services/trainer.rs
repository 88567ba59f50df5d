/// Training Pipeline
///
/// Converts a batch of historical grading records into a persisted model
/// bundle: feature matrix → seeded train/test split → bagged forest fit →
/// held-out evaluation → bundle written to disk.
use crate::error::AppError;
use crate::models::{GradingRecord, TrainingMetrics};
use crate::services::features::{self, FEATURE_VECTOR_SIZE};
use crate::services::model::{ForestRegressor, ModelBundle};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use tracing::info;

/// Minimum samples required for training.
pub const MIN_SAMPLES: usize = 5;

/// Held-out fraction for evaluation.
const TEST_FRACTION: f64 = 0.2;

/// Fixed seed for the split and the bootstrap draws; training the same
/// record set twice produces the same bundle and metrics.
const RANDOM_SEED: u64 = 42;

const N_TREES: usize = 100;
const MAX_DEPTH: usize = 10;

/// Train a new model from grading records and persist it at `model_path`.
///
/// Records carry their own prior automated score/feedback as training-time
/// features, letting the model learn to correct or reinforce the earlier
/// automated pass. Fails without touching disk when fewer than
/// [`MIN_SAMPLES`] records are supplied.
pub fn train_from_records(
    records: &[GradingRecord],
    model_path: &Path,
) -> Result<TrainingMetrics, AppError> {
    if records.len() < MIN_SAMPLES {
        return Err(AppError::InsufficientData {
            found: records.len(),
            required: MIN_SAMPLES,
        });
    }

    info!("Training model with {} samples", records.len());

    let rows: Vec<f64> = records
        .iter()
        .flat_map(|record| {
            features::extract(
                &record.question,
                &record.answer,
                record.ai_score,
                record.ai_feedback.as_deref().unwrap_or(""),
            )
            .to_vector()
        })
        .collect();
    let x = Array2::from_shape_vec((records.len(), FEATURE_VECTOR_SIZE), rows)
        .map_err(|e| AppError::Internal(format!("feature matrix: {e}")))?;
    let y: Vec<f64> = records.iter().map(|r| r.teacher_score).collect();

    let (train_idx, test_idx) = split_indices(records.len());

    let x_train = select_rows(&x, &train_idx);
    let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();

    let forest = ForestRegressor::fit(&x_train, &y_train, N_TREES, MAX_DEPTH, RANDOM_SEED);

    let mut predicted = Vec::with_capacity(test_idx.len());
    for &i in &test_idx {
        predicted.push(forest.predict(&x.row(i).to_vec())?);
    }
    let actual: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();

    let mse = mean_squared_error(&actual, &predicted);
    let mae = mean_absolute_error(&actual, &predicted);
    let r2 = r_squared(&actual, &predicted);

    info!(mse, mae, r2, "Model performance");

    let metrics = TrainingMetrics {
        mse,
        mae,
        r2,
        samples: records.len(),
    };

    let bundle = ModelBundle {
        regressor: forest,
        vectorizer: None,
        metrics: metrics.clone(),
    };
    bundle.save(model_path)?;

    Ok(metrics)
}

/// Seeded shuffle then 80/20 slice. The test partition always holds at
/// least one row and never the whole set.
fn split_indices(n: usize) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(RANDOM_SEED));

    let test_len = ((n as f64 * TEST_FRACTION).round() as usize).clamp(1, n - 1);
    let (test, train) = indices.split_at(test_len);
    (train.to_vec(), test.to_vec())
}

fn select_rows(x: &Array2<f64>, idx: &[usize]) -> Array2<f64> {
    let data: Vec<f64> = idx.iter().flat_map(|&i| x.row(i).to_vec()).collect();
    Array2::from_shape_vec((idx.len(), x.ncols()), data)
        .expect("row selection preserves the column count")
}

fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Coefficient of determination. Defined as 0.0 when the held-out labels
/// carry no variance, so tiny test partitions still report a finite number.
fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let tss: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if tss <= f64::EPSILON {
        return 0.0;
    }
    let rss: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    1.0 - rss / tss
}
