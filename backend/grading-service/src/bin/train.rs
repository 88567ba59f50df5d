//! Trains the grading model from historical records in the database.
//! Run with: cargo run --bin train

use sqlx::postgres::PgPoolOptions;
use std::path::Path;

use grading_service::config::Config;
use grading_service::db;
use grading_service::services::trainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config =
        Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    println!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database.url)
        .await?;

    println!("Fetching training data...");
    let records = db::fetch_training_data(&pool).await?;
    println!("Fetched {} graded records", records.len());

    let metrics = trainer::train_from_records(&records, Path::new(&config.model.path))?;

    println!("Model training completed!");
    println!("   Accuracy (R²): {:.2}%", metrics.r2 * 100.0);
    println!("   MSE: {:.2}", metrics.mse);
    println!("   MAE: {:.2}", metrics.mae);
    println!("   Samples: {}", metrics.samples);

    Ok(())
}
