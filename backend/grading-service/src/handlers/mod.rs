/// HTTP handlers for the grading service
///
/// Endpoints: grade an answer, retrain the model from supplied records,
/// pull training data out of the store, and report health.
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::error::{AppError, Result};
use crate::models::GradingRecord;
use crate::services::engine::GradingEngine;
use crate::services::trainer;

const MSG_MISSING_FIELDS: &str = "กรุณาระบุคำถามและคำตอบ";
const MSG_NO_TRAINING_DATA: &str = "ไม่มีข้อมูลสำหรับเทรนโมเดล";

fn default_max_score() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub answer: String,

    /// Maximum obtainable score for this question (default: 100)
    #[serde(default = "default_max_score")]
    pub max_score: u32,
}

#[derive(Debug, Serialize)]
pub struct GradeResponse {
    pub success: bool,
    pub score: u32,
    pub feedback: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainRequest {
    #[serde(default)]
    pub grading_tasks: Vec<GradingRecord>,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub success: bool,
    pub message: String,
    /// R² on the held-out partition.
    pub accuracy: f64,
    pub samples: usize,
}

#[derive(Debug, Serialize)]
pub struct TrainingDataResponse {
    pub success: bool,
    pub data: Vec<GradingRecord>,
    pub count: usize,
}

/// POST /api/grade
/// Grade a student's answer
#[post("/api/grade")]
pub async fn grade(
    engine: web::Data<GradingEngine>,
    body: web::Json<GradeRequest>,
) -> Result<HttpResponse> {
    if body.question.is_empty() || body.answer.is_empty() {
        return Err(AppError::Validation(MSG_MISSING_FIELDS.to_string()));
    }

    let result = engine
        .grade(&body.question, &body.answer, body.max_score)
        .await;

    Ok(HttpResponse::Ok().json(GradeResponse {
        success: true,
        score: result.score,
        feedback: result.feedback,
        confidence: result.confidence,
    }))
}

/// POST /api/train
/// Train the model using provided records, then reload it for serving
#[post("/api/train")]
pub async fn train(
    engine: web::Data<GradingEngine>,
    body: web::Json<TrainRequest>,
) -> Result<HttpResponse> {
    let records = body.into_inner().grading_tasks;
    if records.is_empty() {
        return Err(AppError::Validation(MSG_NO_TRAINING_DATA.to_string()));
    }

    // Forest fitting is CPU-bound; keep it off the server workers.
    let model_path = engine.model_path().to_path_buf();
    let metrics =
        tokio::task::spawn_blocking(move || trainer::train_from_records(&records, &model_path))
            .await
            .map_err(|e| AppError::Internal(format!("Training task failed: {e}")))??;

    engine.reload().await;

    Ok(HttpResponse::Ok().json(TrainResponse {
        success: true,
        message: "Model trained successfully".to_string(),
        accuracy: metrics.r2,
        samples: metrics.samples,
    }))
}

/// POST /api/fetch-training-data
/// Fetch graded records from the store in GradingRecord shape
#[post("/api/fetch-training-data")]
pub async fn fetch_training_data(pool: web::Data<PgPool>) -> Result<HttpResponse> {
    let data = db::fetch_training_data(pool.get_ref()).await?;
    let count = data.len();

    info!(count, "Training data fetched");

    Ok(HttpResponse::Ok().json(TrainingDataResponse {
        success: true,
        data,
        count,
    }))
}

/// GET /health
#[get("/health")]
pub async fn health(engine: web::Data<GradingEngine>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "model_loaded": engine.is_loaded().await,
        "service": "grading-service"
    }))
}
