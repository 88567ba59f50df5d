// Domain models for the grading service

use serde::{Deserialize, Serialize};

/// One historical graded answer.
///
/// Wire format uses camelCase (`aiScore`, `teacherScore`, ...) to match the
/// backend's payloads; the database read path aliases the store's quoted
/// camelCase columns onto these fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GradingRecord {
    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub answer: String,

    /// Score a previous automated grading pass assigned, if any.
    #[serde(default)]
    pub ai_score: Option<f64>,

    /// Feedback from a previous automated grading pass.
    #[serde(default)]
    pub ai_feedback: Option<String>,

    /// Score assigned by the teacher. Label for supervised training.
    pub teacher_score: f64,

    #[serde(default)]
    pub teacher_feedback: Option<String>,
}

/// Evaluation metrics from the most recent training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub mse: f64,
    pub mae: f64,
    pub r2: f64,
    pub samples: usize,
}

/// Outcome of grading a single answer.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    /// Integer score in `[0, max_score]`.
    pub score: u32,
    pub feedback: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}
