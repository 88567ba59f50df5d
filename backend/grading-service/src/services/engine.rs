/// Grading Engine
///
/// Owns the loaded model bundle and answers single grading requests.
/// Grading never fails: without a bundle it heuristically scores by word
/// count, and any internal prediction failure collapses to a fixed degraded
/// result instead of an error.
use crate::error::AppError;
use crate::models::ScoreResult;
use crate::services::fallback::fallback_score;
use crate::services::features;
use crate::services::model::ModelBundle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Confidence reported when the heuristic or the degraded path answered.
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Confidence reported on the model path; the forest exposes no native
/// probability estimate.
const MODEL_CONFIDENCE: f64 = 0.8;

/// Raw score of the degraded result, clamped to the caller's max_score.
const DEGRADED_SCORE: f64 = 70.0;

const EVALUATION_ERROR_NOTICE: &str = "เกิดข้อผิดพลาดในการประเมินด้วย ML Model";

const FEEDBACK_VERY_GOOD: &str = "คำตอบดีมาก มีความถูกต้องและครบถ้วน";
const FEEDBACK_GOOD: &str = "คำตอบดี แต่ยังสามารถปรับปรุงได้";
const FEEDBACK_NEEDS_WORK: &str = "คำตอบควรปรับปรุง เพิ่มรายละเอียดและความชัดเจน";

pub struct GradingEngine {
    model_path: PathBuf,
    bundle: RwLock<Option<Arc<ModelBundle>>>,
}

impl GradingEngine {
    /// Create the engine, loading whatever bundle currently exists at
    /// `model_path`. A missing or unreadable bundle is a valid starting
    /// state, not an error.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        let model_path = model_path.into();
        let bundle = ModelBundle::load(&model_path).map(Arc::new);
        Self {
            model_path,
            bundle: RwLock::new(bundle),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub async fn is_loaded(&self) -> bool {
        self.bundle.read().await.is_some()
    }

    /// Re-read the bundle from disk and swap it in.
    ///
    /// The swap replaces the shared reference in one write; in-flight grade
    /// calls keep whichever bundle they already cloned.
    pub async fn reload(&self) {
        let fresh = ModelBundle::load(&self.model_path).map(Arc::new);
        let loaded = fresh.is_some();
        *self.bundle.write().await = fresh;
        info!(loaded, "Model reloaded");
    }

    /// Grade a single answer. Never fails.
    pub async fn grade(&self, question: &str, answer: &str, max_score: u32) -> ScoreResult {
        let bundle = self.bundle.read().await.clone();

        let Some(bundle) = bundle else {
            let (score, feedback) = fallback_score(answer, max_score);
            return ScoreResult {
                score,
                feedback,
                confidence: FALLBACK_CONFIDENCE,
            };
        };

        match predict_with_bundle(&bundle, question, answer, max_score) {
            Ok(result) => result,
            Err(e) => {
                error!("Error predicting score: {e}");
                ScoreResult {
                    score: DEGRADED_SCORE.min(max_score as f64) as u32,
                    feedback: EVALUATION_ERROR_NOTICE.to_string(),
                    confidence: FALLBACK_CONFIDENCE,
                }
            }
        }
    }
}

fn predict_with_bundle(
    bundle: &ModelBundle,
    question: &str,
    answer: &str,
    max_score: u32,
) -> Result<ScoreResult, AppError> {
    // A bundle either carries a text vectorizer or expects the numeric
    // features; the two representations are mutually exclusive.
    let vector = match &bundle.vectorizer {
        Some(vectorizer) => vectorizer.transform(&format!("{question} {answer}")),
        None => features::extract(question, answer, None, "").to_vector(),
    };

    let raw = bundle.regressor.predict(&vector)?;
    let score = raw.round().clamp(0.0, max_score as f64) as u32;

    Ok(ScoreResult {
        score,
        feedback: feedback_for(score, max_score),
        confidence: MODEL_CONFIDENCE,
    })
}

/// Bucket feedback by the score's fraction of the maximum.
fn feedback_for(score: u32, max_score: u32) -> String {
    let max = max_score as f64;
    let score = score as f64;

    if score >= max * 0.8 {
        FEEDBACK_VERY_GOOD
    } else if score >= max * 0.6 {
        FEEDBACK_GOOD
    } else {
        FEEDBACK_NEEDS_WORK
    }
    .to_string()
}
