//! Fallback scoring when no trained model is available
//!
//! Word-count heuristic used as a degraded mode whenever the model bundle is
//! missing from disk or failed to load. This keeps the grading endpoint
//! available even before the first training run.
//!
//! Algorithm:
//! - base = min(70, word_count / 50 * 100)
//! - score = clamp(round(base), 0, max_score)
//!
//! This is NOT meant to replace the trained regressor, only to provide a
//! reasonable answer while none exists.

/// Notice shown to the student when the heuristic produced the score.
pub const NO_MODEL_NOTICE: &str = "โมเดล ML ยังไม่พร้อมใช้งาน ใช้การให้คะแนนแบบพื้นฐาน";

/// Saturation ceiling of the heuristic: long answers never earn more than 70.
const BASE_SCORE_CAP: f64 = 70.0;

/// Word count at which the heuristic saturates.
const SATURATION_WORDS: f64 = 50.0;

/// Score an answer by word count alone.
///
/// Never fails; returns the score and the fixed no-model notice.
pub fn fallback_score(answer: &str, max_score: u32) -> (u32, String) {
    let word_count = answer.split_whitespace().count() as f64;

    let base = (word_count / SATURATION_WORDS * 100.0).min(BASE_SCORE_CAP);
    let score = base.round().clamp(0.0, max_score as f64) as u32;

    (score, NO_MODEL_NOTICE.to_string())
}
