/// Feature Extraction Module
///
/// Turns a (question, answer) pair plus any prior automated grading signal
/// into the fixed-order numeric vector the regressor consumes. Training and
/// inference must agree on this layout: changing it invalidates any
/// previously persisted model bundle.
use std::collections::HashSet;

/// Feature vector size.
/// - Answer shape: 4 features (length, word count, sentence count, avg word length)
/// - Question overlap: 1 feature (token similarity)
/// - Prior grading pass: 2 features (ai score, ai feedback length)
pub const FEATURE_VECTOR_SIZE: usize = 7;

/// Features for a single graded answer
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeatures {
    pub answer_length: f64,
    pub word_count: f64,
    pub sentence_count: f64,
    pub avg_word_length: f64,
    pub question_similarity: f64,
    pub ai_score: f64,
    pub ai_feedback_length: f64,
}

impl AnswerFeatures {
    /// Convert to feature vector for model input
    ///
    /// Layout: [answer shape (4), question overlap (1), prior pass (2)]
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.answer_length,
            self.word_count,
            self.sentence_count,
            self.avg_word_length,
            self.question_similarity,
            self.ai_score,
            self.ai_feedback_length,
        ]
    }
}

/// Extract features from a question/answer pair.
///
/// Deterministic and side-effect free. `ai_score` of `None` maps to 0.0 —
/// records without a prior automated pass train against a zeroed feature,
/// the same convention the stored model was fitted with.
pub fn extract(
    question: &str,
    answer: &str,
    ai_score: Option<f64>,
    ai_feedback: &str,
) -> AnswerFeatures {
    let words: Vec<&str> = answer.split_whitespace().collect();

    let answer_length = answer.chars().count() as f64;
    let word_count = words.len() as f64;
    let sentence_count = answer.split('.').filter(|s| !s.trim().is_empty()).count() as f64;
    let avg_word_length = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64
    };

    // Token overlap: |answer tokens ∩ question tokens| / question token count,
    // case-insensitive, set semantics on the intersection.
    let question_lower = question.to_lowercase();
    let answer_lower = answer.to_lowercase();
    let question_token_count = question_lower.split_whitespace().count();
    let question_tokens: HashSet<&str> = question_lower.split_whitespace().collect();
    let answer_tokens: HashSet<&str> = answer_lower.split_whitespace().collect();
    let common = question_tokens.intersection(&answer_tokens).count();
    let question_similarity = common as f64 / question_token_count.max(1) as f64;

    AnswerFeatures {
        answer_length,
        word_count,
        sentence_count,
        avg_word_length,
        question_similarity,
        ai_score: ai_score.unwrap_or(0.0),
        ai_feedback_length: ai_feedback.chars().count() as f64,
    }
}
