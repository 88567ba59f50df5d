// Database read path for historical grading records.
//
// The store keeps Prisma-style quoted camelCase columns; the SELECT aliases
// them to snake_case so everything past this boundary only sees the fixed
// GradingRecord shape.

use crate::error::Result;
use crate::models::GradingRecord;
use sqlx::PgPool;

/// Most-recently-updated graded records fetched per training run.
const TRAINING_DATA_LIMIT: i64 = 1000;

/// Fetch graded records with teacher scores, joining back through
/// submission → exam → question to recover the original question text.
pub async fn fetch_training_data(pool: &PgPool) -> Result<Vec<GradingRecord>> {
    let records = sqlx::query_as::<_, GradingRecord>(
        r#"
        SELECT
            COALESCE(q.question, '') AS question,
            COALESCE(gt.answer, '') AS answer,
            gt."aiScore" AS ai_score,
            COALESCE(gt."aiFeedback", '') AS ai_feedback,
            gt."teacherScore" AS teacher_score,
            COALESCE(gt."teacherFeedback", '') AS teacher_feedback
        FROM "GradingTask" gt
        JOIN "ExamSubmission" es ON gt."submissionId" = es.id
        JOIN "Exam" e ON es."examId" = e.id
        JOIN "ExamQuestion" eq ON e.id = eq."examId" AND gt."questionId" = eq."questionId"
        JOIN "Question" q ON eq."questionId" = q.id
        WHERE gt.status = 'graded'
        AND gt."teacherScore" IS NOT NULL
        ORDER BY gt."updatedAt" DESC
        LIMIT $1
        "#,
    )
    .bind(TRAINING_DATA_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
