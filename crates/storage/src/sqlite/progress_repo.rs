use async_trait::async_trait;
use quiz_core::model::ChapterProgress;

use super::{SqliteRepository, mapping::map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = r"
    chapter_name, total_questions, questions_attempted, questions_correct,
    questions_wrong, questions_skipped, best_score, average_score,
    total_time_spent_secs, quizzes_completed, is_completed,
    completion_percentage, last_accessed, easy_correct, medium_correct,
    hard_correct, current_streak, best_streak
";

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, progress: &ChapterProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO chapter_progress (
                chapter_name, total_questions, questions_attempted, questions_correct,
                questions_wrong, questions_skipped, best_score, average_score,
                total_time_spent_secs, quizzes_completed, is_completed,
                completion_percentage, last_accessed, easy_correct, medium_correct,
                hard_correct, current_streak, best_streak
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ON CONFLICT(chapter_name) DO UPDATE SET
                total_questions = excluded.total_questions,
                questions_attempted = excluded.questions_attempted,
                questions_correct = excluded.questions_correct,
                questions_wrong = excluded.questions_wrong,
                questions_skipped = excluded.questions_skipped,
                best_score = excluded.best_score,
                average_score = excluded.average_score,
                total_time_spent_secs = excluded.total_time_spent_secs,
                quizzes_completed = excluded.quizzes_completed,
                is_completed = excluded.is_completed,
                completion_percentage = excluded.completion_percentage,
                last_accessed = excluded.last_accessed,
                easy_correct = excluded.easy_correct,
                medium_correct = excluded.medium_correct,
                hard_correct = excluded.hard_correct,
                current_streak = excluded.current_streak,
                best_streak = excluded.best_streak
            ",
        )
        .bind(&progress.chapter_name)
        .bind(i64::from(progress.total_questions))
        .bind(i64::from(progress.questions_attempted))
        .bind(i64::from(progress.questions_correct))
        .bind(i64::from(progress.questions_wrong))
        .bind(i64::from(progress.questions_skipped))
        .bind(progress.best_score)
        .bind(progress.average_score)
        .bind(progress.total_time_spent_secs)
        .bind(i64::from(progress.quizzes_completed))
        .bind(progress.is_completed)
        .bind(progress.completion_percentage)
        .bind(progress.last_accessed)
        .bind(i64::from(progress.easy_correct))
        .bind(i64::from(progress.medium_correct))
        .bind(i64::from(progress.hard_correct))
        .bind(i64::from(progress.current_streak))
        .bind(i64::from(progress.best_streak))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_progress(&self, chapter: &str) -> Result<Option<ChapterProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM chapter_progress WHERE chapter_name = ?1"
        );
        let row = sqlx::query(&sql)
            .bind(chapter)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress(&self) -> Result<Vec<ChapterProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM chapter_progress ORDER BY chapter_name"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_progress_row).collect()
    }
}
