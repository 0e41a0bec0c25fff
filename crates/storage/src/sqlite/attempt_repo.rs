use async_trait::async_trait;
use quiz_core::model::{Attempt, AttemptId, AttemptRow};

use super::{
    SqliteRepository,
    mapping::{ids_to_json, map_attempt_row},
};
use crate::repository::{AttemptRepository, StorageError};

const ATTEMPT_COLUMNS: &str = r"
    id, date_time, chapter, difficulty, total_questions, correct_answers,
    wrong_answers, skipped_questions, time_taken_secs, percentage,
    questions_answered, correct_ids, wrong_ids, skipped_ids
";

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &Attempt) -> Result<AttemptId, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO attempts (
                date_time, chapter, difficulty, total_questions, correct_answers,
                wrong_answers, skipped_questions, time_taken_secs, percentage,
                questions_answered, correct_ids, wrong_ids, skipped_ids
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
        )
        .bind(attempt.date_time())
        .bind(attempt.chapter())
        .bind(attempt.difficulty())
        .bind(i64::from(attempt.total_questions()))
        .bind(i64::from(attempt.correct_answers()))
        .bind(i64::from(attempt.wrong_answers()))
        .bind(i64::from(attempt.skipped_questions()))
        .bind(attempt.time_taken_secs())
        .bind(attempt.percentage())
        .bind(ids_to_json(attempt.questions_answered())?)
        .bind(ids_to_json(attempt.correct_ids())?)
        .bind(ids_to_json(attempt.wrong_ids())?)
        .bind(ids_to_json(attempt.skipped_ids())?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = u64::try_from(result.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("generated attempt_id overflow".into()))?;
        Ok(AttemptId::new(id))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRow, StorageError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(
                i64::try_from(id.value())
                    .map_err(|_| StorageError::Serialization("attempt_id overflow".into()))?,
            )
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_attempt_row(&row)
    }

    async fn list_attempts(&self) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts ORDER BY date_time DESC, id DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_attempt_row).collect()
    }

    async fn list_attempts_by_chapter(
        &self,
        chapter: &str,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!(
            r"
            SELECT {ATTEMPT_COLUMNS} FROM attempts
            WHERE chapter = ?1
            ORDER BY date_time DESC, id DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(chapter)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_attempt_row).collect()
    }
}
