use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{Difficulty, NewQuestion, Question, QuestionId};

use super::{SqliteRepository, mapping::map_question_row, mapping::question_id_to_i64};
use crate::repository::{QuestionRepository, StorageError};

const QUESTION_COLUMNS: &str = r"
    id, text, option_a, option_b, option_c, option_d, correct_answer,
    explanation, chapter, difficulty, times_answered, times_correct,
    last_answered, is_bookmarked
";

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(&self, draft: &NewQuestion) -> Result<QuestionId, StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO questions (
                text, option_a, option_b, option_c, option_d, correct_answer,
                explanation, chapter, difficulty, times_answered, times_correct,
                last_answered, is_bookmarked
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, NULL, 0)
            ",
        )
        .bind(&draft.text)
        .bind(&draft.option_a)
        .bind(&draft.option_b)
        .bind(&draft.option_c)
        .bind(&draft.option_d)
        .bind(draft.correct_answer.as_str())
        .bind(&draft.explanation)
        .bind(&draft.chapter)
        .bind(draft.difficulty.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = u64::try_from(result.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("generated question_id overflow".into()))?;
        Ok(QuestionId::new(id))
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(question_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_question_row(&row)
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN (");
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(question_id_to_i64(*id)?);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(conn)?;

        let mut by_id: HashMap<u64, Question> = HashMap::with_capacity(rows.len());
        for row in rows {
            let question = map_question_row(&row)?;
            by_id.insert(question.id.value(), question);
        }

        // Preserve input order; every requested id must exist.
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(&id.value()) {
                Some(question) => out.push(question),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(out)
    }

    async fn random_questions(
        &self,
        chapter: &str,
        difficulty: Option<Difficulty>,
        count: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = match difficulty {
            Some(d) => {
                let sql = format!(
                    r"
                    SELECT {QUESTION_COLUMNS} FROM questions
                    WHERE chapter = ?1 AND difficulty = ?2
                    ORDER BY RANDOM()
                    LIMIT ?3
                    "
                );
                sqlx::query(&sql)
                    .bind(chapter)
                    .bind(d.as_str())
                    .bind(i64::from(count))
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    r"
                    SELECT {QUESTION_COLUMNS} FROM questions
                    WHERE chapter = ?1
                    ORDER BY RANDOM()
                    LIMIT ?2
                    "
                );
                sqlx::query(&sql)
                    .bind(chapter)
                    .bind(i64::from(count))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn count_questions(
        &self,
        chapter: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<u32, StorageError> {
        let count: i64 = match difficulty {
            Some(d) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM questions WHERE chapter = ?1 AND difficulty = ?2",
                )
                .bind(chapter)
                .bind(d.as_str())
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE chapter = ?1")
                    .bind(chapter)
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(conn)?;

        u32::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn record_answer(
        &self,
        id: QuestionId,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            UPDATE questions SET
                times_answered = times_answered + 1,
                times_correct = times_correct + ?2,
                last_answered = ?3
            WHERE id = ?1
            ",
        )
        .bind(question_id_to_i64(id)?)
        .bind(i64::from(correct))
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_bookmarked(&self, id: QuestionId, bookmarked: bool) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE questions SET is_bookmarked = ?2 WHERE id = ?1")
            .bind(question_id_to_i64(id)?)
            .bind(bookmarked)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_bookmarked(&self) -> Result<Vec<Question>, StorageError> {
        let sql = format!(
            r"
            SELECT {QUESTION_COLUMNS} FROM questions
            WHERE is_bookmarked = 1
            ORDER BY last_answered DESC
            "
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_question_row).collect()
    }
}
