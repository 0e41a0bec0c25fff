use async_trait::async_trait;
use quiz_core::model::{Bookmark, BookmarkId, QuestionId};

use super::{
    SqliteRepository,
    mapping::{map_bookmark_row, question_id_to_i64},
};
use crate::repository::{BookmarkRepository, StorageError};

const BOOKMARK_COLUMNS: &str = r"
    id, question_id, question_text, option_a, option_b, option_c, option_d,
    correct_answer, chapter, difficulty, note, tag, date_bookmarked,
    last_reviewed, review_count
";

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl BookmarkRepository for SqliteRepository {
    async fn upsert_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO bookmarks (
                id, question_id, question_text, option_a, option_b, option_c,
                option_d, correct_answer, chapter, difficulty, note, tag,
                date_bookmarked, last_reviewed, review_count
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(id) DO UPDATE SET
                -- the snapshot columns never change after creation; only the
                -- user annotations and review tracking do
                note = excluded.note,
                tag = excluded.tag,
                last_reviewed = excluded.last_reviewed,
                review_count = excluded.review_count
            ",
        )
        .bind(bookmark.id.to_string())
        .bind(question_id_to_i64(bookmark.question_id)?)
        .bind(&bookmark.question_text)
        .bind(&bookmark.option_a)
        .bind(&bookmark.option_b)
        .bind(&bookmark.option_c)
        .bind(&bookmark.option_d)
        .bind(bookmark.correct_answer.as_str())
        .bind(&bookmark.chapter)
        .bind(bookmark.difficulty.as_str())
        .bind(&bookmark.note)
        .bind(&bookmark.tag)
        .bind(bookmark.date_bookmarked)
        .bind(bookmark.last_reviewed)
        .bind(i64::from(bookmark.review_count))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_bookmark(&self, id: BookmarkId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_bookmark(&self, id: BookmarkId) -> Result<Bookmark, StorageError> {
        let sql = format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_bookmark_row(&row)
    }

    async fn find_by_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<Bookmark>, StorageError> {
        let sql = format!(
            r"
            SELECT {BOOKMARK_COLUMNS} FROM bookmarks
            WHERE question_id = ?1
            ORDER BY date_bookmarked DESC
            LIMIT 1
            "
        );
        let row = sqlx::query(&sql)
            .bind(question_id_to_i64(question_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_bookmark_row).transpose()
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StorageError> {
        let sql = format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmarks ORDER BY date_bookmarked DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(conn)?;
        rows.iter().map(map_bookmark_row).collect()
    }
}
