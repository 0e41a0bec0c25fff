use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (question bank, attempt history, chapter
/// progress, bookmarks, and indexes).
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    text TEXT NOT NULL,
                    option_a TEXT NOT NULL,
                    option_b TEXT NOT NULL,
                    option_c TEXT NOT NULL,
                    option_d TEXT NOT NULL,
                    correct_answer TEXT NOT NULL CHECK (correct_answer IN ('A', 'B', 'C', 'D')),
                    explanation TEXT NOT NULL,
                    chapter TEXT NOT NULL,
                    difficulty TEXT NOT NULL CHECK (difficulty IN ('Easy', 'Medium', 'Hard')),
                    times_answered INTEGER NOT NULL CHECK (times_answered >= 0),
                    times_correct INTEGER NOT NULL
                        CHECK (times_correct >= 0 AND times_correct <= times_answered),
                    last_answered TEXT,
                    is_bookmarked INTEGER NOT NULL CHECK (is_bookmarked IN (0, 1))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // The id lists are JSON arrays of question ids. The scalar counts
        // are stored redundantly so history queries never need to parse
        // the lists.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempts (
                    id INTEGER PRIMARY KEY,
                    date_time TEXT NOT NULL,
                    chapter TEXT NOT NULL,
                    difficulty TEXT NOT NULL,
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    correct_answers INTEGER NOT NULL CHECK (correct_answers >= 0),
                    wrong_answers INTEGER NOT NULL CHECK (wrong_answers >= 0),
                    skipped_questions INTEGER NOT NULL CHECK (skipped_questions >= 0),
                    time_taken_secs INTEGER NOT NULL CHECK (time_taken_secs >= 0),
                    percentage REAL NOT NULL,
                    questions_answered TEXT NOT NULL,
                    correct_ids TEXT NOT NULL,
                    wrong_ids TEXT NOT NULL,
                    skipped_ids TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS chapter_progress (
                    chapter_name TEXT PRIMARY KEY,
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    questions_attempted INTEGER NOT NULL CHECK (questions_attempted >= 0),
                    questions_correct INTEGER NOT NULL CHECK (questions_correct >= 0),
                    questions_wrong INTEGER NOT NULL CHECK (questions_wrong >= 0),
                    questions_skipped INTEGER NOT NULL CHECK (questions_skipped >= 0),
                    best_score REAL NOT NULL,
                    average_score REAL NOT NULL,
                    total_time_spent_secs INTEGER NOT NULL CHECK (total_time_spent_secs >= 0),
                    quizzes_completed INTEGER NOT NULL CHECK (quizzes_completed >= 0),
                    is_completed INTEGER NOT NULL CHECK (is_completed IN (0, 1)),
                    completion_percentage REAL NOT NULL,
                    last_accessed TEXT NOT NULL,
                    easy_correct INTEGER NOT NULL CHECK (easy_correct >= 0),
                    medium_correct INTEGER NOT NULL CHECK (medium_correct >= 0),
                    hard_correct INTEGER NOT NULL CHECK (hard_correct >= 0),
                    current_streak INTEGER NOT NULL CHECK (current_streak >= 0),
                    best_streak INTEGER NOT NULL CHECK (best_streak >= current_streak)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS bookmarks (
                    id TEXT PRIMARY KEY,
                    question_id INTEGER NOT NULL,
                    question_text TEXT NOT NULL,
                    option_a TEXT NOT NULL,
                    option_b TEXT NOT NULL,
                    option_c TEXT NOT NULL,
                    option_d TEXT NOT NULL,
                    correct_answer TEXT NOT NULL CHECK (correct_answer IN ('A', 'B', 'C', 'D')),
                    chapter TEXT NOT NULL,
                    difficulty TEXT NOT NULL CHECK (difficulty IN ('Easy', 'Medium', 'Hard')),
                    note TEXT,
                    tag TEXT,
                    date_bookmarked TEXT NOT NULL,
                    last_reviewed TEXT,
                    review_count INTEGER NOT NULL CHECK (review_count >= 0),
                    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_chapter_difficulty
                    ON questions (chapter, difficulty);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_bookmarked
                    ON questions (is_bookmarked);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_date
                    ON attempts (date_time);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_chapter_date
                    ON attempts (chapter, date_time);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_bookmarks_question
                    ON bookmarks (question_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
