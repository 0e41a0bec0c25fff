use quiz_core::model::{
    AnswerOption, Attempt, AttemptId, AttemptRow, Bookmark, BookmarkId, ChapterProgress,
    Difficulty, Question, QuestionId,
};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn parse_answer_option(s: &str) -> Result<AnswerOption, StorageError> {
    s.parse().map_err(ser)
}

/// Serializes a question id list to the JSON array stored in the attempt
/// columns.
pub(crate) fn ids_to_json(ids: &[QuestionId]) -> Result<String, StorageError> {
    serde_json::to_string(ids).map_err(ser)
}

pub(crate) fn ids_from_json(raw: &str) -> Result<Vec<QuestionId>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let question = Question {
        id: question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        text: row.try_get("text").map_err(ser)?,
        option_a: row.try_get("option_a").map_err(ser)?,
        option_b: row.try_get("option_b").map_err(ser)?,
        option_c: row.try_get("option_c").map_err(ser)?,
        option_d: row.try_get("option_d").map_err(ser)?,
        correct_answer: parse_answer_option(
            row.try_get::<String, _>("correct_answer").map_err(ser)?.as_str(),
        )?,
        explanation: row.try_get("explanation").map_err(ser)?,
        chapter: row.try_get("chapter").map_err(ser)?,
        difficulty: parse_difficulty(
            row.try_get::<String, _>("difficulty").map_err(ser)?.as_str(),
        )?,
        times_answered: i64_to_u32(
            "times_answered",
            row.try_get::<i64, _>("times_answered").map_err(ser)?,
        )?,
        times_correct: i64_to_u32(
            "times_correct",
            row.try_get::<i64, _>("times_correct").map_err(ser)?,
        )?,
        last_answered: row.try_get("last_answered").map_err(ser)?,
        is_bookmarked: row.try_get("is_bookmarked").map_err(ser)?,
    };
    question.validate_counters().map_err(ser)?;
    Ok(question)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRow, StorageError> {
    let attempt = Attempt::from_persisted(
        row.try_get("date_time").map_err(ser)?,
        row.try_get("chapter").map_err(ser)?,
        row.try_get("difficulty").map_err(ser)?,
        i64_to_u32(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        i64_to_u32(
            "correct_answers",
            row.try_get::<i64, _>("correct_answers").map_err(ser)?,
        )?,
        i64_to_u32(
            "wrong_answers",
            row.try_get::<i64, _>("wrong_answers").map_err(ser)?,
        )?,
        i64_to_u32(
            "skipped_questions",
            row.try_get::<i64, _>("skipped_questions").map_err(ser)?,
        )?,
        row.try_get("time_taken_secs").map_err(ser)?,
        ids_from_json(row.try_get::<String, _>("questions_answered").map_err(ser)?.as_str())?,
        ids_from_json(row.try_get::<String, _>("correct_ids").map_err(ser)?.as_str())?,
        ids_from_json(row.try_get::<String, _>("wrong_ids").map_err(ser)?.as_str())?,
        ids_from_json(row.try_get::<String, _>("skipped_ids").map_err(ser)?.as_str())?,
    )
    .map_err(ser)?;

    Ok(AttemptRow::new(
        attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        attempt,
    ))
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ChapterProgress, StorageError> {
    Ok(ChapterProgress {
        chapter_name: row.try_get("chapter_name").map_err(ser)?,
        total_questions: i64_to_u32(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        questions_attempted: i64_to_u32(
            "questions_attempted",
            row.try_get::<i64, _>("questions_attempted").map_err(ser)?,
        )?,
        questions_correct: i64_to_u32(
            "questions_correct",
            row.try_get::<i64, _>("questions_correct").map_err(ser)?,
        )?,
        questions_wrong: i64_to_u32(
            "questions_wrong",
            row.try_get::<i64, _>("questions_wrong").map_err(ser)?,
        )?,
        questions_skipped: i64_to_u32(
            "questions_skipped",
            row.try_get::<i64, _>("questions_skipped").map_err(ser)?,
        )?,
        best_score: row.try_get("best_score").map_err(ser)?,
        average_score: row.try_get("average_score").map_err(ser)?,
        total_time_spent_secs: row.try_get("total_time_spent_secs").map_err(ser)?,
        quizzes_completed: i64_to_u32(
            "quizzes_completed",
            row.try_get::<i64, _>("quizzes_completed").map_err(ser)?,
        )?,
        is_completed: row.try_get("is_completed").map_err(ser)?,
        completion_percentage: row.try_get("completion_percentage").map_err(ser)?,
        last_accessed: row.try_get("last_accessed").map_err(ser)?,
        easy_correct: i64_to_u32(
            "easy_correct",
            row.try_get::<i64, _>("easy_correct").map_err(ser)?,
        )?,
        medium_correct: i64_to_u32(
            "medium_correct",
            row.try_get::<i64, _>("medium_correct").map_err(ser)?,
        )?,
        hard_correct: i64_to_u32(
            "hard_correct",
            row.try_get::<i64, _>("hard_correct").map_err(ser)?,
        )?,
        current_streak: i64_to_u32(
            "current_streak",
            row.try_get::<i64, _>("current_streak").map_err(ser)?,
        )?,
        best_streak: i64_to_u32(
            "best_streak",
            row.try_get::<i64, _>("best_streak").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_bookmark_row(row: &sqlx::sqlite::SqliteRow) -> Result<Bookmark, StorageError> {
    let id: BookmarkId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(Bookmark {
        id,
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        question_text: row.try_get("question_text").map_err(ser)?,
        option_a: row.try_get("option_a").map_err(ser)?,
        option_b: row.try_get("option_b").map_err(ser)?,
        option_c: row.try_get("option_c").map_err(ser)?,
        option_d: row.try_get("option_d").map_err(ser)?,
        correct_answer: parse_answer_option(
            row.try_get::<String, _>("correct_answer").map_err(ser)?.as_str(),
        )?,
        chapter: row.try_get("chapter").map_err(ser)?,
        difficulty: parse_difficulty(
            row.try_get::<String, _>("difficulty").map_err(ser)?.as_str(),
        )?,
        note: row.try_get("note").map_err(ser)?,
        tag: row.try_get("tag").map_err(ser)?,
        date_bookmarked: row.try_get("date_bookmarked").map_err(ser)?,
        last_reviewed: row.try_get("last_reviewed").map_err(ser)?,
        review_count: i64_to_u32(
            "review_count",
            row.try_get::<i64, _>("review_count").map_err(ser)?,
        )?,
    })
}
