use chrono::{DateTime, Utc};

use quiz_core::model::DifficultyFilter;
use storage::repository::QuestionRepository;

use super::service::QuizSession;
use crate::error::SessionError;

/// Storage-backed session builders.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Create a session directly from storage-backed data.
    ///
    /// The store draws up to `count` random questions for the chapter; a
    /// smaller bank yields a shorter session rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` if nothing matches the chapter
    /// and difficulty, or `SessionError::Storage` on repository failures.
    pub async fn start_from_storage(
        chapter: &str,
        difficulty: DifficultyFilter,
        count: u32,
        questions: &dyn QuestionRepository,
        now: DateTime<Utc>,
    ) -> Result<QuizSession, SessionError> {
        let picked = questions
            .random_questions(chapter, difficulty.difficulty(), count)
            .await?;
        QuizSession::new(chapter, difficulty, picked, now)
    }
}
