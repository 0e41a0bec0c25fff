use std::sync::Arc;

use quiz_core::model::{Attempt, AttemptId, DifficultyFilter};
use storage::repository::{AttemptRepository, QuestionRepository};

use super::queries::SessionQueries;
use super::service::{AnswerFeedback, QuizSession};
use crate::Clock;
use crate::error::SessionError;
use crate::progress_service::ProgressService;

/// Result of answering a single question in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub feedback: AnswerFeedback,
    pub is_complete: bool,
    pub attempt_id: Option<AttemptId>,
}

/// The persisted record of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub attempt_id: AttemptId,
    pub attempt: Attempt,
}

/// Orchestrates session start, persisted answering, and finalization.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    attempts: Arc<dyn AttemptRepository>,
    progress: ProgressService,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        attempts: Arc<dyn AttemptRepository>,
        progress: ProgressService,
    ) -> Self {
        Self {
            clock,
            questions,
            attempts,
            progress,
        }
    }

    /// Start a new session for the given chapter and difficulty filter.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for storage failures or an empty match.
    pub async fn start_session(
        &self,
        chapter: &str,
        difficulty: DifficultyFilter,
        count: u32,
    ) -> Result<QuizSession, SessionError> {
        let now = self.clock.now();
        SessionQueries::start_from_storage(
            chapter,
            difficulty,
            count,
            self.questions.as_ref(),
            now,
        )
        .await
    }

    /// Submit the current selection, persisting the question's lifetime
    /// counters before the session advances.
    ///
    /// When this resolves the last question, the whole session is finalized:
    /// the attempt is appended to history, the study streak is updated, and
    /// the chapter aggregate is folded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for selection or persistence failures. If the
    /// attempt was appended but the progress fold failed, the error is
    /// surfaced after the append (history keeps the attempt).
    pub async fn submit_answer(
        &self,
        session: &mut QuizSession,
    ) -> Result<SessionAnswerResult, SessionError> {
        if session.is_complete() {
            return Err(SessionError::Completed);
        }
        if session.outcome_at(session.current_index()).is_some() {
            return Err(SessionError::AlreadyResolved);
        }

        let now = self.clock.now();
        let (question_id, correct) = {
            let question = session.current_question().ok_or(SessionError::Completed)?;
            let selected = session.selected_answer().ok_or(SessionError::NothingSelected)?;
            (question.id, question.is_correct(selected))
        };

        // Lifetime counters persist even if the session is later abandoned.
        self.questions.record_answer(question_id, correct, now).await?;

        let feedback = session.submit_answer(now)?;
        self.finalize_if_complete(session).await?;

        Ok(SessionAnswerResult {
            feedback,
            is_complete: session.is_complete(),
            attempt_id: session.attempt_id(),
        })
    }

    /// Skip the current question. Question counters are not touched; a skip
    /// is not an answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for session state or persistence failures.
    pub async fn skip_current(
        &self,
        session: &mut QuizSession,
    ) -> Result<Option<SessionOutcome>, SessionError> {
        session.skip_current(self.clock.now())?;
        self.finalize_if_complete(session).await
    }

    /// Resolve a timer expiry: submit a pending selection, else skip. A
    /// no-op after completion, so stale timers are harmless.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for persistence failures.
    pub async fn handle_timer_expiry(
        &self,
        session: &mut QuizSession,
    ) -> Result<Option<AnswerFeedback>, SessionError> {
        if session.is_complete() {
            return Ok(None);
        }
        if session.selected_answer().is_some() {
            let result = self.submit_answer(session).await?;
            return Ok(Some(result.feedback));
        }
        self.skip_current(session).await?;
        Ok(None)
    }

    /// Finish the session early: unresolved questions count as skipped and
    /// the attempt is persisted as-is.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session was already
    /// finalized, or persistence failures.
    pub async fn finish_session(
        &self,
        session: &mut QuizSession,
    ) -> Result<SessionOutcome, SessionError> {
        if session.attempt_id().is_some() {
            return Err(SessionError::Completed);
        }
        self.finalize(session).await
    }

    async fn finalize_if_complete(
        &self,
        session: &mut QuizSession,
    ) -> Result<Option<SessionOutcome>, SessionError> {
        if session.is_complete() && session.attempt_id().is_none() {
            return self.finalize(session).await.map(Some);
        }
        Ok(None)
    }

    /// Attempt first, aggregates second: history is the source of truth,
    /// and a failed fold leaves a consistent (if stale) aggregate behind.
    async fn finalize(&self, session: &mut QuizSession) -> Result<SessionOutcome, SessionError> {
        let now = self.clock.now();
        let attempt = session.build_attempt(now)?;
        let attempt_id = self.attempts.append_attempt(&attempt).await?;
        session.set_attempt_id(attempt_id);

        if let Err(err) = self.progress.record_study_event(attempt.chapter()).await {
            log::warn!("attempt {attempt_id} stored but streak update failed: {err}");
            return Err(err.into());
        }
        if let Err(err) = self.progress.fold_attempt(&attempt).await {
            log::warn!("attempt {attempt_id} stored but progress fold failed: {err}");
            return Err(err.into());
        }

        Ok(SessionOutcome {
            attempt_id,
            attempt,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
