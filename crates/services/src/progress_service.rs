use std::sync::Arc;

use chrono::Duration;

use quiz_core::model::{Attempt, ChapterProgress, CorrectByDifficulty};
use storage::repository::{ProgressRepository, QuestionRepository};

use crate::Clock;
use crate::error::ProgressError;

/// Maintains the per-chapter aggregates: attempt folds and study streaks.
///
/// Every update is a whole-row upsert computed from a freshly loaded
/// snapshot, so a failed write never leaves a half-updated row.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            progress,
        }
    }

    /// Fold a finalized attempt into its chapter aggregate and persist the
    /// updated row.
    ///
    /// The per-difficulty correct counts come from joining the attempt's
    /// correct-id list back to the stored questions. A chapter without a
    /// row yet (content seeded after the fact) gets one lazily.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when repository access fails.
    pub async fn fold_attempt(&self, attempt: &Attempt) -> Result<ChapterProgress, ProgressError> {
        let mut row = self.chapter_row(attempt.chapter()).await?;

        let correct_questions = self.questions.get_questions(attempt.correct_ids()).await?;
        let mut correct_by = CorrectByDifficulty::default();
        for question in &correct_questions {
            correct_by.add(question.difficulty);
        }

        row.fold_attempt(attempt, correct_by);
        self.progress.upsert_progress(&row).await?;
        Ok(row)
    }

    /// Count one study event for the chapter against the UTC calendar-day
    /// streak.
    ///
    /// A second event on the same day is a no-op, the next consecutive day
    /// increments, and a gap resets the streak to one. `best_streak` only
    /// ever rises.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when repository access fails.
    pub async fn record_study_event(
        &self,
        chapter: &str,
    ) -> Result<ChapterProgress, ProgressError> {
        let now = self.clock.now();
        let mut row = self.chapter_row(chapter).await?;

        let today = now.date_naive();
        let last_day = row.last_accessed.date_naive();

        if row.current_streak == 0 {
            row.increment_streak();
        } else if today == last_day {
            // already counted today
        } else if today == last_day + Duration::days(1) {
            row.increment_streak();
        } else {
            row.reset_streak();
            row.increment_streak();
        }

        row.last_accessed = now;
        self.progress.upsert_progress(&row).await?;
        Ok(row)
    }

    /// Drop the chapter's current streak to zero, keeping the best-streak
    /// high-water mark.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when repository access fails.
    pub async fn reset_streak(&self, chapter: &str) -> Result<ChapterProgress, ProgressError> {
        let mut row = self.chapter_row(chapter).await?;
        row.reset_streak();
        self.progress.upsert_progress(&row).await?;
        Ok(row)
    }

    /// The chapter's stored aggregate, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when repository access fails.
    pub async fn get_progress(
        &self,
        chapter: &str,
    ) -> Result<Option<ChapterProgress>, ProgressError> {
        Ok(self.progress.get_progress(chapter).await?)
    }

    /// All chapter aggregates.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when repository access fails.
    pub async fn list_progress(&self) -> Result<Vec<ChapterProgress>, ProgressError> {
        Ok(self.progress.list_progress().await?)
    }

    async fn chapter_row(&self, chapter: &str) -> Result<ChapterProgress, ProgressError> {
        if let Some(row) = self.progress.get_progress(chapter).await? {
            return Ok(row);
        }
        let total = self.questions.count_questions(chapter, None).await?;
        Ok(ChapterProgress::seeded(chapter, total, self.clock.now()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerOption, Difficulty, NewQuestion, QuestionId};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::Storage;

    fn service_with(storage: &Storage, clock: Clock) -> ProgressService {
        ProgressService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.progress),
        )
    }

    async fn insert_question(storage: &Storage, difficulty: Difficulty) -> QuestionId {
        storage
            .questions
            .insert_question(&NewQuestion {
                text: "Q".into(),
                option_a: "1".into(),
                option_b: "2".into(),
                option_c: "3".into(),
                option_d: "4".into(),
                correct_answer: AnswerOption::A,
                explanation: "E".into(),
                chapter: "Epidemiology".into(),
                difficulty,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fold_joins_difficulty_from_question_bank() {
        let storage = Storage::in_memory();
        let easy = insert_question(&storage, Difficulty::Easy).await;
        let hard = insert_question(&storage, Difficulty::Hard).await;
        let medium = insert_question(&storage, Difficulty::Medium).await;
        let service = service_with(&storage, fixed_clock());

        let all = vec![easy, hard, medium];
        let attempt = Attempt::from_outcomes(
            fixed_now(),
            "Epidemiology",
            "Mixed",
            120,
            all.clone(),
            vec![easy, hard],
            vec![medium],
            vec![],
        )
        .unwrap();

        let row = service.fold_attempt(&attempt).await.unwrap();
        assert_eq!(row.easy_correct, 1);
        assert_eq!(row.medium_correct, 0);
        assert_eq!(row.hard_correct, 1);
        assert_eq!(row.total_questions, 3); // lazily created with bank count
        assert_eq!(row.questions_attempted, 3);

        let stored = storage
            .progress
            .get_progress("Epidemiology")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, row);
    }

    #[tokio::test]
    async fn study_events_follow_calendar_days() {
        let storage = Storage::in_memory();
        let day = Duration::days(1);

        let first = service_with(&storage, fixed_clock())
            .record_study_event("Epidemiology")
            .await
            .unwrap();
        assert_eq!(first.current_streak, 1);

        // same day again: no change
        let again = service_with(&storage, fixed_clock())
            .record_study_event("Epidemiology")
            .await
            .unwrap();
        assert_eq!(again.current_streak, 1);

        // next day: increments
        let next = service_with(&storage, Clock::fixed(fixed_now() + day))
            .record_study_event("Epidemiology")
            .await
            .unwrap();
        assert_eq!(next.current_streak, 2);
        assert_eq!(next.best_streak, 2);

        // a gap resets to one, best streak keeps its high-water mark
        let gapped = service_with(&storage, Clock::fixed(fixed_now() + day * 5))
            .record_study_event("Epidemiology")
            .await
            .unwrap();
        assert_eq!(gapped.current_streak, 1);
        assert_eq!(gapped.best_streak, 2);
    }

    #[tokio::test]
    async fn reset_streak_keeps_best() {
        let storage = Storage::in_memory();
        let service = service_with(&storage, fixed_clock());
        service.record_study_event("Epidemiology").await.unwrap();

        let row = service.reset_streak("Epidemiology").await.unwrap();
        assert_eq!(row.current_streak, 0);
        assert_eq!(row.best_streak, 1);
    }
}
