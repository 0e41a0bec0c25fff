use std::sync::Arc;

use quiz_core::model::{Attempt, AttemptRow};
use quiz_core::stats::{
    self, Achievement, ChapterStatistics, Statistics,
};
use storage::repository::{AttemptRepository, ProgressRepository};

use crate::Clock;
use crate::error::StatsError;

/// How many history rows the report carries for the recent-activity list.
const RECENT_ATTEMPTS: usize = 10;

/// Everything a statistics screen needs, computed in one load.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsReport {
    pub statistics: Statistics,
    pub chapters: Vec<ChapterStatistics>,
    pub achievements: Vec<Achievement>,
    /// Newest first, capped at the last ten attempts.
    pub recent_attempts: Vec<AttemptRow>,
}

/// Read-only statistics over the stored aggregates and attempt history.
///
/// Nothing here writes: the whole report is recomputed from storage on
/// every call, so it can never drift from the underlying records.
#[derive(Clone)]
pub struct StatsService {
    clock: Clock,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(
        clock: Clock,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            attempts,
            progress,
        }
    }

    /// Compute the full statistics report.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` when repository access fails.
    pub async fn statistics_report(&self) -> Result<StatisticsReport, StatsError> {
        let chapters = self.progress.list_progress().await?;
        let history = self.attempts.list_attempts().await?;
        let attempts: Vec<Attempt> = history.iter().map(|row| row.attempt.clone()).collect();

        let statistics = stats::overall_statistics(&chapters, &attempts, self.clock.now());
        let chapter_rows = stats::chapter_statistics(&chapters, &attempts);
        let achievements = stats::achievements(&chapters, &attempts);

        let recent_attempts = history.into_iter().take(RECENT_ATTEMPTS).collect();

        Ok(StatisticsReport {
            statistics,
            chapters: chapter_rows,
            achievements,
            recent_attempts,
        })
    }

    /// Statistics for a single chapter, if it has a progress row.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` when repository access fails.
    pub async fn chapter_report(
        &self,
        chapter: &str,
    ) -> Result<Option<ChapterStatistics>, StatsError> {
        let Some(row) = self.progress.get_progress(chapter).await? else {
            return Ok(None);
        };
        let history = self.attempts.list_attempts_by_chapter(chapter).await?;
        let attempts: Vec<Attempt> = history.iter().map(|r| r.attempt.clone()).collect();
        Ok(stats::chapter_statistics(std::slice::from_ref(&row), &attempts).pop())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{ChapterProgress, QuestionId};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::Storage;

    fn attempt(chapter: &str, correct: u32, total: u32, offset_mins: i64) -> Attempt {
        let all: Vec<QuestionId> = (0..u64::from(total)).map(QuestionId::new).collect();
        let correct_ids = all[..correct as usize].to_vec();
        let wrong_ids = all[correct as usize..].to_vec();
        Attempt::from_outcomes(
            fixed_now() + Duration::minutes(offset_mins),
            chapter,
            "Mixed",
            60,
            all,
            correct_ids,
            wrong_ids,
            vec![],
        )
        .unwrap()
    }

    fn service_with(storage: &Storage) -> StatsService {
        StatsService::new(
            fixed_clock(),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
        )
    }

    #[tokio::test]
    async fn report_combines_progress_and_history() {
        let storage = Storage::in_memory();
        let mut row = ChapterProgress::seeded("Epidemiology", 20, fixed_now());
        row.questions_attempted = 10;
        row.questions_correct = 8;
        row.quizzes_completed = 1;
        storage.progress.upsert_progress(&row).await.unwrap();
        storage
            .attempts
            .append_attempt(&attempt("Epidemiology", 8, 10, 0))
            .await
            .unwrap();

        let report = service_with(&storage).statistics_report().await.unwrap();
        assert_eq!(report.statistics.total_questions, 20);
        assert!((report.statistics.overall_progress - 50.0).abs() < f64::EPSILON);
        assert!((report.statistics.overall_accuracy - 80.0).abs() < f64::EPSILON);
        assert_eq!(report.statistics.quizzes_completed, 1);
        assert_eq!(report.chapters.len(), 1);
        assert_eq!(report.recent_attempts.len(), 1);

        let first_quiz = report
            .achievements
            .iter()
            .find(|a| a.id == "first_quiz")
            .unwrap();
        assert!(first_quiz.is_unlocked);
    }

    #[tokio::test]
    async fn recent_attempts_cap_at_ten_newest_first() {
        let storage = Storage::in_memory();
        for i in 0..12 {
            storage
                .attempts
                .append_attempt(&attempt("Epidemiology", 5, 10, i))
                .await
                .unwrap();
        }

        let report = service_with(&storage).statistics_report().await.unwrap();
        assert_eq!(report.recent_attempts.len(), 10);
        assert_eq!(
            report.recent_attempts[0].attempt.date_time(),
            fixed_now() + Duration::minutes(11)
        );
    }

    #[tokio::test]
    async fn chapter_report_windows_the_last_five_scores() {
        let storage = Storage::in_memory();
        let row = ChapterProgress::seeded("Epidemiology", 20, fixed_now());
        storage.progress.upsert_progress(&row).await.unwrap();
        for (i, correct) in [4u32, 5, 6, 8, 9].iter().enumerate() {
            storage
                .attempts
                .append_attempt(&attempt("Epidemiology", *correct, 10, i as i64))
                .await
                .unwrap();
        }

        let report = service_with(&storage)
            .chapter_report("Epidemiology")
            .await
            .unwrap()
            .expect("row exists");
        assert_eq!(report.recent_scores, vec![40.0, 50.0, 60.0, 80.0, 90.0]);
        assert!((report.improvement_trend - 35.0).abs() < 1e-9);

        assert!(service_with(&storage)
            .chapter_report("Demography")
            .await
            .unwrap()
            .is_none());
    }
}
