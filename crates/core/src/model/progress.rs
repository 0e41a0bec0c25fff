use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::attempt::Attempt;
use crate::model::question::Difficulty;

//
// ─── MASTERY LEVEL ─────────────────────────────────────────────────────────────
//

/// Ordinal classification of how well a chapter is known, derived from
/// progress and accuracy percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MasteryLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl MasteryLevel {
    /// Classify `(progress_pct, accuracy_pct)`.
    ///
    /// The guards are not mutually exclusive, so they are evaluated in this
    /// fixed order: the progress gate fires before the accuracy gate at
    /// each tier.
    #[must_use]
    pub fn classify(progress_pct: f64, accuracy_pct: f64) -> Self {
        if progress_pct < 50.0 {
            MasteryLevel::Beginner
        } else if accuracy_pct < 60.0 {
            MasteryLevel::Beginner
        } else if progress_pct < 80.0 {
            MasteryLevel::Intermediate
        } else if accuracy_pct < 80.0 {
            MasteryLevel::Intermediate
        } else if progress_pct >= 80.0 && accuracy_pct >= 80.0 {
            MasteryLevel::Expert
        } else {
            MasteryLevel::Advanced
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MasteryLevel::Beginner => "Beginner",
            MasteryLevel::Intermediate => "Intermediate",
            MasteryLevel::Advanced => "Advanced",
            MasteryLevel::Expert => "Expert",
        }
    }
}

//
// ─── CHAPTER PROGRESS ──────────────────────────────────────────────────────────
//

/// Per-correct-answer difficulty breakdown of one attempt, produced by
/// joining the attempt's correct-id list back to question difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectByDifficulty {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl CorrectByDifficulty {
    /// Tally one correct answer of the given difficulty.
    pub fn add(&mut self, difficulty: Difficulty) {
        match difficulty {
            Difficulty::Easy => self.easy += 1,
            Difficulty::Medium => self.medium += 1,
            Difficulty::Hard => self.hard += 1,
        }
    }
}

/// One mutable aggregate per chapter, keyed by chapter name.
///
/// Created with zero counters at content-seed time, folded after every
/// attempt, never deleted. `questions_attempted` counts answers, not
/// distinct questions, so it can exceed `total_questions` when questions
/// repeat across sessions; progress above 100% is clamped for display
/// only, never in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterProgress {
    pub chapter_name: String,
    pub total_questions: u32,
    pub questions_attempted: u32,
    pub questions_correct: u32,
    pub questions_wrong: u32,
    pub questions_skipped: u32,

    // Progress tracking
    pub best_score: f64,
    pub average_score: f64,
    pub total_time_spent_secs: i64,
    pub quizzes_completed: u32,

    // Completion status
    pub is_completed: bool,
    pub completion_percentage: f64,
    pub last_accessed: DateTime<Utc>,

    // Difficulty breakdown
    pub easy_correct: u32,
    pub medium_correct: u32,
    pub hard_correct: u32,

    // Streak tracking
    pub current_streak: u32,
    pub best_streak: u32,
}

impl ChapterProgress {
    /// Zero-counter row for a freshly seeded chapter.
    #[must_use]
    pub fn seeded(chapter_name: impl Into<String>, total_questions: u32, now: DateTime<Utc>) -> Self {
        Self {
            chapter_name: chapter_name.into(),
            total_questions,
            questions_attempted: 0,
            questions_correct: 0,
            questions_wrong: 0,
            questions_skipped: 0,
            best_score: 0.0,
            average_score: 0.0,
            total_time_spent_secs: 0,
            quizzes_completed: 0,
            is_completed: false,
            completion_percentage: 0.0,
            last_accessed: now,
            easy_correct: 0,
            medium_correct: 0,
            hard_correct: 0,
            current_streak: 0,
            best_streak: 0,
        }
    }

    /// Fold a finalized attempt into this aggregate.
    ///
    /// Skipped questions are excluded from `questions_attempted` (answered
    /// vs. shown), the best score updates when strictly beaten or when the
    /// existing best is still zero, and a 100% attempt marks the chapter
    /// completed. Streaks are *not* touched here; they move only through
    /// the explicit streak operations.
    pub fn fold_attempt(&mut self, attempt: &Attempt, correct_by: CorrectByDifficulty) {
        let answered = attempt.correct_answers() + attempt.wrong_answers();
        self.questions_attempted += answered;
        self.questions_correct += attempt.correct_answers();
        self.questions_wrong += attempt.wrong_answers();
        self.questions_skipped += attempt.skipped_questions();

        self.total_time_spent_secs += attempt.time_taken_secs();
        self.last_accessed = attempt.date_time();

        let n = f64::from(self.quizzes_completed);
        self.average_score = (self.average_score * n + attempt.percentage()) / (n + 1.0);
        self.quizzes_completed += 1;

        if attempt.percentage() > self.best_score || self.best_score == 0.0 {
            self.best_score = attempt.percentage();
        }

        if attempt.percentage() >= 100.0 {
            self.mark_completed();
        }

        self.easy_correct += correct_by.easy;
        self.medium_correct += correct_by.medium;
        self.hard_correct += correct_by.hard;
    }

    /// Count one qualifying consecutive-day study event.
    ///
    /// `best_streak` is non-decreasing across any sequence of increments
    /// and resets.
    pub fn increment_streak(&mut self) {
        self.current_streak += 1;
        self.best_streak = self.best_streak.max(self.current_streak);
    }

    /// A missed day: the current streak drops to zero. Best streak keeps
    /// its high-water mark.
    pub fn reset_streak(&mut self) {
        self.current_streak = 0;
    }

    pub fn mark_completed(&mut self) {
        self.is_completed = true;
        self.completion_percentage = 100.0;
    }

    /// Answer accuracy percentage (0 when nothing attempted).
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.questions_attempted > 0 {
            f64::from(self.questions_correct) / f64::from(self.questions_attempted) * 100.0
        } else {
            0.0
        }
    }

    /// Raw progress percentage; may exceed 100 when questions are repeated
    /// across sessions.
    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        if self.total_questions > 0 {
            f64::from(self.questions_attempted) / f64::from(self.total_questions) * 100.0
        } else {
            0.0
        }
    }

    /// Progress clamped to 100 for display surfaces.
    #[must_use]
    pub fn display_progress_percentage(&self) -> f64 {
        self.progress_percentage().min(100.0)
    }

    #[must_use]
    pub fn mastery_level(&self) -> MasteryLevel {
        MasteryLevel::classify(self.progress_percentage(), self.accuracy())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn attempt(correct: u32, wrong: u32, skipped: u32, secs: i64) -> Attempt {
        let total = u64::from(correct + wrong + skipped);
        let all: Vec<QuestionId> = (0..total).map(QuestionId::new).collect();
        let correct_ids = all[..correct as usize].to_vec();
        let wrong_ids = all[correct as usize..(correct + wrong) as usize].to_vec();
        let skipped_ids = all[(correct + wrong) as usize..].to_vec();
        Attempt::from_outcomes(
            fixed_now(),
            "Epidemiology",
            "Mixed",
            secs,
            all,
            correct_ids,
            wrong_ids,
            skipped_ids,
        )
        .unwrap()
    }

    #[test]
    fn mastery_precedence_is_fixed() {
        assert_eq!(MasteryLevel::classify(49.0, 95.0), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::classify(60.0, 59.0), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::classify(79.0, 99.0), MasteryLevel::Intermediate);
        assert_eq!(MasteryLevel::classify(85.0, 70.0), MasteryLevel::Intermediate);
        assert_eq!(MasteryLevel::classify(90.0, 85.0), MasteryLevel::Expert);
        assert_eq!(MasteryLevel::classify(80.0, 80.0), MasteryLevel::Expert);
    }

    #[test]
    fn mastery_is_ordinal() {
        assert!(MasteryLevel::Beginner < MasteryLevel::Intermediate);
        assert!(MasteryLevel::Intermediate < MasteryLevel::Advanced);
        assert!(MasteryLevel::Advanced < MasteryLevel::Expert);
    }

    #[test]
    fn fold_excludes_skipped_from_attempted() {
        let mut progress = ChapterProgress::seeded("Epidemiology", 40, fixed_now());
        progress.fold_attempt(&attempt(8, 1, 1, 120), CorrectByDifficulty::default());

        assert_eq!(progress.questions_attempted, 9);
        assert_eq!(progress.questions_correct, 8);
        assert_eq!(progress.questions_wrong, 1);
        assert_eq!(progress.questions_skipped, 1);
        assert_eq!(progress.quizzes_completed, 1);
        assert_eq!(progress.total_time_spent_secs, 120);
    }

    #[test]
    fn best_score_updates_only_when_beaten() {
        let mut progress = ChapterProgress::seeded("Epidemiology", 40, fixed_now());
        progress.best_score = 70.0;

        progress.fold_attempt(&attempt(8, 1, 1, 60), CorrectByDifficulty::default());
        assert!((progress.best_score - 80.0).abs() < f64::EPSILON);

        progress.fold_attempt(&attempt(6, 4, 0, 60), CorrectByDifficulty::default());
        assert!((progress.best_score - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn first_attempt_replaces_zero_best_score() {
        let mut progress = ChapterProgress::seeded("Epidemiology", 40, fixed_now());
        progress.fold_attempt(&attempt(1, 9, 0, 60), CorrectByDifficulty::default());
        assert!((progress.best_score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn perfect_attempt_completes_the_chapter() {
        let mut progress = ChapterProgress::seeded("Epidemiology", 10, fixed_now());
        progress.fold_attempt(&attempt(10, 0, 0, 300), CorrectByDifficulty::default());
        assert!(progress.is_completed);
        assert!((progress.completion_percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_score_is_running_mean() {
        let mut progress = ChapterProgress::seeded("Epidemiology", 40, fixed_now());
        progress.fold_attempt(&attempt(8, 2, 0, 60), CorrectByDifficulty::default());
        progress.fold_attempt(&attempt(6, 4, 0, 60), CorrectByDifficulty::default());
        assert!((progress.average_score - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn best_streak_is_non_decreasing() {
        let mut progress = ChapterProgress::seeded("Epidemiology", 40, fixed_now());
        let mut high_water = 0;
        for step in 0..20 {
            if step % 5 == 4 {
                progress.reset_streak();
            } else {
                progress.increment_streak();
            }
            assert!(progress.best_streak >= high_water);
            assert!(progress.best_streak >= progress.current_streak);
            high_water = progress.best_streak;
        }
    }

    #[test]
    fn attempted_may_exceed_total_but_display_clamps() {
        let mut progress = ChapterProgress::seeded("Epidemiology", 5, fixed_now());
        progress.fold_attempt(&attempt(5, 0, 0, 60), CorrectByDifficulty::default());
        let later = attempt(4, 1, 0, 60);
        progress.fold_attempt(&later, CorrectByDifficulty::default());

        assert_eq!(progress.questions_attempted, 10);
        assert!(progress.progress_percentage() > 100.0);
        assert!((progress.display_progress_percentage() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fold_tracks_last_accessed_and_difficulty_breakdown() {
        let mut progress = ChapterProgress::seeded("Epidemiology", 40, fixed_now());
        let when = fixed_now() + Duration::hours(3);
        let total: Vec<QuestionId> = (0..3).map(QuestionId::new).collect();
        let a = Attempt::from_outcomes(
            when,
            "Epidemiology",
            "Mixed",
            45,
            total.clone(),
            total,
            vec![],
            vec![],
        )
        .unwrap();

        let by = CorrectByDifficulty {
            easy: 1,
            medium: 2,
            hard: 0,
        };
        progress.fold_attempt(&a, by);

        assert_eq!(progress.last_accessed, when);
        assert_eq!(progress.easy_correct, 1);
        assert_eq!(progress.medium_correct, 2);
        assert_eq!(progress.hard_correct, 0);
    }
}
