//! Read-only statistics and achievement derivations.
//!
//! Everything here is a pure function over chapter progress rows and the
//! attempt history: recomputing with the same inputs yields the same
//! output, and nothing is persisted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Attempt, ChapterProgress, MasteryLevel};

//
// ─── ACCOUNT-WIDE STATISTICS ───────────────────────────────────────────────────
//

/// Singleton snapshot of account-wide metrics, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub overall_progress: f64,
    pub total_questions: u32,
    pub overall_accuracy: f64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub quizzes_completed: u32,
    pub average_score: f64,
    pub total_study_time_secs: i64,
    pub chapters_completed: u32,
    pub total_chapters: u32,

    // Achievement data
    pub total_achievements: u32,
    pub unlocked_achievements: u32,

    // Recent activity
    pub last_quiz_date: Option<DateTime<Utc>>,
    pub weekly_progress: f64,
    pub monthly_progress: f64,
}

impl Statistics {
    /// Share of chapters completed, as a percentage.
    #[must_use]
    pub fn chapter_completion_rate(&self) -> f64 {
        if self.total_chapters > 0 {
            f64::from(self.chapters_completed) / f64::from(self.total_chapters) * 100.0
        } else {
            0.0
        }
    }
}

/// Per-chapter statistics row for display, combining the stored aggregate
/// with recent-performance derivations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterStatistics {
    pub chapter_name: String,
    pub total_questions: u32,
    pub questions_attempted: u32,
    pub questions_correct: u32,
    pub best_score: f64,
    pub average_score: f64,
    pub quizzes_completed: u32,
    pub total_time_spent_secs: i64,
    pub is_completed: bool,
    pub last_accessed: DateTime<Utc>,
    pub current_streak: u32,
    pub best_streak: u32,
    pub mastery_level: MasteryLevel,

    // Difficulty breakdown
    pub easy_correct: u32,
    pub medium_correct: u32,
    pub hard_correct: u32,

    // Recent performance: up to the last five scores, oldest first.
    pub recent_scores: Vec<f64>,
    pub improvement_trend: f64,
}

impl ChapterStatistics {
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.questions_attempted > 0 {
            f64::from(self.questions_correct) / f64::from(self.questions_attempted) * 100.0
        } else {
            0.0
        }
    }
}

//
// ─── ACHIEVEMENTS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AchievementCategory {
    Quiz,
    Chapter,
    Streak,
    Accuracy,
    Study,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AchievementRarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// One achievement badge, evaluated fresh on every statistics load.
///
/// There is no persisted unlock table: unlocking is a pure function of the
/// current progress and attempt state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: AchievementCategory,
    pub rarity: AchievementRarity,
    pub is_unlocked: bool,
    pub unlocked_date: Option<DateTime<Utc>>,
    pub progress: f64,
    pub max_progress: f64,
}

impl Achievement {
    /// Partial-completion ratio in 0..=1, also reported when unlocked.
    #[must_use]
    pub fn progress_ratio(&self) -> f64 {
        if self.max_progress > 0.0 {
            (self.progress.min(self.max_progress)) / self.max_progress
        } else {
            0.0
        }
    }
}

/// Evaluate every achievement against the current state.
///
/// The attempt slice may be in any order.
#[must_use]
pub fn achievements(chapters: &[ChapterProgress], attempts: &[Attempt]) -> Vec<Achievement> {
    let quizzes_completed = attempts.len() as u32;
    let best_streak = chapters.iter().map(|c| c.best_streak).max().unwrap_or(0);
    let first_quiz_date = attempts.iter().map(Attempt::date_time).min();
    let first_perfect = attempts
        .iter()
        .filter(|a| a.percentage() >= 100.0)
        .map(Attempt::date_time)
        .min();
    let chapters_completed = chapters.iter().filter(|c| c.is_completed).count() as u32;
    let total_chapters = chapters.len() as u32;

    vec![
        Achievement {
            id: "first_quiz",
            title: "First Steps",
            description: "Complete your first quiz",
            category: AchievementCategory::Quiz,
            rarity: AchievementRarity::Common,
            is_unlocked: quizzes_completed >= 1,
            unlocked_date: first_quiz_date,
            progress: f64::from(quizzes_completed).min(1.0),
            max_progress: 1.0,
        },
        Achievement {
            id: "week_streak",
            title: "Week Warrior",
            description: "Maintain a 7-day study streak",
            category: AchievementCategory::Streak,
            rarity: AchievementRarity::Rare,
            is_unlocked: best_streak >= 7,
            // The fold does not record when a streak peaked, so no date.
            unlocked_date: None,
            progress: f64::from(best_streak).min(7.0),
            max_progress: 7.0,
        },
        Achievement {
            id: "perfect_score",
            title: "Perfectionist",
            description: "Achieve a perfect score (100%)",
            category: AchievementCategory::Accuracy,
            rarity: AchievementRarity::Epic,
            is_unlocked: first_perfect.is_some(),
            unlocked_date: first_perfect,
            progress: if first_perfect.is_some() { 100.0 } else { 0.0 },
            max_progress: 100.0,
        },
        Achievement {
            id: "chapter_master",
            title: "Chapter Master",
            description: "Complete all chapters",
            category: AchievementCategory::Chapter,
            rarity: AchievementRarity::Legendary,
            is_unlocked: total_chapters > 0 && chapters_completed == total_chapters,
            unlocked_date: None,
            progress: f64::from(chapters_completed),
            max_progress: f64::from(total_chapters),
        },
    ]
}

//
// ─── DERIVATIONS ───────────────────────────────────────────────────────────────
//

/// Compute the account-wide statistics snapshot.
///
/// `now` anchors the weekly/monthly activity windows; pass a fixed clock
/// value for deterministic output.
#[must_use]
pub fn overall_statistics(
    chapters: &[ChapterProgress],
    attempts: &[Attempt],
    now: DateTime<Utc>,
) -> Statistics {
    let total_questions: u32 = chapters.iter().map(|c| c.total_questions).sum();
    let attempted: u32 = chapters.iter().map(|c| c.questions_attempted).sum();
    let correct: u32 = chapters.iter().map(|c| c.questions_correct).sum();

    let overall_progress = if total_questions > 0 {
        f64::from(attempted) / f64::from(total_questions) * 100.0
    } else {
        0.0
    };
    let overall_accuracy = if attempted > 0 {
        f64::from(correct) / f64::from(attempted) * 100.0
    } else {
        0.0
    };

    let quizzes_completed = attempts.len() as u32;
    let average_score = if quizzes_completed > 0 {
        attempts.iter().map(Attempt::percentage).sum::<f64>() / f64::from(quizzes_completed)
    } else {
        0.0
    };

    let total_study_time_secs: i64 = chapters.iter().map(|c| c.total_time_spent_secs).sum();
    let best_streak = chapters.iter().map(|c| c.best_streak).max().unwrap_or(0);
    let current_streak = chapters.iter().map(|c| c.current_streak).max().unwrap_or(0);
    let chapters_completed = chapters.iter().filter(|c| c.is_completed).count() as u32;

    let badges = achievements(chapters, attempts);
    let unlocked_achievements = badges.iter().filter(|a| a.is_unlocked).count() as u32;

    let window_share = |window: Duration| {
        if quizzes_completed == 0 {
            return 0.0;
        }
        let from = now - window;
        let recent = attempts.iter().filter(|a| a.date_time() >= from).count() as u32;
        f64::from(recent) / f64::from(quizzes_completed) * 100.0
    };

    Statistics {
        overall_progress,
        total_questions,
        overall_accuracy,
        current_streak,
        best_streak,
        quizzes_completed,
        average_score,
        total_study_time_secs,
        chapters_completed,
        total_chapters: chapters.len() as u32,
        total_achievements: badges.len() as u32,
        unlocked_achievements,
        last_quiz_date: attempts.iter().map(Attempt::date_time).max(),
        weekly_progress: window_share(Duration::days(7)),
        monthly_progress: window_share(Duration::days(30)),
    }
}

/// Per-chapter statistics, one row per progress aggregate.
#[must_use]
pub fn chapter_statistics(
    chapters: &[ChapterProgress],
    attempts: &[Attempt],
) -> Vec<ChapterStatistics> {
    chapters
        .iter()
        .map(|chapter| {
            let mut scores: Vec<(DateTime<Utc>, f64)> = attempts
                .iter()
                .filter(|a| a.chapter() == chapter.chapter_name)
                .map(|a| (a.date_time(), a.percentage()))
                .collect();
            scores.sort_by_key(|(at, _)| *at);

            let recent_scores: Vec<f64> = scores
                .iter()
                .rev()
                .take(5)
                .rev()
                .map(|(_, pct)| *pct)
                .collect();
            let improvement_trend = improvement_trend(&recent_scores);

            ChapterStatistics {
                chapter_name: chapter.chapter_name.clone(),
                total_questions: chapter.total_questions,
                questions_attempted: chapter.questions_attempted,
                questions_correct: chapter.questions_correct,
                best_score: chapter.best_score,
                average_score: chapter.average_score,
                quizzes_completed: chapter.quizzes_completed,
                total_time_spent_secs: chapter.total_time_spent_secs,
                is_completed: chapter.is_completed,
                last_accessed: chapter.last_accessed,
                current_streak: chapter.current_streak,
                best_streak: chapter.best_streak,
                mastery_level: chapter.mastery_level(),
                easy_correct: chapter.easy_correct,
                medium_correct: chapter.medium_correct,
                hard_correct: chapter.hard_correct,
                recent_scores,
                improvement_trend,
            }
        })
        .collect()
}

/// Difference between the mean of the two most recent scores and the mean
/// of the earlier scores in the last-five window; 0 with fewer than two
/// scores. Positive means improving.
fn improvement_trend(recent_scores: &[f64]) -> f64 {
    if recent_scores.len() < 2 {
        return 0.0;
    }
    let split = recent_scores.len() - 2;
    let (earlier, latest) = recent_scores.split_at(split);
    let latest_avg = latest.iter().sum::<f64>() / latest.len() as f64;
    if earlier.is_empty() {
        return 0.0;
    }
    let earlier_avg = earlier.iter().sum::<f64>() / earlier.len() as f64;
    latest_avg - earlier_avg
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
