use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{AttemptId, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("correct ({correct}) + wrong ({wrong}) + skipped ({skipped}) does not equal total ({total})")]
    CountMismatch {
        total: u32,
        correct: u32,
        wrong: u32,
        skipped: u32,
    },

    #[error("outcome lists do not partition the answered list")]
    PartitionMismatch,

    #[error("elapsed time is negative")]
    NegativeElapsed,
}

/// Immutable record of one completed, scored quiz session.
///
/// Append-only history: attempts are created atomically at quiz completion
/// and never mutated. The constructor is the only way to build one, so the
/// count and partition invariants hold for every value of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    date_time: DateTime<Utc>,
    chapter: String,
    difficulty: String,
    total_questions: u32,
    correct_answers: u32,
    wrong_answers: u32,
    skipped_questions: u32,
    time_taken_secs: i64,
    percentage: f64,
    questions_answered: Vec<QuestionId>,
    correct_ids: Vec<QuestionId>,
    wrong_ids: Vec<QuestionId>,
    skipped_ids: Vec<QuestionId>,
}

impl Attempt {
    /// Build an attempt from the per-question outcome lists.
    ///
    /// `questions_answered` is the full ordered set shown in the session;
    /// the three outcome lists must partition it. The percentage is
    /// computed here (0 for an empty session) and doubles as the score.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::PartitionMismatch` if the outcome lists
    /// overlap, repeat, or do not cover `questions_answered`, and
    /// `AttemptError::NegativeElapsed` for a negative elapsed time.
    pub fn from_outcomes(
        date_time: DateTime<Utc>,
        chapter: impl Into<String>,
        difficulty: impl Into<String>,
        time_taken_secs: i64,
        questions_answered: Vec<QuestionId>,
        correct_ids: Vec<QuestionId>,
        wrong_ids: Vec<QuestionId>,
        skipped_ids: Vec<QuestionId>,
    ) -> Result<Self, AttemptError> {
        if time_taken_secs < 0 {
            return Err(AttemptError::NegativeElapsed);
        }

        let answered: HashSet<QuestionId> = questions_answered.iter().copied().collect();
        if answered.len() != questions_answered.len() {
            return Err(AttemptError::PartitionMismatch);
        }

        let mut seen = HashSet::with_capacity(answered.len());
        for id in correct_ids.iter().chain(&wrong_ids).chain(&skipped_ids) {
            if !answered.contains(id) || !seen.insert(*id) {
                return Err(AttemptError::PartitionMismatch);
            }
        }
        if seen.len() != answered.len() {
            return Err(AttemptError::PartitionMismatch);
        }

        let total = u32::try_from(questions_answered.len())
            .map_err(|_| AttemptError::PartitionMismatch)?;
        let correct = correct_ids.len() as u32;
        let wrong = wrong_ids.len() as u32;
        let skipped = skipped_ids.len() as u32;

        let percentage = if total > 0 {
            f64::from(correct) / f64::from(total) * 100.0
        } else {
            0.0
        };

        Ok(Self {
            date_time,
            chapter: chapter.into(),
            difficulty: difficulty.into(),
            total_questions: total,
            correct_answers: correct,
            wrong_answers: wrong,
            skipped_questions: skipped,
            time_taken_secs,
            percentage,
            questions_answered,
            correct_ids,
            wrong_ids,
            skipped_ids,
        })
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::CountMismatch` if the stored counts do not
    /// add up, or a partition error if the stored id lists disagree with
    /// the counts.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        date_time: DateTime<Utc>,
        chapter: String,
        difficulty: String,
        total_questions: u32,
        correct_answers: u32,
        wrong_answers: u32,
        skipped_questions: u32,
        time_taken_secs: i64,
        questions_answered: Vec<QuestionId>,
        correct_ids: Vec<QuestionId>,
        wrong_ids: Vec<QuestionId>,
        skipped_ids: Vec<QuestionId>,
    ) -> Result<Self, AttemptError> {
        if correct_answers + wrong_answers + skipped_questions != total_questions {
            return Err(AttemptError::CountMismatch {
                total: total_questions,
                correct: correct_answers,
                wrong: wrong_answers,
                skipped: skipped_questions,
            });
        }

        let attempt = Self::from_outcomes(
            date_time,
            chapter,
            difficulty,
            time_taken_secs,
            questions_answered,
            correct_ids,
            wrong_ids,
            skipped_ids,
        )?;

        if attempt.total_questions != total_questions
            || attempt.correct_answers != correct_answers
            || attempt.wrong_answers != wrong_answers
            || attempt.skipped_questions != skipped_questions
        {
            return Err(AttemptError::CountMismatch {
                total: total_questions,
                correct: correct_answers,
                wrong: wrong_answers,
                skipped: skipped_questions,
            });
        }

        Ok(attempt)
    }

    #[must_use]
    pub fn date_time(&self) -> DateTime<Utc> {
        self.date_time
    }

    #[must_use]
    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    /// Difficulty label of the session ("Easy", "Medium", "Hard" or "Mixed").
    #[must_use]
    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn wrong_answers(&self) -> u32 {
        self.wrong_answers
    }

    #[must_use]
    pub fn skipped_questions(&self) -> u32 {
        self.skipped_questions
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> i64 {
        self.time_taken_secs
    }

    /// Score percentage in 0..=100. Score and percentage are the same value
    /// by construction.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    #[must_use]
    pub fn questions_answered(&self) -> &[QuestionId] {
        &self.questions_answered
    }

    #[must_use]
    pub fn correct_ids(&self) -> &[QuestionId] {
        &self.correct_ids
    }

    #[must_use]
    pub fn wrong_ids(&self) -> &[QuestionId] {
        &self.wrong_ids
    }

    #[must_use]
    pub fn skipped_ids(&self) -> &[QuestionId] {
        &self.skipped_ids
    }

    /// Share of shown questions that received an answer (correct or wrong).
    #[must_use]
    pub fn completion_rate(&self) -> f64 {
        if self.total_questions > 0 {
            f64::from(self.correct_answers + self.wrong_answers)
                / f64::from(self.total_questions)
                * 100.0
        } else {
            0.0
        }
    }
}

/// An attempt paired with its storage-generated id.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub attempt: Attempt,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: AttemptId, attempt: Attempt) -> Self {
        Self { id, attempt }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn ids(range: std::ops::Range<u64>) -> Vec<QuestionId> {
        range.map(QuestionId::new).collect()
    }

    #[test]
    fn counts_partition_the_answered_set() {
        let attempt = Attempt::from_outcomes(
            fixed_now(),
            "Epidemiology",
            "Mixed",
            120,
            ids(1..11),
            ids(1..9),
            ids(9..10),
            ids(10..11),
        )
        .unwrap();

        assert_eq!(attempt.total_questions(), 10);
        assert_eq!(
            attempt.correct_answers() + attempt.wrong_answers() + attempt.skipped_questions(),
            attempt.total_questions()
        );
        assert!((attempt.percentage() - 80.0).abs() < f64::EPSILON);
        assert!((attempt.completion_rate() - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_attempt_has_zero_percentage() {
        let attempt = Attempt::from_outcomes(
            fixed_now(),
            "Demography",
            "Easy",
            0,
            vec![],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        assert_eq!(attempt.percentage(), 0.0);
    }

    #[test]
    fn overlapping_outcome_lists_are_rejected() {
        let err = Attempt::from_outcomes(
            fixed_now(),
            "Biostatistics",
            "Hard",
            30,
            ids(1..3),
            ids(1..3),
            ids(2..3),
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::PartitionMismatch);
    }

    #[test]
    fn incomplete_partition_is_rejected() {
        let err = Attempt::from_outcomes(
            fixed_now(),
            "Biostatistics",
            "Hard",
            30,
            ids(1..4),
            ids(1..2),
            vec![],
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::PartitionMismatch);
    }

    #[test]
    fn persisted_counts_must_add_up() {
        let err = Attempt::from_persisted(
            fixed_now(),
            "Epidemiology".into(),
            "Easy".into(),
            10,
            8,
            1,
            0, // should be 1
            60,
            ids(1..11),
            ids(1..9),
            ids(9..10),
            ids(10..11),
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::CountMismatch { .. }));
    }

    #[test]
    fn negative_elapsed_is_rejected() {
        let err = Attempt::from_outcomes(
            fixed_now(),
            "Epidemiology",
            "Easy",
            -1,
            vec![],
            vec![],
            vec![],
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::NegativeElapsed);
    }
}
