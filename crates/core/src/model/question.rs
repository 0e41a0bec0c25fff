use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("invalid answer option: {0}")]
    InvalidOption(String),

    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("times_correct ({correct}) exceeds times_answered ({answered})")]
    CounterMismatch { correct: u32, answered: u32 },
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tag carried by every bank question.
///
/// The tag drives the per-question time limit: harder questions get less
/// time, matching exam pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Per-question time limit in seconds.
    #[must_use]
    pub fn time_limit_secs(self) -> u32 {
        match self {
            Difficulty::Easy => 60,
            Difficulty::Medium => 45,
            Difficulty::Hard => 30,
        }
    }

    /// Storage/display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(QuestionError::InvalidDifficulty(s.to_string())),
        }
    }
}

/// Session-level difficulty selection: a single difficulty, or `Mixed`
/// which draws from the whole chapter regardless of tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyFilter {
    Mixed,
    Only(Difficulty),
}

impl DifficultyFilter {
    /// The concrete difficulty, if any.
    #[must_use]
    pub fn difficulty(self) -> Option<Difficulty> {
        match self {
            DifficultyFilter::Mixed => None,
            DifficultyFilter::Only(d) => Some(d),
        }
    }

    /// Label used on attempts and for display ("Mixed", "Easy", ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyFilter::Mixed => "Mixed",
            DifficultyFilter::Only(d) => d.as_str(),
        }
    }
}

impl fmt::Display for DifficultyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyFilter {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("mixed") {
            Ok(DifficultyFilter::Mixed)
        } else {
            s.parse().map(DifficultyFilter::Only)
        }
    }
}

//
// ─── ANSWER OPTION ─────────────────────────────────────────────────────────────
//

/// One of the four answer slots of a multiple-choice question.
///
/// Parsing is case-insensitive; comparing two parsed options is therefore
/// the case-insensitive answer check the quiz engine relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    /// Zero-based index into the option list.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            AnswerOption::A => 0,
            AnswerOption::B => 1,
            AnswerOption::C => 2,
            AnswerOption::D => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerOption {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            "D" => Ok(AnswerOption::D),
            _ => Err(QuestionError::InvalidOption(s.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A bank question with its running answer counters.
///
/// Created once at content-seeding time; counters are bumped on every
/// submitted answer and the row is never deleted in normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub explanation: String,
    pub chapter: String,
    pub difficulty: Difficulty,

    // Progress tracking
    pub times_answered: u32,
    pub times_correct: u32,
    pub last_answered: Option<DateTime<Utc>>,
    pub is_bookmarked: bool,
}

impl Question {
    /// Builds a freshly seeded question with zero counters.
    #[must_use]
    pub fn seeded(id: QuestionId, draft: NewQuestion) -> Self {
        Self {
            id,
            text: draft.text,
            option_a: draft.option_a,
            option_b: draft.option_b,
            option_c: draft.option_c,
            option_d: draft.option_d,
            correct_answer: draft.correct_answer,
            explanation: draft.explanation,
            chapter: draft.chapter,
            difficulty: draft.difficulty,
            times_answered: 0,
            times_correct: 0,
            last_answered: None,
            is_bookmarked: false,
        }
    }

    /// The four option texts in display order.
    #[must_use]
    pub fn options(&self) -> [&str; 4] {
        [&self.option_a, &self.option_b, &self.option_c, &self.option_d]
    }

    /// Option text for a given answer slot.
    #[must_use]
    pub fn option_text(&self, option: AnswerOption) -> &str {
        self.options()[option.index()]
    }

    /// Time limit in seconds, derived from the difficulty tag.
    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.difficulty.time_limit_secs()
    }

    /// True if `selected` matches the correct option.
    #[must_use]
    pub fn is_correct(&self, selected: AnswerOption) -> bool {
        selected == self.correct_answer
    }

    /// Record one submitted answer, bumping the running counters.
    ///
    /// `times_correct <= times_answered` holds afterwards by construction.
    pub fn record_answer(&mut self, correct: bool, at: DateTime<Utc>) {
        self.times_answered = self.times_answered.saturating_add(1);
        if correct {
            self.times_correct = self.times_correct.saturating_add(1);
        }
        self.last_answered = Some(at);
    }

    /// Lifetime accuracy for this question, as a percentage (0 when never
    /// answered).
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.times_answered > 0 {
            f64::from(self.times_correct) / f64::from(self.times_answered) * 100.0
        } else {
            0.0
        }
    }

    /// Validates the counter invariant for rows rehydrated from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::CounterMismatch` if `times_correct` exceeds
    /// `times_answered`.
    pub fn validate_counters(&self) -> Result<(), QuestionError> {
        if self.times_correct > self.times_answered {
            return Err(QuestionError::CounterMismatch {
                correct: self.times_correct,
                answered: self.times_answered,
            });
        }
        Ok(())
    }
}

/// Unsaved question draft, as supplied by a content provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub explanation: String,
    pub chapter: String,
    pub difficulty: Difficulty,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
