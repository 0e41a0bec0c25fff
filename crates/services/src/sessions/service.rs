use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

use quiz_core::model::{
    AnswerOption, Attempt, AttemptId, DifficultyFilter, Question, QuestionId,
};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// How one shown question was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOutcome {
    Correct,
    Wrong,
    Skipped,
}

/// What the user sees right after submitting an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub selected: AnswerOption,
    pub correct_answer: AnswerOption,
    pub is_correct: bool,
    pub explanation: String,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory quiz session over a fixed question list.
///
/// The session steps through its questions, recording exactly one outcome
/// per question. Navigation may revisit questions, but a resolved question
/// never changes outcome. Timing is caller-supplied so the whole engine is
/// deterministic under a fixed clock.
pub struct QuizSession {
    chapter: String,
    difficulty: DifficultyFilter,
    questions: Vec<Question>,
    current: usize,
    selections: HashMap<usize, AnswerOption>,
    outcomes: HashMap<usize, QuestionOutcome>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    attempt_id: Option<AttemptId>,
}

impl QuizSession {
    /// Create a session over the given questions.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` if the question list is empty.
    pub fn new(
        chapter: impl Into<String>,
        difficulty: DifficultyFilter,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        Ok(Self {
            chapter: chapter.into(),
            difficulty,
            questions,
            current: 0,
            selections: HashMap::new(),
            outcomes: HashMap::new(),
            started_at,
            completed_at: None,
            attempt_id: None,
        })
    }

    #[must_use]
    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    #[must_use]
    pub fn difficulty(&self) -> DifficultyFilter {
        self.difficulty
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt_id
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Number of questions resolved as answered (correct or wrong).
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| !matches!(o, QuestionOutcome::Skipped))
            .count()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, QuestionOutcome::Skipped))
            .count()
    }

    /// Number of questions without an outcome yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.outcomes.len())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total_questions(),
            answered: self.answered_count(),
            skipped: self.skipped_count(),
            remaining: self.remaining(),
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    /// Countdown length for the current question, driven by its difficulty
    /// tag.
    #[must_use]
    pub fn current_time_limit_secs(&self) -> Option<u32> {
        self.current_question().map(Question::time_limit_secs)
    }

    /// The pending (not yet submitted) selection for the current question.
    #[must_use]
    pub fn selected_answer(&self) -> Option<AnswerOption> {
        self.selections.get(&self.current).copied()
    }

    #[must_use]
    pub fn outcome_at(&self, index: usize) -> Option<QuestionOutcome> {
        self.outcomes.get(&index).copied()
    }

    /// Select (or change) the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after completion and
    /// `SessionError::AlreadyResolved` if this question already has an
    /// outcome.
    pub fn select_answer(&mut self, option: AnswerOption) -> Result<(), SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if self.outcomes.contains_key(&self.current) {
            return Err(SessionError::AlreadyResolved);
        }
        self.selections.insert(self.current, option);
        Ok(())
    }

    /// Drop the pending selection for the current question.
    pub fn clear_selection(&mut self) {
        self.selections.remove(&self.current);
    }

    /// Submit the pending selection for the current question, recording the
    /// outcome and advancing to the next unresolved question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingSelected` without a pending selection,
    /// `SessionError::AlreadyResolved` if the question already has an
    /// outcome, and `SessionError::Completed` after completion.
    pub fn submit_answer(&mut self, now: DateTime<Utc>) -> Result<AnswerFeedback, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if self.outcomes.contains_key(&self.current) {
            return Err(SessionError::AlreadyResolved);
        }
        let selected = self.selected_answer().ok_or(SessionError::NothingSelected)?;

        let question = &self.questions[self.current];
        let is_correct = question.is_correct(selected);
        let feedback = AnswerFeedback {
            question_id: question.id,
            selected,
            correct_answer: question.correct_answer,
            is_correct,
            explanation: question.explanation.clone(),
        };

        let outcome = if is_correct {
            QuestionOutcome::Correct
        } else {
            QuestionOutcome::Wrong
        };
        self.record_outcome(outcome, now);
        Ok(feedback)
    }

    /// Resolve the current question as skipped and advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyResolved` if the question already has
    /// an outcome, `SessionError::Completed` after completion.
    pub fn skip_current(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if self.outcomes.contains_key(&self.current) {
            return Err(SessionError::AlreadyResolved);
        }
        self.selections.remove(&self.current);
        self.record_outcome(QuestionOutcome::Skipped, now);
        Ok(())
    }

    /// Timer expiry resolution: a pending selection is submitted on the
    /// user's behalf, otherwise the question is skipped. A no-op after
    /// completion.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError::AlreadyResolved` for a stale expiry on an
    /// already resolved question.
    pub fn handle_timer_expiry(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Option<AnswerFeedback>, SessionError> {
        if self.is_complete() {
            return Ok(None);
        }
        if self.selected_answer().is_some() {
            return self.submit_answer(now).map(Some);
        }
        self.skip_current(now)?;
        Ok(None)
    }

    /// Move forward one question, if there is one.
    pub fn next(&mut self) {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
    }

    /// Move back one question, if there is one.
    pub fn previous(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    fn record_outcome(&mut self, outcome: QuestionOutcome, now: DateTime<Utc>) {
        self.outcomes.insert(self.current, outcome);

        if self.outcomes.len() >= self.questions.len() {
            self.completed_at = Some(now);
            return;
        }

        // Advance to the next unresolved question, wrapping past the end
        // so revisited skips still resolve in order.
        for step in 1..=self.questions.len() {
            let candidate = (self.current + step) % self.questions.len();
            if !self.outcomes.contains_key(&candidate) {
                self.current = candidate;
                return;
            }
        }
    }

    /// Finalize the session into an immutable attempt record.
    ///
    /// Questions never resolved count as skipped, so the attempt's outcome
    /// lists always partition the shown list. Completes the session if it
    /// was abandoned early; elapsed time is whole seconds from start to
    /// completion.
    ///
    /// # Errors
    ///
    /// Propagates `AttemptError` if the recorded outcomes cannot form a
    /// valid attempt.
    pub fn build_attempt(&mut self, now: DateTime<Utc>) -> Result<Attempt, SessionError> {
        let completed_at = *self.completed_at.get_or_insert(now);

        let mut correct_ids = Vec::new();
        let mut wrong_ids = Vec::new();
        let mut skipped_ids = Vec::new();
        let mut all_ids = Vec::with_capacity(self.questions.len());

        for (index, question) in self.questions.iter().enumerate() {
            all_ids.push(question.id);
            match self.outcomes.get(&index) {
                Some(QuestionOutcome::Correct) => correct_ids.push(question.id),
                Some(QuestionOutcome::Wrong) => wrong_ids.push(question.id),
                Some(QuestionOutcome::Skipped) | None => skipped_ids.push(question.id),
            }
        }

        let elapsed = (completed_at - self.started_at).num_seconds().max(0);

        Ok(Attempt::from_outcomes(
            completed_at,
            self.chapter.clone(),
            self.difficulty.as_str(),
            elapsed,
            all_ids,
            correct_ids,
            wrong_ids,
            skipped_ids,
        )?)
    }

    pub(crate) fn set_attempt_id(&mut self, id: AttemptId) {
        self.attempt_id = Some(id);
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("chapter", &self.chapter)
            .field("difficulty", &self.difficulty)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("outcomes_len", &self.outcomes.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .field("attempt_id", &self.attempt_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Difficulty, NewQuestion};
    use quiz_core::time::fixed_now;

    fn build_question(id: u64, correct: AnswerOption) -> Question {
        Question::seeded(
            QuestionId::new(id),
            NewQuestion {
                text: format!("Q{id}"),
                option_a: "A text".into(),
                option_b: "B text".into(),
                option_c: "C text".into(),
                option_d: "D text".into(),
                correct_answer: correct,
                explanation: format!("Because {correct}."),
                chapter: "Epidemiology".into(),
                difficulty: Difficulty::Medium,
            },
        )
    }

    fn build_session(count: u64) -> QuizSession {
        let questions = (1..=count)
            .map(|id| build_question(id, AnswerOption::B))
            .collect();
        QuizSession::new(
            "Epidemiology",
            DifficultyFilter::Mixed,
            questions,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_session_returns_error() {
        let err = QuizSession::new(
            "Epidemiology",
            DifficultyFilter::Mixed,
            Vec::new(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::NoQuestions));
    }

    #[test]
    fn submit_requires_selection() {
        let mut session = build_session(2);
        let err = session.submit_answer(fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::NothingSelected));
    }

    #[test]
    fn answer_check_reports_correctness_and_explanation() {
        let mut session = build_session(1);
        session.select_answer(AnswerOption::C).unwrap();
        // changing the selection before submit is allowed
        session.select_answer(AnswerOption::B).unwrap();

        let feedback = session.submit_answer(fixed_now()).unwrap();
        assert!(feedback.is_correct);
        assert_eq!(feedback.correct_answer, AnswerOption::B);
        assert_eq!(feedback.explanation, "Because B.");
        assert!(session.is_complete());
    }

    #[test]
    fn wrong_answer_records_wrong_outcome() {
        let mut session = build_session(2);
        session.select_answer(AnswerOption::A).unwrap();
        let feedback = session.submit_answer(fixed_now()).unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(session.outcome_at(0), Some(QuestionOutcome::Wrong));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn session_completes_when_every_question_resolves() {
        let mut session = build_session(3);

        session.select_answer(AnswerOption::B).unwrap();
        session.submit_answer(fixed_now()).unwrap();
        session.skip_current(fixed_now()).unwrap();
        assert!(!session.is_complete());

        session.select_answer(AnswerOption::B).unwrap();
        let done_at = fixed_now() + Duration::seconds(90);
        session.submit_answer(done_at).unwrap();

        assert!(session.is_complete());
        assert_eq!(session.completed_at(), Some(done_at));
        assert_eq!(session.progress().answered, 2);
        assert_eq!(session.progress().skipped, 1);
        assert_eq!(session.progress().remaining, 0);
    }

    #[test]
    fn resolved_question_cannot_change_outcome() {
        let mut session = build_session(2);
        session.select_answer(AnswerOption::B).unwrap();
        session.submit_answer(fixed_now()).unwrap();

        session.previous();
        assert!(matches!(
            session.select_answer(AnswerOption::A),
            Err(SessionError::AlreadyResolved)
        ));
        assert!(matches!(
            session.skip_current(fixed_now()),
            Err(SessionError::AlreadyResolved)
        ));
        assert_eq!(session.outcome_at(0), Some(QuestionOutcome::Correct));
    }

    #[test]
    fn timer_expiry_submits_pending_selection() {
        let mut session = build_session(2);
        session.select_answer(AnswerOption::B).unwrap();

        let feedback = session.handle_timer_expiry(fixed_now()).unwrap();
        assert!(feedback.unwrap().is_correct);
        assert_eq!(session.outcome_at(0), Some(QuestionOutcome::Correct));
    }

    #[test]
    fn timer_expiry_skips_without_selection() {
        let mut session = build_session(2);
        let feedback = session.handle_timer_expiry(fixed_now()).unwrap();
        assert!(feedback.is_none());
        assert_eq!(session.outcome_at(0), Some(QuestionOutcome::Skipped));
    }

    #[test]
    fn timer_expiry_is_noop_after_completion() {
        let mut session = build_session(1);
        session.skip_current(fixed_now()).unwrap();
        assert!(session.is_complete());

        let result = session.handle_timer_expiry(fixed_now()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn navigation_preserves_selection_per_question() {
        let mut session = build_session(3);
        session.select_answer(AnswerOption::D).unwrap();
        session.next();
        assert_eq!(session.selected_answer(), None);
        session.previous();
        assert_eq!(session.selected_answer(), Some(AnswerOption::D));
    }

    #[test]
    fn advancing_wraps_to_earlier_unresolved_question() {
        let mut session = build_session(3);
        session.next();
        session.skip_current(fixed_now()).unwrap(); // resolves index 1
        session.next();
        session.skip_current(fixed_now()).unwrap(); // resolves index 2, wraps to 0
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn build_attempt_counts_unvisited_as_skipped() {
        let mut session = build_session(4);
        session.select_answer(AnswerOption::B).unwrap();
        session.submit_answer(fixed_now()).unwrap();
        session.select_answer(AnswerOption::A).unwrap();
        session.submit_answer(fixed_now()).unwrap();

        let finished_at = fixed_now() + Duration::seconds(125);
        let attempt = session.build_attempt(finished_at).unwrap();

        assert_eq!(attempt.total_questions(), 4);
        assert_eq!(attempt.correct_answers(), 1);
        assert_eq!(attempt.wrong_answers(), 1);
        assert_eq!(attempt.skipped_questions(), 2);
        assert_eq!(attempt.time_taken_secs(), 125);
        assert_eq!(attempt.difficulty(), "Mixed");
        assert!((attempt.percentage() - 25.0).abs() < f64::EPSILON);
        assert!(session.is_complete());
    }

    #[test]
    fn elapsed_time_uses_completion_instant() {
        let mut session = build_session(1);
        session.select_answer(AnswerOption::B).unwrap();
        let done_at = fixed_now() + Duration::seconds(42);
        session.submit_answer(done_at).unwrap();

        // build later; elapsed still measures start to completion
        let attempt = session.build_attempt(done_at + Duration::hours(1)).unwrap();
        assert_eq!(attempt.time_taken_secs(), 42);
    }
}
