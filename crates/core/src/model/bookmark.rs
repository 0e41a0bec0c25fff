use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{BookmarkId, QuestionId};
use crate::model::question::{AnswerOption, Difficulty, Question};

/// A user annotation pinning one question.
///
/// The question text and options are snapshotted at bookmark time and are
/// deliberately *not* kept in sync with later edits or reseeds of the
/// question bank: a bookmark records what the user actually saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub question_id: QuestionId,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub chapter: String,
    pub difficulty: Difficulty,
    pub note: Option<String>,
    pub tag: Option<String>,
    pub date_bookmarked: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub review_count: u32,
}

impl Bookmark {
    /// Snapshot `question` into a new bookmark.
    #[must_use]
    pub fn snapshot(question: &Question, now: DateTime<Utc>) -> Self {
        Self {
            id: BookmarkId::generate(),
            question_id: question.id,
            question_text: question.text.clone(),
            option_a: question.option_a.clone(),
            option_b: question.option_b.clone(),
            option_c: question.option_c.clone(),
            option_d: question.option_d.clone(),
            correct_answer: question.correct_answer,
            chapter: question.chapter.clone(),
            difficulty: question.difficulty,
            note: None,
            tag: None,
            date_bookmarked: now,
            last_reviewed: None,
            review_count: 0,
        }
    }

    /// The snapshotted option texts in display order.
    #[must_use]
    pub fn options(&self) -> [&str; 4] {
        [&self.option_a, &self.option_b, &self.option_c, &self.option_d]
    }

    /// Record one explicit review of this bookmark.
    pub fn mark_reviewed(&mut self, now: DateTime<Utc>) {
        self.review_count = self.review_count.saturating_add(1);
        self.last_reviewed = Some(now);
    }
}
