use std::sync::Arc;

use quiz_core::model::{Bookmark, BookmarkId, QuestionId};
use storage::repository::{BookmarkRepository, QuestionRepository, StorageError};

use crate::Clock;
use crate::error::BookmarkError;

/// Manages question bookmarks: content snapshots plus user annotations.
///
/// At most one bookmark exists per question; the question row's
/// `is_bookmarked` flag is kept in step with the bookmark table on every
/// add and remove.
#[derive(Clone)]
pub struct BookmarkService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    bookmarks: Arc<dyn BookmarkRepository>,
}

impl BookmarkService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        bookmarks: Arc<dyn BookmarkRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            bookmarks,
        }
    }

    /// Bookmark a question, snapshotting its current content.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkError::AlreadyBookmarked` if the question already
    /// has a bookmark, or `BookmarkError::Storage` for repository failures
    /// (including an unknown question id).
    pub async fn add_bookmark(&self, question_id: QuestionId) -> Result<Bookmark, BookmarkError> {
        if self.bookmarks.find_by_question(question_id).await?.is_some() {
            return Err(BookmarkError::AlreadyBookmarked(question_id));
        }

        let question = self.questions.get_question(question_id).await?;
        let bookmark = Bookmark::snapshot(&question, self.clock.now());
        self.bookmarks.upsert_bookmark(&bookmark).await?;
        self.questions.set_bookmarked(question_id, true).await?;
        Ok(bookmark)
    }

    /// Remove a bookmark by id, clearing the question's flag.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkError::Storage` wrapping `NotFound` for an unknown
    /// id.
    pub async fn remove_bookmark(&self, id: BookmarkId) -> Result<(), BookmarkError> {
        let bookmark = self.bookmarks.get_bookmark(id).await?;
        self.bookmarks.delete_bookmark(id).await?;
        // The question may have been removed by a reseed; a missing row
        // only means there is no flag left to clear.
        match self
            .questions
            .set_bookmarked(bookmark.question_id, false)
            .await
        {
            Ok(()) | Err(StorageError::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Flip the bookmark state for a question, returning whether it is now
    /// bookmarked.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkError::Storage` for repository failures.
    pub async fn toggle_bookmark(&self, question_id: QuestionId) -> Result<bool, BookmarkError> {
        match self.bookmarks.find_by_question(question_id).await? {
            Some(existing) => {
                self.remove_bookmark(existing.id).await?;
                Ok(false)
            }
            None => {
                self.add_bookmark(question_id).await?;
                Ok(true)
            }
        }
    }

    /// Replace the free-text note on a bookmark.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkError::Storage` for repository failures.
    pub async fn update_note(
        &self,
        id: BookmarkId,
        note: Option<String>,
    ) -> Result<Bookmark, BookmarkError> {
        let mut bookmark = self.bookmarks.get_bookmark(id).await?;
        bookmark.note = note;
        self.bookmarks.upsert_bookmark(&bookmark).await?;
        Ok(bookmark)
    }

    /// Replace the tag on a bookmark.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkError::Storage` for repository failures.
    pub async fn update_tag(
        &self,
        id: BookmarkId,
        tag: Option<String>,
    ) -> Result<Bookmark, BookmarkError> {
        let mut bookmark = self.bookmarks.get_bookmark(id).await?;
        bookmark.tag = tag;
        self.bookmarks.upsert_bookmark(&bookmark).await?;
        Ok(bookmark)
    }

    /// Record one explicit review of a bookmark.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkError::Storage` for repository failures.
    pub async fn mark_reviewed(&self, id: BookmarkId) -> Result<Bookmark, BookmarkError> {
        let mut bookmark = self.bookmarks.get_bookmark(id).await?;
        bookmark.mark_reviewed(self.clock.now());
        self.bookmarks.upsert_bookmark(&bookmark).await?;
        Ok(bookmark)
    }

    /// All bookmarks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BookmarkError::Storage` for repository failures.
    pub async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, BookmarkError> {
        Ok(self.bookmarks.list_bookmarks().await?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerOption, Difficulty, NewQuestion};
    use quiz_core::time::fixed_clock;
    use storage::repository::Storage;

    fn service_with(storage: &Storage) -> BookmarkService {
        BookmarkService::new(
            fixed_clock(),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.bookmarks),
        )
    }

    async fn insert_question(storage: &Storage) -> QuestionId {
        storage
            .questions
            .insert_question(&NewQuestion {
                text: "Sensitivity measures what?".into(),
                option_a: "True positives found".into(),
                option_b: "True negatives found".into(),
                option_c: "False positives".into(),
                option_d: "Prevalence".into(),
                correct_answer: AnswerOption::A,
                explanation: "Sensitivity is the true positive rate.".into(),
                chapter: "Epidemiology".into(),
                difficulty: Difficulty::Medium,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn add_snapshots_and_flags_the_question() {
        let storage = Storage::in_memory();
        let id = insert_question(&storage).await;
        let service = service_with(&storage);

        let bookmark = service.add_bookmark(id).await.unwrap();
        assert_eq!(bookmark.question_id, id);
        assert_eq!(bookmark.question_text, "Sensitivity measures what?");

        let question = storage.questions.get_question(id).await.unwrap();
        assert!(question.is_bookmarked);

        let err = service.add_bookmark(id).await.unwrap_err();
        assert!(matches!(err, BookmarkError::AlreadyBookmarked(q) if q == id));
    }

    #[tokio::test]
    async fn remove_clears_the_question_flag() {
        let storage = Storage::in_memory();
        let id = insert_question(&storage).await;
        let service = service_with(&storage);

        let bookmark = service.add_bookmark(id).await.unwrap();
        service.remove_bookmark(bookmark.id).await.unwrap();

        let question = storage.questions.get_question(id).await.unwrap();
        assert!(!question.is_bookmarked);
        assert!(service.list_bookmarks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_flips_state() {
        let storage = Storage::in_memory();
        let id = insert_question(&storage).await;
        let service = service_with(&storage);

        assert!(service.toggle_bookmark(id).await.unwrap());
        assert!(!service.toggle_bookmark(id).await.unwrap());
        assert!(service.toggle_bookmark(id).await.unwrap());
    }

    #[tokio::test]
    async fn annotations_survive_updates() {
        let storage = Storage::in_memory();
        let id = insert_question(&storage).await;
        let service = service_with(&storage);

        let bookmark = service.add_bookmark(id).await.unwrap();
        service
            .update_note(bookmark.id, Some("revise".into()))
            .await
            .unwrap();
        service
            .update_tag(bookmark.id, Some("high-yield".into()))
            .await
            .unwrap();
        let reviewed = service.mark_reviewed(bookmark.id).await.unwrap();

        assert_eq!(reviewed.note.as_deref(), Some("revise"));
        assert_eq!(reviewed.tag.as_deref(), Some("high-yield"));
        assert_eq!(reviewed.review_count, 1);
        assert!(reviewed.last_reviewed.is_some());
    }
}
