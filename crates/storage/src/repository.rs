use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Attempt, AttemptId, AttemptRow, Bookmark, BookmarkId, ChapterProgress, Difficulty, NewQuestion,
    Question, QuestionId,
};
use rand::rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a seeded question, returning the generated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(&self, draft: &NewQuestion) -> Result<QuestionId, StorageError>;

    /// Fetch one question by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError>;

    /// Fetch several questions by id. Missing ids are an error; order
    /// follows the input.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any are missing.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;

    /// Up to `count` random questions from a chapter, optionally filtered
    /// by difficulty, without replacement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure. An empty result is not an
    /// error at this layer.
    async fn random_questions(
        &self,
        chapter: &str,
        difficulty: Option<Difficulty>,
        count: u32,
    ) -> Result<Vec<Question>, StorageError>;

    /// Number of bank questions in a chapter, optionally per difficulty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn count_questions(
        &self,
        chapter: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<u32, StorageError>;

    /// Monotonic counter bump for one submitted answer: `times_answered`
    /// always increments, `times_correct` only when correct.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown id.
    async fn record_answer(
        &self,
        id: QuestionId,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Persistently set the question's bookmarked flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown id.
    async fn set_bookmarked(&self, id: QuestionId, bookmarked: bool) -> Result<(), StorageError>;

    /// All questions currently flagged as bookmarked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_bookmarked(&self) -> Result<Vec<Question>, StorageError>;
}

/// Append-only attempt history.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a finalized attempt, returning its generated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &Attempt) -> Result<AttemptId, StorageError>;

    /// Fetch one attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRow, StorageError>;

    /// Full history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_attempts(&self) -> Result<Vec<AttemptRow>, StorageError>;

    /// Chapter history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_attempts_by_chapter(&self, chapter: &str)
    -> Result<Vec<AttemptRow>, StorageError>;
}

/// One mutable aggregate row per chapter.
///
/// Updates are whole-row upserts computed from a pre-update snapshot, so a
/// failed write leaves the stored row untouched.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert or replace a chapter's aggregate row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_progress(&self, progress: &ChapterProgress) -> Result<(), StorageError>;

    /// Fetch one chapter's row, if it exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn get_progress(&self, chapter: &str) -> Result<Option<ChapterProgress>, StorageError>;

    /// All chapter rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_progress(&self) -> Result<Vec<ChapterProgress>, StorageError>;
}

/// User bookmarks (question snapshots).
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Insert or update a bookmark.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bookmark cannot be stored.
    async fn upsert_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError>;

    /// Remove a bookmark.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown id.
    async fn delete_bookmark(&self, id: BookmarkId) -> Result<(), StorageError>;

    /// Fetch one bookmark by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_bookmark(&self, id: BookmarkId) -> Result<Bookmark, StorageError>;

    /// The bookmark pinning a given question, if any. At most one exists
    /// in normal use; this is enforced by the bookmark service, not here.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn find_by_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<Bookmark>, StorageError>;

    /// All bookmarks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StorageError>;
}

/// Aggregates the four repositories behind trait objects for easy backend
/// swapping. Built once at startup and injected into each service.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub bookmarks: Arc<dyn BookmarkRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let bookmarks: Arc<dyn BookmarkRepository> = Arc::new(repo);
        Self {
            questions,
            attempts,
            progress,
            bookmarks,
        }
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
    progress: Arc<Mutex<HashMap<String, ChapterProgress>>>,
    bookmarks: Arc<Mutex<HashMap<BookmarkId, Bookmark>>>,
    next_question_id: Arc<AtomicU64>,
    next_attempt_id: Arc<AtomicU64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_question_id: Arc::new(AtomicU64::new(1)),
            next_attempt_id: Arc::new(AtomicU64::new(1)),
            ..Self::default()
        }
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(&self, draft: &NewQuestion) -> Result<QuestionId, StorageError> {
        let id = QuestionId::new(self.next_question_id.fetch_add(1, Ordering::SeqCst));
        let mut guard = self.questions.lock().map_err(lock_err)?;
        guard.insert(id, Question::seeded(id, draft.clone()));
        Ok(id)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match guard.get(id) {
                Some(question) => out.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(out)
    }

    async fn random_questions(
        &self,
        chapter: &str,
        difficulty: Option<Difficulty>,
        count: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let mut matching: Vec<Question> = guard
            .values()
            .filter(|q| q.chapter == chapter)
            .filter(|q| difficulty.is_none_or(|d| q.difficulty == d))
            .cloned()
            .collect();
        drop(guard);

        matching.shuffle(&mut rng());
        matching.truncate(usize::try_from(count).unwrap_or(usize::MAX));
        Ok(matching)
    }

    async fn count_questions(
        &self,
        chapter: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<u32, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let count = guard
            .values()
            .filter(|q| q.chapter == chapter)
            .filter(|q| difficulty.is_none_or(|d| q.difficulty == d))
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }

    async fn record_answer(
        &self,
        id: QuestionId,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(lock_err)?;
        let question = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        question.record_answer(correct, at);
        Ok(())
    }

    async fn set_bookmarked(&self, id: QuestionId, bookmarked: bool) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(lock_err)?;
        let question = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        question.is_bookmarked = bookmarked;
        Ok(())
    }

    async fn list_bookmarked(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let mut out: Vec<Question> = guard.values().filter(|q| q.is_bookmarked).cloned().collect();
        out.sort_by_key(|q| std::cmp::Reverse(q.last_answered));
        Ok(out)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &Attempt) -> Result<AttemptId, StorageError> {
        let id = AttemptId::new(self.next_attempt_id.fetch_add(1, Ordering::SeqCst));
        let mut guard = self.attempts.lock().map_err(lock_err)?;
        guard.push(AttemptRow::new(id, attempt.clone()));
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRow, StorageError> {
        let guard = self.attempts.lock().map_err(lock_err)?;
        guard
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempts(&self) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self.attempts.lock().map_err(lock_err)?;
        let mut out = guard.clone();
        out.sort_by_key(|row| std::cmp::Reverse((row.attempt.date_time(), row.id)));
        Ok(out)
    }

    async fn list_attempts_by_chapter(
        &self,
        chapter: &str,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let mut out = self.list_attempts().await?;
        out.retain(|row| row.attempt.chapter() == chapter);
        Ok(out)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, progress: &ChapterProgress) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(lock_err)?;
        guard.insert(progress.chapter_name.clone(), progress.clone());
        Ok(())
    }

    async fn get_progress(&self, chapter: &str) -> Result<Option<ChapterProgress>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        Ok(guard.get(chapter).cloned())
    }

    async fn list_progress(&self) -> Result<Vec<ChapterProgress>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        let mut out: Vec<ChapterProgress> = guard.values().cloned().collect();
        out.sort_by(|a, b| a.chapter_name.cmp(&b.chapter_name));
        Ok(out)
    }
}

#[async_trait]
impl BookmarkRepository for InMemoryRepository {
    async fn upsert_bookmark(&self, bookmark: &Bookmark) -> Result<(), StorageError> {
        let mut guard = self.bookmarks.lock().map_err(lock_err)?;
        guard.insert(bookmark.id, bookmark.clone());
        Ok(())
    }

    async fn delete_bookmark(&self, id: BookmarkId) -> Result<(), StorageError> {
        let mut guard = self.bookmarks.lock().map_err(lock_err)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }

    async fn get_bookmark(&self, id: BookmarkId) -> Result<Bookmark, StorageError> {
        let guard = self.bookmarks.lock().map_err(lock_err)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn find_by_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Option<Bookmark>, StorageError> {
        let guard = self.bookmarks.lock().map_err(lock_err)?;
        Ok(guard
            .values()
            .find(|b| b.question_id == question_id)
            .cloned())
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StorageError> {
        let guard = self.bookmarks.lock().map_err(lock_err)?;
        let mut out: Vec<Bookmark> = guard.values().cloned().collect();
        out.sort_by_key(|b| std::cmp::Reverse(b.date_bookmarked));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::AnswerOption;
    use quiz_core::time::fixed_now;

    fn draft(chapter: &str, difficulty: Difficulty) -> NewQuestion {
        NewQuestion {
            text: "Q".into(),
            option_a: "1".into(),
            option_b: "2".into(),
            option_c: "3".into(),
            option_d: "4".into(),
            correct_answer: AnswerOption::A,
            explanation: "E".into(),
            chapter: chapter.into(),
            difficulty,
        }
    }

    #[tokio::test]
    async fn random_questions_filters_and_caps() {
        let repo = InMemoryRepository::new();
        for _ in 0..4 {
            repo.insert_question(&draft("Epidemiology", Difficulty::Easy))
                .await
                .unwrap();
        }
        repo.insert_question(&draft("Epidemiology", Difficulty::Hard))
            .await
            .unwrap();
        repo.insert_question(&draft("Demography", Difficulty::Easy))
            .await
            .unwrap();

        let easy = repo
            .random_questions("Epidemiology", Some(Difficulty::Easy), 10)
            .await
            .unwrap();
        assert_eq!(easy.len(), 4);
        assert!(easy.iter().all(|q| q.difficulty == Difficulty::Easy));

        let mixed = repo.random_questions("Epidemiology", None, 3).await.unwrap();
        assert_eq!(mixed.len(), 3);
        assert!(mixed.iter().all(|q| q.chapter == "Epidemiology"));
    }

    #[tokio::test]
    async fn record_answer_bumps_counters() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_question(&draft("Epidemiology", Difficulty::Easy))
            .await
            .unwrap();

        repo.record_answer(id, true, fixed_now()).await.unwrap();
        repo.record_answer(id, false, fixed_now()).await.unwrap();

        let q = repo.get_question(id).await.unwrap();
        assert_eq!(q.times_answered, 2);
        assert_eq!(q.times_correct, 1);
        assert_eq!(q.last_answered, Some(fixed_now()));
    }

    #[tokio::test]
    async fn attempts_list_newest_first() {
        let repo = InMemoryRepository::new();
        let ids: Vec<QuestionId> = vec![QuestionId::new(1)];
        let older = Attempt::from_outcomes(
            fixed_now(),
            "Epidemiology",
            "Mixed",
            30,
            ids.clone(),
            ids.clone(),
            vec![],
            vec![],
        )
        .unwrap();
        let newer = Attempt::from_outcomes(
            fixed_now() + chrono::Duration::hours(1),
            "Epidemiology",
            "Mixed",
            30,
            ids.clone(),
            ids,
            vec![],
            vec![],
        )
        .unwrap();

        repo.append_attempt(&older).await.unwrap();
        repo.append_attempt(&newer).await.unwrap();

        let rows = repo.list_attempts().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].attempt.date_time(), newer.date_time());
    }

    #[tokio::test]
    async fn storage_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Storage>();
        assert_send_sync::<InMemoryRepository>();
    }
}
