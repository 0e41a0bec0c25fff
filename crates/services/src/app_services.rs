use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::bookmark_service::BookmarkService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::sessions::QuizLoopService;
use crate::stats_service::StatsService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quiz_loop: Arc<QuizLoopService>,
    progress: Arc<ProgressService>,
    stats: Arc<StatsService>,
    bookmarks: Arc<BookmarkService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over in-memory storage, for tests and prototyping.
    #[must_use]
    pub fn new_in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let progress = ProgressService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.progress),
        );
        let quiz_loop = Arc::new(QuizLoopService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.attempts),
            progress.clone(),
        ));
        let stats = Arc::new(StatsService::new(
            clock,
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
        ));
        let bookmarks = Arc::new(BookmarkService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.bookmarks),
        ));

        Self {
            quiz_loop,
            progress: Arc::new(progress),
            stats,
            bookmarks,
        }
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn bookmarks(&self) -> Arc<BookmarkService> {
        Arc::clone(&self.bookmarks)
    }
}
