#![forbid(unsafe_code)]

pub mod app_services;
pub mod bookmark_service;
pub mod error;
pub mod progress_service;
pub mod sessions;
pub mod stats_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use bookmark_service::BookmarkService;
pub use error::{AppServicesError, BookmarkError, ProgressError, SessionError, StatsError};
pub use progress_service::ProgressService;
pub use sessions::{
    AnswerFeedback, QuizLoopService, QuizSession, SessionAnswerResult, SessionOutcome,
    SessionProgress,
};
pub use stats_service::{StatisticsReport, StatsService};
