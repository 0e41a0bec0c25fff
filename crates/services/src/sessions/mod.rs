mod progress;
mod queries;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{AnswerFeedback, QuestionOutcome, QuizSession};
pub use workflow::{QuizLoopService, SessionAnswerResult, SessionOutcome};
