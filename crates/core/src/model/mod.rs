mod attempt;
mod bookmark;
mod chapters;
mod ids;
mod progress;
mod question;

pub use attempt::{Attempt, AttemptError, AttemptRow};
pub use bookmark::Bookmark;
pub use chapters::{CHAPTERS, is_known_chapter};
pub use ids::{AttemptId, BookmarkId, ParseIdError, QuestionId};
pub use progress::{ChapterProgress, CorrectByDifficulty, MasteryLevel};
pub use question::{AnswerOption, Difficulty, DifficultyFilter, NewQuestion, Question, QuestionError};
