//! Content-provider boundary for the initial question bank.

use crate::model::NewQuestion;

/// Supplies the fixed chapter list and the initial question bank.
///
/// Called exactly once by the seeder on first run; seeding is idempotent,
/// so calling it against an already seeded store is safe and does nothing.
pub trait ContentProvider: Send + Sync {
    /// The fixed chapter names. Every chapter gets a progress row even if
    /// it has no questions yet.
    fn chapters(&self) -> Vec<String>;

    /// The initial question bank.
    fn questions(&self) -> Vec<NewQuestion>;
}
