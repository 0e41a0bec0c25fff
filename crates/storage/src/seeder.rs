use chrono::{DateTime, Utc};
use quiz_core::content::ContentProvider;
use quiz_core::model::ChapterProgress;

use crate::repository::{Storage, StorageError};

/// Outcome of one seeding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub questions_inserted: u32,
    pub chapters_initialized: u32,
    pub bank_already_seeded: bool,
}

/// Seed the question bank and chapter progress rows from a content
/// provider.
///
/// Idempotent: questions are only inserted into an empty bank, so running
/// the seeder twice never duplicates content or resets answer counters.
/// Progress rows are created for chapters that lack one, and an existing
/// row's `total_questions` is refreshed if the bank size changed; its
/// counters are left alone either way.
///
/// # Errors
///
/// Returns `StorageError` if any read or write against the store fails.
pub async fn seed_content(
    storage: &Storage,
    provider: &dyn ContentProvider,
    now: DateTime<Utc>,
) -> Result<SeedReport, StorageError> {
    let chapters = provider.chapters();
    let mut report = SeedReport::default();

    let mut bank_size: u32 = 0;
    for chapter in &chapters {
        bank_size += storage.questions.count_questions(chapter, None).await?;
    }

    if bank_size == 0 {
        for draft in provider.questions() {
            storage.questions.insert_question(&draft).await?;
            report.questions_inserted += 1;
        }
        log::info!("seeded {} questions", report.questions_inserted);
    } else {
        report.bank_already_seeded = true;
        log::debug!("question bank already holds {bank_size} questions, skipping inserts");
    }

    for chapter in &chapters {
        let total = storage.questions.count_questions(chapter, None).await?;
        match storage.progress.get_progress(chapter).await? {
            None => {
                let row = ChapterProgress::seeded(chapter.clone(), total, now);
                storage.progress.upsert_progress(&row).await?;
                report.chapters_initialized += 1;
            }
            Some(mut existing) if existing.total_questions != total => {
                existing.total_questions = total;
                storage.progress.upsert_progress(&existing).await?;
            }
            Some(_) => {}
        }
    }

    if report.chapters_initialized > 0 {
        log::info!(
            "initialized progress rows for {} chapters",
            report.chapters_initialized
        );
    }

    Ok(report)
}
