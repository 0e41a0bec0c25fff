use quiz_core::model::{AnswerOption, Difficulty, DifficultyFilter, NewQuestion};
use quiz_core::time::{fixed_clock, fixed_now};
use services::AppServices;
use services::sessions::QuizSession;
use storage::repository::Storage;
use storage::seeder::seed_content;

struct SmokeContent;

impl quiz_core::content::ContentProvider for SmokeContent {
    fn chapters(&self) -> Vec<String> {
        vec!["Epidemiology".into(), "Biostatistics".into()]
    }

    fn questions(&self) -> Vec<NewQuestion> {
        let draft = |chapter: &str, text: &str, difficulty| NewQuestion {
            text: text.into(),
            option_a: "First".into(),
            option_b: "Second".into(),
            option_c: "Third".into(),
            option_d: "Fourth".into(),
            correct_answer: AnswerOption::C,
            explanation: "Third is right.".into(),
            chapter: chapter.into(),
            difficulty,
        };
        vec![
            draft("Epidemiology", "E1", Difficulty::Easy),
            draft("Epidemiology", "E2", Difficulty::Easy),
            draft("Epidemiology", "E3", Difficulty::Medium),
            draft("Epidemiology", "E4", Difficulty::Hard),
            draft("Biostatistics", "B1", Difficulty::Medium),
        ]
    }
}

async fn seeded_services() -> (Storage, AppServices) {
    let storage = Storage::in_memory();
    seed_content(&storage, &SmokeContent, fixed_now())
        .await
        .unwrap();
    let services = AppServices::from_storage(&storage, fixed_clock());
    (storage, services)
}

async fn answer_all(services: &AppServices, session: &mut QuizSession, option: AnswerOption) {
    let quiz = services.quiz_loop();
    while !session.is_complete() {
        session.select_answer(option).unwrap();
        quiz.submit_answer(session).await.unwrap();
    }
}

#[tokio::test]
async fn full_quiz_updates_history_progress_and_stats() {
    let (storage, services) = seeded_services().await;
    let quiz = services.quiz_loop();

    let mut session = quiz
        .start_session("Epidemiology", DifficultyFilter::Mixed, 4)
        .await
        .unwrap();
    assert_eq!(session.total_questions(), 4);

    answer_all(&services, &mut session, AnswerOption::C).await;
    let attempt_id = session.attempt_id().expect("finalized");

    let row = storage.attempts.get_attempt(attempt_id).await.unwrap();
    assert!((row.attempt.percentage() - 100.0).abs() < f64::EPSILON);

    let progress = services
        .progress()
        .get_progress("Epidemiology")
        .await
        .unwrap()
        .expect("folded");
    assert_eq!(progress.questions_correct, 4);
    assert_eq!(progress.easy_correct, 2);
    assert_eq!(progress.medium_correct, 1);
    assert_eq!(progress.hard_correct, 1);
    assert!(progress.is_completed); // perfect score completes the chapter
    assert_eq!(progress.current_streak, 1);

    let report = services.stats().statistics_report().await.unwrap();
    assert_eq!(report.statistics.quizzes_completed, 1);
    assert_eq!(report.statistics.last_quiz_date, Some(fixed_now()));
    assert!((report.statistics.weekly_progress - 100.0).abs() < f64::EPSILON);
    assert!(
        report
            .achievements
            .iter()
            .find(|a| a.id == "perfect_score")
            .unwrap()
            .is_unlocked
    );
    assert!(
        !report
            .achievements
            .iter()
            .find(|a| a.id == "chapter_master")
            .unwrap()
            .is_unlocked
    );
}

#[tokio::test]
async fn difficulty_filter_limits_selection_and_labels_attempt() {
    let (_storage, services) = seeded_services().await;
    let quiz = services.quiz_loop();

    let mut session = quiz
        .start_session("Epidemiology", DifficultyFilter::Only(Difficulty::Easy), 10)
        .await
        .unwrap();
    assert_eq!(session.total_questions(), 2);
    assert_eq!(session.current_time_limit_secs(), Some(60));

    answer_all(&services, &mut session, AnswerOption::A).await;
    let outcome = session.attempt_id().unwrap();
    let row = services.stats().statistics_report().await.unwrap();
    let recent = &row.recent_attempts[0];
    assert_eq!(recent.id, outcome);
    assert_eq!(recent.attempt.difficulty(), "Easy");
    assert_eq!(recent.attempt.wrong_answers(), 2);
}

#[tokio::test]
async fn unknown_chapter_yields_no_questions() {
    let (_storage, services) = seeded_services().await;
    let err = services
        .quiz_loop()
        .start_session("Sociology", DifficultyFilter::Mixed, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, services::SessionError::NoQuestions));
}

#[tokio::test]
async fn bookmarks_flow_through_the_services() {
    let (storage, services) = seeded_services().await;
    let quiz = services.quiz_loop();

    let mut session = quiz
        .start_session("Biostatistics", DifficultyFilter::Mixed, 1)
        .await
        .unwrap();
    let question_id = session.current_question().unwrap().id;

    assert!(services.bookmarks().toggle_bookmark(question_id).await.unwrap());
    let listed = services.bookmarks().list_bookmarks().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].question_id, question_id);

    let flagged = storage.questions.list_bookmarked().await.unwrap();
    assert_eq!(flagged.len(), 1);

    session.select_answer(AnswerOption::C).unwrap();
    quiz.submit_answer(&mut session).await.unwrap();
    assert!(session.is_complete());
}
