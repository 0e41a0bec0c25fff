use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::content::ContentProvider;
use quiz_core::model::{AnswerOption, CHAPTERS, Difficulty, NewQuestion};
use storage::repository::Storage;
use storage::seeder::seed_content;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, RUST_LOG");
}

/// Built-in sample question bank covering a slice of the syllabus.
struct SampleContent;

impl SampleContent {
    #[allow(clippy::too_many_arguments)]
    fn question(
        chapter: &str,
        difficulty: Difficulty,
        text: &str,
        options: [&str; 4],
        correct: AnswerOption,
        explanation: &str,
    ) -> NewQuestion {
        NewQuestion {
            text: text.into(),
            option_a: options[0].into(),
            option_b: options[1].into(),
            option_c: options[2].into(),
            option_d: options[3].into(),
            correct_answer: correct,
            explanation: explanation.into(),
            chapter: chapter.into(),
            difficulty,
        }
    }
}

impl ContentProvider for SampleContent {
    fn chapters(&self) -> Vec<String> {
        CHAPTERS.iter().map(|c| (*c).to_string()).collect()
    }

    #[allow(clippy::too_many_lines)]
    fn questions(&self) -> Vec<NewQuestion> {
        vec![
            Self::question(
                "Fundamentals of Community Medicine",
                Difficulty::Easy,
                "The WHO definition of health includes physical, mental and which other dimension of well-being?",
                ["Financial", "Social", "Political", "Occupational"],
                AnswerOption::B,
                "WHO defines health as complete physical, mental and social well-being, not merely the absence of disease.",
            ),
            Self::question(
                "Fundamentals of Community Medicine",
                Difficulty::Medium,
                "The iceberg phenomenon of disease refers to which hidden portion?",
                [
                    "Clinical cases",
                    "Deaths",
                    "Latent and subclinical cases",
                    "Carriers only",
                ],
                AnswerOption::C,
                "The submerged part of the iceberg represents latent, inapparent and undiagnosed cases in the community.",
            ),
            Self::question(
                "Epidemiology",
                Difficulty::Easy,
                "Incidence measures which of the following?",
                ["All existing cases", "New cases over a period", "Deaths", "Recoveries"],
                AnswerOption::B,
                "Incidence counts new cases occurring in a defined population during a specified period.",
            ),
            Self::question(
                "Epidemiology",
                Difficulty::Medium,
                "Which study design is best suited to estimate prevalence?",
                ["Case-control", "Cohort", "Cross-sectional", "Randomized trial"],
                AnswerOption::C,
                "A cross-sectional survey captures existing cases at a point in time, which is prevalence.",
            ),
            Self::question(
                "Epidemiology",
                Difficulty::Hard,
                "Relative risk can be directly calculated from which study design?",
                ["Case-control", "Cohort", "Ecological", "Cross-sectional"],
                AnswerOption::B,
                "Cohort studies follow exposed and unexposed groups forward, so incidence and relative risk are directly measurable.",
            ),
            Self::question(
                "Epidemiology",
                Difficulty::Medium,
                "Sensitivity of a screening test is the ability to identify which group correctly?",
                ["True negatives", "True positives", "False positives", "False negatives"],
                AnswerOption::B,
                "Sensitivity is the proportion of diseased individuals the test correctly labels positive.",
            ),
            Self::question(
                "Demography",
                Difficulty::Easy,
                "The total fertility rate is defined per woman over which span?",
                ["One year", "Reproductive lifetime", "Five years", "Per pregnancy"],
                AnswerOption::B,
                "TFR is the average number of children a woman would bear over her entire reproductive period.",
            ),
            Self::question(
                "Biostatistics",
                Difficulty::Medium,
                "Which measure of central tendency is least affected by extreme values?",
                ["Mean", "Median", "Mode", "Range"],
                AnswerOption::B,
                "The median depends on rank order, so outliers barely move it.",
            ),
            Self::question(
                "Nutrition and Malnutrition",
                Difficulty::Easy,
                "Kwashiorkor is primarily a deficiency of which nutrient?",
                ["Energy", "Protein", "Iron", "Vitamin A"],
                AnswerOption::B,
                "Kwashiorkor results from severe protein deficiency despite near-adequate calories.",
            ),
            Self::question(
                "Communicable Diseases",
                Difficulty::Hard,
                "Herd immunity does not protect against which disease?",
                ["Measles", "Polio", "Tetanus", "Diphtheria"],
                AnswerOption::C,
                "Tetanus is acquired from the environment, not person to person, so herd immunity offers no protection.",
            ),
        ]
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let report = seed_content(&storage, &SampleContent, now).await?;

    println!(
        "Seeded {} questions and initialized {} chapter progress rows into {}",
        report.questions_inserted, report.chapters_initialized, args.db_url
    );
    if report.bank_already_seeded {
        println!("Question bank was already seeded; existing rows left untouched");
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
