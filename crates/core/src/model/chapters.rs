/// The fixed NEET Community Medicine chapter list.
///
/// Chapter names double as the `ChapterProgress` primary key, so the
/// strings here must stay stable across releases.
pub const CHAPTERS: [&str; 17] = [
    "Fundamentals of Community Medicine",
    "Epidemiology",
    "Biostatistics",
    "Environmental Health",
    "Nutrition and Malnutrition",
    "Maternal and Child Health",
    "Reproductive and Sexual Health",
    "Communicable Diseases",
    "Non-communicable Diseases",
    "Occupational Health",
    "Mental Health",
    "Health Systems and Health Care Delivery",
    "Demography",
    "Primary Health Care",
    "Health Planning and Management",
    "Research Methodology",
    "Community Dentistry",
];

/// True if `name` is one of the fixed chapters.
#[must_use]
pub fn is_known_chapter(name: &str) -> bool {
    CHAPTERS.contains(&name)
}
