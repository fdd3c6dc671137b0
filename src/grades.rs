use crate::sheet::Cell;
use crate::table::StudentRecord;
use crate::text::clean_tagged_value;
use regex::Regex;
use std::sync::LazyLock;

/// The four achievement level names. They describe a level, not a grade.
static ACHIEVEMENT_LEVEL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(slenkstinis|patenkinamas|pagrindinis|aukštesnysis)\b")
        .expect("level value regex")
});

/// Subject → display value pairs, in table column order.
pub type CleanedSubjectSet = Vec<(String, String)>;

/// Display value for one grade cell, or `None` when it must not be rendered.
pub fn clean_grade(cell: &Cell) -> Option<String> {
    if cell.is_blank() {
        return None;
    }
    let text = cell.display_text();
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        return None;
    }
    if ACHIEVEMENT_LEVEL_VALUE.is_match(text) {
        return None;
    }
    let cleaned = clean_tagged_value(text);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

pub fn cleaned_subjects(record: &StudentRecord<'_>) -> CleanedSubjectSet {
    record
        .subject_values
        .iter()
        .filter_map(|(subject, cell)| clean_grade(cell).map(|v| (subject.to_string(), v)))
        .collect()
}
