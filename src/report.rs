use crate::grades::{cleaned_subjects, CleanedSubjectSet};
use crate::metadata::Metadata;
use crate::table::StudentRecord;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static FINAL_GYMNASIUM_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*IV\s*[A-ZĄČĘĖĮŠŲŪŽ]?\s*$").expect("final class regex")
});
static GRADE_TWELVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b12\b").expect("grade twelve regex"));

/// `IV`, `IVa`, `iv B` or anything with a standalone `12`.
pub fn is_final_class(class_label: &str) -> bool {
    let k = class_label.trim();
    if k.is_empty() {
        return false;
    }
    FINAL_GYMNASIUM_CLASS.is_match(k) || GRADE_TWELVE.is_match(k)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClosingStatement {
    CompletedProgram,
    Promoted,
}

impl ClosingStatement {
    pub fn for_class(class_label: &str) -> Self {
        if is_final_class(class_label) {
            ClosingStatement::CompletedProgram
        } else {
            ClosingStatement::Promoted
        }
    }

    pub fn sentence(self) -> &'static str {
        match self {
            ClosingStatement::CompletedProgram => "Baigė vidurinio ugdymo programą.",
            ClosingStatement::Promoted => "Direktoriaus įsakymu perkeltas/a į aukštesnę klasę.",
        }
    }
}

/// Everything the document emitter needs for one student.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportContent {
    pub student_name: String,
    pub class_label: String,
    pub academic_year: String,
    pub institution: String,
    pub subjects: CleanedSubjectSet,
    pub closing: ClosingStatement,
}

impl ReportContent {
    pub fn for_student(record: &StudentRecord<'_>, metadata: &Metadata) -> Self {
        Self {
            student_name: record.name.clone(),
            class_label: metadata.class_label.clone(),
            academic_year: metadata.academic_year.clone(),
            institution: metadata.institution.clone(),
            subjects: cleaned_subjects(record),
            closing: ClosingStatement::for_class(&metadata.class_label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;

    #[test]
    fn final_classes_are_recognized() {
        for label in ["IV", "IVa", "iv B", " IVž ", "12", "class 12", "12 klasė", "12-a"] {
            assert!(is_final_class(label), "{label}");
        }
    }

    #[test]
    fn other_classes_are_promoted() {
        for label in ["III", "11", "", "   ", "12a", "IVab", "V", "112"] {
            assert!(!is_final_class(label), "{label}");
        }
    }

    #[test]
    fn closing_statement_follows_class() {
        assert_eq!(
            ClosingStatement::for_class("IVa"),
            ClosingStatement::CompletedProgram
        );
        assert_eq!(ClosingStatement::for_class("8b"), ClosingStatement::Promoted);
        assert!(ClosingStatement::Promoted.sentence().contains("perkeltas/a"));
    }

    #[test]
    fn content_uses_merged_metadata_and_cleaned_subjects() {
        let grade = Cell::text("9 PR");
        let level = Cell::text("Slenkstinis");
        let record = StudentRecord {
            name: "Petraitė Ona".into(),
            subject_values: vec![("Biologija", &grade), ("Lygis", &level)],
        };
        let meta = Metadata {
            institution: "Gimnazija".into(),
            class_label: "IVa".into(),
            academic_year: "2024–2025".into(),
        };
        let content = ReportContent::for_student(&record, &meta);
        assert_eq!(content.student_name, "Petraitė Ona");
        assert_eq!(content.subjects, vec![("Biologija".to_string(), "9".to_string())]);
        assert_eq!(content.closing, ClosingStatement::CompletedProgram);
    }
}
