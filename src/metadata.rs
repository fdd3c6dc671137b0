use crate::config::{Overrides, ScanLimits};
use crate::sheet::RawGrid;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(20[0-9]{2})\s*[–-]\s*(20[0-9]{2})").expect("year range regex")
});

const SCHOOL_LABEL: &str = "mokykla";
const CLASS_LABELS: [&str; 2] = ["klasė", "klase"];
const YEAR_PHRASE: &str = "mokslo metai";

/// Header fields found above the table. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub institution: String,
    pub class_label: String,
    pub academic_year: String,
}

impl Metadata {
    pub fn with_overrides(&self, overrides: &Overrides) -> Metadata {
        let pick = |over: &str, scanned: &str| {
            if over.trim().is_empty() {
                scanned.to_string()
            } else {
                over.trim().to_string()
            }
        };
        Metadata {
            institution: pick(&overrides.institution, &self.institution),
            class_label: pick(&overrides.class_label, &self.class_label),
            academic_year: pick(&overrides.academic_year, &self.academic_year),
        }
    }
}

pub fn scan_metadata(grid: &RawGrid, limits: &ScanLimits) -> Metadata {
    let (institution, class_label) = scan_school_and_class(grid, limits);
    Metadata {
        institution,
        class_label,
        academic_year: scan_academic_year(grid, limits),
    }
}

/// Text cells of the scan window in row-major order.
fn window_labels<'a>(grid: &'a RawGrid, limits: &ScanLimits) -> impl Iterator<Item = &'a str> {
    let nrows = limits.metadata_rows.min(grid.height());
    let ncols = limits.metadata_cols.min(grid.width());
    (0..nrows)
        .flat_map(move |r| (0..ncols).map(move |c| (r, c)))
        .filter_map(move |(r, c)| grid.get(r, c).as_label())
}

/// Last `label: value` match in the window wins for each field.
fn scan_school_and_class(grid: &RawGrid, limits: &ScanLimits) -> (String, String) {
    let mut school = String::new();
    let mut class = String::new();
    for txt in window_labels(grid, limits) {
        let Some((label, value)) = txt.trim().split_once(':') else {
            continue;
        };
        let label = label.to_lowercase();
        if label.contains(SCHOOL_LABEL) {
            school = value.trim().to_string();
        }
        if CLASS_LABELS.iter().any(|l| label.contains(l)) {
            class = value.trim().to_string();
        }
    }
    (school, class)
}

/// First year range found wins outright. Without one, the last cell that
/// mentions the academic year phrase is returned verbatim.
fn scan_academic_year(grid: &RawGrid, limits: &ScanLimits) -> String {
    let mut candidate = String::new();
    for txt in window_labels(grid, limits) {
        let txt = txt.trim();
        if let Some(m) = YEAR_RANGE.captures(txt) {
            return format!("{}–{}", &m[1], &m[2]);
        }
        if txt.to_lowercase().contains(YEAR_PHRASE) {
            candidate = txt.to_string();
        }
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;

    fn grid(rows: Vec<Vec<Cell>>) -> RawGrid {
        RawGrid::new(rows)
    }

    #[test]
    fn school_and_class_labels_are_captured() {
        let g = grid(vec![
            vec![Cell::text("Mokykla: Vilniaus 5-oji vidurinė"), Cell::Empty],
            vec![Cell::Empty, Cell::text("Klasė: IVa")],
        ]);
        let meta = scan_metadata(&g, &ScanLimits::default());
        assert_eq!(meta.institution, "Vilniaus 5-oji vidurinė");
        assert_eq!(meta.class_label, "IVa");
    }

    #[test]
    fn class_label_without_diacritic_and_last_match_wins() {
        let g = grid(vec![
            vec![Cell::text("KLASE: 7b")],
            vec![Cell::text("Klasė: 8a")],
        ]);
        let meta = scan_metadata(&g, &ScanLimits::default());
        assert_eq!(meta.class_label, "8a");
    }

    #[test]
    fn label_word_must_precede_the_colon() {
        let g = grid(vec![vec![Cell::text("Pastaba: mokykla uždaryta")]]);
        let meta = scan_metadata(&g, &ScanLimits::default());
        assert_eq!(meta.institution, "");
    }

    #[test]
    fn cells_outside_the_window_are_ignored() {
        let mut rows = vec![vec![Cell::Empty; 14]; 14];
        rows[12][0] = Cell::text("Mokykla: per toli");
        rows[0][12] = Cell::text("Klasė: per toli");
        rows[13][13] = Cell::text("2030-2031");
        let meta = scan_metadata(&grid(rows), &ScanLimits::default());
        assert_eq!(meta, Metadata::default());
    }

    #[test]
    fn first_year_range_wins_and_uses_en_dash() {
        let g = grid(vec![
            vec![Cell::text("Mokslo metai 2024-2025")],
            vec![Cell::text("2023-2024")],
        ]);
        let meta = scan_metadata(&g, &ScanLimits::default());
        assert_eq!(meta.academic_year, "2024–2025");

        let g = grid(vec![vec![Cell::text("laikotarpis 2022 – 2023")]]);
        assert_eq!(scan_metadata(&g, &ScanLimits::default()).academic_year, "2022–2023");
    }

    #[test]
    fn phrase_fallback_uses_last_candidate() {
        let g = grid(vec![
            vec![Cell::text("Mokslo metai: pirmi")],
            vec![Cell::text("mokslo metai: antri")],
            vec![Cell::Number(2024.0)],
        ]);
        let meta = scan_metadata(&g, &ScanLimits::default());
        assert_eq!(meta.academic_year, "mokslo metai: antri");
    }

    #[test]
    fn overrides_replace_only_non_blank_fields() {
        let scanned = Metadata {
            institution: "Gimnazija".into(),
            class_label: "IIa".into(),
            academic_year: "2024–2025".into(),
        };
        let merged = scanned.with_overrides(&Overrides {
            institution: "  ".into(),
            class_label: "IVb".into(),
            academic_year: String::new(),
        });
        assert_eq!(merged.institution, "Gimnazija");
        assert_eq!(merged.class_label, "IVb");
        assert_eq!(merged.academic_year, "2024–2025");
    }
}
