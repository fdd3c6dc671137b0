use crate::header::HeaderPosition;
use crate::sheet::{Cell, RawGrid};
use crate::text::normalize_for_comparison;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

pub const SEQUENCE_COLUMN: &str = "Eil. Nr.";
pub const NAME_COLUMN: &str = "Pavardė, vardas";
const FIXED_COLUMNS: usize = 2;

/// Aggregate row some exports append below the students.
const SUMMARY_ROW_NAME: &str = "Klasės pažangumas";

/// Column headers for achievement level indicators ("pasiekimų lygis", "lygis pasiektas").
static ACHIEVEMENT_LEVEL_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)pasiek\w*\s*lyg\w*|lyg\w*\s*pasiek\w*").expect("level column regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct StudentTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// One student row: the name plus every subject cell in column order.
#[derive(Debug, Clone)]
pub struct StudentRecord<'a> {
    pub name: String,
    pub subject_values: Vec<(&'a str, &'a Cell)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StudentTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn subject_columns(&self) -> &[String] {
        &self.columns[FIXED_COLUMNS.min(self.columns.len())..]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<StudentRecord<'_>> {
        let row = self.rows.get(index)?;
        Some(StudentRecord {
            name: row[1].display_text().trim().to_string(),
            subject_values: self
                .columns
                .iter()
                .zip(row.iter())
                .skip(FIXED_COLUMNS)
                .map(|(c, v)| (c.as_str(), v))
                .collect(),
        })
    }

    pub fn records(&self) -> impl Iterator<Item = StudentRecord<'_>> + '_ {
        (0..self.rows.len()).filter_map(move |i| self.record(i))
    }

    pub fn preview(&self, limit: usize) -> TablePreview {
        TablePreview {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .take(limit)
                .map(|r| r.iter().map(Cell::display_text).collect())
                .collect(),
        }
    }
}

pub fn build_table(grid: &RawGrid, pos: HeaderPosition) -> StudentTable {
    let columns = column_names(grid, pos.subjects_row);

    let mut data_start = pos.subjects_row + 1;
    while data_start < grid.height() && grid.get(data_start, 0).as_sequence_number().is_none() {
        data_start += 1;
    }

    let mut rows: Vec<Vec<Cell>> = (data_start..grid.height())
        .map(|r| (0..columns.len()).map(|c| grid.get(r, c).clone()).collect())
        .collect();

    let summary_key = normalize_for_comparison(SUMMARY_ROW_NAME);
    rows.retain(|row| {
        if row.iter().all(Cell::is_blank) || row[1].is_blank() {
            return false;
        }
        if normalize_for_comparison(&row[1].display_text()) == summary_key {
            tracing::debug!(row = ?row[1], "dropping class summary row");
            return false;
        }
        true
    });

    let keep: Vec<usize> = (0..columns.len())
        .filter(|&j| {
            if j < FIXED_COLUMNS {
                return true;
            }
            if ACHIEVEMENT_LEVEL_COLUMN.is_match(&columns[j]) {
                tracing::debug!(column = %columns[j], "dropping achievement level column");
                return false;
            }
            rows.iter().any(|row| !row[j].is_blank())
        })
        .collect();

    StudentTable {
        columns: keep.iter().map(|&j| columns[j].clone()).collect(),
        rows: rows
            .into_iter()
            .map(|row| keep.iter().map(|&j| row[j].clone()).collect())
            .collect(),
    }
}

/// Fixed identity columns, then one unique name per remaining grid column.
fn column_names(grid: &RawGrid, subjects_row: usize) -> Vec<String> {
    let mut columns = vec![SEQUENCE_COLUMN.to_string(), NAME_COLUMN.to_string()];
    let mut seen: HashSet<String> = columns.iter().cloned().collect();
    for j in FIXED_COLUMNS..grid.width().max(FIXED_COLUMNS) {
        let mut name = grid.get(subjects_row, j).display_text().trim().to_string();
        if name.is_empty() {
            name = format!("Subject_{}", j - 1);
        }
        let mut unique = name.clone();
        let mut n = 2;
        while seen.contains(&unique) {
            unique = format!("{} ({})", name, n);
            n += 1;
        }
        seen.insert(unique.clone());
        columns.push(unique);
    }
    columns
}
