use anyhow::{anyhow, Context};
use calamine::{open_workbook_auto, Data, Reader};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Only text cells can carry a label such as `Mokykla: ...`.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(v) => v.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(v) => format_number(*v),
            Cell::Text(s) => s.clone(),
        }
    }

    /// Integer sequence numbers, either numeric cells or digit-only text.
    pub fn as_sequence_number(&self) -> Option<i64> {
        match self {
            Cell::Number(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            Cell::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

fn format_number(v: f64) -> String {
    if v.is_nan() {
        return String::new();
    }
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        return format!("{}", v as i64);
    }
    format!("{}", v)
}

impl From<&Data> for Cell {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Float(v) => Cell::Number(*v),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
            Data::Bool(b) => Cell::text(b.to_string()),
        }
    }
}

/// Zero-based sheet coordinates of the grid's (0, 0) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SheetOrigin {
    pub row: usize,
    pub col: usize,
}

/// Untyped cell grid as read from the workbook, row 0 being the first used row.
#[derive(Debug, Clone, Default)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
    width: usize,
    origin: SheetOrigin,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        Self {
            rows,
            width,
            origin: SheetOrigin::default(),
        }
    }

    pub fn with_origin(mut self, row: usize, col: usize) -> Self {
        self.origin = SheetOrigin { row, col };
        self
    }

    pub fn origin(&self) -> SheetOrigin {
        self.origin
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

pub fn open_first_sheet(path: &Path) -> anyhow::Result<RawGrid> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.to_string_lossy()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no sheets: {}", path.to_string_lossy()))?
        .context("failed to read first sheet")?;

    let (row0, col0) = range.start().unwrap_or((0, 0));
    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect();
    Ok(RawGrid::new(rows).with_origin(row0 as usize, col0 as usize))
}
