use crate::config::ScanLimits;
use crate::error::PipelineError;
use crate::sheet::RawGrid;
use serde_json::json;

const SEQUENCE_STEM: &str = "eil";
const NAME_STEMS: [&str; 2] = ["pavard", "vard"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPosition {
    pub header_row: usize,
    /// Row holding the subject names, directly below the anchor row.
    pub subjects_row: usize,
}

/// Finds the `Eil. Nr.` / `Pavardė, vardas` anchor row.
pub fn locate_header(grid: &RawGrid, limits: &ScanLimits) -> Result<HeaderPosition, PipelineError> {
    if grid.height() == 0 || grid.width() == 0 {
        return Err(PipelineError::structure("sheet is empty, no table to read"));
    }

    let max_scan = limits.header_scan_rows.min(grid.height());
    for i in 0..max_scan {
        let c0 = grid.get(i, 0).display_text().trim().to_lowercase();
        let c1 = if grid.width() > 1 {
            grid.get(i, 1).display_text().trim().to_lowercase()
        } else {
            String::new()
        };
        if c0.starts_with(SEQUENCE_STEM) && NAME_STEMS.iter().any(|s| c1.contains(s)) {
            tracing::debug!(header_row = i, "header row found");
            return Ok(HeaderPosition {
                header_row: i,
                subjects_row: i + 1,
            });
        }
    }

    Err(PipelineError::structure(
        "header row not found: expected 'Eil. Nr.' and 'Pavardė, vardas' in the first two columns",
    )
    .with_details(json!({ "scannedRows": max_scan })))
}
