use std::path::PathBuf;

use serde::Deserialize;

use crate::config::ScanLimits;
use crate::pipeline::Roster;
use crate::render::{PdfRenderer, PdfStyle};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Roster extracted from the most recently opened workbook.
pub struct LoadedRoster {
    pub path: PathBuf,
    pub limits: ScanLimits,
    pub roster: Roster,
}

pub struct AppState {
    pub renderer: PdfRenderer,
    pub roster: Option<LoadedRoster>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            renderer: PdfRenderer::new(PdfStyle::discover()),
            roster: None,
        }
    }
}
