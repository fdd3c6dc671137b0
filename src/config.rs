use serde::{Deserialize, Serialize};

/// Bounds for the heuristic scans over the raw grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanLimits {
    pub metadata_rows: usize,
    pub metadata_cols: usize,
    pub header_scan_rows: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            metadata_rows: 12,
            metadata_cols: 12,
            header_scan_rows: 40,
        }
    }
}

/// Caller-supplied values that replace the scanned metadata when non-blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Overrides {
    pub institution: String,
    pub class_label: String,
    pub academic_year: String,
}

pub fn parse_limits(raw: Option<&serde_json::Value>) -> Result<ScanLimits, String> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(ScanLimits::default()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| format!("invalid limits: {e}")),
    }
}

pub fn parse_overrides(params: &serde_json::Value) -> Overrides {
    let field = |key: &str| {
        params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };
    Overrides {
        institution: field("institution"),
        class_label: field("classLabel"),
        academic_year: field("academicYear"),
    }
}
