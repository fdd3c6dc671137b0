use crate::config::{parse_limits, ScanLimits};
use crate::error::STRUCTURE_ERROR;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, LoadedRoster, Request};
use crate::pipeline::extract_roster;
use crate::sheet::open_first_sheet;
use serde_json::json;
use std::path::{Path, PathBuf};

const DEFAULT_PREVIEW_ROWS: usize = 10;

pub(crate) fn request_limits(req: &Request) -> Result<ScanLimits, HandlerErr> {
    parse_limits(req.params.get("limits")).map_err(|message| HandlerErr::new("bad_params", message))
}

/// Reads the first sheet and extracts the roster. Nothing is kept on failure.
pub(crate) fn load_roster(path: &Path, limits: ScanLimits) -> Result<LoadedRoster, HandlerErr> {
    let grid = open_first_sheet(path).map_err(|e| HandlerErr {
        code: "read_failed",
        message: format!("{e:#}"),
        details: Some(json!({ "path": path.to_string_lossy() })),
    })?;
    let roster = extract_roster(&grid, &limits).map_err(|e| {
        tracing::warn!(path = %path.to_string_lossy(), error = %e, "roster extraction failed");
        HandlerErr {
            code: STRUCTURE_ERROR,
            message: e.message,
            details: e.details,
        }
    })?;
    Ok(LoadedRoster {
        path: path.to_path_buf(),
        limits,
        roster,
    })
}

pub(crate) fn roster_summary(loaded: &LoadedRoster) -> serde_json::Value {
    let roster = &loaded.roster;
    json!({
        "path": loaded.path.to_string_lossy(),
        "metadata": roster.metadata,
        "origin": roster.origin,
        "headerRow": roster.origin.row + roster.header.header_row,
        "subjectsRow": roster.origin.row + roster.header.subjects_row,
        "columns": roster.table.columns(),
        "subjects": roster.table.subject_columns(),
        "studentCount": roster.table.len(),
        "limits": loaded.limits,
    })
}

fn handle_roster_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
    else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let limits = match request_limits(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    // A failed open must not leave the previous workbook usable.
    state.roster = None;
    match load_roster(&path, limits) {
        Ok(loaded) => {
            let result = roster_summary(&loaded);
            state.roster = Some(loaded);
            ok(&req.id, result)
        }
        Err(e) => e.response(&req.id),
    }
}

fn handle_roster_preview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(loaded) = state.roster.as_ref() else {
        return err(&req.id, "no_roster", "open a roster first", None);
    };
    let limit = match req.params.get("limit") {
        None | Some(serde_json::Value::Null) => DEFAULT_PREVIEW_ROWS,
        Some(v) => match v.as_u64() {
            Some(n) => n as usize,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "limit must be a non-negative integer",
                    Some(json!({ "limit": v })),
                )
            }
        },
    };
    let preview = loaded.roster.table.preview(limit);
    ok(
        &req.id,
        json!({
            "columns": preview.columns,
            "rows": preview.rows,
            "studentCount": loaded.roster.table.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.open" => Some(handle_roster_open(state, req)),
        "roster.preview" => Some(handle_roster_preview(state, req)),
        _ => None,
    }
}
