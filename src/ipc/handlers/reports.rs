use crate::config::parse_overrides;
use crate::ipc::error::{err, ok, pipeline_err};
use crate::ipc::types::{AppState, Request};
use crate::pipeline::{archive_documents, generate_documents, student_content};
use serde_json::json;
use std::path::PathBuf;

use super::roster::{load_roster, request_limits};

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// A `path` param reloads the roster first; otherwise the opened one is used.
fn refresh_roster(state: &mut AppState, req: &Request) -> Result<(), serde_json::Value> {
    if let Some(path) = req.params.get("path").and_then(|v| v.as_str()) {
        let limits = request_limits(req).map_err(|e| e.response(&req.id))?;
        state.roster = None;
        let loaded = load_roster(&PathBuf::from(path), limits).map_err(|e| e.response(&req.id))?;
        state.roster = Some(loaded);
    }
    if state.roster.is_none() {
        return Err(err(&req.id, "no_roster", "open a roster first", None));
    }
    Ok(())
}

fn handle_student_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(loaded) = state.roster.as_ref() else {
        return err(&req.id, "no_roster", "open a roster first", None);
    };
    let Some(index) = req.params.get("index").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "missing params.index", None);
    };
    let overrides = parse_overrides(&req.params);
    match student_content(&loaded.roster, &overrides, index as usize) {
        Some(content) => ok(&req.id, json!({ "student": content })),
        None => err(
            &req.id,
            "bad_params",
            "index out of range",
            Some(json!({ "index": index, "studentCount": loaded.roster.table.len() })),
        ),
    }
}

fn handle_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    if let Err(e) = refresh_roster(state, req) {
        return e;
    }
    let Some(loaded) = state.roster.as_ref() else {
        return err(&req.id, "no_roster", "open a roster first", None);
    };

    let overrides = parse_overrides(&req.params);
    let outcome = match generate_documents(&loaded.roster, &overrides, &state.renderer) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "report generation aborted");
            return pipeline_err(&req.id, e);
        }
    };

    let summary = match archive_documents(&outcome, &out_path) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "archive_failed",
                format!("{e:#}"),
                Some(json!({ "outPath": out_path.to_string_lossy() })),
            )
        }
    };

    ok(
        &req.id,
        json!({
            "outPath": out_path.to_string_lossy(),
            "documentCount": summary.entry_count,
            "entries": summary.entry_names,
            "failures": outcome.failures,
            "archiveSha256": summary.sha256,
            "metadata": outcome.metadata,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.studentModel" => Some(handle_student_model(state, req)),
        "reports.generate" => Some(handle_generate(state, req)),
        _ => None,
    }
}
