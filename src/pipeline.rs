use crate::archive::{self, ArchiveSummary};
use crate::config::{Overrides, ScanLimits};
use crate::error::PipelineError;
use crate::header::{locate_header, HeaderPosition};
use crate::metadata::{scan_metadata, Metadata};
use crate::render::DocumentRenderer;
use crate::report::ReportContent;
use crate::sheet::{RawGrid, SheetOrigin};
use crate::table::{build_table, StudentTable};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::path::Path;

/// Everything derived once from a workbook: scanned metadata and the student table.
#[derive(Debug, Clone)]
pub struct Roster {
    /// Sheet position of the grid's first cell; header rows are grid-relative.
    pub origin: SheetOrigin,
    pub metadata: Metadata,
    pub header: HeaderPosition,
    pub table: StudentTable,
}

pub fn extract_roster(grid: &RawGrid, limits: &ScanLimits) -> Result<Roster, PipelineError> {
    let metadata = scan_metadata(grid, limits);
    let header = locate_header(grid, limits)?;
    let table = build_table(grid, header);
    tracing::info!(
        header_row = header.header_row,
        subjects = table.subject_columns().len(),
        students = table.len(),
        "roster extracted"
    );
    Ok(Roster {
        origin: grid.origin(),
        metadata,
        header,
        table,
    })
}

#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub student_name: String,
    pub entry_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFailure {
    pub index: usize,
    pub student_name: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub metadata: Metadata,
    pub documents: Vec<GeneratedDocument>,
    pub failures: Vec<StudentFailure>,
}

/// Report content for one student, metadata already merged with overrides.
pub fn student_content(roster: &Roster, overrides: &Overrides, index: usize) -> Option<ReportContent> {
    let metadata = roster.metadata.with_overrides(overrides);
    roster
        .table
        .record(index)
        .map(|r| ReportContent::for_student(&r, &metadata))
}

/// Renders one document per student. Students render independently; a failed
/// student is reported next to the successful ones instead of aborting them.
pub fn generate_documents(
    roster: &Roster,
    overrides: &Overrides,
    renderer: &dyn DocumentRenderer,
) -> Result<GenerationOutcome, PipelineError> {
    if roster.table.is_empty() {
        return Err(PipelineError::empty_result());
    }

    let metadata = roster.metadata.with_overrides(overrides);
    let contents: Vec<ReportContent> = roster
        .table
        .records()
        .map(|r| ReportContent::for_student(&r, &metadata))
        .collect();
    let names = archive::entry_names(
        contents.iter().map(|c| c.student_name.as_str()),
        renderer.file_extension(),
    );

    let rendered: Vec<anyhow::Result<Vec<u8>>> =
        contents.par_iter().map(|c| renderer.render(c)).collect();

    let mut documents = Vec::with_capacity(contents.len());
    let mut failures = Vec::new();
    for (index, ((content, entry_name), result)) in
        contents.into_iter().zip(names).zip(rendered).enumerate()
    {
        match result {
            Ok(bytes) => documents.push(GeneratedDocument {
                student_name: content.student_name,
                entry_name,
                bytes,
            }),
            Err(e) => {
                tracing::warn!(student = %content.student_name, error = %format!("{e:#}"), "render failed");
                failures.push(StudentFailure {
                    index,
                    student_name: content.student_name,
                    message: format!("{e:#}"),
                });
            }
        }
    }

    if documents.is_empty() {
        return Err(PipelineError::render_failed("no document could be rendered")
            .with_details(json!({ "failures": failures })));
    }

    Ok(GenerationOutcome {
        metadata,
        documents,
        failures,
    })
}

pub fn archive_documents(
    outcome: &GenerationOutcome,
    out_path: &Path,
) -> anyhow::Result<ArchiveSummary> {
    let entries: Vec<(&str, &[u8])> = outcome
        .documents
        .iter()
        .map(|d| {
            tracing::debug!(student = %d.student_name, entry = %d.entry_name, "archiving document");
            (d.entry_name.as_str(), d.bytes.as_slice())
        })
        .collect();
    let summary = archive::write_archive(out_path, &entries)?;
    tracing::info!(
        path = %out_path.to_string_lossy(),
        documents = summary.entry_count,
        failures = outcome.failures.len(),
        "archive written"
    );
    Ok(summary)
}
