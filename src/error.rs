use serde::Serialize;

pub const STRUCTURE_ERROR: &str = "structure_error";
pub const EMPTY_RESULT: &str = "empty_result";
pub const RENDER_FAILED: &str = "render_failed";

/// Fatal batch failure. Any of these aborts the run before an archive is written.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PipelineError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn structure(message: impl Into<String>) -> Self {
        Self::new(STRUCTURE_ERROR, message)
    }

    pub fn empty_result() -> Self {
        Self::new(EMPTY_RESULT, "no student rows with names were found")
    }

    pub fn render_failed(message: impl Into<String>) -> Self {
        Self::new(RENDER_FAILED, message)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PipelineError {}
