use thiserror::Error;

use crate::data::report::ReportError;

// ---------------------------------------------------------------------------
// Session-level error taxonomy
// ---------------------------------------------------------------------------

/// Everything a user action can fail with.  Each variant maps to one modal
/// notification; none of them leave the session in a partially updated state.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Please select a file first.")]
    NoFile,

    #[error("Please read the file first.")]
    NoDataset,

    #[error("Failed to read file:\n{0:#}")]
    Read(anyhow::Error),

    #[error("Please select a value for \"{0}\".")]
    MissingSelection(&'static str),

    #[error("Report generation failed:\n{0}")]
    Aggregation(#[from] ReportError),

    #[error("No {0} available. Preview the {0} first.")]
    NoArtifact(&'static str),

    #[error("The chart was drawn from an older report. Preview the chart again before exporting.")]
    StaleChart,

    #[error("Chart rendering failed:\n{0:#}")]
    Render(anyhow::Error),

    #[error("Export failed:\n{0:#}")]
    Write(anyhow::Error),
}

impl AnalysisError {
    /// Short title for the notification window.
    pub fn title(&self) -> &'static str {
        match self {
            AnalysisError::NoFile
            | AnalysisError::NoDataset
            | AnalysisError::MissingSelection(_)
            | AnalysisError::NoArtifact(_) => "Missing input",
            AnalysisError::Read(_) => "Read error",
            AnalysisError::Aggregation(_) => "Report error",
            AnalysisError::StaleChart => "Chart out of date",
            AnalysisError::Render(_) => "Chart error",
            AnalysisError::Write(_) => "Export error",
        }
    }
}
