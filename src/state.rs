use std::path::{Path, PathBuf};

use crate::chart::render::render_chart;
use crate::chart::{ChartArtifact, ChartKind, export_png};
use crate::data::columns::{ColumnClassification, classify};
use crate::data::export::export_report;
use crate::data::loader::load_file;
use crate::data::model::Dataset;
use crate::data::report::{AggregateFn, Report, ReportId, build_report};
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Dropdown selections
// ---------------------------------------------------------------------------

/// Current dropdown values.  An empty string means nothing is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    pub group: String,
    pub agg: String,
    pub value: String,
    pub chart_kind: String,
}

impl Selections {
    /// Clear column selections that the newly loaded dataset no longer offers.
    pub fn retain_valid(&mut self, classes: &ColumnClassification) {
        if !classes.textual.contains(&self.group) {
            self.group.clear();
        }
        if !classes.numeric.contains(&self.value) {
            self.value.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Everything one analysis session owns, independent of rendering.
///
/// Each transition either succeeds and replaces the affected value wholesale,
/// or fails and leaves every field as it was.
#[derive(Debug, Default)]
pub struct SessionState {
    file: Option<PathBuf>,
    dataset: Option<Dataset>,
    report: Option<Report>,
    chart: Option<ChartArtifact>,
    last_report_id: u64,
    last_chart_serial: u64,
}

impl SessionState {
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn chart(&self) -> Option<&ChartArtifact> {
        self.chart.as_ref()
    }

    /// Textual / numeric column split of the current dataset.
    pub fn classification(&self) -> Option<ColumnClassification> {
        self.dataset.as_ref().map(classify)
    }

    /// Remember the file chosen in the browse dialog.  Nothing is read yet.
    pub fn select_file(&mut self, path: PathBuf) {
        log::info!("Selected {}", path.display());
        self.file = Some(path);
    }

    /// Read the selected file, replacing the dataset only on success.
    pub fn read_file(&mut self) -> Result<&Dataset, AnalysisError> {
        let path = self.file.as_deref().ok_or(AnalysisError::NoFile)?;
        let dataset = load_file(path).map_err(AnalysisError::Read)?;
        log::info!(
            "Loaded {} rows from {} with columns {:?}",
            dataset.num_rows(),
            dataset.source.display(),
            dataset.column_names()
        );
        Ok(self.dataset.insert(dataset))
    }

    /// Group, aggregate and sort the current dataset into a new report.
    pub fn build_report(
        &mut self,
        group: &str,
        agg: &str,
        value: &str,
    ) -> Result<&Report, AnalysisError> {
        let dataset = self.dataset.as_ref().ok_or(AnalysisError::NoDataset)?;
        if group.is_empty() {
            return Err(AnalysisError::MissingSelection("Group By"));
        }
        if agg.is_empty() {
            return Err(AnalysisError::MissingSelection("Aggregation"));
        }
        if value.is_empty() {
            return Err(AnalysisError::MissingSelection("Value Column"));
        }

        let agg: AggregateFn = agg.parse()?;
        let table = build_report(dataset, group, agg, value)?;

        let id = ReportId(self.last_report_id + 1);
        log::info!("Built report {id:?}: {agg}({value}) by {group}, {} groups", table.num_rows());
        if log::log_enabled!(log::Level::Debug) {
            if let Ok(pretty) = arrow::util::pretty::pretty_format_batches(&[table.clone()]) {
                log::debug!("\n{pretty}");
            }
        }

        self.last_report_id = id.0;
        Ok(self.report.insert(Report {
            id,
            group_column: group.to_string(),
            value_column: value.to_string(),
            agg,
            table,
        }))
    }

    /// Render the current report as a chart, replacing any previous chart.
    ///
    /// A kind name outside the four known kinds draws an empty frame.
    pub fn render_chart(&mut self, kind: &str) -> Result<&ChartArtifact, AnalysisError> {
        let report = self.report.as_ref().ok_or(AnalysisError::NoArtifact("report"))?;
        if kind.is_empty() {
            return Err(AnalysisError::MissingSelection("Chart Type"));
        }
        let parsed: Option<ChartKind> = kind.parse().ok();
        if parsed.is_none() {
            log::warn!("Unknown chart kind {kind:?}; drawing an empty frame");
        }

        let serial = self.last_chart_serial + 1;
        let artifact = render_chart(report, parsed, serial).map_err(AnalysisError::Render)?;
        self.last_chart_serial = serial;
        Ok(self.chart.insert(artifact))
    }

    /// Whether the current chart was drawn from an older report.
    pub fn chart_is_stale(&self) -> bool {
        match (&self.chart, &self.report) {
            (Some(chart), Some(report)) => chart.report_id != report.id,
            _ => false,
        }
    }

    /// The report, if one can be exported right now.
    pub fn exportable_report(&self) -> Result<&Report, AnalysisError> {
        self.report.as_ref().ok_or(AnalysisError::NoArtifact("report"))
    }

    /// The chart, if it exists and still matches the current report.
    pub fn exportable_chart(&self) -> Result<&ChartArtifact, AnalysisError> {
        let chart = self.chart.as_ref().ok_or(AnalysisError::NoArtifact("chart"))?;
        if self.chart_is_stale() {
            return Err(AnalysisError::StaleChart);
        }
        Ok(chart)
    }

    pub fn export_report(&self, dest: &Path) -> Result<(), AnalysisError> {
        let report = self.exportable_report()?;
        export_report(&report.table, dest).map_err(AnalysisError::Write)?;
        log::info!("Exported report {:?} to {}", report.id, dest.display());
        Ok(())
    }

    pub fn export_chart(&self, dest: &Path) -> Result<(), AnalysisError> {
        let chart = self.exportable_chart()?;
        export_png(chart, dest).map_err(AnalysisError::Write)?;
        log::info!("Exported chart to {}", dest.display());
        Ok(())
    }

    /// Folder of the selected input file; save dialogs start here.
    pub fn default_export_dir(&self) -> Option<PathBuf> {
        self.file
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
    }
}
