use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::data::report::{Report, ReportId};

// ---------------------------------------------------------------------------
// Table → string grid
// ---------------------------------------------------------------------------

/// A table flattened to display strings, ready for the grid widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// One header per column and one row per record, both in table order.
    /// Nulls render as empty cells.
    pub fn from_batch(batch: &RecordBatch) -> Result<Self, ArrowError> {
        let headers = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        let options = FormatOptions::default();
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = (0..batch.num_rows())
            .map(|row| formatters.iter().map(|f| f.value(row).to_string()).collect())
            .collect();

        Ok(TableView { headers, rows })
    }
}

// ---------------------------------------------------------------------------
// Grid widget
// ---------------------------------------------------------------------------

/// The grid for the most recently shown report, rebuilt when the report changes.
#[derive(Default)]
pub struct TableCache {
    shown: Option<(ReportId, TableView)>,
}

/// Render the current report, or a hint when there is none yet.
pub fn show_report(ui: &mut Ui, cache: &mut TableCache, report: Option<&Report>) {
    let Some(report) = report else {
        cache.shown = None;
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Preview a report to see it here.");
        });
        return;
    };

    let current = cache.shown.as_ref().map(|(id, _)| *id);
    if current != Some(report.id) {
        match TableView::from_batch(&report.table) {
            Ok(view) => cache.shown = Some((report.id, view)),
            Err(e) => {
                log::error!("Failed to format report {:?}: {e}", report.id);
                cache.shown = None;
            }
        }
    }

    if let Some((_, view)) = &cache.shown {
        ui.label(report.caption());
        show_table(ui, view);
    }
}

/// Project a [`TableView`] into a scrollable, striped grid.
pub fn show_table(ui: &mut Ui, view: &TableView) {
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .columns(Column::initial(150.0).at_least(40.0).clip(true), view.headers.len())
        .header(22.0, |mut header| {
            for name in &view.headers {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, view.rows.len(), |mut row| {
                let cells = &view.rows[row.index()];
                for cell in cells {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell);
                    });
                }
            });
        });
}
