use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, Ui};

use crate::app::ReportApp;
use crate::chart::ChartKind;
use crate::data::report::AggregateFn;
use crate::ui::notify::{self, Notice};
use crate::ui::{chart, table};

pub const DEFAULT_REPORT_NAME: &str = "report.xlsx";
pub const DEFAULT_CHART_NAME: &str = "chart.png";

const COMBO_WIDTH: f32 = 160.0;

// ---------------------------------------------------------------------------
// File selection
// ---------------------------------------------------------------------------

/// Browse / read controls plus the selected path and dataset summary.
pub fn file_panel(ui: &mut Ui, app: &mut ReportApp) {
    ui.strong("File Selection");
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Browse File").clicked() {
            browse_file(app);
        }
        if ui.button("Read File").clicked() {
            read_file(app);
        }

        match app.session.file() {
            Some(path) => {
                ui.label(RichText::new(path.display().to_string()).color(Color32::DARK_GREEN));
            }
            None => {
                ui.label(RichText::new("No file selected").color(Color32::RED));
            }
        }
    });

    if let Some(ds) = app.session.dataset() {
        ui.label(ds.summary());
    }
}

fn browse_file(app: &mut ReportApp) {
    let file = rfd::FileDialog::new()
        .set_title("Open data file")
        .add_filter(
            "Supported files",
            &["csv", "xlsx", "xlsm", "xlsb", "xls", "ods", "parquet", "pq", "json"],
        )
        .add_filter("CSV", &["csv"])
        .add_filter("Excel", &["xlsx", "xlsm", "xlsb", "xls", "ods"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Selected {}", path.display());
        app.session.select_file(path);
    }
}

fn read_file(app: &mut ReportApp) {
    let result = app.session.read_file().map(|_| ());
    match result {
        Ok(()) => {
            if let Some(classes) = app.session.classification() {
                app.selections.retain_valid(&classes);
            }
        }
        Err(e) => app.fail(e),
    }
}

// ---------------------------------------------------------------------------
// Report builder
// ---------------------------------------------------------------------------

/// Group-by / aggregation / value dropdowns with preview and export.
pub fn report_panel(ui: &mut Ui, app: &mut ReportApp) {
    let classes = app.session.classification().unwrap_or_default();
    let aggregations: Vec<String> = AggregateFn::ALL.iter().map(|a| a.to_string()).collect();

    ui.strong("Report Builder");
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Group By:");
        combo(ui, "group_by", &mut app.selections.group, &classes.textual);
        ui.label("Aggregation:");
        combo(ui, "aggregation", &mut app.selections.agg, &aggregations);
        ui.label("Value Column:");
        combo(ui, "value_column", &mut app.selections.value, &classes.numeric);

        if ui.button("Preview Report").clicked() {
            preview_report(app);
        }
        if ui.button("Export Report").clicked() {
            export_report(app);
        }
    });
}

fn preview_report(app: &mut ReportApp) {
    let s = &app.selections;
    let result = app.session.build_report(&s.group, &s.agg, &s.value).map(|_| ());
    if let Err(e) = result {
        app.fail(e);
    }
}

fn export_report(app: &mut ReportApp) {
    if let Err(e) = app.session.exportable_report().map(|_| ()) {
        app.fail(e);
        return;
    }

    let mut dialog = rfd::FileDialog::new()
        .set_title("Export report")
        .set_file_name(DEFAULT_REPORT_NAME)
        .add_filter("Excel", &["xlsx"])
        .add_filter("CSV", &["csv"]);
    if let Some(dir) = app.session.default_export_dir() {
        dialog = dialog.set_directory(dir);
    }
    let Some(dest) = dialog.save_file() else {
        return;
    };

    let dest = with_default_extension(dest, "xlsx");
    match app.session.export_report(&dest) {
        Ok(()) => notify::raise(&mut app.notice, Notice::info("Success", "Report exported successfully!")),
        Err(e) => app.fail(e),
    }
}

// ---------------------------------------------------------------------------
// Chart builder
// ---------------------------------------------------------------------------

/// Chart type dropdown with preview and export.
pub fn chart_panel(ui: &mut Ui, app: &mut ReportApp) {
    let kinds: Vec<String> = ChartKind::ALL.iter().map(|k| k.to_string()).collect();

    ui.strong("Chart Builder");
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Chart Type:");
        combo(ui, "chart_type", &mut app.selections.chart_kind, &kinds);

        if ui.button("Preview Chart").clicked() {
            preview_chart(app);
        }
        if ui.button("Export Chart").clicked() {
            export_chart(app);
        }
    });
}

fn preview_chart(app: &mut ReportApp) {
    let result = app.session.render_chart(&app.selections.chart_kind).map(|_| ());
    if let Err(e) = result {
        app.fail(e);
    }
}

fn export_chart(app: &mut ReportApp) {
    if let Err(e) = app.session.exportable_chart().map(|_| ()) {
        app.fail(e);
        return;
    }

    let mut dialog = rfd::FileDialog::new()
        .set_title("Export chart")
        .set_file_name(DEFAULT_CHART_NAME)
        .add_filter("PNG", &["png"]);
    if let Some(dir) = app.session.default_export_dir() {
        dialog = dialog.set_directory(dir);
    }
    let Some(dest) = dialog.save_file() else {
        return;
    };

    let dest = with_default_extension(dest, "png");
    match app.session.export_chart(&dest) {
        Ok(()) => notify::raise(&mut app.notice, Notice::info("Success", "Chart exported successfully!")),
        Err(e) => app.fail(e),
    }
}

// ---------------------------------------------------------------------------
// Output area
// ---------------------------------------------------------------------------

/// Report grid on the left, chart preview on the right.
pub fn output_area(ui: &mut Ui, app: &mut ReportApp) {
    let stale = app.session.chart_is_stale();
    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].strong("Report");
        cols[0].separator();
        table::show_report(&mut cols[0], &mut app.table, app.session.report());

        cols[1].strong("Chart");
        cols[1].separator();
        chart::show_chart(&mut cols[1], &mut app.preview, app.session.chart(), stale);
    });
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn combo(ui: &mut Ui, id: &str, selected: &mut String, options: &[String]) {
    egui::ComboBox::from_id_salt(id)
        .width(COMBO_WIDTH)
        .selected_text(selected.clone())
        .show_ui(ui, |ui: &mut Ui| {
            for option in options {
                ui.selectable_value(selected, option.clone(), option);
            }
        });
}

/// Save dialogs may return a bare name; give it the dialog's default type.
fn with_default_extension(mut path: PathBuf, ext: &str) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension(ext);
    }
    path
}
