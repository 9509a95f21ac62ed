use eframe::egui;

use crate::error::AnalysisError;
use crate::state::{SessionState, Selections};
use crate::ui::chart::ChartPreview;
use crate::ui::notify::{self, Notice};
use crate::ui::panels;
use crate::ui::table::TableCache;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ReportApp {
    pub session: SessionState,
    pub selections: Selections,
    pub notice: Option<Notice>,
    pub table: TableCache,
    pub preview: ChartPreview,
}

impl ReportApp {
    /// Log a failed action and surface it as a modal notice.
    pub fn fail(&mut self, err: AnalysisError) {
        log::error!("{}: {err}", err.title());
        notify::raise(&mut self.notice, Notice::error(&err));
    }
}

impl eframe::App for ReportApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panels: file, report and chart controls ----
        egui::TopBottomPanel::top("file_panel").show(ctx, |ui| {
            panels::file_panel(ui, self);
        });
        egui::TopBottomPanel::top("report_panel").show(ctx, |ui| {
            panels::report_panel(ui, self);
        });
        egui::TopBottomPanel::top("chart_panel").show(ctx, |ui| {
            panels::chart_panel(ui, self);
        });

        // ---- Central panel: report grid and chart preview ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::output_area(ui, self);
        });

        notify::show_notice(ctx, &mut self.notice);
    }
}
