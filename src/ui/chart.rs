use eframe::egui::{self, Color32, ColorImage, RichText, TextureHandle, TextureOptions, Ui};

use crate::chart::ChartArtifact;

/// GPU texture for the artifact currently on screen, keyed by its serial.
#[derive(Default)]
pub struct ChartPreview {
    texture: Option<(u64, TextureHandle)>,
}

impl ChartPreview {
    fn texture_for(&mut self, ctx: &egui::Context, chart: &ChartArtifact) -> TextureHandle {
        if let Some((serial, texture)) = &self.texture {
            if *serial == chart.serial {
                return texture.clone();
            }
        }

        let size = [chart.width as usize, chart.height as usize];
        let image = ColorImage::from_rgb(size, &chart.pixels);
        let texture = ctx.load_texture("chart_preview", image, TextureOptions::LINEAR);
        log::debug!("Uploaded chart #{} as a {}x{} texture", chart.serial, size[0], size[1]);
        self.texture = Some((chart.serial, texture.clone()));
        texture
    }
}

/// Show the latest chart scaled into the available space.
pub fn show_chart(ui: &mut Ui, preview: &mut ChartPreview, chart: Option<&ChartArtifact>, stale: bool) {
    let Some(chart) = chart else {
        preview.texture = None;
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Preview a chart to see it here.");
        });
        return;
    };

    if stale {
        ui.label(
            RichText::new("The report changed since this chart was drawn. Preview the chart again.")
                .color(Color32::from_rgb(200, 120, 0)),
        );
    }

    let texture = preview.texture_for(ui.ctx(), chart);
    ui.add(egui::Image::from_texture(&texture).shrink_to_fit());
}
