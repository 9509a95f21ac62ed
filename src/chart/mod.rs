/// Chart layer: render a report into an in-memory raster and save it.
///
/// ```text
///   Report (key, value)
///        │
///        ▼
///   ┌──────────┐
///   │  render   │  plotters → RGB pixel buffer (ChartArtifact)
///   └──────────┘
///        │
///        ├──────────► egui texture (preview)
///        ▼
///   export_png      image → .png on disk
/// ```
pub mod render;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};

use crate::data::report::ReportId;

/// Pixel size of every rendered chart.
pub const CHART_SIZE: (u32, u32) = (900, 600);

// ---------------------------------------------------------------------------
// Chart kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    /// Horizontal bars.
    Column,
    Line,
    Pie,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Bar,
        ChartKind::Column,
        ChartKind::Line,
        ChartKind::Pie,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar",
            ChartKind::Column => "Column",
            ChartKind::Line => "Line",
            ChartKind::Pie => "Pie",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or(())
    }
}

// ---------------------------------------------------------------------------
// Rendered chart
// ---------------------------------------------------------------------------

/// A chart drawn from one specific report.
#[derive(Clone)]
pub struct ChartArtifact {
    /// Serial number of this rendering; previews cache textures by it.
    pub serial: u64,
    /// The report this chart was drawn from.
    pub report_id: ReportId,
    /// `None` when the requested kind was not recognised (empty frame).
    pub kind: Option<ChartKind>,
    pub width: u32,
    pub height: u32,
    /// Row-major RGB8 pixels, `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

impl fmt::Debug for ChartArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartArtifact")
            .field("serial", &self.serial)
            .field("report_id", &self.report_id)
            .field("kind", &self.kind)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Save the chart's pixels as a PNG image at its render resolution.
pub fn export_png(artifact: &ChartArtifact, dest: &Path) -> Result<()> {
    let image = RgbImage::from_raw(artifact.width, artifact.height, artifact.pixels.clone())
        .context("chart pixel buffer does not match its dimensions")?;
    image
        .save_with_format(dest, ImageFormat::Png)
        .with_context(|| format!("saving chart to {}", dest.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Pie geometry
// ---------------------------------------------------------------------------

/// One pie wedge with its share of the total.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    /// Share of the total in `0.0..=1.0`.
    pub fraction: f64,
}

impl PieSlice {
    /// Percentage with one decimal, e.g. `85.7%`.
    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.fraction * 100.0)
    }
}

/// Split `values` into wedges.  Empty when the total is not positive.
pub fn pie_slices(labels: &[String], values: &[f64]) -> Vec<PieSlice> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Vec::new();
    }
    labels
        .iter()
        .zip(values)
        .map(|(label, &value)| PieSlice {
            label: label.clone(),
            value,
            fraction: value / total,
        })
        .collect()
}
