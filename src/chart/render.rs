use std::f64::consts::TAU;
use std::ops::Range;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{CHART_SIZE, ChartArtifact, ChartKind, pie_slices};
use crate::color::{SERIES_COLOR, generate_palette};
use crate::data::report::Report;

const TITLE: &str = "Report Chart";
const FONT: &str = "sans-serif";
/// Pie wedges start at twelve o'clock.
const PIE_START_DEGREES: f64 = -90.0;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

// ---------------------------------------------------------------------------
// Report → plottable series
// ---------------------------------------------------------------------------

/// Category labels (first column) and magnitudes (second column, null as 0).
pub fn series(table: &RecordBatch) -> Result<(Vec<String>, Vec<f64>)> {
    if table.num_columns() < 2 {
        bail!("a chart needs a table with at least two columns");
    }

    let keys = table.column(0);
    let formatter = ArrayFormatter::try_new(keys.as_ref(), &FormatOptions::default())
        .context("formatting chart labels")?;
    let labels = (0..keys.len())
        .map(|i| formatter.value(i).to_string())
        .collect();

    let values = cast(table.column(1), &DataType::Float64).context("chart values must be numeric")?;
    let values = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .context("expected Float64 values")?;
    let values = (0..values.len())
        .map(|i| if values.is_valid(i) { values.value(i) } else { 0.0 })
        .collect();

    Ok((labels, values))
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Draw `report` as a `kind` chart into a fresh pixel buffer.
///
/// An unrecognised kind (`None`) or an empty report produces the titled,
/// otherwise empty frame.
pub fn render_chart(report: &Report, kind: Option<ChartKind>, serial: u64) -> Result<ChartArtifact> {
    let (labels, values) = series(&report.table)?;
    if kind == Some(ChartKind::Pie) && values.iter().any(|v| *v < 0.0) {
        bail!("pie charts need non-negative values");
    }
    let (width, height) = CHART_SIZE;
    let mut pixels = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        let area = root.titled(TITLE, (FONT, 24))?;

        if !labels.is_empty() {
            let axes = (report.group_column.as_str(), report.value_column.as_str());
            match kind {
                Some(ChartKind::Bar) => draw_bars(&area, &labels, &values, axes)?,
                Some(ChartKind::Column) => draw_columns(&area, &labels, &values, axes)?,
                Some(ChartKind::Line) => draw_line(&area, &labels, &values, axes)?,
                Some(ChartKind::Pie) => draw_pie(&area, &labels, &values)?,
                None => {}
            }
        }
        root.present()?;
    }

    log::info!(
        "Rendered {} chart for report {:?} ({} categories)",
        kind.map_or("empty", ChartKind::as_str),
        report.id,
        labels.len()
    );

    Ok(ChartArtifact {
        serial,
        report_id: report.id,
        kind,
        width,
        height,
        pixels,
    })
}

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

/// Value axis covering zero and every value, with 5% head room.
fn bar_range(values: &[f64]) -> Range<f64> {
    let lo = values.iter().copied().fold(0.0, f64::min);
    let hi = values.iter().copied().fold(0.0, f64::max);
    padded(lo, hi)
}

/// Value axis covering only the data, with 5% head room.
fn line_range(values: &[f64]) -> Range<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    padded(lo, hi)
}

fn padded(lo: f64, hi: f64) -> Range<f64> {
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    let lo = if lo == 0.0 { 0.0 } else { lo - pad };
    lo..hi + pad
}

fn segment_label(labels: &[String], value: &SegmentValue<u32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Chart shapes
// ---------------------------------------------------------------------------

fn draw_bars(area: &Area<'_>, labels: &[String], values: &[f64], axes: (&str, &str)) -> Result<()> {
    let n = labels.len() as u32;
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..n).into_segmented(), bar_range(values))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|v| segment_label(labels, v))
        .x_desc(axes.0)
        .y_desc(axes.1)
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(SERIES_COLOR.filled())
            .margin(8)
            .data(values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
    )?;
    Ok(())
}

fn draw_columns(area: &Area<'_>, labels: &[String], values: &[f64], axes: (&str, &str)) -> Result<()> {
    let n = labels.len() as u32;
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(120)
        .build_cartesian_2d(bar_range(values), (0u32..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(labels.len())
        .y_label_formatter(&|v| segment_label(labels, v))
        .x_desc(axes.1)
        .y_desc(axes.0)
        .draw()?;

    chart.draw_series(
        Histogram::horizontal(&chart)
            .style(SERIES_COLOR.filled())
            .margin(8)
            .data(values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
    )?;
    Ok(())
}

fn draw_line(area: &Area<'_>, labels: &[String], values: &[f64], axes: (&str, &str)) -> Result<()> {
    let n = labels.len() as u32;
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..n).into_segmented(), line_range(values))?;

    chart
        .configure_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|v| segment_label(labels, v))
        .x_desc(axes.0)
        .y_desc(axes.1)
        .draw()?;

    chart.draw_series(LineSeries::new(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (SegmentValue::CenterOf(i as u32), *v)),
        SERIES_COLOR.stroke_width(2),
    ))?;
    Ok(())
}

fn draw_pie(area: &Area<'_>, labels: &[String], values: &[f64]) -> Result<()> {
    let slices = pie_slices(labels, values);
    if slices.is_empty() {
        return Ok(());
    }

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = f64::from(w.min(h)) * 0.35;
    let sizes: Vec<f64> = slices.iter().map(|s| s.value).collect();
    let colors = generate_palette(slices.len());
    let names: Vec<&str> = slices.iter().map(|s| s.label.as_str()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &names);
    pie.start_angle(PIE_START_DEGREES);
    pie.label_style((FONT, 16).into_font().color(&BLACK));
    area.draw(&pie)?;

    // Percentages sit inside each wedge, matching the wedge order above.
    let text_style = (FONT, 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    let mut theta = PIE_START_DEGREES.to_radians();
    for slice in &slices {
        let sweep = slice.fraction * TAU;
        let mid = theta + sweep / 2.0;
        let at = (
            center.0 + (radius * 0.6 * mid.cos()) as i32,
            center.1 + (radius * 0.6 * mid.sin()) as i32,
        );
        area.draw(&Text::new(slice.percent_label(), at, text_style.clone()))?;
        theta += sweep;
    }
    Ok(())
}
