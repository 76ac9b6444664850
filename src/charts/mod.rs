// src/charts/mod.rs
use crate::edgar::Observation;
use crate::utils::error::ChartError;
use chrono::{Duration, NaiveDate};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use std::io::Cursor;

const CHART_WIDTH: u32 = 1000;
const CHART_HEIGHT: u32 = 500;

/// Y-axis tick label scaling, chosen from the largest absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    Billions,
    Millions,
    Thousands,
    Unscaled,
}

impl AxisScale {
    pub fn for_values(values: &[f64], metric_name: &str) -> Self {
        let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_abs > 1e9 {
            AxisScale::Billions
        } else if max_abs > 1e6 {
            AxisScale::Millions
        } else if !is_per_share(metric_name) && max_abs > 0.0 {
            AxisScale::Thousands
        } else {
            AxisScale::Unscaled
        }
    }

    pub fn format(&self, value: f64) -> String {
        match self {
            AxisScale::Billions => format!("{:.2}B", value / 1e9),
            AxisScale::Millions => format!("{:.2}M", value / 1e6),
            AxisScale::Thousands => format!("{:.2}K", value / 1e3),
            AxisScale::Unscaled => format!("{}", value),
        }
    }
}

fn is_per_share(metric_name: &str) -> bool {
    metric_name.contains("EPS") || metric_name.to_lowercase().contains("per share")
}

pub fn chart_title(metric_name: &str, company_display_name: &str, unit: &str) -> String {
    format!(
        "Historical {} for {} ({})",
        metric_name, company_display_name, unit
    )
}

/// Draws the series as a line chart with point markers and returns it as PNG bytes.
///
/// `Ok(None)` means there was nothing to draw.
pub fn render(
    observations: &[Observation],
    metric_name: &str,
    company_display_name: &str,
    unit: &str,
) -> Result<Option<Vec<u8>>, ChartError> {
    let mut points: Vec<(NaiveDate, f64)> = observations
        .iter()
        .filter(|obs| obs.value.is_finite())
        .map(|obs| (obs.end_date, obs.value))
        .collect();
    if points.is_empty() {
        tracing::debug!("No plottable points for {} ({})", metric_name, company_display_name);
        return Ok(None);
    }
    points.sort_by_key(|(date, _)| *date);

    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let scale = AxisScale::for_values(&values, metric_name);
    let (x_range, y_range) = axis_ranges(&points);

    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(drawing_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                chart_title(metric_name, company_display_name, unit),
                ("sans-serif", 22),
            )
            .margin(15)
            .x_label_area_size(60)
            .y_label_area_size(90)
            .build_cartesian_2d(x_range, y_range)
            .map_err(drawing_error)?;

        chart
            .configure_mesh()
            .x_desc("Period End Date")
            .y_desc(metric_name)
            .x_label_formatter(&|date: &NaiveDate| date.format("%Y-%m-%d").to_string())
            .y_label_formatter(&|value: &f64| scale.format(*value))
            .x_label_style(
                ("sans-serif", 12)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .draw()
            .map_err(drawing_error)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
            .map_err(drawing_error)?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|point| Circle::new(*point, 4, BLUE.filled())),
            )
            .map_err(drawing_error)?;

        root.present().map_err(drawing_error)?;
    }

    let bitmap = RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, pixels)
        .ok_or_else(|| ChartError::Drawing("bitmap buffer has the wrong size".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    bitmap.write_to(&mut png, ImageFormat::Png)?;
    let png = png.into_inner();
    tracing::debug!("Rendered {} chart ({} bytes)", metric_name, png.len());
    Ok(Some(png))
}

/// Padded axis ranges; a single point or a flat series still gets a visible span.
fn axis_ranges(
    points: &[(NaiveDate, f64)],
) -> (
    plotters::coord::types::RangedDate<NaiveDate>,
    std::ops::Range<f64>,
) {
    let first = points.first().map(|(d, _)| *d).unwrap_or_default();
    let last = points.last().map(|(d, _)| *d).unwrap_or_default();
    let pad_days = ((last - first).num_days() / 20).max(15);
    let x_range = (first - Duration::days(pad_days))..(last + Duration::days(pad_days));

    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });
    let pad = if max > min {
        (max - min) * 0.1
    } else {
        max.abs().max(1.0) * 0.1
    };
    (x_range.into(), (min - pad)..(max + pad))
}

fn drawing_error<E: std::fmt::Display>(err: E) -> ChartError {
    ChartError::Drawing(err.to_string())
}
