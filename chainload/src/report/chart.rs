use crate::error::ReportError;
use crate::metrics::BlockSample;
use chainload_core::AttackResult;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const SIZE: (u32, u32) = (1200, 700);

fn chart_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> ReportError {
    ReportError::Chart(err.to_string())
}

// Leave some headroom above the highest point.
fn upper(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0., f64::max).max(1e-3) * 1.1
}

/// Latency of every request against the time it was issued.
pub(super) fn latency(path: &Path, results: &[AttackResult]) -> Result<(), ReportError> {
    let start = results.iter().map(|r| r.timestamp).min();
    let points: Vec<(f64, f64)> = match start {
        Some(start) => results
            .iter()
            .map(|r| {
                (
                    (r.timestamp - start).as_seconds_f64(),
                    r.latency.as_secs_f64() * 1e3,
                )
            })
            .collect(),
        None => vec![],
    };

    let max_x = upper(points.iter().map(|p| p.0));
    let max_y = upper(points.iter().map(|p| p.1));

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Request latency", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..max_x, 0f64..max_y)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Elapsed (s)")
        .y_desc("Latency (ms)")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 2, BLUE.filled())),
        )
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Per-block TPS on top, block interval below, both by height.
pub(super) fn blocks(path: &Path, samples: &[BlockSample]) -> Result<(), ReportError> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;
    let (top, bottom) = root.split_vertically(SIZE.1 / 2);

    series(
        &top,
        "Block TPS",
        "TPS",
        samples.iter().map(|s| (s.height as f64, s.tps)),
        &RED,
    )?;
    series(
        &bottom,
        "Block interval",
        "Interval (s)",
        samples
            .iter()
            .map(|s| (s.height as f64, s.interval.as_secs_f64())),
        &GREEN,
    )?;

    root.present().map_err(chart_err)?;
    Ok(())
}

fn series<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    y_desc: &str,
    points: impl Iterator<Item = (f64, f64)> + Clone,
    color: &RGBColor,
) -> Result<(), ReportError>
where
    DB::ErrorType: 'static,
{
    let first = points.clone().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let min_x = if first.is_finite() { first } else { 0. };
    let max_x = points.clone().map(|p| p.0).fold(min_x, f64::max) + 1.;
    let max_y = upper(points.clone().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(min_x..max_x, 0f64..max_y)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Height")
        .y_desc(y_desc)
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(points, color))
        .map_err(chart_err)?;
    Ok(())
}
