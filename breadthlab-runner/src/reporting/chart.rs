//! Breadth line chart (SVG).
//!
//! Two series (fast and slow window) on a fixed 0-100 axis, with dashed
//! reference lines at the oversold, neutral and overbought levels. The x axis
//! is the row index; tick labels show the date of that row.

use super::ReportError;
use breadthlab_core::breadth::BreadthTable;
use plotters::prelude::*;
use std::path::Path;

/// Horizontal reference levels, in percent.
pub const REFERENCE_LEVELS: [f64; 3] = [20.0, 50.0, 80.0];

const SIZE: (u32, u32) = (1400, 600);
const DASHES: usize = 80;

pub fn chart_title(universe: &str) -> String {
    format!("{} DMA Breadth", universe.to_uppercase())
}

fn chart_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Chart(e.to_string())
}

pub fn render_breadth_chart(
    path: &Path,
    table: &BreadthTable,
    title: &str,
) -> Result<(), ReportError> {
    let rows = &table.rows;
    let x_max = rows.len().saturating_sub(1).max(1) as f64;
    let dates: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
    let (fast, slow) = (table.params.fast, table.params.slow);

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d(0f64..x_max, 0f64..100f64)
        .map_err(chart_err)?;

    let date_label = |x: &f64| {
        let i = x.round().max(0.0) as usize;
        dates.get(i).cloned().unwrap_or_default()
    };
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Breadth (%)")
        .x_labels(8)
        .y_labels(11)
        .x_label_formatter(&date_label)
        .light_line_style(BLACK.mix(0.05))
        .draw()
        .map_err(chart_err)?;

    // Dashed reference lines
    let dash = x_max / DASHES as f64;
    for level in REFERENCE_LEVELS {
        chart
            .draw_series((0..DASHES).step_by(2).map(|k| {
                let x0 = k as f64 * dash;
                PathElement::new(vec![(x0, level), (x0 + dash, level)], BLACK.mix(0.5).stroke_width(1))
            }))
            .map_err(chart_err)?;
    }

    chart
        .draw_series(LineSeries::new(
            rows.iter().enumerate().map(|(i, r)| (i as f64, r.pct_fast)),
            BLUE.stroke_width(2),
        ))
        .map_err(chart_err)?
        .label(format!("% Above {fast}DMA"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            rows.iter().enumerate().map(|(i, r)| (i as f64, r.pct_slow)),
            RED.stroke_width(2),
        ))
        .map_err(chart_err)?
        .label(format!("% Above {slow}DMA"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}
