//! Nyquist SVG rendering with plotters.

use std::path::Path;

use plotters::prelude::*;

use super::NyquistSeries;
use crate::error::{EisFitError, Result};

const SIZE: (u32, u32) = (800, 700);

fn plot_err<E: std::fmt::Display>(e: E) -> EisFitError {
    EisFitError::Plot(e.to_string())
}

/// Render measured points and the fitted curve to an SVG file.
///
/// Real impedance on x, negative imaginary impedance on y, equal spans on
/// both axes. Errors never touch the fit itself.
pub fn render_nyquist_svg(path: &Path, series: &NyquistSeries, title: &str) -> Result<()> {
    let ((x0, x1), (y0, y1)) = series.axis_ranges();

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Z' (Ohm)")
        .y_desc("-Z'' (Ohm)")
        .x_labels(8)
        .y_labels(8)
        .draw()
        .map_err(plot_err)?;

    let curve = if series.smooth.is_empty() {
        &series.fitted
    } else {
        &series.smooth
    };
    chart
        .draw_series(LineSeries::new(curve.iter().copied(), RED.stroke_width(2)))
        .map_err(plot_err)?
        .label("fit")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .draw_series(
            series
                .measured
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, BLUE.filled())),
        )
        .map_err(plot_err)?
        .label("measured")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, BLUE.filled()));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
