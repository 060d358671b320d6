//! Dispersion field 3D surface plot

use plotters::{coord::Shift, prelude::*};
use std::path::Path;

use crate::ScalarField;

#[derive(thiserror::Error, Debug)]
pub enum PlotError {
    #[error("cannot plot a dispersion field with non-finite values")]
    NonFinite,
    #[error("failed to draw the surface plot: {0}")]
    Drawing(String),
}
type Result<T> = std::result::Result<T, PlotError>;

fn drawing<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> PlotError {
    PlotError::Drawing(e.to_string())
}

/// Maps `value` within `[min,max]` to the viridis colormap
fn viridis(value: f64, (min, max): (f64, f64)) -> RGBColor {
    let u = if max > min {
        ((value - min) / (max - min)).clamp(0., 1.)
    } else {
        0.5
    };
    let c = colorous::VIRIDIS.eval_continuous(u).as_tuple();
    RGBColor(c.0, c.1, c.2)
}

/// Axis names with their anchor in (longitude, level, latitude) coordinates
fn axis_labels(
    lon: (f64, f64),
    level: (f64, f64),
    lat: (f64, f64),
) -> [(&'static str, (f64, f64, f64)); 3] {
    [
        ("Longitude", (0.5 * (lon.0 + lon.1), level.0, lat.0)),
        ("Latitude", (lon.1, level.0, 0.5 * (lat.0 + lat.1))),
        ("Pollution Level", (lon.0, level.1, lat.0)),
    ]
}

/// Pads the value axis so that a flat field still gets a drawable range
fn value_axis((min, max): (f64, f64)) -> std::ops::Range<f64> {
    let pad = match max - min {
        d if d > 0. => 0.05 * d,
        _ if max != 0. => 1e-3 * max.abs(),
        _ => 1.,
    };
    min - pad..max + pad
}

/// Draws the surface of the dispersion field on `root`
pub fn draw_surface<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    field: &ScalarField,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let minmax = field.minmax().ok_or(PlotError::NonFinite)?;
    let lon = field.longitudes();
    let lat = field.latitudes();
    let lon_range = (lon[0], lon[lon.len() - 1]);
    let lat_range = (lat[0], lat[lat.len() - 1]);
    let level = value_axis(minmax);
    let level_range = (level.start, level.end);

    root.fill(&WHITE).map_err(drawing)?;
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .build_cartesian_3d(
            lon_range.0..lon_range.1,
            level,
            lat_range.0..lat_range.1,
        )
        .map_err(drawing)?;
    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.4;
        pb.scale = 0.8;
        pb.into_matrix()
    });
    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.15))
        .max_light_lines(3)
        .x_formatter(&|x| format!("{:.3}", x))
        .y_formatter(&|y| format!("{:.3e}", y))
        .z_formatter(&|z| format!("{:.3}", z))
        .draw()
        .map_err(drawing)?;

    let style = |value: &f64| viridis(*value, minmax).filled();
    chart
        .draw_series(
            SurfaceSeries::xoz(lon.iter().cloned(), lat.iter().cloned(), |x, z| {
                let (i, j) = field.nearest(x, z);
                field.value(i, j)
            })
            .style_func(&style),
        )
        .map_err(drawing)?;
    chart
        .draw_series(
            axis_labels(lon_range, level_range, lat_range)
                .into_iter()
                .map(|(label, position)| {
                    Text::new(label, position, ("sans-serif", 18).into_font())
                }),
        )
        .map_err(drawing)?;
    root.present().map_err(drawing)?;
    Ok(())
}

/// Renders the surface of the dispersion field to a PNG file
///
/// The x axis is the longitude, the z axis the latitude and the y axis the pollution level.
pub fn render_surface<P: AsRef<Path>>(field: &ScalarField, title: &str, path: P) -> Result<()> {
    if !field.is_finite() {
        return Err(PlotError::NonFinite);
    }
    let root = BitMapBackend::new(path.as_ref(), (1024, 768)).into_drawing_area();
    draw_surface(&root, field, title)?;
    log::info!("surface plot written to {:?}", path.as_ref());
    Ok(())
}
