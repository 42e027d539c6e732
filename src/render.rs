//! PNG charts of the finished series.

pub mod bounds;
pub mod merit_order;
pub mod peak_shaving;
pub mod water_filling;

use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use plotters::{
    coord::Shift,
    prelude::*,
    style::{FontStyle, register_font},
};

use crate::{
    core::{power_law::PowerLaw, scaling::ScalingPoint},
    prelude::*,
    quantity::energy::MegawattHours,
};

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const PANEL_BACKGROUND: RGBColor = RGBColor(0xF7, 0xF5, 0xF0);
const SIMULATION_COLOR: RGBColor = RGBColor(0x26, 0x46, 0x53);
const FIT_COLOR: RGBColor = RGBColor(0xD6, 0x28, 0x28);

const CAPTION_FONT: (&str, f64) = ("sans-serif", 22.0);

/// Number of samples along a fitted curve.
const FIT_SAMPLES: usize = 200;

/// DejaVu Sans, see `assets/DejaVuSans.LICENSE`.
static SANS_SERIF: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Make the bundled typeface available as `sans-serif`, the only family the charts use.
fn register_fonts() -> Result {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let is_registered = *REGISTERED
        .get_or_init(|| register_font("sans-serif", FontStyle::Normal, SANS_SERIF).is_ok());
    ensure!(is_registered, "the bundled font could not be loaded");
    Ok(())
}

/// Draw a PNG chart of the given size.
///
/// The image is rendered into a scratch file next to the target and moved into place only
/// when the drawing succeeds, so a failed run never leaves a chart behind.
fn render(path: &Path, size: (u32, u32), draw: impl FnOnce(&Area<'_>) -> Result) -> Result {
    register_fonts()?;
    let scratch = scratch_path(path);
    if let Err(error) = render_into(&scratch, size, draw) {
        if let Err(remove_error) = fs::remove_file(&scratch) {
            debug!(path = %scratch.display(), %remove_error, "no scratch chart to remove");
        }
        return Err(error);
    }
    fs::rename(&scratch, path)
        .with_context(|| format!("failed to move the chart to `{}`", path.display()))
}

fn render_into(path: &Path, size: (u32, u32), draw: impl FnOnce(&Area<'_>) -> Result) -> Result {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    draw(&root)?;
    root.present().with_context(|| format!("failed to write `{}`", path.display()))?;
    Ok(())
}

/// `chart.png` becomes `chart.partial.png`, keeping the extension the encoder is chosen by.
fn scratch_path(path: &Path) -> PathBuf {
    let extension = path.extension().unwrap_or_default().to_owned();
    let mut scratch = path.with_extension("partial");
    scratch.as_mut_os_string().push(".");
    scratch.as_mut_os_string().push(extension);
    scratch
}

/// Range from zero to the maximum, with some headroom.
fn headroom(values: impl IntoIterator<Item = f64>, factor: f64) -> Range<f64> {
    let max = values.into_iter().fold(0.0, f64::max);
    0.0..(max * factor).max(1.0)
}

/// Smallest and largest of the finite values.
fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().filter(|value| value.is_finite()).fold(None, |extent, value| match extent {
        Some((min, max)) => Some((f64::min(min, value), f64::max(max, value))),
        None => Some((value, value)),
    })
}

/// Range enclosing the values, widened by the fraction of its span on each side.
fn padded(values: impl IntoIterator<Item = f64>, fraction: f64) -> Option<Range<f64>> {
    let (min, max) = extent(values)?;
    let padding = ((max - min) * fraction).max(max.abs() * 1e-3).max(1e-9);
    Some((min - padding)..(max + padding))
}

/// Positive range for a logarithmic axis, widened by the factor on each side.
fn log_range(values: impl IntoIterator<Item = f64>, factor: f64) -> Option<Range<f64>> {
    let (min, max) = extent(values.into_iter().filter(|value| *value > 0.0))?;
    Some((min / factor)..(max * factor))
}

/// Closed outline between two curves sharing the same abscissas.
fn band(x: &[f64], upper: &[f64], lower: &[f64]) -> Vec<(f64, f64)> {
    x.iter()
        .copied()
        .zip(upper.iter().copied())
        .chain(x.iter().copied().zip(lower.iter().copied()).rev())
        .collect()
}

fn legend_line(color: RGBColor) -> impl Fn((i32, i32)) -> PathElement<(i32, i32)> {
    move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
}

fn legend_box(color: RGBColor) -> impl Fn((i32, i32)) -> Rectangle<(i32, i32)> {
    move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.mix(0.35).filled())
}

/// Simulated peaks against capacity on a logarithmic axis, with the fitted law on top.
///
/// Zero capacity has no place on the axis and is left out.
fn draw_scaling_panel(area: &Area<'_>, points: &[ScalingPoint], fit: &PowerLaw) -> Result {
    area.fill(&PANEL_BACKGROUND)?;

    let points: Vec<(f64, f64)> = points
        .iter()
        .filter(|point| point.capacity > MegawattHours::ZERO)
        .map(|point| (point.capacity.0, point.peak.0))
        .collect();
    let (from, to) = extent(points.iter().map(|(capacity, _)| *capacity))
        .context("no positive capacities to plot")?;
    let fitted: Vec<(f64, f64)> = fit
        .sample(MegawattHours::from(from), MegawattHours::from(to), FIT_SAMPLES)
        .into_iter()
        .map(|(capacity, peak)| (capacity.0, peak.0))
        .collect();

    let x_range = log_range([from, to], 1.25).context("empty capacity range")?;
    let y_range = padded(points.iter().chain(&fitted).map(|(_, peak)| *peak), 0.08)
        .context("empty peak range")?;

    let mut chart = ChartBuilder::on(area)
        .caption("Scaling Law: Peak Load vs Battery Capacity", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(75)
        .build_cartesian_2d(x_range.log_scale(), y_range)?;
    chart
        .configure_mesh()
        .x_desc("Battery Capacity (MWh)")
        .y_desc("Peak Load (MW)")
        .y_label_formatter(&|peak| format!("{peak:.0}"))
        .draw()?;

    chart
        .draw_series(
            points.iter().map(|point| Circle::new(*point, 4, SIMULATION_COLOR.mix(0.9).filled())),
        )?
        .label("Simulation")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, SIMULATION_COLOR.filled()));
    chart
        .draw_series(LineSeries::new(fitted, FIT_COLOR.stroke_width(2)))?
        .label(format!("Power-Law Fit (α = {:.2})", fit.exponent))
        .legend(legend_line(FIT_COLOR));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&TRANSPARENT)
        .draw()?;
    Ok(())
}
