use std::path::Path;

use plotters::prelude::*;

use crate::{
    core::{
        curve::LoadCurve,
        peak_shaving::PeakShaving,
        power_law::PowerLaw,
        scaling::ScalingPoint,
    },
    prelude::*,
    quantity::energy::MegawattHours,
    render::{
        Area,
        CAPTION_FONT,
        PANEL_BACKGROUND,
        band,
        draw_scaling_panel,
        headroom,
        legend_box,
        legend_line,
        render,
    },
};

const SIZE: (u32, u32) = (1560, 672);

const SHAVED_COLOR: RGBColor = RGBColor(0xE6, 0x39, 0x46);

pub struct PeakShavingChart<'a> {
    pub curve: &'a LoadCurve,
    pub shaving: &'a PeakShaving,
    pub capacity: MegawattHours,
    pub points: &'a [ScalingPoint],
    pub fit: &'a PowerLaw,
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn draw(path: &Path, chart: &PeakShavingChart<'_>) -> Result {
    render(path, SIZE, |root| {
        let (left, right) = root.split_horizontally(SIZE.0 / 2);
        draw_mechanism_panel(&left, chart)?;
        draw_scaling_panel(&right, chart.points, chart.fit)
    })
}

fn draw_mechanism_panel(area: &Area<'_>, chart: &PeakShavingChart<'_>) -> Result {
    area.fill(&PANEL_BACKGROUND)?;

    let time: Vec<f64> = chart.curve.time().iter().map(|time| time.0).collect();
    let load: Vec<f64> = chart.curve.load().iter().map(|load| load.0).collect();
    let shaved: Vec<f64> = chart.shaving.adjusted.iter().map(|load| load.0).collect();
    let ceiling = chart.shaving.ceiling.0;

    let mut chart_context = ChartBuilder::on(area)
        .caption("Reverse Water-Filling Mechanism", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(75)
        .build_cartesian_2d(0.0..24.0, headroom(load.iter().copied(), 1.12))?;
    chart_context
        .configure_mesh()
        .x_desc("Hour of Day")
        .y_desc("Load (MW)")
        .x_labels(9)
        .y_label_formatter(&|load| format!("{load:.0}"))
        .draw()?;

    chart_context
        .draw_series([Polygon::new(band(&time, &load, &shaved), SHAVED_COLOR.mix(0.35).filled())])?
        .label("Optimal Peak Shaving")
        .legend(legend_box(SHAVED_COLOR));
    chart_context
        .draw_series(LineSeries::new(time.iter().copied().zip(load), BLACK.stroke_width(2)))?
        .label("Original Load")
        .legend(legend_line(BLACK));
    chart_context
        .draw_series(LineSeries::new(
            time.iter().copied().zip(shaved),
            SHAVED_COLOR.stroke_width(2),
        ))?
        .label(format!("Shaved Load ({})", chart.capacity))
        .legend(legend_line(SHAVED_COLOR));
    chart_context.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, ceiling), (24.0, ceiling)],
        SHAVED_COLOR.mix(0.5).stroke_width(1),
    )))?;

    chart_context
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&TRANSPARENT)
        .draw()?;
    Ok(())
}
