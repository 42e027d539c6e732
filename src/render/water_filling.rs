use std::path::Path;

use plotters::prelude::*;

use crate::{
    core::{
        curve::LoadCurve,
        power_law::PowerLaw,
        scaling::ScalingPoint,
        water_filling::Dispatch,
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

const CHARGE_COLOR: RGBColor = RGBColor(0x2A, 0x9D, 0x8F);
const DISCHARGE_COLOR: RGBColor = RGBColor(0xE7, 0x6F, 0x51);
const FLATTENED_COLOR: RGBColor = RGBColor(0x1F, 0x77, 0xB4);
const BALANCE_COLOR: RGBColor = RGBColor(0x9E, 0x9E, 0x9E);

pub struct WaterFillingChart<'a> {
    pub curve: &'a LoadCurve,

    /// Dispatch of the showcased battery.
    pub dispatch: &'a Dispatch,

    pub capacity: MegawattHours,
    pub points: &'a [ScalingPoint],
    pub fit: &'a PowerLaw,
}

/// Dispatch of the showcased battery on the left, the scaling law on the right.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn draw(path: &Path, chart: &WaterFillingChart<'_>) -> Result {
    render(path, SIZE, |root| {
        let (left, right) = root.split_horizontally(SIZE.0 / 2);
        draw_mechanism_panel(&left, chart)?;
        draw_scaling_panel(&right, chart.points, chart.fit)
    })
}

fn draw_mechanism_panel(area: &Area<'_>, chart: &WaterFillingChart<'_>) -> Result {
    area.fill(&PANEL_BACKGROUND)?;

    let time: Vec<f64> = chart.curve.time().iter().map(|time| time.0).collect();
    let load: Vec<f64> = chart.curve.load().iter().map(|load| load.0).collect();
    let adjusted: Vec<f64> = chart.dispatch.adjusted.iter().map(|load| load.0).collect();
    let lifted: Vec<f64> =
        load.iter().zip(&chart.dispatch.charge).map(|(load, charge)| load + charge.0).collect();
    let lowered: Vec<f64> = load
        .iter()
        .zip(&chart.dispatch.discharge)
        .map(|(load, discharge)| load - discharge.0)
        .collect();
    let y_range = headroom(load.iter().chain(&adjusted).copied(), 1.15);

    let mut chart_context = ChartBuilder::on(area)
        .caption(
            format!("Water-Filling Mechanism ({} Battery)", chart.capacity),
            CAPTION_FONT,
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(75)
        .build_cartesian_2d(0.0..24.0, y_range)?;
    chart_context
        .configure_mesh()
        .x_desc("Hour of Day")
        .y_desc("Load (MW)")
        .x_labels(9)
        .y_label_formatter(&|load| format!("{load:.0}"))
        .draw()?;

    chart_context
        .draw_series([Polygon::new(band(&time, &lifted, &load), CHARGE_COLOR.mix(0.35).filled())])?
        .label("Charging (Valley Fill)")
        .legend(legend_box(CHARGE_COLOR));
    chart_context
        .draw_series([Polygon::new(
            band(&time, &load, &lowered),
            DISCHARGE_COLOR.mix(0.35).filled(),
        )])?
        .label("Discharging (Peak Shave)")
        .legend(legend_box(DISCHARGE_COLOR));
    chart_context
        .draw_series(LineSeries::new(time.iter().copied().zip(load), BLACK.stroke_width(2)))?
        .label("Original Load")
        .legend(legend_line(BLACK));
    chart_context
        .draw_series(LineSeries::new(
            time.iter().copied().zip(adjusted),
            FLATTENED_COLOR.stroke_width(2),
        ))?
        .label("Flattened Load")
        .legend(legend_line(FLATTENED_COLOR));

    if let Some(levels) = chart.dispatch.levels {
        for level in [levels.charge, levels.discharge] {
            chart_context.draw_series(std::iter::once(PathElement::new(
                vec![(0.0, level.0), (24.0, level.0)],
                BLACK.mix(0.25).stroke_width(1),
            )))?;
        }
        chart_context
            .draw_series(std::iter::once(PathElement::new(
                vec![(0.0, levels.balance.0), (24.0, levels.balance.0)],
                BALANCE_COLOR.stroke_width(1),
            )))?
            .label(format!("Balance Level ({})", levels.balance))
            .legend(legend_line(BALANCE_COLOR));
        debug!(
            balance = %levels.balance,
            charge = %levels.charge,
            discharge = %levels.discharge,
            "drew the levels",
        );
    }

    chart_context
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&TRANSPARENT)
        .draw()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use super::*;
    use crate::{
        core::{
            curve::{DuckProfile, Sampling},
            power_law::{PowerLawForm, fit_power_law},
            scaling::{ScalingPoint, split},
            water_filling::WaterFilling,
        },
        quantity::power::Megawatts,
    };

    #[test]
    fn test_draw_showcase_dispatch() {
        let curve = DuckProfile::EVENING_RAMP.sample(100, Sampling::Closed).unwrap();
        let dispatch = |capacity: f64| {
            WaterFilling::builder()
                .loads(curve.load())
                .time_step(curve.time_step())
                .capacity(MegawattHours::from(capacity))
                .power_rating(Megawatts::from(3000.0))
                .solve()
                .unwrap()
        };
        let points: Vec<ScalingPoint> = [0.0, 100.0, 1000.0, 10_000.0, 50_000.0]
            .map(|capacity| ScalingPoint {
                capacity: MegawattHours::from(capacity),
                peak: dispatch(capacity).peak(),
            })
            .to_vec();
        let (capacities, peaks) = split(&points);
        let fit = fit_power_law(&capacities, &peaks, PowerLawForm::WithOffset).unwrap();
        let showcase = dispatch(20_000.0);

        let path = env::temp_dir().join(format!("water-filling-{}.png", std::process::id()));
        let chart = WaterFillingChart {
            curve: &curve,
            dispatch: &showcase,
            capacity: MegawattHours::from(20_000.0),
            points: &points,
            fit: &fit,
        };
        draw(&path, &chart).unwrap();
        assert!(path.is_file());
        fs::remove_file(path).unwrap();
    }
}
