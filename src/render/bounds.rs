use std::path::Path;

use plotters::prelude::*;

use crate::{
    core::{bounds::ScenarioBounds, power_law::PowerLaw},
    prelude::*,
    render::{CAPTION_FONT, band, legend_box, legend_line, log_range, render},
};

const SIZE: (u32, u32) = (1140, 720);

const CORRIDOR_COLOR: RGBColor = RGBColor(0xD9, 0xD9, 0xD9);
const OPTIMISTIC_COLOR: RGBColor = RGBColor(0x2C, 0xA0, 0x2C);
const PESSIMISTIC_COLOR: RGBColor = RGBColor(0xD6, 0x27, 0x28);
const EXPECTED_COLOR: RGBColor = RGBColor(0x1F, 0x77, 0xB4);

/// Fitted laws of the three bounds.
#[derive(Copy, Clone, Debug)]
pub struct CorridorFits {
    pub optimistic: PowerLaw,
    pub pessimistic: PowerLaw,
    pub expected: PowerLaw,
}

/// Safety corridor between the optimistic and pessimistic peaks, log-log.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn draw(path: &Path, bounds: &[ScenarioBounds], fits: &CorridorFits) -> Result {
    let capacity: Vec<f64> = bounds.iter().map(|bounds| bounds.capacity.0).collect();
    let optimistic: Vec<f64> = bounds.iter().map(|bounds| bounds.optimistic.0).collect();
    let pessimistic: Vec<f64> = bounds.iter().map(|bounds| bounds.pessimistic.0).collect();
    let expected: Vec<f64> = bounds.iter().map(|bounds| bounds.expected.0).collect();

    let x_range = log_range(capacity.iter().copied(), 1.15).context("no capacities to plot")?;
    let y_range = log_range(optimistic.iter().chain(&pessimistic).copied(), 1.05)
        .context("no positive peaks to plot")?;

    render(path, SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Bounded Energy Scaling Laws", CAPTION_FONT)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range.log_scale(), y_range.log_scale())?;
        chart
            .configure_mesh()
            .x_desc("Battery Capacity (MWh)")
            .y_desc("Peak Load (MW)")
            .y_label_formatter(&|peak| format!("{peak:.0}"))
            .draw()?;

        chart
            .draw_series([Polygon::new(
                band(&capacity, &pessimistic, &optimistic),
                CORRIDOR_COLOR.mix(0.5).filled(),
            )])?
            .label("Guaranteed Safety Corridor")
            .legend(legend_box(CORRIDOR_COLOR));

        for (name, peaks, color, fit) in [
            ("Optimistic Bound", &optimistic, OPTIMISTIC_COLOR, &fits.optimistic),
            ("Pessimistic Bound", &pessimistic, PESSIMISTIC_COLOR, &fits.pessimistic),
            ("Expected Law", &expected, EXPECTED_COLOR, &fits.expected),
        ] {
            let points = capacity.iter().copied().zip(peaks.iter().copied());
            chart
                .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
                .label(format!("{name} (α = {:.2})", fit.exponent))
                .legend(legend_line(color));
            chart.draw_series(points.map(|point| Circle::new(point, 3, color.mix(0.85).filled())))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.85))
            .border_style(&TRANSPARENT)
            .draw()?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use crate::{
        core::{
            bounds::{DischargeWindow, estimate_bounds},
            curve::{DuckProfile, Sampling},
            power_law::{PowerLawForm, fit_power_law},
        },
        quantity::{energy::MegawattHours, power::Megawatts},
    };

    #[test]
    fn test_draw_corridor() {
        let curve = DuckProfile::NOON_SHIFTED.sample(200, Sampling::HalfOpen).unwrap();
        let bounds: Vec<ScenarioBounds> = [100.0, 1000.0, 10_000.0, 50_000.0]
            .map(|capacity| {
                estimate_bounds(&curve, MegawattHours::from(capacity), DischargeWindow::EVENING)
                    .unwrap()
            })
            .to_vec();
        let capacities: Vec<MegawattHours> = bounds.iter().map(|bounds| bounds.capacity).collect();
        let fit = |peaks: Vec<Megawatts>| {
            fit_power_law(&capacities, &peaks, PowerLawForm::WithoutOffset).unwrap()
        };
        let fits = CorridorFits {
            optimistic: fit(bounds.iter().map(|bounds| bounds.optimistic).collect()),
            pessimistic: fit(bounds.iter().map(|bounds| bounds.pessimistic).collect()),
            expected: fit(bounds.iter().map(|bounds| bounds.expected).collect()),
        };

        let path = env::temp_dir().join(format!("bounds-{}.png", std::process::id()));
        draw(&path, &bounds, &fits).unwrap();
        assert!(path.is_file());
        std::fs::remove_file(path).unwrap();
    }
}
