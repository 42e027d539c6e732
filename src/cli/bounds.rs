use std::path::PathBuf;

use clap::Parser;

use crate::{
    cli::ensure_written,
    core::{
        bounds::{DischargeWindow, ScenarioBounds, ensure_corridor, estimate_bounds},
        curve::{DuckProfile, Sampling},
        power_law::{PowerLaw, PowerLawForm, fit_power_law},
        scaling::capacity_grid,
    },
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts, time::Hours},
    render::{self, bounds::CorridorFits},
    tables::build_corridor_table,
};

const N_SAMPLES: usize = 1000;

const MIN_CAPACITY: MegawattHours = MegawattHours::new(100.0);
const MAX_CAPACITY: MegawattHours = MegawattHours::new(50_000.0);
const N_CAPACITIES: usize = 50;

#[derive(Parser)]
pub struct BoundsArgs {
    /// Chart path.
    #[clap(long, default_value = "bounded_scaling_viz.png")]
    pub output: PathBuf,

    /// Hour at which the non-adaptive battery starts discharging, 17:00 by default.
    #[clap(long = "window-start-hour")]
    pub window_start: Option<Hours>,

    /// Hours over which the non-adaptive battery discharges, 4 by default.
    #[clap(long = "window-hours")]
    pub window_duration: Option<Hours>,

    /// Print the corridor.
    #[clap(long)]
    pub table: bool,
}

impl BoundsArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let window = DischargeWindow::new(
            self.window_start.unwrap_or(DischargeWindow::EVENING.start()),
            self.window_duration.unwrap_or(DischargeWindow::EVENING.duration()),
        )?;
        info!(start = %window.start(), end = %window.end(), "non-adaptive discharge window");
        let curve = DuckProfile::NOON_SHIFTED.sample(N_SAMPLES, Sampling::HalfOpen)?;

        let bounds = capacity_grid(false, MIN_CAPACITY, MAX_CAPACITY, N_CAPACITIES)
            .into_iter()
            .map(|capacity| estimate_bounds(&curve, capacity, window))
            .collect::<Result<Vec<_>>>()?;
        ensure_corridor(&bounds)?;
        info!(n_capacities = bounds.len(), "the corridor holds");

        let fits = CorridorFits {
            optimistic: fit(&bounds, |bounds| bounds.optimistic)?,
            pessimistic: fit(&bounds, |bounds| bounds.pessimistic)?,
            expected: fit(&bounds, |bounds| bounds.expected)?,
        };
        info!(
            alpha_optimistic = fits.optimistic.exponent,
            alpha_pessimistic = fits.pessimistic.exponent,
            alpha_expected = fits.expected.exponent,
            "fitted the scaling laws",
        );
        if self.table {
            println!("{}", build_corridor_table(&bounds));
        }

        render::bounds::draw(&self.output, &bounds, &fits).context("failed to draw the chart")?;
        ensure_written(&self.output)?;
        println!("SUCCESS: Visualization saved to {}", self.output.display());
        Ok(())
    }
}

fn fit(bounds: &[ScenarioBounds], peak: impl Fn(&ScenarioBounds) -> Megawatts) -> Result<PowerLaw> {
    let capacities: Vec<MegawattHours> = bounds.iter().map(|bounds| bounds.capacity).collect();
    let peaks: Vec<Megawatts> = bounds.iter().map(peak).collect();
    fit_power_law(&capacities, &peaks, PowerLawForm::WithoutOffset)
        .context("failed to fit the scaling law")
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use super::*;

    #[test]
    fn test_run() {
        let output = env::temp_dir().join(format!("bounds-run-{}.png", std::process::id()));
        let args = BoundsArgs {
            output: output.clone(),
            window_start: None,
            window_duration: None,
            table: true,
        };
        args.run().unwrap();
        assert!(output.is_file());
        fs::remove_file(output).unwrap();
    }

    #[test]
    fn test_invalid_window_writes_nothing() {
        let output = env::temp_dir().join(format!("bounds-invalid-{}.png", std::process::id()));
        let args = BoundsArgs {
            output: output.clone(),
            window_start: Some(Hours::from(17.0)),
            window_duration: Some(Hours::ZERO),
            table: false,
        };
        assert!(args.run().is_err());
        assert!(!output.exists());
    }
}
