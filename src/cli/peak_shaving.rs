use std::path::PathBuf;

use clap::Parser;

use crate::{
    cli::ensure_written,
    core::{
        curve::{DuckProfile, Sampling},
        peak_shaving::{shave, solve_ceiling},
        power_law::{PowerLawForm, fit_power_law},
        scaling::{MONOTONICITY_TOLERANCE, capacity_grid, ensure_non_increasing, split, sweep},
    },
    prelude::*,
    quantity::energy::MegawattHours,
    render::{self, peak_shaving::PeakShavingChart},
    tables::build_scaling_table,
};

const N_SAMPLES: usize = 1000;
const SHOWCASE_CAPACITY: MegawattHours = MegawattHours::new(25_000.0);

const MIN_CAPACITY: MegawattHours = MegawattHours::new(1.0);
const MAX_CAPACITY: MegawattHours = MegawattHours::new(50_000.0);
const N_CAPACITIES: usize = 49;

#[derive(Parser)]
pub struct PeakShavingArgs {
    /// Chart path.
    #[clap(long, default_value = "peak_shaving_scaling_viz.png")]
    pub output: PathBuf,

    /// Print the capacity sweep.
    #[clap(long)]
    pub table: bool,
}

impl PeakShavingArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let curve = DuckProfile::MORNING_SHIFTED.sample(N_SAMPLES, Sampling::HalfOpen)?;

        let shaving = shave(curve.load(), SHOWCASE_CAPACITY, curve.time_step())?;
        info!(
            original_peak = %curve.peak(),
            total_energy = %curve.total_energy(),
            ceiling = %shaving.ceiling,
            "shaved with the showcase battery",
        );

        let capacities = capacity_grid(true, MIN_CAPACITY, MAX_CAPACITY, N_CAPACITIES);
        let points = sweep(&capacities, |capacity| {
            solve_ceiling(curve.load(), capacity, curve.time_step())
        })?;
        ensure_non_increasing(&points, MONOTONICITY_TOLERANCE)?;

        let (capacities, peaks) = split(&points);
        let fit = fit_power_law(&capacities, &peaks, PowerLawForm::WithOffset)
            .context("failed to fit the scaling law")?;
        info!(
            a = fit.scale,
            alpha = fit.exponent,
            b = %fit.offset,
            rmse = %fit.rmse,
            "fitted the scaling law",
        );
        if self.table {
            println!("{}", build_scaling_table(&points, &fit));
        }

        let chart = PeakShavingChart {
            curve: &curve,
            shaving: &shaving,
            capacity: SHOWCASE_CAPACITY,
            points: &points,
            fit: &fit,
        };
        render::peak_shaving::draw(&self.output, &chart).context("failed to draw the chart")?;
        ensure_written(&self.output)?;
        println!("SUCCESS: Visualization saved to {}", self.output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use super::*;

    #[test]
    fn test_run() {
        let output = env::temp_dir().join(format!("peak-shaving-run-{}.png", std::process::id()));
        PeakShavingArgs { output: output.clone(), table: true }.run().unwrap();
        assert!(output.is_file());
        fs::remove_file(output).unwrap();
    }
}
