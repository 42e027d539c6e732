use std::path::PathBuf;

use clap::Parser;

use crate::{
    cli::ensure_written,
    core::{
        curve::{DuckProfile, Sampling},
        power_law::{PowerLawForm, fit_power_law},
        scaling::{MONOTONICITY_TOLERANCE, capacity_grid, ensure_non_increasing, split, sweep},
        water_filling::{Dispatch, WaterFilling},
    },
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts},
    render::{self, water_filling::WaterFillingChart},
    tables::build_scaling_table,
};

const N_SAMPLES: usize = 100;
const POWER_RATING: Megawatts = Megawatts::new(3000.0);
const SHOWCASE_CAPACITY: MegawattHours = MegawattHours::new(20_000.0);

const MIN_CAPACITY: MegawattHours = MegawattHours::new(100.0);
const MAX_CAPACITY: MegawattHours = MegawattHours::new(50_000.0);
const N_CAPACITIES: usize = 14;

#[derive(Parser)]
pub struct WaterFillingArgs {
    /// Chart path.
    #[clap(long, default_value = "water_filling_scaling_viz.png")]
    pub output: PathBuf,

    /// Print the capacity sweep.
    #[clap(long)]
    pub table: bool,
}

impl WaterFillingArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let curve = DuckProfile::EVENING_RAMP.sample(N_SAMPLES, Sampling::Closed)?;
        let solve = |capacity: MegawattHours| -> Result<Dispatch> {
            WaterFilling::builder()
                .loads(curve.load())
                .time_step(curve.time_step())
                .capacity(capacity)
                .power_rating(POWER_RATING)
                .solve()
        };

        let dispatch = solve(SHOWCASE_CAPACITY)?;
        info!(
            original_peak = %curve.peak(),
            original_trough = %curve.trough(),
            flattened_peak = %dispatch.peak(),
            shifted = %dispatch.shifted,
            "dispatched the showcase battery",
        );

        let capacities = capacity_grid(true, MIN_CAPACITY, MAX_CAPACITY, N_CAPACITIES);
        let points = sweep(&capacities, |capacity| Ok(solve(capacity)?.peak()))?;
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

        let chart = WaterFillingChart {
            curve: &curve,
            dispatch: &dispatch,
            capacity: SHOWCASE_CAPACITY,
            points: &points,
            fit: &fit,
        };
        render::water_filling::draw(&self.output, &chart).context("failed to draw the chart")?;
        ensure_written(&self.output)?;
        println!("SUCCESS: Visualization saved to {}", self.output.display());
        Ok(())
    }
}
