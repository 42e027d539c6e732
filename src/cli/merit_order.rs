use std::path::PathBuf;

use clap::Parser;

use crate::{
    cli::ensure_written,
    core::merit_order::Fleet,
    prelude::*,
    render,
    tables::build_fleet_table,
};

#[derive(Parser)]
pub struct MeritOrderArgs {
    /// Chart path.
    #[clap(long, default_value = "merit_order_toy_viz.png")]
    pub output: PathBuf,

    /// Print the fleet table.
    #[clap(long)]
    pub table: bool,
}

impl MeritOrderArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> Result {
        let fleet = Fleet::toy()?;
        fleet.self_test()?;
        info!(
            total_capacity = %fleet.total_capacity(),
            max_price = %fleet.max_price(),
            "verified the fleet",
        );
        if self.table {
            println!("{}", build_fleet_table(&fleet));
        }

        render::merit_order::draw(&self.output, &fleet).context("failed to draw the chart")?;
        ensure_written(&self.output)?;
        println!("SUCCESS: Logic verified and visualization saved to {}", self.output.display());
        Ok(())
    }
}
