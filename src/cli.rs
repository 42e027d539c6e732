mod bounds;
mod merit_order;
mod peak_shaving;
mod water_filling;

use std::path::Path;

use clap::{Parser, Subcommand};

use crate::{
    cli::{
        bounds::BoundsArgs,
        merit_order::MeritOrderArgs,
        peak_shaving::PeakShavingArgs,
        water_filling::WaterFillingArgs,
    },
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merit order supply curve of a toy fleet, with the price cliff check.
    #[clap(name = "merit-order")]
    MeritOrder(Box<MeritOrderArgs>),

    /// Two-level water-filling under a power limit, and its capacity scaling law.
    #[clap(name = "water-filling")]
    WaterFilling(Box<WaterFillingArgs>),

    /// Reverse water-filling (pure peak shaving), and its capacity scaling law.
    #[clap(name = "peak-shaving")]
    PeakShaving(Box<PeakShavingArgs>),

    /// Optimistic and pessimistic peak bounds over a capacity sweep.
    #[clap(name = "bounds")]
    Bounds(Box<BoundsArgs>),
}

impl Command {
    pub fn run(self) -> Result {
        match self {
            Self::MeritOrder(args) => args.run(),
            Self::WaterFilling(args) => args.run(),
            Self::PeakShaving(args) => args.run(),
            Self::Bounds(args) => args.run(),
        }
    }
}

/// Fail unless the chart has actually landed on disk.
fn ensure_written(path: &Path) -> Result {
    ensure!(path.is_file(), "expected plot output was not created: `{}`", path.display());
    info!(path = %path.display(), "saved the chart");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_output() {
        let args = Args::try_parse_from(["waterfill", "peak-shaving"]).unwrap();
        let Command::PeakShaving(args) = args.command else {
            panic!("parsed a wrong command");
        };
        assert_eq!(args.output, Path::new("peak_shaving_scaling_viz.png"));
        assert!(!args.table);
    }
}
