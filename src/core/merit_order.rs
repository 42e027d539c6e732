//! Merit order: generators stacked by marginal cost give the clearing price as a step
//! function of demand.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::{
    prelude::*,
    quantity::{power::Megawatts, price::MegawattHourPrice},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Technology {
    Renewables,
    Nuclear,
    Coal,
    CombinedCycleGas,
    PeakerGas,
    Oil,
}

impl Display for Technology {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Renewables => "Solar/Wind",
            Self::Nuclear => "Nuclear",
            Self::Coal => "Coal",
            Self::CombinedCycleGas => "Gas (CC)",
            Self::PeakerGas => "Gas (Peaker)",
            Self::Oil => "Oil",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Generator {
    pub technology: Technology,
    pub marginal_cost: MegawattHourPrice,
    pub capacity: Megawatts,
}

impl Generator {
    const fn new(technology: Technology, marginal_cost: f64, capacity: f64) -> Self {
        Self {
            technology,
            marginal_cost: MegawattHourPrice::new(marginal_cost),
            capacity: Megawatts::new(capacity),
        }
    }
}

/// Generators in merit order, cheapest first.
#[derive(Clone, Debug)]
pub struct Fleet(Vec<Generator>);

impl Fleet {
    pub fn try_new(generators: Vec<Generator>) -> Result<Self> {
        ensure!(!generators.is_empty(), "the fleet is empty");
        for generator in &generators {
            ensure!(
                generator.capacity > Megawatts::ZERO && generator.capacity.is_finite(),
                "{} has a non-positive capacity: {}",
                generator.technology,
                generator.capacity,
            );
        }
        ensure!(
            generators
                .iter()
                .tuple_windows()
                .all(|(lhs, rhs)| lhs.marginal_cost <= rhs.marginal_cost),
            "generators must be sorted by marginal cost",
        );
        Ok(Self(generators))
    }

    /// Toy fleet of six technologies, 21 GW in total.
    pub fn toy() -> Result<Self> {
        Self::try_new(vec![
            Generator::new(Technology::Renewables, 0.0, 5000.0),
            Generator::new(Technology::Nuclear, 10.0, 3000.0),
            Generator::new(Technology::Coal, 35.0, 4000.0),
            Generator::new(Technology::CombinedCycleGas, 45.0, 6000.0),
            Generator::new(Technology::PeakerGas, 90.0, 2500.0),
            Generator::new(Technology::Oil, 300.0, 500.0),
        ])
    }

    #[must_use]
    pub fn generators(&self) -> &[Generator] {
        &self.0
    }

    #[must_use]
    pub fn total_capacity(&self) -> Megawatts {
        self.0.iter().map(|generator| generator.capacity).sum()
    }

    #[must_use]
    pub fn max_price(&self) -> MegawattHourPrice {
        self.0
            .iter()
            .map(|generator| generator.marginal_cost)
            .fold(MegawattHourPrice::ZERO, MegawattHourPrice::max)
    }

    #[must_use]
    pub fn find(&self, technology: Technology) -> Option<&Generator> {
        self.0.iter().find(|generator| generator.technology == technology)
    }

    pub fn supply_curve(&self) -> SupplyCurve {
        let edges = [Megawatts::ZERO]
            .into_iter()
            .chain(self.0.iter().scan(Megawatts::ZERO, |cumulative, generator| {
                *cumulative += generator.capacity;
                Some(*cumulative)
            }))
            .collect();
        let prices = self.0.iter().map(|generator| generator.marginal_cost).collect();
        SupplyCurve { edges, prices }
    }

    /// Check the toy fleet totals and the price cliff between the gas technologies.
    pub fn self_test(&self) -> Result {
        let total_capacity = self.total_capacity();
        ensure!(
            total_capacity == Megawatts::from(21_000.0),
            "self-check failed: the total capacity is {total_capacity}",
        );
        let max_price = self.max_price();
        ensure!(
            max_price == MegawattHourPrice::from(300.0),
            "self-check failed: the maximum price is {max_price}",
        );

        let curve = self.supply_curve();
        let bin_size = Some(CLIFF_BIN_SIZE);
        let below = curve.price_at(Megawatts::from(18_999.0), Boundary::Left, bin_size);
        let above = curve.price_at(Megawatts::from(19_001.0), Boundary::Left, bin_size);
        ensure!(
            above.0 > below.0 * 1.5,
            "self-check failed: the price cliff is missing or too small ({below} → {above})",
        );
        debug!(%below, %above, "price cliff is in place");
        Ok(())
    }
}

pub const CLIFF_BIN_SIZE: Megawatts = Megawatts::new(1000.0);

/// Demand levels annotated on the chart.
pub const BASE_LOAD: Megawatts = Megawatts::new(12_000.0);
pub const PEAK_LOAD: Megawatts = Megawatts::new(19_000.0);

/// Which step a demand exactly on an edge belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Boundary {
    /// The step ending at the edge.
    Left,

    /// The step starting at the edge.
    Right,
}

/// Stepped supply curve: `prices[i]` applies between `edges[i]` and `edges[i + 1]`.
#[must_use]
#[derive(Clone, Debug)]
pub struct SupplyCurve {
    pub edges: Vec<Megawatts>,
    pub prices: Vec<MegawattHourPrice>,
}

impl SupplyCurve {
    /// Clearing price at the demand, optionally floored to a multiple of the bin size.
    ///
    /// Demand outside the curve gets the price of the nearest step.
    #[must_use]
    pub fn price_at(
        &self,
        demand: Megawatts,
        boundary: Boundary,
        bin_size: Option<Megawatts>,
    ) -> MegawattHourPrice {
        let demand = match bin_size {
            Some(bin_size) if bin_size > Megawatts::ZERO => bin_size * (demand / bin_size).floor(),
            _ => demand,
        };
        let position = match boundary {
            Boundary::Left => self.edges.partition_point(|edge| *edge < demand),
            Boundary::Right => self.edges.partition_point(|edge| *edge <= demand),
        };
        let index = position.saturating_sub(1).min(self.prices.len().saturating_sub(1));
        self.prices.get(index).copied().unwrap_or(MegawattHourPrice::ZERO)
    }
}
