//! Two-level water-filling: charge the battery in the valleys and discharge it on the
//! peaks, both limited by the power rating and by the energy capacity.

use bon::Builder;
use itertools::izip;

use crate::{
    core::{
        curve::{ensure_samples, peak, trough},
        root::{BISECTION_ITERATIONS, Bracket, bisect},
    },
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts, time::Hours},
};

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct WaterFilling<'a> {
    loads: &'a [Megawatts],
    time_step: Hours,

    /// Energy the battery may move from the valleys to the peaks.
    capacity: MegawattHours,

    /// Charging and discharging power limit.
    power_rating: Megawatts,
}

impl<S: water_filling_builder::IsComplete> WaterFillingBuilder<'_, S> {
    pub fn solve(self) -> Result<Dispatch> {
        self.build().solve()
    }
}

impl WaterFilling<'_> {
    #[instrument(
        skip_all,
        fields(capacity = %self.capacity, power_rating = %self.power_rating),
    )]
    fn solve(self) -> Result<Dispatch> {
        ensure_samples(self.loads, self.time_step)?;
        ensure!(
            self.capacity.is_finite() && self.power_rating.is_finite(),
            "the battery limits must be finite",
        );
        if self.capacity <= MegawattHours::ZERO || self.power_rating <= Megawatts::ZERO {
            return Ok(Dispatch::idle(self.loads));
        }

        let (min_load, max_load) = (trough(self.loads), peak(self.loads));

        // Level at which the power-limited charge and discharge potentials meet:
        let balance = Megawatts::from(bisect(
            Bracket::new(min_load.0, max_load.0)?,
            BISECTION_ITERATIONS,
            |level| {
                let level = Megawatts::from(level);
                (self.charge_energy(level) - self.discharge_energy(level)).0
            },
        ));

        let max_transfer = self.charge_energy(balance);
        let shifted = self.capacity.min(max_transfer);
        debug!(?balance, %max_transfer, %shifted, "found the balance level");
        if shifted <= MegawattHours::ZERO {
            return Ok(Dispatch::idle(self.loads));
        }

        // Where the energy is flat in the level, both searches settle on the level furthest
        // from the balance that still moves the whole `shifted` energy:
        let charge_level = Megawatts::from(bisect(
            Bracket::new(min_load.0, balance.0)?,
            BISECTION_ITERATIONS,
            |level| if self.charge_energy(Megawatts::from(level)) >= shifted { 1.0 } else { -1.0 },
        ));
        let discharge_level = Megawatts::from(bisect(
            Bracket::new(balance.0, max_load.0)?,
            BISECTION_ITERATIONS,
            |level| {
                if self.discharge_energy(Megawatts::from(level)) >= shifted { -1.0 } else { 1.0 }
            },
        ));
        debug!(?charge_level, ?discharge_level, "found the dispatch levels");

        let charge: Vec<Megawatts> =
            self.loads.iter().map(|load| self.charge_power(charge_level, *load)).collect();
        let discharge: Vec<Megawatts> =
            self.loads.iter().map(|load| self.discharge_power(discharge_level, *load)).collect();
        let adjusted = izip!(self.loads, &charge, &discharge)
            .map(|(load, charge, discharge)| *load + *charge - *discharge)
            .collect();

        Ok(Dispatch {
            adjusted,
            charge,
            discharge,
            levels: Some(Levels { balance, charge: charge_level, discharge: discharge_level }),
            shifted,
        })
    }

    fn charge_power(&self, level: Megawatts, load: Megawatts) -> Megawatts {
        (level - load).clamp(Megawatts::ZERO, self.power_rating)
    }

    fn discharge_power(&self, level: Megawatts, load: Megawatts) -> Megawatts {
        (load - level).clamp(Megawatts::ZERO, self.power_rating)
    }

    /// Energy that could be charged to lift the valleys up to the level.
    fn charge_energy(&self, level: Megawatts) -> MegawattHours {
        self.loads.iter().map(|load| self.charge_power(level, *load) * self.time_step).sum()
    }

    /// Energy that could be discharged to lower the peaks down to the level.
    fn discharge_energy(&self, level: Megawatts) -> MegawattHours {
        self.loads.iter().map(|load| self.discharge_power(level, *load) * self.time_step).sum()
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Levels {
    pub balance: Megawatts,

    /// Loads below this level are lifted (charging).
    pub charge: Megawatts,

    /// Loads above this level are lowered (discharging).
    pub discharge: Megawatts,
}

/// Battery dispatch over the curve: power per sample and the resulting load.
#[must_use]
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub adjusted: Vec<Megawatts>,
    pub charge: Vec<Megawatts>,
    pub discharge: Vec<Megawatts>,

    /// Dispatch levels, if any energy has been shifted.
    pub levels: Option<Levels>,

    /// Energy moved from the peaks to the valleys.
    pub shifted: MegawattHours,
}

impl Dispatch {
    fn idle(loads: &[Megawatts]) -> Self {
        Self {
            adjusted: loads.to_vec(),
            charge: vec![Megawatts::ZERO; loads.len()],
            discharge: vec![Megawatts::ZERO; loads.len()],
            levels: None,
            shifted: MegawattHours::ZERO,
        }
    }

    #[must_use]
    pub fn peak(&self) -> Megawatts {
        peak(&self.adjusted)
    }
}
