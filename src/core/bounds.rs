//! Best-case and worst-case peak for a given battery capacity.

use crate::{
    core::{curve::LoadCurve, peak_shaving::solve_ceiling},
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts, time::Hours},
};

/// Slack allowed when checking that the optimistic peak stays below the pessimistic one.
pub const CORRIDOR_TOLERANCE: Megawatts = Megawatts::new(1e-8);

/// Fixed block of hours during which a non-adaptive battery discharges at constant power.
#[derive(Copy, Clone, Debug)]
pub struct DischargeWindow {
    start: Hours,
    duration: Hours,
}

impl DischargeWindow {
    /// The evening block from 17:00 to 21:00.
    pub const EVENING: Self = Self { start: Hours::new(17.0), duration: Hours::new(4.0) };

    pub fn new(start: Hours, duration: Hours) -> Result<Self> {
        ensure!(start.is_finite(), "the window start must be finite");
        ensure!(
            duration.is_finite() && duration > Hours::ZERO,
            "the window duration must be positive, got {duration}",
        );
        Ok(Self { start, duration })
    }

    #[must_use]
    pub const fn start(self) -> Hours {
        self.start
    }

    #[must_use]
    pub const fn duration(self) -> Hours {
        self.duration
    }

    #[must_use]
    pub fn end(self) -> Hours {
        self.start + self.duration
    }

    /// Half-open containment: the start is in, the end is out.
    #[must_use]
    pub fn contains(self, time: Hours) -> bool {
        (self.start <= time) && (time < self.end())
    }

    /// Constant power that empties the capacity over the window.
    #[must_use]
    pub fn discharge_power(self, capacity: MegawattHours) -> Megawatts {
        capacity / self.duration
    }
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct ScenarioBounds {
    pub capacity: MegawattHours,

    /// Peak under the optimal, unconstrained-power dispatch.
    pub optimistic: Megawatts,

    /// Peak under the constant-power dispatch over the fixed window.
    pub pessimistic: Megawatts,

    /// Midpoint of the corridor.
    pub expected: Megawatts,
}

impl ScenarioBounds {
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.optimistic <= self.pessimistic + CORRIDOR_TOLERANCE
    }
}

#[instrument(level = "debug", skip(curve), fields(%capacity))]
pub fn estimate_bounds(
    curve: &LoadCurve,
    capacity: MegawattHours,
    window: DischargeWindow,
) -> Result<ScenarioBounds> {
    let optimistic = solve_ceiling(curve.load(), capacity, curve.time_step())?;

    let discharge_power = window.discharge_power(capacity);
    let pessimistic = curve
        .time()
        .iter()
        .zip(curve.load())
        .map(|(time, load)| if window.contains(*time) { *load - discharge_power } else { *load })
        .fold(Megawatts::from(f64::NEG_INFINITY), Megawatts::max);

    Ok(ScenarioBounds {
        capacity,
        optimistic,
        pessimistic,
        expected: (optimistic + pessimistic) * 0.5,
    })
}

/// Fail if the optimistic bound anywhere exceeds the pessimistic one.
pub fn ensure_corridor(bounds: &[ScenarioBounds]) -> Result {
    if let Some(inverted) = bounds.iter().find(|bounds| !bounds.is_ordered()) {
        bail!(
            "self-check failed: the optimistic bound exceeds the pessimistic bound at {}: {} > {}",
            inverted.capacity,
            inverted.optimistic,
            inverted.pessimistic,
        );
    }
    Ok(())
}
