//! Reverse water-filling: shave the peaks down to a ceiling that spends exactly the
//! battery capacity, with no power limit and no valley charging.

use crate::{
    core::{
        curve::{ensure_samples, peak, total_energy, trough},
        root::{Bracket, brent},
    },
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts, time::Hours},
};

/// Absolute tolerance of the ceiling level, megawatts.
const LEVEL_TOLERANCE: f64 = 1e-9;

/// Energy lying above the level: `Σ max(load − level, 0)·Δt`.
#[must_use]
pub fn energy_above(loads: &[Megawatts], level: Megawatts, time_step: Hours) -> MegawattHours {
    loads.iter().map(|load| (*load - level).max(Megawatts::ZERO) * time_step).sum()
}

/// Find the ceiling whose energy above equals the capacity.
///
/// Non-positive capacity leaves the peak untouched. Capacity covering the whole curve
/// floors the ceiling at zero.
#[instrument(skip(loads), fields(n_samples = loads.len()))]
pub fn solve_ceiling(
    loads: &[Megawatts],
    capacity: MegawattHours,
    time_step: Hours,
) -> Result<Megawatts> {
    ensure_samples(loads, time_step)?;
    ensure!(capacity.is_finite(), "the capacity must be finite, got {capacity:?}");

    let max_load = peak(loads);
    if capacity <= MegawattHours::ZERO {
        return Ok(max_load);
    }
    let total_energy = total_energy(loads, time_step);
    if capacity >= total_energy {
        warn!(%capacity, %total_energy, "the capacity covers the entire curve");
        return Ok(Megawatts::ZERO);
    }

    let residual =
        |level: f64| (energy_above(loads, Megawatts::from(level), time_step) - capacity).0;

    let mut low = trough(loads).0;
    if residual(low) < 0.0 {
        // Below the trough every sample contributes, so the level is the flat average:
        #[expect(clippy::cast_precision_loss)]
        let duration = time_step * loads.len() as f64;
        low = ((total_energy - capacity) / duration).0;
        if residual(low) < 0.0 {
            low -= low.abs() * 1e-6 + 1e-6;
        }
        debug!(low, "extended the bracket below the trough");
    }

    let ceiling = brent(Bracket::new(low, max_load.0)?, LEVEL_TOLERANCE, residual)
        .with_context(|| format!("failed to find the ceiling for {capacity}"))?;
    Ok(Megawatts::from(ceiling))
}

/// Peak-shaved load.
#[must_use]
#[derive(Clone, Debug)]
pub struct PeakShaving {
    pub ceiling: Megawatts,
    pub adjusted: Vec<Megawatts>,
}

pub fn shave(
    loads: &[Megawatts],
    capacity: MegawattHours,
    time_step: Hours,
) -> Result<PeakShaving> {
    let ceiling = solve_ceiling(loads, capacity, time_step)?;
    let adjusted = loads.iter().map(|load| load.min(ceiling)).collect();
    Ok(PeakShaving { ceiling, adjusted })
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::core::curve::{DuckProfile, LoadCurve, Sampling};

    fn hourly_curve() -> LoadCurve {
        DuckProfile::MORNING_SHIFTED.sample(24, Sampling::HalfOpen).unwrap()
    }

    #[test]
    fn test_hourly_scenario() {
        let curve = hourly_curve();
        assert_eq!(curve.time_step(), Hours::from(1.0));

        let capacity = MegawattHours::from(25000.0);
        let shaving = shave(curve.load(), capacity, curve.time_step()).unwrap();
        assert_abs_diff_eq!(
            energy_above(curve.load(), shaving.ceiling, Hours::from(1.0)).0,
            25000.0,
            epsilon = 1e-3,
        );
        assert_eq!(peak(&shaving.adjusted), shaving.ceiling);
        assert!(shaving.ceiling < curve.peak());
    }

    #[test]
    fn test_zero_capacity() {
        let curve = hourly_curve();
        for capacity in [0.0, -100.0] {
            let shaving =
                shave(curve.load(), MegawattHours::from(capacity), curve.time_step()).unwrap();
            assert_eq!(shaving.ceiling, curve.peak());
            assert_eq!(shaving.adjusted, curve.load());
        }
    }

    #[test]
    fn test_removed_energy_matches_capacity() {
        let curve = DuckProfile::MORNING_SHIFTED.sample(1000, Sampling::HalfOpen).unwrap();
        let total_energy = curve.total_energy();
        for capacity in [1.0, 250.0, 25_000.0, 150_000.0, 280_000.0, 1e6] {
            let capacity = MegawattHours::from(capacity);
            let shaving = shave(curve.load(), capacity, curve.time_step()).unwrap();
            assert!(shaving.adjusted.iter().zip(curve.load()).all(|(adjusted, load)| {
                *adjusted == load.min(shaving.ceiling)
            }));
            let removed: MegawattHours = curve
                .load()
                .iter()
                .zip(&shaving.adjusted)
                .map(|(load, adjusted)| (*load - *adjusted) * curve.time_step())
                .sum();
            assert_relative_eq!(removed.0, capacity.min(total_energy).0, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_capacity_below_trough() {
        // A flat curve has nothing above its trough, so the bracket is extended:
        let loads = vec![Megawatts::from(10.0); 24];
        let ceiling = solve_ceiling(&loads, MegawattHours::from(12.0), Hours::from(1.0)).unwrap();
        assert_abs_diff_eq!(ceiling.0, 9.5, epsilon = 1e-9);
    }

    #[test]
    fn test_ceiling_decreases_with_capacity() {
        let curve = hourly_curve();
        let ceilings: Vec<Megawatts> = [0.0, 10.0, 100.0, 1000.0, 10_000.0, 50_000.0]
            .into_iter()
            .map(|capacity| {
                solve_ceiling(curve.load(), MegawattHours::from(capacity), curve.time_step())
                    .unwrap()
            })
            .collect();
        assert!(ceilings.windows(2).all(|pair| pair[1] < pair[0]), "{ceilings:?}");
    }

    #[test]
    fn test_idempotent() {
        let curve = hourly_curve();
        let capacity = MegawattHours::from(12_345.0);
        let first = solve_ceiling(curve.load(), capacity, curve.time_step()).unwrap();
        let second = solve_ceiling(curve.load(), capacity, curve.time_step()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_preconditions() {
        assert!(solve_ceiling(&[], MegawattHours::from(1.0), Hours::from(1.0)).is_err());
        let loads = [Megawatts::from(1.0)];
        assert!(solve_ceiling(&loads, MegawattHours::from(1.0), Hours::ZERO).is_err());
        assert!(solve_ceiling(&loads, MegawattHours::from(f64::NAN), Hours::from(1.0)).is_err());
    }
}
