//! Capacity sweeps and the checks on the resulting scaling relationship.

use crate::{
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts},
};

/// Peak tolerance of the monotonicity check.
pub const MONOTONICITY_TOLERANCE: Megawatts = Megawatts::new(1e-6);

/// `n` base-10 log-spaced values from `10^start` to `10^end`, both ends included.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn logspace(start_exponent: f64, end_exponent: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![10_f64.powf(start_exponent)],
        _ => {
            let step = (end_exponent - start_exponent) / (n - 1) as f64;
            (0..n).map(|i| 10_f64.powf(start_exponent + step * i as f64)).collect()
        }
    }
}

/// Capacities of a sweep: optionally zero, then log-spaced from `from` up to `to`.
#[must_use]
pub fn capacity_grid(
    with_zero: bool,
    from: MegawattHours,
    to: MegawattHours,
    n_points: usize,
) -> Vec<MegawattHours> {
    let log_spaced = logspace(from.0.log10(), to.0.log10(), n_points);
    with_zero
        .then_some(0.0)
        .into_iter()
        .chain(log_spaced)
        .map(MegawattHours::from)
        .collect()
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct ScalingPoint {
    pub capacity: MegawattHours,
    pub peak: Megawatts,
}

/// Run the solver for every capacity and collect the resulting peaks.
pub fn sweep(
    capacities: &[MegawattHours],
    mut peak_for: impl FnMut(MegawattHours) -> Result<Megawatts>,
) -> Result<Vec<ScalingPoint>> {
    capacities
        .iter()
        .map(|capacity| {
            let peak =
                peak_for(*capacity).with_context(|| format!("failed to solve for {capacity}"))?;
            trace!(%capacity, %peak, "solved");
            Ok(ScalingPoint { capacity: *capacity, peak })
        })
        .collect()
}

#[must_use]
pub fn split(points: &[ScalingPoint]) -> (Vec<MegawattHours>, Vec<Megawatts>) {
    points.iter().map(|point| (point.capacity, point.peak)).unzip()
}

/// Fail if adding capacity ever raises the peak by more than the tolerance.
pub fn ensure_non_increasing(points: &[ScalingPoint], tolerance: Megawatts) -> Result {
    for pair in points.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        if next.peak > previous.peak + tolerance {
            bail!(
                "self-check failed: the peak rises from {} at {} to {} at {}",
                previous.peak,
                previous.capacity,
                next.peak,
                next.capacity,
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_logspace_ends() {
        let values = logspace(2.0, 50_000_f64.log10(), 14);
        assert_eq!(values.len(), 14);
        assert_relative_eq!(values[0], 100.0, max_relative = 1e-12);
        assert_relative_eq!(values[13], 50_000.0, max_relative = 1e-12);
        assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_logspace_degenerate() {
        assert!(logspace(0.0, 1.0, 0).is_empty());
        assert_eq!(logspace(1.0, 3.0, 1), [10.0]);
    }

    #[test]
    fn test_capacity_grid() {
        let grid = capacity_grid(true, MegawattHours::from(1.0), MegawattHours::from(50_000.0), 49);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], MegawattHours::ZERO);
        assert_relative_eq!(grid[1].0, 1.0, max_relative = 1e-12);

        let grid = capacity_grid(false, MegawattHours::from(100.0), MegawattHours::from(1e4), 3);
        assert_eq!(grid.len(), 3);
        assert_relative_eq!(grid[1].0, 1000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_sweep_propagates_errors() {
        let capacities = [MegawattHours::from(1.0), MegawattHours::from(-1.0)];
        let result = sweep(&capacities, |capacity| {
            ensure!(capacity > MegawattHours::ZERO, "negative");
            Ok(Megawatts::from(1.0))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_non_increasing() {
        let points: Vec<ScalingPoint> = [(0.0, 10.0), (1.0, 9.0), (2.0, 9.000_000_5), (3.0, 8.0)]
            .into_iter()
            .map(|(capacity, peak)| ScalingPoint {
                capacity: MegawattHours::from(capacity),
                peak: Megawatts::from(peak),
            })
            .collect();
        ensure_non_increasing(&points, MONOTONICITY_TOLERANCE).unwrap();

        let mut rising = points;
        rising[3].peak = Megawatts::from(11.0);
        assert!(ensure_non_increasing(&rising, MONOTONICITY_TOLERANCE).is_err());
    }
}
