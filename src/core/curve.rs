use std::f64::consts::{FRAC_PI_2, PI};

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts, time::Hours},
};

/// How a day is split into samples.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Sampling {
    /// Both midnights are sampled: `dt = 24 / (n − 1)`.
    Closed,

    /// The closing midnight is left out: `dt = 24 / n`.
    HalfOpen,
}

impl Sampling {
    /// Sample times over one day.
    pub fn hours(self, n_points: usize) -> Result<Vec<Hours>> {
        let n_intervals = match self {
            Self::Closed => n_points.checked_sub(1).filter(|n| *n != 0),
            Self::HalfOpen => Some(n_points).filter(|n| *n != 0),
        }
        .with_context(|| format!("cannot sample a day with {n_points} point(s) ({self:?})"))?;
        #[expect(clippy::cast_precision_loss)]
        let time_step = Hours::DAY / n_intervals as f64;
        #[expect(clippy::cast_precision_loss)]
        let hours = (0..n_points).map(|i| time_step * i as f64).collect();
        Ok(hours)
    }
}

/// Synthetic daily load shape: a fundamental daily wave minus a semi-daily harmonic,
/// which produces the midday dip of the "duck curve".
///
/// `load(t) = base + fundamental·sin(ω(t + shift) + phase) − harmonic·cos(2ω(t + shift))`,
/// with `ω = 2π / 24 h`, clipped at zero.
#[derive(Copy, Clone, Debug)]
pub struct DuckProfile {
    pub base: Megawatts,
    pub fundamental: Megawatts,
    pub harmonic: Megawatts,
    pub hour_shift: Hours,

    /// Extra phase of the fundamental, radians.
    pub phase: f64,
}

impl DuckProfile {
    /// Evening-peaking curve with a deep solar dip, peak around 19:00.
    pub const EVENING_RAMP: Self = Self {
        base: Megawatts::new(9500.0),
        fundamental: Megawatts::new(3300.0),
        harmonic: Megawatts::new(2300.0),
        hour_shift: Hours::new(0.0),
        phase: FRAC_PI_2 - 4.9,
    };

    /// Sharp single peak shifted ten hours ahead.
    pub const MORNING_SHIFTED: Self = Self {
        base: Megawatts::new(12000.0),
        fundamental: Megawatts::new(6000.0),
        harmonic: Megawatts::new(4000.0),
        hour_shift: Hours::new(10.0),
        phase: 0.0,
    };

    /// Same shape as [`Self::MORNING_SHIFTED`], with the peak at 18:00.
    pub const NOON_SHIFTED: Self = Self {
        hour_shift: Hours::new(-12.0),
        ..Self::MORNING_SHIFTED
    };

    #[must_use]
    pub fn power_at(&self, time: Hours) -> Megawatts {
        let angle = 2.0 * PI * (time + self.hour_shift).0 / Hours::DAY.0;
        let load = self.base + self.fundamental * (angle + self.phase).sin()
            - self.harmonic * (2.0 * angle).cos();
        load.max(Megawatts::ZERO)
    }

    pub fn sample(&self, n_points: usize, sampling: Sampling) -> Result<LoadCurve> {
        let time = sampling.hours(n_points)?;
        let load = time.iter().map(|time| self.power_at(*time)).collect();
        LoadCurve::try_new(time, load)
    }
}

/// Uniformly sampled load over one day.
#[must_use]
#[derive(Clone, Debug)]
pub struct LoadCurve {
    time: Vec<Hours>,
    load: Vec<Megawatts>,
    time_step: Hours,
}

impl LoadCurve {
    /// Build a curve from sample times, deriving the time step from their spacing.
    pub fn try_new(time: Vec<Hours>, load: Vec<Megawatts>) -> Result<Self> {
        ensure!(time.len() >= 2, "at least two samples are needed to derive the time step");
        let time_step = time[1] - time[0];
        let tolerance = time_step.abs() * 1e-6;
        ensure!(
            time.iter()
                .tuple_windows()
                .all(|(lhs, rhs)| (*rhs - *lhs - time_step).abs() <= tolerance),
            "samples must be uniformly spaced",
        );
        Self::validate(time, load, time_step)
    }

    /// Build a curve from loads only, with the first sample at midnight.
    #[cfg(test)]
    pub fn with_time_step(load: Vec<Megawatts>, time_step: Hours) -> Result<Self> {
        #[expect(clippy::cast_precision_loss)]
        let time = (0..load.len()).map(|i| time_step * i as f64).collect();
        Self::validate(time, load, time_step)
    }

    fn validate(time: Vec<Hours>, load: Vec<Megawatts>, time_step: Hours) -> Result<Self> {
        ensure_samples(&load, time_step)?;
        ensure!(
            time.len() == load.len(),
            "got {} sample times but {} loads",
            time.len(),
            load.len(),
        );
        if let Some(load) = load.iter().find(|load| !load.is_finite()) {
            bail!("the load curve contains a non-finite sample: {load:?}");
        }
        Ok(Self { time, load, time_step })
    }

    #[must_use]
    pub fn time(&self) -> &[Hours] {
        &self.time
    }

    #[must_use]
    pub fn load(&self) -> &[Megawatts] {
        &self.load
    }

    #[must_use]
    pub const fn time_step(&self) -> Hours {
        self.time_step
    }

    #[must_use]
    pub fn peak(&self) -> Megawatts {
        peak(&self.load)
    }

    #[must_use]
    pub fn trough(&self) -> Megawatts {
        trough(&self.load)
    }

    #[must_use]
    pub fn total_energy(&self) -> MegawattHours {
        total_energy(&self.load, self.time_step)
    }
}

/// Check the preconditions every dispatch solver shares.
pub fn ensure_samples(loads: &[Megawatts], time_step: Hours) -> Result {
    ensure!(!loads.is_empty(), "the load curve is empty");
    ensure!(
        time_step.is_finite() && time_step > Hours::ZERO,
        "the time step must be positive, got {time_step}",
    );
    Ok(())
}

/// Highest sample, or zero for an empty slice.
#[must_use]
pub fn peak(loads: &[Megawatts]) -> Megawatts {
    loads.iter().copied().max_by_key(|load| OrderedFloat(load.0)).unwrap_or(Megawatts::ZERO)
}

/// Lowest sample, or zero for an empty slice.
#[must_use]
pub fn trough(loads: &[Megawatts]) -> Megawatts {
    loads.iter().copied().min_by_key(|load| OrderedFloat(load.0)).unwrap_or(Megawatts::ZERO)
}

#[must_use]
pub fn total_energy(loads: &[Megawatts], time_step: Hours) -> MegawattHours {
    loads.iter().map(|load| *load * time_step).sum()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_closed_sampling() {
        let hours = Sampling::Closed.hours(5).unwrap();
        assert_eq!(hours, [0.0, 6.0, 12.0, 18.0, 24.0].map(Hours::from));
    }

    #[test]
    fn test_half_open_sampling() {
        let hours = Sampling::HalfOpen.hours(4).unwrap();
        assert_eq!(hours, [0.0, 6.0, 12.0, 18.0].map(Hours::from));
    }

    #[test]
    fn test_degenerate_sampling() {
        assert!(Sampling::Closed.hours(1).is_err());
        assert!(Sampling::HalfOpen.hours(0).is_err());
    }

    #[test]
    fn test_evening_ramp_matches_cosine_form() {
        let profile = DuckProfile::EVENING_RAMP;
        for hour in [0.0, 3.5, 12.0, 19.25] {
            let angle = 2.0 * PI * hour / 24.0;
            let expected = 9500.0 + 3300.0 * (angle - 4.9).cos() - 2300.0 * (2.0 * angle).cos();
            assert_abs_diff_eq!(profile.power_at(Hours::from(hour)).0, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_noon_shifted_peak() {
        let curve = DuckProfile::NOON_SHIFTED.sample(24, Sampling::HalfOpen).unwrap();
        assert_abs_diff_eq!(curve.peak().0, 22000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.load()[18].0, 22000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clipped_at_zero() {
        let profile =
            DuckProfile { base: Megawatts::from(-50_000.0), ..DuckProfile::MORNING_SHIFTED };
        let curve = profile.sample(24, Sampling::HalfOpen).unwrap();
        assert!(curve.load().iter().all(|load| *load == Megawatts::ZERO));
    }

    #[test]
    fn test_time_step() {
        let curve = DuckProfile::MORNING_SHIFTED.sample(1000, Sampling::HalfOpen).unwrap();
        assert_abs_diff_eq!(curve.time_step().0, 0.024);
        let end = *curve.time().last().unwrap() + curve.time_step();
        assert_abs_diff_eq!(end.0, 24.0, epsilon = 1e-9);

        let curve = DuckProfile::EVENING_RAMP.sample(100, Sampling::Closed).unwrap();
        assert_abs_diff_eq!(curve.time_step().0, 24.0 / 99.0);
    }

    #[test]
    fn test_total_energy() {
        let curve = LoadCurve::with_time_step(
            vec![Megawatts::from(1.0), Megawatts::from(3.0)],
            Hours::from(0.5),
        )
        .unwrap();
        assert_eq!(curve.total_energy(), MegawattHours::from(2.0));
        assert_eq!(curve.peak(), Megawatts::from(3.0));
        assert_eq!(curve.trough(), Megawatts::from(1.0));
    }

    #[test]
    fn test_rejects_empty_curve() {
        assert!(LoadCurve::with_time_step(Vec::new(), Hours::from(1.0)).is_err());
    }

    #[test]
    fn test_rejects_non_positive_time_step() {
        assert!(LoadCurve::with_time_step(vec![Megawatts::from(1.0)], Hours::ZERO).is_err());
        assert!(LoadCurve::with_time_step(vec![Megawatts::from(1.0)], Hours::from(-1.0)).is_err());
    }

    #[test]
    fn test_rejects_non_uniform_spacing() {
        let time = [0.0, 1.0, 3.0].map(Hours::from).to_vec();
        let load = vec![Megawatts::from(1.0); 3];
        assert!(LoadCurve::try_new(time, load).is_err());
    }

    #[test]
    fn test_rejects_non_finite_load() {
        let load = vec![Megawatts::from(1.0), Megawatts::from(f64::NAN)];
        assert!(LoadCurve::with_time_step(load, Hours::from(1.0)).is_err());
    }
}
