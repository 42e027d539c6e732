//! Power-law fit of the peak-versus-capacity scaling: `peak ≈ a·capacity^(−α) + b`.

use argmin::{
    core::{CostFunction, Executor, State},
    solver::neldermead::NelderMead,
};
use linfa::{Dataset, traits::Fit};
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};

use crate::{
    core::scaling::logspace,
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts},
};

pub const MAX_EXPONENT: f64 = 5.0;

const MAX_ITERATIONS: u64 = 1000;

/// Initial simplex edge along the exponent.
const SIMPLEX_STEP: f64 = 0.25;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PowerLawForm {
    /// `a·x^(−α) + b`.
    WithOffset,

    /// `a·x^(−α)`.
    WithoutOffset,
}

impl PowerLawForm {
    const fn min_points(self) -> usize {
        match self {
            Self::WithOffset => 3,
            Self::WithoutOffset => 2,
        }
    }
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct PowerLaw {
    /// `a`, megawatts at unit capacity.
    pub scale: f64,

    /// `α`, confined to `0..=5`.
    pub exponent: f64,

    /// `b`, the asymptotic peak.
    pub offset: Megawatts,

    /// Root-mean-square residual over the fitted points.
    pub rmse: Megawatts,
}

impl PowerLaw {
    #[must_use]
    pub fn evaluate(&self, capacity: MegawattHours) -> Megawatts {
        Megawatts::from(self.scale * capacity.0.powf(-self.exponent)) + self.offset
    }

    /// Sample the fitted curve on `n_points` log-spaced capacities between the bounds.
    #[must_use]
    pub fn sample(
        &self,
        from: MegawattHours,
        to: MegawattHours,
        n_points: usize,
    ) -> Vec<(MegawattHours, Megawatts)> {
        logspace(from.0.log10(), to.0.log10(), n_points)
            .into_iter()
            .map(MegawattHours::from)
            .map(|capacity| (capacity, self.evaluate(capacity)))
            .collect()
    }
}

/// Fit the power law by bounded least squares.
///
/// Points with non-positive capacity or peak are left out. For a fixed exponent the
/// model is linear in `(a, b)`, so only the exponent is searched, starting from the
/// log-log regression slope.
#[instrument(skip_all, fields(n_points = capacities.len(), ?form))]
pub fn fit_power_law(
    capacities: &[MegawattHours],
    peaks: &[Megawatts],
    form: PowerLawForm,
) -> Result<PowerLaw> {
    ensure!(
        capacities.len() == peaks.len(),
        "got {} capacities but {} peaks",
        capacities.len(),
        peaks.len(),
    );
    let (x, y): (Vec<f64>, Vec<f64>) = capacities
        .iter()
        .zip(peaks)
        .filter(|(capacity, peak)| {
            capacity.0 > 0.0 && peak.0 > 0.0 && capacity.is_finite() && peak.is_finite()
        })
        .map(|(capacity, peak)| (capacity.0, peak.0))
        .unzip();
    ensure!(
        x.len() >= form.min_points(),
        "at least {} usable points are needed to fit {form:?}, got {}",
        form.min_points(),
        x.len(),
    );

    let initial_exponent = log_log_exponent(&x, &y)?;
    let problem = Residuals { x: &x, y: &y, form };
    let simplex = if initial_exponent + SIMPLEX_STEP <= MAX_EXPONENT {
        vec![vec![initial_exponent], vec![initial_exponent + SIMPLEX_STEP]]
    } else {
        vec![vec![initial_exponent], vec![initial_exponent - SIMPLEX_STEP]]
    };
    let solver = NelderMead::new(simplex).with_sd_tolerance(1e-12)?;
    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(MAX_ITERATIONS))
        .run()
        .context("the exponent search failed")?;
    let exponent = result
        .state()
        .get_best_param()
        .and_then(|param| param.first().copied())
        .context("the exponent search produced no result")?
        .clamp(0.0, MAX_EXPONENT);
    debug!(n_iterations = result.state().get_iter(), exponent, "converged");

    let (scale, offset, sse) = problem.solve_linear(exponent);
    ensure!(
        scale.is_finite() && offset.is_finite() && sse.is_finite(),
        "the fit did not converge: a = {scale}, α = {exponent}, b = {offset}",
    );
    #[expect(clippy::cast_precision_loss)]
    let rmse = (sse / x.len() as f64).sqrt();
    Ok(PowerLaw {
        scale,
        exponent,
        offset: Megawatts::from(offset),
        rmse: Megawatts::from(rmse),
    })
}

/// Initial exponent from the straight line through `(ln x, ln y)`.
fn log_log_exponent(x: &[f64], y: &[f64]) -> Result<f64> {
    let records = Array2::from_shape_vec((x.len(), 1), x.iter().map(|x| x.ln()).collect())?;
    let targets: Array1<f64> = y.iter().map(|y| y.ln()).collect();
    let regression = LinearRegression::new()
        .fit(&Dataset::new(records, targets))
        .context("failed to fit the log-log regression")?;
    let slope = regression.params()[0];
    debug!(slope, intercept = regression.intercept(), "fitted the log-log regression");
    ensure!(slope.is_finite(), "the log-log slope is not finite");
    Ok((-slope).clamp(0.0, MAX_EXPONENT))
}

#[derive(Copy, Clone)]
struct Residuals<'a> {
    x: &'a [f64],
    y: &'a [f64],
    form: PowerLawForm,
}

impl Residuals<'_> {
    /// Best non-negative `(a, b)` for the exponent, and the sum of squared residuals.
    fn solve_linear(&self, exponent: f64) -> (f64, f64, f64) {
        let features: Vec<f64> = self.x.iter().map(|x| x.powf(-exponent)).collect();
        let through_origin = {
            let xy: f64 = features.iter().zip(self.y).map(|(f, y)| f * y).sum();
            let xx: f64 = features.iter().map(|f| f * f).sum();
            let scale = if xx > 0.0 { (xy / xx).max(0.0) } else { 0.0 };
            (scale, 0.0)
        };
        let mut candidates = vec![through_origin];

        if self.form == PowerLawForm::WithOffset {
            #[expect(clippy::cast_precision_loss)]
            let n = features.len() as f64;
            let mean_x = features.iter().sum::<f64>() / n;
            let mean_y = self.y.iter().sum::<f64>() / n;
            let covariance: f64 =
                features.iter().zip(self.y).map(|(f, y)| (f - mean_x) * (y - mean_y)).sum();
            let variance: f64 = features.iter().map(|f| (f - mean_x).powi(2)).sum();
            if variance > 0.0 {
                let scale = covariance / variance;
                let offset = mean_y - scale * mean_x;
                if scale >= 0.0 && offset >= 0.0 {
                    candidates.push((scale, offset));
                }
            }
            candidates.push((0.0, mean_y.max(0.0)));
        }

        candidates
            .into_iter()
            .map(|(scale, offset)| (scale, offset, self.sse(&features, scale, offset)))
            .min_by(|lhs, rhs| lhs.2.total_cmp(&rhs.2))
            .unwrap_or((0.0, 0.0, f64::INFINITY))
    }

    fn sse(&self, features: &[f64], scale: f64, offset: f64) -> f64 {
        features.iter().zip(self.y).map(|(f, y)| (scale * f + offset - y).powi(2)).sum()
    }
}

impl CostFunction for Residuals<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let exponent = param
            .first()
            .copied()
            .ok_or_else(|| argmin::core::Error::msg("empty parameter vector"))?;
        Ok(self.solve_linear(exponent.clamp(0.0, MAX_EXPONENT)).2)
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;

    fn synthetic(scale: f64, exponent: f64, offset: f64) -> (Vec<MegawattHours>, Vec<Megawatts>) {
        logspace(2.0, 50_000_f64.log10(), 30)
            .into_iter()
            .map(|capacity| {
                (
                    MegawattHours::from(capacity),
                    Megawatts::from(scale * capacity.powf(-exponent) + offset),
                )
            })
            .unzip()
    }

    #[test]
    fn test_recovers_offset_form() {
        let (capacities, peaks) = synthetic(40_000.0, 0.6, 15_000.0);
        let fit = fit_power_law(&capacities, &peaks, PowerLawForm::WithOffset).unwrap();
        assert_abs_diff_eq!(fit.exponent, 0.6, epsilon = 1e-4);
        assert_relative_eq!(fit.scale, 40_000.0, max_relative = 1e-3);
        assert_relative_eq!(fit.offset.0, 15_000.0, max_relative = 1e-3);
        assert!(fit.rmse.0 < 1.0);
    }

    #[test]
    fn test_recovers_offset_free_form() {
        let (capacities, peaks) = synthetic(30_000.0, 0.05, 0.0);
        let fit = fit_power_law(&capacities, &peaks, PowerLawForm::WithoutOffset).unwrap();
        assert_abs_diff_eq!(fit.exponent, 0.05, epsilon = 1e-4);
        assert_relative_eq!(fit.scale, 30_000.0, max_relative = 1e-3);
        assert_eq!(fit.offset, Megawatts::ZERO);
    }

    #[test]
    fn test_zero_capacity_is_excluded() {
        let (mut capacities, mut peaks) = synthetic(40_000.0, 0.6, 15_000.0);
        capacities.insert(0, MegawattHours::ZERO);
        peaks.insert(0, Megawatts::from(99_999.0));
        let fit = fit_power_law(&capacities, &peaks, PowerLawForm::WithOffset).unwrap();
        assert_abs_diff_eq!(fit.exponent, 0.6, epsilon = 1e-4);
    }

    #[test]
    fn test_parameters_stay_in_bounds() {
        // Growing peaks would need a negative exponent:
        let capacities: Vec<MegawattHours> =
            [10.0, 100.0, 1000.0, 10_000.0].map(MegawattHours::from).to_vec();
        let peaks: Vec<Megawatts> = [1.0, 2.0, 3.0, 4.0].map(Megawatts::from).to_vec();
        let fit = fit_power_law(&capacities, &peaks, PowerLawForm::WithOffset).unwrap();
        assert!((0.0..=MAX_EXPONENT).contains(&fit.exponent));
        assert!(fit.scale >= 0.0);
        assert!(fit.offset >= Megawatts::ZERO);
    }

    #[test]
    fn test_too_few_points() {
        let capacities = [0.0, 10.0, 100.0].map(MegawattHours::from);
        let peaks = [5.0, 4.0, 3.0].map(Megawatts::from);
        assert!(fit_power_law(&capacities, &peaks, PowerLawForm::WithOffset).is_err());
        assert!(fit_power_law(&capacities, &peaks, PowerLawForm::WithoutOffset).is_ok());
        assert!(fit_power_law(&capacities, &peaks[..2], PowerLawForm::WithoutOffset).is_err());
    }

    #[test]
    fn test_sample() {
        let power_law = PowerLaw {
            scale: 100.0,
            exponent: 1.0,
            offset: Megawatts::from(1.0),
            rmse: Megawatts::ZERO,
        };
        let samples = power_law.sample(MegawattHours::from(1.0), MegawattHours::from(100.0), 3);
        assert_eq!(samples.len(), 3);
        assert_abs_diff_eq!(samples[0].1.0, 101.0, epsilon = 1e-9);
        assert_abs_diff_eq!(samples[1].1.0, 11.0, epsilon = 1e-9);
        assert_abs_diff_eq!(samples[2].1.0, 2.0, epsilon = 1e-9);
    }
}
