//! Bracketed root finders shared by the dispatch solvers.

use argmin::{
    core::{CostFunction, Executor, State},
    solver::brent::BrentRoot,
};

use crate::prelude::*;

/// Halvings applied by the fixed-iteration bisection.
///
/// Shrinks the bracket by `2⁶⁰`, which is below double precision for any load level.
pub const BISECTION_ITERATIONS: usize = 60;

const MAX_BRENT_ITERATIONS: u64 = 200;

/// Closed interval known to contain a root.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bracket {
    pub low: f64,
    pub high: f64,
}

impl Bracket {
    pub fn new(low: f64, high: f64) -> Result<Self> {
        ensure!(low.is_finite() && high.is_finite(), "non-finite bracket: [{low}, {high}]");
        ensure!(low <= high, "inverted bracket: [{low}, {high}]");
        Ok(Self { low, high })
    }

    #[must_use]
    pub fn midpoint(self) -> f64 {
        0.5 * (self.low + self.high)
    }
}

/// Find the root of a non-decreasing residual by plain bisection.
///
/// Wherever `residual(x) > 0`, the root is assumed to lie below `x`. Runs exactly
/// `n_iterations` halvings and returns the midpoint of the final bracket.
pub fn bisect(bracket: Bracket, n_iterations: usize, residual: impl Fn(f64) -> f64) -> f64 {
    let mut bracket = bracket;
    for _ in 0..n_iterations {
        let midpoint = bracket.midpoint();
        if residual(midpoint) > 0.0 {
            bracket.high = midpoint;
        } else {
            bracket.low = midpoint;
        }
    }
    bracket.midpoint()
}

/// Find the root of a continuous residual with Brent's method.
///
/// The residual must change sign across the bracket, otherwise this fails.
#[instrument(level = "trace", skip(residual))]
pub fn brent(bracket: Bracket, tolerance: f64, residual: impl Fn(f64) -> f64) -> Result<f64> {
    let low_residual = residual(bracket.low);
    let high_residual = residual(bracket.high);
    ensure!(
        low_residual.is_finite() && high_residual.is_finite(),
        "the residual is not finite at the bracket ends: {low_residual}, {high_residual}",
    );
    if low_residual == 0.0 {
        return Ok(bracket.low);
    }
    if high_residual == 0.0 {
        return Ok(bracket.high);
    }
    ensure!(
        low_residual.signum() != high_residual.signum(),
        "no sign change across [{}, {}]: the residual is {low_residual} and {high_residual}",
        bracket.low,
        bracket.high,
    );

    let solver = BrentRoot::new(bracket.low, bracket.high, tolerance);
    let result = Executor::new(Residual(residual), solver)
        .configure(|state| state.max_iters(MAX_BRENT_ITERATIONS))
        .run()
        .context("Brent's method failed")?;
    trace!(n_iterations = result.state().get_iter(), "converged");
    result.state().get_best_param().copied().context("Brent's method produced no root")
}

/// Adapts a closure to the [`argmin`] problem interface.
struct Residual<F>(F);

impl<F: Fn(f64) -> f64> CostFunction for Residual<F> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok((self.0)(*param))
    }
}
