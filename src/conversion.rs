// Step <-> coordinate conversions
//
// Each axis carries a pair of shared closures. The linear factories model a
// motor driving a wheel/pulley of a given radius: one revolution moves the
// coordinate by radius * 2π. Rounding is to nearest, ties to even.

use std::f64::consts::TAU;
use std::sync::Arc;

use crate::error::{Result, RigError};

/// Motor steps -> physical coordinate
pub type StepToCoord = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Physical coordinate -> motor steps (rounded to nearest)
///
/// Non-finite coordinates saturate: NaN becomes step 0 and ±inf become
/// `i64::MAX` / `i64::MIN`. Callers feeding untrusted values should check
/// `is_finite` first.
pub type CoordToStep = Arc<dyn Fn(f64) -> i64 + Send + Sync>;

/// Default step -> coordinate: the step count as a float, untouched
pub fn identity_step_to_coord() -> StepToCoord {
    Arc::new(|steps| steps)
}

/// Default coordinate -> step: round to the nearest whole step
pub fn round_coord_to_step() -> CoordToStep {
    Arc::new(|coord| coord.round_ties_even() as i64)
}

/// Reject parameters that would make the linear mapping degenerate
pub fn check_linear(steps_per_revolution: u32, radius: f64) -> Result<()> {
    if steps_per_revolution == 0 {
        return Err(RigError::InvalidLinear {
            steps_per_revolution,
            radius,
            reason: "steps_per_revolution must be positive",
        });
    }
    if !radius.is_finite() || radius <= 0.0 {
        return Err(RigError::InvalidLinear {
            steps_per_revolution,
            radius,
            reason: "radius must be a finite positive number",
        });
    }
    Ok(())
}

/// Linear step -> coordinate mapping
///
/// `f(steps) = radius * 2π * round(steps) / steps_per_revolution`
///
/// With `radius = 1.0` the coordinate is the shaft angle in radians.
pub fn step_to_coord_linear(steps_per_revolution: u32, radius: f64) -> Result<StepToCoord> {
    check_linear(steps_per_revolution, radius)?;
    let spr = steps_per_revolution as f64;
    Ok(Arc::new(move |steps| {
        radius * TAU * steps.round_ties_even() / spr
    }))
}

/// Linear coordinate -> step mapping, inverse of [`step_to_coord_linear`]
///
/// `g(coord) = round(coord * steps_per_revolution / (radius * 2π))`
pub fn coord_to_step_linear(steps_per_revolution: u32, radius: f64) -> Result<CoordToStep> {
    check_linear(steps_per_revolution, radius)?;
    let spr = steps_per_revolution as f64;
    Ok(Arc::new(move |coord| {
        (coord * spr / (radius * TAU)).round_ties_even() as i64
    }))
}
