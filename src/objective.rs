//! Closed-form objective models for a rotor blade.
//!
//! These are analytic proxies rather than solvers:
//!
//! * AEP grows with swept area (`L²`) and chord, scaled by a twist efficiency
//!   that peaks at [`PREFERRED_TWIST`].
//! * Mass scales with `L · c`, a straight-line layup volume proxy.
//! * Fatigue follows the cantilever root bending moment, `L³ / c`.
//!
//! Fatigue divides by the chord, so the evaluator requires `max_chord > 0`.
//! The default chord bound of 1 m always satisfies this; anything else is
//! reported as [`ProblemError::Domain`].

use crate::core::{DesignBounds, DesignVector, Genes, ObjectiveVector, OBJECTIVES};
use crate::ops::{MultiObjectiveProblem, ProblemBounds, ProblemError, ProblemResult};

/// AEP scale in MWh per square metre of blade length.
pub const AEP_COEFFICIENT: f64 = 0.05;
/// Relative AEP gain per metre of chord.
pub const AEP_CHORD_GAIN: f64 = 0.15;
/// Twist angle of peak efficiency, in degrees.
pub const PREFERRED_TWIST: f64 = 12.0;
/// Efficiency bonus at the preferred twist.
pub const TWIST_GAIN: f64 = 0.08;
/// Twist deviation, in degrees, over which the bonus decays.
pub const TWIST_WIDTH: f64 = 20.0;
/// Mass per metre of length per metre of chord, in kg.
pub const MASS_COEFFICIENT: f64 = 40.0;
/// Fatigue load scale.
pub const FATIGUE_COEFFICIENT: f64 = 0.005;

/// Evaluates a design.
///
/// # Errors
/// Returns [`ProblemError::Domain`] for a non-positive chord or any non-finite
/// design variable.
///
/// # Examples
/// ```
/// use blade_mdo::{evaluate, DesignVector};
/// let objectives = evaluate(&DesignVector::new(40.0, 2.0, 12.0)).unwrap();
/// assert!((objectives.mass - 3200.0).abs() < 1e-9);
/// assert!((objectives.fatigue - 160.0).abs() < 1e-9);
/// assert!(evaluate(&DesignVector::new(40.0, 0.0, 12.0)).is_err());
/// ```
pub fn evaluate(design: &DesignVector) -> ProblemResult<ObjectiveVector> {
    check_domain("blade_length", design.blade_length)?;
    check_domain("twist_angle", design.twist_angle)?;
    check_domain("max_chord", design.max_chord)?;
    if design.max_chord <= 0.0 {
        return Err(ProblemError::Domain {
            variable: "max_chord",
            value: design.max_chord,
        });
    }
    let length = design.blade_length;
    let chord = design.max_chord;
    let aep = AEP_COEFFICIENT
        * length.powi(2)
        * (1.0 + AEP_CHORD_GAIN * chord)
        * twist_efficiency(design.twist_angle);
    let mass = MASS_COEFFICIENT * length * chord;
    let fatigue = FATIGUE_COEFFICIENT * length.powi(3) / chord;
    Ok(ObjectiveVector::new(
        check_objective("AEP", aep)?,
        check_objective("Mass", mass)?,
        check_objective("Fatigue", fatigue)?,
    ))
}

/// Multiplicative twist efficiency, `1 + TWIST_GAIN` at the preferred angle
/// and falling off quadratically on either side.
#[must_use]
pub fn twist_efficiency(twist_angle: f64) -> f64 {
    let deviation = (twist_angle - PREFERRED_TWIST) / TWIST_WIDTH;
    1.0 + TWIST_GAIN * (1.0 - deviation * deviation)
}

fn check_domain(variable: &'static str, value: f64) -> ProblemResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProblemError::Domain { variable, value })
    }
}

fn check_objective(objective: &'static str, value: f64) -> ProblemResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProblemError::NonFiniteObjective { objective, value })
    }
}

/// The blade design problem as seen by the evolutionary explorer.
///
/// # Examples
/// ```
/// use blade_mdo::ops::MultiObjectiveProblem;
/// use blade_mdo::{BladeProblem, DesignBounds};
/// let mut problem = BladeProblem::new(DesignBounds::default());
/// let oriented = problem.evaluate(&[40.0, 2.0, 12.0]).unwrap();
/// assert!(oriented[0] < 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct BladeProblem {
    bounds: DesignBounds,
}

impl BladeProblem {
    /// Creates the problem over `bounds`.
    #[must_use]
    pub fn new(bounds: DesignBounds) -> Self {
        Self { bounds }
    }
}

impl Default for BladeProblem {
    fn default() -> Self {
        Self::new(DesignBounds::default())
    }
}

impl ProblemBounds for BladeProblem {
    fn bounds(&self) -> &DesignBounds {
        &self.bounds
    }
}

impl MultiObjectiveProblem for BladeProblem {
    fn evaluate(&mut self, genes: &Genes) -> ProblemResult<[f64; OBJECTIVES]> {
        Ok(evaluate(&DesignVector::from(*genes))?.to_minimization())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_is_bit_identical_across_calls() {
        let design = DesignVector::new(37.3, 2.71, 13.9);
        let first = evaluate(&design).unwrap();
        for _ in 0..10 {
            let again = evaluate(&design).unwrap();
            assert_eq!(first.aep.to_bits(), again.aep.to_bits());
            assert_eq!(first.mass.to_bits(), again.mass.to_bits());
            assert_eq!(first.fatigue.to_bits(), again.fatigue.to_bits());
        }
    }

    #[test]
    fn fatigue_grows_with_length() {
        let mut previous = 0.0;
        for step in 0..=30 {
            let length = 20.0 + f64::from(step);
            let fatigue = evaluate(&DesignVector::new(length, 3.0, 10.0)).unwrap().fatigue;
            assert!(fatigue > previous);
            previous = fatigue;
        }
    }

    #[test]
    fn fatigue_is_relieved_by_chord() {
        let mut previous = f64::INFINITY;
        for step in 0..=40 {
            let chord = 1.0 + 0.1 * f64::from(step);
            let fatigue = evaluate(&DesignVector::new(35.0, chord, 10.0)).unwrap().fatigue;
            assert!(fatigue < previous);
            previous = fatigue;
        }
    }

    #[test]
    fn twist_efficiency_peaks_at_preferred_angle() {
        let peak = twist_efficiency(PREFERRED_TWIST);
        assert!((peak - (1.0 + TWIST_GAIN)).abs() < 1e-12);
        assert!(twist_efficiency(0.0) < peak);
        assert!(twist_efficiency(20.0) < peak);
        let below = evaluate(&DesignVector::new(35.0, 3.0, 6.0)).unwrap().aep;
        let at = evaluate(&DesignVector::new(35.0, 3.0, PREFERRED_TWIST)).unwrap().aep;
        let above = evaluate(&DesignVector::new(35.0, 3.0, 18.0)).unwrap().aep;
        assert!(at > below && at > above);
    }

    #[test]
    fn aep_grows_with_length_and_chord() {
        let base = evaluate(&DesignVector::new(30.0, 2.0, 10.0)).unwrap().aep;
        assert!(evaluate(&DesignVector::new(31.0, 2.0, 10.0)).unwrap().aep > base);
        assert!(evaluate(&DesignVector::new(30.0, 2.5, 10.0)).unwrap().aep > base);
    }

    #[test]
    fn non_positive_chord_is_a_domain_error() {
        for chord in [0.0, -1.0] {
            let err = evaluate(&DesignVector::new(30.0, chord, 10.0)).unwrap_err();
            assert!(matches!(
                err,
                ProblemError::Domain {
                    variable: "max_chord",
                    ..
                }
            ));
        }
        assert!(evaluate(&DesignVector::new(f64::NAN, 2.0, 10.0)).is_err());
    }

    #[test]
    fn blade_problem_negates_aep_only() {
        let mut problem = BladeProblem::default();
        let genes = [40.0, 2.0, 12.0];
        let natural = evaluate(&DesignVector::from(genes)).unwrap();
        let oriented = problem.evaluate(&genes).unwrap();
        assert_eq!(oriented, [-natural.aep, natural.mass, natural.fatigue]);
    }
}
