//! Box-constrained local minimization.
//!
//! [`LocalMinimizer`] hands a [`ScalarProblem`] to the COBYLA solver of the
//! `cobyla` crate. The solver works in unit coordinates, one per design
//! variable, so its trust radius means the same thing on every axis. Trial
//! points are mapped back and clamped into the box before evaluation, so the
//! objective is only ever evaluated at feasible designs.

use crate::core::{DesignBounds, Genes, DIMENSIONS};
use crate::ops::problem::{ProblemError, ProblemResult, ScalarProblem};
use cobyla::{minimize, Func, RhoBeg, StopTols};
use std::cell::{Cell, RefCell};

const DEFAULT_MAX_EVALUATIONS: usize = 1000;
const DEFAULT_TOLERANCE: f64 = 1e-6;
// initial trust radius, in unit coordinates
const INITIAL_RADIUS: f64 = 0.25;

/// Outcome of one local minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSolution {
    /// Last iterate. Always inside the bounds.
    pub x: Genes,
    /// Objective value at [`Self::x`].
    pub value: f64,
    /// Objective evaluations requested by the solver.
    pub evaluations: usize,
    /// Whether the trust radius shrank below the tolerance before the
    /// evaluation limit.
    pub converged: bool,
}

/// COBYLA minimizer for objectives over a box.
///
/// # Examples
/// ```
/// use blade_mdo::ops::{LocalMinimizer, ProblemBounds, ProblemResult, ScalarProblem};
/// use blade_mdo::{DesignBounds, Genes};
///
/// struct Bowl(DesignBounds);
///
/// impl ProblemBounds for Bowl {
///     fn bounds(&self) -> &DesignBounds { &self.0 }
/// }
///
/// impl ScalarProblem for Bowl {
///     fn evaluate(&self, x: &Genes) -> ProblemResult<f64> {
///         Ok((x[0] - 30.0).powi(2) + (x[1] - 2.0).powi(2) + (x[2] + 5.0).powi(2))
///     }
/// }
///
/// let problem = Bowl(DesignBounds::default());
/// let solution = LocalMinimizer::new().minimize(&problem, &[45.0, 4.0, 15.0]).unwrap();
/// assert!((solution.x[0] - 30.0).abs() < 1e-2);
/// assert!((solution.x[1] - 2.0).abs() < 1e-2);
/// assert!(solution.x[2] < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct LocalMinimizer {
    max_evaluations: usize,
    tolerance: f64,
}

impl Default for LocalMinimizer {
    fn default() -> Self {
        Self {
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl LocalMinimizer {
    /// Creates a solver with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the evaluation limit.
    #[must_use]
    pub fn max_evaluations(mut self, evaluations: usize) -> Self {
        self.max_evaluations = evaluations;
        self
    }

    /// Sets the final trust radius, relative to the initial one.
    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Minimizes `problem` starting from `start`, which is first clamped into
    /// the problem bounds.
    ///
    /// # Errors
    /// Returns the first [`ProblemError`] raised by the objective.
    pub fn minimize<P>(&self, problem: &P, start: &Genes) -> ProblemResult<LocalSolution>
    where
        P: ScalarProblem + ?Sized,
    {
        let bounds = *problem.bounds();
        let mut x = *start;
        bounds.clamp(&mut x);
        let unit = UnitBox {
            problem,
            bounds,
            calls: Cell::new(0),
            failure: RefCell::new(None),
        };

        let objective = |u: &[f64], _: &mut ()| unit.value(u);
        let constraints: Vec<&dyn Func<()>> = Vec::new();
        let stop = StopTols {
            xtol_rel: self.tolerance,
            ..StopTols::default()
        };
        let outcome = minimize(
            objective,
            &unit.encode(&x),
            &[(0.0, 1.0); DIMENSIONS],
            &constraints,
            (),
            self.max_evaluations,
            RhoBeg::All(INITIAL_RADIUS),
            Some(stop),
        );

        if let Some(err) = unit.failure.take() {
            return Err(err);
        }
        let (finished, u) = match outcome {
            Ok((_, u, _)) => (true, u),
            Err((_, u, _)) => (false, u),
        };
        let evaluations = unit.calls.get();
        let x = unit.decode(&u);
        Ok(LocalSolution {
            x,
            value: problem.evaluate(&x)?,
            evaluations,
            converged: finished && evaluations < self.max_evaluations,
        })
    }
}

/// Maps the unit cube onto the problem bounds and records what the solver
/// asked for.
struct UnitBox<'a, P: ?Sized> {
    problem: &'a P,
    bounds: DesignBounds,
    calls: Cell<usize>,
    failure: RefCell<Option<ProblemError>>,
}

impl<P: ScalarProblem + ?Sized> UnitBox<'_, P> {
    fn encode(&self, x: &Genes) -> Vec<f64> {
        (0..DIMENSIONS)
            .map(|idx| {
                let (lower, upper) = (self.bounds.lower[idx], self.bounds.upper[idx]);
                if upper > lower {
                    (x[idx] - lower) / (upper - lower)
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn decode(&self, u: &[f64]) -> Genes {
        let mut x = self.bounds.lower;
        for (idx, value) in x.iter_mut().enumerate() {
            let fraction = u.get(idx).copied().unwrap_or(0.0).clamp(0.0, 1.0);
            *value += fraction * (self.bounds.upper[idx] - self.bounds.lower[idx]);
        }
        self.bounds.clamp(&mut x);
        x
    }

    fn value(&self, u: &[f64]) -> f64 {
        self.calls.set(self.calls.get() + 1);
        if self.failure.borrow().is_some() {
            return f64::MAX;
        }
        match self.problem.evaluate(&self.decode(u)) {
            Ok(value) => value,
            Err(err) => {
                *self.failure.borrow_mut() = Some(err);
                f64::MAX
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::problem::{ProblemBounds, ProblemError};

    struct Quadratic {
        bounds: DesignBounds,
        centre: Genes,
        weights: Genes,
    }

    impl ProblemBounds for Quadratic {
        fn bounds(&self) -> &DesignBounds {
            &self.bounds
        }
    }

    impl ScalarProblem for Quadratic {
        fn evaluate(&self, x: &Genes) -> ProblemResult<f64> {
            assert!(self.bounds.contains_genes(x), "sampled outside box: {x:?}");
            Ok((0..DIMENSIONS)
                .map(|idx| self.weights[idx] * (x[idx] - self.centre[idx]).powi(2))
                .sum())
        }
    }

    struct Failing(DesignBounds);

    impl ProblemBounds for Failing {
        fn bounds(&self) -> &DesignBounds {
            &self.0
        }
    }

    impl ScalarProblem for Failing {
        fn evaluate(&self, x: &Genes) -> ProblemResult<f64> {
            Err(ProblemError::Domain {
                variable: "max_chord",
                value: x[1],
            })
        }
    }

    #[test]
    fn interior_minimum_is_found() {
        let problem = Quadratic {
            bounds: DesignBounds::default(),
            centre: [33.0, 2.5, 7.0],
            weights: [1.0, 10.0, 0.5],
        };
        let solution = LocalMinimizer::new()
            .minimize(&problem, &[20.0, 5.0, 20.0])
            .unwrap();
        assert!(solution.converged);
        for idx in 0..DIMENSIONS {
            assert!((solution.x[idx] - problem.centre[idx]).abs() < 1e-2);
        }
        assert!(solution.value < 1e-4);
    }

    #[test]
    fn minimum_outside_box_lands_on_bound() {
        let problem = Quadratic {
            bounds: DesignBounds::default(),
            centre: [60.0, 0.0, 10.0],
            weights: [1.0, 1.0, 1.0],
        };
        let solution = LocalMinimizer::new()
            .minimize(&problem, &problem.bounds.midpoint())
            .unwrap();
        assert!((solution.x[0] - 50.0).abs() < 1e-4);
        assert!((solution.x[1] - 1.0).abs() < 1e-4);
        assert!((solution.x[2] - 10.0).abs() < 1e-3);
    }

    #[test]
    fn fixed_dimension_does_not_move() {
        let problem = Quadratic {
            bounds: DesignBounds::default().with_fixed(2, 10.0),
            centre: [30.0, 2.0, 0.0],
            weights: [1.0, 1.0, 1.0],
        };
        let solution = LocalMinimizer::new()
            .minimize(&problem, &[45.0, 4.0, 3.0])
            .unwrap();
        assert_eq!(solution.x[2], 10.0);
    }

    #[test]
    fn evaluation_limit_reports_non_convergence() {
        let problem = Quadratic {
            bounds: DesignBounds::default(),
            centre: [33.0, 2.5, 7.0],
            weights: [1.0, 10.0, 0.5],
        };
        let solution = LocalMinimizer::new()
            .max_evaluations(5)
            .minimize(&problem, &[20.0, 5.0, 20.0])
            .unwrap();
        assert!(!solution.converged);
        assert!(solution.evaluations <= 5);
        assert!(problem.bounds.contains_genes(&solution.x));
    }

    #[test]
    fn flat_direction_is_still_resolved() {
        let problem = Quadratic {
            bounds: DesignBounds::default(),
            centre: [1.0e4, 3.0, 12.0],
            weights: [1.0e-6, 1.0, 1.0e-4],
        };
        let solution = LocalMinimizer::new()
            .minimize(&problem, &problem.bounds.midpoint())
            .unwrap();
        assert!((solution.x[0] - 50.0).abs() < 1e-4);
        assert!((solution.x[2] - 12.0).abs() < 1e-2);
    }

    #[test]
    fn objective_errors_propagate() {
        let err = LocalMinimizer::new()
            .minimize(&Failing(DesignBounds::default()), &[30.0, 2.0, 5.0])
            .unwrap_err();
        assert!(matches!(err, ProblemError::Domain { .. }));
    }

    #[test]
    fn unit_coordinates_round_trip_inside_the_box() {
        let problem = Failing(DesignBounds::default().with_fixed(2, 10.0));
        let unit = UnitBox {
            problem: &problem,
            bounds: *problem.bounds(),
            calls: Cell::new(0),
            failure: RefCell::new(None),
        };
        let u = unit.encode(&[35.0, 2.0, 10.0]);
        assert_eq!(u, vec![0.5, 0.25, 0.0]);
        assert_eq!(unit.decode(&u), [35.0, 2.0, 10.0]);
        assert_eq!(unit.decode(&[-0.5, 1.5, 0.7]), [20.0, 5.0, 10.0]);
    }
}
