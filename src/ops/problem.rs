//! Problem abstractions consumed by the search engines.

use crate::core::{DesignBounds, Genes, OBJECTIVES};
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Convenience alias used by the problem traits.
pub type ProblemResult<T> = Result<T, ProblemError>;

/// Errors produced when a design cannot be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// A design variable lies outside the domain where the objective models
    /// are defined.
    Domain {
        /// Name of the offending variable.
        variable: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The objective model produced a non-finite value.
    NonFiniteObjective {
        /// Name of the objective.
        objective: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl Display for ProblemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain { variable, value } => {
                write!(f, "{variable} = {value} is outside the evaluation domain")
            }
            Self::NonFiniteObjective { objective, value } => {
                write!(f, "objective {objective} evaluated to {value}")
            }
        }
    }
}

impl Error for ProblemError {}

/// Box bounds shared by every problem.
pub trait ProblemBounds {
    /// Returns the bounds of the design space.
    fn bounds(&self) -> &DesignBounds;

    /// Clamps a design into the bounds.
    fn clamp_to_domain(&self, genes: &mut Genes) {
        self.bounds().clamp(genes);
    }
}

impl<T: ProblemBounds + ?Sized> ProblemBounds for &T {
    fn bounds(&self) -> &DesignBounds {
        (**self).bounds()
    }
}

impl<T: ProblemBounds + ?Sized> ProblemBounds for Box<T> {
    fn bounds(&self) -> &DesignBounds {
        (**self).bounds()
    }
}

/// Problems evaluated by the evolutionary explorer.
///
/// Objective values are minimization-oriented: maximized quantities must be
/// negated by the implementation.
///
/// # Examples
/// ```
/// use blade_mdo::ops::{MultiObjectiveProblem, ProblemBounds, ProblemResult};
/// use blade_mdo::{DesignBounds, Genes};
///
/// struct Spread(DesignBounds);
///
/// impl ProblemBounds for Spread {
///     fn bounds(&self) -> &DesignBounds { &self.0 }
/// }
///
/// impl MultiObjectiveProblem for Spread {
///     fn evaluate(&mut self, genes: &Genes) -> ProblemResult<[f64; 3]> {
///         Ok([genes[0], -genes[0], genes[1]])
///     }
/// }
///
/// let mut problem = Spread(DesignBounds::default());
/// assert_eq!(problem.evaluate(&[30.0, 2.0, 0.0]).unwrap(), [30.0, -30.0, 2.0]);
/// ```
pub trait MultiObjectiveProblem: ProblemBounds {
    /// Evaluates a design into minimization-oriented objectives.
    ///
    /// # Errors
    /// Implementations return [`ProblemError`] for designs outside their
    /// domain.
    fn evaluate(&mut self, genes: &Genes) -> ProblemResult<[f64; OBJECTIVES]>;
}

impl<T: MultiObjectiveProblem + ?Sized> MultiObjectiveProblem for &mut T {
    fn evaluate(&mut self, genes: &Genes) -> ProblemResult<[f64; OBJECTIVES]> {
        (**self).evaluate(genes)
    }
}

impl<T: ProblemBounds + ?Sized> ProblemBounds for &mut T {
    fn bounds(&self) -> &DesignBounds {
        (**self).bounds()
    }
}

impl<T: MultiObjectiveProblem + ?Sized> MultiObjectiveProblem for Box<T> {
    fn evaluate(&mut self, genes: &Genes) -> ProblemResult<[f64; OBJECTIVES]> {
        (**self).evaluate(genes)
    }
}

/// Scalar objectives minimized by the local solver.
pub trait ScalarProblem: ProblemBounds {
    /// Evaluates the scalar objective at `genes`.
    ///
    /// # Errors
    /// Implementations return [`ProblemError`] for designs outside their
    /// domain.
    fn evaluate(&self, genes: &Genes) -> ProblemResult<f64>;
}

impl<T: ScalarProblem + ?Sized> ScalarProblem for &T {
    fn evaluate(&self, genes: &Genes) -> ProblemResult<f64> {
        (**self).evaluate(genes)
    }
}
