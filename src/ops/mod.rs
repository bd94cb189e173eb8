//! Genetic operators, problem abstractions and the bounded local solver.
//!
//! Each sub-module focuses on one part of the optimization workflow so the
//! engines in [`crate::nsga2`] and [`crate::scalarized`] can be assembled from
//! small, single-purpose pieces.

pub mod crossover;
pub mod local;
pub mod mutation;
pub mod problem;
pub mod selection;

pub use crossover::{BlendAlphaCrossover, CrossoverOperator, SimulatedBinaryCrossover};
pub use local::{LocalMinimizer, LocalSolution};
pub use mutation::{MutationOperator, PolynomialMutation};
pub use problem::{MultiObjectiveProblem, ProblemBounds, ProblemError, ProblemResult, ScalarProblem};
pub use selection::{CrowdedTournament, Rank, SelectionOperator};

use rand::RngCore;
use std::fmt::{self, Display, Formatter};

/// Errors reported while constructing operators.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorError {
    /// A distribution index was non-positive or not finite.
    InvalidDistributionIndex {
        /// Operator reporting the error.
        operator: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A probability was outside `[0, 1]`.
    InvalidProbability {
        /// Operator reporting the error.
        operator: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Any other parameter failed validation.
    InvalidParameter {
        /// Operator reporting the error.
        operator: &'static str,
        /// Name of the parameter.
        parameter: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl Display for OperatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDistributionIndex { operator, value } => write!(
                f,
                "{operator} distribution index must be positive (received {value})"
            ),
            Self::InvalidProbability { operator, value } => write!(
                f,
                "{operator} probability must be within [0, 1] (received {value})"
            ),
            Self::InvalidParameter {
                operator,
                parameter,
                value,
            } => write!(f, "{operator} parameter {parameter} was invalid (received {value})"),
        }
    }
}

impl std::error::Error for OperatorError {}

pub(crate) fn check_distribution_index(
    operator: &'static str,
    value: f64,
) -> Result<f64, OperatorError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(OperatorError::InvalidDistributionIndex { operator, value })
    }
}

pub(crate) fn check_probability(operator: &'static str, value: f64) -> Result<f64, OperatorError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(OperatorError::InvalidProbability { operator, value })
    }
}

/// Uniform draw from `[0, 1)`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn random_unit(rng: &mut dyn RngCore) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
